use crossbeam_queue::ArrayQueue;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};

const RING_SIZE: usize = 4096;
const LAG_LOG_INTERVAL: Duration = Duration::from_secs(1);

fn ring() -> Arc<ArrayQueue<f32>> {
    Arc::new(ArrayQueue::new(RING_SIZE))
}

/// Emits one mixed sample whenever the APU clock passes the floating
/// sample target, then advances the target by `CPU_FREQUENCY /
/// sample_rate`. Samples land in a bounded single-producer single-consumer
/// ring; on overrun the oldest sample is discarded so the emulator never
/// blocks on the audio backend.
#[derive(Serialize, Deserialize)]
pub struct Sampler {
    sample_ticks: f64,
    sample_target_ticks: f64,

    #[serde(skip, default = "ring")]
    queue: Arc<ArrayQueue<f32>>,
    #[serde(skip)]
    last_lag: Option<Instant>,
}

impl Sampler {
    pub fn new() -> Self {
        Self {
            sample_ticks: 0.0,
            sample_target_ticks: 0.0,
            queue: ring(),
            last_lag: None,
        }
    }

    /// `clock` anchors the first sample to the present, not to power-on.
    pub fn set_sample_rate(&mut self, rate: f64, clock: usize) {
        self.sample_ticks = crate::CPU_FREQUENCY / rate;
        self.sample_target_ticks = clock as f64 + self.sample_ticks;
    }

    /// True when a sample is owed for the current clock. A zero rate
    /// (no consumer attached) never samples.
    pub fn due(&self, clock: usize) -> bool {
        self.sample_ticks > 0.0 && clock as f64 >= self.sample_target_ticks
    }

    pub fn emit(&mut self, sample: f32) {
        self.sample_target_ticks += self.sample_ticks;

        if self.queue.force_push(sample).is_some() {
            let now = Instant::now();
            let stale = self
                .last_lag
                .map_or(true, |last| now.duration_since(last) > LAG_LOG_INTERVAL);
            if stale {
                self.last_lag = Some(now);
                log::warn!("audio consumer is falling behind, dropping samples");
            }
        }
    }

    /// Consumer handle; pop samples from the other end.
    pub fn queue(&self) -> Arc<ArrayQueue<f32>> {
        self.queue.clone()
    }

    pub fn clear(&mut self, clock: usize) {
        while self.queue.pop().is_some() {}
        self.sample_target_ticks = clock as f64 + self.sample_ticks;
    }

    /// Carries the live consumer wiring across a snapshot load.
    pub(crate) fn adopt(&mut self, other: &Sampler) {
        self.queue = other.queue.clone();
        self.last_lag = other.last_lag;
        if self.sample_ticks == 0.0 {
            self.sample_ticks = other.sample_ticks;
            self.sample_target_ticks = other.sample_target_ticks;
        }
    }
}

impl Default for Sampler {
    fn default() -> Self {
        Self::new()
    }
}
