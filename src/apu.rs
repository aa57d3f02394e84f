use bit_field::BitField;
use serde::{Deserialize, Serialize};

mod dmc;
mod noise;
mod pulse;
mod sampler;
mod triangle;
mod units;

use dmc::Dmc;
use noise::Noise;
use pulse::Pulse;
pub use sampler::Sampler;
use triangle::Triangle;
use units::{FrameCounter, Step};

// linear approximation of the RC mixing network
const PULSE_GAIN: f32 = 0.012;
const TRIANGLE_GAIN: f32 = 0.00851;
const NOISE_GAIN: f32 = 0.00494;
const DMC_GAIN: f32 = 0.00335;

trait Channel {
    fn sample(&mut self) -> u8;

    fn tick(&mut self);
    fn tick_half(&mut self);
    fn tick_quarter(&mut self);

    fn write_reg0(&mut self, data: u8);
    fn write_reg1(&mut self, data: u8);
    fn write_reg2(&mut self, data: u8);
    fn write_reg3(&mut self, data: u8);

    fn set_enable(&mut self, enable: bool);
    fn enabled(&self) -> bool;
}

#[derive(Serialize, Deserialize)]
pub struct Apu {
    frame: FrameCounter,
    pulse1: Pulse,
    pulse2: Pulse,
    triangle: Triangle,
    noise: Noise,
    dmc: Dmc,

    clock: usize,
    sampler: Sampler,
}

impl Default for Apu {
    fn default() -> Self {
        Self {
            frame: FrameCounter::new(),
            pulse1: Pulse::new(false),
            pulse2: Pulse::new(true),
            triangle: Triangle::new(),
            noise: Noise::new(),
            dmc: Dmc::new(),

            clock: 0,
            sampler: Sampler::new(),
        }
    }
}

impl Apu {
    /// One CPU cycle; the pulse, noise and DMC dividers run at half rate.
    pub fn tick(&mut self) {
        let step = self.frame.tick();
        self.frame_tick(step);

        self.clock += 1;
        if self.clock % 2 == 0 {
            self.pulse1.tick();
            self.pulse2.tick();
            self.noise.tick();
            self.dmc.tick();
        }
        self.triangle.tick();

        if self.sampler.due(self.clock) {
            let mix = TRIANGLE_GAIN * self.triangle.sample() as f32
                + NOISE_GAIN * self.noise.sample() as f32
                + DMC_GAIN * self.dmc.sample() as f32
                + PULSE_GAIN * (self.pulse1.sample() + self.pulse2.sample()) as f32;
            self.sampler.emit(mix);
        }
    }

    fn frame_tick(&mut self, step: Step) {
        if step.contains(Step::LENGTH) {
            self.pulse1.tick_half();
            self.pulse2.tick_half();
            self.triangle.tick_half();
            self.noise.tick_half();
        }
        if step.contains(Step::ENVELOPE) {
            self.pulse1.tick_quarter();
            self.pulse2.tick_quarter();
            self.triangle.tick_quarter();
            self.noise.tick_quarter();
        }
    }

    /// Level of the IRQ line into the CPU; stays up until acknowledged.
    pub(crate) fn poll_irq(&self) -> bool {
        self.frame.irq() || self.dmc.irq()
    }

    /// Next DMC fetch wanted from CPU memory.
    pub(crate) fn dmc_request(&mut self) -> Option<u16> {
        self.dmc.read_sample()
    }

    pub(crate) fn dmc_response(&mut self, data: u8) {
        self.dmc.write_sample(data);
    }

    pub fn reset(&mut self) {
        self.write(0x4015, 0x00);
        self.frame.load(0x00);
        self.sampler.clear(self.clock);
    }

    pub fn set_sample_rate(&mut self, rate: f64) {
        self.sampler.set_sample_rate(rate, self.clock);
    }

    pub fn sampler(&self) -> &Sampler {
        &self.sampler
    }

    pub(crate) fn sampler_mut(&mut self) -> &mut Sampler {
        &mut self.sampler
    }

    pub fn read(&mut self, addr: u16) -> u8 {
        match addr {
            0x4015 => {
                let mut data = 0u8;
                data.set_bit(7, self.dmc.irq());
                data.set_bit(6, self.frame.irq());
                data.set_bit(4, self.dmc.enabled());
                data.set_bit(3, self.noise.enabled());
                data.set_bit(2, self.triangle.enabled());
                data.set_bit(1, self.pulse2.enabled());
                data.set_bit(0, self.pulse1.enabled());

                // the read acknowledges the frame interrupt, not the DMC one
                self.frame.ack_irq();
                data
            }
            _ => 0x00,
        }
    }

    pub fn write(&mut self, addr: u16, data: u8) {
        match addr {
            0x4000 => self.pulse1.write_reg0(data),
            0x4001 => self.pulse1.write_reg1(data),
            0x4002 => self.pulse1.write_reg2(data),
            0x4003 => self.pulse1.write_reg3(data),

            0x4004 => self.pulse2.write_reg0(data),
            0x4005 => self.pulse2.write_reg1(data),
            0x4006 => self.pulse2.write_reg2(data),
            0x4007 => self.pulse2.write_reg3(data),

            0x4008 => self.triangle.write_reg0(data),
            0x4009 => self.triangle.write_reg1(data),
            0x400a => self.triangle.write_reg2(data),
            0x400b => self.triangle.write_reg3(data),

            0x400c => self.noise.write_reg0(data),
            0x400d => self.noise.write_reg1(data),
            0x400e => self.noise.write_reg2(data),
            0x400f => self.noise.write_reg3(data),

            0x4010 => self.dmc.write_reg0(data),
            0x4011 => self.dmc.write_reg1(data),
            0x4012 => self.dmc.write_reg2(data),
            0x4013 => self.dmc.write_reg3(data),

            0x4015 => {
                self.dmc.set_enable(data.get_bit(4));
                self.noise.set_enable(data.get_bit(3));
                self.triangle.set_enable(data.get_bit(2));
                self.pulse2.set_enable(data.get_bit(1));
                self.pulse1.set_enable(data.get_bit(0));
            }
            0x4017 => {
                self.frame.load(data);
                if data.get_bit(7) {
                    self.frame_tick(Step::LENGTH | Step::ENVELOPE);
                }
            }
            _ => {}
        }
    }
}
