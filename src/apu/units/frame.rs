use crate::APU_FRAME_CYCLES;
use bit_field::BitField;
use serde::{Deserialize, Serialize};

// mode 0:    mode 1:       function
// ---------  -----------  -----------------------------
//  - - - f    - - - - -    IRQ (if bit 6 is clear)
//  - l - l    - l - - l    Length counter and sweep
//  e e e e    e e e - e    Envelope and linear counter

#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
enum Mode {
    Step4,
    Step5,
}

bitflags::bitflags! {
    pub struct Step: u8 {
        const LENGTH   = 0b01;
        const ENVELOPE = 0b10;
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FrameCounter {
    counter: usize,
    step: usize,
    mode: Mode,
    irq_on: bool,
    irq_level: bool,
}

impl FrameCounter {
    pub fn new() -> Self {
        Self {
            counter: 0,
            step: 0,
            mode: Mode::Step4,
            irq_on: true,
            irq_level: false,
        }
    }

    /// One CPU cycle; the sequencer itself advances every 7457.
    pub fn tick(&mut self) -> Step {
        let mut out = Step::empty();

        self.counter += 1;
        if self.counter == APU_FRAME_CYCLES {
            self.counter = 0;

            match self.mode {
                Mode::Step4 => {
                    self.step = (self.step + 1) % 4;
                    out.set(Step::ENVELOPE, true);
                    out.set(Step::LENGTH, self.step == 1 || self.step == 3);
                    if self.irq_on && self.step == 3 {
                        self.irq_level = true;
                    }
                }
                Mode::Step5 => {
                    self.step = (self.step + 1) % 5;
                    out.set(Step::ENVELOPE, self.step != 3);
                    out.set(Step::LENGTH, self.step == 1 || self.step == 4);
                }
            }
        }

        out
    }

    pub fn load(&mut self, data: u8) {
        self.counter = 0;
        self.step = 0;
        self.mode = if data.get_bit(7) {
            Mode::Step5
        } else {
            Mode::Step4
        };
        self.irq_on = !data.get_bit(6);
        if !self.irq_on {
            self.irq_level = false;
        }
    }

    pub fn irq(&self) -> bool {
        self.irq_level
    }

    pub fn ack_irq(&mut self) {
        self.irq_level = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn steps(frame: &mut FrameCounter, n: usize) -> Vec<Step> {
        let mut fired = Vec::new();
        for _ in 0..n * APU_FRAME_CYCLES {
            let s = frame.tick();
            if !s.is_empty() {
                fired.push(s);
            }
        }
        fired
    }

    #[test]
    fn four_step_mode_clocks_lengths_twice_a_frame_and_raises_irq() {
        let mut frame = FrameCounter::new();
        let fired = steps(&mut frame, 4);
        assert_eq!(fired.len(), 4);
        assert_eq!(fired[0], Step::ENVELOPE | Step::LENGTH); // step 1
        assert_eq!(fired[1], Step::ENVELOPE);
        assert_eq!(fired[2], Step::ENVELOPE | Step::LENGTH); // step 3
        assert!(frame.irq());
        frame.ack_irq();
        assert!(!frame.irq());
    }

    #[test]
    fn five_step_mode_skips_step_3_and_never_interrupts() {
        let mut frame = FrameCounter::new();
        frame.load(0b1000_0000);
        let fired: Vec<_> = steps(&mut frame, 5);
        // step 3 produces nothing at all
        assert_eq!(fired.len(), 4);
        assert_eq!(fired[0], Step::ENVELOPE | Step::LENGTH); // step 1
        assert_eq!(fired[1], Step::ENVELOPE); // step 2
        assert_eq!(fired[2], Step::ENVELOPE | Step::LENGTH); // step 4
        assert_eq!(fired[3], Step::ENVELOPE); // step 0
        assert!(!frame.irq());
    }

    #[test]
    fn inhibit_bit_clears_a_pending_irq() {
        let mut frame = FrameCounter::new();
        steps(&mut frame, 4);
        assert!(frame.irq());
        frame.load(0b0100_0000);
        assert!(!frame.irq());
    }
}
