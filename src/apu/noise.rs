use super::units::{Divider, Envelope, LengthCounter};
use bit_field::BitField;
use serde::{Deserialize, Serialize};

// CPU half-cycle periods per timer reload
const PERIOD: [usize; 16] = [
    4, 8, 16, 32, 64, 96, 128, 160, 202, 254, 380, 508, 762, 1016, 2034, 4068,
];

#[derive(Debug, Serialize, Deserialize)]
pub struct Noise {
    envelope: Envelope,
    len_counter: LengthCounter,

    timer: Divider,
    lfsr: u16,
    tap: usize,
}

impl Noise {
    pub fn new() -> Self {
        Self {
            envelope: Envelope::new(),
            len_counter: LengthCounter::new(),

            timer: Divider::new(),
            lfsr: 1,
            tap: 1,
        }
    }
}

impl super::Channel for Noise {
    fn sample(&mut self) -> u8 {
        self.envelope.volume() * self.len_counter.gate() * (!self.lfsr.get_bit(0) as u8)
    }

    fn tick(&mut self) {
        if self.timer.tick() {
            let feed = self.lfsr.get_bit(0) ^ self.lfsr.get_bit(self.tap);
            self.lfsr >>= 1;
            self.lfsr.set_bit(14, feed);
        }
    }

    fn tick_half(&mut self) {
        self.len_counter.tick();
    }

    fn tick_quarter(&mut self) {
        self.envelope.tick();
    }

    fn write_reg0(&mut self, data: u8) {
        self.len_counter.set_halt(data.get_bit(5));
        self.envelope.load(data.get_bits(0..6));
    }

    fn write_reg1(&mut self, _: u8) {}

    fn write_reg2(&mut self, data: u8) {
        // mode bit moves the feedback tap from bit 1 to bit 6
        self.tap = data.get_bit(7) as usize * 5 + 1;
        self.timer.set_period(PERIOD[data.get_bits(0..4) as usize]);
    }

    fn write_reg3(&mut self, data: u8) {
        self.envelope.restart();
        self.len_counter.load(data & 0xf8);
    }

    fn set_enable(&mut self, enable: bool) {
        self.len_counter.set_enable(enable);
    }

    fn enabled(&self) -> bool {
        self.len_counter.gate() > 0
    }
}

#[cfg(test)]
mod tests {
    use super::super::Channel;
    use super::*;

    #[test]
    fn period_table_spans_4_to_4068() {
        let mut noise = Noise::new();
        noise.write_reg2(0);
        assert_eq!(noise.timer.period(), 4);
        noise.write_reg2(15);
        assert_eq!(noise.timer.period(), 4068);
    }

    #[test]
    fn lfsr_visits_the_full_15_bit_sequence() {
        let mut noise = Noise::new();
        noise.write_reg2(0);

        let start = noise.lfsr;
        let mut period = 0usize;
        loop {
            for _ in 0..5 {
                noise.tick();
            }
            period += 1;
            if noise.lfsr == start {
                break;
            }
            assert!(period < 40000);
        }
        assert_eq!(period, 32767);
    }

    #[test]
    fn short_mode_uses_the_bit_6_tap() {
        let mut noise = Noise::new();
        noise.write_reg2(0x80);

        let start = noise.lfsr;
        let mut period = 0usize;
        loop {
            for _ in 0..5 {
                noise.tick();
            }
            period += 1;
            if noise.lfsr == start {
                break;
            }
            assert!(period < 40000);
        }
        // the 93-step loop of the short sequence
        assert_eq!(period % 93, 0);
    }
}
