use super::units::Divider;
use bit_field::BitField;
use serde::{Deserialize, Serialize};

// CPU cycles per output bit, NTSC
const RATE: [usize; 16] = [
    428, 380, 340, 320, 286, 254, 226, 214, 190, 160, 142, 128, 106, 84, 72, 54,
];

#[derive(Debug, Serialize, Deserialize)]
pub struct Dmc {
    irq_on: bool,
    irq_level: bool,
    looping: bool,

    sample_start: u16,
    sample_address: u16,
    sample_len: u16,
    sample_remain: u16,
    sample_request: Option<u16>,

    timer: Divider,
    shifter: u8,
    bits_remain: u8,

    output: u8,
}

impl Dmc {
    pub fn new() -> Self {
        Self {
            irq_on: false,
            irq_level: false,
            looping: false,

            sample_start: 0xc000,
            sample_address: 0,
            sample_len: 1,
            sample_remain: 0,
            sample_request: None,

            timer: Divider::new(),
            shifter: 0,
            bits_remain: 0,

            output: 0,
        }
    }

    /// Address of the next sample byte wanted from CPU memory; taking it
    /// commits the fetch.
    pub fn read_sample(&mut self) -> Option<u16> {
        self.sample_request.take()
    }

    /// The fetched byte, delivered by the bus.
    pub fn write_sample(&mut self, data: u8) {
        self.shifter = data;
        self.bits_remain = 8;
    }

    pub fn irq(&self) -> bool {
        self.irq_level
    }

    fn restart(&mut self) {
        self.sample_remain = self.sample_len;
        self.sample_address = self.sample_start;
    }
}

impl super::Channel for Dmc {
    fn sample(&mut self) -> u8 {
        self.output
    }

    fn tick(&mut self) {
        if self.sample_remain > 0 && self.bits_remain == 0 {
            self.sample_request = Some(self.sample_address);

            if self.sample_address == 0xffff {
                self.sample_address = 0x8000;
            } else {
                self.sample_address += 1;
            }
            self.sample_remain -= 1;

            if self.sample_remain == 0 {
                if self.looping {
                    self.restart();
                } else if self.irq_on {
                    self.irq_level = true;
                }
            }
        }

        if self.timer.tick() && self.bits_remain > 0 {
            if self.shifter.get_bit(0) {
                if self.output <= 125 {
                    self.output += 2;
                }
            } else if self.output >= 2 {
                self.output -= 2;
            }

            self.shifter >>= 1;
            self.bits_remain -= 1;
        }
    }

    fn tick_half(&mut self) {}

    fn tick_quarter(&mut self) {}

    fn write_reg0(&mut self, data: u8) {
        self.irq_on = data.get_bit(7);
        self.looping = data.get_bit(6);
        // the channel is stepped every other CPU cycle
        self.timer.set_period(RATE[data.get_bits(0..4) as usize] / 2);

        if !self.irq_on {
            self.irq_level = false;
        }
    }

    fn write_reg1(&mut self, data: u8) {
        self.output = data & 0x7f;
    }

    fn write_reg2(&mut self, data: u8) {
        self.sample_start = 0xc000 + data as u16 * 64;
    }

    fn write_reg3(&mut self, data: u8) {
        self.sample_len = data as u16 * 16 + 1;
    }

    fn set_enable(&mut self, enable: bool) {
        if !enable {
            self.sample_remain = 0;
        } else if self.sample_remain == 0 {
            self.restart();
        }

        self.irq_level = false;
    }

    fn enabled(&self) -> bool {
        self.sample_remain > 0
    }
}

#[cfg(test)]
mod tests {
    use super::super::Channel;
    use super::*;

    #[test]
    fn sample_address_and_length_decode_per_the_registers() {
        let mut dmc = Dmc::new();
        dmc.write_reg2(0x04);
        dmc.write_reg3(0x02);
        dmc.set_enable(true);
        assert_eq!(dmc.sample_address, 0xc000 + 4 * 64);
        assert_eq!(dmc.sample_remain, 2 * 16 + 1);
    }

    #[test]
    fn bits_nudge_the_output_by_two_with_clamping() {
        let mut dmc = Dmc::new();
        dmc.write_reg0(0x0f); // fastest rate
        dmc.write_reg1(0x7e);
        dmc.write_sample(0b0000_0001);

        let period = dmc.timer.period() + 1;
        for _ in 0..period {
            dmc.tick();
        }
        assert_eq!(dmc.output, 126); // a rise past 125 is clamped
        for _ in 0..period {
            dmc.tick();
        }
        assert_eq!(dmc.output, 124);
    }

    #[test]
    fn finishing_without_loop_raises_the_irq() {
        let mut dmc = Dmc::new();
        dmc.write_reg0(0x80);
        dmc.write_reg3(0);
        dmc.set_enable(true);
        assert_eq!(dmc.sample_remain, 1);

        dmc.tick();
        assert_eq!(dmc.read_sample(), Some(0xc000));
        assert!(dmc.irq());
        dmc.set_enable(true);
        assert!(!dmc.irq());
    }
}
