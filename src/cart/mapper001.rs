use super::Mirroring;
use bit_field::BitField;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
enum PrgMode {
    Full,
    FixedFirst,
    FixedLast,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
enum ChrMode {
    Full,
    Half,
}

/// 001, MMC1
///
/// serial 5-bit shift register loaded LSB first; the fifth write latches
/// into one of four registers picked by address bits 13..14
#[derive(Serialize, Deserialize)]
pub struct Mapper001 {
    prg_bank0: usize,
    prg_bank1: usize,
    prg_banks: usize,
    chr_bank0: usize,
    chr_bank1: usize,

    step: u8,
    shifter: u8,
    prg_mode: PrgMode,
    chr_mode: ChrMode,
    enable_ram: bool,

    mirroring: Mirroring,
}

impl Mapper001 {
    pub fn new(mirroring: Mirroring, prg_banks: usize) -> Self {
        Self {
            prg_bank0: 0,
            prg_bank1: prg_banks - 1,
            prg_banks,
            chr_bank0: 0,
            chr_bank1: 1,

            step: 0,
            shifter: 0,
            prg_mode: PrgMode::FixedLast,
            chr_mode: ChrMode::Full,
            enable_ram: false,

            mirroring,
        }
    }

    fn latch(&mut self, addr: u16) {
        let bank_bits = self.shifter as usize;

        match addr {
            0x8000..=0x9fff => {
                self.mirroring = match self.shifter.get_bits(0..=1) {
                    0b00 => Mirroring::SingleScreen0,
                    0b01 => Mirroring::SingleScreen1,
                    0b10 => Mirroring::Vertical,
                    0b11 => Mirroring::Horizontal,
                    _ => unreachable!(),
                };
                self.prg_mode = PrgMode::from_bits(self.shifter.get_bits(2..=3));
                self.chr_mode = ChrMode::from_bits(self.shifter.get_bits(4..=4));
            }
            0xa000..=0xbfff => {
                if self.chr_mode == ChrMode::Full {
                    self.chr_bank0 = bank_bits & 0b11110;
                    self.chr_bank1 = self.chr_bank0 + 1;
                } else {
                    self.chr_bank0 = bank_bits;
                }
            }
            0xc000..=0xdfff => {
                if self.chr_mode != ChrMode::Full {
                    self.chr_bank1 = bank_bits;
                }
            }
            0xe000..=0xffff => {
                match self.prg_mode {
                    PrgMode::Full => {
                        self.prg_bank0 = bank_bits & 0b01110;
                        self.prg_bank1 = self.prg_bank0 + 1;
                    }
                    PrgMode::FixedFirst => {
                        self.prg_bank0 = 0;
                        self.prg_bank1 = bank_bits & 0b01111;
                    }
                    PrgMode::FixedLast => {
                        self.prg_bank0 = bank_bits & 0b01111;
                        self.prg_bank1 = self.prg_banks - 1;
                    }
                }

                self.enable_ram = !bank_bits.get_bit(4);
            }
            _ => unreachable!(),
        }
    }
}

impl super::Mapper for Mapper001 {
    fn id(&self) -> u8 {
        1
    }

    fn read_prg(&self, prg: &[u8], addr: u16) -> u8 {
        match addr {
            0x8000..=0xbfff => {
                prg[(addr as usize - 0x8000 + self.prg_bank0 * 0x4000) % prg.len()]
            }
            0xc000..=0xffff => {
                prg[(addr as usize - 0xc000 + self.prg_bank1 * 0x4000) % prg.len()]
            }
            _ => unreachable!(),
        }
    }

    fn write_prg(&mut self, _prg: &mut [u8], addr: u16, data: u8) {
        if data.get_bit(7) {
            // reset: shift cleared, control |= 0x0c (fix last PRG bank)
            self.step = 0;
            self.shifter = 0;

            self.prg_mode = PrgMode::FixedLast;
            self.prg_bank1 = self.prg_banks - 1;
        } else {
            self.shifter >>= 1;
            self.shifter.set_bit(4, data.get_bit(0));

            self.step += 1;
            if self.step == 5 {
                self.latch(addr);

                self.step = 0;
                self.shifter = 0;
            }
        }
    }

    fn read_chr(&self, chr: &[u8], addr: u16) -> u8 {
        match addr {
            0x0000..=0x0fff => chr[((addr & 0x0fff) as usize + self.chr_bank0 * 0x1000) % chr.len()],
            0x1000..=0x1fff => chr[((addr & 0x0fff) as usize + self.chr_bank1 * 0x1000) % chr.len()],
            _ => unreachable!(),
        }
    }

    fn mirroring(&self) -> Mirroring {
        self.mirroring
    }
}

impl PrgMode {
    fn from_bits(bits: u8) -> Self {
        match bits {
            0b00 | 0b01 => PrgMode::Full,
            0b10 => PrgMode::FixedFirst,
            0b11 => PrgMode::FixedLast,
            _ => unreachable!(),
        }
    }
}

impl ChrMode {
    fn from_bits(bits: u8) -> Self {
        match bits {
            0b00 => ChrMode::Full,
            0b01 => ChrMode::Half,
            _ => unreachable!(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::Mapper;
    use super::*;

    fn write_serial(mapper: &mut Mapper001, addr: u16, value: u8) {
        let mut prg = [];
        for i in 0..5 {
            mapper.write_prg(&mut prg, addr, (value >> i) & 1);
        }
    }

    #[test]
    fn latches_on_exactly_every_fifth_write() {
        let mut mapper = Mapper001::new(Mirroring::Horizontal, 8);
        let mut prg = [];

        for _ in 0..4 {
            mapper.write_prg(&mut prg, 0x8000, 0x01);
            assert_eq!(mapper.mirroring(), Mirroring::Horizontal);
        }
        mapper.write_prg(&mut prg, 0x8000, 0x00);
        // value 0b01111 latched into control: single-screen upper stays out
        assert_eq!(mapper.mirroring(), Mirroring::Horizontal);
        assert_eq!(mapper.step, 0);
        assert_eq!(mapper.shifter, 0);

        write_serial(&mut mapper, 0x8000, 0b00010);
        assert_eq!(mapper.mirroring(), Mirroring::Vertical);
    }

    #[test]
    fn bit7_resets_the_shifter_and_fixes_the_last_bank() {
        let mut mapper = Mapper001::new(Mirroring::Horizontal, 8);
        let mut prg = [];

        // switch to 32KB mode first
        write_serial(&mut mapper, 0x8000, 0b00011);
        assert_eq!(mapper.prg_mode, PrgMode::Full);

        mapper.write_prg(&mut prg, 0x8000, 0x01);
        mapper.write_prg(&mut prg, 0x8000, 0x80);
        assert_eq!(mapper.step, 0);
        assert_eq!(mapper.shifter, 0);
        assert_eq!(mapper.prg_mode, PrgMode::FixedLast);
        assert_eq!(mapper.prg_bank1, 7);
    }

    #[test]
    fn prg_modes_window_the_right_banks() {
        let mut mapper = Mapper001::new(Mirroring::Horizontal, 4);
        let mut prg = vec![0u8; 4 * 0x4000];
        for bank in 0..4 {
            prg[bank * 0x4000] = bank as u8;
        }

        // fixed-last: $8000 window switches
        write_serial(&mut mapper, 0xe000, 2);
        assert_eq!(mapper.read_prg(&prg, 0x8000), 2);
        assert_eq!(mapper.read_prg(&prg, 0xc000), 3);

        // fixed-first: $c000 window switches
        write_serial(&mut mapper, 0x8000, 0b01000);
        write_serial(&mut mapper, 0xe000, 1);
        assert_eq!(mapper.read_prg(&prg, 0x8000), 0);
        assert_eq!(mapper.read_prg(&prg, 0xc000), 1);

        // 32KB mode ignores the low bank bit
        write_serial(&mut mapper, 0x8000, 0b00000);
        write_serial(&mut mapper, 0xe000, 3);
        assert_eq!(mapper.read_prg(&prg, 0x8000), 2);
        assert_eq!(mapper.read_prg(&prg, 0xc000), 3);
    }

    #[test]
    fn chr_4kb_mode_splits_the_pattern_halves() {
        let mut mapper = Mapper001::new(Mirroring::Horizontal, 2);
        let mut chr = vec![0u8; 4 * 0x1000];
        for bank in 0..4 {
            chr[bank * 0x1000] = 0x10 + bank as u8;
        }

        write_serial(&mut mapper, 0x8000, 0b10000);
        write_serial(&mut mapper, 0xa000, 2);
        write_serial(&mut mapper, 0xc000, 1);
        assert_eq!(mapper.read_chr(&chr, 0x0000), 0x12);
        assert_eq!(mapper.read_chr(&chr, 0x1000), 0x11);
    }
}
