use super::Mirroring;
use bit_field::BitField;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
enum PrgMode {
    SwapLow,
    SwapHigh,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
enum ChrMode {
    Low2Kb,
    High2Kb,
}

/// 004, MMC3
///
/// eight bank registers behind a select latch, 8KB PRG / 1-2KB CHR windows,
/// scanline IRQ counter.
///
/// The IRQ counter is clocked from the PPU scanline hook (dot 260 of every
/// visible line while rendering) rather than a true A12 edge detector; an
/// edge detector would additionally need the last PPU address and a
/// low-dot filter counter here.
#[derive(Serialize, Deserialize)]
pub struct Mapper004 {
    prg_banks: [usize; 4],
    chr_banks: [usize; 8],
    prg_max: usize,

    bank_reg: u8,
    bank_regs: [u8; 8],
    prg_mode: PrgMode,
    chr_mode: ChrMode,

    irq_latch: u8,
    irq_counter: u8,
    irq_on: bool,
    irq_level: bool,

    mirroring: Mirroring,
    four_screen: bool,
}

impl Mapper004 {
    pub fn new(mirroring: Mirroring, prg_banks: usize) -> Self {
        let prg_max = prg_banks.max(1) * 2;
        Self {
            prg_banks: [0, 1, prg_max - 2, prg_max - 1],
            chr_banks: [0; 8],
            prg_max,

            bank_reg: 0,
            bank_regs: [0; 8],
            prg_mode: PrgMode::SwapLow,
            chr_mode: ChrMode::Low2Kb,

            irq_latch: 0,
            irq_counter: 0,
            irq_on: false,
            irq_level: false,

            mirroring,
            four_screen: mirroring == Mirroring::FourScreen,
        }
    }

    fn bank_select(&mut self, addr: u16, data: u8) {
        if addr % 2 == 0 {
            self.bank_reg = data.get_bits(0..3);
            self.prg_mode = if data.get_bit(6) {
                PrgMode::SwapHigh
            } else {
                PrgMode::SwapLow
            };
            self.chr_mode = if data.get_bit(7) {
                ChrMode::High2Kb
            } else {
                ChrMode::Low2Kb
            };
        } else {
            self.bank_regs[self.bank_reg as usize] = data;
        }

        self.update_banks();
    }

    fn update_banks(&mut self) {
        let r = |i: usize| self.bank_regs[i] as usize;

        match self.prg_mode {
            PrgMode::SwapLow => {
                self.prg_banks[0] = (r(6) & 0x3f) % self.prg_max;
                self.prg_banks[1] = (r(7) & 0x3f) % self.prg_max;
                self.prg_banks[2] = self.prg_max - 2;
                self.prg_banks[3] = self.prg_max - 1;
            }
            PrgMode::SwapHigh => {
                self.prg_banks[0] = self.prg_max - 2;
                self.prg_banks[1] = (r(7) & 0x3f) % self.prg_max;
                self.prg_banks[2] = (r(6) & 0x3f) % self.prg_max;
                self.prg_banks[3] = self.prg_max - 1;
            }
        }
        match self.chr_mode {
            ChrMode::Low2Kb => {
                self.chr_banks[0] = r(0) & 0xfe;
                self.chr_banks[1] = self.chr_banks[0] + 1;
                self.chr_banks[2] = r(1) & 0xfe;
                self.chr_banks[3] = self.chr_banks[2] + 1;
                self.chr_banks[4] = r(2);
                self.chr_banks[5] = r(3);
                self.chr_banks[6] = r(4);
                self.chr_banks[7] = r(5);
            }
            ChrMode::High2Kb => {
                self.chr_banks[0] = r(2);
                self.chr_banks[1] = r(3);
                self.chr_banks[2] = r(4);
                self.chr_banks[3] = r(5);
                self.chr_banks[4] = r(0) & 0xfe;
                self.chr_banks[5] = self.chr_banks[4] + 1;
                self.chr_banks[6] = r(1) & 0xfe;
                self.chr_banks[7] = self.chr_banks[6] + 1;
            }
        }
    }
}

impl super::Mapper for Mapper004 {
    fn id(&self) -> u8 {
        4
    }

    fn read_prg(&self, prg: &[u8], addr: u16) -> u8 {
        // 4 x 8KB prg windows
        let index = (addr >> 13) as usize & 0b11;
        let offset = addr as usize & 0x1fff;
        prg[(offset + self.prg_banks[index] * 0x2000) % prg.len()]
    }

    fn write_prg(&mut self, _prg: &mut [u8], addr: u16, data: u8) {
        match addr {
            0x8000..=0x9fff => self.bank_select(addr, data),
            0xa000..=0xbfff => {
                // four-screen boards wire VRAM directly; the bit is ignored
                if addr % 2 == 0 && !self.four_screen {
                    self.mirroring = if !data.get_bit(0) {
                        Mirroring::Vertical
                    } else {
                        Mirroring::Horizontal
                    };
                }
            }
            0xc000..=0xdfff => {
                if addr % 2 == 0 {
                    self.irq_latch = data;
                } else {
                    self.irq_counter = 0;
                }
            }
            0xe000..=0xffff => {
                self.irq_on = addr % 2 != 0;
                if !self.irq_on {
                    self.irq_level = false;
                }
            }
            _ => unreachable!(),
        }
    }

    fn read_chr(&self, chr: &[u8], addr: u16) -> u8 {
        // 8 x 1KB chr windows
        let index = (addr >> 10) as usize & 0b111;
        let offset = addr as usize & 0x3ff;
        chr[(offset + self.chr_banks[index] * 0x400) % chr.len()]
    }

    fn update_scanline(&mut self) {
        if self.irq_counter == 0 {
            self.irq_counter = self.irq_latch;
        } else {
            self.irq_counter -= 1;

            if self.irq_on && self.irq_counter == 0 {
                self.irq_level = true;
            }
        }
    }

    fn poll_irq(&mut self) -> bool {
        std::mem::replace(&mut self.irq_level, false)
    }

    fn mirroring(&self) -> Mirroring {
        self.mirroring
    }
}

#[cfg(test)]
mod tests {
    use super::super::Mapper;
    use super::*;

    #[test]
    fn prg_mode_swaps_the_switchable_windows() {
        let mut mapper = Mapper004::new(Mirroring::Horizontal, 4);
        let mut prg = vec![0u8; 8 * 0x2000];
        for bank in 0..8 {
            prg[bank * 0x2000] = bank as u8;
        }

        let mut none = [];
        mapper.write_prg(&mut none, 0x8000, 6); // select R6
        mapper.write_prg(&mut none, 0x8001, 3);
        mapper.write_prg(&mut none, 0x8000, 7); // select R7
        mapper.write_prg(&mut none, 0x8001, 4);

        assert_eq!(mapper.read_prg(&prg, 0x8000), 3);
        assert_eq!(mapper.read_prg(&prg, 0xa000), 4);
        assert_eq!(mapper.read_prg(&prg, 0xc000), 6);
        assert_eq!(mapper.read_prg(&prg, 0xe000), 7);

        // swap: $8000 fixed to second-last, $c000 switchable
        mapper.write_prg(&mut none, 0x8000, 6 | 0x40);
        assert_eq!(mapper.read_prg(&prg, 0x8000), 6);
        assert_eq!(mapper.read_prg(&prg, 0xc000), 3);
        assert_eq!(mapper.read_prg(&prg, 0xe000), 7);
    }

    #[test]
    fn chr_2kb_registers_drop_the_low_bit() {
        let mut mapper = Mapper004::new(Mirroring::Horizontal, 2);
        let mut chr = vec![0u8; 8 * 0x400];
        for bank in 0..8 {
            chr[bank * 0x400] = 0x40 + bank as u8;
        }

        let mut none = [];
        mapper.write_prg(&mut none, 0x8000, 0); // R0, 2KB at $0000
        mapper.write_prg(&mut none, 0x8001, 5);
        assert_eq!(mapper.read_chr(&chr, 0x0000), 0x44);
        assert_eq!(mapper.read_chr(&chr, 0x0400), 0x45);
    }

    #[test]
    fn irq_counts_scanlines_and_raises_once() {
        let mut mapper = Mapper004::new(Mirroring::Horizontal, 2);
        let mut none = [];
        mapper.write_prg(&mut none, 0xc000, 3); // latch
        mapper.write_prg(&mut none, 0xc001, 0); // reload on next clock
        mapper.write_prg(&mut none, 0xe001, 0); // enable

        mapper.update_scanline(); // reload to 3
        assert!(!mapper.poll_irq());
        for _ in 0..2 {
            mapper.update_scanline();
            assert!(!mapper.poll_irq());
        }
        mapper.update_scanline(); // 0: fire
        assert!(mapper.poll_irq());
        assert!(!mapper.poll_irq());
    }

    #[test]
    fn irq_disable_acknowledges_a_pending_interrupt() {
        let mut mapper = Mapper004::new(Mirroring::Horizontal, 2);
        let mut none = [];
        mapper.write_prg(&mut none, 0xc000, 1);
        mapper.write_prg(&mut none, 0xe001, 0);
        mapper.update_scanline();
        mapper.update_scanline();
        mapper.write_prg(&mut none, 0xe000, 0);
        assert!(!mapper.poll_irq());
    }

    #[test]
    fn mirroring_register_flips_between_vertical_and_horizontal() {
        let mut mapper = Mapper004::new(Mirroring::Vertical, 2);
        let mut none = [];
        mapper.write_prg(&mut none, 0xa000, 1);
        assert_eq!(mapper.mirroring(), Mirroring::Horizontal);
        mapper.write_prg(&mut none, 0xa000, 0);
        assert_eq!(mapper.mirroring(), Mirroring::Vertical);
    }
}
