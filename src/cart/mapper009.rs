use super::Mirroring;
use bit_field::BitField;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU8, Ordering};

/// 009, MMC2
///
/// Two CHR latches, one per pattern-table half, toggled by fetches of the
/// magic tiles $fd/$fe; each latch picks between a pair of 4KB banks.
/// PRG is one switchable 8KB window at $8000, the rest fixed to the last
/// three banks.
#[derive(Serialize, Deserialize)]
pub struct Mapper009 {
    prg_bank: usize,
    chr_fd0: usize,
    chr_fe0: usize,
    chr_fd1: usize,
    chr_fe1: usize,

    // flipped during PPU pattern reads
    latch0: AtomicU8,
    latch1: AtomicU8,

    mirroring: Mirroring,
}

impl Mapper009 {
    pub fn new(mirroring: Mirroring, _prg_banks: usize) -> Self {
        Self {
            prg_bank: 0,
            chr_fd0: 0,
            chr_fe0: 0,
            chr_fd1: 0,
            chr_fe1: 0,

            latch0: AtomicU8::new(0xfd),
            latch1: AtomicU8::new(0xfd),

            mirroring,
        }
    }

    fn chr_offset(&self, addr: u16) -> usize {
        let bank = if addr < 0x1000 {
            if self.latch0.load(Ordering::Relaxed) == 0xfd {
                self.chr_fd0
            } else {
                self.chr_fe0
            }
        } else if self.latch1.load(Ordering::Relaxed) == 0xfd {
            self.chr_fd1
        } else {
            self.chr_fe1
        };
        bank * 0x1000 + (addr as usize & 0x0fff)
    }

    fn update_latches(&self, addr: u16) {
        match addr {
            0x0fd8 => self.latch0.store(0xfd, Ordering::Relaxed),
            0x0fe8 => self.latch0.store(0xfe, Ordering::Relaxed),
            0x1fd8..=0x1fdf => self.latch1.store(0xfd, Ordering::Relaxed),
            0x1fe8..=0x1fef => self.latch1.store(0xfe, Ordering::Relaxed),
            _ => {}
        }
    }
}

impl super::Mapper for Mapper009 {
    fn id(&self) -> u8 {
        9
    }

    fn read_prg(&self, prg: &[u8], addr: u16) -> u8 {
        match addr {
            0x8000..=0x9fff => prg[(addr as usize - 0x8000 + self.prg_bank * 0x2000) % prg.len()],
            0xa000..=0xffff => {
                // fixed to the last three 8KB banks
                let offset = addr as usize - 0xa000;
                prg[prg.len() - 3 * 0x2000 + offset]
            }
            _ => unreachable!(),
        }
    }

    fn write_prg(&mut self, _prg: &mut [u8], addr: u16, data: u8) {
        match addr {
            0xa000..=0xafff => self.prg_bank = (data & 0x0f) as usize,
            0xb000..=0xbfff => self.chr_fd0 = (data & 0x1f) as usize,
            0xc000..=0xcfff => self.chr_fe0 = (data & 0x1f) as usize,
            0xd000..=0xdfff => self.chr_fd1 = (data & 0x1f) as usize,
            0xe000..=0xefff => self.chr_fe1 = (data & 0x1f) as usize,
            0xf000..=0xffff => {
                self.mirroring = if !data.get_bit(0) {
                    Mirroring::Vertical
                } else {
                    Mirroring::Horizontal
                };
            }
            _ => {}
        }
    }

    fn read_chr(&self, chr: &[u8], addr: u16) -> u8 {
        let data = chr[self.chr_offset(addr) % chr.len()];
        self.update_latches(addr);
        data
    }

    fn write_chr(&mut self, chr: &mut [u8], addr: u16, data: u8) {
        let offset = self.chr_offset(addr) % chr.len();
        chr[offset] = data;
    }

    fn mirroring(&self) -> Mirroring {
        self.mirroring
    }
}
