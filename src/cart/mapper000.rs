use super::Mirroring;
use serde::{Deserialize, Serialize};

/// 000, NROM
///
/// 16 KB or 32 KB PRG, mirrored when only one bank,
/// 8 KB CHR
#[derive(Serialize, Deserialize)]
pub struct Mapper000 {
    prg_bank1: usize,
    mirroring: Mirroring,
}

impl Mapper000 {
    pub fn new(mirroring: Mirroring, prg_banks: usize) -> Self {
        Self {
            prg_bank1: prg_banks.max(1) - 1,
            mirroring,
        }
    }
}

impl super::Mapper for Mapper000 {
    fn id(&self) -> u8 {
        0
    }

    fn read_prg(&self, prg: &[u8], addr: u16) -> u8 {
        match addr {
            0x8000..=0xbfff => prg[addr as usize - 0x8000],
            0xc000..=0xffff => prg[addr as usize - 0xc000 + self.prg_bank1 * 0x4000],
            _ => unreachable!(),
        }
    }

    fn read_chr(&self, chr: &[u8], addr: u16) -> u8 {
        chr[addr as usize]
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
    fn single_bank_is_mirrored_into_both_windows() {
        let mapper = Mapper000::new(Mirroring::Vertical, 1);
        let mut prg = vec![0u8; 0x4000];
        prg[0x0123] = 0xab;
        assert_eq!(mapper.read_prg(&prg, 0x8123), 0xab);
        assert_eq!(mapper.read_prg(&prg, 0xc123), 0xab);
    }

    #[test]
    fn two_banks_map_first_and_last() {
        let mapper = Mapper000::new(Mirroring::Vertical, 2);
        let mut prg = vec![0u8; 0x8000];
        prg[0x0000] = 0x11;
        prg[0x4000] = 0x22;
        assert_eq!(mapper.read_prg(&prg, 0x8000), 0x11);
        assert_eq!(mapper.read_prg(&prg, 0xc000), 0x22);
    }
}
