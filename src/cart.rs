use bit_field::BitField;
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::{Path, PathBuf};

mod mapper000;
mod mapper001;
mod mapper004;
mod mapper009;

pub const PRG_BANK_SIZE: usize = 0x4000;
pub const CHR_BANK_SIZE: usize = 0x2000;

const HEADER_SIZE: usize = 0x10;
const TRAINER_SIZE: usize = 0x200;
const PRG_RAM_UNIT: usize = 0x2000;
const CHR_RAM_SIZE: usize = 0x2000;
const EXPANSION_SIZE: usize = 0x1fe0;

const MIRRORING_MAP: [[usize; 4]; 5] = [
    [0x000, 0x000, 0x400, 0x400], // Horizontal
    [0x000, 0x400, 0x000, 0x400], // Vertical
    [0x000, 0x000, 0x000, 0x000], // SingleScreen0
    [0x400, 0x400, 0x400, 0x400], // SingleScreen1
    [0x000, 0x400, 0x800, 0xc00], // FourScreen
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(usize)]
pub enum Mirroring {
    Horizontal = 0,
    Vertical = 1,
    SingleScreen0 = 2,
    SingleScreen1 = 3,
    FourScreen = 4,
}

#[derive(Debug, thiserror::Error)]
pub enum CartridgeError {
    #[error("not an iNES image (bad magic)")]
    BadMagic,
    #[error("truncated iNES image")]
    Truncated,
    #[error("unsupported mapper {0:03}")]
    UnsupportedMapper(u8),
    #[error("unsupported console type {0}")]
    UnsupportedConsole(u8),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Sizes and flags decoded from the 16 byte iNES header.
#[derive(Debug, Clone, Copy)]
struct InesConfig {
    mapper: u8,
    mirroring: Mirroring,
    battery: bool,
    trainer: bool,
    prg_banks: usize,
    chr_banks: usize,
    prg_ram_units: usize,
}

impl InesConfig {
    fn parse(header: &[u8]) -> Result<Self, CartridgeError> {
        if header.len() < HEADER_SIZE {
            return Err(CartridgeError::Truncated);
        }
        if header[..4] != [b'N', b'E', b'S', 0x1a] {
            return Err(CartridgeError::BadMagic);
        }

        let f6 = header[6];
        let f7 = header[7];
        let ines2 = f7 & 0b1100 == 0b1000;

        let console = if ines2 { f7 & 0b11 } else { f7 & 0b01 };
        if console != 0 {
            return Err(CartridgeError::UnsupportedConsole(console));
        }

        let mirroring = if f6.get_bit(3) {
            Mirroring::FourScreen
        } else if f6.get_bit(0) {
            Mirroring::Vertical
        } else {
            Mirroring::Horizontal
        };

        let mut prg_banks = header[4] as usize;
        let mut chr_banks = header[5] as usize;
        if ines2 {
            prg_banks |= ((header[9] & 0x0f) as usize) << 8;
            chr_banks |= ((header[9] & 0xf0) as usize) << 4;
        }

        Ok(Self {
            mapper: (f7 & 0xf0) | (f6 >> 4),
            mirroring,
            battery: f6.get_bit(1),
            trainer: f6.get_bit(2),
            prg_banks,
            chr_banks,
            // value 0 infers 1 unit (8 KB) for compatibility
            prg_ram_units: (header[8] as usize).max(1),
        })
    }
}

#[derive(Serialize, Deserialize)]
pub struct Cartridge {
    expansion: Vec<u8>,
    prg_ram: Vec<u8>,
    prg_rom: Vec<u8>,
    chr: Vec<u8>,
    chr_writable: bool,

    battery: bool,
    header_mirroring: Mirroring,
    rom_name: String,
    prg_hash: String,

    #[serde(with = "mapper_codec")]
    mapper: Box<dyn Mapper>,
}

impl Cartridge {
    pub fn load(data: &[u8], rom_name: &str) -> Result<Self, CartridgeError> {
        let config = InesConfig::parse(data)?;

        let prg_offset = HEADER_SIZE + config.trainer as usize * TRAINER_SIZE;
        let prg_len = config.prg_banks * PRG_BANK_SIZE;
        let chr_offset = prg_offset + prg_len;
        let chr_len = config.chr_banks * CHR_BANK_SIZE;
        if data.len() < chr_offset + chr_len {
            return Err(CartridgeError::Truncated);
        }

        let prg_rom = data[prg_offset..][..prg_len].to_vec();
        let chr_writable = config.chr_banks == 0;
        let chr = if chr_writable {
            vec![0u8; CHR_RAM_SIZE]
        } else {
            data[chr_offset..][..chr_len].to_vec()
        };

        log::info!(
            "{}: mapper {:03}, {} x 16KB PRG, {} x 8KB CHR, {:?}{}",
            rom_name,
            config.mapper,
            config.prg_banks,
            config.chr_banks,
            config.mirroring,
            if config.battery { ", battery" } else { "" },
        );

        let mut cart = Self {
            expansion: vec![0u8; EXPANSION_SIZE],
            prg_ram: vec![0u8; config.prg_ram_units * PRG_RAM_UNIT],
            prg_hash: format!("{:x}", md5::compute(&prg_rom)),
            prg_rom,
            chr,
            chr_writable,

            battery: config.battery,
            header_mirroring: config.mirroring,
            rom_name: rom_name.to_string(),

            mapper: make_mapper(config.mapper, config.mirroring, config.prg_banks)
                .ok_or(CartridgeError::UnsupportedMapper(config.mapper))?,
        };
        cart.load_battery_ram();
        Ok(cart)
    }

    pub fn from_file(path: &Path) -> Result<Self, CartridgeError> {
        let mut data = Vec::new();
        std::fs::File::open(path)?.read_to_end(&mut data)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self::load(&data, &name)
    }

    /// A blank 32KB writable NROM cartridge for self-contained test programs.
    pub fn empty() -> Self {
        Self {
            expansion: vec![0u8; EXPANSION_SIZE],
            prg_ram: vec![0u8; PRG_RAM_UNIT],
            prg_rom: vec![0u8; 2 * PRG_BANK_SIZE],
            chr: vec![0u8; CHR_RAM_SIZE],
            chr_writable: true,

            battery: false,
            header_mirroring: Mirroring::Horizontal,
            rom_name: String::new(),
            prg_hash: String::new(),

            mapper: Box::new(mapper000::Mapper000::new(Mirroring::Horizontal, 2)),
        }
    }

    pub fn read(&self, addr: u16) -> u8 {
        match addr {
            0x4020..=0x5fff => self.expansion[addr as usize - 0x4020],
            0x6000..=0x7fff => self.prg_ram[(addr as usize - 0x6000) % self.prg_ram.len()],
            0x8000..=0xffff => self.mapper.read_prg(&self.prg_rom, addr),
            _ => unreachable!(),
        }
    }

    pub fn write(&mut self, addr: u16, data: u8) {
        match addr {
            0x4020..=0x5fff => self.expansion[addr as usize - 0x4020] = data,
            0x6000..=0x7fff => {
                let len = self.prg_ram.len();
                self.prg_ram[(addr as usize - 0x6000) % len] = data;
            }
            0x8000..=0xffff => self.mapper.write_prg(&mut self.prg_rom, addr, data),
            _ => unreachable!(),
        }
    }

    pub fn read_chr(&self, addr: u16) -> u8 {
        self.mapper.read_chr(&self.chr, addr)
    }

    pub fn write_chr(&mut self, addr: u16, data: u8) {
        if self.chr_writable {
            self.mapper.write_chr(&mut self.chr, addr, data);
        }
    }

    /// Physical VRAM offset for a nametable address under the current
    /// mirroring. Pure; decoding an address twice yields the same offset.
    pub fn nm_addr(&self, addr: u16) -> usize {
        let n = (addr as usize & 0xeff) >> 10;
        let addr = addr as usize & 0x3ff;
        MIRRORING_MAP[self.mapper.mirroring() as usize][n] + addr
    }

    pub fn mirroring(&self) -> Mirroring {
        self.mapper.mirroring()
    }

    pub fn mapper_id(&self) -> u8 {
        self.mapper.id()
    }

    pub fn battery(&self) -> bool {
        self.battery
    }

    pub(crate) fn update_scanline(&mut self) {
        self.mapper.update_scanline();
    }

    pub(crate) fn poll_irq(&mut self) -> bool {
        self.mapper.poll_irq()
    }

    /// Drops all mapper state back to power-on; ROM, RAM and CHR survive.
    pub fn reset(&mut self) {
        let id = self.mapper.id();
        let prg_banks = self.prg_rom.len() / PRG_BANK_SIZE;
        self.mapper =
            make_mapper(id, self.header_mirroring, prg_banks).expect("mapper id validated at load");
    }

    /// Test hook: patch the PRG ROM directly, e.g. to plant vectors.
    pub fn write_rom16(&mut self, addr: u16, val: u16) {
        let base = (addr as usize - 0x8000) % self.prg_rom.len();
        self.prg_rom[base] = val as u8;
        self.prg_rom[base + 1] = (val >> 8) as u8;
    }

    /// Where full-machine snapshots for this cartridge live.
    pub(crate) fn state_path(&self) -> Option<PathBuf> {
        self.save_path().map(|p| p.with_extension("state"))
    }

    fn save_path(&self) -> Option<PathBuf> {
        if self.rom_name.is_empty() {
            return None;
        }
        let mut path = dirs::config_dir()?;
        path.push("renes");
        path.push(format!("{}_{}", self.rom_name, self.prg_hash));
        Some(path)
    }

    fn load_battery_ram(&mut self) {
        if !self.battery {
            return;
        }
        let Some(path) = self.save_path() else { return };
        match std::fs::read(&path) {
            Ok(data) if data.len() == self.prg_ram.len() => self.prg_ram = data,
            Ok(_) => log::warn!("save file {} has a stale size, ignoring", path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => log::warn!("failed to read save file {}: {}", path.display(), e),
        }
    }

    pub(crate) fn save_battery_ram(&self) {
        if !self.battery {
            return;
        }
        let Some(path) = self.save_path() else { return };
        let write = || -> std::io::Result<()> {
            if let Some(dir) = path.parent() {
                std::fs::create_dir_all(dir)?;
            }
            std::fs::write(&path, &self.prg_ram)
        };
        if let Err(e) = write() {
            log::warn!("failed to write save file {}: {}", path.display(), e);
        }
    }
}

erased_serde::serialize_trait_object!(Mapper);

#[allow(unused_variables)]
pub trait Mapper: erased_serde::Serialize + Send + Sync {
    fn id(&self) -> u8;

    fn read_prg(&self, prg: &[u8], addr: u16) -> u8;
    fn write_prg(&mut self, prg: &mut [u8], addr: u16, data: u8) {}

    fn read_chr(&self, chr: &[u8], addr: u16) -> u8;
    fn write_chr(&mut self, chr: &mut [u8], addr: u16, data: u8) {
        chr[addr as usize] = data;
    }

    fn update_scanline(&mut self) {}
    fn poll_irq(&mut self) -> bool {
        false
    }

    fn mirroring(&self) -> Mirroring;
}

fn make_mapper(id: u8, mirroring: Mirroring, prg_banks: usize) -> Option<Box<dyn Mapper>> {
    Some(match id {
        0 => Box::new(mapper000::Mapper000::new(mirroring, prg_banks)),
        1 => Box::new(mapper001::Mapper001::new(mirroring, prg_banks)),
        4 => Box::new(mapper004::Mapper004::new(mirroring, prg_banks)),
        9 => Box::new(mapper009::Mapper009::new(mirroring, prg_banks)),
        _ => return None,
    })
}

mod mapper_codec {
    use super::*;
    use serde::ser::SerializeTuple;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S>(m: &Box<dyn Mapper>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut tuple = serializer.serialize_tuple(2)?;
        tuple.serialize_element(&m.id())?;
        tuple.serialize_element(m)?;
        tuple.end()
    }

    struct MapperVisitor;

    impl<'de> serde::de::Visitor<'de> for MapperVisitor {
        type Value = Box<dyn Mapper>;

        fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
        where
            A: serde::de::SeqAccess<'de>,
        {
            use serde::de::Error;

            let id = seq
                .next_element::<u8>()?
                .ok_or_else(|| A::Error::custom("missing mapper id"))?;
            let missing = || A::Error::custom("missing mapper state");
            Ok(match id {
                0 => Box::new(
                    seq.next_element::<mapper000::Mapper000>()?
                        .ok_or_else(missing)?,
                ) as Box<dyn Mapper>,
                1 => Box::new(
                    seq.next_element::<mapper001::Mapper001>()?
                        .ok_or_else(missing)?,
                ),
                4 => Box::new(
                    seq.next_element::<mapper004::Mapper004>()?
                        .ok_or_else(missing)?,
                ),
                9 => Box::new(
                    seq.next_element::<mapper009::Mapper009>()?
                        .ok_or_else(missing)?,
                ),
                _ => return Err(A::Error::custom(format!("unknown mapper id {}", id))),
            })
        }

        fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
            formatter.write_str("an (id, state) mapper tuple")
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Box<dyn Mapper>, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_tuple(2, MapperVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ines(mapper: u8, prg_banks: u8, chr_banks: u8, flags6: u8) -> Vec<u8> {
        let mut data = vec![0u8; HEADER_SIZE];
        data[..4].copy_from_slice(&[b'N', b'E', b'S', 0x1a]);
        data[4] = prg_banks;
        data[5] = chr_banks;
        data[6] = (mapper << 4) | flags6;
        data[7] = mapper & 0xf0;
        data.resize(
            HEADER_SIZE + prg_banks as usize * PRG_BANK_SIZE + chr_banks as usize * CHR_BANK_SIZE,
            0,
        );
        data
    }

    #[test]
    fn rejects_bad_magic() {
        let mut data = ines(0, 1, 1, 0);
        data[0] = b'X';
        assert!(matches!(
            Cartridge::load(&data, ""),
            Err(CartridgeError::BadMagic)
        ));
    }

    #[test]
    fn rejects_truncated_image() {
        let mut data = ines(0, 2, 1, 0);
        data.truncate(HEADER_SIZE + PRG_BANK_SIZE);
        assert!(matches!(
            Cartridge::load(&data, ""),
            Err(CartridgeError::Truncated)
        ));
    }

    #[test]
    fn rejects_unknown_mapper() {
        let data = ines(7, 1, 1, 0);
        assert!(matches!(
            Cartridge::load(&data, ""),
            Err(CartridgeError::UnsupportedMapper(0x07))
        ));
    }

    #[test]
    fn chr_ram_allocated_when_header_has_no_chr() {
        let data = ines(0, 1, 0, 0);
        let mut cart = Cartridge::load(&data, "").unwrap();
        cart.write_chr(0x0123, 0xab);
        assert_eq!(cart.read_chr(0x0123), 0xab);
    }

    #[test]
    fn reload_is_deterministic() {
        let mut data = ines(1, 2, 1, 0b0011);
        data[HEADER_SIZE] = 0x5a;
        let a = Cartridge::load(&data, "").unwrap();
        let b = Cartridge::load(&data, "").unwrap();
        assert_eq!(a.mapper_id(), b.mapper_id());
        assert_eq!(a.mirroring(), b.mirroring());
        assert_eq!(a.battery(), b.battery());
        assert!(a.battery());
        assert_eq!(a.prg_rom, b.prg_rom);
        assert_eq!(a.chr, b.chr);
        assert_eq!(a.prg_hash, b.prg_hash);
    }

    #[test]
    fn nm_addr_is_idempotent_for_every_mirroring() {
        let mut cart = Cartridge::empty();
        for mode in [
            Mirroring::Horizontal,
            Mirroring::Vertical,
            Mirroring::SingleScreen0,
            Mirroring::SingleScreen1,
            Mirroring::FourScreen,
        ] {
            cart.mapper = Box::new(mapper000::Mapper000::new(mode, 2));
            for addr in 0x2000..0x3000u16 {
                let off = cart.nm_addr(addr);
                assert_eq!(off, cart.nm_addr(addr));
                assert!(off < 0x1000);
            }
        }
    }

    #[test]
    fn horizontal_and_vertical_mirroring_pair_the_right_tables() {
        let mut cart = Cartridge::empty();
        cart.mapper = Box::new(mapper000::Mapper000::new(Mirroring::Horizontal, 2));
        assert_eq!(cart.nm_addr(0x2000), cart.nm_addr(0x2400));
        assert_eq!(cart.nm_addr(0x2800), cart.nm_addr(0x2c00));
        assert_ne!(cart.nm_addr(0x2000), cart.nm_addr(0x2800));

        cart.mapper = Box::new(mapper000::Mapper000::new(Mirroring::Vertical, 2));
        assert_eq!(cart.nm_addr(0x2000), cart.nm_addr(0x2800));
        assert_eq!(cart.nm_addr(0x2400), cart.nm_addr(0x2c00));
        assert_ne!(cart.nm_addr(0x2000), cart.nm_addr(0x2400));
    }
}
