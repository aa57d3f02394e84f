use crate::apu::Apu;
use crate::cart::Cartridge;
use crate::ppu::Ppu;
use serde::{Deserialize, Serialize};

mod dma;
mod joystick;

pub use joystick::Button;

use dma::Dma;
use joystick::Joystick;

const RAM_SIZE: usize = 0x0800;

/// CPU-side address decoder, owning every device the CPU can reach.
#[derive(Serialize, Deserialize)]
pub struct Bus {
    ram: Vec<u8>,

    ppu: Ppu,
    apu: Apu,
    cart: Cartridge,
    joystick: Joystick,
    dma: Dma,

    io_warned: bool,
}

impl Bus {
    pub fn new(cart: Cartridge) -> Self {
        Self {
            ram: vec![0u8; RAM_SIZE],

            ppu: Ppu::new(),
            apu: Apu::default(),
            cart,
            joystick: Joystick::default(),
            dma: Dma::default(),

            io_warned: false,
        }
    }

    pub fn read(&mut self, addr: u16) -> u8 {
        match addr {
            0x0000..=0x1fff => self.ram[addr as usize & 0x07ff],
            0x2000..=0x3fff => self.ppu.read(&self.cart, addr),
            0x4015 => self.apu.read(addr),
            0x4016..=0x4017 => self.joystick.read(addr),
            // the rest of the APU/DMA block is write-only
            0x4000..=0x4014 => 0x00,
            0x4018..=0x401f => {
                if !self.io_warned {
                    self.io_warned = true;
                    log::warn!("read from unmapped I/O {:#06x}", addr);
                }
                0x00
            }
            0x4020..=0xffff => self.cart.read(addr),
        }
    }

    pub fn write(&mut self, addr: u16, data: u8) {
        match addr {
            0x0000..=0x1fff => self.ram[addr as usize & 0x07ff] = data,
            0x2000..=0x3fff => self.ppu.write(&mut self.cart, addr, data),
            0x4014 => self.dma.start(data),
            0x4016 => self.joystick.write(data),
            0x4000..=0x4013 | 0x4015 | 0x4017 => self.apu.write(addr, data),
            0x4018..=0x401f => {}
            0x4020..=0xffff => self.cart.write(addr, data),
        }
    }

    /// Read without side effects, for traces and tests.
    pub fn inspect(&self, addr: u16) -> u8 {
        match addr {
            0x0000..=0x1fff => self.ram[addr as usize & 0x07ff],
            0x2000..=0x3fff => self.ppu.inspect(addr),
            0x4000..=0x401f => 0x00,
            0x4020..=0xffff => self.cart.read(addr),
        }
    }

    pub(crate) fn ppu_tick(&mut self) {
        self.ppu.tick(&mut self.cart);
    }

    pub(crate) fn apu_ticks(&mut self, n: usize) {
        for _ in 0..n {
            self.apu.tick();
        }
    }

    pub fn dma_active(&self) -> bool {
        self.dma.active()
    }

    pub(crate) fn dma_ticks(&mut self, n: usize) {
        for _ in 0..n {
            match self.dma.tick() {
                dma::Action::Read(addr) => {
                    let byte = self.read(addr);
                    self.dma.set_byte(byte);
                }
                dma::Action::Write(byte) => self.ppu.write_oam(byte),
                dma::Action::Idle => {}
            }
        }
    }

    pub(crate) fn take_nmi(&mut self) -> bool {
        self.ppu.take_nmi()
    }

    /// Level of the IRQ line, APU and cartridge sources combined.
    pub(crate) fn poll_irq(&mut self) -> bool {
        self.apu.poll_irq() | self.cart.poll_irq()
    }

    pub(crate) fn dmc_request(&mut self) -> Option<u16> {
        self.apu.dmc_request()
    }

    pub(crate) fn dmc_response(&mut self, data: u8) {
        self.apu.dmc_response(data);
    }

    pub fn poke(&mut self, port: usize, button: Button, pressed: bool) {
        self.joystick.poke(port, button, pressed);
    }

    pub(crate) fn reset(&mut self) {
        self.ppu.reset();
        self.apu.reset();
        self.dma.reset();
        self.joystick.reset();
        self.cart.reset();
    }

    pub fn ppu(&self) -> &Ppu {
        &self.ppu
    }

    pub fn ppu_mut(&mut self) -> &mut Ppu {
        &mut self.ppu
    }

    pub fn apu(&self) -> &Apu {
        &self.apu
    }

    pub fn apu_mut(&mut self) -> &mut Apu {
        &mut self.apu
    }

    pub fn cart(&self) -> &Cartridge {
        &self.cart
    }

    pub fn cart_mut(&mut self) -> &mut Cartridge {
        &mut self.cart
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bus() -> Bus {
        Bus::new(Cartridge::empty())
    }

    #[test]
    fn ram_mirrors_every_2k() {
        let mut bus = bus();
        bus.write(0x0000, 0x12);
        assert_eq!(bus.read(0x0800), 0x12);
        assert_eq!(bus.read(0x1800), 0x12);
    }

    #[test]
    fn ppu_registers_mirror_every_8_bytes() {
        let mut bus = bus();
        bus.write(0x2003, 0x05); // OAMADDR
        bus.write(0x200c, 0x77); // OAMDATA through a mirror
        bus.write(0x2003, 0x05);
        assert_eq!(bus.read(0x2004), 0x77);
    }

    #[test]
    fn unmapped_io_reads_zero_and_writes_vanish() {
        let mut bus = bus();
        bus.write(0x4018, 0xff);
        assert_eq!(bus.read(0x4018), 0x00);
        assert_eq!(bus.read(0x401f), 0x00);
    }

    #[test]
    fn prg_ram_lives_at_6000() {
        let mut bus = bus();
        bus.write(0x6123, 0xab);
        assert_eq!(bus.read(0x6123), 0xab);
    }
}
