#![allow(clippy::identity_op)]

pub mod apu;
pub mod bus;
pub mod cart;
pub mod cpu;
pub mod framebuffer;
pub mod nes;
pub mod ppu;
mod snapshot;

pub use apu::Apu;
pub use bus::{Bus, Button};
pub use cart::{Cartridge, CartridgeError, Mirroring};
pub use cpu::Cpu;
pub use framebuffer::{Framebuffer, FRAME_HEIGHT, FRAME_WIDTH};
pub use nes::{Nes, Request};
pub use ppu::Ppu;

/// NES NTSC master clock
pub const MASTER_CLOCK: f64 = 2147_7272.0;

/// cpu frequency
pub const CPU_FREQUENCY: f64 = MASTER_CLOCK / 12.0;

/// cpu cycles between two frame-sequencer clocks
pub const APU_FRAME_CYCLES: usize = 7457;
