use serde::{Deserialize, Serialize};

/// What the bus should do for the DMA engine this cycle.
#[derive(Debug, PartialEq, Eq)]
pub enum Action {
    /// alignment wait or nothing pending
    Idle,
    /// fetch a byte from CPU memory
    Read(u16),
    /// hand the fetched byte to the PPU OAM port
    Write(u8),
}

/// OAM DMA: 256 bytes from `$XX00` to OAMDATA, read on even internal
/// cycles and written on odd ones, after up to two alignment waits.
/// 513 or 514 cycles total, during which the CPU is stalled.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Dma {
    clock: usize,
    remaining: u16,
    byte: u8,
    cpu_addr: u16,
    delay: bool,
}

impl Dma {
    pub fn active(&self) -> bool {
        self.remaining > 0
    }

    /// A second write while active restarts the transfer; bytes already
    /// queued are discarded.
    pub fn start(&mut self, page: u8) {
        self.cpu_addr = (page as u16) << 8;
        self.remaining = 256;
    }

    pub fn set_byte(&mut self, byte: u8) {
        self.byte = byte;
    }

    pub fn reset(&mut self) {
        self.remaining = 0;
        self.delay = false;
    }

    pub fn tick(&mut self) -> Action {
        self.clock += 1;

        if self.remaining == 0 {
            // armed so that a transfer begins on an even cycle
            self.delay = true;
            return Action::Idle;
        }

        if self.delay {
            if self.clock % 2 == 1 {
                self.delay = false;
            }
            Action::Idle
        } else if self.clock % 2 == 0 {
            let addr = self.cpu_addr;
            self.cpu_addr = self.cpu_addr.wrapping_add(1);
            Action::Read(addr)
        } else {
            self.remaining -= 1;
            Action::Write(self.byte)
        }
    }
}
