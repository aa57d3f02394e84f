use crate::bus::{Bus, Button};
use crate::cart::Cartridge;
use crate::cpu::{Cpu, INT_IRQ, INT_NMI};
use crate::framebuffer::Framebuffer;
use crate::snapshot;
use crate::CPU_FREQUENCY;
use crossbeam_queue::ArrayQueue;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

// cycles the CPU loses to one DMC sample fetch
const DMC_STALL_CYCLES: usize = 4;

/// Host requests, applied at the next `step` boundary so that no
/// component is ever mutated mid-instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Request {
    Reset = 0,
    Save = 1,
    Load = 2,
    Stop = 3,
}

/// The machine: CPU plus the bus-owned PPU, APU, DMA, controllers and
/// cartridge, driven cycle by cycle.
#[derive(Serialize, Deserialize)]
pub struct Nes {
    cpu: Cpu,
    bus: Bus,

    requests: u8,
    stopped: bool,
}

impl Nes {
    pub fn new(cart: Cartridge) -> Self {
        let mut nes = Self {
            cpu: Cpu::new(),
            bus: Bus::new(cart),
            requests: 0,
            stopped: false,
        };
        nes.cpu.reset(&mut nes.bus);
        nes
    }

    /// Runs the machine for the given wall-clock slice.
    pub fn step(&mut self, seconds: f64) {
        let mut budget = (CPU_FREQUENCY * seconds) as i64;
        while budget > 0 {
            let cycles = self.clock();
            if cycles == 0 {
                break;
            }
            budget -= cycles as i64;
        }

        self.process_requests();
    }

    /// Runs for at least `cycles` CPU cycles.
    pub fn run_cycles(&mut self, cycles: usize) {
        let mut budget = cycles as i64;
        while budget > 0 {
            let n = self.clock();
            if n == 0 {
                break;
            }
            budget -= n as i64;
        }
    }

    /// One scheduler iteration: a CPU instruction (or one DMA stall
    /// cycle), then 3 PPU dots and one APU clock per CPU cycle. Returns
    /// the CPU cycles consumed; 0 only with halt-on-BRK.
    pub fn clock(&mut self) -> usize {
        let cycles = if self.bus.dma_active() {
            // the CPU does not fetch while the DMA engine runs
            1
        } else {
            self.cpu.exec(&mut self.bus)
        };
        if cycles == 0 {
            return 0;
        }

        let mut total = cycles;
        self.tick_devices(cycles);

        // a pending DMC fetch steals the bus from the CPU
        if let Some(addr) = self.bus.dmc_request() {
            let data = self.bus.read(addr);
            self.bus.dmc_response(data);
            self.tick_devices(DMC_STALL_CYCLES);
            total += DMC_STALL_CYCLES;
        }

        if self.bus.take_nmi() {
            self.cpu.raise(INT_NMI);
        }
        if self.bus.poll_irq() {
            self.cpu.raise(INT_IRQ);
        }

        total
    }

    fn tick_devices(&mut self, cycles: usize) {
        for _ in 0..3 * cycles {
            self.bus.ppu_tick();
        }
        self.bus.dma_ticks(cycles);
        self.bus.apu_ticks(cycles);
    }

    /// Latches a host request for the next `step` boundary.
    pub fn request(&mut self, request: Request) {
        self.requests |= 1 << request as u8;
    }

    fn process_requests(&mut self) {
        let requests = std::mem::take(&mut self.requests);
        let requested = |r: Request| requests & (1 << r as u8) != 0;

        if requested(Request::Reset) {
            self.reset();
        } else if requested(Request::Save) {
            self.save();
        } else if requested(Request::Load) {
            self.load();
        }

        if requested(Request::Stop) {
            self.bus.cart().save_battery_ram();
            self.stopped = true;
        }
    }

    pub fn stopped(&self) -> bool {
        self.stopped
    }

    /// Power-cycle of every unit; RAM, VRAM and cartridge memory keep
    /// their contents.
    pub fn reset(&mut self) {
        self.bus.reset();
        self.cpu.reset(&mut self.bus);
    }

    pub fn poke(&mut self, port: usize, button: Button, pressed: bool) {
        self.bus.poke(port, button, pressed);
    }

    pub fn framebuffer(&self) -> &Framebuffer {
        self.bus.ppu().framebuffer()
    }

    pub fn framebuffer_mut(&mut self) -> &mut Framebuffer {
        self.bus.ppu_mut().framebuffer_mut()
    }

    /// Mono f32 samples end up here once a sample rate is set.
    pub fn audio_queue(&self) -> Arc<ArrayQueue<f32>> {
        self.bus.apu().sampler().queue()
    }

    pub fn set_sample_rate(&mut self, rate: f64) {
        self.bus.apu_mut().set_sample_rate(rate);
    }

    pub fn set_sprite_limit(&mut self, limit: bool) {
        self.bus.ppu_mut().set_sprite_limit(limit);
    }

    /// See [`Cpu::set_halt_on_brk`].
    pub fn set_halt_on_brk(&mut self, halt: bool) {
        self.cpu.set_halt_on_brk(halt);
    }

    /// Runs until a halting BRK, returning the CPU cycles consumed.
    pub fn run_to_halt(&mut self) -> usize {
        let mut total = 0;
        loop {
            let n = self.clock();
            if n == 0 {
                return total;
            }
            total += n;
        }
    }

    /// Plants a program in RAM and points the reset vector at it.
    pub fn load_program(&mut self, addr: u16, code: &[u8]) {
        for (i, b) in code.iter().enumerate() {
            self.bus.write(addr + i as u16, *b);
        }
        self.bus.cart_mut().write_rom16(crate::cpu::RESET_VECTOR, addr);
        self.cpu.reset(&mut self.bus);
    }

    pub fn cpu(&self) -> &Cpu {
        &self.cpu
    }

    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut Bus {
        &mut self.bus
    }

    /// Serializes the full machine state.
    pub fn save_snapshot<W: std::io::Write>(&self, writer: W) -> bincode::Result<()> {
        snapshot::write_state(writer, self)
    }

    /// Restores a snapshot, keeping the live audio wiring of this
    /// instance.
    pub fn load_snapshot<R: std::io::Read>(&mut self, reader: R) -> bincode::Result<()> {
        let mut loaded: Nes = snapshot::read_state(reader)?;
        loaded
            .bus
            .apu_mut()
            .sampler_mut()
            .adopt(self.bus.apu().sampler());
        *self = loaded;
        Ok(())
    }

    fn save(&mut self) {
        let Some(path) = self.bus.cart().state_path() else {
            return;
        };
        let result = std::fs::File::create(&path)
            .map_err(bincode::Error::from)
            .and_then(|f| self.save_snapshot(std::io::BufWriter::new(f)));
        if let Err(e) = result {
            log::warn!("failed to save state to {}: {}", path.display(), e);
        }
    }

    fn load(&mut self) {
        let Some(path) = self.bus.cart().state_path() else {
            return;
        };
        let result = std::fs::File::open(&path)
            .map_err(bincode::Error::from)
            .and_then(|f| self.load_snapshot(std::io::BufReader::new(f)));
        if let Err(e) = result {
            log::warn!("failed to load state from {}: {}", path.display(), e);
        }
    }
}
