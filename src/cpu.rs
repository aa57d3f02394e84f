use crate::bus::Bus;
use addressing::{AddrMode, ADDR_MODES};
use serde::{Deserialize, Serialize};
use status::Status;

mod addressing;
mod op_code;
mod status;

pub const INT_NMI: u8 = 1 << 0;
pub const INT_IRQ: u8 = 1 << 1;

pub const NMI_VECTOR: u16 = 0xfffa;
pub const RESET_VECTOR: u16 = 0xfffc;
pub const IRQ_VECTOR: u16 = 0xfffe;

const INTERRUPT_CYCLES: usize = 7;

#[derive(Serialize, Deserialize)]
pub struct Cpu {
    a: u8,
    x: u8,
    y: u8,
    pc: u16,
    sp: u8,
    p: Status,

    op: u8,
    op_mode: AddrMode,
    op_address: u16,
    cross_page: bool,
    extra_cycles: usize,

    // pending interrupt lines, see INT_*
    interrupts: u8,
    break_halts: bool,
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}

impl Cpu {
    pub fn new() -> Self {
        Self {
            a: 0,
            x: 0,
            y: 0,
            pc: 0,
            sp: 0xfd,
            p: 0x24u8.into(),

            op: 0xea,
            op_mode: AddrMode::IMP,
            op_address: 0,
            cross_page: false,
            extra_cycles: 0,

            interrupts: 0,
            break_halts: false,
        }
    }

    /// When set, a fetched BRK halts execution (`exec` returns 0) instead
    /// of vectoring, so freestanding programs terminate cleanly.
    pub fn set_halt_on_brk(&mut self, halt: bool) {
        self.break_halts = halt;
    }

    /// Executes one pending interrupt or one instruction and returns the
    /// cycles consumed. Zero means a halting BRK was fetched.
    pub fn exec(&mut self, bus: &mut Bus) -> usize {
        if self.interrupts & INT_NMI != 0 {
            self.interrupts &= !INT_NMI;
            return self.interrupt(bus, NMI_VECTOR);
        }
        if self.interrupts & INT_IRQ != 0 && !self.p.i {
            self.interrupts &= !INT_IRQ;
            return self.interrupt(bus, IRQ_VECTOR);
        }

        self.extra_cycles = 0;
        self.op = self.fetch_byte(bus);
        if self.op == 0x00 && self.break_halts {
            return 0;
        }

        self.addressing(self.op, bus);

        let func = op_code::OP_FUNCS[self.op as usize];
        func(self, bus);

        op_code::OP_CYCLES[self.op as usize] as usize + self.extra_cycles
    }

    pub fn reset(&mut self, bus: &mut Bus) {
        self.pc = self.read_word(RESET_VECTOR, bus);
        self.sp = 0xfd;
        self.p = 0x24u8.into();
        self.interrupts = 0;
    }

    pub fn raise(&mut self, flag: u8) {
        self.interrupts |= flag;
    }

    pub fn clear(&mut self, flag: u8) {
        self.interrupts &= !flag;
    }

    pub fn pc(&self) -> u16 {
        self.pc
    }

    pub fn set_pc(&mut self, addr: u16) {
        self.pc = addr;
    }

    pub fn a(&self) -> u8 {
        self.a
    }

    pub fn x(&self) -> u8 {
        self.x
    }

    pub fn y(&self) -> u8 {
        self.y
    }

    pub fn sp(&self) -> u8 {
        self.sp
    }

    pub fn status(&self) -> u8 {
        self.p.to_u8()
    }

    /// One nestest-style disassembly line for the instruction at pc.
    pub fn trace(&self, bus: &Bus) -> String {
        use op_code::OP_NAMES;
        use std::fmt::Write;

        let op = bus.inspect(self.pc) as usize;
        let mut line = format!("{:04X}  {:02X}", self.pc, op);

        match ADDR_MODES[op] {
            AddrMode::IMP | AddrMode::ACC => {
                let _ = write!(line, "        {}", OP_NAMES[op]);
            }
            AddrMode::ABS | AddrMode::ABX | AddrMode::ABY | AddrMode::IND => {
                let lb = bus.inspect(self.pc.wrapping_add(1));
                let hb = bus.inspect(self.pc.wrapping_add(2));
                let _ = write!(line, " {:02X} {:02X}  {}", lb, hb, OP_NAMES[op]);
            }
            _ => {
                let op1 = bus.inspect(self.pc.wrapping_add(1));
                let _ = write!(line, " {:02X}     {}", op1, OP_NAMES[op]);
            }
        }

        let _ = write!(
            line,
            " A:{:02X} X:{:02X} Y:{:02X} P:{:02X} SP:{:02X}",
            self.a,
            self.x,
            self.y,
            self.p.to_u8(),
            self.sp,
        );
        line
    }

    fn interrupt(&mut self, bus: &mut Bus, vector: u16) -> usize {
        self.push_word(self.pc, bus);
        self.push_byte(self.p.to_u8(), bus);
        self.p.i = true;
        self.pc = self.read_word(vector, bus);
        INTERRUPT_CYCLES
    }
}

impl Cpu {
    fn fetch_byte(&mut self, bus: &mut Bus) -> u8 {
        let b = bus.read(self.pc);
        self.pc = self.pc.wrapping_add(1);
        b
    }

    fn fetch_word(&mut self, bus: &mut Bus) -> u16 {
        let d = self.read_word(self.pc, bus);
        self.pc = self.pc.wrapping_add(2);
        d
    }

    fn read_word(&mut self, addr: u16, bus: &mut Bus) -> u16 {
        let lb = bus.read(addr) as u16;
        let hb = bus.read(addr.wrapping_add(1)) as u16;
        (hb << 8) | lb
    }

    fn push_byte(&mut self, b: u8, bus: &mut Bus) {
        bus.write(0x100 + self.sp as u16, b);
        self.sp = self.sp.wrapping_sub(1);
    }

    fn pop_byte(&mut self, bus: &mut Bus) -> u8 {
        self.sp = self.sp.wrapping_add(1);
        bus.read(0x100 + self.sp as u16)
    }

    fn push_word(&mut self, b: u16, bus: &mut Bus) {
        self.push_byte((b >> 8) as u8, bus);
        self.push_byte(b as u8, bus);
    }

    fn pop_word(&mut self, bus: &mut Bus) -> u16 {
        let lb = self.pop_byte(bus) as u16;
        let hb = self.pop_byte(bus) as u16;
        (hb << 8) | lb
    }
}
