use super::addressing::AddrMode;
use super::Cpu;
use crate::Bus;

type Op = fn(&mut Cpu, &mut Bus);

#[rustfmt::skip]
pub const OP_FUNCS: [Op; 256] = [
//     00        01        02        03        04        05        06        07        08        09        0a        0b        0c        0d        0e        0f
    Cpu::brk, Cpu::ora, Cpu::stp, Cpu::stp, Cpu::stp, Cpu::ora, Cpu::asl, Cpu::stp, Cpu::php, Cpu::ora, Cpu::asl, Cpu::stp, Cpu::stp, Cpu::ora, Cpu::asl, Cpu::stp, // 00
    Cpu::bpl, Cpu::ora, Cpu::stp, Cpu::stp, Cpu::stp, Cpu::ora, Cpu::asl, Cpu::stp, Cpu::clc, Cpu::ora, Cpu::stp, Cpu::stp, Cpu::stp, Cpu::ora, Cpu::asl, Cpu::stp, // 01
    Cpu::jsr, Cpu::and, Cpu::stp, Cpu::stp, Cpu::bit, Cpu::and, Cpu::rol, Cpu::stp, Cpu::plp, Cpu::and, Cpu::rol, Cpu::stp, Cpu::bit, Cpu::and, Cpu::rol, Cpu::stp, // 02
    Cpu::bmi, Cpu::and, Cpu::stp, Cpu::stp, Cpu::stp, Cpu::and, Cpu::rol, Cpu::stp, Cpu::sec, Cpu::and, Cpu::stp, Cpu::stp, Cpu::stp, Cpu::and, Cpu::rol, Cpu::stp, // 03
    Cpu::rti, Cpu::eor, Cpu::stp, Cpu::stp, Cpu::stp, Cpu::eor, Cpu::lsr, Cpu::stp, Cpu::pha, Cpu::eor, Cpu::lsr, Cpu::stp, Cpu::jmp, Cpu::eor, Cpu::lsr, Cpu::stp, // 04
    Cpu::bvc, Cpu::eor, Cpu::stp, Cpu::stp, Cpu::stp, Cpu::eor, Cpu::lsr, Cpu::stp, Cpu::cli, Cpu::eor, Cpu::stp, Cpu::stp, Cpu::stp, Cpu::eor, Cpu::lsr, Cpu::stp, // 05
    Cpu::rts, Cpu::adc, Cpu::stp, Cpu::stp, Cpu::stp, Cpu::adc, Cpu::ror, Cpu::stp, Cpu::pla, Cpu::adc, Cpu::ror, Cpu::stp, Cpu::jmp, Cpu::adc, Cpu::ror, Cpu::stp, // 06
    Cpu::bvs, Cpu::adc, Cpu::stp, Cpu::stp, Cpu::stp, Cpu::adc, Cpu::ror, Cpu::stp, Cpu::sei, Cpu::adc, Cpu::stp, Cpu::stp, Cpu::stp, Cpu::adc, Cpu::ror, Cpu::stp, // 07
    Cpu::stp, Cpu::sta, Cpu::stp, Cpu::stp, Cpu::sty, Cpu::sta, Cpu::stx, Cpu::stp, Cpu::dey, Cpu::stp, Cpu::txa, Cpu::stp, Cpu::sty, Cpu::sta, Cpu::stx, Cpu::stp, // 08
    Cpu::bcc, Cpu::sta, Cpu::stp, Cpu::stp, Cpu::sty, Cpu::sta, Cpu::stx, Cpu::stp, Cpu::tya, Cpu::sta, Cpu::txs, Cpu::stp, Cpu::stp, Cpu::sta, Cpu::stp, Cpu::stp, // 09
    Cpu::ldy, Cpu::lda, Cpu::ldx, Cpu::stp, Cpu::ldy, Cpu::lda, Cpu::ldx, Cpu::stp, Cpu::tay, Cpu::lda, Cpu::tax, Cpu::stp, Cpu::ldy, Cpu::lda, Cpu::ldx, Cpu::stp, // 0a
    Cpu::bcs, Cpu::lda, Cpu::stp, Cpu::stp, Cpu::ldy, Cpu::lda, Cpu::ldx, Cpu::stp, Cpu::clv, Cpu::lda, Cpu::tsx, Cpu::stp, Cpu::ldy, Cpu::lda, Cpu::ldx, Cpu::stp, // 0b
    Cpu::cpy, Cpu::cmp, Cpu::stp, Cpu::stp, Cpu::cpy, Cpu::cmp, Cpu::dec, Cpu::stp, Cpu::iny, Cpu::cmp, Cpu::dex, Cpu::stp, Cpu::cpy, Cpu::cmp, Cpu::dec, Cpu::stp, // 0c
    Cpu::bne, Cpu::cmp, Cpu::stp, Cpu::stp, Cpu::stp, Cpu::cmp, Cpu::dec, Cpu::stp, Cpu::cld, Cpu::cmp, Cpu::stp, Cpu::stp, Cpu::stp, Cpu::cmp, Cpu::dec, Cpu::stp, // 0d
    Cpu::cpx, Cpu::sbc, Cpu::stp, Cpu::stp, Cpu::cpx, Cpu::sbc, Cpu::inc, Cpu::stp, Cpu::inx, Cpu::sbc, Cpu::nop, Cpu::stp, Cpu::cpx, Cpu::sbc, Cpu::inc, Cpu::stp, // 0e
    Cpu::beq, Cpu::sbc, Cpu::stp, Cpu::stp, Cpu::stp, Cpu::sbc, Cpu::inc, Cpu::stp, Cpu::sed, Cpu::sbc, Cpu::stp, Cpu::stp, Cpu::stp, Cpu::sbc, Cpu::inc, Cpu::stp, // 0f
];

#[rustfmt::skip]
pub const OP_NAMES: [&str; 256] = [
//   00     01     02     03     04     05     06     07     08     09     0a     0b     0c     0d     0e     0f
    "BRK", "ORA", "???", "???", "???", "ORA", "ASL", "???", "PHP", "ORA", "ASL", "???", "???", "ORA", "ASL", "???", // 00
    "BPL", "ORA", "???", "???", "???", "ORA", "ASL", "???", "CLC", "ORA", "???", "???", "???", "ORA", "ASL", "???", // 01
    "JSR", "AND", "???", "???", "BIT", "AND", "ROL", "???", "PLP", "AND", "ROL", "???", "BIT", "AND", "ROL", "???", // 02
    "BMI", "AND", "???", "???", "???", "AND", "ROL", "???", "SEC", "AND", "???", "???", "???", "AND", "ROL", "???", // 03
    "RTI", "EOR", "???", "???", "???", "EOR", "LSR", "???", "PHA", "EOR", "LSR", "???", "JMP", "EOR", "LSR", "???", // 04
    "BVC", "EOR", "???", "???", "???", "EOR", "LSR", "???", "CLI", "EOR", "???", "???", "???", "EOR", "LSR", "???", // 05
    "RTS", "ADC", "???", "???", "???", "ADC", "ROR", "???", "PLA", "ADC", "ROR", "???", "JMP", "ADC", "ROR", "???", // 06
    "BVS", "ADC", "???", "???", "???", "ADC", "ROR", "???", "SEI", "ADC", "???", "???", "???", "ADC", "ROR", "???", // 07
    "???", "STA", "???", "???", "STY", "STA", "STX", "???", "DEY", "???", "TXA", "???", "STY", "STA", "STX", "???", // 08
    "BCC", "STA", "???", "???", "STY", "STA", "STX", "???", "TYA", "STA", "TXS", "???", "???", "STA", "???", "???", // 09
    "LDY", "LDA", "LDX", "???", "LDY", "LDA", "LDX", "???", "TAY", "LDA", "TAX", "???", "LDY", "LDA", "LDX", "???", // 0a
    "BCS", "LDA", "???", "???", "LDY", "LDA", "LDX", "???", "CLV", "LDA", "TSX", "???", "LDY", "LDA", "LDX", "???", // 0b
    "CPY", "CMP", "???", "???", "CPY", "CMP", "DEC", "???", "INY", "CMP", "DEX", "???", "CPY", "CMP", "DEC", "???", // 0c
    "BNE", "CMP", "???", "???", "???", "CMP", "DEC", "???", "CLD", "CMP", "???", "???", "???", "CMP", "DEC", "???", // 0d
    "CPX", "SBC", "???", "???", "CPX", "SBC", "INC", "???", "INX", "SBC", "NOP", "???", "CPX", "SBC", "INC", "???", // 0e
    "BEQ", "SBC", "???", "???", "???", "SBC", "INC", "???", "SED", "SBC", "???", "???", "???", "SBC", "INC", "???", // 0f
];

/// Base cycle cost per opcode; page-cross and taken-branch penalties are
/// added during execution. Undefined opcodes never complete.
#[rustfmt::skip]
pub const OP_CYCLES: [u8; 256] = [
//  0  1  2  3  4  5  6  7  8  9  a  b  c  d  e  f
    7, 6, 0, 0, 0, 3, 5, 0, 3, 2, 2, 0, 0, 4, 6, 0, // 00
    2, 5, 0, 0, 0, 4, 6, 0, 2, 4, 0, 0, 0, 4, 7, 0, // 01
    6, 6, 0, 0, 3, 3, 5, 0, 4, 2, 2, 0, 4, 4, 6, 0, // 02
    2, 5, 0, 0, 0, 4, 6, 0, 2, 4, 0, 0, 0, 4, 7, 0, // 03
    6, 6, 0, 0, 0, 3, 5, 0, 3, 2, 2, 0, 3, 4, 6, 0, // 04
    2, 5, 0, 0, 0, 4, 6, 0, 2, 4, 0, 0, 0, 4, 7, 0, // 05
    6, 6, 0, 0, 0, 3, 5, 0, 4, 2, 2, 0, 5, 4, 6, 0, // 06
    2, 5, 0, 0, 0, 4, 6, 0, 2, 4, 0, 0, 0, 4, 7, 0, // 07
    0, 6, 0, 0, 3, 3, 3, 0, 2, 0, 2, 0, 4, 4, 4, 0, // 08
    2, 6, 0, 0, 4, 4, 4, 0, 2, 5, 2, 0, 0, 5, 0, 0, // 09
    2, 6, 2, 0, 3, 3, 3, 0, 2, 2, 2, 0, 4, 4, 4, 0, // 0a
    2, 5, 0, 0, 4, 4, 4, 0, 2, 4, 2, 0, 4, 4, 4, 0, // 0b
    2, 6, 0, 0, 3, 3, 5, 0, 2, 2, 2, 0, 4, 4, 6, 0, // 0c
    2, 5, 0, 0, 0, 4, 6, 0, 2, 4, 0, 0, 0, 4, 7, 0, // 0d
    2, 6, 0, 0, 3, 3, 5, 0, 2, 2, 2, 0, 4, 4, 6, 0, // 0e
    2, 5, 0, 0, 0, 4, 6, 0, 2, 4, 0, 0, 0, 4, 7, 0, // 0f
];

impl Cpu {
    fn get_operand(&self, bus: &mut Bus) -> u8 {
        match self.op_mode {
            AddrMode::IMP => unreachable!(),
            AddrMode::ACC => self.a,
            _ => bus.read(self.op_address),
        }
    }

    /// Indexed reads pay one extra cycle when the address crossed a page.
    fn cross_penalty(&mut self) {
        if self.cross_page {
            self.extra_cycles += 1;
        }
    }

    fn stp(&mut self, _: &mut Bus) {
        panic!("undefined opcode: {:#04x}", self.op);
    }

    fn nop(&mut self, _: &mut Bus) {}
}

/// arith
impl Cpu {
    fn adc(&mut self, bus: &mut Bus) {
        let op = self.get_operand(bus);
        self._adc(op);
        self.cross_penalty();
    }

    fn sbc(&mut self, bus: &mut Bus) {
        let op = self.get_operand(bus);
        self._adc(!op);
        self.cross_penalty();
    }

    fn and(&mut self, bus: &mut Bus) {
        self.a &= self.get_operand(bus);
        self.p.set_zn(self.a);
        self.cross_penalty();
    }

    fn ora(&mut self, bus: &mut Bus) {
        self.a |= self.get_operand(bus);
        self.p.set_zn(self.a);
        self.cross_penalty();
    }

    fn eor(&mut self, bus: &mut Bus) {
        self.a ^= self.get_operand(bus);
        self.p.set_zn(self.a);
        self.cross_penalty();
    }

    fn inc(&mut self, bus: &mut Bus) {
        let op = self.get_operand(bus).wrapping_add(1);
        bus.write(self.op_address, op);
        self.p.set_zn(op);
    }

    fn inx(&mut self, _: &mut Bus) {
        self.x = self.x.wrapping_add(1);
        self.p.set_zn(self.x);
    }

    fn iny(&mut self, _: &mut Bus) {
        self.y = self.y.wrapping_add(1);
        self.p.set_zn(self.y);
    }

    fn dec(&mut self, bus: &mut Bus) {
        let op = self.get_operand(bus).wrapping_sub(1);
        bus.write(self.op_address, op);
        self.p.set_zn(op);
    }

    fn dex(&mut self, _: &mut Bus) {
        self.x = self.x.wrapping_sub(1);
        self.p.set_zn(self.x);
    }

    fn dey(&mut self, _: &mut Bus) {
        self.y = self.y.wrapping_sub(1);
        self.p.set_zn(self.y);
    }

    fn rol(&mut self, bus: &mut Bus) {
        let c = self.p.c as u8;
        let op = self.get_operand(bus);
        self.p.c = (op & 0x80) != 0;

        let op = (op << 1) | c;
        self.p.set_zn(op);
        self.write_back(op, bus);
    }

    fn ror(&mut self, bus: &mut Bus) {
        let c = self.p.c as u8;
        let op = self.get_operand(bus);
        self.p.c = (op & 0x01) != 0;

        let op = (op >> 1) | (c << 7);
        self.p.set_zn(op);
        self.write_back(op, bus);
    }

    fn asl(&mut self, bus: &mut Bus) {
        let op = self.get_operand(bus);
        self.p.c = (op & 0x80) != 0;

        let op = op << 1;
        self.p.set_zn(op);
        self.write_back(op, bus);
    }

    fn lsr(&mut self, bus: &mut Bus) {
        let op = self.get_operand(bus);
        self.p.c = (op & 0x01) != 0;

        let op = op >> 1;
        self.p.set_zn(op);
        self.write_back(op, bus);
    }

    fn write_back(&mut self, op: u8, bus: &mut Bus) {
        if self.op_mode == AddrMode::ACC {
            self.a = op;
        } else {
            bus.write(self.op_address, op);
        }
    }
}

/// branch and jump
impl Cpu {
    fn brk(&mut self, bus: &mut Bus) {
        // the byte after BRK is padding and is skipped on return
        self.pc = self.pc.wrapping_add(1);
        self.push_word(self.pc, bus);
        self.push_byte(self.p.to_u8() | 0b0001_0000, bus);
        self.p.i = true;
        self.pc = self.read_word(super::IRQ_VECTOR, bus);
    }

    fn bcc(&mut self, bus: &mut Bus) {
        self._branch(!self.p.c, bus);
    }

    fn bcs(&mut self, bus: &mut Bus) {
        self._branch(self.p.c, bus);
    }

    fn beq(&mut self, bus: &mut Bus) {
        self._branch(self.p.z, bus);
    }

    fn bmi(&mut self, bus: &mut Bus) {
        self._branch(self.p.n, bus);
    }

    fn bne(&mut self, bus: &mut Bus) {
        self._branch(!self.p.z, bus);
    }

    fn bpl(&mut self, bus: &mut Bus) {
        self._branch(!self.p.n, bus);
    }

    fn bvc(&mut self, bus: &mut Bus) {
        self._branch(!self.p.v, bus);
    }

    fn bvs(&mut self, bus: &mut Bus) {
        self._branch(self.p.v, bus);
    }

    fn jmp(&mut self, _: &mut Bus) {
        self.pc = self.op_address;
    }

    fn jsr(&mut self, bus: &mut Bus) {
        self.push_word(self.pc.wrapping_sub(1), bus);
        self.pc = self.op_address;
    }

    fn rti(&mut self, bus: &mut Bus) {
        self.p = self.pop_byte(bus).into();
        self.pc = self.pop_word(bus);
    }

    fn rts(&mut self, bus: &mut Bus) {
        let addr = self.pop_word(bus);
        self.pc = addr.wrapping_add(1);
    }
}

/// move
impl Cpu {
    fn lda(&mut self, bus: &mut Bus) {
        self.a = self.get_operand(bus);
        self.p.set_zn(self.a);
        self.cross_penalty();
    }

    fn ldx(&mut self, bus: &mut Bus) {
        self.x = self.get_operand(bus);
        self.p.set_zn(self.x);
        self.cross_penalty();
    }

    fn ldy(&mut self, bus: &mut Bus) {
        self.y = self.get_operand(bus);
        self.p.set_zn(self.y);
        self.cross_penalty();
    }

    fn pha(&mut self, bus: &mut Bus) {
        self.push_byte(self.a, bus);
    }

    fn php(&mut self, bus: &mut Bus) {
        self.push_byte(self.p.to_u8() | 0b0001_0000, bus);
    }

    fn pla(&mut self, bus: &mut Bus) {
        self.a = self.pop_byte(bus);
        self.p.set_zn(self.a);
    }

    fn plp(&mut self, bus: &mut Bus) {
        self.p = self.pop_byte(bus).into();
    }

    fn sta(&mut self, bus: &mut Bus) {
        bus.write(self.op_address, self.a);
    }

    fn stx(&mut self, bus: &mut Bus) {
        bus.write(self.op_address, self.x);
    }

    fn sty(&mut self, bus: &mut Bus) {
        bus.write(self.op_address, self.y);
    }

    fn tax(&mut self, _: &mut Bus) {
        self.x = self.a;
        self.p.set_zn(self.x);
    }

    fn tay(&mut self, _: &mut Bus) {
        self.y = self.a;
        self.p.set_zn(self.y);
    }

    fn tsx(&mut self, _: &mut Bus) {
        self.x = self.sp;
        self.p.set_zn(self.x);
    }

    fn txs(&mut self, _: &mut Bus) {
        self.sp = self.x;
    }

    fn txa(&mut self, _: &mut Bus) {
        self.a = self.x;
        self.p.set_zn(self.a);
    }

    fn tya(&mut self, _: &mut Bus) {
        self.a = self.y;
        self.p.set_zn(self.a);
    }
}

/// flags
impl Cpu {
    fn bit(&mut self, bus: &mut Bus) {
        let op = self.get_operand(bus);
        self.p.z = (self.a & op) == 0;
        self.p.n = (op & 0x80) != 0;
        self.p.v = (op & 0x40) != 0;
    }

    fn cmp(&mut self, bus: &mut Bus) {
        let op = self.get_operand(bus);
        self._cmp(self.a, op);
        self.cross_penalty();
    }

    fn cpx(&mut self, bus: &mut Bus) {
        let op = self.get_operand(bus);
        self._cmp(self.x, op);
    }

    fn cpy(&mut self, bus: &mut Bus) {
        let op = self.get_operand(bus);
        self._cmp(self.y, op);
    }

    fn clc(&mut self, _: &mut Bus) {
        self.p.c = false;
    }

    fn cld(&mut self, _: &mut Bus) {
        self.p.d = false;
    }

    fn cli(&mut self, _: &mut Bus) {
        self.p.i = false;
    }

    fn clv(&mut self, _: &mut Bus) {
        self.p.v = false;
    }

    fn sec(&mut self, _: &mut Bus) {
        self.p.c = true;
    }

    fn sed(&mut self, _: &mut Bus) {
        self.p.d = true;
    }

    fn sei(&mut self, _: &mut Bus) {
        self.p.i = true;
    }
}

impl Cpu {
    fn _adc(&mut self, op: u8) {
        let sum = self.a as u16 + op as u16 + self.p.c as u16;

        self.p.c = sum > 0xff;
        self.p.v = (!(self.a ^ op) & (self.a ^ sum as u8) & 0x80) != 0;
        self.a = sum as u8;
        self.p.set_zn(self.a);
    }

    fn _branch(&mut self, taken: bool, _: &mut Bus) {
        if taken {
            self.extra_cycles += 1;
            self.pc = self.op_address;
            self.cross_penalty();
        }
    }

    fn _cmp(&mut self, a: u8, b: u8) {
        self.p.c = a >= b;
        self.p.z = a == b;
        self.p.n = (a.wrapping_sub(b) & 0x80) != 0;
    }
}
