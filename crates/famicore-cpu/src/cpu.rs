//! 6502 CPU core.
//!
//! Execution is table-driven and cycle-counted: when the countdown for the
//! current instruction reaches zero the next opcode is fetched, the
//! addressing mode and operation run to completion, and the documented base
//! cycle count (plus page-cross and branch penalties) is loaded into the
//! countdown. Each [`Cpu::tick`] consumes exactly one CPU cycle, so the
//! system bus can interleave the CPU 1:3 with the PPU.
//!
//! Interrupts are sampled only at instruction boundaries: NMI is an edge
//! latch set by the PPU, IRQ a level driven by the mapper and the APU frame
//! counter.

use serde::{Deserialize, Serialize};

use crate::bus::Bus;
use crate::opcodes::{AddrMode, Operation, OPCODE_TABLE};
use crate::status::Status;

/// NMI vector address.
pub const NMI_VECTOR: u16 = 0xFFFA;
/// Reset vector address.
pub const RESET_VECTOR: u16 = 0xFFFC;
/// IRQ/BRK vector address.
pub const IRQ_VECTOR: u16 = 0xFFFE;

/// Stack page base.
const STACK_BASE: u16 = 0x0100;

/// Operand produced by address resolution.
struct Resolved {
    /// Effective address. For `Implied` this is unused; for `Relative`
    /// it is the branch target.
    addr: u16,
    /// Whether indexing crossed a page boundary.
    page_crossed: bool,
}

/// MOS 6502 CPU state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cpu {
    /// Accumulator.
    pub a: u8,
    /// X index register.
    pub x: u8,
    /// Y index register.
    pub y: u8,
    /// Stack pointer (stack lives at $0100 + SP).
    pub sp: u8,
    /// Program counter.
    pub pc: u16,
    /// Status flags.
    pub status: Status,
    /// Cycles left in the instruction currently executing.
    cycles_remaining: u8,
    /// Total cycles elapsed since power-up.
    cycles: u64,
    /// Edge-latched NMI request.
    nmi_pending: bool,
    /// Level-sensitive IRQ line.
    irq_line: bool,
}

impl Cpu {
    /// Creates a CPU in the power-up state. Call [`Cpu::reset`] with a bus
    /// before executing.
    #[must_use]
    pub fn new() -> Self {
        Self {
            a: 0,
            x: 0,
            y: 0,
            sp: 0xFD,
            pc: 0,
            status: Status::new(),
            cycles_remaining: 0,
            cycles: 0,
            nmi_pending: false,
            irq_line: false,
        }
    }

    /// Cold reset: PC from the reset vector, SP = $FD, P = $24, 8 cycles.
    pub fn reset(&mut self, bus: &mut impl Bus) {
        self.a = 0;
        self.x = 0;
        self.y = 0;
        self.sp = 0xFD;
        self.status = Status::new();
        self.pc = bus.read_u16(RESET_VECTOR);
        self.nmi_pending = false;
        self.irq_line = false;
        self.cycles_remaining = 8;
        self.cycles = 0;
    }

    /// Latch an NMI request. Edge-triggered; serviced at the next
    /// instruction boundary regardless of the I flag.
    pub fn set_nmi(&mut self) {
        self.nmi_pending = true;
    }

    /// Whether an NMI is latched and not yet serviced.
    #[must_use]
    pub fn pending_nmi(&self) -> bool {
        self.nmi_pending
    }

    /// Drive the IRQ line. Level-sensitive; serviced between instructions
    /// while low and I is clear.
    pub fn set_irq(&mut self, asserted: bool) {
        self.irq_line = asserted;
    }

    /// True between instructions (the countdown is empty).
    #[must_use]
    pub fn complete(&self) -> bool {
        self.cycles_remaining == 0
    }

    /// Total cycles elapsed since reset.
    #[must_use]
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Advance the CPU by one cycle.
    ///
    /// Returns true when the instruction in flight retires on this tick.
    pub fn tick(&mut self, bus: &mut impl Bus) -> bool {
        if self.cycles_remaining == 0 {
            if self.nmi_pending {
                self.nmi_pending = false;
                self.cycles_remaining = self.interrupt(bus, NMI_VECTOR);
            } else if self.irq_line && !self.status.contains(Status::I) {
                self.cycles_remaining = self.interrupt(bus, IRQ_VECTOR);
            } else {
                let opcode = bus.read(self.pc);
                self.pc = self.pc.wrapping_add(1);
                let info = &OPCODE_TABLE[opcode as usize];
                if info.operation == Operation::Xxx {
                    log::debug!(
                        "unknown opcode ${opcode:02X} at ${:04X}, executing as NOP",
                        self.pc.wrapping_sub(1)
                    );
                }

                let resolved = self.resolve(info.mode, bus);
                let (honors_cross, branch_extra) =
                    self.execute(info.operation, info.mode, resolved.addr, bus);

                let cross_penalty = u8::from(resolved.page_crossed && honors_cross);
                self.cycles_remaining = info.cycles + cross_penalty + branch_extra;
            }
        }

        self.cycles_remaining -= 1;
        self.cycles += 1;
        self.cycles_remaining == 0
    }

    /// Run whole instructions until one retires; returns cycles consumed.
    pub fn step(&mut self, bus: &mut impl Bus) -> u8 {
        let mut spent = 0;
        loop {
            spent += 1;
            if self.tick(bus) {
                return spent;
            }
        }
    }

    /// Push PC and status, set I, load PC from `vector`. Returns the cycle
    /// cost (interrupt entry takes 7 cycles).
    fn interrupt(&mut self, bus: &mut impl Bus, vector: u16) -> u8 {
        self.push_u16(bus, self.pc);
        self.push(bus, self.status.to_stack_byte(false));
        self.status.insert(Status::I);
        self.pc = bus.read_u16(vector);
        7
    }

    // ===== addressing ======================================================

    fn resolve(&mut self, mode: AddrMode, bus: &mut impl Bus) -> Resolved {
        match mode {
            AddrMode::Implied => Resolved {
                addr: 0,
                page_crossed: false,
            },
            AddrMode::Immediate => {
                let addr = self.pc;
                self.pc = self.pc.wrapping_add(1);
                Resolved {
                    addr,
                    page_crossed: false,
                }
            }
            AddrMode::ZeroPage => {
                let addr = u16::from(bus.read(self.pc));
                self.pc = self.pc.wrapping_add(1);
                Resolved {
                    addr,
                    page_crossed: false,
                }
            }
            AddrMode::ZeroPageX => {
                let base = bus.read(self.pc);
                self.pc = self.pc.wrapping_add(1);
                Resolved {
                    addr: u16::from(base.wrapping_add(self.x)),
                    page_crossed: false,
                }
            }
            AddrMode::ZeroPageY => {
                let base = bus.read(self.pc);
                self.pc = self.pc.wrapping_add(1);
                Resolved {
                    addr: u16::from(base.wrapping_add(self.y)),
                    page_crossed: false,
                }
            }
            AddrMode::Relative => {
                let offset = bus.read(self.pc) as i8;
                self.pc = self.pc.wrapping_add(1);
                let target = self.pc.wrapping_add(offset as u16);
                Resolved {
                    addr: target,
                    page_crossed: (target & 0xFF00) != (self.pc & 0xFF00),
                }
            }
            AddrMode::Absolute => {
                let addr = bus.read_u16(self.pc);
                self.pc = self.pc.wrapping_add(2);
                Resolved {
                    addr,
                    page_crossed: false,
                }
            }
            AddrMode::AbsoluteX => {
                let base = bus.read_u16(self.pc);
                self.pc = self.pc.wrapping_add(2);
                let addr = base.wrapping_add(u16::from(self.x));
                Resolved {
                    addr,
                    page_crossed: (addr & 0xFF00) != (base & 0xFF00),
                }
            }
            AddrMode::AbsoluteY => {
                let base = bus.read_u16(self.pc);
                self.pc = self.pc.wrapping_add(2);
                let addr = base.wrapping_add(u16::from(self.y));
                Resolved {
                    addr,
                    page_crossed: (addr & 0xFF00) != (base & 0xFF00),
                }
            }
            AddrMode::Indirect => {
                let pointer = bus.read_u16(self.pc);
                self.pc = self.pc.wrapping_add(2);
                // Hardware bug: the pointer high byte never leaves its page.
                let addr = bus.read_u16_wrap(pointer);
                Resolved {
                    addr,
                    page_crossed: false,
                }
            }
            AddrMode::IndexedIndirectX => {
                let base = bus.read(self.pc);
                self.pc = self.pc.wrapping_add(1);
                let pointer = base.wrapping_add(self.x);
                let lo = u16::from(bus.read(u16::from(pointer)));
                let hi = u16::from(bus.read(u16::from(pointer.wrapping_add(1))));
                Resolved {
                    addr: (hi << 8) | lo,
                    page_crossed: false,
                }
            }
            AddrMode::IndirectIndexedY => {
                let pointer = bus.read(self.pc);
                self.pc = self.pc.wrapping_add(1);
                let lo = u16::from(bus.read(u16::from(pointer)));
                let hi = u16::from(bus.read(u16::from(pointer.wrapping_add(1))));
                let base = (hi << 8) | lo;
                let addr = base.wrapping_add(u16::from(self.y));
                Resolved {
                    addr,
                    page_crossed: (addr & 0xFF00) != (base & 0xFF00),
                }
            }
        }
    }

    /// Read the operand byte: accumulator for implied-mode ALU ops, memory
    /// otherwise.
    fn fetch(&mut self, mode: AddrMode, addr: u16, bus: &mut impl Bus) -> u8 {
        if mode == AddrMode::Implied {
            self.a
        } else {
            bus.read(addr)
        }
    }

    // ===== execution =======================================================

    /// Run one operation. Returns (honors-page-cross-penalty, branch extra
    /// cycles). The two penalty sources are combined by the caller exactly
    /// the way the hardware charges them.
    #[allow(clippy::too_many_lines)]
    fn execute(
        &mut self,
        operation: Operation,
        mode: AddrMode,
        addr: u16,
        bus: &mut impl Bus,
    ) -> (bool, u8) {
        use Operation::*;

        match operation {
            // Loads and stores
            Lda => {
                self.a = self.fetch(mode, addr, bus);
                self.status.set_zn(self.a);
                (true, 0)
            }
            Ldx => {
                self.x = self.fetch(mode, addr, bus);
                self.status.set_zn(self.x);
                (true, 0)
            }
            Ldy => {
                self.y = self.fetch(mode, addr, bus);
                self.status.set_zn(self.y);
                (true, 0)
            }
            Sta => {
                bus.write(addr, self.a);
                (false, 0)
            }
            Stx => {
                bus.write(addr, self.x);
                (false, 0)
            }
            Sty => {
                bus.write(addr, self.y);
                (false, 0)
            }

            // Register transfers
            Tax => {
                self.x = self.a;
                self.status.set_zn(self.x);
                (false, 0)
            }
            Tay => {
                self.y = self.a;
                self.status.set_zn(self.y);
                (false, 0)
            }
            Txa => {
                self.a = self.x;
                self.status.set_zn(self.a);
                (false, 0)
            }
            Tya => {
                self.a = self.y;
                self.status.set_zn(self.a);
                (false, 0)
            }
            Tsx => {
                self.x = self.sp;
                self.status.set_zn(self.x);
                (false, 0)
            }
            Txs => {
                self.sp = self.x;
                (false, 0)
            }

            // Stack
            Pha => {
                self.push(bus, self.a);
                (false, 0)
            }
            Php => {
                self.push(bus, self.status.to_stack_byte(true));
                (false, 0)
            }
            Pla => {
                self.a = self.pop(bus);
                self.status.set_zn(self.a);
                (false, 0)
            }
            Plp => {
                let value = self.pop(bus);
                self.status = Status::from_stack_byte(value);
                (false, 0)
            }

            // Logic
            And => {
                self.a &= self.fetch(mode, addr, bus);
                self.status.set_zn(self.a);
                (true, 0)
            }
            Ora => {
                self.a |= self.fetch(mode, addr, bus);
                self.status.set_zn(self.a);
                (true, 0)
            }
            Eor => {
                self.a ^= self.fetch(mode, addr, bus);
                self.status.set_zn(self.a);
                (true, 0)
            }
            Bit => {
                let value = self.fetch(mode, addr, bus);
                self.status.set(Status::Z, self.a & value == 0);
                self.status.set(Status::V, value & 0x40 != 0);
                self.status.set(Status::N, value & 0x80 != 0);
                (false, 0)
            }

            // Arithmetic
            Adc => {
                let value = self.fetch(mode, addr, bus);
                self.add_with_carry(value);
                (true, 0)
            }
            Sbc => {
                let value = self.fetch(mode, addr, bus);
                self.add_with_carry(!value);
                (true, 0)
            }
            Cmp => {
                let value = self.fetch(mode, addr, bus);
                self.compare(self.a, value);
                (true, 0)
            }
            Cpx => {
                let value = self.fetch(mode, addr, bus);
                self.compare(self.x, value);
                (false, 0)
            }
            Cpy => {
                let value = self.fetch(mode, addr, bus);
                self.compare(self.y, value);
                (false, 0)
            }

            // Increments and decrements
            Inc => {
                let value = bus.read(addr).wrapping_add(1);
                bus.write(addr, value);
                self.status.set_zn(value);
                (false, 0)
            }
            Dec => {
                let value = bus.read(addr).wrapping_sub(1);
                bus.write(addr, value);
                self.status.set_zn(value);
                (false, 0)
            }
            Inx => {
                self.x = self.x.wrapping_add(1);
                self.status.set_zn(self.x);
                (false, 0)
            }
            Iny => {
                self.y = self.y.wrapping_add(1);
                self.status.set_zn(self.y);
                (false, 0)
            }
            Dex => {
                self.x = self.x.wrapping_sub(1);
                self.status.set_zn(self.x);
                (false, 0)
            }
            Dey => {
                self.y = self.y.wrapping_sub(1);
                self.status.set_zn(self.y);
                (false, 0)
            }

            // Shifts and rotates
            Asl => {
                let value = self.fetch(mode, addr, bus);
                let result = self.shift_left(value, false);
                self.write_back(mode, addr, result, bus);
                (false, 0)
            }
            Lsr => {
                let value = self.fetch(mode, addr, bus);
                let result = self.shift_right(value, false);
                self.write_back(mode, addr, result, bus);
                (false, 0)
            }
            Rol => {
                let value = self.fetch(mode, addr, bus);
                let result = self.shift_left(value, true);
                self.write_back(mode, addr, result, bus);
                (false, 0)
            }
            Ror => {
                let value = self.fetch(mode, addr, bus);
                let result = self.shift_right(value, true);
                self.write_back(mode, addr, result, bus);
                (false, 0)
            }

            // Jumps and subroutines
            Jmp => {
                self.pc = addr;
                (false, 0)
            }
            Jsr => {
                self.push_u16(bus, self.pc.wrapping_sub(1));
                self.pc = addr;
                (false, 0)
            }
            Rts => {
                self.pc = self.pop_u16(bus).wrapping_add(1);
                (false, 0)
            }

            // Branches
            Bcc => (false, self.branch(!self.status.contains(Status::C), addr)),
            Bcs => (false, self.branch(self.status.contains(Status::C), addr)),
            Bne => (false, self.branch(!self.status.contains(Status::Z), addr)),
            Beq => (false, self.branch(self.status.contains(Status::Z), addr)),
            Bpl => (false, self.branch(!self.status.contains(Status::N), addr)),
            Bmi => (false, self.branch(self.status.contains(Status::N), addr)),
            Bvc => (false, self.branch(!self.status.contains(Status::V), addr)),
            Bvs => (false, self.branch(self.status.contains(Status::V), addr)),

            // Flag manipulation
            Clc => {
                self.status.remove(Status::C);
                (false, 0)
            }
            Sec => {
                self.status.insert(Status::C);
                (false, 0)
            }
            Cli => {
                self.status.remove(Status::I);
                (false, 0)
            }
            Sei => {
                self.status.insert(Status::I);
                (false, 0)
            }
            Clv => {
                self.status.remove(Status::V);
                (false, 0)
            }
            Cld => {
                self.status.remove(Status::D);
                (false, 0)
            }
            Sed => {
                self.status.insert(Status::D);
                (false, 0)
            }

            // Interrupt entry and exit
            Brk => {
                // BRK pushes the address past its padding byte with B set.
                self.pc = self.pc.wrapping_add(1);
                self.push_u16(bus, self.pc);
                self.push(bus, self.status.to_stack_byte(true));
                self.status.insert(Status::I);
                self.pc = bus.read_u16(IRQ_VECTOR);
                (false, 0)
            }
            Rti => {
                let value = self.pop(bus);
                self.status = Status::from_stack_byte(value);
                self.pc = self.pop_u16(bus);
                (false, 0)
            }

            // NOP family: the read variants still honor the page penalty.
            Nop => (true, 0),

            // Unofficial
            Lax => {
                let value = self.fetch(mode, addr, bus);
                self.a = value;
                self.x = value;
                self.status.set_zn(value);
                (true, 0)
            }
            Sax => {
                bus.write(addr, self.a & self.x);
                (false, 0)
            }
            Dcp => {
                let value = bus.read(addr).wrapping_sub(1);
                bus.write(addr, value);
                self.compare(self.a, value);
                (false, 0)
            }
            Isb => {
                let value = bus.read(addr).wrapping_add(1);
                bus.write(addr, value);
                self.add_with_carry(!value);
                (false, 0)
            }
            Slo => {
                let value = bus.read(addr);
                let result = self.shift_left(value, false);
                bus.write(addr, result);
                self.a |= result;
                self.status.set_zn(self.a);
                (false, 0)
            }
            Rla => {
                let value = bus.read(addr);
                let result = self.shift_left(value, true);
                bus.write(addr, result);
                self.a &= result;
                self.status.set_zn(self.a);
                (false, 0)
            }
            Sre => {
                let value = bus.read(addr);
                let result = self.shift_right(value, false);
                bus.write(addr, result);
                self.a ^= result;
                self.status.set_zn(self.a);
                (false, 0)
            }
            Rra => {
                let value = bus.read(addr);
                let result = self.shift_right(value, true);
                bus.write(addr, result);
                self.add_with_carry(result);
                (false, 0)
            }

            // Unknown encodings execute as 2-cycle NOPs.
            Xxx => (false, 0),
        }
    }

    // ===== ALU helpers =====================================================

    /// ADC core; SBC feeds the one's complement through the same adder.
    fn add_with_carry(&mut self, value: u8) {
        let carry = u16::from(self.status.contains(Status::C));
        let sum = u16::from(self.a) + u16::from(value) + carry;
        let result = sum as u8;

        self.status.set(Status::C, sum > 0xFF);
        // Overflow when both operands agree in sign and the result doesn't.
        self.status
            .set(Status::V, (!(self.a ^ value) & (self.a ^ result)) & 0x80 != 0);
        self.a = result;
        self.status.set_zn(result);
    }

    fn compare(&mut self, register: u8, value: u8) {
        self.status.set(Status::C, register >= value);
        self.status.set_zn(register.wrapping_sub(value));
    }

    fn shift_left(&mut self, value: u8, rotate: bool) -> u8 {
        let carry_in = u8::from(rotate && self.status.contains(Status::C));
        self.status.set(Status::C, value & 0x80 != 0);
        let result = (value << 1) | carry_in;
        self.status.set_zn(result);
        result
    }

    fn shift_right(&mut self, value: u8, rotate: bool) -> u8 {
        let carry_in = u8::from(rotate && self.status.contains(Status::C)) << 7;
        self.status.set(Status::C, value & 0x01 != 0);
        let result = (value >> 1) | carry_in;
        self.status.set_zn(result);
        result
    }

    /// Store a shift/rotate result: accumulator for implied mode, memory
    /// otherwise.
    fn write_back(&mut self, mode: AddrMode, addr: u16, value: u8, bus: &mut impl Bus) {
        if mode == AddrMode::Implied {
            self.a = value;
        } else {
            bus.write(addr, value);
        }
    }

    /// Take a branch if `condition`: 1 extra cycle, 2 when the target is on
    /// another page.
    fn branch(&mut self, condition: bool, target: u16) -> u8 {
        if !condition {
            return 0;
        }
        let crossed = (target & 0xFF00) != (self.pc & 0xFF00);
        self.pc = target;
        1 + u8::from(crossed)
    }

    // ===== stack ===========================================================

    fn push(&mut self, bus: &mut impl Bus, value: u8) {
        bus.write(STACK_BASE | u16::from(self.sp), value);
        self.sp = self.sp.wrapping_sub(1);
    }

    fn push_u16(&mut self, bus: &mut impl Bus, value: u16) {
        self.push(bus, (value >> 8) as u8);
        self.push(bus, (value & 0xFF) as u8);
    }

    fn pop(&mut self, bus: &mut impl Bus) -> u8 {
        self.sp = self.sp.wrapping_add(1);
        bus.read(STACK_BASE | u16::from(self.sp))
    }

    fn pop_u16(&mut self, bus: &mut impl Bus) -> u16 {
        let lo = u16::from(self.pop(bus));
        let hi = u16::from(self.pop(bus));
        (hi << 8) | lo
    }
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}
