//! 256-entry opcode dispatch table.
//!
//! Each entry carries the mnemonic (for the disassembler), the addressing
//! mode, the operation, and the base cycle count. Page-cross and branch
//! penalties are added at execution time. Unofficial encodings that the
//! published test suites exercise (LAX, SAX, DCP, ISB, SLO, RLA, SRE, RRA,
//! the SBC $EB alias, multi-byte NOPs) are first-class entries; everything
//! else is the `Xxx` placeholder, which executes as a 2-cycle NOP.

use serde::{Deserialize, Serialize};

/// 6502 addressing modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AddrMode {
    /// No operand; accumulator ops also use this mode.
    #[default]
    Implied,
    /// Operand is the byte after the opcode.
    Immediate,
    /// 8-bit address into page zero.
    ZeroPage,
    /// Zero-page address plus X, wrapping within page zero.
    ZeroPageX,
    /// Zero-page address plus Y, wrapping within page zero.
    ZeroPageY,
    /// Signed 8-bit branch displacement.
    Relative,
    /// Full 16-bit address.
    Absolute,
    /// Absolute plus X (may cross a page).
    AbsoluteX,
    /// Absolute plus Y (may cross a page).
    AbsoluteY,
    /// 16-bit pointer, JMP only; reproduces the page-wrap bug.
    Indirect,
    /// ($zp + X) pointer in page zero.
    IndexedIndirectX,
    /// ($zp) pointer plus Y (may cross a page).
    IndirectIndexedY,
}

impl AddrMode {
    /// Total instruction length in bytes (opcode included).
    #[must_use]
    pub const fn length(self) -> u16 {
        match self {
            Self::Implied => 1,
            Self::Immediate
            | Self::ZeroPage
            | Self::ZeroPageX
            | Self::ZeroPageY
            | Self::Relative
            | Self::IndexedIndirectX
            | Self::IndirectIndexedY => 2,
            Self::Absolute | Self::AbsoluteX | Self::AbsoluteY | Self::Indirect => 3,
        }
    }
}

/// CPU operations: the 56 documented ones plus the unofficial subset the
/// test suites exercise. `Xxx` is the catch-all 2-cycle NOP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[allow(missing_docs)] // variant names are the 6502 mnemonics
pub enum Operation {
    Adc, And, Asl, Bcc, Bcs, Beq, Bit, Bmi, Bne, Bpl, Brk, Bvc, Bvs, Clc,
    Cld, Cli, Clv, Cmp, Cpx, Cpy, Dec, Dex, Dey, Eor, Inc, Inx, Iny, Jmp,
    Jsr, Lda, Ldx, Ldy, Lsr, Nop, Ora, Pha, Php, Pla, Plp, Rol, Ror, Rti,
    Rts, Sbc, Sec, Sed, Sei, Sta, Stx, Sty, Tax, Tay, Tsx, Txa, Txs, Tya,
    // Unofficial
    Lax, Sax, Dcp, Isb, Slo, Rla, Sre, Rra,
    #[default]
    Xxx,
}

/// One row of the dispatch table.
#[derive(Debug, Clone, Copy)]
pub struct OpcodeInfo {
    /// Three-letter mnemonic, `"???"` for unimplemented encodings.
    pub mnemonic: &'static str,
    /// Addressing mode.
    pub mode: AddrMode,
    /// Operation to perform.
    pub operation: Operation,
    /// Base cycle count before penalties.
    pub cycles: u8,
}

const fn op(mnemonic: &'static str, mode: AddrMode, operation: Operation, cycles: u8) -> OpcodeInfo {
    OpcodeInfo {
        mnemonic,
        mode,
        operation,
        cycles,
    }
}

const fn xxx() -> OpcodeInfo {
    op("???", AddrMode::Implied, Operation::Xxx, 2)
}

/// The full 256-entry table, indexed by opcode byte.
#[rustfmt::skip]
pub static OPCODE_TABLE: [OpcodeInfo; 256] = {
    use AddrMode::{
        Absolute as Abs, AbsoluteX as Abx, AbsoluteY as Aby, Immediate as Imm,
        Implied as Imp, IndexedIndirectX as Izx, Indirect as Ind,
        IndirectIndexedY as Izy, Relative as Rel, ZeroPage as Zp0,
        ZeroPageX as Zpx, ZeroPageY as Zpy,
    };
    use Operation::*;
    [
        // 0x00
        op("BRK", Imp, Brk, 7), op("ORA", Izx, Ora, 6), xxx(),                  op("SLO", Izx, Slo, 8),
        op("NOP", Zp0, Nop, 3), op("ORA", Zp0, Ora, 3), op("ASL", Zp0, Asl, 5), op("SLO", Zp0, Slo, 5),
        op("PHP", Imp, Php, 3), op("ORA", Imm, Ora, 2), op("ASL", Imp, Asl, 2), xxx(),
        op("NOP", Abs, Nop, 4), op("ORA", Abs, Ora, 4), op("ASL", Abs, Asl, 6), op("SLO", Abs, Slo, 6),
        // 0x10
        op("BPL", Rel, Bpl, 2), op("ORA", Izy, Ora, 5), xxx(),                  op("SLO", Izy, Slo, 8),
        op("NOP", Zpx, Nop, 4), op("ORA", Zpx, Ora, 4), op("ASL", Zpx, Asl, 6), op("SLO", Zpx, Slo, 6),
        op("CLC", Imp, Clc, 2), op("ORA", Aby, Ora, 4), op("NOP", Imp, Nop, 2), op("SLO", Aby, Slo, 7),
        op("NOP", Abx, Nop, 4), op("ORA", Abx, Ora, 4), op("ASL", Abx, Asl, 7), op("SLO", Abx, Slo, 7),
        // 0x20
        op("JSR", Abs, Jsr, 6), op("AND", Izx, And, 6), xxx(),                  op("RLA", Izx, Rla, 8),
        op("BIT", Zp0, Bit, 3), op("AND", Zp0, And, 3), op("ROL", Zp0, Rol, 5), op("RLA", Zp0, Rla, 5),
        op("PLP", Imp, Plp, 4), op("AND", Imm, And, 2), op("ROL", Imp, Rol, 2), xxx(),
        op("BIT", Abs, Bit, 4), op("AND", Abs, And, 4), op("ROL", Abs, Rol, 6), op("RLA", Abs, Rla, 6),
        // 0x30
        op("BMI", Rel, Bmi, 2), op("AND", Izy, And, 5), xxx(),                  op("RLA", Izy, Rla, 8),
        op("NOP", Zpx, Nop, 4), op("AND", Zpx, And, 4), op("ROL", Zpx, Rol, 6), op("RLA", Zpx, Rla, 6),
        op("SEC", Imp, Sec, 2), op("AND", Aby, And, 4), op("NOP", Imp, Nop, 2), op("RLA", Aby, Rla, 7),
        op("NOP", Abx, Nop, 4), op("AND", Abx, And, 4), op("ROL", Abx, Rol, 7), op("RLA", Abx, Rla, 7),
        // 0x40
        op("RTI", Imp, Rti, 6), op("EOR", Izx, Eor, 6), xxx(),                  op("SRE", Izx, Sre, 8),
        op("NOP", Zp0, Nop, 3), op("EOR", Zp0, Eor, 3), op("LSR", Zp0, Lsr, 5), op("SRE", Zp0, Sre, 5),
        op("PHA", Imp, Pha, 3), op("EOR", Imm, Eor, 2), op("LSR", Imp, Lsr, 2), xxx(),
        op("JMP", Abs, Jmp, 3), op("EOR", Abs, Eor, 4), op("LSR", Abs, Lsr, 6), op("SRE", Abs, Sre, 6),
        // 0x50
        op("BVC", Rel, Bvc, 2), op("EOR", Izy, Eor, 5), xxx(),                  op("SRE", Izy, Sre, 8),
        op("NOP", Zpx, Nop, 4), op("EOR", Zpx, Eor, 4), op("LSR", Zpx, Lsr, 6), op("SRE", Zpx, Sre, 6),
        op("CLI", Imp, Cli, 2), op("EOR", Aby, Eor, 4), op("NOP", Imp, Nop, 2), op("SRE", Aby, Sre, 7),
        op("NOP", Abx, Nop, 4), op("EOR", Abx, Eor, 4), op("LSR", Abx, Lsr, 7), op("SRE", Abx, Sre, 7),
        // 0x60
        op("RTS", Imp, Rts, 6), op("ADC", Izx, Adc, 6), xxx(),                  op("RRA", Izx, Rra, 8),
        op("NOP", Zp0, Nop, 3), op("ADC", Zp0, Adc, 3), op("ROR", Zp0, Ror, 5), op("RRA", Zp0, Rra, 5),
        op("PLA", Imp, Pla, 4), op("ADC", Imm, Adc, 2), op("ROR", Imp, Ror, 2), xxx(),
        op("JMP", Ind, Jmp, 5), op("ADC", Abs, Adc, 4), op("ROR", Abs, Ror, 6), op("RRA", Abs, Rra, 6),
        // 0x70
        op("BVS", Rel, Bvs, 2), op("ADC", Izy, Adc, 5), xxx(),                  op("RRA", Izy, Rra, 8),
        op("NOP", Zpx, Nop, 4), op("ADC", Zpx, Adc, 4), op("ROR", Zpx, Ror, 6), op("RRA", Zpx, Rra, 6),
        op("SEI", Imp, Sei, 2), op("ADC", Aby, Adc, 4), op("NOP", Imp, Nop, 2), op("RRA", Aby, Rra, 7),
        op("NOP", Abx, Nop, 4), op("ADC", Abx, Adc, 4), op("ROR", Abx, Ror, 7), op("RRA", Abx, Rra, 7),
        // 0x80
        op("NOP", Imm, Nop, 2), op("STA", Izx, Sta, 6), op("NOP", Imm, Nop, 2), op("SAX", Izx, Sax, 6),
        op("STY", Zp0, Sty, 3), op("STA", Zp0, Sta, 3), op("STX", Zp0, Stx, 3), op("SAX", Zp0, Sax, 3),
        op("DEY", Imp, Dey, 2), op("NOP", Imm, Nop, 2), op("TXA", Imp, Txa, 2), xxx(),
        op("STY", Abs, Sty, 4), op("STA", Abs, Sta, 4), op("STX", Abs, Stx, 4), op("SAX", Abs, Sax, 4),
        // 0x90
        op("BCC", Rel, Bcc, 2), op("STA", Izy, Sta, 6), xxx(),                  xxx(),
        op("STY", Zpx, Sty, 4), op("STA", Zpx, Sta, 4), op("STX", Zpy, Stx, 4), op("SAX", Zpy, Sax, 4),
        op("TYA", Imp, Tya, 2), op("STA", Aby, Sta, 5), op("TXS", Imp, Txs, 2), xxx(),
        xxx(),                  op("STA", Abx, Sta, 5), xxx(),                  xxx(),
        // 0xA0
        op("LDY", Imm, Ldy, 2), op("LDA", Izx, Lda, 6), op("LDX", Imm, Ldx, 2), op("LAX", Izx, Lax, 6),
        op("LDY", Zp0, Ldy, 3), op("LDA", Zp0, Lda, 3), op("LDX", Zp0, Ldx, 3), op("LAX", Zp0, Lax, 3),
        op("TAY", Imp, Tay, 2), op("LDA", Imm, Lda, 2), op("TAX", Imp, Tax, 2), xxx(),
        op("LDY", Abs, Ldy, 4), op("LDA", Abs, Lda, 4), op("LDX", Abs, Ldx, 4), op("LAX", Abs, Lax, 4),
        // 0xB0
        op("BCS", Rel, Bcs, 2), op("LDA", Izy, Lda, 5), xxx(),                  op("LAX", Izy, Lax, 5),
        op("LDY", Zpx, Ldy, 4), op("LDA", Zpx, Lda, 4), op("LDX", Zpy, Ldx, 4), op("LAX", Zpy, Lax, 4),
        op("CLV", Imp, Clv, 2), op("LDA", Aby, Lda, 4), op("TSX", Imp, Tsx, 2), xxx(),
        op("LDY", Abx, Ldy, 4), op("LDA", Abx, Lda, 4), op("LDX", Aby, Ldx, 4), op("LAX", Aby, Lax, 4),
        // 0xC0
        op("CPY", Imm, Cpy, 2), op("CMP", Izx, Cmp, 6), op("NOP", Imm, Nop, 2), op("DCP", Izx, Dcp, 8),
        op("CPY", Zp0, Cpy, 3), op("CMP", Zp0, Cmp, 3), op("DEC", Zp0, Dec, 5), op("DCP", Zp0, Dcp, 5),
        op("INY", Imp, Iny, 2), op("CMP", Imm, Cmp, 2), op("DEX", Imp, Dex, 2), xxx(),
        op("CPY", Abs, Cpy, 4), op("CMP", Abs, Cmp, 4), op("DEC", Abs, Dec, 6), op("DCP", Abs, Dcp, 6),
        // 0xD0
        op("BNE", Rel, Bne, 2), op("CMP", Izy, Cmp, 5), xxx(),                  op("DCP", Izy, Dcp, 8),
        op("NOP", Zpx, Nop, 4), op("CMP", Zpx, Cmp, 4), op("DEC", Zpx, Dec, 6), op("DCP", Zpx, Dcp, 6),
        op("CLD", Imp, Cld, 2), op("CMP", Aby, Cmp, 4), op("NOP", Imp, Nop, 2), op("DCP", Aby, Dcp, 7),
        op("NOP", Abx, Nop, 4), op("CMP", Abx, Cmp, 4), op("DEC", Abx, Dec, 7), op("DCP", Abx, Dcp, 7),
        // 0xE0
        op("CPX", Imm, Cpx, 2), op("SBC", Izx, Sbc, 6), op("NOP", Imm, Nop, 2), op("ISB", Izx, Isb, 8),
        op("CPX", Zp0, Cpx, 3), op("SBC", Zp0, Sbc, 3), op("INC", Zp0, Inc, 5), op("ISB", Zp0, Isb, 5),
        op("INX", Imp, Inx, 2), op("SBC", Imm, Sbc, 2), op("NOP", Imp, Nop, 2), op("SBC", Imm, Sbc, 2),
        op("CPX", Abs, Cpx, 4), op("SBC", Abs, Sbc, 4), op("INC", Abs, Inc, 6), op("ISB", Abs, Isb, 6),
        // 0xF0
        op("BEQ", Rel, Beq, 2), op("SBC", Izy, Sbc, 5), xxx(),                  op("ISB", Izy, Isb, 8),
        op("NOP", Zpx, Nop, 4), op("SBC", Zpx, Sbc, 4), op("INC", Zpx, Inc, 6), op("ISB", Zpx, Isb, 6),
        op("SED", Imp, Sed, 2), op("SBC", Aby, Sbc, 4), op("NOP", Imp, Nop, 2), op("ISB", Aby, Isb, 7),
        op("NOP", Abx, Nop, 4), op("SBC", Abx, Sbc, 4), op("INC", Abx, Inc, 7), op("ISB", Abx, Isb, 7),
    ]
};
