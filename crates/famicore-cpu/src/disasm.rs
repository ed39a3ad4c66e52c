//! Single-instruction disassembler.
//!
//! Used by the debug accessors on the console facade. Reads through
//! [`Bus::peek`] so disassembling never perturbs emulation state.

use crate::bus::Bus;
use crate::opcodes::{AddrMode, OPCODE_TABLE};

/// Disassemble the instruction at `addr`.
///
/// Returns the formatted instruction and the address of the next one.
#[must_use]
pub fn disassemble(bus: &impl Bus, addr: u16) -> (String, u16) {
    let opcode = bus.peek(addr);
    let info = &OPCODE_TABLE[opcode as usize];
    let lo = bus.peek(addr.wrapping_add(1));
    let hi = bus.peek(addr.wrapping_add(2));
    let word = u16::from_le_bytes([lo, hi]);

    let text = match info.mode {
        AddrMode::Implied => info.mnemonic.to_string(),
        AddrMode::Immediate => format!("{} #${lo:02X}", info.mnemonic),
        AddrMode::ZeroPage => format!("{} ${lo:02X}", info.mnemonic),
        AddrMode::ZeroPageX => format!("{} ${lo:02X},X", info.mnemonic),
        AddrMode::ZeroPageY => format!("{} ${lo:02X},Y", info.mnemonic),
        AddrMode::Relative => {
            let target = addr.wrapping_add(2).wrapping_add(lo as i8 as u16);
            format!("{} ${target:04X}", info.mnemonic)
        }
        AddrMode::Absolute => format!("{} ${word:04X}", info.mnemonic),
        AddrMode::AbsoluteX => format!("{} ${word:04X},X", info.mnemonic),
        AddrMode::AbsoluteY => format!("{} ${word:04X},Y", info.mnemonic),
        AddrMode::Indirect => format!("{} (${word:04X})", info.mnemonic),
        AddrMode::IndexedIndirectX => format!("{} (${lo:02X},X)", info.mnemonic),
        AddrMode::IndirectIndexedY => format!("{} (${lo:02X}),Y", info.mnemonic),
    };

    (text, addr.wrapping_add(info.mode.length()))
}

/// Disassemble `count` instructions starting at `addr`, one per line,
/// each prefixed with its address.
#[must_use]
pub fn disassemble_range(bus: &impl Bus, mut addr: u16, count: usize) -> Vec<String> {
    let mut lines = Vec::with_capacity(count);
    for _ in 0..count {
        let (text, next) = disassemble(bus, addr);
        lines.push(format!("${addr:04X}: {text}"));
        addr = next;
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    struct RomBus {
        bytes: Vec<u8>,
    }

    impl Bus for RomBus {
        fn read(&mut self, addr: u16) -> u8 {
            self.bytes[addr as usize]
        }

        fn write(&mut self, _addr: u16, _value: u8) {}

        fn peek(&self, addr: u16) -> u8 {
            self.bytes[addr as usize]
        }
    }

    fn bus_with(bytes: &[u8]) -> RomBus {
        let mut all = vec![0u8; 0x10000];
        all[..bytes.len()].copy_from_slice(bytes);
        RomBus { bytes: all }
    }

    #[test]
    fn formats_common_modes() {
        let bus = bus_with(&[0xA9, 0x44]);
        assert_eq!(disassemble(&bus, 0).0, "LDA #$44");

        let bus = bus_with(&[0x8D, 0x34, 0x12]);
        assert_eq!(disassemble(&bus, 0).0, "STA $1234");

        let bus = bus_with(&[0xB1, 0x20]);
        assert_eq!(disassemble(&bus, 0).0, "LDA ($20),Y");
    }

    #[test]
    fn branch_targets_are_resolved() {
        // BNE -2 at $0000 loops to $0000.
        let bus = bus_with(&[0xD0, 0xFE]);
        assert_eq!(disassemble(&bus, 0).0, "BNE $0000");
    }

    #[test]
    fn range_walks_instruction_lengths() {
        let bus = bus_with(&[0xEA, 0xA9, 0x01, 0x4C, 0x00, 0x80]);
        let lines = disassemble_range(&bus, 0, 3);
        assert_eq!(lines[0], "$0000: NOP");
        assert_eq!(lines[1], "$0001: LDA #$01");
        assert_eq!(lines[2], "$0003: JMP $8000");
    }
}
