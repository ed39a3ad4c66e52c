//! UxROM (mapper 2).
//!
//! The low 16 KiB window at $8000 is switchable (low nibble of any PRG-space
//! write); the high window at $C000 is hard-wired to the last bank so the
//! vectors never move. CHR is an 8 KiB RAM on most boards.

use crate::mapper::{CpuMapRead, CpuMapWrite, Mapper, MapperState};
use crate::rom::Rom;

/// UxROM mapper.
#[derive(Debug, Clone)]
pub struct Uxrom {
    prg_banks: u16,
    chr_banks: u16,
    prg_bank_lo: u8,
}

impl Uxrom {
    /// Build from a parsed ROM.
    #[must_use]
    pub fn new(rom: &Rom) -> Self {
        Self {
            prg_banks: rom.header.prg_banks,
            chr_banks: rom.header.chr_banks,
            prg_bank_lo: 0,
        }
    }

    fn last_bank(&self) -> u32 {
        u32::from(self.prg_banks.max(1) - 1)
    }
}

impl Mapper for Uxrom {
    fn map_cpu_read(&self, addr: u16) -> CpuMapRead {
        match addr {
            0x8000..=0xBFFF => {
                CpuMapRead::Prg(u32::from(self.prg_bank_lo) * 0x4000 + u32::from(addr & 0x3FFF))
            }
            0xC000..=0xFFFF => {
                CpuMapRead::Prg(self.last_bank() * 0x4000 + u32::from(addr & 0x3FFF))
            }
            _ => CpuMapRead::Miss,
        }
    }

    fn map_cpu_write(&mut self, addr: u16, data: u8) -> CpuMapWrite {
        if addr >= 0x8000 {
            self.prg_bank_lo = data & 0x0F;
            CpuMapWrite::Handled
        } else {
            CpuMapWrite::Miss
        }
    }

    fn map_ppu_read(&self, addr: u16) -> Option<u32> {
        (addr < 0x2000).then(|| u32::from(addr))
    }

    fn map_ppu_write(&self, addr: u16) -> Option<u32> {
        (addr < 0x2000 && self.chr_banks == 0).then(|| u32::from(addr))
    }

    fn reset(&mut self) {
        self.prg_bank_lo = 0;
    }

    fn id(&self) -> u16 {
        2
    }

    fn name(&self) -> &'static str {
        "UxROM"
    }

    fn state(&self) -> MapperState {
        MapperState::Uxrom {
            prg_bank_lo: self.prg_bank_lo,
        }
    }

    fn restore(&mut self, state: &MapperState) {
        if let MapperState::Uxrom { prg_bank_lo } = state {
            self.prg_bank_lo = *prg_bank_lo;
        }
    }
}
