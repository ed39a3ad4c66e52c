//! NROM (mapper 0).
//!
//! No banking at all: 16 KiB carts mirror their single PRG bank across the
//! 32 KiB window, 32 KiB carts map it straight through. CHR is an 8 KiB
//! ROM, or RAM on the handful of boards with none.

use crate::mapper::{CpuMapRead, CpuMapWrite, Mapper, MapperState};
use crate::rom::Rom;

/// NROM mapper.
#[derive(Debug, Clone)]
pub struct Nrom {
    prg_banks: u16,
    chr_banks: u16,
}

impl Nrom {
    /// Build from a parsed ROM.
    #[must_use]
    pub fn new(rom: &Rom) -> Self {
        Self {
            prg_banks: rom.header.prg_banks,
            chr_banks: rom.header.chr_banks,
        }
    }

    fn prg_mask(&self) -> u16 {
        if self.prg_banks > 1 {
            0x7FFF
        } else {
            0x3FFF
        }
    }
}

impl Mapper for Nrom {
    fn map_cpu_read(&self, addr: u16) -> CpuMapRead {
        if addr >= 0x8000 {
            CpuMapRead::Prg(u32::from(addr & self.prg_mask()))
        } else {
            CpuMapRead::Miss
        }
    }

    fn map_cpu_write(&mut self, addr: u16, _data: u8) -> CpuMapWrite {
        if addr >= 0x8000 {
            CpuMapWrite::Prg(u32::from(addr & self.prg_mask()))
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

    fn id(&self) -> u16 {
        0
    }

    fn name(&self) -> &'static str {
        "NROM"
    }

    fn state(&self) -> MapperState {
        MapperState::Nrom
    }

    fn restore(&mut self, _state: &MapperState) {}
}
