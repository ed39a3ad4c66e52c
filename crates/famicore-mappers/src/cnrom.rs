//! CNROM (mapper 3).
//!
//! PRG is fixed like NROM; any write to PRG space selects one of four 8 KiB
//! CHR banks.

use crate::mapper::{CpuMapRead, CpuMapWrite, Mapper, MapperState};
use crate::rom::Rom;

/// CNROM mapper.
#[derive(Debug, Clone)]
pub struct Cnrom {
    prg_banks: u16,
    chr_bank: u8,
}

impl Cnrom {
    /// Build from a parsed ROM.
    #[must_use]
    pub fn new(rom: &Rom) -> Self {
        Self {
            prg_banks: rom.header.prg_banks,
            chr_bank: 0,
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

impl Mapper for Cnrom {
    fn map_cpu_read(&self, addr: u16) -> CpuMapRead {
        if addr >= 0x8000 {
            CpuMapRead::Prg(u32::from(addr & self.prg_mask()))
        } else {
            CpuMapRead::Miss
        }
    }

    fn map_cpu_write(&mut self, addr: u16, data: u8) -> CpuMapWrite {
        if addr >= 0x8000 {
            self.chr_bank = data & 0x03;
            CpuMapWrite::Handled
        } else {
            CpuMapWrite::Miss
        }
    }

    fn map_ppu_read(&self, addr: u16) -> Option<u32> {
        (addr < 0x2000).then(|| u32::from(self.chr_bank) * 0x2000 + u32::from(addr))
    }

    fn map_ppu_write(&self, _addr: u16) -> Option<u32> {
        // CHR is always ROM on CNROM boards.
        None
    }

    fn reset(&mut self) {
        self.chr_bank = 0;
    }

    fn id(&self) -> u16 {
        3
    }

    fn name(&self) -> &'static str {
        "CNROM"
    }

    fn state(&self) -> MapperState {
        MapperState::Cnrom {
            chr_bank: self.chr_bank,
        }
    }

    fn restore(&mut self, state: &MapperState) {
        if let MapperState::Cnrom { chr_bank } = state {
            self.chr_bank = *chr_bank;
        }
    }
}
