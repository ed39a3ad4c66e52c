//! Mapper trait and the address-translation protocol.
//!
//! A mapper never touches the ROM arrays directly; it translates a bus
//! address into an offset inside the cartridge's PRG or CHR storage, or
//! answers the access from its own registers and work RAM. The
//! [`crate::Cartridge`] turns these responses into actual memory accesses.

use serde::{Deserialize, Serialize};

/// Nametable arrangement selected by the mapper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MirrorMode {
    /// Defer to the arrangement soldered on the board (header flags).
    #[default]
    Hardware,
    /// Horizontal mirroring: $2000/$2400 share table 0, $2800/$2C00 table 1.
    Horizontal,
    /// Vertical mirroring: $2000/$2800 share table 0, $2400/$2C00 table 1.
    Vertical,
    /// All four nametables map to the first 1 KiB.
    SingleLow,
    /// All four nametables map to the second 1 KiB.
    SingleHigh,
    /// Cartridge-provided 4 KiB of VRAM (header flag; no implemented mapper
    /// drives it).
    FourScreen,
}

/// Mapper response to a CPU read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CpuMapRead {
    /// Read from this offset in PRG-ROM.
    Prg(u32),
    /// The mapper answered from internal registers or work RAM.
    Data(u8),
    /// Address not claimed; the bus falls back to open bus.
    Miss,
}

/// Mapper response to a CPU write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CpuMapWrite {
    /// Write through to this offset in PRG storage.
    Prg(u32),
    /// The mapper consumed the write (bank register, IRQ control, work RAM).
    Handled,
    /// Address not claimed; the write is dropped.
    Miss,
}

/// Per-mapper register file captured in save states.
///
/// One variant per implemented mapper; work RAM rides along where the
/// mapper owns any.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[allow(missing_docs)] // field names mirror the mapper structs
pub enum MapperState {
    Nrom,
    Mmc1 {
        load: u8,
        load_count: u8,
        control: u8,
        chr_bank4_lo: u8,
        chr_bank4_hi: u8,
        chr_bank8: u8,
        prg_bank16_lo: u8,
        prg_bank16_hi: u8,
        prg_bank32: u8,
        mirroring: MirrorMode,
        prg_ram: Vec<u8>,
    },
    Uxrom {
        prg_bank_lo: u8,
    },
    Cnrom {
        chr_bank: u8,
    },
    Mmc3 {
        target_register: u8,
        prg_mode: bool,
        chr_inversion: bool,
        registers: [u8; 8],
        chr_offsets: [u32; 8],
        prg_offsets: [u32; 4],
        mirroring: MirrorMode,
        irq_counter: u16,
        irq_reload: u16,
        irq_enabled: bool,
        irq_active: bool,
        prg_ram: Vec<u8>,
    },
    Gxrom {
        chr_bank: u8,
        prg_bank: u8,
    },
}

impl MapperState {
    /// The mapper id this snapshot belongs to; save-state loading refuses
    /// snapshots taken with a different board.
    #[must_use]
    pub fn mapper_id(&self) -> u16 {
        match self {
            Self::Nrom => 0,
            Self::Mmc1 { .. } => 1,
            Self::Uxrom { .. } => 2,
            Self::Cnrom { .. } => 3,
            Self::Mmc3 { .. } => 4,
            Self::Gxrom { .. } => 66,
        }
    }
}

/// Cartridge bank-switching hardware.
///
/// Implementations translate addresses; they also expose the IRQ line (MMC3
/// scanline counter), the mirroring choice, and a save-state snapshot of
/// their registers.
pub trait Mapper: Send + Sync {
    /// Translate a CPU read of `addr` ($4020-$FFFF region).
    fn map_cpu_read(&self, addr: u16) -> CpuMapRead;

    /// Translate (or consume) a CPU write of `data` to `addr`.
    fn map_cpu_write(&mut self, addr: u16, data: u8) -> CpuMapWrite;

    /// Translate a PPU pattern-table read ($0000-$1FFF).
    fn map_ppu_read(&self, addr: u16) -> Option<u32>;

    /// Translate a PPU pattern-table write. Only carts with CHR-RAM accept.
    fn map_ppu_write(&self, addr: u16) -> Option<u32>;

    /// Current nametable arrangement.
    fn mirroring(&self) -> MirrorMode {
        MirrorMode::Hardware
    }

    /// Whether the mapper is asserting the IRQ line.
    fn irq_pending(&self) -> bool {
        false
    }

    /// Release the IRQ line.
    fn irq_clear(&mut self) {}

    /// Scanline notification from the PPU (MMC3 counts these).
    fn scanline(&mut self) {}

    /// Restore documented power-up register values.
    fn reset(&mut self) {}

    /// iNES mapper number.
    fn id(&self) -> u16;

    /// Conventional board name.
    fn name(&self) -> &'static str;

    /// Snapshot the mutable registers for a save state.
    fn state(&self) -> MapperState;

    /// Restore registers from a snapshot. Mismatched variants are ignored
    /// (the console validates the mapper id before restoring).
    fn restore(&mut self, state: &MapperState);
}
