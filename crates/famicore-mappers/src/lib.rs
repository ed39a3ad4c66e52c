//! Cartridge loading and bank-switching mappers for the famicore NES
//! emulator.
//!
//! # Supported mappers
//!
//! | Mapper | Name  | Banking |
//! |--------|-------|---------|
//! | 0      | NROM  | none |
//! | 1      | MMC1  | serial shift register, PRG 16/32 KiB, CHR 4/8 KiB |
//! | 2      | UxROM | switchable low 16 KiB PRG |
//! | 3      | CNROM | switchable 8 KiB CHR |
//! | 4      | MMC3  | 8 KiB PRG / 1-2 KiB CHR windows, scanline IRQ |
//! | 66     | GxROM | combined 32 KiB PRG + 8 KiB CHR select |
//!
//! # Example
//!
//! ```no_run
//! use famicore_mappers::Cartridge;
//!
//! let data = std::fs::read("game.nes").expect("read ROM");
//! let cart = Cartridge::from_bytes(&data).expect("parse ROM");
//! let reset_lo = cart.read_cpu(0xFFFC);
//! ```

pub mod cartridge;
pub mod mapper;
pub mod rom;

mod cnrom;
mod gxrom;
mod mmc1;
mod mmc3;
mod nrom;
mod uxrom;

pub use cartridge::{Cartridge, CartridgeState};
pub use cnrom::Cnrom;
pub use gxrom::Gxrom;
pub use mapper::{CpuMapRead, CpuMapWrite, Mapper, MapperState, MirrorMode};
pub use mmc1::Mmc1;
pub use mmc3::Mmc3;
pub use nrom::Nrom;
pub use rom::{Rom, RomError, RomHeader};
pub use uxrom::Uxrom;

/// Construct the mapper named by the ROM header.
///
/// # Errors
///
/// [`RomError::UnsupportedMapper`] for ids outside the implemented set.
pub fn create_mapper(rom: &Rom) -> Result<Box<dyn Mapper>, RomError> {
    match rom.header.mapper {
        0 => Ok(Box::new(Nrom::new(rom))),
        1 => Ok(Box::new(Mmc1::new(rom))),
        2 => Ok(Box::new(Uxrom::new(rom))),
        3 => Ok(Box::new(Cnrom::new(rom))),
        4 => Ok(Box::new(Mmc3::new(rom))),
        66 => Ok(Box::new(Gxrom::new(rom))),
        id => Err(RomError::UnsupportedMapper(id)),
    }
}

/// The implemented mapper ids.
#[must_use]
pub fn supported_mappers() -> &'static [u16] {
    &[0, 1, 2, 3, 4, 66]
}
