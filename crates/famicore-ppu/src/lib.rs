//! 2C02 PPU (Picture Processing Unit) emulation for the famicore NES
//! emulator.
//!
//! The PPU is clocked one dot at a time and borrows the cartridge during
//! each dot for pattern fetches and mirroring decisions. Output is a
//! 256x240 frame of palette indices plus the NMI line sampled by the bus.

pub mod oam;
pub mod palette;
pub mod ppu;
pub mod registers;
pub mod scroll;

pub use oam::{Oam, SecondaryOam, SpriteEntry};
pub use palette::NTSC_PALETTE;
pub use ppu::{Ppu, FRAME_HEIGHT, FRAME_WIDTH};
pub use registers::{PpuCtrl, PpuMask, PpuStatus};
pub use scroll::Scroll;
