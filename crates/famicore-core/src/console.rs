//! Console facade: the only surface a host needs.

use std::io::{Read, Write};
use std::path::Path;

use famicore_apu::Apu;
use famicore_cpu::{disassemble_range, Cpu};
use famicore_mappers::{Cartridge, RomError};
use famicore_ppu::{Ppu, FRAME_HEIGHT, FRAME_WIDTH, NTSC_PALETTE};

use crate::bus::SystemBus;
use crate::save_state::{self, StateError};

/// Controller button bit masks (the byte handed to
/// [`Console::set_controller`]).
pub mod buttons {
    /// A button.
    pub const A: u8 = 0x80;
    /// B button.
    pub const B: u8 = 0x40;
    /// Select.
    pub const SELECT: u8 = 0x20;
    /// Start.
    pub const START: u8 = 0x10;
    /// D-pad up.
    pub const UP: u8 = 0x08;
    /// D-pad down.
    pub const DOWN: u8 = 0x04;
    /// D-pad left.
    pub const LEFT: u8 = 0x02;
    /// D-pad right.
    pub const RIGHT: u8 = 0x01;
}

/// Errors surfaced by the console facade.
#[derive(Debug, thiserror::Error)]
pub enum ConsoleError {
    /// ROM image failed to load.
    #[error(transparent)]
    Rom(#[from] RomError),

    /// Save state failed to read or write.
    #[error(transparent)]
    State(#[from] StateError),

    /// Filesystem failure while reading a ROM.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// The emulated console.
///
/// Owns the whole machine and exposes power-up, reset, frame stepping,
/// controller injection, video/audio output, save states, and read-only
/// debug accessors. `step_frame` never fails; every fallible operation is
/// loading something.
pub struct Console {
    bus: SystemBus,
    /// 256x240 RGB triples, row-major from the top left.
    framebuffer: Vec<u8>,
}

impl Console {
    /// Power up a console around a ROM image.
    ///
    /// # Errors
    ///
    /// [`RomError`] variants for malformed images or unsupported mappers.
    pub fn load(rom: &[u8]) -> Result<Self, ConsoleError> {
        let cart = Cartridge::from_bytes(rom)?;
        log::info!(
            "power-up: mapper {} ({})",
            cart.mapper_id(),
            cart.mapper_name()
        );
        Ok(Self {
            bus: SystemBus::new(cart),
            framebuffer: vec![0; FRAME_WIDTH * FRAME_HEIGHT * 3],
        })
    }

    /// Power up from a .nes file on disk.
    ///
    /// # Errors
    ///
    /// I/O failures plus everything [`Console::load`] reports.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConsoleError> {
        let data = std::fs::read(path)?;
        Self::load(&data)
    }

    /// Cold reset: CPU/PPU/APU/mapper return to power-up state, RAM and
    /// ROM contents persist.
    pub fn reset(&mut self) {
        self.bus.reset();
    }

    /// Run until the PPU completes the frame in progress, then latch it
    /// into the RGB framebuffer.
    pub fn step_frame(&mut self) {
        while !self.bus.ppu().frame_complete() {
            self.bus.tick();
        }
        self.bus.devices_mut().ppu.clear_frame_complete();
        self.update_framebuffer();
    }

    /// Run until exactly one CPU instruction retires. Returns the number
    /// of CPU clock slots consumed, so OAM DMA stalls are included even
    /// though the CPU itself sits idle through them.
    pub fn step_instruction(&mut self) -> u32 {
        let mut cycles = 0;
        loop {
            let cpu_slot = self.bus.clock_counter() % 3 == 0;
            let retired = self.bus.tick();
            if cpu_slot {
                cycles += 1;
            }
            if retired {
                return cycles;
            }
        }
    }

    /// Advance a single bus tick (one PPU dot).
    pub fn tick(&mut self) {
        self.bus.tick();
    }

    /// Inject the current button byte for a controller port (0 or 1).
    /// The core samples it only when the game strobes $4016.
    pub fn set_controller(&mut self, port: usize, state: u8) {
        self.bus.devices_mut().controllers[port & 1] = state;
    }

    /// The most recently completed frame: 256x240 RGB triples, row-major,
    /// top-left origin.
    #[must_use]
    pub fn framebuffer(&self) -> &[u8] {
        &self.framebuffer
    }

    /// Most recent mixed audio sample, roughly 0.0 to 1.0.
    #[must_use]
    pub fn audio_sample(&self) -> f32 {
        self.bus.audio_sample()
    }

    /// Change the audio sample rate (default 44100 Hz).
    pub fn set_sample_rate(&mut self, sample_rate: u32) {
        self.bus.devices_mut().apu.set_sample_rate(sample_rate);
    }

    /// Serialize the complete machine state.
    ///
    /// # Errors
    ///
    /// [`StateError`] on I/O or encoding failure.
    pub fn save_state(&self, writer: &mut impl Write) -> Result<(), StateError> {
        save_state::write_state(writer, &self.bus.snapshot())
    }

    /// Restore a state written by [`Console::save_state`]; subsequent
    /// frames and samples are bit-identical to the original run.
    ///
    /// # Errors
    ///
    /// [`StateError`] for malformed input, version mismatch, or a state
    /// taken with a different cartridge.
    pub fn load_state(&mut self, reader: &mut impl Read) -> Result<(), StateError> {
        let snapshot = save_state::read_state(reader)?;
        let expected = self.bus.cartridge().mapper_id();
        let found = snapshot.cart.mapper.mapper_id();
        if found != expected {
            return Err(StateError::MapperMismatch { found, expected });
        }
        self.bus.restore(&snapshot);
        Ok(())
    }

    /// Translate the PPU's palette-index frame through the NTSC table.
    fn update_framebuffer(&mut self) {
        for (pixel, rgb) in self
            .bus
            .ppu()
            .frame()
            .iter()
            .zip(self.framebuffer.chunks_exact_mut(3))
        {
            let (r, g, b) = NTSC_PALETTE[usize::from(pixel & 0x3F)];
            rgb[0] = r;
            rgb[1] = g;
            rgb[2] = b;
        }
    }

    // ===== debug accessors =================================================

    /// CPU state (read-only).
    #[must_use]
    pub fn cpu(&self) -> &Cpu {
        self.bus.cpu()
    }

    /// PPU state (read-only).
    #[must_use]
    pub fn ppu(&self) -> &Ppu {
        self.bus.ppu()
    }

    /// APU state (read-only).
    #[must_use]
    pub fn apu(&self) -> &Apu {
        self.bus.apu()
    }

    /// Read CPU address space without side effects.
    #[must_use]
    pub fn peek(&self, addr: u16) -> u8 {
        self.bus.peek(addr)
    }

    /// Total CPU cycles since power-up.
    #[must_use]
    pub fn cycles(&self) -> u64 {
        self.bus.cpu().cycles()
    }

    /// Frames completed since power-up.
    #[must_use]
    pub fn frame_count(&self) -> u64 {
        self.bus.ppu().frame_count()
    }

    /// Disassemble `count` instructions starting at `addr`.
    #[must_use]
    pub fn disassemble(&self, addr: u16, count: usize) -> Vec<String> {
        disassemble_range(self.bus.devices(), addr, count)
    }

    /// Mapper number of the loaded cartridge.
    #[must_use]
    pub fn mapper_id(&self) -> u16 {
        self.bus.cartridge().mapper_id()
    }
}

impl std::fmt::Debug for Console {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Console")
            .field("mapper", &self.bus.cartridge().mapper_name())
            .field("frame", &self.bus.ppu().frame_count())
            .field("cycles", &self.bus.cpu().cycles())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nop_rom() -> Vec<u8> {
        let mut data = vec![0x4E, 0x45, 0x53, 0x1A, 1, 1, 0x00, 0x00];
        data.extend_from_slice(&[0; 8]);
        let mut prg = vec![0xEA; 16384];
        prg[0x3FFC] = 0x00;
        prg[0x3FFD] = 0x80;
        data.extend_from_slice(&prg);
        data.extend(std::iter::repeat(0u8).take(8192));
        data
    }

    #[test]
    fn loads_and_steps_a_frame() {
        let mut console = Console::load(&nop_rom()).unwrap();
        console.step_frame();
        assert_eq!(console.frame_count(), 1);
        assert_eq!(console.framebuffer().len(), 256 * 240 * 3);
    }

    #[test]
    fn step_instruction_reports_cycles() {
        let mut console = Console::load(&nop_rom()).unwrap();
        // Burn the reset sequence.
        console.step_instruction();
        assert_eq!(console.step_instruction(), 2); // NOP
    }

    #[test]
    fn reset_restarts_the_clock() {
        let mut console = Console::load(&nop_rom()).unwrap();
        console.step_frame();
        let before = console.cycles();
        assert!(before > 0);

        console.reset();
        assert!(console.cycles() < before);
        assert_eq!(console.cpu().pc, 0x8000);
    }

    #[test]
    fn bad_rom_is_rejected() {
        assert!(matches!(
            Console::load(b"not a rom"),
            Err(ConsoleError::Rom(RomError::BadSignature(_)))
        ));
    }

    #[test]
    fn save_then_load_round_trips() {
        let mut console = Console::load(&nop_rom()).unwrap();
        for _ in 0..3 {
            console.step_frame();
        }

        let mut state = Vec::new();
        console.save_state(&mut state).unwrap();
        let pc = console.cpu().pc;
        let frames = console.frame_count();

        console.step_frame();
        console.load_state(&mut state.as_slice()).unwrap();
        assert_eq!(console.cpu().pc, pc);
        assert_eq!(console.frame_count(), frames);
    }
}
