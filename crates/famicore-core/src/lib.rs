//! famicore emulation core.
//!
//! Wires the 6502 CPU, 2C02 PPU, 2A03 APU, and cartridge behind a
//! [`Console`] facade and drives them in lock-step (three PPU dots per CPU
//! cycle) from a single master clock. The core is single-threaded and
//! deterministic; every call performs a bounded amount of work.
//!
//! # Example
//!
//! ```no_run
//! use famicore_core::{buttons, Console};
//!
//! let rom = std::fs::read("game.nes")?;
//! let mut console = Console::load(&rom)?;
//!
//! console.set_controller(0, buttons::START);
//! console.step_frame();
//!
//! let frame = console.framebuffer(); // 256x240 RGB triples
//! let sample = console.audio_sample();
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod bus;
pub mod console;
pub mod save_state;

pub use bus::{Devices, Snapshot, SystemBus};
pub use console::{buttons, Console, ConsoleError};
pub use save_state::{StateError, STATE_MAGIC, STATE_VERSION};

// The crates behind the facade, for hosts that want debug views.
pub use famicore_apu as apu;
pub use famicore_cpu as cpu;
pub use famicore_mappers as mappers;
pub use famicore_ppu as ppu;
