//! 2A03 APU (Audio Processing Unit) emulation for the famicore NES
//! emulator.
//!
//! Two pulse channels, a triangle, and a noise channel, sequenced by the
//! frame counter and mixed to one f32 sample stream. The DMC channel is
//! out of scope; its mixer contribution is fixed at zero.

pub mod apu;
pub mod envelope;
pub mod frame_counter;
pub mod length_counter;
pub mod linear_counter;
pub mod noise;
pub mod pulse;
pub mod sweep;
pub mod timer;
pub mod triangle;

pub use apu::{Apu, CPU_CLOCK_HZ, DEFAULT_SAMPLE_RATE};
pub use envelope::Envelope;
pub use frame_counter::{FrameCounter, FrameCounterMode, FrameEvents};
pub use length_counter::LengthCounter;
pub use linear_counter::LinearCounter;
pub use noise::Noise;
pub use pulse::Pulse;
pub use sweep::{PulseChannel, Sweep};
pub use timer::Timer;
pub use triangle::Triangle;
