//! Triangle channel.

use serde::{Deserialize, Serialize};

use crate::length_counter::LengthCounter;
use crate::linear_counter::LinearCounter;
use crate::timer::Timer;

/// The 32-step triangle waveform.
const TRIANGLE_SEQUENCE: [u8; 32] = [
    15, 14, 13, 12, 11, 10, 9, 8, 7, 6, 5, 4, 3, 2, 1, 0, 0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11,
    12, 13, 14, 15,
];

/// Triangle channel: timer clocked every CPU cycle; the sequencer advances
/// only while both the linear and length counters are non-zero.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Triangle {
    linear: LinearCounter,
    length: LengthCounter,
    timer: Timer,
    sequencer: u8,
}

impl Triangle {
    /// Fresh channel.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// $4008: linear counter setup; the control bit also halts the length
    /// counter.
    pub fn write_linear(&mut self, value: u8) {
        self.linear.write(value);
        self.length.set_halt(value & 0x80 != 0);
    }

    /// $400A: timer low byte.
    pub fn write_timer_lo(&mut self, value: u8) {
        self.timer.set_period_lo(value);
    }

    /// $400B: timer high bits, length load, linear reload.
    pub fn write_timer_hi(&mut self, value: u8) {
        self.timer.set_period_hi(value);
        self.length.load(value >> 3);
        self.linear.set_reload();
    }

    /// $4015 enable bit.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.length.set_enabled(enabled);
    }

    /// Length counter still running.
    #[must_use]
    pub fn active(&self) -> bool {
        self.length.active()
    }

    /// Timer clock; called every CPU cycle.
    pub fn clock_timer(&mut self) {
        if self.timer.clock() && self.linear.active() && self.length.active() {
            self.sequencer = (self.sequencer + 1) & 0x1F;
        }
    }

    /// Quarter-frame clock.
    pub fn clock_quarter_frame(&mut self) {
        self.linear.clock();
    }

    /// Half-frame clock.
    pub fn clock_half_frame(&mut self) {
        self.length.clock();
    }

    /// Current output level (0-15). The sequencer holds its last value
    /// while the channel is gated, so there is no pop on silence.
    #[must_use]
    pub fn output(&self) -> u8 {
        TRIANGLE_SEQUENCE[usize::from(self.sequencer)]
    }
}
