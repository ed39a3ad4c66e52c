//! Length counter: silences a channel after a programmed duration.

use serde::{Deserialize, Serialize};

/// The 32-entry length table indexed by the 5-bit load value.
const LENGTH_TABLE: [u8; 32] = [
    10, 254, 20, 2, 40, 4, 80, 6, 160, 8, 60, 10, 14, 12, 26, 14, 12, 16, 24, 18, 48, 20, 96, 22,
    192, 24, 72, 26, 16, 28, 32, 30,
];

/// Length counter unit.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LengthCounter {
    enabled: bool,
    halt: bool,
    counter: u8,
}

impl LengthCounter {
    /// Fresh, disabled counter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// $4015 enable bit. Disabling zeroes the counter immediately.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.counter = 0;
        }
    }

    /// Halt flag (shared with the envelope loop bit).
    pub fn set_halt(&mut self, halt: bool) {
        self.halt = halt;
    }

    /// Load from the length table; ignored while the channel is disabled.
    pub fn load(&mut self, index: u8) {
        if self.enabled {
            self.counter = LENGTH_TABLE[usize::from(index & 0x1F)];
        }
    }

    /// Half-frame clock: decrement unless halted or already silent.
    pub fn clock(&mut self) {
        if !self.halt && self.counter > 0 {
            self.counter -= 1;
        }
    }

    /// Channel still audible.
    #[inline]
    #[must_use]
    pub fn active(&self) -> bool {
        self.counter > 0
    }

    /// Raw counter value (debug and $4015 reads).
    #[inline]
    #[must_use]
    pub fn value(&self) -> u8 {
        self.counter
    }
}
