//! Linear counter for the triangle channel.

use serde::{Deserialize, Serialize};

/// Higher-resolution companion to the length counter, clocked on quarter
/// frames.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LinearCounter {
    reload_value: u8,
    counter: u8,
    reload: bool,
    /// Control flag: while set, the reload flag is never cleared.
    control: bool,
}

impl LinearCounter {
    /// Fresh counter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// $4008 write: control flag and 7-bit reload value.
    pub fn write(&mut self, value: u8) {
        self.control = value & 0x80 != 0;
        self.reload_value = value & 0x7F;
    }

    /// $400B side effect: set the reload flag.
    pub fn set_reload(&mut self) {
        self.reload = true;
    }

    /// Quarter-frame clock.
    pub fn clock(&mut self) {
        if self.reload {
            self.counter = self.reload_value;
        } else if self.counter > 0 {
            self.counter -= 1;
        }
        if !self.control {
            self.reload = false;
        }
    }

    /// Non-zero while the triangle sequencer may advance.
    #[inline]
    #[must_use]
    pub fn active(&self) -> bool {
        self.counter > 0
    }
}
