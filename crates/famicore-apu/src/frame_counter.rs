//! Frame counter (frame sequencer).
//!
//! Counts CPU cycles and fires quarter-frame and half-frame events at the
//! documented points. The half-cycle positions of the hardware sequence
//! (3728.5, 7456.5, ... APU cycles) double to whole CPU cycles here.

use serde::{Deserialize, Serialize};

/// Sequencer mode, selected by bit 7 of $4017.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FrameCounterMode {
    /// 4-step sequence, 14915 APU cycles, optionally raising IRQ.
    #[default]
    FourStep,
    /// 5-step sequence, 18641 APU cycles, no IRQ.
    FiveStep,
}

/// Events produced by one frame-counter clock.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameEvents {
    /// Clock envelopes and the triangle linear counter.
    pub quarter: bool,
    /// Additionally clock length counters and sweep units.
    pub half: bool,
}

/// 4-step event points in CPU cycles.
const FOUR_STEP_CYCLES: [u16; 5] = [7457, 14913, 22371, 29828, 29829];

/// 5-step event points in CPU cycles.
const FIVE_STEP_CYCLES: [u16; 5] = [7457, 14913, 22371, 29829, 37281];

/// Frame counter state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FrameCounter {
    cycle: u16,
    mode: FrameCounterMode,
    irq_inhibit: bool,
    irq_pending: bool,
    /// CPU cycles until a $4017 write takes effect (3 or 4).
    reset_delay: u8,
    pending_mode: Option<FrameCounterMode>,
}

impl FrameCounter {
    /// Fresh counter in 4-step mode.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// $4017 write: bit 7 selects the mode, bit 6 inhibits (and clears) the
    /// frame IRQ. The mode change lands 3 or 4 cycles later depending on
    /// write parity.
    pub fn write(&mut self, value: u8) {
        self.irq_inhibit = value & 0x40 != 0;
        if self.irq_inhibit {
            self.irq_pending = false;
        }

        self.pending_mode = Some(if value & 0x80 != 0 {
            FrameCounterMode::FiveStep
        } else {
            FrameCounterMode::FourStep
        });
        self.reset_delay = if self.cycle % 2 == 0 { 4 } else { 3 };
    }

    /// Advance one CPU cycle.
    pub fn clock(&mut self) -> FrameEvents {
        if self.reset_delay > 0 {
            self.reset_delay -= 1;
            if self.reset_delay == 0 {
                if let Some(mode) = self.pending_mode.take() {
                    self.mode = mode;
                    self.cycle = 0;
                    // Selecting 5-step mode clocks both units immediately.
                    if self.mode == FrameCounterMode::FiveStep {
                        return FrameEvents {
                            quarter: true,
                            half: true,
                        };
                    }
                }
            }
        }

        self.cycle += 1;
        let mut events = FrameEvents::default();

        match self.mode {
            FrameCounterMode::FourStep => {
                if self.cycle == FOUR_STEP_CYCLES[0] || self.cycle == FOUR_STEP_CYCLES[2] {
                    events.quarter = true;
                } else if self.cycle == FOUR_STEP_CYCLES[1] {
                    events.quarter = true;
                    events.half = true;
                } else if self.cycle == FOUR_STEP_CYCLES[3] {
                    if !self.irq_inhibit {
                        self.irq_pending = true;
                    }
                } else if self.cycle == FOUR_STEP_CYCLES[4] {
                    events.quarter = true;
                    events.half = true;
                    if !self.irq_inhibit {
                        self.irq_pending = true;
                    }
                    self.cycle = 0;
                }
            }
            FrameCounterMode::FiveStep => {
                if self.cycle == FIVE_STEP_CYCLES[0] || self.cycle == FIVE_STEP_CYCLES[2] {
                    events.quarter = true;
                } else if self.cycle == FIVE_STEP_CYCLES[1] {
                    events.quarter = true;
                    events.half = true;
                } else if self.cycle == FIVE_STEP_CYCLES[4] {
                    events.quarter = true;
                    events.half = true;
                    self.cycle = 0;
                }
                // FIVE_STEP_CYCLES[3] is the silent step.
            }
        }

        events
    }

    /// Frame IRQ pending.
    #[must_use]
    pub fn irq_pending(&self) -> bool {
        self.irq_pending
    }

    /// Clear the frame IRQ ($4015 read side effect).
    pub fn clear_irq(&mut self) {
        self.irq_pending = false;
    }

    /// Current mode.
    #[must_use]
    pub fn mode(&self) -> FrameCounterMode {
        self.mode
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn four_step_quarter_frames() {
        let mut fc = FrameCounter::new();
        let mut quarters = Vec::new();
        for cycle in 1..=29829u32 {
            if fc.clock().quarter {
                quarters.push(cycle);
            }
        }
        assert_eq!(quarters, vec![7457, 14913, 22371, 29829]);
    }

    #[test]
    fn four_step_half_frames() {
        let mut fc = FrameCounter::new();
        let mut halves = Vec::new();
        for cycle in 1..=29829u32 {
            if fc.clock().half {
                halves.push(cycle);
            }
        }
        assert_eq!(halves, vec![14913, 29829]);
    }

    #[test]
    fn four_step_raises_irq() {
        let mut fc = FrameCounter::new();
        for _ in 0..29829 {
            fc.clock();
        }
        assert!(fc.irq_pending());
        fc.clear_irq();
        assert!(!fc.irq_pending());
    }

    #[test]
    fn irq_inhibit_blocks_and_clears() {
        let mut fc = FrameCounter::new();
        for _ in 0..29829 {
            fc.clock();
        }
        assert!(fc.irq_pending());

        fc.write(0x40); // inhibit clears the pending flag
        assert!(!fc.irq_pending());
        for _ in 0..40_000 {
            fc.clock();
        }
        assert!(!fc.irq_pending());
    }

    #[test]
    fn five_step_mode_clocks_immediately() {
        let mut fc = FrameCounter::new();
        fc.write(0x80);

        let mut immediate = FrameEvents::default();
        for _ in 0..5 {
            let events = fc.clock();
            if events.quarter {
                immediate = events;
            }
        }
        assert!(immediate.quarter && immediate.half);
        assert_eq!(fc.mode(), FrameCounterMode::FiveStep);
    }

    #[test]
    fn five_step_never_raises_irq() {
        let mut fc = FrameCounter::new();
        fc.write(0x80);
        for _ in 0..80_000 {
            fc.clock();
        }
        assert!(!fc.irq_pending());
    }
}
