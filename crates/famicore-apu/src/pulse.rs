//! Pulse (square wave) channel.

use serde::{Deserialize, Serialize};

use crate::envelope::Envelope;
use crate::length_counter::LengthCounter;
use crate::sweep::{PulseChannel, Sweep};
use crate::timer::Timer;

/// Duty waveforms; 1 = high.
const DUTY_TABLE: [[u8; 8]; 4] = [
    [0, 1, 0, 0, 0, 0, 0, 0], // 12.5%
    [0, 1, 1, 0, 0, 0, 0, 0], // 25%
    [0, 1, 1, 1, 1, 0, 0, 0], // 50%
    [1, 0, 0, 1, 1, 1, 1, 1], // 25% inverted
];

/// One of the two pulse channels.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pulse {
    envelope: Envelope,
    sweep: Sweep,
    length: LengthCounter,
    timer: Timer,
    duty: u8,
    sequencer: u8,
}

impl Pulse {
    /// Fresh channel. The channel id picks the sweep's negate behavior.
    #[must_use]
    pub fn new(channel: PulseChannel) -> Self {
        Self {
            envelope: Envelope::new(),
            sweep: Sweep::new(channel),
            length: LengthCounter::new(),
            timer: Timer::new(),
            duty: 0,
            sequencer: 0,
        }
    }

    /// $4000/$4004: duty, envelope, halt.
    pub fn write_ctrl(&mut self, value: u8) {
        self.duty = value >> 6;
        self.envelope.write(value);
        self.length.set_halt(self.envelope.loop_flag());
    }

    /// $4001/$4005: sweep setup.
    pub fn write_sweep(&mut self, value: u8) {
        self.sweep.write(value);
    }

    /// $4002/$4006: timer low byte.
    pub fn write_timer_lo(&mut self, value: u8) {
        self.timer.set_period_lo(value);
    }

    /// $4003/$4007: timer high bits, length load, phase reset.
    pub fn write_timer_hi(&mut self, value: u8) {
        self.timer.set_period_hi(value);
        self.length.load(value >> 3);
        self.envelope.start();
        self.sequencer = 0;
    }

    /// $4015 enable bit.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.length.set_enabled(enabled);
    }

    /// Length counter still running ($4015 status bit).
    #[must_use]
    pub fn active(&self) -> bool {
        self.length.active()
    }

    /// Timer clock; called once per APU cycle (every other CPU cycle).
    pub fn clock_timer(&mut self) {
        if self.timer.clock() {
            self.sequencer = (self.sequencer + 1) & 0x07;
        }
    }

    /// Quarter-frame clock.
    pub fn clock_quarter_frame(&mut self) {
        self.envelope.clock();
    }

    /// Half-frame clock.
    pub fn clock_half_frame(&mut self) {
        self.length.clock();
        if let Some(period) = self.sweep.clock(self.timer.period()) {
            self.timer.set_period(period);
        }
    }

    /// Current output level (0-15).
    #[must_use]
    pub fn output(&self) -> u8 {
        if !self.length.active()
            || self.sweep.muted(self.timer.period())
            || DUTY_TABLE[usize::from(self.duty)][usize::from(self.sequencer)] == 0
        {
            return 0;
        }
        self.envelope.output()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn audible_pulse() -> Pulse {
        let mut pulse = Pulse::new(PulseChannel::One);
        pulse.set_enabled(true);
        pulse.write_ctrl(0x3F); // duty 0, constant volume 15
        pulse.write_timer_lo(0x40); // period clear of sweep muting
        pulse.write_timer_hi(0x08); // load length
        pulse
    }

    #[test]
    fn duty_cycle_gates_output() {
        let mut pulse = audible_pulse();
        pulse.sequencer = 1;
        assert_eq!(pulse.output(), 15);
        pulse.sequencer = 0;
        assert_eq!(pulse.output(), 0);
    }

    #[test]
    fn silent_when_length_expired() {
        let mut pulse = audible_pulse();
        pulse.sequencer = 1;
        pulse.set_enabled(false);
        assert_eq!(pulse.output(), 0);
    }

    #[test]
    fn silent_when_sweep_mutes() {
        let mut pulse = Pulse::new(PulseChannel::One);
        pulse.set_enabled(true);
        pulse.write_ctrl(0x3F);
        pulse.write_timer_lo(0x04); // period < 8
        pulse.write_timer_hi(0x08);
        pulse.sequencer = 1;
        assert_eq!(pulse.output(), 0);
    }

    #[test]
    fn timer_steps_sequencer() {
        let mut pulse = audible_pulse();
        let start = pulse.sequencer;
        for _ in 0..=u32::from(pulse.timer.period()) {
            pulse.clock_timer();
        }
        assert_eq!(pulse.sequencer, (start + 1) & 7);
    }
}
