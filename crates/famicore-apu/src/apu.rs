//! 2A03 APU core.
//!
//! Clocked once per CPU cycle by the system bus. The triangle timer runs at
//! the full CPU rate; pulse and noise timers at half of it. The frame
//! counter distributes quarter/half-frame clocks to the envelope, linear,
//! length, and sweep units.
//!
//! Mixing is the linear approximation
//! `0.00752*(p1+p2) + 0.00851*t + 0.00494*n + 0.00335*dmc`
//! with the DMC term fixed at zero (the channel is not implemented). One
//! f32 sample is emitted whenever the CPU-cycle accumulator crosses
//! `CPU_CLOCK_HZ / sample_rate`.

use serde::{Deserialize, Serialize};

use crate::frame_counter::FrameCounter;
use crate::noise::Noise;
use crate::pulse::Pulse;
use crate::sweep::PulseChannel;
use crate::triangle::Triangle;

/// NTSC CPU clock rate.
pub const CPU_CLOCK_HZ: f32 = 1_789_773.0;

/// Default audio sample rate.
pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;

/// 2A03 APU.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Apu {
    pulse1: Pulse,
    pulse2: Pulse,
    triangle: Triangle,
    noise: Noise,
    frame_counter: FrameCounter,
    /// CPU cycles elapsed (parity picks which timers tick).
    cycle: u64,
    sample_rate: u32,
    /// CPU cycles accumulated toward the next sample.
    sample_accumulator: f32,
    /// Most recent mixed sample.
    latest_sample: f32,
}

impl Apu {
    /// Fresh APU at the default 44.1 kHz output rate.
    #[must_use]
    pub fn new() -> Self {
        Self {
            pulse1: Pulse::new(PulseChannel::One),
            pulse2: Pulse::new(PulseChannel::Two),
            triangle: Triangle::new(),
            noise: Noise::new(),
            frame_counter: FrameCounter::new(),
            cycle: 0,
            sample_rate: DEFAULT_SAMPLE_RATE,
            sample_accumulator: 0.0,
            latest_sample: 0.0,
        }
    }

    /// Cold reset.
    pub fn reset(&mut self) {
        let sample_rate = self.sample_rate;
        *self = Self::new();
        self.sample_rate = sample_rate;
    }

    /// Change the output sample rate.
    pub fn set_sample_rate(&mut self, sample_rate: u32) {
        self.sample_rate = sample_rate.max(1);
    }

    /// Register write, $4000-$4017.
    pub fn write(&mut self, addr: u16, value: u8) {
        match addr {
            0x4000 => self.pulse1.write_ctrl(value),
            0x4001 => self.pulse1.write_sweep(value),
            0x4002 => self.pulse1.write_timer_lo(value),
            0x4003 => self.pulse1.write_timer_hi(value),

            0x4004 => self.pulse2.write_ctrl(value),
            0x4005 => self.pulse2.write_sweep(value),
            0x4006 => self.pulse2.write_timer_lo(value),
            0x4007 => self.pulse2.write_timer_hi(value),

            0x4008 => self.triangle.write_linear(value),
            0x400A => self.triangle.write_timer_lo(value),
            0x400B => self.triangle.write_timer_hi(value),

            0x400C => self.noise.write_ctrl(value),
            0x400E => self.noise.write_period(value),
            0x400F => self.noise.write_length(value),

            0x4015 => {
                self.pulse1.set_enabled(value & 0x01 != 0);
                self.pulse2.set_enabled(value & 0x02 != 0);
                self.triangle.set_enabled(value & 0x04 != 0);
                self.noise.set_enabled(value & 0x08 != 0);
            }

            0x4017 => self.frame_counter.write(value),

            // DMC registers; the channel is not implemented.
            0x4010..=0x4013 => {
                log::trace!("DMC register ${addr:04X} write ignored");
            }

            _ => {}
        }
    }

    /// $4015 read: per-channel length flags plus the frame IRQ bit; reading
    /// clears the frame IRQ.
    pub fn read_status(&mut self) -> u8 {
        let status = self.peek_status();
        self.frame_counter.clear_irq();
        status
    }

    /// $4015 without side effects (debug views).
    #[must_use]
    pub fn peek_status(&self) -> u8 {
        let mut status = 0u8;
        if self.pulse1.active() {
            status |= 0x01;
        }
        if self.pulse2.active() {
            status |= 0x02;
        }
        if self.triangle.active() {
            status |= 0x04;
        }
        if self.noise.active() {
            status |= 0x08;
        }
        if self.frame_counter.irq_pending() {
            status |= 0x40;
        }
        status
    }

    /// Frame-counter IRQ line.
    #[must_use]
    pub fn irq_pending(&self) -> bool {
        self.frame_counter.irq_pending()
    }

    /// Advance one CPU cycle. Returns a freshly mixed sample when the
    /// output accumulator crosses its threshold.
    pub fn clock(&mut self) -> Option<f32> {
        self.triangle.clock_timer();
        if self.cycle % 2 == 1 {
            self.pulse1.clock_timer();
            self.pulse2.clock_timer();
            self.noise.clock_timer();
        }

        let events = self.frame_counter.clock();
        if events.quarter {
            self.pulse1.clock_quarter_frame();
            self.pulse2.clock_quarter_frame();
            self.triangle.clock_quarter_frame();
            self.noise.clock_quarter_frame();
        }
        if events.half {
            self.pulse1.clock_half_frame();
            self.pulse2.clock_half_frame();
            self.triangle.clock_half_frame();
            self.noise.clock_half_frame();
        }

        self.cycle = self.cycle.wrapping_add(1);

        self.sample_accumulator += 1.0;
        let threshold = CPU_CLOCK_HZ / self.sample_rate as f32;
        if self.sample_accumulator >= threshold {
            self.sample_accumulator -= threshold;
            self.latest_sample = self.mix();
            Some(self.latest_sample)
        } else {
            None
        }
    }

    /// Most recent mixed sample.
    #[must_use]
    pub fn latest_sample(&self) -> f32 {
        self.latest_sample
    }

    /// Linear channel mix, approximately 0.0 to 1.0.
    fn mix(&self) -> f32 {
        let pulse1 = f32::from(self.pulse1.output());
        let pulse2 = f32::from(self.pulse2.output());
        let triangle = f32::from(self.triangle.output());
        let noise = f32::from(self.noise.output());
        let dmc = 0.0f32;

        0.007_52 * (pulse1 + pulse2) + 0.008_51 * triangle + 0.004_94 * noise + 0.003_35 * dmc
    }
}

impl Default for Apu {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_reflects_length_counters() {
        let mut apu = Apu::new();
        assert_eq!(apu.read_status(), 0);

        apu.write(0x4015, 0x0F);
        apu.write(0x4003, 0x08); // pulse 1 length
        apu.write(0x4007, 0x08); // pulse 2 length
        apu.write(0x400B, 0x08); // triangle length
        apu.write(0x400F, 0x08); // noise length
        assert_eq!(apu.read_status() & 0x0F, 0x0F);

        apu.write(0x4015, 0x00); // disabling clears all length counters
        assert_eq!(apu.read_status() & 0x0F, 0x00);
    }

    #[test]
    fn status_read_clears_frame_irq() {
        let mut apu = Apu::new();
        for _ in 0..29_830 {
            apu.clock();
        }
        assert!(apu.irq_pending());
        let status = apu.read_status();
        assert_ne!(status & 0x40, 0);
        assert!(!apu.irq_pending());
    }

    #[test]
    fn sample_rate_paces_output() {
        let mut apu = Apu::new();
        let mut samples = 0u32;
        for _ in 0..1_789_773 {
            if apu.clock().is_some() {
                samples += 1;
            }
        }
        // One emulated second yields the sample rate, within rounding.
        assert!((samples as i64 - 44_100).abs() <= 1, "samples = {samples}");
    }

    #[test]
    fn mix_is_normalized() {
        let mut apu = Apu::new();
        apu.write(0x4015, 0x0F);
        // Max out pulse volumes.
        apu.write(0x4000, 0x3F);
        apu.write(0x4004, 0x3F);
        apu.write(0x4003, 0x08);
        apu.write(0x4007, 0x08);

        for _ in 0..100_000 {
            apu.clock();
        }
        let sample = apu.latest_sample();
        assert!((0.0..=1.0).contains(&sample));
    }

    #[test]
    fn silent_apu_mixes_to_zero() {
        let apu = Apu::new();
        assert_eq!(apu.latest_sample(), 0.0);
    }
}
