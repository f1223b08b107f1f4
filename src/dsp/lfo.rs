//! Amplitude LFO (tremolo).

/*
Low Frequency Oscillator
========================

The LFO here only does one job: amplitude modulation. For every sample it
computes a gain and multiplies it into the signal:

    gain(t) = depth × sin(2π × rate × t) + offset

It runs on the same absolute clock as the audio oscillator, so the wobble
continues smoothly across chunk boundaries instead of restarting each chunk.

  rate     Hz, control-rate (typically 0.1 - 20 Hz)
  depth    swing of the sine around the offset
  offset   centre gain; depth = offset = 0.5 sweeps the gain over 0..1

When disabled the LFO is the identity: the signal passes through untouched.
*/

use std::f64::consts::TAU;

/// LFO settings as published by the parameter store.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LfoSettings {
    pub rate_hz: f32,
    pub depth: f32,
    pub offset: f32,
    pub enabled: bool,
}

impl Default for LfoSettings {
    fn default() -> Self {
        Self {
            rate_hz: 5.0,
            depth: 0.5,
            offset: 0.5,
            enabled: false,
        }
    }
}

impl LfoSettings {
    /// Gain at time `t` seconds.
    #[inline]
    pub fn gain_at(&self, t: f64) -> f32 {
        (self.depth as f64 * (TAU * self.rate_hz as f64 * t).sin() + self.offset as f64) as f32
    }
}

/// Multiplies an amplitude LFO into signal blocks.
pub struct Lfo {
    sample_rate: f64,
}

impl Lfo {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate: sample_rate as f64,
        }
    }

    /// Apply the LFO to samples `start_sample..start_sample + signal.len()` of the note.
    pub fn modulate(&self, settings: &LfoSettings, start_sample: u64, signal: &mut [f32]) {
        if !settings.enabled {
            return;
        }
        for (i, sample) in signal.iter_mut().enumerate() {
            let t = (start_sample + i as u64) as f64 / self.sample_rate;
            *sample *= settings.gain_at(t);
        }
    }
}
