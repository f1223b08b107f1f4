//! Tunable synthesis parameters and their accepted ranges.

use std::ops::RangeInclusive;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    dsp::{
        envelope::EnvelopeSettings,
        filter::{FilterSettings, MAX_ORDER, MIN_ORDER},
        lfo::LfoSettings,
        oscillator::Waveform,
    },
    error::{Result, SynthError},
    MAX_DELAY_SAMPLES, MAX_FEEDBACK_DEPTH,
};

pub const CUTOFF_RANGE_HZ: RangeInclusive<f32> = 100.0..=8_000.0;
pub const BANDWIDTH_RANGE_HZ: RangeInclusive<f32> = 10.0..=1_000.0;
pub const ORDER_RANGE: RangeInclusive<usize> = MIN_ORDER..=MAX_ORDER;
pub const LFO_RATE_RANGE_HZ: RangeInclusive<f32> = 0.1..=20.0;
pub const LFO_DEPTH_RANGE: RangeInclusive<f32> = 0.0..=1.0;
pub const LFO_OFFSET_RANGE: RangeInclusive<f32> = 0.0..=1.0;
pub const DELAY_RANGE_SAMPLES: RangeInclusive<usize> = 1..=MAX_DELAY_SAMPLES;

/// Echo settings.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelaySettings {
    pub delay_samples: usize,
    pub enabled: bool,
    /// Number of echo repeats; fixed at [`MAX_FEEDBACK_DEPTH`].
    pub max_feedback_depth: usize,
}

impl Default for DelaySettings {
    fn default() -> Self {
        Self {
            delay_samples: 11_025,
            enabled: false,
            max_feedback_depth: MAX_FEEDBACK_DEPTH,
        }
    }
}

/// Every parameter the control surface can change.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SynthParameters {
    pub envelope: EnvelopeSettings,
    pub filter: FilterSettings,
    pub lfo: LfoSettings,
    pub delay: DelaySettings,
    pub waveform: Waveform,
}

impl SynthParameters {
    /// Clamp every field into its accepted range.
    ///
    /// Rejects non-finite values and envelopes that do not fit in `sample_rate` samples.
    pub fn sanitized(mut self, sample_rate: u32) -> Result<Self> {
        self.envelope = EnvelopeSettings::new(
            self.envelope.attack,
            self.envelope.decay,
            self.envelope.sustain,
            self.envelope.release,
        );
        self.envelope.validate(sample_rate as usize)?;

        self.filter.order = clamp_range(self.filter.order, &ORDER_RANGE);
        self.filter.cutoff_hz =
            clamp_finite("filter cutoff", self.filter.cutoff_hz, &CUTOFF_RANGE_HZ)?;
        self.filter.bandwidth_hz =
            clamp_finite("filter bandwidth", self.filter.bandwidth_hz, &BANDWIDTH_RANGE_HZ)?;

        self.lfo.rate_hz = clamp_finite("lfo rate", self.lfo.rate_hz, &LFO_RATE_RANGE_HZ)?;
        self.lfo.depth = clamp_finite("lfo depth", self.lfo.depth, &LFO_DEPTH_RANGE)?;
        self.lfo.offset = clamp_finite("lfo offset", self.lfo.offset, &LFO_OFFSET_RANGE)?;

        self.delay.delay_samples = clamp_range(self.delay.delay_samples, &DELAY_RANGE_SAMPLES);
        self.delay.max_feedback_depth = MAX_FEEDBACK_DEPTH;
        Ok(self)
    }
}

/// Clamp a finite value into `range`; NaN and infinities are rejected.
pub fn clamp_finite(name: &'static str, value: f32, range: &RangeInclusive<f32>) -> Result<f32> {
    if !value.is_finite() {
        return Err(SynthError::invalid(name, format!("{value} is not a finite number")));
    }
    Ok(value.clamp(*range.start(), *range.end()))
}

pub fn clamp_range(value: usize, range: &RangeInclusive<usize>) -> usize {
    value.clamp(*range.start(), *range.end())
}
