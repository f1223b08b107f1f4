//! Parameter snapshots shared between the control surface and the audio thread.
//!
//! Writers build a complete [`ParamSnapshot`] (plain parameters plus every
//! derived table: envelope buffer, filter coefficients, plots) and publish it
//! with a single pointer swap. The audio thread loads the latest snapshot
//! once per chunk and compares `version` to notice changes, so it never sees
//! a new filter order paired with old coefficients.
//!
//! Writers are serialized through a mutex; readers never take it.

use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use tracing::debug;

use crate::{
    dsp::{
        envelope::{EnvelopeBuffer, EnvelopeSettings},
        filter::{
            analog_response, response_frequencies, FilterCoefficients, FilterSettings, FilterType,
        },
        oscillator::{OscillatorBank, Waveform},
    },
    error::Result,
    synth::params::SynthParameters,
    visual::Plot,
};

/// Oscillator rate used for the envelope preview plot.
pub const PREVIEW_FREQUENCY_HZ: f32 = 15.0;
/// Points in the filter response plot.
pub const RESPONSE_POINTS: usize = 256;
/// Envelope plots keep every n-th sample.
const PLOT_STRIDE: usize = 32;
const PREVIEW_SEED: u64 = 0x5eed;

/// One consistent view of every parameter and the tables derived from them.
#[derive(Debug, Clone)]
pub struct ParamSnapshot {
    /// Incremented on every published change.
    pub version: u64,
    pub params: SynthParameters,
    pub envelope: Arc<EnvelopeBuffer>,
    pub filter: Arc<FilterCoefficients>,
    pub envelope_plot: Arc<Plot>,
    pub preview_plot: Arc<Plot>,
    pub response_plot: Arc<Plot>,
}

/// Thread-safe holder of the synthesis parameters.
pub struct ParameterStore {
    current: ArcSwap<ParamSnapshot>,
    writer: Mutex<()>,
    sample_rate: u32,
}

impl ParameterStore {
    /// Store holding the default parameters.
    pub fn new(sample_rate: u32) -> Result<Self> {
        Self::with_parameters(SynthParameters::default(), sample_rate)
    }

    pub fn with_parameters(params: SynthParameters, sample_rate: u32) -> Result<Self> {
        let params = params.sanitized(sample_rate)?;
        let envelope = Arc::new(EnvelopeBuffer::build(params.envelope, sample_rate as usize)?);
        let filter = Arc::new(FilterCoefficients::design(&params.filter, sample_rate)?);
        let (envelope_plot, preview_plot) = envelope_plots(&envelope, params.waveform, sample_rate);
        let response_plot = Arc::new(response_plot(&params.filter, sample_rate)?);

        let snapshot = ParamSnapshot {
            version: 0,
            params,
            envelope,
            filter,
            envelope_plot,
            preview_plot,
            response_plot,
        };
        Ok(Self {
            current: ArcSwap::from_pointee(snapshot),
            writer: Mutex::new(()),
            sample_rate,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Latest published snapshot.
    pub fn snapshot(&self) -> Arc<ParamSnapshot> {
        self.current.load_full()
    }

    pub fn parameters(&self) -> SynthParameters {
        self.current.load().params
    }

    pub fn version(&self) -> u64 {
        self.current.load().version
    }

    /// Apply `change` to a copy of the current parameters and publish the result.
    ///
    /// Values are clamped into range. On error (an envelope that does not fit,
    /// a non-finite value) nothing is published and the previous snapshot
    /// stays in effect. Returns the version now in effect.
    pub fn update(&self, change: impl FnOnce(&mut SynthParameters)) -> Result<u64> {
        let _guard = self.writer.lock();
        let current = self.current.load_full();

        let mut params = current.params;
        change(&mut params);
        let params = params.sanitized(self.sample_rate)?;
        if params == current.params {
            return Ok(current.version);
        }

        let envelope_changed = params.envelope != current.params.envelope;
        let envelope = if envelope_changed {
            Arc::new(EnvelopeBuffer::build(params.envelope, self.sample_rate as usize)?)
        } else {
            Arc::clone(&current.envelope)
        };

        let waveform_changed = params.waveform != current.params.waveform;
        let (envelope_plot, preview_plot) = if envelope_changed || waveform_changed {
            envelope_plots(&envelope, params.waveform, self.sample_rate)
        } else {
            (
                Arc::clone(&current.envelope_plot),
                Arc::clone(&current.preview_plot),
            )
        };

        let (filter, response) = if filter_design_changed(&params.filter, &current.params.filter) {
            (
                Arc::new(FilterCoefficients::design(&params.filter, self.sample_rate)?),
                Arc::new(response_plot(&params.filter, self.sample_rate)?),
            )
        } else {
            (Arc::clone(&current.filter), Arc::clone(&current.response_plot))
        };

        let version = current.version + 1;
        self.current.store(Arc::new(ParamSnapshot {
            version,
            params,
            envelope,
            filter,
            envelope_plot,
            preview_plot,
            response_plot: response,
        }));
        debug!(version, "published parameter snapshot");
        Ok(version)
    }

    /// Replace every parameter at once, e.g. from a saved preset.
    pub fn set_parameters(&self, params: SynthParameters) -> Result<u64> {
        self.update(|p| *p = params)
    }

    pub fn set_envelope(&self, settings: EnvelopeSettings) -> Result<u64> {
        self.update(|p| p.envelope = settings)
    }

    pub fn set_attack(&self, samples: usize) -> Result<u64> {
        self.update(|p| p.envelope.attack = samples)
    }

    pub fn set_decay(&self, samples: usize) -> Result<u64> {
        self.update(|p| p.envelope.decay = samples)
    }

    /// Sustain knob position, 0..=11025.
    pub fn set_sustain(&self, knob: u32) -> Result<u64> {
        self.update(|p| p.envelope.sustain = knob)
    }

    pub fn set_release(&self, samples: usize) -> Result<u64> {
        self.update(|p| p.envelope.release = samples)
    }

    pub fn set_filter_type(&self, kind: FilterType) -> Result<u64> {
        self.update(|p| p.filter.kind = kind)
    }

    pub fn set_filter_cutoff(&self, hz: f32) -> Result<u64> {
        self.update(|p| p.filter.cutoff_hz = hz)
    }

    pub fn set_filter_bandwidth(&self, hz: f32) -> Result<u64> {
        self.update(|p| p.filter.bandwidth_hz = hz)
    }

    pub fn set_filter_order(&self, order: usize) -> Result<u64> {
        self.update(|p| p.filter.order = order)
    }

    pub fn set_filter_enabled(&self, enabled: bool) -> Result<u64> {
        self.update(|p| p.filter.enabled = enabled)
    }

    pub fn set_lfo_rate(&self, hz: f32) -> Result<u64> {
        self.update(|p| p.lfo.rate_hz = hz)
    }

    pub fn set_lfo_depth(&self, depth: f32) -> Result<u64> {
        self.update(|p| p.lfo.depth = depth)
    }

    pub fn set_lfo_offset(&self, offset: f32) -> Result<u64> {
        self.update(|p| p.lfo.offset = offset)
    }

    pub fn set_lfo_enabled(&self, enabled: bool) -> Result<u64> {
        self.update(|p| p.lfo.enabled = enabled)
    }

    pub fn set_delay_samples(&self, samples: usize) -> Result<u64> {
        self.update(|p| p.delay.delay_samples = samples)
    }

    pub fn set_delay_enabled(&self, enabled: bool) -> Result<u64> {
        self.update(|p| p.delay.enabled = enabled)
    }

    pub fn set_waveform(&self, waveform: Waveform) -> Result<u64> {
        self.update(|p| p.waveform = waveform)
    }
}

/// The enable flag does not affect the coefficients.
fn filter_design_changed(next: &FilterSettings, prev: &FilterSettings) -> bool {
    next.kind != prev.kind
        || next.order != prev.order
        || next.cutoff_hz != prev.cutoff_hz
        || (next.kind.is_band() && next.bandwidth_hz != prev.bandwidth_hz)
}

fn envelope_plots(
    envelope: &EnvelopeBuffer,
    waveform: Waveform,
    sample_rate: u32,
) -> (Arc<Plot>, Arc<Plot>) {
    let rate = sample_rate as f64;
    let x: Vec<f64> = (0..envelope.len())
        .step_by(PLOT_STRIDE)
        .map(|i| i as f64 / rate)
        .collect();

    let curve = Plot::from_pairs(
        x.clone(),
        envelope.values().iter().step_by(PLOT_STRIDE).map(|&v| v as f64).collect(),
    );

    let mut shaped = vec![0.0f32; envelope.len()];
    OscillatorBank::with_seed(sample_rate, PREVIEW_SEED).render(
        waveform,
        PREVIEW_FREQUENCY_HZ,
        0,
        &mut shaped,
    );
    let preview = Plot::from_pairs(
        x,
        shaped
            .iter()
            .zip(envelope.values())
            .step_by(PLOT_STRIDE)
            .map(|(&s, &g)| (s * g) as f64)
            .collect(),
    );

    (Arc::new(curve), Arc::new(preview))
}

fn response_plot(settings: &FilterSettings, sample_rate: u32) -> Result<Plot> {
    let freqs = response_frequencies(RESPONSE_POINTS);
    let db = analog_response(settings, sample_rate, &freqs)?;
    Ok(Plot::from_pairs(freqs, db))
}
