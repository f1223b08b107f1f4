use crate::error::{Result, SynthError};

/*
Precomputed ADSR Envelope
=========================

The envelope is not stepped sample-by-sample. Whenever the envelope
parameters change, the whole one-second curve is built up front and the
voice reads it by index while a key is held:

    index range for chunk n = [n * chunk_size, (n + 1) * chunk_size)

Vocabulary
----------

  segment     One of the four pieces of the curve: Attack, Decay, Sustain,
              Release. Lengths are given in samples.

  knob        Sustain is entered as a knob position in 0..=11025 rather than
              as a level. The level is derived on a log scale (see below).

  headroom    Every value is multiplied by OUTPUT_GAIN (0.707, about -3 dB)
              so the delay and LFO have room before the signal clips.


The Shape: Log Ramps
--------------------

  Level
    1.0 ┐   ╭╮
        │  ╭╯╰╮
    S   │ ╭╯  ╰───────────╮
        │╭╯               ╰╮
    0.0 └╯─────────────────╰──→ Time (one second)
        Attack Decay Sustain Release

Each ramp is a run of logarithmically spaced points, the same values
numpy's logspace produces:

    logspace(start, end, n)[i] = 10 ^ (start + (end - start) * i / (n - 1))

  Attack:   1.1 - logspace(1, 0, a) / 10        0.1 → 1.0, fast start
  Decay:    logspace(1, k, d) / 10              1.0 → sustain
  Sustain:  10^k / 10 repeated                  plateau
  Release:  logspace(k, 0, r) / 10              sustain → 0.1

with k = knob / 11025. The raw curve lives in [0.1, 1.0] and is stretched
with raw × 1.1 - 0.1 onto [0.01, 1.0]: the attack starts and the release
ends at 0.01 (-40 dB), and a full sustain knob holds at exactly 1.0.

The sustain plateau fills whatever the other three segments leave of the
buffer, so attack + decay + release must stay below the sample rate.


Releasing a Held Key
--------------------

The release segment at the end of the buffer is only reached if a key is
held for the full second. When a key goes up earlier, a separate release
curve of 2 × release samples is generated from the level at that moment
down to zero, using the same log shape. This tail is normalized with
(raw - 0.1) / 0.9 instead, so it lands exactly on silence before the voice
goes idle.
*/

/// Fixed output gain applied to every envelope value (about -3 dB).
pub const OUTPUT_GAIN: f32 = 0.707;
/// Largest sustain knob value; maps to a full-level plateau.
pub const SUSTAIN_KNOB_MAX: u32 = 11_025;

const RAW_FLOOR: f64 = 0.1;

/// Attack/decay/sustain/release settings, in samples and knob units.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvelopeSettings {
    pub attack: usize,
    pub decay: usize,
    /// Sustain knob position, 0..=SUSTAIN_KNOB_MAX.
    pub sustain: u32,
    pub release: usize,
}

impl Default for EnvelopeSettings {
    fn default() -> Self {
        Self {
            attack: 11_025,
            decay: 11_025,
            sustain: 5_000,
            release: 11_025,
        }
    }
}

impl EnvelopeSettings {
    pub fn new(attack: usize, decay: usize, sustain: u32, release: usize) -> Self {
        Self {
            attack,
            decay,
            sustain: sustain.min(SUSTAIN_KNOB_MAX),
            release,
        }
    }

    /// Reject settings whose segments do not fit a buffer of `length` samples.
    pub fn validate(&self, length: usize) -> Result<()> {
        let total = self
            .attack
            .saturating_add(self.decay)
            .saturating_add(self.release);
        if total >= length {
            return Err(SynthError::EnvelopeTooLong {
                attack: self.attack,
                decay: self.decay,
                release: self.release,
                sample_rate: length,
            });
        }
        Ok(())
    }

    /// Plateau level in 0.0..=1.0, before output gain.
    pub fn sustain_level(&self) -> f32 {
        remap(raw_sustain(self.sustain)) as f32
    }
}

/// A one-second amplitude curve built from [`EnvelopeSettings`].
#[derive(Debug, Clone, PartialEq)]
pub struct EnvelopeBuffer {
    settings: EnvelopeSettings,
    values: Vec<f32>,
}

impl EnvelopeBuffer {
    /// Build the curve for a buffer of `length` samples (one second).
    ///
    /// Fails with [`SynthError::EnvelopeTooLong`] when the attack, decay and
    /// release segments together do not leave room for the sustain plateau.
    pub fn build(settings: EnvelopeSettings, length: usize) -> Result<Self> {
        let settings = EnvelopeSettings::new(
            settings.attack,
            settings.decay,
            settings.sustain,
            settings.release,
        );
        settings.validate(length)?;

        let k = settings.sustain as f64 / SUSTAIN_KNOB_MAX as f64;
        let plateau = length - settings.attack - settings.decay - settings.release;

        let mut values = Vec::with_capacity(length);
        values.extend(logspace(1.0, 0.0, settings.attack).map(|v| 1.1 - v / 10.0));
        values.extend(logspace(1.0, k, settings.decay).map(|v| v / 10.0));
        values.extend(std::iter::repeat(raw_sustain(settings.sustain)).take(plateau));
        values.extend(logspace(k, 0.0, settings.release).map(|v| v / 10.0));

        let values = values
            .into_iter()
            .map(|raw| remap(raw) as f32 * OUTPUT_GAIN)
            .collect();

        Ok(Self { settings, values })
    }

    pub fn settings(&self) -> EnvelopeSettings {
        self.settings
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Samples covered by attack and decay; past this a held key sits on the plateau.
    pub fn attack_decay_len(&self) -> usize {
        self.settings.attack + self.settings.decay
    }

    /// Gain for absolute sample `index` of a key that is still held.
    #[inline]
    pub fn held_gain(&self, index: usize) -> f32 {
        if index < self.attack_decay_len() {
            self.values[index]
        } else {
            self.settings.sustain_level() * OUTPUT_GAIN
        }
    }

    /// Envelope level (without output gain) at `index`, used as the start of a release.
    pub fn held_level(&self, index: usize) -> f32 {
        self.held_gain(index) / OUTPUT_GAIN
    }

    /// Fill `out` with the gains for samples `start..start + out.len()` of a held key.
    pub fn render_held(&self, start: usize, out: &mut [f32]) {
        for (i, gain) in out.iter_mut().enumerate() {
            *gain = self.held_gain(start + i);
        }
    }
}

/// Release tail generated when a key goes up.
///
/// The backing storage is allocated once; [`ReleaseCurve::trigger`] only
/// refills it, so key releases do not allocate on the audio thread.
#[derive(Debug, Clone)]
pub struct ReleaseCurve {
    values: Vec<f32>,
}

impl ReleaseCurve {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            values: Vec::with_capacity(capacity),
        }
    }

    /// Regenerate the tail: `2 * release` samples from `level` down to zero.
    pub fn trigger(&mut self, level: f32, release: usize) {
        self.values.clear();
        let len = release.saturating_mul(2);
        let level = level.clamp(0.0, 1.0) as f64;
        self.values.extend(
            logspace(1.0, 0.0, len).map(|v| (fade(v / 10.0) * level) as f32 * OUTPUT_GAIN),
        );
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Fill `out` with gains for release samples `start..start + out.len()`; zero past the end.
    pub fn render(&self, start: usize, out: &mut [f32]) {
        for (i, gain) in out.iter_mut().enumerate() {
            *gain = self.values.get(start + i).copied().unwrap_or(0.0);
        }
    }

    /// True once `elapsed` samples cover the whole tail.
    pub fn is_exhausted(&self, elapsed: usize) -> bool {
        elapsed >= self.values.len()
    }
}

fn logspace(start: f64, end: f64, n: usize) -> impl Iterator<Item = f64> {
    let step = if n > 1 {
        (end - start) / (n - 1) as f64
    } else {
        0.0
    };
    (0..n).map(move |i| 10f64.powf(start + step * i as f64))
}

fn raw_sustain(knob: u32) -> f64 {
    10f64.powf(knob.min(SUSTAIN_KNOB_MAX) as f64 / SUSTAIN_KNOB_MAX as f64) / 10.0
}

/// Table level for a raw log-curve value: 0.1 → 0.01, 1.0 → 1.0.
#[inline]
fn remap(raw: f64) -> f64 {
    (raw * 1.1 - RAW_FLOOR).clamp(0.0, 1.0)
}

/// Release-tail level for a raw log-curve value: 0.1 → 0.0, 1.0 → 1.0.
#[inline]
fn fade(raw: f64) -> f64 {
    ((raw - RAW_FLOOR) / (1.0 - RAW_FLOOR)).clamp(0.0, 1.0)
}
