use std::f64::consts::TAU;

use rand::{rngs::SmallRng, Rng, SeedableRng};

/*
Oscillator Bank
===============

Every periodic waveform here is a pure function of absolute time:

    t = (start_sample + i) / sample_rate

The caller passes the index of the first sample of the chunk counted from
the moment the note started (played_chunk × chunk_size), never a phase that
restarts at zero for each chunk. Two consecutive chunks therefore line up
exactly with one chunk of twice the length, and there is no discontinuity
(click) at the boundary.

    chunk n        chunk n+1
    ╭─╮   ╭─╮   ╭─╮   ╭─╮
    │ │   │ │ | │ │   │ │      continuous across "|"
    ╯ ╰─╯ ╰─╯ | ╰─╯ ╰─╯ ╰

Waveforms
---------

  Sine       sin(2π f t)
  Triangle   symmetric ramp: a sawtooth whose peak sits at 50% of the cycle
  Sawtooth   linear ramp from -1 to +1, then reset
  Square     +1 for the first half of each cycle, -1 for the second half
  Noise      uniform random samples in [-1, 1], new values every block

The triangle and sawtooth share one function, `skewed_ramp(phase, width)`,
where `width` is the fraction of the cycle spent rising:

    width = 0.5  →  triangle
    width = 1.0  →  sawtooth
*/

/// Selectable oscillator waveform.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Waveform {
    #[default]
    Sine,
    Triangle,
    Sawtooth,
    Square,
    Noise,
}

impl Waveform {
    pub const ALL: [Waveform; 5] = [
        Waveform::Sine,
        Waveform::Triangle,
        Waveform::Sawtooth,
        Waveform::Square,
        Waveform::Noise,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Waveform::Sine => "sine",
            Waveform::Triangle => "triangle",
            Waveform::Sawtooth => "sawtooth",
            Waveform::Square => "square",
            Waveform::Noise => "noise",
        }
    }

    /// Next waveform in selection order, wrapping around.
    pub fn next(self) -> Self {
        let idx = Self::ALL.iter().position(|&w| w == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }
}

/// Renders raw waveform blocks against an absolute sample clock.
pub struct OscillatorBank {
    sample_rate: f64,
    rng: SmallRng,
}

impl OscillatorBank {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate: sample_rate as f64,
            rng: SmallRng::from_entropy(),
        }
    }

    /// Deterministic noise source, for tests and offline renders.
    pub fn with_seed(sample_rate: u32, seed: u64) -> Self {
        Self {
            sample_rate: sample_rate as f64,
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate as u32
    }

    /// Fill `out` with `waveform` at `frequency` Hz for samples
    /// `start_sample..start_sample + out.len()` of the note.
    pub fn render(
        &mut self,
        waveform: Waveform,
        frequency: f32,
        start_sample: u64,
        out: &mut [f32],
    ) {
        let shape: fn(f64) -> f64 = match waveform {
            Waveform::Sine => |cycles| (TAU * cycles).sin(),
            Waveform::Triangle => |cycles| skewed_ramp(cycles.fract(), 0.5),
            Waveform::Sawtooth => |cycles| skewed_ramp(cycles.fract(), 1.0),
            Waveform::Square => |cycles| if cycles.fract() < 0.5 { 1.0 } else { -1.0 },
            Waveform::Noise => {
                for sample in out.iter_mut() {
                    *sample = self.rng.gen_range(-1.0f32..=1.0);
                }
                return;
            }
        };

        let frequency = frequency as f64;
        for (i, sample) in out.iter_mut().enumerate() {
            let t = (start_sample + i as u64) as f64 / self.sample_rate;
            *sample = shape(frequency * t) as f32;
        }
    }
}

/// Ramp rising from -1 to +1 over `width` of the cycle, then falling back.
#[inline]
fn skewed_ramp(phase: f64, width: f64) -> f64 {
    if phase < width {
        -1.0 + 2.0 * phase / width
    } else {
        1.0 - 2.0 * (phase - width) / (1.0 - width)
    }
}
