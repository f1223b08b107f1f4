//! Signal-processing primitives used by the voice chain.
//!
//! Every primitive works on whole chunks against an absolute sample clock,
//! so rendering one long block or several consecutive chunks gives the same
//! samples. None of them allocate once constructed.

/// Ring-buffer echo with a bounded number of repeats.
pub mod delay;
/// Precomputed one-second ADSR curve and release tails.
pub mod envelope;
/// Butterworth design and the streaming IIR filter.
pub mod filter;
/// Amplitude LFO.
pub mod lfo;
/// Waveform generators.
pub mod oscillator;

pub use delay::FeedbackDelay;
pub use envelope::{EnvelopeBuffer, EnvelopeSettings, ReleaseCurve};
pub use filter::{FilterCoefficients, FilterOutcome, FilterSettings, FilterType, StreamingFilter};
pub use lfo::{Lfo, LfoSettings};
pub use oscillator::{OscillatorBank, Waveform};
