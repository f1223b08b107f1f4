pub mod dsp; // Envelope, oscillator, LFO, filter and delay primitives
pub mod engine; // Audio thread lifecycle and device streaming
pub mod error;
pub mod io; // Key layout and audio output sinks
pub mod synth; // Parameters, voice state machine and chunk rendering
pub mod visual; // Plot and oscilloscope rings to the control surface

pub use engine::{AudioEngine, EngineConfig, EngineStats, SynthContext, SynthEngine};
pub use error::{Result, SynthError};

/// Fixed output sample rate in Hz.
pub const SAMPLE_RATE: u32 = 44_100;
/// Frames rendered and written per engine iteration.
pub const CHUNK_SIZE: usize = 2048;
/// Longest configurable echo spacing, in samples.
pub const MAX_DELAY_SAMPLES: usize = 22_050;
/// Number of echo repeats summed into each chunk.
pub const MAX_FEEDBACK_DEPTH: usize = 3;
