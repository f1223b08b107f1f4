//! Error types for the synthesis engine.

use thiserror::Error;

/// Errors reported by parameter updates, filtering and the audio engine.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SynthError {
    /// Attack, decay and release do not fit in the one-second envelope buffer.
    #[error(
        "envelope too long: attack {attack} + decay {decay} + release {release} samples \
         must be below {sample_rate}"
    )]
    EnvelopeTooLong {
        /// Attack length in samples.
        attack: usize,
        /// Decay length in samples.
        decay: usize,
        /// Release length in samples.
        release: usize,
        /// Envelope buffer length (one second).
        sample_rate: usize,
    },

    /// The persisted IIR state does not match the active coefficients.
    #[error("filter state has {actual} values, coefficients need {expected}")]
    FilterStateSizeMismatch {
        /// Length required by the coefficient pair.
        expected: usize,
        /// Length of the state vector that was supplied.
        actual: usize,
    },

    /// A parameter value was outside its accepted range.
    #[error("invalid parameter '{name}': {reason}")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Why the value was rejected.
        reason: String,
    },

    /// The output device could not be opened.
    #[error("failed to open audio output: {0}")]
    DeviceOpen(String),

    /// The output stream failed while running.
    #[error("audio stream error: {0}")]
    Stream(String),

    /// The engine thread could not be joined.
    #[error("audio engine did not shut down: {0}")]
    EngineJoin(String),
}

impl SynthError {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        SynthError::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}

/// Convenience result type for synthesis operations.
pub type Result<T> = std::result::Result<T, SynthError>;
