use std::time::Duration;

use crate::{CHUNK_SIZE, SAMPLE_RATE};

pub(crate) const JOIN_POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Engine settings, fixed for the lifetime of a [`SynthContext`](super::SynthContext).
///
/// ```
/// use keysynth::EngineConfig;
///
/// let config = EngineConfig::default().chunk_size(1024).visual_capacity(16);
/// assert_eq!(config.chunk_size, 1024);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub sample_rate: u32,
    /// Frames per rendered chunk.
    pub chunk_size: usize,
    /// Slots in the visualization update ring.
    pub visual_capacity: usize,
    /// Output chunks the oscilloscope ring can hold.
    pub scope_chunks: usize,
    /// Device ring size, in chunks. Bounds how far rendering runs ahead of playback.
    pub output_ring_chunks: usize,
    /// Substring of the output device name, or `None` for the default device.
    pub device_name: Option<String>,
    pub join_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: SAMPLE_RATE,
            chunk_size: CHUNK_SIZE,
            visual_capacity: 32,
            scope_chunks: 4,
            output_ring_chunks: 2,
            device_name: None,
            join_timeout: Duration::from_secs(2),
        }
    }
}

impl EngineConfig {
    pub fn sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate.max(1);
        self
    }

    pub fn chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn visual_capacity(mut self, capacity: usize) -> Self {
        self.visual_capacity = capacity.max(1);
        self
    }

    pub fn scope_chunks(mut self, chunks: usize) -> Self {
        self.scope_chunks = chunks.max(1);
        self
    }

    pub fn output_ring_chunks(mut self, chunks: usize) -> Self {
        self.output_ring_chunks = chunks.max(1);
        self
    }

    pub fn device_name(mut self, name: impl Into<String>) -> Self {
        self.device_name = Some(name.into());
        self
    }

    pub fn join_timeout(mut self, timeout: Duration) -> Self {
        self.join_timeout = timeout;
        self
    }
}
