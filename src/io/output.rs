//! Where rendered chunks go.
//!
//! The engine writes one chunk at a time through [`AudioSink::write`], which
//! blocks until the chunk is queued. For the device output that wait is the
//! loop's only pacing: the cpal callback drains an `rtrb` ring at the
//! device's rate, and the engine can run at most `output_ring_chunks`
//! chunks ahead of it.

use std::{
    sync::Arc,
    thread,
    time::{Duration, Instant},
};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use parking_lot::Mutex;
use rtrb::{Producer, RingBuffer};
use tracing::{info, warn};

use crate::{
    engine::EngineConfig,
    error::{Result, SynthError},
};

/// Give up on a write when the device has not taken a sample for this long.
pub const STALL_TIMEOUT: Duration = Duration::from_secs(1);
const POLL_INTERVAL: Duration = Duration::from_millis(2);

/// Destination for rendered mono chunks.
///
/// Sinks are created and used on the engine thread only, so they need not be `Send`.
pub trait AudioSink {
    /// Queue `chunk`, blocking until there is room for all of it.
    fn write(&mut self, chunk: &[f32]) -> Result<()>;

    /// Flush and release the output. Called once when the engine stops.
    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// cpal output stream fed through a sample ring.
pub struct DeviceOutput {
    producer: Producer<f32>,
    stream: cpal::Stream,
    device_name: String,
}

impl DeviceOutput {
    /// Open the configured (or default) output device at the engine's sample rate.
    pub fn open(config: &EngineConfig) -> Result<Self> {
        let host = cpal::default_host();
        let device = match config.device_name.as_deref() {
            Some(wanted) => host
                .output_devices()
                .map_err(|e| SynthError::DeviceOpen(e.to_string()))?
                .find(|d| d.name().map(|n| n.contains(wanted)).unwrap_or(false))
                .ok_or_else(|| {
                    SynthError::DeviceOpen(format!("no output device matching '{wanted}'"))
                })?,
            None => host
                .default_output_device()
                .ok_or_else(|| {
                    SynthError::DeviceOpen("no default output device available".into())
                })?,
        };
        let device_name = device.name().unwrap_or_else(|_| "unknown".into());

        let supported = device
            .default_output_config()
            .map_err(|e| {
                SynthError::DeviceOpen(format!("failed to fetch default output config: {e}"))
            })?;
        let channels = supported.channels() as usize;
        let stream_config = cpal::StreamConfig {
            channels: supported.channels(),
            sample_rate: cpal::SampleRate(config.sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let capacity = config.chunk_size * config.output_ring_chunks;
        let (producer, mut consumer) = RingBuffer::<f32>::new(capacity);

        let stream = device
            .build_output_stream(
                &stream_config,
                move |data: &mut [f32], _| {
                    // Mono to every channel; silence when the engine falls behind
                    for frame in data.chunks_mut(channels) {
                        let sample = consumer.pop().unwrap_or(0.0);
                        frame.fill(sample);
                    }
                },
                |err| warn!(error = %err, "audio stream error"),
                None,
            )
            .map_err(|e| SynthError::DeviceOpen(e.to_string()))?;
        stream
            .play()
            .map_err(|e| SynthError::DeviceOpen(e.to_string()))?;

        info!(
            device = %device_name,
            channels,
            sample_rate = config.sample_rate,
            "audio output open"
        );
        Ok(Self {
            producer,
            stream,
            device_name,
        })
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }
}

impl AudioSink for DeviceOutput {
    fn write(&mut self, chunk: &[f32]) -> Result<()> {
        let mut rest = chunk;
        let mut deadline = Instant::now() + STALL_TIMEOUT;

        while !rest.is_empty() {
            let n = self.producer.slots().min(rest.len());
            if n == 0 {
                if Instant::now() >= deadline {
                    return Err(SynthError::Stream(format!(
                        "output device '{}' stopped consuming samples",
                        self.device_name
                    )));
                }
                thread::sleep(POLL_INTERVAL);
                continue;
            }
            if let Ok(slots) = self.producer.write_chunk_uninit(n) {
                slots.fill_from_iter(rest[..n].iter().copied());
            }
            rest = &rest[n..];
            deadline = Instant::now() + STALL_TIMEOUT;
        }
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.stream
            .pause()
            .map_err(|e| SynthError::Stream(e.to_string()))?;
        info!(device = %self.device_name, "audio output closed");
        Ok(())
    }
}

/// Collects every written sample in memory.
///
/// Clones share the same buffer, so a test can keep one and hand the other
/// to the engine.
#[derive(Debug, Clone, Default)]
pub struct BufferSink {
    samples: Arc<Mutex<Vec<f32>>>,
    pace: Option<Duration>,
    closed: Arc<Mutex<bool>>,
}

impl BufferSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep for `per_chunk` on every write, standing in for device backpressure.
    pub fn paced(per_chunk: Duration) -> Self {
        Self {
            pace: Some(per_chunk),
            ..Self::default()
        }
    }

    pub fn samples(&self) -> Vec<f32> {
        self.samples.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.samples.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.lock().is_empty()
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.lock()
    }
}

impl AudioSink for BufferSink {
    fn write(&mut self, chunk: &[f32]) -> Result<()> {
        self.samples.lock().extend_from_slice(chunk);
        if let Some(pace) = self.pace {
            thread::sleep(pace);
        }
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        *self.closed.lock() = true;
        Ok(())
    }
}
