//! The audio engine thread.
//!
//! One thread runs a poll → render → write loop:
//!
//! 1. drain key edges from the [`InputEventSource`],
//! 2. load the latest parameter snapshot and adopt it if it changed,
//! 3. render one chunk through the voice chain,
//! 4. copy it into the oscilloscope ring (dropped when full),
//! 5. write the chunk to the [`AudioSink`], blocking until it is queued.
//!
//! The loop checks the shared keep-running flag once per iteration, so a
//! stop request always lets the chunk in flight finish and be written.

mod config;

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        mpsc, Arc,
    },
    thread::{self, JoinHandle},
    time::Instant,
};

use tracing::{debug, error, info, warn};

pub use config::EngineConfig;

use crate::{
    error::{Result, SynthError},
    io::output::AudioSink,
    synth::{controller::VoiceController, message::InputEventSource, store::ParameterStore},
    visual::{self, VisualFeed, VisualSender, Visualization},
};

/// Everything the control thread and the audio thread share.
pub struct SynthContext {
    params: ParameterStore,
    running: AtomicBool,
    config: EngineConfig,
}

impl SynthContext {
    /// Context with default parameters.
    pub fn new(config: EngineConfig) -> Result<Arc<Self>> {
        let params = ParameterStore::new(config.sample_rate)?;
        Ok(Self::with_store(params, config))
    }

    pub fn with_store(params: ParameterStore, config: EngineConfig) -> Arc<Self> {
        Arc::new(Self {
            params,
            running: AtomicBool::new(false),
            config,
        })
    }

    pub fn params(&self) -> &ParameterStore {
        &self.params
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Ask the engine loop to finish its current chunk and exit.
    pub fn request_stop(&self) {
        self.running.store(false, Ordering::Release);
    }
}

/// Counters reported when the engine stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStats {
    pub chunks_rendered: u64,
    pub snapshots_adopted: u64,
    pub visuals_dropped: u64,
}

/// The render half of the engine, without a thread.
///
/// [`AudioEngine`] drives one of these on its own thread; tests and offline
/// renders can call [`SynthEngine::step`] directly.
pub struct SynthEngine<I: InputEventSource> {
    ctx: Arc<SynthContext>,
    controller: VoiceController,
    input: I,
    visuals: VisualSender,
    chunk: Vec<f32>,
    stats: EngineStats,
}

impl<I: InputEventSource> SynthEngine<I> {
    pub fn new(ctx: Arc<SynthContext>, input: I, visuals: VisualSender) -> Self {
        let snapshot = ctx.params.snapshot();
        let controller =
            VoiceController::new(snapshot, ctx.config.sample_rate, ctx.config.chunk_size);
        Self::with_controller(ctx, controller, input, visuals)
    }

    pub fn with_controller(
        ctx: Arc<SynthContext>,
        controller: VoiceController,
        input: I,
        visuals: VisualSender,
    ) -> Self {
        let chunk = vec![0.0; ctx.config.chunk_size];
        let mut engine = Self {
            ctx,
            controller,
            input,
            visuals,
            chunk,
            stats: EngineStats::default(),
        };
        engine.publish_plots(true, true);
        engine
    }

    pub fn controller(&self) -> &VoiceController {
        &self.controller
    }

    pub fn stats(&self) -> EngineStats {
        self.stats
    }

    /// Render the next chunk and return it.
    pub fn step(&mut self) -> &[f32] {
        let controller = &mut self.controller;
        self.input.drain(&mut |event| controller.handle(event));
        if self.controller.quit_requested() && self.ctx.is_running() {
            info!("quit key pressed");
            self.ctx.request_stop();
        }

        let previous = Arc::clone(self.controller.snapshot());
        if self.controller.adopt(self.ctx.params.snapshot()) {
            self.stats.snapshots_adopted += 1;
            let current = Arc::clone(self.controller.snapshot());
            self.publish_plots(
                !Arc::ptr_eq(&previous.envelope_plot, &current.envelope_plot)
                    || !Arc::ptr_eq(&previous.preview_plot, &current.preview_plot),
                !Arc::ptr_eq(&previous.response_plot, &current.response_plot),
            );
        }

        self.controller.render(&mut self.chunk);
        self.stats.chunks_rendered += 1;

        if !self.visuals.push_scope(&self.chunk) {
            self.stats.visuals_dropped += 1;
        }
        &self.chunk
    }

    /// Loop until the context is stopped, writing every chunk to `sink`.
    pub fn run(&mut self, sink: &mut dyn AudioSink) -> Result<EngineStats> {
        info!(
            sample_rate = self.ctx.config.sample_rate,
            chunk_size = self.ctx.config.chunk_size,
            "audio engine started"
        );
        while self.ctx.is_running() {
            self.step();
            if let Err(err) = sink.write(&self.chunk) {
                error!(error = %err, "audio output failed, stopping engine");
                self.ctx.request_stop();
                if let Err(close_err) = sink.close() {
                    warn!(error = %close_err, "failed to close audio output");
                }
                return Err(err);
            }
        }
        sink.close()?;
        info!(chunks = self.stats.chunks_rendered, "audio engine stopped");
        Ok(self.stats)
    }

    fn publish_plots(&mut self, envelope: bool, response: bool) {
        let snapshot = Arc::clone(self.controller.snapshot());
        if envelope {
            self.push_visual(Visualization::Envelope(Arc::clone(&snapshot.envelope_plot)));
            self.push_visual(Visualization::EnvelopePreview(Arc::clone(&snapshot.preview_plot)));
        }
        if response {
            self.push_visual(Visualization::FilterResponse(Arc::clone(&snapshot.response_plot)));
        }
    }

    fn push_visual(&mut self, visual: Visualization) {
        if !self.visuals.push(visual) {
            self.stats.visuals_dropped += 1;
        }
    }
}

/// Handle to a running engine thread.
pub struct AudioEngine {
    ctx: Arc<SynthContext>,
    handle: Option<JoinHandle<Result<EngineStats>>>,
}

impl AudioEngine {
    /// Spawn the engine thread.
    ///
    /// `open_sink` runs on the new thread, so sinks that cannot cross threads
    /// (device streams) work. If it fails, the error is returned here and no
    /// engine is left running. The returned feed receives plot updates and
    /// the oscilloscope samples.
    pub fn start<I, S, F>(
        ctx: Arc<SynthContext>,
        input: I,
        open_sink: F,
    ) -> Result<(Self, VisualFeed)>
    where
        I: InputEventSource + 'static,
        S: AudioSink,
        F: FnOnce(&EngineConfig) -> Result<S> + Send + 'static,
    {
        if ctx.is_running() {
            return Err(SynthError::invalid("engine", "already running"));
        }
        ctx.running.store(true, Ordering::Release);

        let (sender, feed) = visual::channel(
            ctx.config.visual_capacity,
            ctx.config.scope_chunks * ctx.config.chunk_size,
        );
        let (ready_tx, ready_rx) = mpsc::channel::<Result<()>>();
        let thread_ctx = Arc::clone(&ctx);

        let spawned = thread::Builder::new()
            .name("keysynth-audio".into())
            .spawn(move || {
                let mut sink = match open_sink(&thread_ctx.config) {
                    Ok(sink) => {
                        let _ = ready_tx.send(Ok(()));
                        sink
                    }
                    Err(err) => {
                        thread_ctx.request_stop();
                        let _ = ready_tx.send(Err(err.clone()));
                        return Err(err);
                    }
                };
                let mut engine = SynthEngine::new(Arc::clone(&thread_ctx), input, sender);
                let result = engine.run(&mut sink);
                thread_ctx.request_stop();
                result
            });

        let handle = match spawned {
            Ok(handle) => handle,
            Err(err) => {
                ctx.request_stop();
                return Err(SynthError::DeviceOpen(format!(
                    "failed to spawn audio thread: {err}"
                )));
            }
        };

        match ready_rx.recv() {
            Ok(Ok(())) => Ok((
                Self {
                    ctx,
                    handle: Some(handle),
                },
                feed,
            )),
            Ok(Err(err)) => {
                let _ = handle.join();
                Err(err)
            }
            Err(_) => {
                ctx.request_stop();
                let _ = handle.join();
                Err(SynthError::DeviceOpen(
                    "audio thread exited before opening the output".into(),
                ))
            }
        }
    }

    pub fn context(&self) -> &Arc<SynthContext> {
        &self.ctx
    }

    /// True until the loop exits (stop request, quit key or output failure).
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Request a stop and wait for the thread.
    pub fn stop(self) -> Result<EngineStats> {
        self.ctx.request_stop();
        self.join()
    }

    /// Wait for the thread to exit by itself, at most `join_timeout`.
    pub fn join(mut self) -> Result<EngineStats> {
        let Some(handle) = self.handle.take() else {
            return Err(SynthError::EngineJoin("engine already joined".into()));
        };

        let timeout = self.ctx.config.join_timeout;
        let deadline = Instant::now() + timeout;
        while !handle.is_finished() {
            if Instant::now() >= deadline {
                warn!(?timeout, "audio thread did not exit in time");
                return Err(SynthError::EngineJoin(format!(
                    "audio thread still running after {timeout:?}"
                )));
            }
            thread::sleep(config::JOIN_POLL_INTERVAL);
        }

        let stats = handle
            .join()
            .map_err(|_| SynthError::EngineJoin("audio thread panicked".into()))??;
        debug!(?stats, "audio thread joined");
        Ok(stats)
    }
}

impl Drop for AudioEngine {
    fn drop(&mut self) {
        if self.handle.is_some() {
            self.ctx.request_stop();
        }
    }
}
