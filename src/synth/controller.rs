//! Key handling and per-chunk rendering for the monophonic voice.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::{
    dsp::{
        delay::FeedbackDelay,
        envelope::ReleaseCurve,
        filter::{FilterOutcome, StreamingFilter},
        lfo::Lfo,
        oscillator::OscillatorBank,
    },
    io::keys::note_frequency,
    synth::{
        message::{Key, KeyEvent},
        store::ParamSnapshot,
        voice::{Voice, VoiceState},
    },
};

/// Owns the voice and every piece of per-note DSP state.
///
/// Lives on the audio thread. Parameter changes arrive as whole snapshots
/// through [`VoiceController::adopt`]; filter and delay state are only ever
/// touched here.
pub struct VoiceController {
    voice: Voice,
    oscillator: OscillatorBank,
    lfo: Lfo,
    filter: StreamingFilter,
    delay: FeedbackDelay,
    release: ReleaseCurve,
    gains: Vec<f32>,
    snapshot: Arc<ParamSnapshot>,
    chunk_size: usize,
    filter_active: bool,
    quit: bool,
}

impl VoiceController {
    pub fn new(snapshot: Arc<ParamSnapshot>, sample_rate: u32, chunk_size: usize) -> Self {
        Self::with_oscillator(snapshot, OscillatorBank::new(sample_rate), chunk_size)
    }

    /// Controller with a caller-supplied oscillator bank (e.g. a seeded one).
    pub fn with_oscillator(
        snapshot: Arc<ParamSnapshot>,
        oscillator: OscillatorBank,
        chunk_size: usize,
    ) -> Self {
        let sample_rate = oscillator.sample_rate();
        let params = snapshot.params;
        let mut filter = StreamingFilter::new(chunk_size);
        filter.prepare(&snapshot.filter);

        Self {
            voice: Voice::new(),
            oscillator,
            lfo: Lfo::new(sample_rate),
            filter,
            delay: FeedbackDelay::new(params.delay.delay_samples, params.delay.max_feedback_depth),
            release: ReleaseCurve::with_capacity(2 * sample_rate as usize),
            gains: vec![0.0; chunk_size],
            snapshot,
            chunk_size,
            filter_active: params.filter.enabled,
            quit: false,
        }
    }

    /// Switch to `snapshot` if it is newer than the one in use.
    pub fn adopt(&mut self, snapshot: Arc<ParamSnapshot>) -> bool {
        if snapshot.version == self.snapshot.version {
            return false;
        }
        self.filter.prepare(&snapshot.filter);
        self.delay.set_delay(snapshot.params.delay.delay_samples);
        self.delay.set_depth(snapshot.params.delay.max_feedback_depth);
        debug!(
            from = self.snapshot.version,
            to = snapshot.version,
            "adopted parameter snapshot"
        );
        self.snapshot = snapshot;
        true
    }

    pub fn snapshot(&self) -> &Arc<ParamSnapshot> {
        &self.snapshot
    }

    pub fn voice(&self) -> &Voice {
        &self.voice
    }

    /// True once the quit key was pressed.
    pub fn quit_requested(&self) -> bool {
        self.quit
    }

    pub fn handle(&mut self, event: KeyEvent) {
        match (event.key, event.pressed) {
            (Key::Note(index), true) => {
                let Some(base) = note_frequency(index) else {
                    warn!(index, "ignoring unknown note");
                    return;
                };
                self.voice.trigger(index as usize, base);
                self.filter.reset();
                self.delay.reset();
            }
            (Key::Note(index), false) => {
                let position = self.voice.played_chunks() as usize * self.chunk_size;
                if self.voice.release(index as usize) {
                    let envelope = &self.snapshot.envelope;
                    self.release
                        .trigger(envelope.held_level(position), envelope.settings().release);
                }
            }
            (Key::OctaveUp, true) => self.voice.octave_up(),
            (Key::OctaveDown, true) => self.voice.octave_down(),
            (Key::Quit, true) => self.quit = true,
            (_, false) => {}
        }
    }

    /// Render the next chunk into `out` (normally `chunk_size` frames).
    ///
    /// Oscillator, LFO, envelope and filter run only while a note sounds;
    /// the delay runs on every chunk so echoes ring out after the voice stops.
    pub fn render(&mut self, out: &mut [f32]) {
        let params = self.snapshot.params;
        let state = self.voice.state();

        if state == VoiceState::Idle {
            out.fill(0.0);
        } else {
            let start = self.voice.played_chunks() * self.chunk_size as u64;
            self.oscillator
                .render(params.waveform, self.voice.frequency(), start, out);
            self.lfo.modulate(&params.lfo, start, out);

            if self.gains.len() < out.len() {
                self.gains.resize(out.len(), 0.0);
            }
            let gains = &mut self.gains[..out.len()];
            if state == VoiceState::Sounding {
                self.snapshot.envelope.render_held(start as usize, gains);
            } else {
                let release_start = self.voice.release_chunks() as usize * self.chunk_size;
                self.release.render(release_start, gains);
            }
            for (sample, gain) in out.iter_mut().zip(gains.iter()) {
                *sample *= gain;
            }

            if params.filter.enabled {
                if !self.filter_active {
                    self.filter.reset();
                }
                if self.filter.apply(&self.snapshot.filter, out) == FilterOutcome::Bypassed {
                    warn!("chunk left unfiltered");
                }
            }
        }
        self.filter_active = params.filter.enabled;

        self.delay.process(out, params.delay.enabled);

        let exhausted = state == VoiceState::Releasing
            && self
                .release
                .is_exhausted((self.voice.release_chunks() as usize + 1) * self.chunk_size);
        self.voice.advance(exhausted);
    }
}
