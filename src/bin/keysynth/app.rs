//! Terminal front end: keyboard in, parameter edits and plots out.

use std::{
    collections::HashMap,
    io::stdout,
    sync::Arc,
    time::{Duration, Instant},
};

use color_eyre::eyre::{Result as EyreResult, WrapErr};
use crossterm::{
    event::{
        self, Event, KeyCode, KeyEvent as TermKeyEvent, KeyEventKind, KeyModifiers,
        KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
    },
    execute,
    terminal::supports_keyboard_enhancement,
};
use ratatui::DefaultTerminal;
use rtrb::{Producer, RingBuffer};
use tracing::warn;

use keysynth::{
    io::{keys::key_for_char, output::DeviceOutput, KeyScanner},
    synth::{Key, KeyEvent},
    visual::VisualFeed,
    AudioEngine, EngineConfig, SynthContext,
};

use crate::ui::{self, Control, Plots, View};

const KEY_QUEUE_CAPACITY: usize = 64;
/// Redraw and key-scan interval.
const FRAME: Duration = Duration::from_millis(16);
/// Without key release events a key counts as held until its auto-repeat stops.
const HOLD_TIMEOUT: Duration = Duration::from_millis(600);

pub struct App {
    ctx: Arc<SynthContext>,
    engine: Option<AudioEngine>,
    keys_tx: Option<Producer<KeyEvent>>,
    visuals: Option<VisualFeed>,
    plots: Plots,
    scanner: KeyScanner,
    held: HashMap<Key, Instant>,
    /// The terminal reports key releases (kitty keyboard protocol).
    release_events: bool,
    selected: Control,
    status: Option<String>,
    should_quit: bool,
}

impl App {
    pub fn new() -> EyreResult<Self> {
        let ctx = SynthContext::new(EngineConfig::default())
            .wrap_err("failed to build default parameters")?;
        let plots = Plots::new(&ctx.params().snapshot(), ctx.config().chunk_size);

        let release_events = supports_keyboard_enhancement().unwrap_or(false);
        if release_events {
            execute!(
                stdout(),
                PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
            )
            .wrap_err("failed to enable key release events")?;
        }

        let mut app = Self {
            ctx,
            engine: None,
            keys_tx: None,
            visuals: None,
            plots,
            scanner: KeyScanner::new(),
            held: HashMap::new(),
            release_events,
            selected: Control::Attack,
            status: None,
            should_quit: false,
        };
        app.start_engine()?;
        Ok(app)
    }

    pub fn run(&mut self, terminal: &mut DefaultTerminal) -> EyreResult<()> {
        while !self.should_quit {
            self.poll_visuals();
            self.scan_keys();
            self.check_engine();

            terminal.draw(|frame| ui::render(frame, &self.view()))?;

            if event::poll(FRAME)? {
                if let Event::Key(key) = event::read()? {
                    self.handle_key(key);
                }
            }
        }
        Ok(())
    }

    /// Stop audio and restore the terminal's keyboard mode.
    pub fn shutdown(&mut self) {
        self.stop_engine();
        if self.release_events {
            let _ = execute!(stdout(), PopKeyboardEnhancementFlags);
        }
    }

    fn start_engine(&mut self) -> EyreResult<()> {
        let (tx, rx) = RingBuffer::<KeyEvent>::new(KEY_QUEUE_CAPACITY);
        let (engine, visuals) = AudioEngine::start(Arc::clone(&self.ctx), rx, DeviceOutput::open)
            .wrap_err("failed to start audio engine")?;
        self.engine = Some(engine);
        self.keys_tx = Some(tx);
        self.visuals = Some(visuals);
        self.scanner = KeyScanner::new();
        self.held.clear();
        self.status = None;
        Ok(())
    }

    fn stop_engine(&mut self) {
        if let Some(engine) = self.engine.take() {
            match engine.stop() {
                Ok(stats) => {
                    self.status = Some(format!("stopped after {} chunks", stats.chunks_rendered));
                }
                Err(err) => self.status = Some(err.to_string()),
            }
        }
        self.keys_tx = None;
        self.visuals = None;
    }

    fn toggle_playback(&mut self) {
        if self.engine.is_some() {
            self.stop_engine();
        } else if let Err(err) = self.start_engine() {
            self.status = Some(format!("{err:#}"));
        }
    }

    /// Notice an engine that exited on its own: quit key or output failure.
    fn check_engine(&mut self) {
        if !self.engine.as_ref().is_some_and(|engine| !engine.is_running()) {
            return;
        }
        if let Some(engine) = self.engine.take() {
            match engine.join() {
                Ok(_) => self.should_quit = true,
                Err(err) => self.status = Some(err.to_string()),
            }
        }
        self.keys_tx = None;
        self.visuals = None;
    }

    fn poll_visuals(&mut self) {
        if let Some(visuals) = self.visuals.as_mut() {
            let plots = &mut self.plots;
            visuals.drain_updates(|visual| plots.apply(visual));
            visuals.drain_scope(|samples| plots.push_scope(samples));
        }
    }

    /// Turn the held-key table into press/release edges for the engine.
    fn scan_keys(&mut self) {
        if !self.release_events {
            let now = Instant::now();
            self.held
                .retain(|_, seen| now.duration_since(*seen) < HOLD_TIMEOUT);
        }

        let held = &self.held;
        let Some(tx) = self.keys_tx.as_mut() else {
            return;
        };
        self.scanner.scan(
            |key| held.contains_key(&key),
            |event| {
                if tx.push(event).is_err() {
                    warn!(?event, "key queue full, dropping event");
                }
            },
        );
    }

    fn handle_key(&mut self, key: TermKeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return;
        }

        if let KeyCode::Char(c) = key.code {
            if let Some(synth_key) = key_for_char(c) {
                match key.kind {
                    KeyEventKind::Press | KeyEventKind::Repeat => {
                        self.held.insert(synth_key, Instant::now());
                    }
                    KeyEventKind::Release => {
                        self.held.remove(&synth_key);
                    }
                }
                if synth_key == Key::Quit && self.engine.is_none() {
                    self.should_quit = true;
                }
                return;
            }
        }

        if key.kind == KeyEventKind::Release {
            return;
        }

        let coarse = key.modifiers.contains(KeyModifiers::SHIFT);
        let ctx = Arc::clone(&self.ctx);
        let store = ctx.params();
        let params = store.parameters();
        let result = match key.code {
            KeyCode::Esc => {
                self.should_quit = true;
                return;
            }
            KeyCode::Char(' ') => {
                self.toggle_playback();
                return;
            }
            KeyCode::Up => {
                self.selected = self.selected.prev();
                return;
            }
            KeyCode::Down => {
                self.selected = self.selected.next();
                return;
            }
            KeyCode::Left => self.selected.adjust(store, &params, if coarse { -10 } else { -1 }),
            KeyCode::Right => self.selected.adjust(store, &params, if coarse { 10 } else { 1 }),
            KeyCode::Tab => store.set_filter_type(params.filter.kind.next()),
            KeyCode::Char('f') => store.set_filter_enabled(!params.filter.enabled),
            KeyCode::Char('l') => store.set_lfo_enabled(!params.lfo.enabled),
            KeyCode::Char('e') => store.set_delay_enabled(!params.delay.enabled),
            KeyCode::Char('w') => store.set_waveform(params.waveform.next()),
            _ => return,
        };

        self.status = result.err().map(|err| err.to_string());
    }

    fn view(&self) -> View<'_> {
        let mut held: Vec<Key> = self.held.keys().copied().collect();
        held.sort_by_key(|key| match key {
            Key::Note(i) => *i as i32,
            _ => -1,
        });
        View {
            params: self.ctx.params().parameters(),
            sample_rate: self.ctx.config().sample_rate,
            selected: self.selected,
            running: self.engine.is_some(),
            release_events: self.release_events,
            held,
            status: self.status.as_deref(),
            plots: &self.plots,
        }
    }
}
