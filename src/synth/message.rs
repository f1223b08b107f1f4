use std::collections::VecDeque;

use rtrb::Consumer;

/// A key the synthesizer reacts to.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    /// Index into the 12-note table.
    Note(u8),
    OctaveUp,
    OctaveDown,
    Quit,
}

/// An edge on a key: `pressed` is true on the way down.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: Key,
    pub pressed: bool,
}

impl KeyEvent {
    pub fn press(key: Key) -> Self {
        Self { key, pressed: true }
    }

    pub fn release(key: Key) -> Self {
        Self { key, pressed: false }
    }
}

/// Debounced key edges, drained by the audio thread once per chunk.
pub trait InputEventSource: Send {
    fn drain(&mut self, handle: &mut dyn FnMut(KeyEvent));
}

impl InputEventSource for Consumer<KeyEvent> {
    fn drain(&mut self, handle: &mut dyn FnMut(KeyEvent)) {
        while let Ok(event) = self.pop() {
            handle(event);
        }
    }
}

/// Events delivered on chosen chunks, for tests and offline renders.
///
/// Each call to [`InputEventSource::drain`] counts as one chunk.
#[derive(Debug, Default)]
pub struct ScriptedInput {
    script: VecDeque<(u64, KeyEvent)>,
    chunk: u64,
}

impl ScriptedInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver `event` before rendering chunk `chunk`.
    pub fn at(mut self, chunk: u64, event: KeyEvent) -> Self {
        let pos = self.script.partition_point(|(at, _)| *at <= chunk);
        self.script.insert(pos, (chunk, event));
        self
    }

    pub fn is_finished(&self) -> bool {
        self.script.is_empty()
    }
}

impl InputEventSource for ScriptedInput {
    fn drain(&mut self, handle: &mut dyn FnMut(KeyEvent)) {
        while let Some(&(at, event)) = self.script.front() {
            if at > self.chunk {
                break;
            }
            self.script.pop_front();
            handle(event);
        }
        self.chunk += 1;
    }
}
