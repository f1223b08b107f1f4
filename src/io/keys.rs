//! Computer-keyboard layout and key edge detection.
//!
//! The bottom letter row plays one chromatic octave from B3 to A#4, with the
//! sharps on the row above, like a piano:
//!
//! ```text
//!    s   d       g   h   j
//!  z   x   c   v   b   n   m
//! ```
//!
//! `p` and `o` shift the octave up and down, `q` quits.

use crate::synth::message::{Key, KeyEvent};

/// Base frequencies in Hz of the 12 playable notes, lowest first.
pub const NOTE_FREQUENCIES: [f32; 12] = [
    246.0, 261.0, 277.0, 293.0, 311.0, 329.0, 349.0, 369.0, 392.0, 415.0, 440.0, 466.0,
];

pub const NOTE_NAMES: [&str; 12] = [
    "B3", "C4", "C#4", "D4", "D#4", "E4", "F4", "F#4", "G4", "G#4", "A4", "A#4",
];

/// Keyboard characters for each note, in the order of [`NOTE_FREQUENCIES`].
pub const NOTE_CHARS: [char; 12] = ['z', 's', 'x', 'd', 'c', 'v', 'g', 'b', 'h', 'n', 'j', 'm'];

pub const OCTAVE_UP_CHAR: char = 'p';
pub const OCTAVE_DOWN_CHAR: char = 'o';
pub const QUIT_CHAR: char = 'q';

/// Base frequency of note `index`, if it exists.
pub fn note_frequency(index: u8) -> Option<f32> {
    NOTE_FREQUENCIES.get(index as usize).copied()
}

pub fn note_name(index: u8) -> Option<&'static str> {
    NOTE_NAMES.get(index as usize).copied()
}

/// Map a typed character to a key. Upper case is accepted.
pub fn key_for_char(c: char) -> Option<Key> {
    let c = c.to_ascii_lowercase();
    match c {
        QUIT_CHAR => Some(Key::Quit),
        OCTAVE_UP_CHAR => Some(Key::OctaveUp),
        OCTAVE_DOWN_CHAR => Some(Key::OctaveDown),
        _ => NOTE_CHARS
            .iter()
            .position(|&n| n == c)
            .map(|i| Key::Note(i as u8)),
    }
}

pub fn char_for_key(key: Key) -> Option<char> {
    match key {
        Key::Note(i) => NOTE_CHARS.get(i as usize).copied(),
        Key::OctaveUp => Some(OCTAVE_UP_CHAR),
        Key::OctaveDown => Some(OCTAVE_DOWN_CHAR),
        Key::Quit => Some(QUIT_CHAR),
    }
}

/// Every key in scan order: quit, octave up, octave down, then the notes.
pub fn scan_order() -> impl Iterator<Item = Key> {
    [Key::Quit, Key::OctaveUp, Key::OctaveDown]
        .into_iter()
        .chain((0..NOTE_FREQUENCIES.len() as u8).map(Key::Note))
}

/// Turns polled up/down key state into press and release edges.
///
/// A key held across several polls produces one press; keys are visited in
/// [`scan_order`], so simultaneous octave keys resolve up before down.
/// Pressing another key leaves the other slots alone: a key that stays down
/// underneath a newer one does not sound again when the newer one goes up.
#[derive(Debug, Default)]
pub struct KeyScanner {
    held: [bool; 15],
}

impl KeyScanner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scan(&mut self, is_down: impl Fn(Key) -> bool, mut emit: impl FnMut(KeyEvent)) {
        for (slot, key) in scan_order().enumerate() {
            let down = is_down(key);
            if down != self.held[slot] {
                self.held[slot] = down;
                emit(KeyEvent { key, pressed: down });
            }
        }
    }

    pub fn is_held(&self, key: Key) -> bool {
        scan_order()
            .position(|k| k == key)
            .map(|slot| self.held[slot])
            .unwrap_or(false)
    }
}
