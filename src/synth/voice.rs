/// Release tails are cut after this many chunks even if the curve is longer.
pub const MAX_RELEASE_CHUNKS: u32 = 18;

/// Highest and lowest octave shift, as a power of two.
pub const OCTAVE_LIMIT: i32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceState {
    Idle,      // Silent, waiting for a key
    Sounding,  // Key held: attack, decay, sustain
    Releasing, // Key up: playing the release tail
}

/// The single monophonic voice.
///
/// Counters are in chunks; sample offsets are derived from the chunk size.
#[derive(Debug, Clone)]
pub struct Voice {
    state: VoiceState,
    note: usize,
    frequency: f32,
    octave_shift: i32,
    played_chunks: u64,
    release_chunks: u32,
}

impl Default for Voice {
    fn default() -> Self {
        Self::new()
    }
}

impl Voice {
    pub fn new() -> Self {
        Self {
            state: VoiceState::Idle,
            note: 0,
            frequency: 0.0,
            octave_shift: 0,
            played_chunks: 0,
            release_chunks: 0,
        }
    }

    /// Start `note` from scratch, dropping whatever was playing.
    pub fn trigger(&mut self, note: usize, base_frequency: f32) {
        self.state = VoiceState::Sounding;
        self.note = note;
        self.frequency = base_frequency;
        self.played_chunks = 0;
        self.release_chunks = 0;
    }

    /// Key up for `note`; ignored unless that note is sounding.
    pub fn release(&mut self, note: usize) -> bool {
        if self.state == VoiceState::Sounding && self.note == note {
            self.state = VoiceState::Releasing;
            self.release_chunks = 0;
            true
        } else {
            false
        }
    }

    /// Advance the counters after a chunk was rendered.
    pub fn advance(&mut self, release_exhausted: bool) {
        match self.state {
            VoiceState::Idle => {}
            VoiceState::Sounding => self.played_chunks += 1,
            VoiceState::Releasing => {
                self.played_chunks += 1;
                self.release_chunks += 1;
                if release_exhausted || self.release_chunks >= MAX_RELEASE_CHUNKS {
                    self.state = VoiceState::Idle;
                }
            }
        }
    }

    pub fn octave_up(&mut self) {
        self.octave_shift = (self.octave_shift + 1).min(OCTAVE_LIMIT);
    }

    pub fn octave_down(&mut self) {
        self.octave_shift = (self.octave_shift - 1).max(-OCTAVE_LIMIT);
    }

    pub fn octave_multiplier(&self) -> f32 {
        2f32.powi(self.octave_shift)
    }

    /// Oscillator frequency: base note times the octave multiplier.
    pub fn frequency(&self) -> f32 {
        self.frequency * self.octave_multiplier()
    }

    pub fn state(&self) -> VoiceState {
        self.state
    }

    pub fn note(&self) -> usize {
        self.note
    }

    pub fn played_chunks(&self) -> u64 {
        self.played_chunks
    }

    pub fn release_chunks(&self) -> u32 {
        self.release_chunks
    }

    pub fn is_idle(&self) -> bool {
        self.state == VoiceState::Idle
    }
}
