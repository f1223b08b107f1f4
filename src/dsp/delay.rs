use crate::{MAX_DELAY_SAMPLES, MAX_FEEDBACK_DEPTH};

/*
Feedback Echo
=============

Each echo is an attenuated repeat of the dry voice signal (oscillator,
LFO, envelope and filter already applied), spaced `delay` samples apart:

    y[n] = x[n] + Σ  0.5^k · x[n - k·delay]      k = 1 ..= depth

    x ─┬──────────────────────────────────(+)── y
       │                                   ↑
       └─▶ [ring buffer] ─▶ tap D  × 0.5 ──┤
                          ─▶ tap 2D × 0.25 ─┤
                          ─▶ tap 3D × 0.125 ┘

The ring stores the dry signal only, so the echo count is bounded by
`depth` instead of ringing forever. It is sized for the longest delay at
the deepest repeat, and reads of history that was never written return
silence.
*/

/// Circular buffer of past samples.
pub struct DelayLine {
    buffer: Vec<f32>,
    write_pos: usize,
}

impl DelayLine {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: vec![0.0; capacity.max(1)],
            write_pos: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    #[inline]
    pub fn write(&mut self, sample: f32) {
        self.buffer[self.write_pos] = sample;
        self.write_pos = (self.write_pos + 1) % self.buffer.len();
    }

    /// Sample written `delay` writes ago; `read(1)` is the most recent one.
    #[inline]
    pub fn read(&self, delay: usize) -> f32 {
        let len = self.buffer.len();
        let delay = delay.clamp(1, len);
        self.buffer[(self.write_pos + len - delay) % len]
    }

    pub fn reset(&mut self) {
        self.buffer.fill(0.0);
        self.write_pos = 0;
    }
}

impl Default for DelayLine {
    fn default() -> Self {
        Self::with_capacity(MAX_DELAY_SAMPLES * MAX_FEEDBACK_DEPTH + 1)
    }
}

/// Bounded-depth echo over a [`DelayLine`].
pub struct FeedbackDelay {
    line: DelayLine,
    delay_samples: usize,
    depth: usize,
    decay: f32,
}

impl FeedbackDelay {
    pub const DECAY: f32 = 0.5;

    pub fn new(delay_samples: usize, depth: usize) -> Self {
        let mut delay = Self {
            line: DelayLine::default(),
            delay_samples: 1,
            depth: 0,
            decay: Self::DECAY,
        };
        delay.set_delay(delay_samples);
        delay.set_depth(depth);
        delay
    }

    pub fn delay_samples(&self) -> usize {
        self.delay_samples
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Echo spacing, clamped to 1..=MAX_DELAY_SAMPLES.
    pub fn set_delay(&mut self, delay_samples: usize) {
        self.delay_samples = delay_samples.clamp(1, MAX_DELAY_SAMPLES);
    }

    pub fn set_depth(&mut self, depth: usize) {
        self.depth = depth.min(MAX_FEEDBACK_DEPTH);
    }

    /// Drop all echoes, e.g. when a new note starts.
    pub fn reset(&mut self) {
        self.line.reset();
    }

    /// Record `signal` as dry history and, when `wet`, mix the echoes into it.
    pub fn process(&mut self, signal: &mut [f32], wet: bool) {
        for sample in signal.iter_mut() {
            let dry = *sample;
            if wet {
                let mut gain = 1.0;
                let mut echo = 0.0;
                for k in 1..=self.depth {
                    gain *= self.decay;
                    echo += gain * self.line.read(k * self.delay_samples);
                }
                *sample = dry + echo;
            }
            self.line.write(dry);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_line_reads_back_history() {
        let mut line = DelayLine::with_capacity(8);
        for i in 1..=5 {
            line.write(i as f32);
        }
        assert_eq!(line.read(1), 5.0);
        assert_eq!(line.read(3), 3.0);
        assert_eq!(line.read(6), 0.0, "unwritten history is silent");
    }

    #[test]
    fn test_delay_line_wraps() {
        let mut line = DelayLine::with_capacity(4);
        for i in 1..=10 {
            line.write(i as f32);
        }
        assert_eq!(line.read(1), 10.0);
        assert_eq!(line.read(4), 7.0);
    }

    #[test]
    fn test_echoes_decay_by_half_per_repeat() {
        let chunk = 64;
        let mut delay = FeedbackDelay::new(2 * chunk, 3);
        let mut levels = Vec::new();
        for _ in 0..8 {
            let mut block = vec![1.0f32; chunk];
            delay.process(&mut block, true);
            assert!(block.iter().all(|&s| s == block[0]), "constant input gives flat chunks");
            levels.push(block[0]);
        }
        assert_eq!(levels, vec![1.0, 1.0, 1.5, 1.5, 1.75, 1.75, 1.875, 1.875]);
    }

    #[test]
    fn test_impulse_repeats_at_delay_spacing() {
        let mut delay = FeedbackDelay::new(100, 3);
        let mut signal = vec![0.0f32; 500];
        signal[0] = 1.0;
        delay.process(&mut signal, true);
        assert_eq!(signal[100], 0.5);
        assert_eq!(signal[200], 0.25);
        assert_eq!(signal[300], 0.125);
        assert_eq!(signal[400], 0.0, "depth bounds the number of echoes");
    }

    #[test]
    fn test_dry_path_still_records_history() {
        let mut delay = FeedbackDelay::new(10, 1);
        let mut first = vec![1.0f32; 10];
        delay.process(&mut first, false);
        assert!(first.iter().all(|&s| s == 1.0));

        let mut second = vec![0.0f32; 10];
        delay.process(&mut second, true);
        assert!(second.iter().all(|&s| s == 0.5));
    }

    #[test]
    fn test_reset_clears_echoes() {
        let mut delay = FeedbackDelay::new(10, 3);
        let mut block = vec![1.0f32; 10];
        delay.process(&mut block, true);
        delay.reset();
        let mut silent = vec![0.0f32; 40];
        delay.process(&mut silent, true);
        assert!(silent.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_settings_are_clamped() {
        let mut delay = FeedbackDelay::new(0, 10);
        assert_eq!(delay.delay_samples(), 1);
        assert_eq!(delay.depth(), MAX_FEEDBACK_DEPTH);
        delay.set_delay(MAX_DELAY_SAMPLES * 4);
        assert_eq!(delay.delay_samples(), MAX_DELAY_SAMPLES);
    }
}
