//! Plot data handed from the synthesizer to the control surface.
//!
//! Two bounded rings cross from the audio thread to the control thread:
//!
//! - `updates` carries [`Visualization`] values. These are shared plots that
//!   the parameter store already built, so pushing one is a pointer copy.
//! - `scope` carries the raw output samples, one whole chunk at a time.
//!
//! Both drop what does not fit. Nothing here is needed to produce sound.

use std::sync::Arc;

use rtrb::{Consumer, Producer, RingBuffer};

/// Two equal-length coordinate sequences.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Plot {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

impl Plot {
    pub fn from_pairs(x: Vec<f64>, y: Vec<f64>) -> Self {
        debug_assert_eq!(x.len(), y.len());
        Self { x, y }
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// Points as `(x, y)` tuples, the shape ratatui charts take.
    pub fn points(&self) -> Vec<(f64, f64)> {
        self.x.iter().copied().zip(self.y.iter().copied()).collect()
    }

    /// Smallest and largest y value, or `None` for an empty plot.
    pub fn y_bounds(&self) -> Option<(f64, f64)> {
        let mut values = self.y.iter().copied().filter(|v| v.is_finite());
        let first = values.next()?;
        Some(values.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v))))
    }
}

/// One update for the control surface.
#[derive(Debug, Clone)]
pub enum Visualization {
    /// The one-second envelope curve.
    Envelope(Arc<Plot>),
    /// Current waveform at a slow rate shaped by the envelope.
    EnvelopePreview(Arc<Plot>),
    /// Analog filter magnitude response, x in Hz and y in dB.
    FilterResponse(Arc<Plot>),
}

/// Create the two visualization rings.
///
/// `scope_capacity` is in samples and should hold a few chunks.
pub fn channel(update_capacity: usize, scope_capacity: usize) -> (VisualSender, VisualFeed) {
    let (updates_tx, updates) = RingBuffer::new(update_capacity);
    let (scope_tx, scope) = RingBuffer::new(scope_capacity);
    (
        VisualSender {
            updates: updates_tx,
            scope: scope_tx,
        },
        VisualFeed { updates, scope },
    )
}

/// Audio-thread end of the visualization rings.
pub struct VisualSender {
    updates: Producer<Visualization>,
    scope: Producer<f32>,
}

impl VisualSender {
    /// Queue `visual`, or return false when the ring is full.
    pub fn push(&mut self, visual: Visualization) -> bool {
        self.updates.push(visual).is_ok()
    }

    /// Copy a whole output chunk into the scope ring, or nothing at all.
    pub fn push_scope(&mut self, chunk: &[f32]) -> bool {
        match self.scope.write_chunk_uninit(chunk.len()) {
            Ok(slots) => {
                slots.fill_from_iter(chunk.iter().copied());
                true
            }
            Err(_) => false,
        }
    }
}

/// Control-thread end of the visualization rings.
pub struct VisualFeed {
    pub updates: Consumer<Visualization>,
    pub scope: Consumer<f32>,
}

impl VisualFeed {
    /// Pop every pending update.
    pub fn drain_updates(&mut self, mut apply: impl FnMut(Visualization)) {
        while let Ok(visual) = self.updates.pop() {
            apply(visual);
        }
    }

    /// Take every scope sample queued so far, oldest first.
    pub fn drain_scope(&mut self, take: impl FnOnce(&mut dyn Iterator<Item = f32>)) {
        let available = self.scope.slots();
        if let Ok(chunk) = self.scope.read_chunk(available) {
            take(&mut chunk.into_iter());
        }
    }
}
