use std::f64::consts::PI;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use rustfft::num_complex::Complex64;
use tracing::{debug, warn};

use crate::error::{Result, SynthError};

/*
Butterworth IIR Filter
======================

| type      | analog transform | passes             | rejects            | state length |
| --------- | ---------------- | ------------------ | ------------------ | ------------ |
| low-pass  | lp → lp          | below cutoff       | above cutoff       | order        |
| high-pass | lp → hp          | above cutoff       | below cutoff       | order        |
| band-pass | lp → bp          | cutoff ± bw / 2    | outside the band   | 2 × order    |
| band-stop | lp → bs          | outside the band   | cutoff ± bw / 2    | 2 × order    |

Design runs in the zero/pole/gain domain the whole way:

  1. Prototype: `order` poles evenly spaced on the left half of the unit
     circle, p_m = -exp(iπm / 2N) for m = -N+1, -N+3, .., N-1.
  2. Prewarp the edge frequencies so the digital filter hits them exactly:
     ω = 2·fs·tan(π·f / fs).
  3. Move the prototype onto the target band (lp2lp, lp2hp, lp2bp, lp2bs).
  4. Bilinear transform every root: z = (2fs + s) / (2fs - s).
  5. Group the roots into sections: each conjugate pole pair (or pair of
     real poles) becomes one biquad with the nearest two zeros, an odd
     leftover real pole a first-order section.
  6. Order the sections far, near, far, near (by pole distance from the
     unit circle) and scale each to unit gain inside the passband.

A 16th-order band filter is a degree-32 polynomial. Expanded into a single
`b / a` pair it loses every significant digit at low cutoffs and the
recurrence diverges; per-section coefficients stay exact.

Each section runs as a transposed direct-form II recurrence and keeps one
delay value per pole:

    section      y  = b0·x + z0
    (order 2)    z0 = b1·x - a1·y + z1
                 z1 = b2·x - a2·y

    [x] → [section 1] → [section 2] → ... → [section k] → [y]

The delay values of all sections form one `IirState`. It is the only
thing that carries across chunk boundaries, so it must survive between
calls and always match the design:

    len(state) = number of poles = order (× 2 for band types)

A state of the wrong length is reported as `FilterStateSizeMismatch`.
`StreamingFilter` recovers from that by zeroing a correctly sized state
and trying once more. Output that is non-finite or above OUTPUT_LIMIT is
never passed on; the chunk goes through dry instead.
*/

/// Lowest accepted filter order.
pub const MIN_ORDER: usize = 1;
/// Highest accepted filter order.
pub const MAX_ORDER: usize = 16;
/// Longest state vector any design can need (band filters double the order).
pub const MAX_STATE_LEN: usize = 2 * MAX_ORDER;
/// Largest sample magnitude a filtered chunk may contain.
pub const OUTPUT_LIMIT: f32 = 8.0;

/// Makeup gain applied to low/high-pass response plots.
const RESPONSE_MAKEUP_GAIN: f64 = 2.0;
const BAND_EDGE_FLOOR_HZ: f64 = 1.0;
/// Roots with a smaller imaginary part are treated as real.
const REAL_ROOT_TOLERANCE: f64 = 1e-9;
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterType {
    #[default]
    LowPass,
    HighPass,
    BandPass,
    BandStop,
}

impl FilterType {
    pub const ALL: [FilterType; 4] = [
        FilterType::LowPass,
        FilterType::HighPass,
        FilterType::BandPass,
        FilterType::BandStop,
    ];

    pub fn name(self) -> &'static str {
        match self {
            FilterType::LowPass => "lowpass",
            FilterType::HighPass => "highpass",
            FilterType::BandPass => "bandpass",
            FilterType::BandStop => "bandstop",
        }
    }

    /// Band types use the bandwidth and double the state length.
    pub fn is_band(self) -> bool {
        matches!(self, FilterType::BandPass | FilterType::BandStop)
    }

    pub fn next(self) -> Self {
        let idx = Self::ALL.iter().position(|&t| t == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }
}

/// User-facing filter settings.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterSettings {
    pub kind: FilterType,
    pub order: usize,
    pub cutoff_hz: f32,
    /// Only used by band-pass and band-stop.
    pub bandwidth_hz: f32,
    pub enabled: bool,
}

impl Default for FilterSettings {
    fn default() -> Self {
        Self {
            kind: FilterType::LowPass,
            order: 4,
            cutoff_hz: 2_000.0,
            bandwidth_hz: 200.0,
            enabled: false,
        }
    }
}

impl FilterSettings {
    fn check(&self, sample_rate: u32) -> Result<()> {
        if !(MIN_ORDER..=MAX_ORDER).contains(&self.order) {
            return Err(SynthError::invalid(
                "filter order",
                format!("{} is outside {}..={}", self.order, MIN_ORDER, MAX_ORDER),
            ));
        }
        let nyquist = sample_rate as f32 / 2.0;
        if !self.cutoff_hz.is_finite() || self.cutoff_hz <= 0.0 || self.cutoff_hz >= nyquist {
            return Err(SynthError::invalid(
                "filter cutoff",
                format!("{} Hz must lie between 0 and {} Hz", self.cutoff_hz, nyquist),
            ));
        }
        if self.kind.is_band() && !(self.bandwidth_hz.is_finite() && self.bandwidth_hz > 0.0) {
            return Err(SynthError::invalid(
                "filter bandwidth",
                format!("{} Hz must be positive", self.bandwidth_hz),
            ));
        }
        Ok(())
    }

    /// Lower and upper edge of a band filter, clamped into (1 Hz, nyquist).
    pub fn band_edges(&self, sample_rate: u32) -> Result<(f64, f64)> {
        let nyquist = sample_rate as f64 / 2.0;
        let centre = self.cutoff_hz as f64;
        let half = self.bandwidth_hz as f64 / 2.0;
        let low = (centre - half).max(BAND_EDGE_FLOOR_HZ);
        let high = (centre + half).min(nyquist * 0.999);
        if low >= high {
            return Err(SynthError::invalid(
                "filter bandwidth",
                format!("band {low:.1}..{high:.1} Hz is empty"),
            ));
        }
        Ok((low, high))
    }
}

/// One stage of the cascade: `b / a` with `a[0] == 1`.
///
/// First-order sections leave the last tap of both polynomials at zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Section {
    b: [f64; 3],
    a: [f64; 3],
    order: usize,
}

impl Section {
    pub fn b(&self) -> &[f64; 3] {
        &self.b
    }

    pub fn a(&self) -> &[f64; 3] {
        &self.a
    }

    /// Number of poles, and of delay values the section keeps: 1 or 2.
    pub fn order(&self) -> usize {
        self.order
    }

    /// Transfer function at `z_inv` = z⁻¹.
    fn response(&self, z_inv: Complex64) -> Complex64 {
        let b = self.b[0] + z_inv * (self.b[1] + z_inv * self.b[2]);
        let a = self.a[0] + z_inv * (self.a[1] + z_inv * self.a[2]);
        b / a
    }

    #[inline]
    fn process(&self, x: f64, z: &mut [f64]) -> f64 {
        let y = self.b[0] * x + z[0];
        if self.order == 2 {
            z[0] = self.b[1] * x - self.a[1] * y + z[1];
            z[1] = self.b[2] * x - self.a[2] * y;
        } else {
            z[0] = self.b[1] * x - self.a[1] * y;
        }
        y
    }
}

/// Digital Butterworth design as a cascade of [`Section`]s.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterCoefficients {
    kind: FilterType,
    order: usize,
    sections: Vec<Section>,
}

impl FilterCoefficients {
    /// Butterworth design for `settings` at `sample_rate`.
    pub fn design(settings: &FilterSettings, sample_rate: u32) -> Result<Self> {
        settings.check(sample_rate)?;
        let fs = sample_rate as f64;
        let warp = |hz: f64| 2.0 * fs * (PI * hz / fs).tan();

        let edges = if settings.kind.is_band() {
            let (low, high) = settings.band_edges(sample_rate)?;
            Edges::Band(warp(low), warp(high))
        } else {
            Edges::Single(warp(settings.cutoff_hz as f64))
        };

        let analog = Zpk::butterworth(settings.order).transform(settings.kind, edges);
        let reference = Complex64::from_polar(1.0, unity_angle(settings.kind, edges, fs));
        let sections = analog.bilinear(fs).to_sections(reference)?;

        Ok(Self {
            kind: settings.kind,
            order: settings.order,
            sections,
        })
    }

    pub fn kind(&self) -> FilterType {
        self.kind
    }

    pub fn order(&self) -> usize {
        self.order
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    /// Length of the delay line these coefficients need.
    pub fn state_len(&self) -> usize {
        self.sections.iter().map(Section::order).sum()
    }
}

/// Persisted delay values of every section, back to back.
#[derive(Debug, Clone, PartialEq)]
pub struct IirState {
    values: Vec<f64>,
}

impl IirState {
    pub fn zeroed(len: usize) -> Self {
        let mut values = Vec::with_capacity(MAX_STATE_LEN.max(len));
        values.resize(len, 0.0);
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn reset(&mut self) {
        self.values.fill(0.0);
    }

    /// Resize to `len` and zero everything.
    pub fn resize_zeroed(&mut self, len: usize) {
        self.values.clear();
        self.values.resize(len, 0.0);
    }
}

/// Run `signal` through every section in place, continuing from `state`.
///
/// Fails without touching `signal` or `state` when the state length does
/// not match `coeffs`.
pub fn sosfilt(
    coeffs: &FilterCoefficients,
    state: &mut IirState,
    signal: &mut [f32],
) -> Result<()> {
    let expected = coeffs.state_len();
    if state.len() != expected {
        return Err(SynthError::FilterStateSizeMismatch {
            expected,
            actual: state.len(),
        });
    }

    for sample in signal.iter_mut() {
        let mut x = *sample as f64;
        let mut offset = 0;
        for section in &coeffs.sections {
            let next = offset + section.order;
            x = section.process(x, &mut state.values[offset..next]);
            offset = next;
        }
        *sample = x as f32;
    }
    Ok(())
}

/// What happened to a chunk passed through [`StreamingFilter::apply`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOutcome {
    Filtered,
    /// The state had the wrong length; it was rebuilt and the chunk filtered.
    Recovered,
    /// Filtering failed; the chunk was left dry and the state zeroed.
    Bypassed,
}

/// Chunk-by-chunk IIR filter with state carried between calls.
pub struct StreamingFilter {
    state: IirState,
    active: Option<(FilterType, usize)>,
    dry: Vec<f32>,
}

impl StreamingFilter {
    pub fn new(max_chunk: usize) -> Self {
        Self {
            state: IirState::zeroed(0),
            active: None,
            dry: Vec::with_capacity(max_chunk),
        }
    }

    pub fn state(&self) -> &IirState {
        &self.state
    }

    /// Adopt `coeffs`: a new type or order resizes and zeroes the state,
    /// a cutoff or bandwidth change keeps it. Returns true when the state was reset.
    pub fn prepare(&mut self, coeffs: &FilterCoefficients) -> bool {
        let design = (coeffs.kind(), coeffs.order());
        if self.active == Some(design) && self.state.len() == coeffs.state_len() {
            return false;
        }
        self.state.resize_zeroed(coeffs.state_len());
        self.active = Some(design);
        debug!(
            kind = coeffs.kind().name(),
            order = coeffs.order(),
            state_len = self.state.len(),
            "filter state resized"
        );
        true
    }

    /// Forget the filter's history, e.g. on a new note.
    pub fn reset(&mut self) {
        self.state.reset();
    }

    pub fn apply(&mut self, coeffs: &FilterCoefficients, signal: &mut [f32]) -> FilterOutcome {
        self.dry.clear();
        self.dry.extend_from_slice(signal);

        let outcome = match sosfilt(coeffs, &mut self.state, signal) {
            Ok(()) => FilterOutcome::Filtered,
            Err(err) => {
                warn!(error = %err, "resetting filter state");
                self.state.resize_zeroed(coeffs.state_len());
                self.active = Some((coeffs.kind(), coeffs.order()));
                match sosfilt(coeffs, &mut self.state, signal) {
                    Ok(()) => FilterOutcome::Recovered,
                    Err(err) => {
                        warn!(error = %err, "filter retry failed, passing chunk through");
                        FilterOutcome::Bypassed
                    }
                }
            }
        };

        if outcome != FilterOutcome::Bypassed {
            let peak = signal
                .iter()
                .try_fold(0.0f32, |peak, s| s.is_finite().then(|| peak.max(s.abs())));
            match peak {
                Some(peak) if peak <= OUTPUT_LIMIT => return outcome,
                Some(peak) => warn!(peak, "filter output out of range, passing chunk through"),
                None => warn!("filter output is not finite, passing chunk through"),
            }
        }
        signal.copy_from_slice(&self.dry);
        self.state.reset();
        FilterOutcome::Bypassed
    }
}

/// Magnitude in dB of the analog design at each of `freqs_hz`.
///
/// Low-pass and high-pass curves include a 2× makeup gain.
pub fn analog_response(
    settings: &FilterSettings,
    sample_rate: u32,
    freqs_hz: &[f64],
) -> Result<Vec<f64>> {
    settings.check(sample_rate)?;
    let to_rad = |hz: f64| 2.0 * PI * hz;
    let edges = if settings.kind.is_band() {
        let (low, high) = settings.band_edges(sample_rate)?;
        Edges::Band(to_rad(low), to_rad(high))
    } else {
        Edges::Single(to_rad(settings.cutoff_hz as f64))
    };
    let zpk = Zpk::butterworth(settings.order).transform(settings.kind, edges);
    let makeup = if settings.kind.is_band() {
        1.0
    } else {
        RESPONSE_MAKEUP_GAIN
    };

    Ok(freqs_hz
        .iter()
        .map(|&hz| {
            let magnitude = zpk.evaluate(Complex64::new(0.0, to_rad(hz))).norm() * makeup;
            20.0 * magnitude.max(1e-12).log10()
        })
        .collect())
}

/// `points` log-spaced frequencies from 10 Hz to 100 kHz.
pub fn response_frequencies(points: usize) -> Vec<f64> {
    let step = if points > 1 { 4.0 / (points - 1) as f64 } else { 0.0 };
    (0..points)
        .map(|i| 10f64.powf(1.0 + step * i as f64))
        .collect()
}

#[derive(Debug, Clone, Copy)]
enum Edges {
    Single(f64),
    Band(f64, f64),
}

/// Digital frequency in rad/sample where a design of `kind` has unity gain.
fn unity_angle(kind: FilterType, edges: Edges, fs: f64) -> f64 {
    match (kind, edges) {
        (FilterType::HighPass, _) => PI,
        (FilterType::BandPass, Edges::Band(low, high)) => {
            2.0 * ((low * high).sqrt() / (2.0 * fs)).atan()
        }
        _ => 0.0,
    }
}

/// Filter as zeros, poles and gain.
#[derive(Debug, Clone)]
struct Zpk {
    zeros: Vec<Complex64>,
    poles: Vec<Complex64>,
    gain: f64,
}

impl Zpk {
    /// Normalized analog Butterworth prototype (cutoff 1 rad/s).
    fn butterworth(order: usize) -> Self {
        let n = order as f64;
        let poles = (0..order)
            .map(|i| {
                let m = 1.0 - n + 2.0 * i as f64;
                -Complex64::from_polar(1.0, PI * m / (2.0 * n))
            })
            .collect();
        Self {
            zeros: Vec::new(),
            poles,
            gain: 1.0,
        }
    }

    fn degree(&self) -> usize {
        self.poles.len() - self.zeros.len()
    }

    /// Gain correction when every root is inverted (lp2hp, lp2bs).
    fn inverse_gain(&self) -> f64 {
        let zeros = product(self.zeros.iter().map(|&z| -z));
        (zeros / product(self.poles.iter().map(|&p| -p))).re
    }

    fn transform(self, kind: FilterType, edges: Edges) -> Self {
        let (wo, bw) = match edges {
            Edges::Single(w) => (w, 0.0),
            Edges::Band(low, high) => ((low * high).sqrt(), high - low),
        };
        match kind {
            FilterType::LowPass => self.lp2lp(wo),
            FilterType::HighPass => self.lp2hp(wo),
            FilterType::BandPass => self.lp2bp(wo, bw),
            FilterType::BandStop => self.lp2bs(wo, bw),
        }
    }

    fn lp2lp(self, wo: f64) -> Self {
        let degree = self.degree() as i32;
        Self {
            zeros: self.zeros.iter().map(|&z| z * wo).collect(),
            poles: self.poles.iter().map(|&p| p * wo).collect(),
            gain: self.gain * wo.powi(degree),
        }
    }

    fn lp2hp(self, wo: f64) -> Self {
        let degree = self.degree();
        let gain = self.gain * self.inverse_gain();
        let mut zeros: Vec<Complex64> = self.zeros.iter().map(|&z| wo / z).collect();
        zeros.extend(std::iter::repeat(Complex64::new(0.0, 0.0)).take(degree));
        Self {
            zeros,
            poles: self.poles.iter().map(|&p| wo / p).collect(),
            gain,
        }
    }

    fn lp2bp(self, wo: f64, bw: f64) -> Self {
        let degree = self.degree();
        let scale = |&r: &Complex64| r * (bw / 2.0);
        let mut zeros = split_band(self.zeros.iter().map(scale), wo);
        zeros.extend(std::iter::repeat(Complex64::new(0.0, 0.0)).take(degree));
        Self {
            zeros,
            poles: split_band(self.poles.iter().map(scale), wo),
            gain: self.gain * bw.powi(degree as i32),
        }
    }

    fn lp2bs(self, wo: f64, bw: f64) -> Self {
        let degree = self.degree();
        let gain = self.gain * self.inverse_gain();
        let invert = |&r: &Complex64| (bw / 2.0) / r;
        let mut zeros = split_band(self.zeros.iter().map(invert), wo);
        for _ in 0..degree {
            zeros.push(Complex64::new(0.0, wo));
            zeros.push(Complex64::new(0.0, -wo));
        }
        Self {
            zeros,
            poles: split_band(self.poles.iter().map(invert), wo),
            gain,
        }
    }

    fn bilinear(self, fs: f64) -> Self {
        let fs2 = 2.0 * fs;
        let degree = self.degree();
        let map = |&r: &Complex64| (fs2 + r) / (fs2 - r);
        let zeros_at = product(self.zeros.iter().map(|&z| fs2 - z));
        let poles_at = product(self.poles.iter().map(|&p| fs2 - p));
        let gain = self.gain * (zeros_at / poles_at).re;
        let mut zeros: Vec<Complex64> = self.zeros.iter().map(map).collect();
        zeros.extend(std::iter::repeat(Complex64::new(-1.0, 0.0)).take(degree));
        Self {
            zeros,
            poles: self.poles.iter().map(map).collect(),
            gain,
        }
    }

    fn evaluate(&self, s: Complex64) -> Complex64 {
        let zeros = product(self.zeros.iter().map(|&z| s - z));
        self.gain * zeros / product(self.poles.iter().map(|&p| s - p))
    }

    /// Pair the digital roots into real sections with unit gain at `reference`.
    ///
    /// Poles nearest the unit circle pick their zeros first, each taking the
    /// nearest ones left. Sections are then interleaved far, near, far, near
    /// and each is scaled to unit magnitude at `reference`, a point on the
    /// unit circle inside the passband. What is left of the design gain goes
    /// on the first section.
    fn to_sections(&self, reference: Complex64) -> Result<Vec<Section>> {
        let unpaired = || {
            SynthError::invalid(
                "filter order",
                format!(
                    "{} zeros and {} poles do not pair into sections",
                    self.zeros.len(),
                    self.poles.len()
                ),
            )
        };

        let mut poles = pole_factors(&self.poles);
        poles.sort_by(|x, y| (1.0 - x.root.norm()).total_cmp(&(1.0 - y.root.norm())));

        let mut complex: Vec<Complex64> = self
            .zeros
            .iter()
            .copied()
            .filter(|z| z.im > REAL_ROOT_TOLERANCE)
            .collect();
        let mut reals: Vec<f64> = self
            .zeros
            .iter()
            .filter(|z| z.im.abs() <= REAL_ROOT_TOLERANCE)
            .map(|z| z.re)
            .collect();

        let mut paired = Vec::with_capacity(poles.len());
        for pole in &poles {
            let from_complex = |z: &Complex64| (z - pole.root).norm();
            let from_real = |&z: &f64| (z - pole.root).norm();
            let b = if pole.order == 2 && !complex.is_empty() {
                let zero = take_nearest(&mut complex, from_complex).ok_or_else(unpaired)?;
                [1.0, -2.0 * zero.re, zero.norm_sqr()]
            } else {
                let first = take_nearest(&mut reals, from_real).ok_or_else(unpaired)?;
                if pole.order == 2 {
                    let second = take_nearest(&mut reals, from_real).ok_or_else(unpaired)?;
                    [1.0, -(first + second), first * second]
                } else {
                    [1.0, -first, 0.0]
                }
            };
            paired.push(Section {
                b,
                a: pole.coeffs,
                order: pole.order,
            });
        }
        if paired.is_empty() || !complex.is_empty() || !reals.is_empty() {
            return Err(unpaired());
        }

        // `paired` runs nearest first; deal from both ends, farthest first
        let mut sections = Vec::with_capacity(paired.len());
        let mut ends = paired.into_iter().rev();
        while let Some(far) = ends.next() {
            sections.push(far);
            if let Some(near) = ends.next_back() {
                sections.push(near);
            }
        }

        let z_inv = reference.conj();
        let mut remaining = self.gain;
        for section in sections.iter_mut() {
            let scale = 1.0 / section.response(z_inv).norm();
            section.b = section.b.map(|c| c * scale);
            remaining /= scale;
        }
        sections[0].b = sections[0].b.map(|c| c * remaining);
        Ok(sections)
    }
}

/// Real denominator factor of one conjugate pole pair, two real poles or a
/// single real pole, with the pole that stands for it when pairing zeros.
struct PoleFactor {
    coeffs: [f64; 3],
    order: usize,
    root: Complex64,
}

/// Complex pairs first, then real poles paired outermost first (lowest with
/// highest), then a leftover real pole as a first-order factor.
fn pole_factors(poles: &[Complex64]) -> Vec<PoleFactor> {
    let mut factors = Vec::with_capacity(poles.len() / 2 + 1);
    let mut reals = Vec::new();
    for &pole in poles {
        if pole.im.abs() <= REAL_ROOT_TOLERANCE {
            reals.push(pole.re);
        } else if pole.im > 0.0 {
            factors.push(PoleFactor {
                coeffs: [1.0, -2.0 * pole.re, pole.norm_sqr()],
                order: 2,
                root: pole,
            });
        }
    }

    reals.sort_by(f64::total_cmp);
    let (mut low, mut high) = (0, reals.len());
    while high - low >= 2 {
        let (p, q) = (reals[low], reals[high - 1]);
        factors.push(PoleFactor {
            coeffs: [1.0, -(p + q), p * q],
            order: 2,
            root: Complex64::new(if p.abs() > q.abs() { p } else { q }, 0.0),
        });
        low += 1;
        high -= 1;
    }
    if high - low == 1 {
        factors.push(PoleFactor {
            coeffs: [1.0, -reals[low], 0.0],
            order: 1,
            root: Complex64::new(reals[low], 0.0),
        });
    }
    factors
}

/// Remove and return the item with the smallest `distance`.
fn take_nearest<T>(items: &mut Vec<T>, distance: impl Fn(&T) -> f64) -> Option<T> {
    let index = (0..items.len())
        .min_by(|&i, &j| distance(&items[i]).total_cmp(&distance(&items[j])))?;
    Some(items.swap_remove(index))
}

/// Split each root r into the pair r ± sqrt(r² - wo²) around the band centre.
fn split_band(roots: impl Iterator<Item = Complex64>, wo: f64) -> Vec<Complex64> {
    let roots: Vec<Complex64> = roots.collect();
    let offsets: Vec<Complex64> = roots.iter().map(|r| (r * r - wo * wo).sqrt()).collect();
    roots
        .iter()
        .zip(&offsets)
        .map(|(r, o)| r + o)
        .chain(roots.iter().zip(&offsets).map(|(r, o)| r - o))
        .collect()
}

fn product(values: impl Iterator<Item = Complex64>) -> Complex64 {
    values.fold(Complex64::new(1.0, 0.0), |acc, v| acc * v)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RATE: u32 = 44_100;

    fn settings(
        kind: FilterType,
        order: usize,
        cutoff_hz: f32,
        bandwidth_hz: f32,
    ) -> FilterSettings {
        FilterSettings {
            kind,
            order,
            cutoff_hz,
            bandwidth_hz,
            enabled: true,
        }
    }

    fn design(
        kind: FilterType,
        order: usize,
        cutoff_hz: f32,
        bandwidth_hz: f32,
    ) -> FilterCoefficients {
        let settings = settings(kind, order, cutoff_hz, bandwidth_hz);
        FilterCoefficients::design(&settings, SAMPLE_RATE).unwrap()
    }

    fn sine(freq: f32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / SAMPLE_RATE as f32).sin())
            .collect()
    }

    fn peak(buffer: &[f32]) -> f32 {
        buffer.iter().fold(0.0f32, |acc, s| acc.max(s.abs()))
    }

    fn peak_after_transient(buffer: &[f32]) -> f32 {
        peak(&buffer[buffer.len() / 2..])
    }

    fn run(settings: &FilterSettings, mut signal: Vec<f32>) -> Vec<f32> {
        let coeffs = FilterCoefficients::design(settings, SAMPLE_RATE).unwrap();
        let mut state = IirState::zeroed(coeffs.state_len());
        sosfilt(&coeffs, &mut state, &mut signal).unwrap();
        signal
    }

    #[test]
    fn test_first_order_lowpass_matches_closed_form() {
        let coeffs = design(FilterType::LowPass, 1, 1_000.0, 0.0);
        let fs = SAMPLE_RATE as f64;
        let wc = 2.0 * fs * (PI * 1_000.0 / fs).tan();
        let k = wc / (wc + 2.0 * fs);

        assert_eq!(coeffs.sections().len(), 1);
        let section = coeffs.sections()[0];
        assert_eq!(section.order(), 1);
        assert!((section.b()[0] - k).abs() < 1e-12);
        assert!((section.b()[1] - k).abs() < 1e-12);
        assert_eq!(section.b()[2], 0.0);
        assert!((section.a()[0] - 1.0).abs() < 1e-12);
        assert!((section.a()[1] - (wc - 2.0 * fs) / (wc + 2.0 * fs)).abs() < 1e-12);
    }

    #[test]
    fn test_state_len_follows_kind_and_order() {
        for (kind, expected) in [
            (FilterType::LowPass, 4),
            (FilterType::HighPass, 4),
            (FilterType::BandPass, 8),
            (FilterType::BandStop, 8),
        ] {
            let coeffs = design(kind, 4, 2_000.0, 200.0);
            assert_eq!(coeffs.state_len(), expected, "{}", kind.name());
        }
    }

    #[test]
    fn test_sections_cover_every_pole() {
        for order in MIN_ORDER..=MAX_ORDER {
            let low = design(FilterType::LowPass, order, 1_000.0, 0.0);
            assert_eq!(low.sections().len(), order.div_ceil(2));
            assert_eq!(low.state_len(), order);
            // Only an odd order leaves a first-order section
            let first_order = low.sections().iter().filter(|s| s.order() == 1).count();
            assert_eq!(first_order, order % 2);

            let band = design(FilterType::BandPass, order, 1_000.0, 200.0);
            assert_eq!(band.sections().len(), order);
            assert_eq!(band.state_len(), 2 * order);
        }
    }

    #[test]
    fn test_section_poles_stay_inside_unit_circle() {
        for kind in FilterType::ALL {
            for order in [1, 5, 16] {
                let coeffs = design(kind, order, 100.0, 10.0);
                for section in coeffs.sections() {
                    // a2 is the product of the pole pair, -a1 a lone pole
                    let radius = if section.order() == 2 {
                        section.a()[2].abs()
                    } else {
                        section.a()[1].abs()
                    };
                    assert!(radius < 1.0, "{} order {order}: {:?}", kind.name(), section);
                }
            }
        }
    }

    #[test]
    fn test_lowpass_passes_dc() {
        let out = run(&settings(FilterType::LowPass, 4, 2_000.0, 0.0), vec![1.0; 4096]);
        assert!((out[4095] - 1.0).abs() < 1e-3, "DC gain should be unity, got {}", out[4095]);
    }

    #[test]
    fn test_highpass_blocks_dc() {
        let out = run(&settings(FilterType::HighPass, 4, 2_000.0, 0.0), vec![1.0; 4096]);
        assert!(out[4095].abs() < 1e-3, "DC should be rejected, got {}", out[4095]);
    }

    #[test]
    fn test_high_order_lowpass_passes_dc_at_low_cutoff() {
        let out = run(&settings(FilterType::LowPass, 16, 100.0, 0.0), vec![1.0; 44_100]);
        assert!((out[44_099] - 1.0).abs() < 1e-3, "DC gain should be unity, got {}", out[44_099]);
    }

    #[test]
    fn test_lowpass_filters_high_freq() {
        let out = run(&settings(FilterType::LowPass, 4, 500.0, 0.0), sine(5_000.0, 8192));
        assert!(peak_after_transient(&out) < 0.01, "5 kHz should be attenuated");
    }

    #[test]
    fn test_bandpass_keeps_centre_and_rejects_outside() {
        let band = settings(FilterType::BandPass, 2, 1_000.0, 400.0);
        let centre = peak_after_transient(&run(&band, sine(1_000.0, 16_384)));
        let outside = peak_after_transient(&run(&band, sine(100.0, 16_384)));
        assert!(centre > 0.9, "centre frequency should pass, got {centre}");
        assert!(outside < 0.1, "100 Hz should be rejected, got {outside}");
    }

    #[test]
    fn test_narrow_high_order_bandpass_keeps_its_centre() {
        let band = settings(FilterType::BandPass, 8, 300.0, 50.0);
        let centre = peak_after_transient(&run(&band, sine(300.0, 88_200)));
        let outside = peak_after_transient(&run(&band, sine(1_000.0, 88_200)));
        assert!(centre > 0.9 && centre < 1.1, "300 Hz should pass at unity, got {centre}");
        assert!(outside < 1e-3, "1 kHz should be rejected, got {outside}");
    }

    #[test]
    fn test_bandstop_rejects_centre() {
        let notch = settings(FilterType::BandStop, 2, 1_000.0, 400.0);
        let centre = peak_after_transient(&run(&notch, sine(1_000.0, 16_384)));
        let outside = peak_after_transient(&run(&notch, sine(100.0, 16_384)));
        assert!(centre < 0.1, "centre frequency should be rejected, got {centre}");
        assert!(outside > 0.9, "100 Hz should pass, got {outside}");
    }

    #[test]
    fn test_every_accepted_design_stays_bounded() {
        let chunk_len = 512;
        let input = sine(246.0, 40 * chunk_len);
        for kind in FilterType::ALL {
            for order in MIN_ORDER..=MAX_ORDER {
                for (cutoff, bandwidth) in [
                    (100.0, 10.0),
                    (100.0, 1_000.0),
                    (300.0, 50.0),
                    (8_000.0, 1_000.0),
                ] {
                    let coeffs = design(kind, order, cutoff, bandwidth);
                    let mut filter = StreamingFilter::new(chunk_len);
                    filter.prepare(&coeffs);
                    let mut signal: Vec<f32> = input.iter().map(|s| 0.5 * s).collect();
                    for chunk in signal.chunks_mut(chunk_len) {
                        let outcome = filter.apply(&coeffs, chunk);
                        assert_eq!(
                            outcome,
                            FilterOutcome::Filtered,
                            "{} order {order} at {cutoff}/{bandwidth} Hz",
                            kind.name()
                        );
                    }
                    let out_peak = peak(&signal);
                    assert!(
                        out_peak < 1.0,
                        "{} order {order} at {cutoff}/{bandwidth} Hz peaked at {out_peak}",
                        kind.name()
                    );
                }
            }
        }
    }

    #[test]
    fn test_consecutive_chunks_match_single_block() {
        let coeffs = design(FilterType::BandPass, 4, 1_500.0, 300.0);
        let input = sine(1_400.0, 4096);

        let mut whole = input.clone();
        let mut state = IirState::zeroed(coeffs.state_len());
        sosfilt(&coeffs, &mut state, &mut whole).unwrap();

        let mut streamed = input;
        let mut filter = StreamingFilter::new(2048);
        filter.prepare(&coeffs);
        let (first, second) = streamed.split_at_mut(2048);
        assert_eq!(filter.apply(&coeffs, first), FilterOutcome::Filtered);
        assert_eq!(filter.apply(&coeffs, second), FilterOutcome::Filtered);

        for (i, (a, b)) in whole.iter().zip(&streamed).enumerate() {
            assert!((a - b).abs() < 1e-5, "sample {i} differs: {a} vs {b}");
        }
    }

    #[test]
    fn test_mismatched_state_is_an_error() {
        let coeffs = design(FilterType::LowPass, 4, 2_000.0, 0.0);
        let mut state = IirState::zeroed(8);
        let mut signal = vec![0.5f32; 16];
        let err = sosfilt(&coeffs, &mut state, &mut signal).unwrap_err();
        assert_eq!(
            err,
            SynthError::FilterStateSizeMismatch {
                expected: 4,
                actual: 8
            }
        );
        assert!(signal.iter().all(|&s| s == 0.5), "signal must be untouched");
    }

    #[test]
    fn test_streaming_filter_recovers_from_stale_state() {
        let band = design(FilterType::BandPass, 4, 2_000.0, 200.0);
        let low = design(FilterType::LowPass, 4, 2_000.0, 0.0);

        let mut filter = StreamingFilter::new(256);
        filter.prepare(&band);
        let mut chunk = vec![1.0f32; 256];
        assert_eq!(filter.apply(&low, &mut chunk), FilterOutcome::Recovered);
        assert_eq!(filter.state().len(), 4);

        let mut next = vec![1.0f32; 256];
        assert_eq!(filter.apply(&low, &mut next), FilterOutcome::Filtered);
    }

    #[test]
    fn test_out_of_range_output_passes_chunk_through_dry() {
        let coeffs = design(FilterType::LowPass, 2, 2_000.0, 0.0);
        let mut filter = StreamingFilter::new(64);
        filter.prepare(&coeffs);

        // Samples far above the limit survive a unity-gain filter
        let mut loud = vec![100.0f32; 64];
        assert_eq!(filter.apply(&coeffs, &mut loud), FilterOutcome::Bypassed);
        assert!(loud.iter().all(|&s| s == 100.0), "bypassed chunk is left dry");
        assert!(filter.state().values().iter().all(|&z| z == 0.0));

        let mut quiet = vec![0.25f32; 64];
        assert_eq!(filter.apply(&coeffs, &mut quiet), FilterOutcome::Filtered);
    }

    #[test]
    fn test_type_switch_resizes_state() {
        let mut filter = StreamingFilter::new(64);
        let mut lengths = Vec::new();
        for kind in [FilterType::LowPass, FilterType::BandPass, FilterType::LowPass] {
            let coeffs = design(kind, 4, 2_000.0, 200.0);
            assert!(filter.prepare(&coeffs), "switching to {} resets state", kind.name());
            lengths.push(filter.state().len());
            let mut chunk = vec![0.25f32; 64];
            assert_eq!(filter.apply(&coeffs, &mut chunk), FilterOutcome::Filtered);
        }
        assert_eq!(lengths, vec![4, 8, 4]);
    }

    #[test]
    fn test_cutoff_change_keeps_state() {
        let mut filter = StreamingFilter::new(64);
        let first = design(FilterType::LowPass, 4, 2_000.0, 0.0);
        let second = design(FilterType::LowPass, 4, 3_000.0, 0.0);
        filter.prepare(&first);
        let mut chunk = vec![1.0f32; 64];
        filter.apply(&first, &mut chunk);
        let carried = filter.state().clone();
        assert!(!filter.prepare(&second));
        assert_eq!(filter.state(), &carried);
    }

    #[test]
    fn test_design_rejects_bad_order_and_cutoff() {
        for order in [0, MAX_ORDER + 1] {
            let low = settings(FilterType::LowPass, order, 1_000.0, 0.0);
            assert!(matches!(
                FilterCoefficients::design(&low, SAMPLE_RATE),
                Err(SynthError::InvalidParameter { name: "filter order", .. })
            ));
        }
        let above_nyquist = settings(FilterType::LowPass, 2, 30_000.0, 0.0);
        assert!(FilterCoefficients::design(&above_nyquist, SAMPLE_RATE).is_err());
    }

    #[test]
    fn test_band_edges_are_clamped() {
        let wide = settings(FilterType::BandPass, 2, 100.0, 1_000.0);
        let (low, high) = wide.band_edges(SAMPLE_RATE).unwrap();
        assert_eq!(low, 1.0);
        assert_eq!(high, 600.0);
    }

    #[test]
    fn test_analog_response_shapes() {
        let freqs = [10.0, 1_000.0, 100_000.0];
        let low_pass = settings(FilterType::LowPass, 4, 1_000.0, 0.0);
        let low = analog_response(&low_pass, SAMPLE_RATE, &freqs).unwrap();
        let makeup_db = 20.0 * 2f64.log10();
        assert!((low[0] - makeup_db).abs() < 0.01, "passband carries makeup gain: {}", low[0]);
        assert!((low[1] - (makeup_db - 3.0103)).abs() < 0.01, "cutoff sits 3 dB down: {}", low[1]);
        assert!(low[2] < -100.0);

        let band_pass = settings(FilterType::BandPass, 2, 1_000.0, 200.0);
        let centre = (900.0f64 * 1_100.0).sqrt();
        let band = analog_response(&band_pass, SAMPLE_RATE, &[centre]).unwrap();
        assert!(band[0].abs() < 0.01, "band centre is unity gain: {}", band[0]);
    }

    #[test]
    fn test_response_frequencies_span_four_decades() {
        let freqs = response_frequencies(41);
        assert_eq!(freqs.len(), 41);
        assert!((freqs[0] - 10.0).abs() < 1e-9);
        assert!((freqs[40] - 100_000.0).abs() < 1e-6);
    }
}
