//! Benchmarks for envelope table lookups and the release curve.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use keysynth::dsp::envelope::{EnvelopeBuffer, EnvelopeSettings, ReleaseCurve};
use keysynth::SAMPLE_RATE;

use crate::CHUNK_SIZES;

pub fn bench_envelope(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/envelope");
    let len = SAMPLE_RATE as usize;

    // Building the table happens on every envelope edit
    group.bench_function("build", |b| {
        b.iter(|| EnvelopeBuffer::build(black_box(EnvelopeSettings::default()), len))
    });

    let envelope = match EnvelopeBuffer::build(EnvelopeSettings::default(), len) {
        Ok(envelope) => envelope,
        Err(err) => panic!("default envelope must build: {err}"),
    };

    for &size in CHUNK_SIZES {
        let mut buffer = vec![0.0f32; size];

        // Attack/decay phase
        group.bench_with_input(BenchmarkId::new("attack", size), &size, |b, _| {
            b.iter(|| envelope.render_held(black_box(0), black_box(&mut buffer)))
        });

        // Past attack/decay, every sample is the plateau
        let sustain_start = envelope.attack_decay_len() + size;
        group.bench_with_input(BenchmarkId::new("sustain", size), &size, |b, _| {
            b.iter(|| envelope.render_held(black_box(sustain_start), black_box(&mut buffer)))
        });

        let mut release = ReleaseCurve::with_capacity(2 * len);
        release.trigger(envelope.held_level(envelope.attack_decay_len()), 11_025);
        group.bench_with_input(BenchmarkId::new("release", size), &size, |b, _| {
            b.iter(|| release.render(black_box(0), black_box(&mut buffer)))
        });
    }

    group.finish();
}
