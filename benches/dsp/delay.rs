//! Benchmarks for the feedback echo and the LFO that shares the chain.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use keysynth::dsp::delay::FeedbackDelay;
use keysynth::dsp::lfo::{Lfo, LfoSettings};
use keysynth::{MAX_FEEDBACK_DEPTH, SAMPLE_RATE};

use crate::CHUNK_SIZES;

pub fn bench_delay(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/delay");

    for &size in CHUNK_SIZES {
        let input: Vec<f32> = (0..size).map(|i| (i as f32 * 0.01).sin()).collect();
        let mut buffer = input.clone();

        // Dry path still records history
        let mut delay = FeedbackDelay::new(11_025, MAX_FEEDBACK_DEPTH);
        group.bench_with_input(BenchmarkId::new("dry", size), &size, |b, _| {
            b.iter(|| {
                buffer.copy_from_slice(&input);
                delay.process(black_box(&mut buffer), false);
            })
        });

        let mut delay = FeedbackDelay::new(11_025, MAX_FEEDBACK_DEPTH);
        group.bench_with_input(BenchmarkId::new("wet", size), &size, |b, _| {
            b.iter(|| {
                buffer.copy_from_slice(&input);
                delay.process(black_box(&mut buffer), true);
            })
        });

        let lfo = Lfo::new(SAMPLE_RATE);
        let settings = LfoSettings {
            enabled: true,
            ..LfoSettings::default()
        };
        group.bench_with_input(BenchmarkId::new("lfo", size), &size, |b, _| {
            b.iter(|| {
                buffer.copy_from_slice(&input);
                lfo.modulate(black_box(&settings), 0, black_box(&mut buffer));
            })
        });
    }

    group.finish();
}
