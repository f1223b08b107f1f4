//! Benchmarks for waveform generation.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use keysynth::dsp::oscillator::{OscillatorBank, Waveform};
use keysynth::SAMPLE_RATE;

use crate::CHUNK_SIZES;

pub fn bench_oscillator(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/oscillator");

    for &size in CHUNK_SIZES {
        let mut buffer = vec![0.0f32; size];

        for waveform in Waveform::ALL {
            let mut bank = OscillatorBank::with_seed(SAMPLE_RATE, 7);
            let mut start = 0u64;
            group.bench_with_input(BenchmarkId::new(waveform.name(), size), &size, |b, _| {
                b.iter(|| {
                    bank.render(
                        black_box(waveform),
                        black_box(440.0),
                        start,
                        black_box(&mut buffer),
                    );
                    start += size as u64;
                })
            });
        }
    }

    group.finish();
}
