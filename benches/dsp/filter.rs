//! Benchmarks for Butterworth design and streaming IIR filtering.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use keysynth::dsp::filter::{FilterCoefficients, FilterSettings, FilterType, StreamingFilter};
use keysynth::SAMPLE_RATE;

use crate::CHUNK_SIZES;

fn settings(kind: FilterType, order: usize) -> FilterSettings {
    FilterSettings {
        kind,
        order,
        cutoff_hz: 1_000.0,
        bandwidth_hz: 200.0,
        enabled: true,
    }
}

pub fn bench_filter(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/filter");

    // Coefficient design runs on every cutoff or order edit
    for order in [2, 4, 8] {
        let bandpass = settings(FilterType::BandPass, order);
        group.bench_with_input(BenchmarkId::new("design_bandpass", order), &order, |b, _| {
            b.iter(|| FilterCoefficients::design(black_box(&bandpass), SAMPLE_RATE))
        });
    }

    for &size in CHUNK_SIZES {
        // Sawtooth-like ramp
        let input: Vec<f32> = (0..size)
            .map(|i| (i as f32 / size as f32) * 2.0 - 1.0)
            .collect();

        for kind in FilterType::ALL {
            let coeffs = match FilterCoefficients::design(&settings(kind, 4), SAMPLE_RATE) {
                Ok(coeffs) => coeffs,
                Err(err) => panic!("order 4 {} must design: {err}", kind.name()),
            };
            let mut filter = StreamingFilter::new(size);
            filter.prepare(&coeffs);
            let mut buffer = input.clone();

            group.bench_with_input(BenchmarkId::new(kind.name(), size), &size, |b, _| {
                b.iter(|| {
                    buffer.copy_from_slice(&input);
                    filter.apply(black_box(&coeffs), black_box(&mut buffer))
                })
            });
        }
    }

    group.finish();
}
