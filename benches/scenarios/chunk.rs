//! Benchmarks for one rendered chunk through the full voice chain.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use keysynth::dsp::filter::FilterType;
use keysynth::dsp::oscillator::Waveform;
use keysynth::synth::{Key, KeyEvent, ParameterStore, VoiceController};
use keysynth::SAMPLE_RATE;

use crate::CHUNK_SIZES;

fn store(configure: impl FnOnce(&mut keysynth::synth::SynthParameters)) -> ParameterStore {
    let store = match ParameterStore::new(SAMPLE_RATE) {
        Ok(store) => store,
        Err(err) => panic!("default parameters must build: {err}"),
    };
    if let Err(err) = store.update(configure) {
        panic!("scenario parameters must build: {err}");
    }
    store
}

pub fn bench_chunk(c: &mut Criterion) {
    let mut group = c.benchmark_group("scenarios/chunk");

    let scenarios: [(&str, ParameterStore); 4] = [
        // Bare oscillator and envelope
        ("plain_sine", store(|_| {})),
        // Sawtooth through an order-4 low-pass
        (
            "saw_lowpass",
            store(|p| {
                p.waveform = Waveform::Sawtooth;
                p.filter.enabled = true;
            }),
        ),
        // Band-pass is twice the state of the low-pass
        (
            "square_bandpass_lfo",
            store(|p| {
                p.waveform = Waveform::Square;
                p.filter.kind = FilterType::BandPass;
                p.filter.enabled = true;
                p.lfo.enabled = true;
            }),
        ),
        // Everything on
        (
            "full_chain",
            store(|p| {
                p.waveform = Waveform::Triangle;
                p.filter.kind = FilterType::BandStop;
                p.filter.order = 8;
                p.filter.enabled = true;
                p.lfo.enabled = true;
                p.delay.enabled = true;
            }),
        ),
    ];

    for &size in CHUNK_SIZES {
        let mut buffer = vec![0.0f32; size];

        for (name, store) in &scenarios {
            let mut controller = VoiceController::new(store.snapshot(), SAMPLE_RATE, size);
            controller.handle(KeyEvent::press(Key::Note(9)));

            group.bench_with_input(BenchmarkId::new(*name, size), &size, |b, _| {
                b.iter(|| controller.render(black_box(&mut buffer)))
            });
        }
    }

    group.finish();
}
