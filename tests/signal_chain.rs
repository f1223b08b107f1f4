use keysynth::{
    dsp::{
        delay::FeedbackDelay,
        envelope::{EnvelopeSettings, SUSTAIN_KNOB_MAX},
        filter::{
            FilterCoefficients, FilterOutcome, FilterSettings, FilterType, IirState,
            StreamingFilter,
        },
        lfo::Lfo,
        oscillator::{OscillatorBank, Waveform},
    },
    io::keys::note_frequency,
    synth::{Key, KeyEvent, ParameterStore, VoiceController, VoiceState},
    SynthError, MAX_FEEDBACK_DEPTH, SAMPLE_RATE,
};

const CHUNK: usize = 512;
const SEED: u64 = 7;
const NOTE: u8 = 9;

fn peak(buffer: &[f32]) -> f32 {
    buffer.iter().fold(0.0f32, |acc, s| acc.max(s.abs()))
}

/// Short envelope, LFO and low-pass on, echoes two chunks apart.
fn full_chain_store(waveform: Waveform, delay_enabled: bool) -> ParameterStore {
    let store = ParameterStore::new(SAMPLE_RATE).unwrap();
    store
        .update(|p| {
            p.envelope = EnvelopeSettings::new(2_000, 2_000, 8_000, 1_000);
            p.waveform = waveform;
            p.lfo.enabled = true;
            p.lfo.rate_hz = 3.0;
            p.filter.enabled = true;
            p.filter.kind = FilterType::LowPass;
            p.filter.order = 6;
            p.filter.cutoff_hz = 1_500.0;
            p.delay.delay_samples = 2 * CHUNK;
            p.delay.enabled = delay_enabled;
        })
        .unwrap();
    store
}

/// Hold `NOTE` and render `chunks` chunks with a seeded oscillator.
fn render_held(store: &ParameterStore, chunks: usize) -> Vec<Vec<f32>> {
    let oscillator = OscillatorBank::with_seed(SAMPLE_RATE, SEED);
    let mut synth = VoiceController::with_oscillator(store.snapshot(), oscillator, CHUNK);
    synth.handle(KeyEvent::press(Key::Note(NOTE)));
    (0..chunks)
        .map(|_| {
            let mut out = vec![0.0f32; CHUNK];
            synth.render(&mut out);
            out
        })
        .collect()
}

#[test]
fn echo_repeats_halve_each_time() {
    let mut delay = FeedbackDelay::new(100, MAX_FEEDBACK_DEPTH);
    let mut signal = vec![0.0f32; CHUNK];
    signal[0] = 1.0;
    delay.process(&mut signal, true);

    assert_eq!(signal[0], 1.0);
    assert_eq!(signal[100], 0.5);
    assert_eq!(signal[200], 0.25);
    assert_eq!(signal[300], 0.125);
    assert_eq!(signal[400], 0.0, "only {MAX_FEEDBACK_DEPTH} repeats");
}

#[test]
fn chunk_runs_oscillator_lfo_envelope_then_filter() {
    let store = full_chain_store(Waveform::Sawtooth, false);
    let snapshot = store.snapshot();
    let params = snapshot.params;
    let frequency = note_frequency(NOTE).unwrap();
    let rendered = render_held(&store, 8);

    let mut oscillator = OscillatorBank::with_seed(SAMPLE_RATE, SEED);
    let lfo = Lfo::new(SAMPLE_RATE);
    let mut filter = StreamingFilter::new(CHUNK);
    filter.prepare(&snapshot.filter);
    let mut gains = vec![0.0f32; CHUNK];

    for (k, chunk) in rendered.iter().enumerate() {
        let start = (k * CHUNK) as u64;
        let mut expected = vec![0.0f32; CHUNK];
        oscillator.render(params.waveform, frequency, start, &mut expected);
        lfo.modulate(&params.lfo, start, &mut expected);
        snapshot.envelope.render_held(start as usize, &mut gains);
        for (sample, gain) in expected.iter_mut().zip(&gains) {
            *sample *= gain;
        }
        assert_eq!(filter.apply(&snapshot.filter, &mut expected), FilterOutcome::Filtered);

        for (i, (got, want)) in chunk.iter().zip(&expected).enumerate() {
            assert!((got - want).abs() < 1e-6, "chunk {k} sample {i}: {got} vs {want}");
        }
    }
}

#[test]
fn echoes_repeat_the_filtered_enveloped_signal() {
    let chunks = 12;
    let dry = render_held(&full_chain_store(Waveform::Noise, false), chunks);
    let wet = render_held(&full_chain_store(Waveform::Noise, true), chunks);
    assert!(peak(&dry[4]) > 0.01, "the dry chain is audible");

    // Echo d of chunk k is chunk k - 2d, scaled by 0.5^d
    for k in 0..chunks {
        for i in 0..CHUNK {
            let mut expected = dry[k][i];
            let mut gain = 1.0f32;
            for d in 1..=MAX_FEEDBACK_DEPTH {
                gain *= 0.5;
                if k >= 2 * d {
                    expected += gain * dry[k - 2 * d][i];
                }
            }
            let got = wet[k][i];
            assert!((got - expected).abs() < 1e-5, "chunk {k} sample {i}: {got} vs {expected}");
        }
    }
}

#[test]
fn narrow_high_order_bandpass_shapes_the_voice() {
    let store = ParameterStore::new(SAMPLE_RATE).unwrap();
    store
        .update(|p| {
            p.envelope = EnvelopeSettings::new(100, 100, SUSTAIN_KNOB_MAX, 100);
            p.filter.enabled = true;
            p.filter.kind = FilterType::BandPass;
            p.filter.order = 8;
            p.filter.cutoff_hz = 300.0;
            p.filter.bandwidth_hz = 50.0;
        })
        .unwrap();
    let mut synth = VoiceController::new(store.snapshot(), SAMPLE_RATE, CHUNK);
    let mut out = vec![0.0f32; CHUNK];

    // A#4 (466 Hz) sits well above the 275..325 Hz band
    synth.handle(KeyEvent::press(Key::Note(11)));
    for _ in 0..60 {
        synth.render(&mut out);
    }
    let level = peak(&out);
    assert!(level.is_finite() && level < 0.01, "out-of-band note leaked through: {level}");
}

#[test]
fn filter_state_length_follows_type_and_order() {
    let cases = [
        (FilterType::LowPass, 4),
        (FilterType::HighPass, 4),
        (FilterType::BandPass, 8),
        (FilterType::BandStop, 8),
    ];
    for (kind, expected) in cases {
        let settings = FilterSettings {
            kind,
            order: 4,
            ..FilterSettings::default()
        };
        let coeffs = FilterCoefficients::design(&settings, SAMPLE_RATE).unwrap();
        assert_eq!(coeffs.state_len(), expected, "{}", kind.name());
        assert_eq!(IirState::zeroed(coeffs.state_len()).len(), expected);
    }
}

#[test]
fn overlong_envelope_keeps_the_previous_snapshot() {
    let store = ParameterStore::new(SAMPLE_RATE).unwrap();
    let before = store.snapshot();

    let err = store.set_attack(40_000).unwrap_err();
    assert!(matches!(err, SynthError::EnvelopeTooLong { attack: 40_000, .. }));
    assert_eq!(store.version(), before.version);
    assert_eq!(store.parameters(), before.params);
}

#[test]
fn new_key_retriggers_the_voice() {
    let store = ParameterStore::new(SAMPLE_RATE).unwrap();
    let mut synth = VoiceController::new(store.snapshot(), SAMPLE_RATE, CHUNK);
    let mut out = vec![0.0f32; CHUNK];

    synth.handle(KeyEvent::press(Key::Note(0)));
    for _ in 0..3 {
        synth.render(&mut out);
    }
    assert_eq!(synth.voice().played_chunks(), 3);

    synth.handle(KeyEvent::press(Key::Note(5)));
    assert_eq!(synth.voice().played_chunks(), 0);
    assert_eq!(synth.voice().note(), 5);

    // Releasing the old key does nothing
    synth.handle(KeyEvent::release(Key::Note(0)));
    assert_eq!(synth.voice().state(), VoiceState::Sounding);
}

#[test]
fn released_note_fades_to_silence() {
    let store = ParameterStore::new(SAMPLE_RATE).unwrap();
    let mut synth = VoiceController::new(store.snapshot(), SAMPLE_RATE, CHUNK);
    let mut out = vec![0.0f32; CHUNK];

    synth.handle(KeyEvent::press(Key::Note(3)));
    for _ in 0..40 {
        synth.render(&mut out);
    }
    assert!(peak(&out) > 0.05);

    synth.handle(KeyEvent::release(Key::Note(3)));
    let mut chunks = 0;
    while !synth.voice().is_idle() {
        synth.render(&mut out);
        chunks += 1;
        assert!(chunks <= 18, "release must end");
    }
    synth.render(&mut out);
    assert_eq!(peak(&out), 0.0);
}
