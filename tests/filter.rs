//! Tests for the resonant low-pass filter


use dsp_externals::filter::lores::*;
use dsp_externals::{DspSetup, Perform};

const SAMPLE_RATE: f32 = 44100.0;
const BLOCK_SIZE: usize = 64;

fn setup(block_size: usize) -> DspSetup {
    DspSetup::new(SAMPLE_RATE, block_size)
        .with_vectorize(true)
        .with_connected(1, false)
        .with_connected(2, false)
}

fn prepared(frequency: f32, resonance: f32) -> Lores {
    let mut filter = Lores::new(frequency, resonance);
    filter.prepare(&setup(BLOCK_SIZE));
    filter
}

fn impulse() -> [f32; BLOCK_SIZE] {
    let mut block = [0.0; BLOCK_SIZE];
    block[0] = 1.0;
    block
}

#[test]
fn coefficients_follow_resonance_and_frequency_terms() {
    for frequency in [0.0, 100.0, 1000.0, 5000.0, 20000.0, -300.0, 1.0e6] {
        for resonance in [0.0, 0.25, 0.5, 0.9, 0.999] {
            let filter = prepared(frequency, resonance);
            let c = filter.coefficients();
            let term = resonance_term(resonance);

            assert!((term - (resonance * 0.125).exp() * 0.882497).abs() < 1e-6);
            assert!((c.a2 - term * term).abs() < 1e-6);
            assert!(c.a1.abs() <= 2.0 * term);
            assert_eq!(c.scale(), 1.0 + c.a1 + c.a2);
        }
    }
}

#[test]
fn resonance_is_clamped_below_one() {
    assert!(MAX_RESONANCE < 1.0);
    assert_eq!(clamp_resonance(1.0), MAX_RESONANCE);
    assert_eq!(clamp_resonance(7.5), MAX_RESONANCE);
    assert_eq!(clamp_resonance(-0.5), 0.0);

    for resonance in [-1.0, 0.0, 0.3, 0.999, 1.0, 2.0, 100.0] {
        let once = clamp_resonance(resonance);
        assert_eq!(clamp_resonance(once), once);
    }

    let filter = Lores::new(1000.0, 3.0);
    assert_eq!(filter.params().resonance(), MAX_RESONANCE);
    filter.params().set_resonance(1.0);
    assert_eq!(filter.params().resonance(), MAX_RESONANCE);
}

#[test]
fn lifecycle() {
    let mut filter = Lores::new(1000.0, 0.5);
    assert_eq!(filter.state(), LoresState::Idle);

    let mut out = [3.0; BLOCK_SIZE];
    filter.process(&impulse(), None, None, &mut out);
    assert!(out.iter().all(|x| *x == 3.0));

    filter.prepare(&setup(BLOCK_SIZE));
    assert_eq!(filter.state(), LoresState::Armed);
    assert_eq!(filter.kernel(), Some(LoresKernel::Unrolled));

    filter.process(&impulse(), None, None, &mut out);
    assert_eq!(filter.state(), LoresState::Running);

    filter.prepare(&setup(2));
    assert_eq!(filter.state(), LoresState::Armed);
    assert_eq!(filter.kernel(), Some(LoresKernel::Scalar));

    // Unrolled kernels need the host's permission.
    filter.prepare(&setup(BLOCK_SIZE).with_vectorize(false));
    assert_eq!(filter.kernel(), Some(LoresKernel::Scalar));

    let mut smoothed = Lores::new(1000.0, 0.5).with_smoothing(true);
    smoothed.prepare(&setup(BLOCK_SIZE).with_vectorize(false));
    assert_eq!(smoothed.kernel(), Some(LoresKernel::Scalar));
}

#[test]
fn prepare_clears_memory() {
    let mut filter = prepared(1000.0, 0.9);
    let mut out = [0.0; BLOCK_SIZE];

    filter.process(&impulse(), None, None, &mut out);
    assert!(out.iter().any(|x| *x != 0.0));

    filter.prepare(&setup(BLOCK_SIZE));
    filter.process(&[0.0; BLOCK_SIZE], None, None, &mut out);
    assert!(out.iter().all(|x| *x == 0.0));

    filter.process(&impulse(), None, None, &mut out);
    filter.prepare(&setup(2));
    filter.process(&[0.0; BLOCK_SIZE], None, None, &mut out);
    assert!(out.iter().all(|x| *x == 0.0));
}

#[test]
fn silence_decays_to_zero() {
    let mut filter = prepared(1000.0, 0.9);
    let silence = [0.0; BLOCK_SIZE];
    let mut out = [0.0; BLOCK_SIZE];

    filter.process(&impulse(), None, None, &mut out);
    let first_peak = out.iter().fold(0.0f32, |m, x| m.max(x.abs()));
    assert!(first_peak > 0.0);

    let mut peaks = Vec::new();
    for _ in 0..200 {
        filter.process(&silence, None, None, &mut out);
        peaks.push(out.iter().fold(0.0f32, |m, x| m.max(x.abs())));
    }

    assert!(peaks[10] < first_peak);
    assert!(out.iter().all(|x| *x == 0.0));
}

#[test]
fn clear_then_silence_is_silent() {
    let mut filter = prepared(800.0, 0.95);
    let mut out = [0.0; BLOCK_SIZE];
    filter.process(&[1.0; BLOCK_SIZE], None, None, &mut out);

    filter.params().clear();
    filter.process(&[0.0; BLOCK_SIZE], None, None, &mut out);
    assert!(out.iter().all(|x| *x == 0.0));

    filter.process(&[1.0; BLOCK_SIZE], None, None, &mut out);
    filter.clear();
    filter.process(&[0.0; BLOCK_SIZE], None, None, &mut out);
    assert!(out.iter().all(|x| *x == 0.0));
}

#[test]
fn disabled_leaves_output_untouched() {
    let mut filter = prepared(1000.0, 0.5);
    filter.params().set_disabled(true);

    let mut out = [7.0; BLOCK_SIZE];
    filter.process(&impulse(), None, None, &mut out);
    assert!(out.iter().all(|x| *x == 7.0));

    filter.params().set_disabled(false);
    filter.process(&impulse(), None, None, &mut out);
    assert!(out.iter().any(|x| *x != 7.0));
}

#[test]
fn unrolled_matches_scalar() {
    let mut unrolled = prepared(1200.0, 0.7);
    let mut scalar = Lores::new(1200.0, 0.7);
    scalar.prepare(&setup(2));
    assert_eq!(unrolled.kernel(), Some(LoresKernel::Unrolled));
    assert_eq!(scalar.kernel(), Some(LoresKernel::Scalar));

    let mut out_unrolled = [0.0; BLOCK_SIZE];
    let mut out_scalar = [0.0; BLOCK_SIZE];

    for n in 0..20 {
        let input = modulation::sine::<BLOCK_SIZE>(n * BLOCK_SIZE, 440.0 / SAMPLE_RATE);
        if n == 10 {
            unrolled.params().set_frequency(3000.0);
            scalar.params().set_frequency(3000.0);
        }
        unrolled.process(&input, None, None, &mut out_unrolled);
        scalar.process(&input, None, None, &mut out_scalar);
        assert_eq!(out_unrolled, out_scalar);
    }
}

#[test]
fn smoothing_converges_to_the_same_filter() {
    let mut smoothed = Lores::new(500.0, 0.3).with_smoothing(true);
    smoothed.prepare(&setup(BLOCK_SIZE));
    let mut plain = prepared(500.0, 0.3);
    assert_eq!(smoothed.kernel(), Some(LoresKernel::Smoothed));

    let input = [1.0; BLOCK_SIZE];
    let mut out_smoothed = [0.0; BLOCK_SIZE];
    let mut out_plain = [0.0; BLOCK_SIZE];

    // Without parameter changes there is nothing to ramp.
    for _ in 0..4 {
        smoothed.process(&input, None, None, &mut out_smoothed);
        plain.process(&input, None, None, &mut out_plain);
        assert_eq!(out_smoothed, out_plain);
    }

    smoothed.params().set_frequency(5000.0);
    plain.params().set_frequency(5000.0);
    smoothed.process(&input, None, None, &mut out_smoothed);
    plain.process(&input, None, None, &mut out_plain);
    assert_eq!(smoothed.coefficients(), plain.coefficients());

    for _ in 0..50 {
        smoothed.process(&input, None, None, &mut out_smoothed);
        plain.process(&input, None, None, &mut out_plain);
    }
    let last = BLOCK_SIZE - 1;
    assert!((out_smoothed[last] - 1.0).abs() < 1e-3);
    assert!((out_smoothed[last] - out_plain[last]).abs() < 1e-4);
}

#[test]
fn smoothing_ramps_on_parameter_change() {
    let mut smoothed = Lores::new(500.0, 0.3).with_smoothing(true);
    smoothed.prepare(&setup(BLOCK_SIZE));
    let mut plain = prepared(500.0, 0.3);

    let mut out_smoothed = [0.0; BLOCK_SIZE];
    let mut out_plain = [0.0; BLOCK_SIZE];

    for n in 0..4 {
        let input = modulation::sine::<BLOCK_SIZE>(n * BLOCK_SIZE, 440.0 / SAMPLE_RATE);
        smoothed.process(&input, None, None, &mut out_smoothed);
        plain.process(&input, None, None, &mut out_plain);
    }
    let before = smoothed.coefficients();
    assert_eq!(smoothed.previous_coefficients(), before);

    smoothed.params().set_frequency(5000.0);
    plain.params().set_frequency(5000.0);
    let input = modulation::sine::<BLOCK_SIZE>(4 * BLOCK_SIZE, 440.0 / SAMPLE_RATE);
    smoothed.process(&input, None, None, &mut out_smoothed);
    plain.process(&input, None, None, &mut out_plain);

    // The jump is spread over the block instead of applied at once.
    assert_ne!(out_smoothed, out_plain);
    assert_ne!(out_smoothed[0], out_plain[0]);

    // The next block ramps from where this one ended.
    assert_ne!(smoothed.coefficients(), before);
    assert_eq!(smoothed.previous_coefficients(), smoothed.coefficients());
}

#[test]
fn control_signals_use_first_sample_of_block() {
    let mut filter = Lores::new(100.0, 0.2);
    filter.prepare(&DspSetup::new(SAMPLE_RATE, BLOCK_SIZE));

    let mut frequency = [0.0; BLOCK_SIZE];
    frequency[0] = 2000.0;
    let resonance = [0.6; BLOCK_SIZE];
    let mut out = [0.0; BLOCK_SIZE];
    filter.process(&impulse(), Some(&frequency[..]), Some(&resonance[..]), &mut out);

    let reference = prepared(2000.0, 0.6);
    assert_eq!(filter.coefficients(), reference.coefficients());

    // Signals on unconnected inlets are ignored.
    let mut filter = prepared(100.0, 0.2);
    filter.process(&impulse(), Some(&frequency[..]), Some(&resonance[..]), &mut out);
    assert_eq!(filter.coefficients(), prepared(100.0, 0.2).coefficients());
}

#[test]
fn nan_and_denormals_reset_the_state() {
    let mut filter = prepared(1000.0, 0.5);
    let mut out = [0.0; BLOCK_SIZE];

    let mut input = [0.5; BLOCK_SIZE];
    input[5] = f32::NAN;
    filter.process(&input, None, None, &mut out);
    assert_eq!(out[5], 0.0);
    assert!(out.iter().all(|x| x.is_finite()));

    filter.clear();
    filter.process(&[1.0e-39; BLOCK_SIZE], None, None, &mut out);
    assert!(out.iter().all(|x| *x == 0.0));
}

#[test]
fn resonance_sweep() {
    let duration = 2.0;
    let mut filter = prepared(400.0, 0.0);
    let params = filter.params();
    let mut input = [0.0; BLOCK_SIZE];
    let mut out = [0.0; BLOCK_SIZE];
    let mut wav_data = Vec::new();
    let mut phase = 0.0;

    let blocks = (duration * SAMPLE_RATE / (BLOCK_SIZE as f32)) as usize;

    for n in 0..blocks {
        phase = modulation::saw(phase, 110.0 / SAMPLE_RATE, &mut input);
        let modulation = modulation::ramp_up(n, blocks);
        params.set_frequency(200.0 + 4000.0 * modulation);
        params.set_resonance(modulation);
        filter.perform(&[&input[..]], &mut [&mut out[..]]);
        assert!(out.iter().all(|x| x.is_finite()));
        wav_data.extend_from_slice(&out);
    }

    wav_writer::write("filter/lores.wav", &wav_data, SAMPLE_RATE).ok();
}
