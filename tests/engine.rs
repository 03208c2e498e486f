use std::{f32::consts::TAU, sync::Arc};

use nih_plug::util::{db_to_gain, gain_to_db};
use tribus::{Band, MultibandEngine, MultibandParams};

const SR: f32 = 48000.0;
const BLOCK: usize = 512;

fn engine(num_channels: usize) -> (Arc<MultibandParams>, MultibandEngine) {
    let params = Arc::new(MultibandParams::default());
    let mut engine = MultibandEngine::new(params.clone());
    engine.prepare(SR, BLOCK, num_channels).unwrap();
    (params, engine)
}

fn sine(amplitude: f32, freq: f32, len: usize) -> Vec<f32> {
    (0..len)
        .map(|i| amplitude * (TAU * freq * i as f32 / SR).sin())
        .collect()
}

/// Run a mono signal through the engine block by block, returning the output
fn run_mono(engine: &mut MultibandEngine, input: &[f32]) -> Vec<f32> {
    let mut output = input.to_vec();
    for chunk in output.chunks_mut(BLOCK) {
        let mut block: [&mut [f32]; 1] = [chunk];
        engine.process(&mut block);
    }
    output
}

fn rms(samples: &[f32]) -> f32 {
    (samples.iter().map(|x| x * x).sum::<f32>() / samples.len() as f32).sqrt()
}

fn bypass_all(params: &MultibandParams) {
    for band in Band::ALL {
        params.band(band).set_bypass(true);
    }
}

/// Second-order allpass from the RBJ cookbook with Q = 1/sqrt(2). Has the same phase response as a
/// Linkwitz-Riley split at `freq`.
struct Allpass {
    b0: f64,
    b1: f64,
    a1: f64,
    a2: f64,
    x1: f64,
    x2: f64,
    y1: f64,
    y2: f64,
}

impl Allpass {
    fn new(freq: f32) -> Self {
        let w0 = std::f64::consts::TAU * freq as f64 / SR as f64;
        let cos = w0.cos();
        let alpha = w0.sin() / (2.0 * std::f64::consts::FRAC_1_SQRT_2);
        let a0 = 1.0 + alpha;
        Self {
            b0: (1.0 - alpha) / a0,
            b1: -2.0 * cos / a0,
            a1: -2.0 * cos / a0,
            a2: (1.0 - alpha) / a0,
            x1: 0.0,
            x2: 0.0,
            y1: 0.0,
            y2: 0.0,
        }
    }

    fn process(&mut self, x: f64) -> f64 {
        // b2 is always 1 for this allpass
        let y = self.b0 * x + self.b1 * self.x1 + self.x2 - self.a1 * self.y1 - self.a2 * self.y2;
        self.x2 = self.x1;
        self.x1 = x;
        self.y2 = self.y1;
        self.y1 = y;
        y
    }
}

fn noise(len: usize, seed: u32) -> Vec<f32> {
    let mut state = seed;
    (0..len)
        .map(|_| {
            state = state.wrapping_mul(1664525).wrapping_add(1013904223);
            (state >> 8) as f32 / (1 << 24) as f32 - 0.5
        })
        .collect()
}

#[test]
fn bypassed_engine_matches_allpassed_input() {
    for (f1, f2) in [(500.0, 2000.0), (20.0, 1000.0), (999.0, 20000.0), (150.0, 6000.0)] {
        let (params, mut engine) = engine(1);
        bypass_all(&params);
        params.set_low_mid_crossover_hz(f1);
        params.set_mid_high_crossover_hz(f2);

        let input = noise(8 * BLOCK + 100, 7);
        let output = run_mono(&mut engine, &input);

        let mut ap1 = Allpass::new(f1);
        let mut ap2 = Allpass::new(f2);
        for (idx, (x, y)) in input.iter().zip(output.iter()).enumerate() {
            let expected = ap2.process(ap1.process(*x as f64)) as f32;
            assert!(
                (y - expected).abs() <= 1e-4,
                "{f1}/{f2} Hz, sample {idx}: expected {expected}, got {y}"
            );
        }
    }
}

#[test]
fn bypassed_bands_sum_flat() {
    for freq in [50.0, 400.0, 1000.0, 2000.0, 5000.0, 15000.0] {
        let (params, mut engine) = engine(1);
        bypass_all(&params);

        let input = sine(0.5, freq, SR as usize / 2);
        let output = run_mono(&mut engine, &input);

        let tail = input.len() - 4800;
        let diff_db = gain_to_db(rms(&output[tail..])) - gain_to_db(rms(&input[tail..]));
        assert!(diff_db.abs() < 0.1, "{freq} Hz is off by {diff_db} dB");
    }
}

#[test]
fn quiet_signal_is_untouched_by_the_compressors() {
    let input = sine(0.1, 700.0, 9600);

    let (params, mut bypassed) = engine(1);
    bypass_all(&params);
    let reference = run_mono(&mut bypassed, &input);

    // default threshold is 0 dB, far above a -20 dB sine
    let (_, mut active) = engine(1);
    let output = run_mono(&mut active, &input);

    assert_eq!(output, reference);
    for band in Band::ALL {
        assert_eq!(active.gain_reduction_db(band), 0.0);
    }
}

#[test]
fn steady_low_band_follows_ratio_law() {
    let (params, mut engine) = engine(1);
    let low = params.band(Band::Low);
    low.set_threshold_db(-20.0);
    low.set_ratio(4.0);
    low.set_attack_ms(5.0);

    // DC ends up entirely in the low band once the high-passes have settled
    let level = 0.5;
    let output = run_mono(&mut engine, &vec![level; SR as usize]);

    let expected_db = -20.0 + (gain_to_db(level) + 20.0) / 4.0;
    let out_db = gain_to_db(*output.last().unwrap());
    assert!(
        (out_db - expected_db).abs() < 0.05,
        "expected {expected_db} dB, got {out_db} dB"
    );
    assert!(engine.gain_reduction_db(Band::Low) > 10.0);
    assert_eq!(engine.gain_reduction_db(Band::High), 0.0);
}

#[test]
fn soloed_band_rejects_other_ranges() {
    let (params, mut engine) = engine(1);
    params.band(Band::Mid).set_solo(true);
    // mute is ignored while something is soloed
    params.band(Band::Mid).set_mute(true);

    let input = sine(0.5, 100.0, SR as usize / 2);
    let output = run_mono(&mut engine, &input);

    let tail = input.len() - 4800;
    assert!(rms(&output[tail..]) < 0.02 * rms(&input[tail..]));
}

#[test]
fn soloed_band_passes_its_own_range() {
    let (params, mut engine) = engine(1);
    params.band(Band::Mid).set_solo(true);

    let input = sine(0.5, 1000.0, SR as usize / 2);
    let output = run_mono(&mut engine, &input);

    let tail = input.len() - 4800;
    let diff_db = gain_to_db(rms(&output[tail..])) - gain_to_db(rms(&input[tail..]));
    assert!(diff_db.abs() < 1.5, "mid band lost {diff_db} dB at 1 kHz");
}

#[test]
fn muting_every_band_gives_silence() {
    let (params, mut engine) = engine(2);
    for band in Band::ALL {
        params.band(band).set_mute(true);
    }

    let mut left = sine(0.8, 300.0, BLOCK);
    let mut right = sine(0.8, 3000.0, BLOCK);
    let mut block: [&mut [f32]; 2] = [&mut left, &mut right];
    engine.process(&mut block);

    assert!(left.iter().chain(right.iter()).all(|&x| x == 0.0));
}

#[test]
fn output_gain_changes_without_clicks() {
    let (params, mut engine) = engine(1);
    bypass_all(&params);

    // let the filters settle on DC first
    run_mono(&mut engine, &vec![0.5; SR as usize]);

    let mut output = Vec::new();
    for idx in 0..20 {
        params.set_gain_out_db(if idx % 2 == 0 { -24.0 } else { 24.0 });
        output.extend(run_mono(&mut engine, &[0.5; BLOCK]));
    }

    let max_step = output
        .windows(2)
        .map(|pair| (pair[1] - pair[0]).abs())
        .fold(0.0, f32::max);
    // a 48 dB jump in one sample would be a step of several units
    assert!(max_step < 0.01, "largest step between samples is {max_step}");
}

#[test]
fn input_gain_scales_the_signal() {
    let (params, mut engine) = engine(1);
    bypass_all(&params);
    params.set_gain_in_db(-6.0);

    let output = run_mono(&mut engine, &vec![0.5; SR as usize]);
    let expected = 0.5 * db_to_gain(-6.0);
    assert!((output.last().unwrap() - expected).abs() < 1e-3);
}

#[test]
fn crossovers_are_clamped_into_order() {
    let (params, mut engine) = engine(1);
    params.set_low_mid_crossover_hz(5000.0);
    params.set_mid_high_crossover_hz(100.0);

    assert!(params.low_mid_crossover_hz() < params.mid_high_crossover_hz());

    let output = run_mono(&mut engine, &sine(0.5, 990.0, 4 * BLOCK));
    assert!(output.iter().all(|x| x.is_finite()));
}

#[test]
fn channels_do_not_leak_into_each_other() {
    let (params, mut engine) = engine(2);
    params.band(Band::Mid).set_threshold_db(-30.0);

    let mut left = vec![0.0; BLOCK];
    let mut right = sine(0.9, 1000.0, BLOCK);
    let mut block: [&mut [f32]; 2] = [&mut left, &mut right];
    engine.process(&mut block);

    assert!(left.iter().all(|&x| x == 0.0));
    assert!(right.iter().any(|&x| x != 0.0));
}

#[test]
fn reset_clears_history() {
    let (_, mut engine) = engine(1);
    run_mono(&mut engine, &sine(0.9, 200.0, BLOCK));
    engine.reset();

    let output = run_mono(&mut engine, &[0.0; BLOCK]);
    assert!(output.iter().all(|&x| x == 0.0));
}

#[test]
fn parameters_change_while_processing() {
    let (params, mut engine) = engine(2);
    let input = sine(0.9, 440.0, BLOCK);

    std::thread::scope(|s| {
        let writer = params.clone();
        s.spawn(move || {
            for idx in 0..2000 {
                let x = idx as f32;
                writer.set_gain_in_db((x * 0.37).sin() * 24.0);
                writer.set_low_mid_crossover_hz(20.0 + (x * 7.0) % 979.0);
                writer.set_mid_high_crossover_hz(1000.0 + (x * 131.0) % 19000.0);
                let band = writer.band(Band::ALL[idx % 3]);
                band.set_threshold_db(-60.0 + (x * 3.0) % 72.0);
                band.set_ratio_index(idx % 14);
                band.set_attack_ms(5.0 + (x * 11.0) % 495.0);
                band.set_solo(idx % 7 == 0);
                band.set_mute(idx % 5 == 0);
            }
        });

        for _ in 0..200 {
            let mut left = input.clone();
            let mut right = input.clone();
            let mut block: [&mut [f32]; 2] = [&mut left, &mut right];
            engine.process(&mut block);
            assert!(left.iter().chain(right.iter()).all(|x| x.is_finite()));
        }
    });
}
