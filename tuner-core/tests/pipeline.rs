use approx::assert_abs_diff_eq;
use tuner_core::catalog::{self, tuning_by_id};
use tuner_core::notes::cents_between;
use tuner_core::smoothing::SmootherOptions;
use tuner_core::{AudioFrame, AudioSource, Framer, TunerConfig, TunerPipeline, TuningQuality};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Deterministic noise in `[-1, 1)`.
struct Lcg(u32);

impl Lcg {
    fn next(&mut self) -> f32 {
        self.0 = self.0.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
        (self.0 >> 8) as f32 / (1u32 << 24) as f32 * 2.0 - 1.0
    }
}

/// A decaying string with a few harmonics and a little background noise.
fn pluck(freq_hz: f64, sample_rate: u32, seconds: f64, noise: &mut Lcg) -> Vec<f32> {
    let n = (seconds * f64::from(sample_rate)) as usize;
    (0..n)
        .map(|i| {
            let t = i as f64 / f64::from(sample_rate);
            let envelope = (-t / 1.5).exp();
            let tone: f64 = [(1.0, 1.0), (2.0, 0.5), (3.0, 0.25)]
                .iter()
                .map(|&(h, a)| a * (2.0 * std::f64::consts::PI * freq_hz * h * t).sin())
                .sum();
            (0.3 * envelope * tone) as f32 + 0.005 * noise.next()
        })
        .collect()
}

fn frame(samples: &[f32], sample_rate_hz: u32, timestamp_ms: u64, source: AudioSource) -> AudioFrame {
    AudioFrame {
        samples: samples.to_vec(),
        sample_rate_hz,
        timestamp_ms,
        source,
    }
}

#[test]
fn bridge_pluck_settles_then_fades_out() {
    init_logging();
    let rate = 16_000;
    let mut noise = Lcg(3);
    let config = TunerConfig::default();
    let mut pipeline = TunerPipeline::new(config, tuning_by_id("gtr_standard").unwrap().clone()).unwrap();
    let mut framer = Framer::new(config.frame.frame_size, config.frame.hop, rate, AudioSource::BridgePcm);

    // A2 two cents sharp, then silence, delivered in small capture chunks.
    let mut audio = pluck(110.0 * 2f64.powf(2.0 / 1200.0), rate, 2.0, &mut noise);
    audio.extend(std::iter::repeat_n(0.0, rate as usize * 2));

    let mut readings = Vec::new();
    for (i, chunk) in audio.chunks(256).enumerate() {
        for frame in framer.push(chunk, i as u64 * 16) {
            readings.push(pipeline.process(&frame));
        }
    }

    let confirmed: Vec<_> = readings
        .iter()
        .flatten()
        .filter(|r| r.quality == TuningQuality::Good)
        .collect();
    assert!(confirmed.len() > 10, "only {} confirmed readings", confirmed.len());
    for r in &confirmed {
        assert_eq!(r.target_string, "A2");
        assert_eq!(r.detected_note, "A2");
        assert_eq!(r.source, AudioSource::BridgePcm);
    }
    // Frames overlapping the end of the note are slightly biased; the
    // sustained part must sit on the true deviation.
    let accurate = confirmed
        .iter()
        .filter(|r| r.in_tune && r.cents > 1.0 && r.cents < 3.0)
        .count();
    assert!(accurate * 10 >= confirmed.len() * 8, "{accurate} of {} accurate", confirmed.len());

    assert!(pipeline.tracker().is_settled("A2"));
    assert_eq!(readings.last(), Some(&None));
    assert_eq!(pipeline.tracker().active_string(), None);
}

#[test]
fn string_change_is_followed_once_the_median_turns() {
    init_logging();
    let rate = 48_000;
    let mut noise = Lcg(11);
    let mut pipeline =
        TunerPipeline::new(TunerConfig::default(), tuning_by_id("gtr_standard").unwrap().clone()).unwrap();

    let e2 = pluck(82.4069, rate, 0.064, &mut noise);
    let d3 = pluck(146.8324, rate, 0.064, &mut noise);

    let mut ts = 0;
    for _ in 0..4 {
        let r = pipeline.process(&frame(&e2, rate, ts, AudioSource::WebMic)).unwrap();
        assert_eq!(r.target_string, "E2");
        ts += 64;
    }

    // A three-sample median needs two new frames before it moves, and the
    // attack step then lands part way between the strings.
    let targets: Vec<String> = (0..3)
        .map(|_| {
            let r = pipeline.process(&frame(&d3, rate, ts, AudioSource::WebMic)).unwrap();
            ts += 64;
            r.target_string
        })
        .collect();
    assert_eq!(targets[0], "E2");
    assert_ne!(targets[1], "D3");
    assert_eq!(targets[2], "D3");
}

#[test]
fn single_sample_median_shortens_string_change() {
    init_logging();
    let rate = 48_000;
    let mut noise = Lcg(13);
    let mut config = TunerConfig::default();
    config.smoother = SmootherOptions {
        median_window: 1,
        ..config.smoother
    };
    let mut pipeline = TunerPipeline::new(config, tuning_by_id("gtr_standard").unwrap().clone()).unwrap();

    let e2 = pluck(82.4069, rate, 0.064, &mut noise);
    let d3 = pluck(146.8324, rate, 0.064, &mut noise);
    for ts in [0, 64] {
        assert_eq!(pipeline.process(&frame(&e2, rate, ts, AudioSource::WebMic)).unwrap().target_string, "E2");
    }
    // One attack step covers 78% of the jump; a second one settles on D3.
    pipeline.process(&frame(&d3, rate, 128, AudioSource::WebMic)).unwrap();
    let r = pipeline.process(&frame(&d3, rate, 192, AudioSource::WebMic)).unwrap();
    assert_eq!(r.target_string, "D3");
}

#[test]
fn every_open_string_reads_in_tune() {
    init_logging();
    for (rate, source) in [(16_000, AudioSource::BridgePcm), (48_000, AudioSource::WebMic)] {
        for tuning in catalog::catalog() {
            for string in &tuning.strings {
                let mut noise = Lcg(5);
                let mut pipeline = TunerPipeline::new(TunerConfig::default(), tuning.clone()).unwrap();
                let samples = pluck(string.frequency_hz, rate, 3072.0 / f64::from(rate), &mut noise);

                let mut last = None;
                for i in 0..3 {
                    last = pipeline.process(&frame(&samples, rate, i * 50, source));
                }
                let reading = last.unwrap_or_else(|| panic!("{} {} at {rate} Hz: no reading", tuning.id, string.label));

                // Octave-equal strings resolve to the first one listed, so
                // compare against the matched reference pitch.
                let reference = reading.target_frequency_hz * reading.harmonic;
                assert!(
                    cents_between(string.frequency_hz, reference).abs() < 0.01,
                    "{} {} matched {} x{}",
                    tuning.id,
                    string.label,
                    reading.target_string,
                    reading.harmonic
                );
                assert!(reading.in_tune, "{} {} at {rate} Hz: {} cents", tuning.id, string.label, reading.cents);
                assert!(pipeline.tracker().is_settled(&reading.target_string));
            }
        }
    }
}

#[test]
fn octave_tie_resolves_to_earlier_string() {
    let drop_d = tuning_by_id("gtr_drop_d").unwrap();
    let m = tuner_core::target::select_target_string(146.8324, drop_d).unwrap();
    assert_eq!(m.string_label, "D2");
    assert_eq!(m.harmonic, 2.0);
    assert_abs_diff_eq!(m.cents, 0.0, epsilon = 1e-9);
}
