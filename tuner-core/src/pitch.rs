//! # Pitch Detection Module
//!
//! This module implements the YIN pitch detection algorithm tuned for plucked
//! strings on noisy, low sample rate microphones.
//!
//! ## Features
//! - Cumulative mean normalized difference function (CMNDF)
//! - First-dip search that descends to the trough to prevent octave errors
//! - Global-minimum fallback with an aperiodicity ceiling to reject noise
//! - Parabolic interpolation for sub-sample accuracy
//! - Absolute silence floor

use serde::{Deserialize, Serialize};

/// Frames below this RMS are treated as silence.
pub const SILENCE_RMS: f64 = 1e-4;

/// Shortest frame the estimator will look at.
pub const MIN_FRAME_LEN: usize = 32;

/// Largest CMNDF value the fallback search still accepts as periodic.
const FALLBACK_CEILING: f64 = 0.25;

/// One frame's pitch estimate, raw or smoothed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PitchDetection {
    /// Fundamental frequency in Hz, always positive and finite.
    pub frequency_hz: f64,
    /// Periodicity of the frame in `[0, 1]`; 1 means perfectly periodic.
    pub confidence: f64,
    /// Loudness of the frame.
    pub rms: f64,
}

/// Search range and decision threshold for [`detect_pitch_yin`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct YinOptions {
    pub min_freq_hz: f64,
    pub max_freq_hz: f64,
    /// CMNDF value a dip has to fall below to be taken as the period.
    pub threshold: f64,
}

impl Default for YinOptions {
    fn default() -> Self {
        Self {
            min_freq_hz: 35.0,
            max_freq_hz: 500.0,
            threshold: 0.1,
        }
    }
}

/// Root mean square of a frame, 0 for an empty one.
pub fn compute_rms(samples: &[f32]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: f64 = samples.iter().map(|&s| f64::from(s) * f64::from(s)).sum();
    (sum / samples.len() as f64).sqrt()
}

/// Estimates the fundamental frequency of one frame with the YIN algorithm.
///
/// # Arguments
/// * `samples` - Mono frame, at least [`MIN_FRAME_LEN`] samples
/// * `sample_rate_hz` - Sample rate of the frame
/// * `options` - Frequency range and YIN threshold
///
/// # Returns
/// * `Some(detection)` - Frequency, confidence and RMS of the frame
/// * `None` - Silence, aperiodic noise, an unusable frame, or an empty search range
pub fn detect_pitch_yin(
    samples: &[f32],
    sample_rate_hz: u32,
    options: &YinOptions,
) -> Option<PitchDetection> {
    let size = samples.len();
    if size < MIN_FRAME_LEN || sample_rate_hz == 0 {
        return None;
    }

    // --- Silence gate ---
    let rms = compute_rms(samples);
    if rms < SILENCE_RMS {
        return None;
    }

    // --- Step 1: Lag search range ---
    let (tau_min, tau_max) = lag_range(size, f64::from(sample_rate_hz), options)?;

    // --- Step 2: Squared difference function ---
    let mut cmndf = vec![0.0_f64; tau_max + 1];
    for tau in 1..=tau_max {
        cmndf[tau] = samples[..size - tau]
            .iter()
            .zip(&samples[tau..])
            .map(|(&a, &b)| {
                let delta = f64::from(a) - f64::from(b);
                delta * delta
            })
            .sum();
    }

    // --- Step 3: Cumulative mean normalized difference, in place ---
    cmndf[0] = 1.0;
    let mut running_sum = 0.0;
    for tau in 1..=tau_max {
        running_sum += cmndf[tau];
        cmndf[tau] = if running_sum == 0.0 {
            1.0
        } else {
            cmndf[tau] * tau as f64 / running_sum
        };
    }

    // --- Step 4 & 5: Absolute threshold, falling back to the global minimum ---
    let best_tau = pick_lag(&cmndf, tau_min, tau_max, options.threshold)?;

    // --- Step 6: Parabolic interpolation for better precision ---
    let mut refined_tau = best_tau as f64;
    if best_tau > 1 && best_tau < tau_max {
        let x0 = cmndf[best_tau - 1];
        let x1 = cmndf[best_tau];
        let x2 = cmndf[best_tau + 1];
        let denominator = x0 + x2 - 2.0 * x1;
        if denominator.abs() > 1e-9 {
            refined_tau += (x0 - x2) / (2.0 * denominator);
        }
    }

    // --- Step 7: Convert to frequency ---
    if refined_tau <= 0.0 {
        return None;
    }
    let frequency_hz = f64::from(sample_rate_hz) / refined_tau;
    if !frequency_hz.is_finite() {
        return None;
    }

    Some(PitchDetection {
        frequency_hz,
        confidence: (1.0 - cmndf[best_tau]).clamp(0.0, 1.0),
        rms,
    })
}

/// Lag bounds in samples for the configured frequency range, or `None` when
/// the range is unusable for this frame.
fn lag_range(size: usize, sample_rate: f64, options: &YinOptions) -> Option<(usize, usize)> {
    let (min_f, max_f) = (options.min_freq_hz, options.max_freq_hz);
    if !(min_f > 0.0 && max_f > 0.0 && min_f.is_finite() && max_f.is_finite()) {
        return None;
    }

    let tau_min = ((sample_rate / max_f).floor() as usize).max(2);
    let tau_max = ((sample_rate / min_f).floor() as usize).min((size / 2).saturating_sub(1));
    if tau_max <= tau_min {
        return None;
    }
    Some((tau_min, tau_max))
}

/// The lag YIN settles on: the first dip under `threshold`, else the global
/// minimum as long as it stays under `FALLBACK_CEILING`.
fn pick_lag(cmndf: &[f64], tau_min: usize, tau_max: usize, threshold: f64) -> Option<usize> {
    if let Some(tau) = first_dip(cmndf, tau_min, tau_max, threshold) {
        return Some(tau);
    }
    let (tau, value) = global_minimum(cmndf, tau_min, tau_max);
    (value <= FALLBACK_CEILING).then_some(tau)
}

/// First lag below `threshold`, followed down to the bottom of its dip so the
/// leading edge of the dip is never mistaken for the period.
fn first_dip(cmndf: &[f64], tau_min: usize, tau_max: usize, threshold: f64) -> Option<usize> {
    let mut tau = (tau_min..=tau_max).find(|&tau| cmndf[tau] < threshold)?;
    while tau < tau_max && cmndf[tau + 1] < cmndf[tau] {
        tau += 1;
    }
    Some(tau)
}

/// Lowest CMNDF value in the range; the earliest lag wins ties.
fn global_minimum(cmndf: &[f64], tau_min: usize, tau_max: usize) -> (usize, f64) {
    let mut best = (tau_min, cmndf[tau_min]);
    for tau in tau_min + 1..=tau_max {
        if cmndf[tau] < best.1 {
            best = (tau, cmndf[tau]);
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine_wave(freq_hz: f64, sample_rate: u32, size: usize) -> Vec<f32> {
        (0..size)
            .map(|i| (2.0 * std::f64::consts::PI * freq_hz * i as f64 / f64::from(sample_rate)).sin() as f32)
            .collect()
    }

    /// Deterministic white noise from a linear congruential generator.
    fn noise(size: usize, seed: u32) -> Vec<f32> {
        let mut state = seed;
        (0..size)
            .map(|_| {
                state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
                (state >> 8) as f32 / (1u32 << 24) as f32 * 2.0 - 1.0
            })
            .collect()
    }

    fn assert_detects(freq_hz: f64, sample_rate: u32) {
        let frame = sine_wave(freq_hz, sample_rate, 4096);
        let result = detect_pitch_yin(&frame, sample_rate, &YinOptions::default())
            .unwrap_or_else(|| panic!("no pitch for {freq_hz} Hz at {sample_rate} Hz"));
        assert!(
            (result.frequency_hz - freq_hz).abs() < 1.5,
            "expected {freq_hz}, got {}",
            result.frequency_hz
        );
        assert!(result.confidence > 0.7, "confidence {}", result.confidence);
    }

    #[test]
    fn detects_bass_e1() {
        assert_detects(41.2034, 16_000);
    }

    #[test]
    fn detects_guitar_a2() {
        assert_detects(110.0, 16_000);
    }

    #[test]
    fn detects_ukulele_a4() {
        assert_detects(440.0, 16_000);
    }

    #[test]
    fn detects_at_native_rate() {
        assert_detects(82.4069, 44_100);
        assert_detects(329.6276, 48_000);
    }

    #[test]
    fn a2_is_within_one_hertz() {
        let frame = sine_wave(110.0, 16_000, 4096);
        let result = detect_pitch_yin(&frame, 16_000, &YinOptions::default()).unwrap();
        assert!((result.frequency_hz - 110.0).abs() < 1.0);
        assert!((result.rms - std::f64::consts::FRAC_1_SQRT_2).abs() < 0.01);
    }

    #[test]
    fn silence_is_none() {
        let frame = vec![0.0_f32; 4096];
        assert_eq!(detect_pitch_yin(&frame, 16_000, &YinOptions::default()), None);
    }

    #[test]
    fn below_silence_floor_is_none() {
        let frame: Vec<f32> = sine_wave(110.0, 16_000, 4096).iter().map(|s| s * 1e-5).collect();
        assert_eq!(detect_pitch_yin(&frame, 16_000, &YinOptions::default()), None);
    }

    #[test]
    fn unusable_frames_are_none() {
        let short = sine_wave(440.0, 16_000, 31);
        assert_eq!(detect_pitch_yin(&short, 16_000, &YinOptions::default()), None);

        let frame = sine_wave(110.0, 16_000, 4096);
        assert_eq!(detect_pitch_yin(&frame, 0, &YinOptions::default()), None);
    }

    #[test]
    fn inverted_or_degenerate_range_is_none() {
        let frame = sine_wave(110.0, 16_000, 4096);
        let inverted = YinOptions {
            min_freq_hz: 500.0,
            max_freq_hz: 35.0,
            ..YinOptions::default()
        };
        assert_eq!(detect_pitch_yin(&frame, 16_000, &inverted), None);

        let zero = YinOptions {
            min_freq_hz: 0.0,
            ..YinOptions::default()
        };
        assert_eq!(detect_pitch_yin(&frame, 16_000, &zero), None);

        let nan = YinOptions {
            max_freq_hz: f64::NAN,
            ..YinOptions::default()
        };
        assert_eq!(detect_pitch_yin(&frame, 16_000, &nan), None);
    }

    #[test]
    fn frame_too_short_for_lowest_frequency_is_clipped() {
        // 256 samples at 16 kHz cannot hold a 35 Hz period, but 440 Hz fits.
        let frame = sine_wave(440.0, 16_000, 256);
        let result = detect_pitch_yin(&frame, 16_000, &YinOptions::default()).unwrap();
        assert!((result.frequency_hz - 440.0).abs() < 3.0);
    }

    #[test]
    fn white_noise_is_rejected() {
        for seed in [1, 7, 42] {
            let frame = noise(4096, seed);
            assert_eq!(detect_pitch_yin(&frame, 16_000, &YinOptions::default()), None, "seed {seed}");
        }
    }

    #[test]
    fn strong_octave_overtone_reports_fundamental() {
        let fundamental = sine_wave(110.0, 16_000, 4096);
        let octave = sine_wave(220.0, 16_000, 4096);
        let frame: Vec<f32> = fundamental
            .iter()
            .zip(&octave)
            .map(|(a, b)| 0.4 * a + 0.6 * b)
            .collect();
        let result = detect_pitch_yin(&frame, 16_000, &YinOptions::default()).unwrap();
        assert!((result.frequency_hz - 110.0).abs() < 1.5, "got {}", result.frequency_hz);
    }

    #[test]
    fn rms_of_empty_frame_is_zero() {
        assert_eq!(compute_rms(&[]), 0.0);
        assert!((compute_rms(&[0.5, -0.5, 0.5, -0.5]) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn dip_is_followed_to_its_bottom() {
        let cmndf = [1.0, 1.0, 0.9, 0.5, 0.09, 0.05, 0.02, 0.04, 0.3, 0.6];
        assert_eq!(first_dip(&cmndf, 2, 9, 0.1), Some(6));
        assert_eq!(pick_lag(&cmndf, 2, 9, 0.1), Some(6));
    }

    #[test]
    fn flat_dip_bottom_keeps_earliest_lag() {
        let cmndf = [1.0, 1.0, 0.8, 0.05, 0.05, 0.3];
        assert_eq!(first_dip(&cmndf, 2, 5, 0.1), Some(3));
    }

    #[test]
    fn global_minimum_ties_take_earliest_lag() {
        let cmndf = [1.0, 1.0, 0.7, 0.2, 0.5, 0.4, 0.2, 0.9];
        assert_eq!(global_minimum(&cmndf, 2, 7), (3, 0.2));
    }

    #[test]
    fn fallback_accepts_minimum_under_ceiling() {
        let cmndf = [1.0, 1.0, 0.8, 0.6, 0.3, 0.2, 0.35, 0.7];
        assert_eq!(first_dip(&cmndf, 2, 7, 0.1), None);
        assert_eq!(pick_lag(&cmndf, 2, 7, 0.1), Some(5));
    }

    #[test]
    fn fallback_rejects_minimum_over_ceiling() {
        let cmndf = [1.0, 1.0, 0.8, 0.6, 0.3, 0.26, 0.35, 0.7];
        assert_eq!(pick_lag(&cmndf, 2, 7, 0.1), None);
    }

    #[test]
    fn tone_with_stray_partial_is_found_through_fallback() {
        // A partial at 2.5 x 110 Hz keeps the dip near 0.045, above the
        // threshold but under the fallback ceiling. The range stops short of
        // the second period, where the partial would line up again.
        let tone = sine_wave(110.0, 16_000, 4096);
        let stray = sine_wave(275.0, 16_000, 4096);
        let frame: Vec<f32> = tone.iter().zip(&stray).map(|(t, p)| t + 0.15 * p).collect();
        let options = YinOptions {
            min_freq_hz: 80.0,
            max_freq_hz: 500.0,
            threshold: 0.01,
        };
        let result = detect_pitch_yin(&frame, 16_000, &options).unwrap();
        assert!((result.frequency_hz - 110.0).abs() < 1.5, "got {}", result.frequency_hz);
        assert!(
            result.confidence > 1.0 - FALLBACK_CEILING && result.confidence < 0.99,
            "confidence {}",
            result.confidence
        );
    }
}
