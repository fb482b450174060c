//! # Pitch Smoothing Module
//!
//! Turns the gated, possibly missing per-frame estimates into a stable
//! frequency. A short median window removes single-frame outliers and a
//! two-speed exponential moving average follows it: the attack coefficient
//! applies to jumps (a different string was plucked), the release
//! coefficient to small drift on a sustained note.
//!
//! Gaps in the signal are bridged with "ghost" readings (the held frequency
//! with zero confidence and RMS) until they last longer than `stale_ms`.

use crate::pitch::PitchDetection;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Tuning parameters for [`PitchSmoother`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmootherOptions {
    /// Number of recent raw frequencies the median is taken over.
    pub median_window: usize,
    /// EMA coefficient for jumps of at least `fast_change_hz`.
    pub attack_alpha: f64,
    /// EMA coefficient for smaller changes.
    pub release_alpha: f64,
    pub fast_change_hz: f64,
    /// How long a held pitch survives without a fresh detection.
    pub stale_ms: u64,
}

impl Default for SmootherOptions {
    fn default() -> Self {
        Self {
            median_window: 3,
            attack_alpha: 0.78,
            release_alpha: 0.42,
            fast_change_hz: 1.5,
            stale_ms: 400,
        }
    }
}

impl SmootherOptions {
    /// Single-coefficient mode: the same `alpha` for attack and release.
    pub fn with_alpha(self, alpha: f64) -> Self {
        Self {
            attack_alpha: alpha,
            release_alpha: alpha,
            ..self
        }
    }
}

/// Per-session smoothing state. Construct a fresh one for every session.
#[derive(Debug, Clone)]
pub struct PitchSmoother {
    options: SmootherOptions,
    history: VecDeque<f64>,
    ema_hz: Option<f64>,
    last_seen_ms: u64,
}

impl PitchSmoother {
    pub fn new(options: SmootherOptions) -> Self {
        let options = SmootherOptions {
            median_window: options.median_window.max(1),
            ..options
        };
        Self {
            history: VecDeque::with_capacity(options.median_window),
            options,
            ema_hz: None,
            last_seen_ms: 0,
        }
    }

    pub fn options(&self) -> &SmootherOptions {
        &self.options
    }

    /// Whether a frequency is currently held.
    pub fn is_tracking(&self) -> bool {
        self.ema_hz.is_some()
    }

    /// Forgets the history and the held frequency.
    pub fn reset(&mut self) {
        self.history.clear();
        self.ema_hz = None;
        self.last_seen_ms = 0;
    }

    /// Feeds one gated estimate (or its absence) captured at `timestamp_ms`.
    ///
    /// Confidence and RMS of a real input pass through unsmoothed. Without an
    /// input, the held frequency is returned with zero confidence and RMS
    /// until it goes stale.
    pub fn next(&mut self, input: Option<PitchDetection>, timestamp_ms: u64) -> Option<PitchDetection> {
        let Some(input) = input else {
            return self.hold(timestamp_ms);
        };

        if self.history.len() == self.options.median_window {
            self.history.pop_front();
        }
        self.history.push_back(input.frequency_hz);
        let median = median(&self.history);

        let ema = match self.ema_hz {
            None => median,
            Some(ema) => {
                let alpha = if (median - ema).abs() >= self.options.fast_change_hz {
                    self.options.attack_alpha
                } else {
                    self.options.release_alpha
                };
                alpha * median + (1.0 - alpha) * ema
            }
        };
        self.ema_hz = Some(ema);
        self.last_seen_ms = timestamp_ms;

        Some(PitchDetection {
            frequency_hz: ema,
            confidence: input.confidence,
            rms: input.rms,
        })
    }

    fn hold(&mut self, timestamp_ms: u64) -> Option<PitchDetection> {
        let ema = self.ema_hz?;

        if timestamp_ms.saturating_sub(self.last_seen_ms) > self.options.stale_ms {
            log::debug!(
                "pitch {:.2} Hz went stale after {} ms without signal",
                ema,
                timestamp_ms.saturating_sub(self.last_seen_ms)
            );
            self.reset();
            return None;
        }

        Some(PitchDetection {
            frequency_hz: ema,
            confidence: 0.0,
            rms: 0.0,
        })
    }
}

impl Default for PitchSmoother {
    fn default() -> Self {
        Self::new(SmootherOptions::default())
    }
}

/// Median of the window; the mean of the two central values for an even count.
fn median(values: &VecDeque<f64>) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted: Vec<f64> = values.iter().copied().collect();
    sorted.sort_by(f64::total_cmp);
    let middle = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[middle - 1] + sorted[middle]) / 2.0
    } else {
        sorted[middle]
    }
}
