//! # Configuration Module
//!
//! The option bag a host hands to the pipeline. Every field has a default,
//! so a JSON file only needs to name what it overrides:
//!
//! ```json
//! { "smoother": { "stale_ms": 1200 }, "tuning": { "in_tune_cents": 3.0 } }
//! ```

use crate::error::{Result, TunerError};
use crate::frame::AudioSource;
use crate::gate::{DetectionGate, GateThresholds};
use crate::pitch::{MIN_FRAME_LEN, YinOptions};
use crate::smoothing::SmootherOptions;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Frame slicing for capture adapters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameConfig {
    pub frame_size: usize,
    pub hop: usize,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            frame_size: 3072,
            hop: 768,
        }
    }
}

/// YIN search range, with a more conservative threshold for the bridge mic.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct YinConfig {
    pub min_freq_hz: f64,
    pub max_freq_hz: f64,
    pub threshold: f64,
    pub bridge_threshold: f64,
}

impl Default for YinConfig {
    fn default() -> Self {
        Self {
            min_freq_hz: 35.0,
            max_freq_hz: 500.0,
            threshold: 0.1,
            bridge_threshold: 0.08,
        }
    }
}

impl YinConfig {
    pub fn options_for(&self, source: AudioSource) -> YinOptions {
        YinOptions {
            min_freq_hz: self.min_freq_hz,
            max_freq_hz: self.max_freq_hz,
            threshold: match source {
                AudioSource::BridgePcm => self.bridge_threshold,
                AudioSource::WebMic => self.threshold,
            },
        }
    }
}

/// Verdict bounds and the settle streak.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerdictConfig {
    /// A reading within this many cents is "in tune".
    pub in_tune_cents: f64,
    /// A confirmed reading within this many cents has good quality.
    pub near_tune_cents: f64,
    /// Consecutive in-tune readings that mark a string settled.
    pub mark_tuned_streak: u32,
}

impl Default for VerdictConfig {
    fn default() -> Self {
        Self {
            in_tune_cents: 5.0,
            near_tune_cents: 10.0,
            mark_tuned_streak: 3,
        }
    }
}

/// Everything the host can tune about the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TunerConfig {
    pub frame: FrameConfig,
    pub yin: YinConfig,
    pub gate: DetectionGate,
    pub smoother: SmootherOptions,
    pub tuning: VerdictConfig,
}

impl Default for TunerConfig {
    fn default() -> Self {
        Self {
            frame: FrameConfig::default(),
            yin: YinConfig::default(),
            gate: DetectionGate::default(),
            // Hosts hold readings longer than the bare smoother does.
            smoother: SmootherOptions {
                stale_ms: 900,
                ..SmootherOptions::default()
            },
            tuning: VerdictConfig::default(),
        }
    }
}

impl TunerConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: TunerConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_json_str(&json)?;
        log::info!("loaded tuner configuration from {}", path.as_ref().display());
        Ok(config)
    }

    /// Rejects values the pipeline cannot work with.
    ///
    /// Frequency bounds are not checked; an empty range yields no detections.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| -> Result<()> { Err(TunerError::InvalidConfig(msg)) };

        if self.frame.frame_size < MIN_FRAME_LEN {
            return invalid(format!(
                "frame_size {} is below the minimum of {MIN_FRAME_LEN}",
                self.frame.frame_size
            ));
        }
        if self.frame.hop == 0 {
            return invalid("hop must be at least one sample".into());
        }
        if self.smoother.median_window == 0 {
            return invalid("median_window must be at least 1".into());
        }
        for (name, alpha) in [
            ("attack_alpha", self.smoother.attack_alpha),
            ("release_alpha", self.smoother.release_alpha),
        ] {
            if !(alpha > 0.0 && alpha <= 1.0) {
                return invalid(format!("{name} {alpha} is outside (0, 1]"));
            }
        }
        for (name, cents) in [
            ("in_tune_cents", self.tuning.in_tune_cents),
            ("near_tune_cents", self.tuning.near_tune_cents),
        ] {
            if !(cents > 0.0 && cents.is_finite()) {
                return invalid(format!("{name} must be positive, got {cents}"));
            }
        }
        if self.tuning.near_tune_cents < self.tuning.in_tune_cents {
            return invalid(format!(
                "near_tune_cents {} is below in_tune_cents {}",
                self.tuning.near_tune_cents, self.tuning.in_tune_cents
            ));
        }
        let fast_change = self.smoother.fast_change_hz;
        if !(fast_change.is_finite() && fast_change >= 0.0) {
            return invalid(format!("fast_change_hz must be finite and non-negative, got {fast_change}"));
        }
        if self.tuning.mark_tuned_streak == 0 {
            return invalid("mark_tuned_streak must be at least 1".into());
        }
        for (name, t) in [("general", &self.gate.general), ("bridge", &self.gate.bridge)] {
            check_thresholds(name, t)?;
        }
        Ok(())
    }
}

fn check_thresholds(name: &str, t: &GateThresholds) -> Result<()> {
    let values = [t.acquire_confidence, t.sustain_confidence, t.acquire_rms, t.sustain_rms];
    if values.iter().any(|v| !v.is_finite() || *v < 0.0) {
        return Err(TunerError::InvalidConfig(format!(
            "{name} gate thresholds must be finite and non-negative"
        )));
    }
    Ok(())
}
