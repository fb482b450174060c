// tuner-core/src/lib.rs

//! The core logic for the string instrument tuner.
//! This crate turns short audio frames into stable tuning readings:
//! YIN pitch estimation, confidence gating, smoothing, and matching
//! against the strings of a tuning. It is completely headless
//! and contains no GUI code.

#[cfg(feature = "capture")]
pub mod audio;
pub mod catalog;
pub mod config;
pub mod error;
pub mod frame;
pub mod gate;
pub mod notes;
pub mod pipeline;
pub mod pitch;
pub mod session;
pub mod smoothing;
pub mod target;
pub mod worker;

pub use catalog::{Instrument, TuningDefinition, TuningSelection, TuningString};
pub use config::TunerConfig;
pub use error::TunerError;
pub use frame::{AudioFrame, AudioSource, Framer};
pub use pipeline::TunerPipeline;
pub use pitch::PitchDetection;

use serde::Serialize;

/// How much a reading can be trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TuningQuality {
    /// Confirmed by the current frame and close to the target.
    Good,
    /// Held through a gap, or far from the target.
    Weak,
    /// No reading at all.
    None,
}

impl TuningQuality {
    pub fn of(reading: Option<&TunerReading>) -> Self {
        reading.map_or(TuningQuality::None, |r| r.quality)
    }
}

/// The result of running one frame through the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TunerReading {
    /// The smoothed frequency in Hz.
    pub detected_frequency_hz: f64,
    /// The nearest equal-tempered note, e.g. "A2".
    pub detected_note: String,
    /// Label of the matched string in the active tuning.
    pub target_string: String,
    pub target_string_index: usize,
    /// Open-string frequency of the matched string.
    pub target_frequency_hz: f64,
    /// Deviation from the matched string in cents (positive = sharp).
    pub cents: f64,
    /// Octave relation the match was made on: 1, 2 or 0.5.
    pub harmonic: f64,
    pub in_tune: bool,
    pub quality: TuningQuality,
    pub source: AudioSource,
}
