//! Confidence and loudness gating with acquire/sustain hysteresis.
//!
//! A string has to ring clearly to be picked up (acquire tier), but once it
//! is being tracked a decaying note is followed with looser thresholds
//! (sustain tier). The low-quality bridge microphone gets its own, stricter
//! pair of tiers.

use crate::frame::AudioSource;
use crate::pitch::PitchDetection;
use serde::{Deserialize, Serialize};

/// Whether a pitch is currently being tracked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LockState {
    Locked,
    #[default]
    Unlocked,
}

impl LockState {
    pub fn is_locked(self) -> bool {
        self == LockState::Locked
    }
}

/// Minimum confidence and RMS for both hysteresis tiers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GateThresholds {
    pub acquire_confidence: f64,
    pub sustain_confidence: f64,
    pub acquire_rms: f64,
    pub sustain_rms: f64,
}

impl GateThresholds {
    /// Tiers for a reasonable software microphone.
    pub const GENERAL: GateThresholds = GateThresholds {
        acquire_confidence: 0.45,
        sustain_confidence: 0.2,
        acquire_rms: 0.005,
        sustain_rms: 0.002,
    };

    /// Stricter tiers for the 16 kHz bridge MEMS microphone.
    pub const BRIDGE: GateThresholds = GateThresholds {
        acquire_confidence: 0.65,
        sustain_confidence: 0.40,
        acquire_rms: 0.008,
        sustain_rms: 0.004,
    };

    /// The (confidence, rms) minimums that apply in `state`.
    fn minimums(&self, state: LockState) -> (f64, f64) {
        match state {
            LockState::Locked => (self.sustain_confidence, self.sustain_rms),
            LockState::Unlocked => (self.acquire_confidence, self.acquire_rms),
        }
    }
}

impl Default for GateThresholds {
    fn default() -> Self {
        Self::GENERAL
    }
}

/// Threshold sets for every audio source.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionGate {
    pub general: GateThresholds,
    pub bridge: GateThresholds,
}

impl Default for DetectionGate {
    fn default() -> Self {
        Self {
            general: GateThresholds::GENERAL,
            bridge: GateThresholds::BRIDGE,
        }
    }
}

impl DetectionGate {
    pub fn thresholds_for(&self, source: AudioSource) -> &GateThresholds {
        match source {
            AudioSource::BridgePcm => &self.bridge,
            AudioSource::WebMic => &self.general,
        }
    }

    /// Passes `detection` through if it clears the tier selected by `state`.
    pub fn gate(
        &self,
        detection: Option<PitchDetection>,
        state: LockState,
        source: AudioSource,
    ) -> Option<PitchDetection> {
        let detection = detection?;
        let (min_confidence, min_rms) = self.thresholds_for(source).minimums(state);
        if detection.confidence < min_confidence || detection.rms < min_rms {
            return None;
        }
        Some(detection)
    }

    /// Like [`gate`](Self::gate), and moves `state` to `Locked` on a pass and
    /// `Unlocked` otherwise.
    pub fn apply(
        &self,
        detection: Option<PitchDetection>,
        state: &mut LockState,
        source: AudioSource,
    ) -> Option<PitchDetection> {
        let passed = self.gate(detection, *state, source);
        let next = if passed.is_some() {
            LockState::Locked
        } else {
            LockState::Unlocked
        };
        if next != *state {
            log::debug!("detection gate {:?} -> {:?} ({:?})", *state, next, source);
            *state = next;
        }
        passed
    }
}
