//! # Tuner Pipeline Module
//!
//! One audio session: frame → YIN → gate → smoother → target selection →
//! [`TunerReading`], with the session tracker fed from every reading.
//!
//! The pipeline is synchronous and holds cross-frame state without locking.
//! Feed it frames from one thread, one at a time; see [`crate::worker`] for
//! the latest-frame-wins loop around it.

use crate::catalog::TuningDefinition;
use crate::config::TunerConfig;
use crate::error::{Result, TunerError};
use crate::frame::AudioFrame;
use crate::gate::LockState;
use crate::notes::{A4_HZ, nearest_note};
use crate::pitch::{PitchDetection, detect_pitch_yin};
use crate::session::TunerSessionTracker;
use crate::smoothing::PitchSmoother;
use crate::target::select_target_string;
use crate::{TunerReading, TuningQuality};

#[derive(Debug, Clone)]
pub struct TunerPipeline {
    config: TunerConfig,
    tuning: TuningDefinition,
    lock: LockState,
    smoother: PitchSmoother,
    tracker: TunerSessionTracker,
    latest: Option<TunerReading>,
}

impl TunerPipeline {
    /// Starts a session for `tuning`.
    ///
    /// Fails for an invalid configuration or a tuning without strings.
    pub fn new(config: TunerConfig, tuning: TuningDefinition) -> Result<Self> {
        config.validate()?;
        check_tuning(&tuning)?;
        log::info!("tuner session started for '{}' ({})", tuning.id, tuning.name);

        Ok(Self {
            smoother: PitchSmoother::new(config.smoother),
            tracker: TunerSessionTracker::new(config.tuning.mark_tuned_streak),
            config,
            tuning,
            lock: LockState::Unlocked,
            latest: None,
        })
    }

    pub fn config(&self) -> &TunerConfig {
        &self.config
    }

    pub fn tuning(&self) -> &TuningDefinition {
        &self.tuning
    }

    pub fn lock_state(&self) -> LockState {
        self.lock
    }

    pub fn tracker(&self) -> &TunerSessionTracker {
        &self.tracker
    }

    /// The reading produced by the last processed frame.
    pub fn latest(&self) -> Option<&TunerReading> {
        self.latest.as_ref()
    }

    /// Switches to another tuning with fresh smoothing, gating and session
    /// state.
    pub fn select_tuning(&mut self, tuning: TuningDefinition) -> Result<()> {
        check_tuning(&tuning)?;
        log::info!("switching tuning '{}' -> '{}'", self.tuning.id, tuning.id);
        self.tuning = tuning;
        self.restart();
        self.tracker.reset();
        Ok(())
    }

    /// Restarts signal tracking after the audio source was restarted.
    /// Settled strings are kept.
    pub fn reset(&mut self) {
        self.restart();
        self.tracker.update(None);
    }

    fn restart(&mut self) {
        self.smoother = PitchSmoother::new(self.config.smoother);
        self.lock = LockState::Unlocked;
        self.latest = None;
    }

    /// Runs one frame through the pipeline.
    ///
    /// Returns `None` while nothing is being tracked: silence, noise, or a
    /// held pitch that went stale.
    pub fn process(&mut self, frame: &AudioFrame) -> Option<TunerReading> {
        let options = self.config.yin.options_for(frame.source);
        let raw = detect_pitch_yin(&frame.samples, frame.sample_rate_hz, &options);
        let gated = self.config.gate.apply(raw, &mut self.lock, frame.source);
        let smoothed = self.smoother.next(gated, frame.timestamp_ms);

        let reading = smoothed.and_then(|detection| self.build_reading(detection, frame));
        self.tracker.update(reading.as_ref());
        self.latest = reading.clone();
        reading
    }

    fn build_reading(&self, detection: PitchDetection, frame: &AudioFrame) -> Option<TunerReading> {
        let target = match select_target_string(detection.frequency_hz, &self.tuning) {
            Ok(target) => target,
            Err(err) => {
                // Unreachable for tunings accepted by `check_tuning`.
                log::error!("target selection failed: {err}");
                return None;
            }
        };
        let abs_cents = target.cents.abs();
        let confirmed = detection.confidence > 0.0 && detection.rms > 0.0;

        Some(TunerReading {
            detected_frequency_hz: detection.frequency_hz,
            detected_note: nearest_note(detection.frequency_hz, A4_HZ).name,
            target_string: target.string_label,
            target_string_index: target.string_index,
            target_frequency_hz: target.target_frequency_hz,
            cents: target.cents,
            harmonic: target.harmonic,
            in_tune: abs_cents <= self.config.tuning.in_tune_cents,
            quality: if confirmed && abs_cents <= self.config.tuning.near_tune_cents {
                TuningQuality::Good
            } else {
                TuningQuality::Weak
            },
            source: frame.source,
        })
    }
}

fn check_tuning(tuning: &TuningDefinition) -> Result<()> {
    if tuning.strings.is_empty() {
        return Err(TunerError::EmptyTuning {
            id: tuning.id.clone(),
        });
    }
    Ok(())
}
