//! Picks the string of the active tuning that a detected pitch belongs to.
//!
//! Every (string, harmonic) pair is scored by its absolute cent distance, so
//! a weak fundamental whose octave overtone won the estimate still lands on
//! the right string. The search is a linear scan over at most
//! `strings × 3` candidates.

use crate::catalog::TuningDefinition;
use crate::error::{Result, TunerError};
use crate::notes::cents_between;

/// Octave relations tried for every string, in tie-break order.
pub const HARMONIC_FACTORS: [f64; 3] = [1.0, 2.0, 0.5];

/// The best matching string for a detected frequency.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetMatch {
    /// Position of the string in the tuning.
    pub string_index: usize,
    pub string_label: String,
    /// Open-string (fundamental) frequency of the matched string.
    pub target_frequency_hz: f64,
    /// Signed deviation from the matched octave of the string.
    pub cents: f64,
    /// Which octave of the string matched: 1, 2 or 0.5.
    pub harmonic: f64,
}

/// Selects the string closest to `detected_hz` in `tuning`.
///
/// Exact ties go to the earlier string, then to the earlier harmonic factor.
/// Fails only for a tuning without strings.
pub fn select_target_string(detected_hz: f64, tuning: &TuningDefinition) -> Result<TargetMatch> {
    let mut best: Option<(usize, f64, f64)> = None;

    for (index, string) in tuning.strings.iter().enumerate() {
        for harmonic in HARMONIC_FACTORS {
            let cents = cents_between(detected_hz, string.frequency_hz * harmonic);
            let better = match best {
                None => true,
                Some((_, _, best_cents)) => cents.abs() < best_cents.abs(),
            };
            if better {
                best = Some((index, harmonic, cents));
            }
        }
    }

    let (index, harmonic, cents) = best.ok_or_else(|| TunerError::EmptyTuning {
        id: tuning.id.clone(),
    })?;
    let string = &tuning.strings[index];

    Ok(TargetMatch {
        string_index: index,
        string_label: string.label.clone(),
        target_frequency_hz: string.frequency_hz,
        cents,
        harmonic,
    })
}
