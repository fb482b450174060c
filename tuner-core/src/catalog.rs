//! # Tuning Catalog Module
//!
//! The static table of supported instruments and tunings. Hosts only read
//! from it; target selection scans a `TuningDefinition` linearly, so no
//! index beyond the id lookup is kept.

use crate::error::{Result, TunerError};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Instruments with at least one tuning in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Instrument {
    Guitar,
    Bass,
    Ukulele,
}

impl Instrument {
    pub const ALL: [Instrument; 3] = [Instrument::Guitar, Instrument::Bass, Instrument::Ukulele];

    /// Identifier used in configuration and on the command line.
    pub fn id(self) -> &'static str {
        match self {
            Instrument::Guitar => "guitar",
            Instrument::Bass => "bass",
            Instrument::Ukulele => "ukulele",
        }
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Instrument::Guitar => "Guitar",
            Instrument::Bass => "Bass",
            Instrument::Ukulele => "Ukulele",
        };
        f.write_str(label)
    }
}

impl FromStr for Instrument {
    type Err = TunerError;

    fn from_str(s: &str) -> Result<Self> {
        Instrument::ALL
            .into_iter()
            .find(|i| i.id().eq_ignore_ascii_case(s))
            .ok_or_else(|| TunerError::UnknownInstrument(s.to_string()))
    }
}

/// An open-string reference pitch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TuningString {
    /// Note label shown to the user, e.g. "E2".
    pub label: String,
    /// Reference frequency of the open string in Hz.
    pub frequency_hz: f64,
}

/// A named set of open-string pitches for one instrument.
///
/// String order is display order; it only matters for breaking exact ties
/// during target selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TuningDefinition {
    pub id: String,
    pub instrument: Instrument,
    pub name: String,
    pub strings: Vec<TuningString>,
}

/// The user's current instrument and tuning choice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TuningSelection {
    pub instrument: Instrument,
    pub tuning: String,
}

impl Default for TuningSelection {
    fn default() -> Self {
        Self {
            instrument: Instrument::Guitar,
            tuning: default_tuning_for(Instrument::Guitar).to_string(),
        }
    }
}

fn tuning(id: &str, instrument: Instrument, name: &str, strings: &[(&str, f64)]) -> TuningDefinition {
    TuningDefinition {
        id: id.to_string(),
        instrument,
        name: name.to_string(),
        strings: strings
            .iter()
            .map(|&(label, frequency_hz)| TuningString {
                label: label.to_string(),
                frequency_hz,
            })
            .collect(),
    }
}

static CATALOG: Lazy<Vec<TuningDefinition>> = Lazy::new(|| {
    const E1: (&str, f64) = ("E1", 41.2034);
    const A1: (&str, f64) = ("A1", 55.0);
    const D2: (&str, f64) = ("D2", 73.4162);
    const E2: (&str, f64) = ("E2", 82.4069);
    const G2: (&str, f64) = ("G2", 97.9989);
    const A2: (&str, f64) = ("A2", 110.0);
    const D3: (&str, f64) = ("D3", 146.8324);
    const G3: (&str, f64) = ("G3", 195.9977);
    const A3: (&str, f64) = ("A3", 220.0);
    const B3: (&str, f64) = ("B3", 246.9417);
    const C4: (&str, f64) = ("C4", 261.6256);
    const D4: (&str, f64) = ("D4", 293.6648);
    const E4: (&str, f64) = ("E4", 329.6276);
    const G4: (&str, f64) = ("G4", 391.9954);
    const A4: (&str, f64) = ("A4", 440.0);

    vec![
        tuning("gtr_standard", Instrument::Guitar, "Standard (E A D G B E)", &[E2, A2, D3, G3, B3, E4]),
        tuning("gtr_drop_d", Instrument::Guitar, "Drop D (D A D G B E)", &[D2, A2, D3, G3, B3, E4]),
        tuning("gtr_open_g", Instrument::Guitar, "Open G (D G D G B D)", &[D2, G2, D3, G3, B3, D4]),
        tuning("gtr_dadgad", Instrument::Guitar, "DADGAD (D A D G A D)", &[D2, A2, D3, G3, A3, D4]),
        tuning("bass_standard_4", Instrument::Bass, "Standard 4 (E A D G)", &[E1, A1, D2, G2]),
        tuning("uke_standard_c6", Instrument::Ukulele, "Standard C6 (G C E A)", &[G4, C4, E4, A4]),
    ]
});

/// Every tuning the catalog knows, in menu order.
pub fn catalog() -> &'static [TuningDefinition] {
    &CATALOG
}

/// Looks up a tuning by its id, e.g. `"gtr_drop_d"`.
pub fn tuning_by_id(id: &str) -> Result<&'static TuningDefinition> {
    CATALOG
        .iter()
        .find(|t| t.id == id)
        .ok_or_else(|| TunerError::UnknownTuning(id.to_string()))
}

/// All tunings for one instrument, in menu order.
pub fn tunings_for_instrument(instrument: Instrument) -> impl Iterator<Item = &'static TuningDefinition> {
    CATALOG.iter().filter(move |t| t.instrument == instrument)
}

/// The tuning picked when the user switches to `instrument`.
pub fn default_tuning_for(instrument: Instrument) -> &'static str {
    match instrument {
        Instrument::Guitar => "gtr_standard",
        Instrument::Bass => "bass_standard_4",
        Instrument::Ukulele => "uke_standard_c6",
    }
}

/// Replaces a tuning that does not belong to the selected instrument (or
/// does not exist) with that instrument's default.
pub fn normalize_selection(selection: TuningSelection) -> TuningSelection {
    let valid = tunings_for_instrument(selection.instrument).any(|t| t.id == selection.tuning);
    if valid {
        return selection;
    }

    log::debug!(
        "tuning '{}' is not a {} tuning, falling back to '{}'",
        selection.tuning,
        selection.instrument.id(),
        default_tuning_for(selection.instrument)
    );
    TuningSelection {
        instrument: selection.instrument,
        tuning: default_tuning_for(selection.instrument).to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notes::{A4_HZ, midi_to_frequency, note_name_to_midi};

    #[test]
    fn contains_all_tunings() {
        assert_eq!(catalog().len(), 6);
        assert_eq!(tunings_for_instrument(Instrument::Guitar).count(), 4);
        assert_eq!(tunings_for_instrument(Instrument::Bass).count(), 1);
        assert_eq!(tunings_for_instrument(Instrument::Ukulele).count(), 1);
    }

    #[test]
    fn returns_known_tuning_by_id() {
        let t = tuning_by_id("gtr_drop_d").unwrap();
        assert_eq!(t.instrument, Instrument::Guitar);
        assert_eq!(t.strings[0].label, "D2");
        assert!(matches!(tuning_by_id("banjo_open_g"), Err(TunerError::UnknownTuning(_))));
    }

    #[test]
    fn normalizes_invalid_combinations() {
        let normalized = normalize_selection(TuningSelection {
            instrument: Instrument::Bass,
            tuning: "gtr_standard".into(),
        });
        assert_eq!(normalized.instrument, Instrument::Bass);
        assert_eq!(normalized.tuning, "bass_standard_4");

        let kept = normalize_selection(TuningSelection {
            instrument: Instrument::Guitar,
            tuning: "gtr_dadgad".into(),
        });
        assert_eq!(kept.tuning, "gtr_dadgad");
    }

    #[test]
    fn default_tunings_exist_for_their_instrument() {
        for instrument in Instrument::ALL {
            let t = tuning_by_id(default_tuning_for(instrument)).unwrap();
            assert_eq!(t.instrument, instrument);
        }
    }

    #[test]
    fn labels_match_reference_frequencies() {
        for t in catalog() {
            assert!(!t.strings.is_empty(), "{} has no strings", t.id);
            for s in &t.strings {
                let midi = note_name_to_midi(&s.label).unwrap();
                let expected = midi_to_frequency(midi as f64, A4_HZ);
                assert!(
                    (s.frequency_hz - expected).abs() < 0.001,
                    "{} {} is {} Hz, expected {}",
                    t.id,
                    s.label,
                    s.frequency_hz,
                    expected
                );
            }
        }
    }

    #[test]
    fn parses_instruments() {
        assert_eq!("bass".parse::<Instrument>().unwrap(), Instrument::Bass);
        assert_eq!("Ukulele".parse::<Instrument>().unwrap(), Instrument::Ukulele);
        assert!("banjo".parse::<Instrument>().is_err());
    }

    #[test]
    fn serializes_instrument_lowercase() {
        let json = serde_json::to_string(&TuningSelection::default()).unwrap();
        assert_eq!(json, r#"{"instrument":"guitar","tuning":"gtr_standard"}"#);
    }
}
