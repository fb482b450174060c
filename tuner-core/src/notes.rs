//! # Note Math Module
//!
//! Pure conversions between frequency, MIDI note number, note name and
//! cents deviation, based on twelve-tone equal temperament.
//!
//! ## Features
//! - MIDI number to frequency and back, with a configurable A4 reference
//! - Note names with octave numbers (e.g. "E2", "C#4")
//! - Nearest-note lookup for arbitrary frequencies
//! - Cent deviation and its display formatting

use once_cell::sync::Lazy;
use std::collections::BTreeMap;

/// Concert pitch reference in Hz.
pub const A4_HZ: f64 = 440.0;

/// MIDI note number of A4.
const A4_MIDI: f64 = 69.0;

const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Pitch-class lookup for parsing note names, sharps and flats alike.
static PITCH_CLASSES: Lazy<BTreeMap<&'static str, i32>> = Lazy::new(|| {
    let mut map: BTreeMap<&'static str, i32> = NOTE_NAMES
        .iter()
        .enumerate()
        .map(|(i, name)| (*name, i as i32))
        .collect();
    for (name, class) in [("Db", 1), ("Eb", 3), ("Gb", 6), ("Ab", 8), ("Bb", 10)] {
        map.insert(name, class);
    }
    map
});

/// The equal-tempered note closest to some frequency.
#[derive(Debug, Clone, PartialEq)]
pub struct NoteMatch {
    /// MIDI note number (A4 = 69).
    pub midi: i32,
    /// Note name with octave, e.g. "A4".
    pub name: String,
    /// Exact frequency of the note in Hz.
    pub frequency_hz: f64,
    /// Deviation of the input from the note (positive = sharp).
    pub cents: f64,
}

/// Frequency in Hz of a (possibly fractional) MIDI note number.
pub fn midi_to_frequency(midi: f64, a4_hz: f64) -> f64 {
    a4_hz * 2.0_f64.powf((midi - A4_MIDI) / 12.0)
}

/// Fractional MIDI note number of a frequency in Hz.
pub fn frequency_to_midi(frequency_hz: f64, a4_hz: f64) -> f64 {
    A4_MIDI + 12.0 * (frequency_hz / a4_hz).log2()
}

/// Name of the nearest integer MIDI note, e.g. `midi_to_note_name(40.0) == "E2"`.
///
/// The octave changes at C, so MIDI 59 is "B3" and MIDI 60 is "C4".
pub fn midi_to_note_name(midi: f64) -> String {
    let rounded = midi.round() as i32;
    let name = NOTE_NAMES[rounded.rem_euclid(12) as usize];
    let octave = rounded.div_euclid(12) - 1;
    format!("{name}{octave}")
}

/// Parses a note name such as "E2", "C#4" or "Bb3" into a MIDI note number.
///
/// Returns `None` for anything that is not a pitch class followed by an
/// integer octave.
pub fn note_name_to_midi(name: &str) -> Option<i32> {
    let split = name
        .char_indices()
        .find(|(_, c)| c.is_ascii_digit() || *c == '-')
        .map(|(i, _)| i)?;
    let (class, octave) = name.split_at(split);
    let class = PITCH_CLASSES.get(class)?;
    let octave: i32 = octave.parse().ok()?;
    octave.checked_add(1)?.checked_mul(12)?.checked_add(*class)
}

/// Calculates the deviation of `frequency_hz` from `target_hz` in cents.
///
/// - 100 cents = 1 semitone
/// - 1200 cents = 1 octave
/// - Positive values are sharp, negative values flat
pub fn cents_between(frequency_hz: f64, target_hz: f64) -> f64 {
    1200.0 * (frequency_hz / target_hz).log2()
}

/// Finds the equal-tempered note closest to `frequency_hz`.
pub fn nearest_note(frequency_hz: f64, a4_hz: f64) -> NoteMatch {
    let midi = frequency_to_midi(frequency_hz, a4_hz).round();
    let target = midi_to_frequency(midi, a4_hz);

    NoteMatch {
        midi: midi as i32,
        name: midi_to_note_name(midi),
        frequency_hz: target,
        cents: cents_between(frequency_hz, target),
    }
}

/// Formats a cent deviation for display with one decimal and an explicit
/// sign for sharp values: `+3.2`, `-0.5`, `0.0`.
pub fn format_cents(cents: f64) -> String {
    let rounded = (cents * 10.0).round() / 10.0;
    if rounded > 0.0 {
        format!("+{rounded:.1}")
    } else {
        // Avoid printing "-0.0" for values that round to zero from below.
        format!("{:.1}", rounded + 0.0)
    }
}
