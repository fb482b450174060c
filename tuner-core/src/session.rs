//! Per-session "done with this string" tracking.
//!
//! A string is marked settled after a streak of consecutive in-tune readings
//! and stays settled until the tuning changes or the tracker is reset, so a
//! single noisy frame can neither settle nor unsettle it.

use crate::TunerReading;
use std::collections::{BTreeSet, HashMap};

#[derive(Debug, Clone)]
pub struct TunerSessionTracker {
    required_streak: u32,
    settled: BTreeSet<String>,
    streaks: HashMap<String, u32>,
    active: Option<String>,
}

impl TunerSessionTracker {
    /// `required_streak` consecutive in-tune readings settle a string; zero
    /// is treated as one.
    pub fn new(required_streak: u32) -> Self {
        Self {
            required_streak: required_streak.max(1),
            settled: BTreeSet::new(),
            streaks: HashMap::new(),
            active: None,
        }
    }

    /// Accounts for the latest reading, or its absence.
    pub fn update(&mut self, reading: Option<&TunerReading>) {
        let Some(reading) = reading else {
            self.active = None;
            self.streaks.clear();
            return;
        };

        let label = &reading.target_string;
        self.active = Some(label.clone());

        if self.settled.contains(label) {
            return;
        }

        if !reading.in_tune {
            self.streaks.insert(label.clone(), 0);
            return;
        }

        let streak = self.streaks.entry(label.clone()).or_insert(0);
        *streak += 1;
        if *streak >= self.required_streak {
            self.streaks.remove(label);
            self.settled.insert(label.clone());
            log::info!("string {label} settled in tune");
        }
    }

    /// Forgets settled strings, streaks and the active string.
    pub fn reset(&mut self) {
        self.settled.clear();
        self.streaks.clear();
        self.active = None;
    }

    pub fn is_settled(&self, label: &str) -> bool {
        self.settled.contains(label)
    }

    /// Settled string labels in sorted order.
    pub fn settled(&self) -> impl Iterator<Item = &str> {
        self.settled.iter().map(String::as_str)
    }

    /// Current in-tune streak of a string that is not settled yet.
    pub fn streak(&self, label: &str) -> u32 {
        self.streaks.get(label).copied().unwrap_or(0)
    }

    /// The string the latest reading targeted.
    pub fn active_string(&self) -> Option<&str> {
        self.active.as_deref()
    }
}

impl Default for TunerSessionTracker {
    fn default() -> Self {
        Self::new(3)
    }
}
