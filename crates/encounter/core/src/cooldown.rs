//! Per-pattern cooldown countdowns.

use std::collections::BTreeMap;

use crate::schedule::TIME_EPSILON;

/// Remaining cooldown seconds keyed by pattern name.
///
/// Entries exist only while their remaining time is positive; [`tick`]
/// removes an entry as soon as it reaches zero (within [`TIME_EPSILON`]).
/// Countdowns are kept in `f64` so many small frame steps do not leave a
/// sliver of cooldown behind.
///
/// [`tick`]: CooldownTracker::tick
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CooldownTracker {
    remaining: BTreeMap<String, f64>,
}

impl CooldownTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts (or restarts) a cooldown. Non-positive durations clear it.
    pub fn set(&mut self, pattern: &str, seconds: f32) {
        if seconds > 0.0 {
            self.remaining.insert(pattern.to_owned(), f64::from(seconds));
        } else {
            self.remaining.remove(pattern);
        }
    }

    /// Subtracts `elapsed` from every entry and drops the expired ones.
    pub fn tick(&mut self, elapsed: f32) {
        for remaining in self.remaining.values_mut() {
            *remaining -= f64::from(elapsed);
        }
        self.remaining.retain(|_, remaining| *remaining > TIME_EPSILON);
    }

    pub fn is_on_cooldown(&self, pattern: &str) -> bool {
        self.remaining
            .get(pattern)
            .is_some_and(|remaining| *remaining > TIME_EPSILON)
    }

    /// Remaining seconds, or 0 when the pattern is ready.
    pub fn remaining(&self, pattern: &str) -> f32 {
        self.remaining
            .get(pattern)
            .map_or(0.0, |remaining| *remaining as f32)
    }

    pub fn clear(&mut self) {
        self.remaining.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f32)> {
        self.remaining
            .iter()
            .map(|(name, remaining)| (name.as_str(), *remaining as f32))
    }

    pub fn len(&self) -> usize {
        self.remaining.len()
    }

    pub fn is_empty(&self) -> bool {
        self.remaining.is_empty()
    }
}
