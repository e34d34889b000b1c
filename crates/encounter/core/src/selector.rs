//! Weighted random choice among eligible attack patterns.
//!
//! The selector does not decide eligibility; callers pass the patterns that
//! already passed the cooldown, phase and tag gates, in catalog order.

use crate::definition::AttackPattern;
use crate::rng::RandomStream;

pub struct PatternSelector;

impl PatternSelector {
    /// Draws one roll from `rng` and picks a pattern with it.
    pub fn select<'p>(
        candidates: &[&'p AttackPattern],
        rng: &mut RandomStream,
    ) -> Option<&'p AttackPattern> {
        if candidates.is_empty() {
            return None;
        }
        let roll = rng.next_unit(RandomStream::PATTERN_SELECTION);
        let picked = Self::pick_weighted(candidates, roll);

        tracing::debug!(
            candidates = candidates.len(),
            roll,
            picked = ?picked.map(|pattern| pattern.name.as_str()),
            "PatternSelector: weighted pick"
        );

        picked
    }

    /// Picks a pattern for a roll in `[0, 1)`.
    ///
    /// Scales the roll by the total weight and walks the list accumulating
    /// weights until the running sum exceeds it. Negative weights count as
    /// zero. If every weight is zero the roll picks uniformly by position.
    pub fn pick_weighted<'p>(
        candidates: &[&'p AttackPattern],
        roll: f32,
    ) -> Option<&'p AttackPattern> {
        let last = *candidates.last()?;
        let total: f32 = candidates.iter().map(|pattern| weight(pattern)).sum();

        if total <= 0.0 {
            let index = (roll * candidates.len() as f32) as usize;
            return Some(candidates[index.min(candidates.len() - 1)]);
        }

        let target = roll * total;
        let mut cumulative = 0.0;
        for &pattern in candidates {
            cumulative += weight(pattern);
            if cumulative > target {
                return Some(pattern);
            }
        }

        // Rounding can leave the final sum a hair under the target.
        Some(last)
    }
}

fn weight(pattern: &AttackPattern) -> f32 {
    pattern.random_weight.max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::ExecutionMode;

    fn pattern(name: &str, weight: f32) -> AttackPattern {
        AttackPattern::new(name, ExecutionMode::Single).with_weight(weight)
    }

    #[test]
    fn roll_walks_cumulative_weights() {
        let a = pattern("A", 1.0);
        let b = pattern("B", 1.0);
        let c = pattern("C", 2.0);
        let candidates = [&a, &b, &c];

        let name = |roll| PatternSelector::pick_weighted(&candidates, roll).map(|p| &p.name[..]);
        assert_eq!(name(0.0), Some("A"));
        assert_eq!(name(0.24), Some("A"));
        assert_eq!(name(0.25), Some("B"));
        assert_eq!(name(0.49), Some("B"));
        assert_eq!(name(0.5), Some("C"));
        assert_eq!(name(0.999), Some("C"));
    }

    #[test]
    fn zero_weights_are_never_picked_when_others_are_positive() {
        let zero = pattern("Zero", 0.0);
        let one = pattern("One", 1.0);
        let candidates = [&zero, &one];
        assert_eq!(
            PatternSelector::pick_weighted(&candidates, 0.0).map(|p| p.name.as_str()),
            Some("One")
        );
    }

    #[test]
    fn all_zero_weights_fall_back_to_uniform() {
        let a = pattern("A", 0.0);
        let b = pattern("B", 0.0);
        let candidates = [&a, &b];
        assert_eq!(
            PatternSelector::pick_weighted(&candidates, 0.1).map(|p| p.name.as_str()),
            Some("A")
        );
        assert_eq!(
            PatternSelector::pick_weighted(&candidates, 0.9).map(|p| p.name.as_str()),
            Some("B")
        );
    }

    #[test]
    fn empty_candidates_select_nothing() {
        let mut rng = RandomStream::new(1);
        assert!(PatternSelector::select(&[], &mut rng).is_none());
        assert_eq!(rng.draws(), 0);
    }

    #[test]
    fn weighted_draws_converge_to_ratio() {
        let a = pattern("A", 1.0);
        let b = pattern("B", 1.0);
        let c = pattern("C", 2.0);
        let candidates = [&a, &b, &c];
        let mut rng = RandomStream::new(0xb055);

        const DRAWS: usize = 8000;
        let mut counts = [0usize; 3];
        for _ in 0..DRAWS {
            let picked = PatternSelector::select(&candidates, &mut rng).unwrap();
            let slot = candidates
                .iter()
                .position(|candidate| candidate.name == picked.name)
                .unwrap();
            counts[slot] += 1;
        }

        let share = |count: usize| count as f64 / DRAWS as f64;
        assert!((share(counts[0]) - 0.25).abs() < 0.03, "{counts:?}");
        assert!((share(counts[1]) - 0.25).abs() < 0.03, "{counts:?}");
        assert!((share(counts[2]) - 0.50).abs() < 0.03, "{counts:?}");
    }
}
