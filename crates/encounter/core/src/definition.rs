//! Static, author-time boss configuration.
//!
//! A [`BossDefinition`] bundles the phase health thresholds, one
//! [`PhaseConfig`] per phase index, and the [`AttackPattern`] catalog. It is
//! built once (in code or by a loader), validated, and shared read-only with
//! the encounter for its whole lifetime.

use std::collections::{BTreeSet, HashSet};

use crate::ability::{AbilityRef, AssetRef};
use crate::error::{EncounterFault, ErrorSeverity};
use crate::tags::TagSet;

/// How a pattern runs its ability list.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum ExecutionMode {
    /// Activate the first ability, then complete.
    #[default]
    Single,
    /// Activate abilities in order with `ability_delay` between them,
    /// repeating the whole list `repeat_count` times.
    Sequence,
    /// Activate every ability in the same tick, then complete.
    Simultaneous,
    /// Activate one uniformly chosen ability, then complete.
    Random,
}

/// Damage, defense and speed multipliers that hold while a phase is active.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StatMultipliers {
    pub damage: f32,
    pub defense: f32,
    pub speed: f32,
}

impl StatMultipliers {
    pub const NEUTRAL: Self = Self {
        damage: 1.0,
        defense: 1.0,
        speed: 1.0,
    };

    pub const fn new(damage: f32, defense: f32, speed: f32) -> Self {
        Self {
            damage,
            defense,
            speed,
        }
    }

    pub fn is_neutral(&self) -> bool {
        *self == Self::NEUTRAL
    }
}

impl Default for StatMultipliers {
    fn default() -> Self {
        Self::NEUTRAL
    }
}

/// Everything that changes when the boss enters one phase.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct PhaseConfig {
    pub phase_index: u32,
    pub abilities_to_grant: Vec<AbilityRef>,
    pub abilities_to_remove: Vec<AbilityRef>,
    pub tags_to_apply: TagSet,
    pub tags_to_remove: TagSet,
    pub damage_multiplier: f32,
    pub defense_multiplier: f32,
    pub speed_multiplier: f32,
    pub invulnerable_during_transition: bool,
    /// Seconds between entering the phase and applying its effects.
    pub transition_duration: f32,
    pub transition_montage: Option<AssetRef>,
    pub transition_effect: Option<AssetRef>,
}

impl PhaseConfig {
    pub fn new(phase_index: u32) -> Self {
        Self {
            phase_index,
            abilities_to_grant: Vec::new(),
            abilities_to_remove: Vec::new(),
            tags_to_apply: TagSet::new(),
            tags_to_remove: TagSet::new(),
            damage_multiplier: 1.0,
            defense_multiplier: 1.0,
            speed_multiplier: 1.0,
            invulnerable_during_transition: false,
            transition_duration: 0.0,
            transition_montage: None,
            transition_effect: None,
        }
    }

    pub fn multipliers(&self) -> StatMultipliers {
        StatMultipliers::new(
            self.damage_multiplier,
            self.defense_multiplier,
            self.speed_multiplier,
        )
    }

    #[must_use]
    pub fn granting(mut self, abilities: impl IntoIterator<Item = AbilityRef>) -> Self {
        self.abilities_to_grant.extend(abilities);
        self
    }

    #[must_use]
    pub fn removing(mut self, abilities: impl IntoIterator<Item = AbilityRef>) -> Self {
        self.abilities_to_remove.extend(abilities);
        self
    }

    #[must_use]
    pub fn applying_tags(mut self, tags: TagSet) -> Self {
        self.tags_to_apply = tags;
        self
    }

    #[must_use]
    pub fn removing_tags(mut self, tags: TagSet) -> Self {
        self.tags_to_remove = tags;
        self
    }

    #[must_use]
    pub fn with_multipliers(mut self, multipliers: StatMultipliers) -> Self {
        self.damage_multiplier = multipliers.damage;
        self.defense_multiplier = multipliers.defense;
        self.speed_multiplier = multipliers.speed;
        self
    }

    #[must_use]
    pub fn with_transition(mut self, duration: f32, invulnerable: bool) -> Self {
        self.transition_duration = duration;
        self.invulnerable_during_transition = invulnerable;
        self
    }

    #[must_use]
    pub fn with_visuals(mut self, montage: Option<AssetRef>, effect: Option<AssetRef>) -> Self {
        self.transition_montage = montage;
        self.transition_effect = effect;
        self
    }
}

impl Default for PhaseConfig {
    fn default() -> Self {
        Self::new(0)
    }
}

/// A named attack the boss can run.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct AttackPattern {
    pub name: String,
    pub abilities: Vec<AbilityRef>,
    pub execution_mode: ExecutionMode,
    /// Seconds between abilities in [`ExecutionMode::Sequence`].
    pub ability_delay: f32,
    /// Number of full passes over the sequence. Values below 2 mean one pass.
    pub repeat_count: u32,
    pub repeat_delay: f32,
    pub cooldown: f32,
    pub random_weight: f32,
    /// Whether another pattern may pre-empt this one while it runs.
    pub can_be_interrupted: bool,
    pub required_tags: TagSet,
    pub blocked_by_tags: TagSet,
    /// Phases in which the pattern may start. Empty means every phase.
    pub valid_phases: BTreeSet<u32>,
}

impl AttackPattern {
    pub fn new(name: impl Into<String>, execution_mode: ExecutionMode) -> Self {
        Self {
            name: name.into(),
            abilities: Vec::new(),
            execution_mode,
            ability_delay: 0.0,
            repeat_count: 1,
            repeat_delay: 0.0,
            cooldown: 0.0,
            random_weight: 1.0,
            can_be_interrupted: true,
            required_tags: TagSet::new(),
            blocked_by_tags: TagSet::new(),
            valid_phases: BTreeSet::new(),
        }
    }

    pub fn is_valid_in_phase(&self, phase: u32) -> bool {
        self.valid_phases.is_empty() || self.valid_phases.contains(&phase)
    }

    #[must_use]
    pub fn with_abilities(mut self, abilities: impl IntoIterator<Item = AbilityRef>) -> Self {
        self.abilities.extend(abilities);
        self
    }

    #[must_use]
    pub fn with_ability_delay(mut self, seconds: f32) -> Self {
        self.ability_delay = seconds;
        self
    }

    #[must_use]
    pub fn with_repeat(mut self, count: u32, delay: f32) -> Self {
        self.repeat_count = count;
        self.repeat_delay = delay;
        self
    }

    #[must_use]
    pub fn with_cooldown(mut self, seconds: f32) -> Self {
        self.cooldown = seconds;
        self
    }

    #[must_use]
    pub fn with_weight(mut self, weight: f32) -> Self {
        self.random_weight = weight;
        self
    }

    #[must_use]
    pub fn interruptible(mut self, can_be_interrupted: bool) -> Self {
        self.can_be_interrupted = can_be_interrupted;
        self
    }

    #[must_use]
    pub fn requiring(mut self, tags: TagSet) -> Self {
        self.required_tags = tags;
        self
    }

    #[must_use]
    pub fn blocked_by(mut self, tags: TagSet) -> Self {
        self.blocked_by_tags = tags;
        self
    }

    #[must_use]
    pub fn in_phases(mut self, phases: impl IntoIterator<Item = u32>) -> Self {
        self.valid_phases.extend(phases);
        self
    }
}

impl Default for AttackPattern {
    fn default() -> Self {
        Self::new(String::new(), ExecutionMode::Single)
    }
}

/// Errors found while validating a [`BossDefinition`].
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum DefinitionError {
    #[error("phase threshold {index} is {value}, expected a fraction in (0, 1]")]
    ThresholdOutOfRange { index: usize, value: f32 },

    #[error("phase thresholds must be strictly descending (index {index})")]
    ThresholdsNotDescending { index: usize },

    #[error("phase {0} is configured more than once")]
    DuplicatePhase(u32),

    #[error("pattern '{0}' is defined more than once")]
    DuplicatePattern(String),

    #[error("pattern at position {0} has an empty name")]
    EmptyPatternName(usize),

    #[error("pattern '{pattern}' has invalid {field}: {value}")]
    InvalidPatternValue {
        pattern: String,
        field: &'static str,
        value: f32,
    },

    #[error("phase {phase} has invalid {field}: {value}")]
    InvalidPhaseValue {
        phase: u32,
        field: &'static str,
        value: f32,
    },
}

impl EncounterFault for DefinitionError {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Fatal
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::ThresholdOutOfRange { .. } => "threshold_out_of_range",
            Self::ThresholdsNotDescending { .. } => "thresholds_not_descending",
            Self::DuplicatePhase(_) => "duplicate_phase",
            Self::DuplicatePattern(_) => "duplicate_pattern",
            Self::EmptyPatternName(_) => "empty_pattern_name",
            Self::InvalidPatternValue { .. } => "invalid_pattern_value",
            Self::InvalidPhaseValue { .. } => "invalid_phase_value",
        }
    }
}

/// Complete static description of one boss.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct BossDefinition {
    pub name: String,
    /// Health fractions that open phases 1, 2, ...; strictly descending.
    pub phase_health_thresholds: Vec<f32>,
    pub phases: Vec<PhaseConfig>,
    /// Pattern catalog in authoring order. Selection walks this order.
    pub patterns: Vec<AttackPattern>,
}

impl BossDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_thresholds(mut self, thresholds: impl IntoIterator<Item = f32>) -> Self {
        self.phase_health_thresholds = thresholds.into_iter().collect();
        self
    }

    #[must_use]
    pub fn with_phase(mut self, phase: PhaseConfig) -> Self {
        self.phases.push(phase);
        self
    }

    #[must_use]
    pub fn with_pattern(mut self, pattern: AttackPattern) -> Self {
        self.patterns.push(pattern);
        self
    }

    pub fn phase(&self, index: u32) -> Option<&PhaseConfig> {
        self.phases.iter().find(|phase| phase.phase_index == index)
    }

    pub fn pattern(&self, name: &str) -> Option<&AttackPattern> {
        self.patterns.iter().find(|pattern| pattern.name == name)
    }

    /// Number of phases, counting the opening phase 0.
    pub fn phase_count(&self) -> usize {
        self.phase_health_thresholds.len() + 1
    }

    /// Highest phase reachable through health thresholds.
    pub fn last_phase(&self) -> u32 {
        self.phase_health_thresholds.len() as u32
    }

    /// Maps a health fraction to a phase index.
    ///
    /// Walks the thresholds and keeps the highest phase `i` with
    /// `fraction <= thresholds[i - 1]`. Boundaries are exclusive above and
    /// inclusive at or below: with `[0.66, 0.33]`, 0.66 is phase 1 and 0.67
    /// is phase 0.
    pub fn phase_for_health(&self, fraction: f32) -> u32 {
        let mut phase = 0;
        for (index, threshold) in self.phase_health_thresholds.iter().enumerate() {
            if fraction <= *threshold {
                phase = index as u32 + 1;
            }
        }
        phase
    }

    /// Checks the definition for authoring mistakes.
    ///
    /// # Errors
    ///
    /// Returns the first [`DefinitionError`] found.
    pub fn validate(&self) -> Result<(), DefinitionError> {
        for (index, value) in self.phase_health_thresholds.iter().copied().enumerate() {
            if !(value > 0.0 && value <= 1.0) {
                return Err(DefinitionError::ThresholdOutOfRange { index, value });
            }
            if index > 0 && value >= self.phase_health_thresholds[index - 1] {
                return Err(DefinitionError::ThresholdsNotDescending { index });
            }
        }

        let mut seen_phases = HashSet::new();
        for phase in &self.phases {
            if !seen_phases.insert(phase.phase_index) {
                return Err(DefinitionError::DuplicatePhase(phase.phase_index));
            }
            let invalid = |field, value| DefinitionError::InvalidPhaseValue {
                phase: phase.phase_index,
                field,
                value,
            };
            if !is_non_negative(phase.transition_duration) {
                return Err(invalid("transition_duration", phase.transition_duration));
            }
            for (field, value) in [
                ("damage_multiplier", phase.damage_multiplier),
                ("defense_multiplier", phase.defense_multiplier),
                ("speed_multiplier", phase.speed_multiplier),
            ] {
                if !(value.is_finite() && value > 0.0) {
                    return Err(invalid(field, value));
                }
            }
        }

        let mut seen_patterns = HashSet::new();
        for (position, pattern) in self.patterns.iter().enumerate() {
            if pattern.name.is_empty() {
                return Err(DefinitionError::EmptyPatternName(position));
            }
            if !seen_patterns.insert(pattern.name.as_str()) {
                return Err(DefinitionError::DuplicatePattern(pattern.name.clone()));
            }
            for (field, value) in [
                ("ability_delay", pattern.ability_delay),
                ("repeat_delay", pattern.repeat_delay),
                ("cooldown", pattern.cooldown),
                ("random_weight", pattern.random_weight),
            ] {
                if !is_non_negative(value) {
                    return Err(DefinitionError::InvalidPatternValue {
                        pattern: pattern.name.clone(),
                        field,
                        value,
                    });
                }
            }
        }

        Ok(())
    }
}

fn is_non_negative(value: f32) -> bool {
    value.is_finite() && value >= 0.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_threshold_boss() -> BossDefinition {
        BossDefinition::new("Warden").with_thresholds([0.66, 0.33])
    }

    #[test]
    fn phase_boundaries_are_inclusive_below() {
        let boss = two_threshold_boss();
        assert_eq!(boss.phase_for_health(1.0), 0);
        assert_eq!(boss.phase_for_health(0.67), 0);
        assert_eq!(boss.phase_for_health(0.66), 1);
        assert_eq!(boss.phase_for_health(0.60), 1);
        assert_eq!(boss.phase_for_health(0.33), 2);
        assert_eq!(boss.phase_for_health(0.0), 2);
        assert_eq!(boss.last_phase(), 2);
    }

    #[test]
    fn no_thresholds_means_single_phase() {
        let boss = BossDefinition::new("Dummy");
        assert_eq!(boss.phase_for_health(0.0), 0);
        assert!(boss.validate().is_ok());
    }

    #[test]
    fn rejects_unordered_thresholds() {
        let boss = BossDefinition::new("Bad").with_thresholds([0.33, 0.66]);
        assert_eq!(
            boss.validate(),
            Err(DefinitionError::ThresholdsNotDescending { index: 1 })
        );

        let boss = BossDefinition::new("Bad").with_thresholds([1.5]);
        assert!(matches!(
            boss.validate(),
            Err(DefinitionError::ThresholdOutOfRange { index: 0, .. })
        ));
    }

    #[test]
    fn rejects_duplicate_names_and_phases() {
        let boss = two_threshold_boss()
            .with_pattern(AttackPattern::new("Slam", ExecutionMode::Single))
            .with_pattern(AttackPattern::new("Slam", ExecutionMode::Random));
        assert_eq!(
            boss.validate(),
            Err(DefinitionError::DuplicatePattern("Slam".into()))
        );

        let boss = two_threshold_boss()
            .with_phase(PhaseConfig::new(1))
            .with_phase(PhaseConfig::new(1));
        assert_eq!(boss.validate(), Err(DefinitionError::DuplicatePhase(1)));
    }

    #[test]
    fn rejects_negative_timings() {
        let boss = two_threshold_boss()
            .with_pattern(AttackPattern::new("Slam", ExecutionMode::Single).with_cooldown(-1.0));
        let err = boss.validate().unwrap_err();
        assert_eq!(err.error_code(), "invalid_pattern_value");
        assert_eq!(err.severity(), ErrorSeverity::Fatal);

        let boss = two_threshold_boss()
            .with_phase(PhaseConfig::new(1).with_multipliers(StatMultipliers::new(0.0, 1.0, 1.0)));
        assert!(matches!(
            boss.validate(),
            Err(DefinitionError::InvalidPhaseValue {
                phase: 1,
                field: "damage_multiplier",
                ..
            })
        ));
    }

    #[test]
    fn execution_mode_parses_from_snake_case() {
        assert_eq!(
            "simultaneous".parse::<ExecutionMode>().unwrap(),
            ExecutionMode::Simultaneous
        );
        assert_eq!(ExecutionMode::Sequence.as_ref(), "sequence");
    }

    #[test]
    fn empty_valid_phases_allow_every_phase() {
        let any = AttackPattern::new("Any", ExecutionMode::Single);
        let early = AttackPattern::new("Early", ExecutionMode::Single).in_phases([0]);
        assert!(any.is_valid_in_phase(5));
        assert!(early.is_valid_in_phase(0));
        assert!(!early.is_valid_in_phase(1));
    }
}
