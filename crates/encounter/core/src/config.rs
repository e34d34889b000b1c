use crate::tags::Tag;

/// Encounter configuration constants and tunable parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct EncounterConfig {
    /// Seed for weighted pattern choice and random-mode ability picks.
    /// The same seed replays the same choices.
    pub rng_seed: u64,

    /// Tag applied to the boss for the length of an invulnerable transition.
    pub invulnerability_tag: Tag,

    /// Level used when a pattern has to grant an ability the boss lacks.
    pub temporary_ability_level: u32,

    /// Apply phase 0's grants, tags and multipliers when the encounter starts.
    pub apply_initial_phase: bool,
}

impl EncounterConfig {
    pub const DEFAULT_RNG_SEED: u64 = 0x5eed_b055;
    pub const DEFAULT_INVULNERABILITY_TAG: &'static str = "State.Invulnerable";
    pub const DEFAULT_ABILITY_LEVEL: u32 = 1;

    pub fn new() -> Self {
        Self {
            rng_seed: Self::DEFAULT_RNG_SEED,
            invulnerability_tag: Tag::from(Self::DEFAULT_INVULNERABILITY_TAG),
            temporary_ability_level: Self::DEFAULT_ABILITY_LEVEL,
            apply_initial_phase: true,
        }
    }

    #[must_use]
    pub fn with_seed(mut self, rng_seed: u64) -> Self {
        self.rng_seed = rng_seed;
        self
    }

    #[must_use]
    pub fn with_invulnerability_tag(mut self, tag: impl Into<Tag>) -> Self {
        self.invulnerability_tag = tag.into();
        self
    }

    #[must_use]
    pub fn with_initial_phase(mut self, apply: bool) -> Self {
        self.apply_initial_phase = apply;
        self
    }
}

impl Default for EncounterConfig {
    fn default() -> Self {
        Self::new()
    }
}
