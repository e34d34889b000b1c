//! Headless boss actor backing the simulation worker.

use encounter_core::{EncounterConfig, EncounterEnv, HealthChange, MemoryBoss, NotificationSink, Tag};
use serde::{Deserialize, Serialize};

use crate::api::{Result, RuntimeError};

/// In-memory boss: ability system, presentation log, stats and a health pool.
///
/// Damage is absorbed while the boss carries the invulnerability tag.
#[derive(Debug, Clone)]
pub struct HeadlessBoss {
    pub body: MemoryBoss,
    health: f32,
    max_health: f32,
    invulnerability_tag: Tag,
}

/// Result of a damage or heal command.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DamageOutcome {
    pub health: f32,
    pub max_health: f32,
    /// Phase a transition was started for, if the change crossed a threshold.
    pub phase_started: Option<u32>,
    /// Damage was ignored because the boss was invulnerable.
    pub absorbed: bool,
}

impl DamageOutcome {
    pub fn is_dead(&self) -> bool {
        self.health <= 0.0
    }
}

impl HeadlessBoss {
    pub const DEFAULT_MAX_HEALTH: f32 = 1000.0;

    pub fn new(max_health: f32, invulnerability_tag: Tag) -> Self {
        let max_health = if max_health.is_finite() && max_health > 0.0 {
            max_health
        } else {
            tracing::warn!(max_health, "invalid max health, using default");
            Self::DEFAULT_MAX_HEALTH
        };
        Self {
            body: MemoryBoss::new(),
            health: max_health,
            max_health,
            invulnerability_tag,
        }
    }

    pub fn health(&self) -> f32 {
        self.health
    }

    pub fn max_health(&self) -> f32 {
        self.max_health
    }

    pub fn is_dead(&self) -> bool {
        self.health <= 0.0
    }

    pub fn is_invulnerable(&self) -> bool {
        self.body.abilities.has_tag(self.invulnerability_tag.as_str())
    }

    /// Refills health for a new fight.
    pub fn restore(&mut self) {
        self.health = self.max_health;
    }

    /// Subtracts `amount`, never dropping below zero. Returns `None` when
    /// the hit was absorbed.
    pub fn apply_damage(&mut self, amount: f32) -> Result<Option<HealthChange>> {
        let amount = validate_amount("damage", amount)?;
        if self.is_invulnerable() {
            tracing::debug!(amount, "damage absorbed, boss invulnerable");
            return Ok(None);
        }
        Ok(Some(self.set_health(self.health - amount)))
    }

    /// Adds `amount`, never exceeding max health.
    pub fn heal(&mut self, amount: f32) -> Result<HealthChange> {
        let amount = validate_amount("heal", amount)?;
        Ok(self.set_health(self.health + amount))
    }

    /// Borrows every host for one encounter call.
    pub fn env<'a>(&'a mut self, sink: &'a mut dyn NotificationSink) -> EncounterEnv<'a> {
        self.body.env(sink)
    }

    fn set_health(&mut self, value: f32) -> HealthChange {
        let old_value = self.health;
        self.health = value.clamp(0.0, self.max_health);
        HealthChange::new(old_value, self.health, self.max_health)
    }
}

impl Default for HeadlessBoss {
    fn default() -> Self {
        Self::new(
            Self::DEFAULT_MAX_HEALTH,
            Tag::from(EncounterConfig::DEFAULT_INVULNERABILITY_TAG),
        )
    }
}

fn validate_amount(what: &'static str, value: f32) -> Result<f32> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(RuntimeError::InvalidAmount { what, value })
    }
}
