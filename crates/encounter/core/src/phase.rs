//! Phase transitions and the effects each phase carries.
//!
//! A transition runs in two halves. Starting it strips the old phase's
//! effects, moves the phase index, plays the transition visuals and marks the
//! boss invulnerable if configured. Completing it (at once, or when the
//! transition timer fires) applies the new phase's grants, tags and stat
//! multipliers and lifts the invulnerability.

use tracing::{debug, info, warn};

use crate::ability::{AbilityHandle, AbilityRef};
use crate::config::EncounterConfig;
use crate::definition::{BossDefinition, PhaseConfig, StatMultipliers};
use crate::error::{EncounterFault, ErrorSeverity};
use crate::event::EncounterEvent;
use crate::host::{AbilityHost, BossHooks, EncounterEnv};
use crate::schedule::{TimerQueue, TimerToken};
use crate::tags::TagSet;

/// Why a phase change was rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum PhaseError {
    #[error("already in phase {0}")]
    SamePhase(u32),

    #[error("transition to phase {target} still in progress")]
    AlreadyTransitioning { target: u32 },

    #[error("phase {requested} is behind current phase {current}")]
    Regression { current: u32, requested: u32 },
}

impl EncounterFault for PhaseError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::SamePhase(_) | Self::AlreadyTransitioning { .. } => ErrorSeverity::Recoverable,
            Self::Regression { .. } => ErrorSeverity::Validation,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::SamePhase(_) => "same_phase",
            Self::AlreadyTransitioning { .. } => "already_transitioning",
            Self::Regression { .. } => "phase_regression",
        }
    }
}

pub(crate) struct PhaseScope<'s, 'e> {
    pub now: f64,
    pub definition: &'s BossDefinition,
    pub config: &'s EncounterConfig,
    pub hooks: &'s mut dyn BossHooks,
    pub env: &'s mut EncounterEnv<'e>,
}

impl PhaseScope<'_, '_> {
    fn invulnerability_tags(&self) -> TagSet {
        [self.config.invulnerability_tag.clone()].into_iter().collect()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct ActiveTransition {
    phase: u32,
    invulnerable: bool,
    timer: Option<TimerToken>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct PhaseGrant {
    ability: AbilityRef,
    handle: AbilityHandle,
}

/// Owns the current phase index and everything granted on its behalf.
#[derive(Debug, Default)]
pub struct PhaseTransitionController {
    current_phase: u32,
    transition: Option<ActiveTransition>,
    timers: TimerQueue<u32>,
    grants: Vec<PhaseGrant>,
    multipliers: StatMultipliers,
    /// Whether the current phase's tags are on the host.
    effects_applied: bool,
}

impl PhaseTransitionController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_phase(&self) -> u32 {
        self.current_phase
    }

    pub fn is_transitioning(&self) -> bool {
        self.transition.is_some()
    }

    /// Phase being entered while a transition window is open.
    pub fn transition_target(&self) -> Option<u32> {
        self.transition.map(|transition| transition.phase)
    }

    pub fn can_transition(&self) -> bool {
        self.transition.is_none()
    }

    pub fn is_invulnerable(&self) -> bool {
        self.transition
            .is_some_and(|transition| transition.invulnerable)
    }

    pub fn current_multipliers(&self) -> StatMultipliers {
        self.multipliers
    }

    /// Handles of abilities granted by the current phase.
    pub fn granted_handles(&self) -> impl Iterator<Item = AbilityHandle> + '_ {
        self.grants.iter().map(|grant| grant.handle)
    }

    pub(crate) fn start_transition(
        &mut self,
        new_phase: u32,
        scope: &mut PhaseScope<'_, '_>,
    ) -> Result<(), PhaseError> {
        let old_phase = self.current_phase;
        if new_phase == old_phase {
            return Err(PhaseError::SamePhase(new_phase));
        }
        if new_phase < old_phase {
            return Err(PhaseError::Regression {
                current: old_phase,
                requested: new_phase,
            });
        }
        if let Some(active) = self.transition {
            return Err(PhaseError::AlreadyTransitioning {
                target: active.phase,
            });
        }

        info!(from = old_phase, to = new_phase, "phase transition started");

        self.remove_phase_effects(old_phase, scope);
        scope.hooks.on_phase_exit(old_phase);

        self.current_phase = new_phase;
        scope.env.notify(EncounterEvent::PhaseChanged {
            old: old_phase,
            new: new_phase,
        });
        scope.hooks.on_phase_enter(new_phase);

        let definition = scope.definition;
        let Some(config) = definition.phase(new_phase) else {
            warn!(phase = new_phase, "no config for phase, completing transition");
            self.transition = Some(ActiveTransition {
                phase: new_phase,
                invulnerable: false,
                timer: None,
            });
            self.complete(scope);
            return Ok(());
        };

        play_transition_visuals(config, scope.env);

        let mut invulnerable = false;
        if config.invulnerable_during_transition {
            let tags = scope.invulnerability_tags();
            match scope.env.require_abilities() {
                Ok(host) => {
                    host.add_loose_tags(&tags);
                    invulnerable = true;
                }
                Err(error) => debug!(
                    phase = new_phase,
                    %error,
                    code = error.error_code(),
                    "invulnerability skipped"
                ),
            }
        }

        let timer = (config.transition_duration > 0.0)
            .then(|| self.timers.schedule(scope.now, config.transition_duration, new_phase));
        self.transition = Some(ActiveTransition {
            phase: new_phase,
            invulnerable,
            timer,
        });

        match timer {
            Some(_) => debug!(
                phase = new_phase,
                duration = config.transition_duration,
                invulnerable,
                "transition window open"
            ),
            None => self.complete(scope),
        }

        Ok(())
    }

    /// Completes a transition whose timer has come due.
    pub(crate) fn advance(&mut self, scope: &mut PhaseScope<'_, '_>) {
        while let Some(due) = self.timers.pop_due(scope.now) {
            let armed = self
                .transition
                .is_some_and(|transition| transition.timer == Some(due.token));
            if armed {
                self.complete(scope);
            } else {
                debug!(phase = due.payload, "stale transition timer ignored");
            }
        }
    }

    /// Applies the current phase's effects without a transition.
    /// Used for phase 0 at encounter start.
    pub(crate) fn apply_initial(&mut self, scope: &mut PhaseScope<'_, '_>) {
        let definition = scope.definition;
        match definition.phase(self.current_phase) {
            Some(config) => {
                debug!(phase = self.current_phase, "applying initial phase effects");
                self.apply_phase_effects(config, scope);
            }
            None => debug!(phase = self.current_phase, "no initial phase config"),
        }
    }

    /// Returns to phase 0, undoing every effect this controller applied.
    pub(crate) fn reset(&mut self, scope: &mut PhaseScope<'_, '_>) {
        if let Some(transition) = self.transition.take() {
            if transition.invulnerable {
                let tags = scope.invulnerability_tags();
                if let Some(host) = scope.env.abilities() {
                    host.remove_loose_tags(&tags);
                }
            }
        }
        self.timers.clear();
        self.remove_phase_effects(self.current_phase, scope);
        self.current_phase = 0;
    }

    fn complete(&mut self, scope: &mut PhaseScope<'_, '_>) {
        let Some(transition) = self.transition.take() else {
            return;
        };
        if let Some(token) = transition.timer {
            self.timers.cancel(token);
        }

        let phase = transition.phase;
        let definition = scope.definition;
        if let Some(config) = definition.phase(phase) {
            self.apply_phase_effects(config, scope);
        }

        if transition.invulnerable {
            let tags = scope.invulnerability_tags();
            if let Some(host) = scope.env.abilities() {
                host.remove_loose_tags(&tags);
            }
        }

        info!(phase, "phase transition complete");
        scope.env.notify(EncounterEvent::PhaseTransitionComplete { phase });
        scope.hooks.on_phase_transition_complete(phase);
    }

    fn apply_phase_effects(&mut self, config: &PhaseConfig, scope: &mut PhaseScope<'_, '_>) {
        let level = scope.config.temporary_ability_level;
        match scope.env.require_abilities() {
            Ok(host) => {
                for ability in &config.abilities_to_grant {
                    let handle = host.grant_ability(ability, level);
                    debug!(phase = config.phase_index, %ability, %handle, "phase ability granted");
                    self.grants.push(PhaseGrant {
                        ability: ability.clone(),
                        handle,
                    });
                }
                if !config.tags_to_apply.is_empty() {
                    host.add_loose_tags(&config.tags_to_apply);
                }
                if !config.tags_to_remove.is_empty() {
                    host.remove_loose_tags(&config.tags_to_remove);
                }
                for ability in &config.abilities_to_remove {
                    self.remove_ability(ability, host);
                }
            }
            Err(error) => {
                let has_ability_effects = !config.abilities_to_grant.is_empty()
                    || !config.abilities_to_remove.is_empty()
                    || !config.tags_to_apply.is_empty()
                    || !config.tags_to_remove.is_empty();
                if has_ability_effects {
                    debug!(
                        phase = config.phase_index,
                        %error,
                        code = error.error_code(),
                        "phase abilities and tags skipped"
                    );
                }
            }
        }

        self.effects_applied = true;
        self.multipliers = config.multipliers();
        if !self.multipliers.is_neutral() {
            match scope.env.require_stats() {
                Ok(stats) => stats.apply_multipliers(self.multipliers),
                Err(error) => debug!(
                    phase = config.phase_index,
                    %error,
                    code = error.error_code(),
                    "multipliers kept locally"
                ),
            }
        }
    }

    fn remove_phase_effects(&mut self, phase: u32, scope: &mut PhaseScope<'_, '_>) {
        let definition = scope.definition;
        let grants = std::mem::take(&mut self.grants);
        match scope.env.require_abilities() {
            Ok(host) => {
                for grant in &grants {
                    debug!(phase, ability = %grant.ability, handle = %grant.handle, "phase ability revoked");
                    host.remove_ability(grant.handle);
                }
                if let Some(config) = definition.phase(phase).filter(|_| self.effects_applied) {
                    if !config.tags_to_apply.is_empty() {
                        host.remove_loose_tags(&config.tags_to_apply);
                    }
                }
            }
            Err(error) if !grants.is_empty() => {
                warn!(
                    phase,
                    count = grants.len(),
                    %error,
                    code = error.error_code(),
                    "phase grants dropped"
                );
            }
            Err(_) => {}
        }

        self.effects_applied = false;

        if !self.multipliers.is_neutral() {
            self.multipliers = StatMultipliers::NEUTRAL;
            if let Some(stats) = scope.env.stats() {
                stats.apply_multipliers(StatMultipliers::NEUTRAL);
            }
        }
    }

    /// Removes a tracked grant of `ability` if there is one, otherwise
    /// whatever instance the host reports.
    fn remove_ability(&mut self, ability: &AbilityRef, host: &mut (dyn AbilityHost + '_)) {
        let tracked = self
            .grants
            .iter()
            .position(|grant| &grant.ability == ability)
            .map(|index| self.grants.remove(index).handle);

        match tracked.or_else(|| host.find_ability(ability)) {
            Some(handle) => {
                debug!(%ability, %handle, "phase removed ability");
                host.remove_ability(handle);
            }
            None => debug!(%ability, "ability to remove is not held"),
        }
    }
}

fn play_transition_visuals(config: &PhaseConfig, env: &mut EncounterEnv<'_>) {
    if config.transition_montage.is_none() && config.transition_effect.is_none() {
        return;
    }
    let presentation = match env.require_presentation() {
        Ok(presentation) => presentation,
        Err(error) => {
            debug!(
                phase = config.phase_index,
                %error,
                code = error.error_code(),
                "transition visuals skipped"
            );
            return;
        }
    };
    if let Some(montage) = &config.transition_montage {
        presentation.play_montage(montage);
    }
    if let Some(effect) = &config.transition_effect {
        presentation.spawn_effect_at_actor(effect);
    }
}
