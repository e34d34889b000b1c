//! Runs one attack pattern at a time.
//!
//! Single, simultaneous and random patterns finish inside the call that
//! starts them. Sequence patterns step through their ability list on timers
//! and finish from [`BossEncounter::tick`](crate::BossEncounter::tick).

use tracing::{debug, info, warn};

use crate::ability::{AbilityHandle, AbilityRef};
use crate::cooldown::CooldownTracker;
use crate::definition::{AttackPattern, ExecutionMode};
use crate::error::{EncounterFault, ErrorSeverity};
use crate::event::EncounterEvent;
use crate::host::{BossHooks, EncounterEnv};
use crate::rng::RandomStream;
use crate::schedule::TimerQueue;

/// Why a pattern could not be started.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum PatternError {
    #[error("unknown pattern '{name}'")]
    UnknownPattern { name: String },

    #[error("pattern '{name}' is on cooldown ({remaining:.2}s left)")]
    OnCooldown { name: String, remaining: f32 },

    #[error("pattern '{current}' is running and cannot be interrupted")]
    NotInterruptible { current: String },

    #[error("pattern '{name}' is not valid in phase {phase}")]
    InvalidPhase { name: String, phase: u32 },

    #[error("pattern '{name}' is missing a required tag")]
    MissingRequiredTags { name: String },

    #[error("pattern '{name}' is blocked by an owned tag")]
    BlockedByTags { name: String },

    #[error("no pattern is available")]
    NoPatternAvailable,
}

impl EncounterFault for PatternError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::UnknownPattern { .. } => ErrorSeverity::Validation,
            _ => ErrorSeverity::Recoverable,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::UnknownPattern { .. } => "unknown_pattern",
            Self::OnCooldown { .. } => "on_cooldown",
            Self::NotInterruptible { .. } => "not_interruptible",
            Self::InvalidPhase { .. } => "invalid_phase",
            Self::MissingRequiredTags { .. } => "missing_required_tags",
            Self::BlockedByTags { .. } => "blocked_by_tags",
            Self::NoPatternAvailable => "no_pattern_available",
        }
    }
}

/// Progress of the running pattern.
///
/// `active_pattern` is a snapshot taken at start, so later edits to the
/// catalog do not affect a pattern mid-flight.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PatternRuntimeState {
    pub is_executing: bool,
    pub current_pattern: Option<String>,
    pub active_pattern: Option<AttackPattern>,
    /// Next ability to activate in a sequence.
    pub ability_index: usize,
    /// Zero-based pass through the ability list.
    pub repeat_index: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum PatternStep {
    NextAbility,
    RestartSequence,
}

/// Everything a pattern touches outside the executor for one call.
pub(crate) struct ExecutionScope<'s, 'e> {
    pub now: f64,
    pub ability_level: u32,
    pub cooldowns: &'s mut CooldownTracker,
    pub rng: &'s mut RandomStream,
    pub hooks: &'s mut dyn BossHooks,
    pub env: &'s mut EncounterEnv<'e>,
}

#[derive(Debug, Default)]
pub struct PatternExecutor {
    state: PatternRuntimeState,
    timers: TimerQueue<PatternStep>,
    temporary_grants: Vec<AbilityHandle>,
}

impl PatternExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &PatternRuntimeState {
        &self.state
    }

    pub fn is_executing(&self) -> bool {
        self.state.is_executing
    }

    pub fn current_pattern(&self) -> Option<&str> {
        self.state.current_pattern.as_deref()
    }

    /// Abilities granted for the running pattern, revoked when it ends.
    pub fn temporary_grants(&self) -> &[AbilityHandle] {
        &self.temporary_grants
    }

    pub fn pending_steps(&self) -> usize {
        self.timers.len()
    }

    /// Checks whether `pattern` may start now.
    ///
    /// Gates run in a fixed order: cooldown, interruptibility of the running
    /// pattern, phase, required tags, blocking tags. Required tags fail when
    /// no ability host is available to answer; blocking tags pass.
    ///
    /// # Errors
    ///
    /// Returns the first gate that fails.
    pub fn can_execute(
        &self,
        pattern: &AttackPattern,
        phase: u32,
        cooldowns: &CooldownTracker,
        env: &EncounterEnv<'_>,
    ) -> Result<(), PatternError> {
        if cooldowns.is_on_cooldown(&pattern.name) {
            return Err(PatternError::OnCooldown {
                name: pattern.name.clone(),
                remaining: cooldowns.remaining(&pattern.name),
            });
        }

        if let Some(active) = self.state.active_pattern.as_ref() {
            if self.state.is_executing && !active.can_be_interrupted {
                return Err(PatternError::NotInterruptible {
                    current: active.name.clone(),
                });
            }
        }

        if !pattern.is_valid_in_phase(phase) {
            return Err(PatternError::InvalidPhase {
                name: pattern.name.clone(),
                phase,
            });
        }

        let host = env.abilities_ref();

        if !pattern.required_tags.is_empty()
            && !host.is_some_and(|host| host.has_all_tags(&pattern.required_tags))
        {
            return Err(PatternError::MissingRequiredTags {
                name: pattern.name.clone(),
            });
        }

        if !pattern.blocked_by_tags.is_empty()
            && host.is_some_and(|host| host.has_any_tags(&pattern.blocked_by_tags))
        {
            return Err(PatternError::BlockedByTags {
                name: pattern.name.clone(),
            });
        }

        Ok(())
    }

    /// Starts `pattern`, stopping whatever was running first.
    ///
    /// Gating is the caller's job; see [`can_execute`](Self::can_execute).
    pub(crate) fn start(&mut self, pattern: &AttackPattern, scope: &mut ExecutionScope<'_, '_>) {
        if self.state.is_executing {
            self.stop(scope);
        }

        if pattern.abilities.is_empty() {
            warn!(pattern = %pattern.name, "pattern has no abilities");
        }

        self.state = PatternRuntimeState {
            is_executing: true,
            current_pattern: Some(pattern.name.clone()),
            active_pattern: Some(pattern.clone()),
            ability_index: 0,
            repeat_index: 0,
        };

        info!(
            pattern = %pattern.name,
            mode = %pattern.execution_mode,
            abilities = pattern.abilities.len(),
            "pattern started"
        );
        scope.env.notify(EncounterEvent::PatternStarted {
            name: pattern.name.clone(),
        });
        scope.hooks.on_pattern_start(&pattern.name);

        match pattern.execution_mode {
            ExecutionMode::Single => {
                if let Some(ability) = pattern.abilities.first() {
                    self.activate(ability, scope);
                }
                self.complete(scope);
            }
            ExecutionMode::Simultaneous => {
                for ability in &pattern.abilities {
                    self.activate(ability, scope);
                }
                self.complete(scope);
            }
            ExecutionMode::Random => {
                let picked = scope
                    .rng
                    .pick_index(pattern.abilities.len(), RandomStream::ABILITY_PICK);
                match picked.and_then(|index| pattern.abilities.get(index)) {
                    Some(ability) => self.activate(ability, scope),
                    None => warn!(pattern = %pattern.name, index = ?picked, "random pick out of range"),
                }
                self.complete(scope);
            }
            ExecutionMode::Sequence => {
                let now = scope.now;
                self.run_sequence(now, scope);
            }
        }
    }

    /// Runs sequence steps that came due at or before `scope.now`.
    pub(crate) fn advance(&mut self, scope: &mut ExecutionScope<'_, '_>) {
        while let Some(due) = self.timers.pop_due(scope.now) {
            if !self.state.is_executing {
                break;
            }
            debug!(
                pattern = ?self.state.current_pattern,
                step = ?due.payload,
                at = due.fire_at,
                "sequence step due"
            );
            self.run_sequence(due.fire_at, scope);
        }
    }

    /// Interrupts the running pattern without starting its cooldown.
    /// Returns false if nothing was running.
    pub(crate) fn stop(&mut self, scope: &mut ExecutionScope<'_, '_>) -> bool {
        if !self.state.is_executing {
            return false;
        }
        let name = self.state.current_pattern.clone().unwrap_or_default();
        info!(pattern = %name, "pattern stopped");
        self.finish(&name, false, scope);
        true
    }

    /// Activates abilities from the current index until the list is
    /// exhausted or a delay is needed. Delays are measured from `at`, the
    /// time the previous step was due.
    fn run_sequence(&mut self, at: f64, scope: &mut ExecutionScope<'_, '_>) {
        loop {
            let Some(pattern) = self.state.active_pattern.as_ref() else {
                return;
            };
            let next = pattern.abilities.get(self.state.ability_index).cloned();
            let len = pattern.abilities.len();
            let ability_delay = pattern.ability_delay;
            let repeat_count = pattern.repeat_count;
            let repeat_delay = pattern.repeat_delay;

            if let Some(ability) = next {
                self.activate(&ability, scope);
                self.state.ability_index += 1;
            }

            if self.state.ability_index < len {
                if ability_delay > 0.0 {
                    self.timers.schedule(at, ability_delay, PatternStep::NextAbility);
                    return;
                }
                continue;
            }

            if self.state.repeat_index + 1 < repeat_count {
                self.state.repeat_index += 1;
                self.state.ability_index = 0;
                debug!(
                    pattern = ?self.state.current_pattern,
                    pass = self.state.repeat_index + 1,
                    of = repeat_count,
                    "sequence repeating"
                );
                if repeat_delay > 0.0 {
                    self.timers.schedule(at, repeat_delay, PatternStep::RestartSequence);
                    return;
                }
                continue;
            }

            self.complete(scope);
            return;
        }
    }

    fn activate(&mut self, ability: &AbilityRef, scope: &mut ExecutionScope<'_, '_>) {
        let level = scope.ability_level;
        let host = match scope.env.require_abilities() {
            Ok(host) => host,
            Err(error) => {
                debug!(%ability, %error, code = error.error_code(), "activation skipped");
                return;
            }
        };

        if !host.has_ability(ability) {
            let handle = host.grant_ability(ability, level);
            debug!(%ability, %handle, level, "granted ability for pattern");
            self.temporary_grants.push(handle);
        }

        if !host.try_activate_ability(ability) {
            debug!(%ability, "ability activation refused");
        }
    }

    fn complete(&mut self, scope: &mut ExecutionScope<'_, '_>) {
        let Some(pattern) = self.state.active_pattern.take() else {
            return;
        };
        scope.cooldowns.set(&pattern.name, pattern.cooldown);
        info!(pattern = %pattern.name, cooldown = pattern.cooldown, "pattern completed");
        self.finish(&pattern.name, true, scope);
    }

    fn finish(&mut self, name: &str, completed: bool, scope: &mut ExecutionScope<'_, '_>) {
        self.timers.clear();
        self.revoke_temporary_grants(scope.env);
        self.state = PatternRuntimeState::default();

        scope.env.notify(EncounterEvent::PatternEnded {
            name: name.to_owned(),
            completed,
        });
        scope.hooks.on_pattern_end(name, completed);
    }

    fn revoke_temporary_grants(&mut self, env: &mut EncounterEnv<'_>) {
        if self.temporary_grants.is_empty() {
            return;
        }
        match env.require_abilities() {
            Ok(host) => {
                for handle in self.temporary_grants.drain(..) {
                    host.remove_ability(handle);
                }
            }
            Err(error) => {
                warn!(
                    count = self.temporary_grants.len(),
                    %error,
                    code = error.error_code(),
                    "dropping temporary grants"
                );
                self.temporary_grants.clear();
            }
        }
    }
}
