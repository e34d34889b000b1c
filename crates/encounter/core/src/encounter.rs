//! The root controller of one boss fight.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::EncounterConfig;
use crate::cooldown::CooldownTracker;
use crate::definition::{AttackPattern, BossDefinition, DefinitionError, StatMultipliers};
use crate::error::{EncounterFault, ErrorSeverity};
use crate::event::EncounterEvent;
use crate::executor::{ExecutionScope, PatternError, PatternExecutor, PatternRuntimeState};
use crate::host::{BossHooks, EncounterEnv, NoHooks};
use crate::phase::{PhaseError, PhaseScope, PhaseTransitionController};
use crate::rng::RandomStream;
use crate::selector::PatternSelector;

/// Lifecycle call made in the wrong state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum EncounterError {
    #[error("encounter is already active")]
    AlreadyActive,

    #[error("encounter is not active")]
    NotActive,
}

impl EncounterFault for EncounterError {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Recoverable
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::AlreadyActive => "already_active",
            Self::NotActive => "not_active",
        }
    }
}

/// A health-changed callback from the boss's attribute set.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HealthChange {
    pub old_value: f32,
    pub new_value: f32,
    pub max_value: f32,
}

impl HealthChange {
    pub fn new(old_value: f32, new_value: f32, max_value: f32) -> Self {
        Self {
            old_value,
            new_value,
            max_value,
        }
    }

    /// New health as a fraction of max, clamped to `[0, 1]`.
    /// `None` when max is not a positive number.
    pub fn fraction(&self) -> Option<f32> {
        if !(self.max_value.is_finite() && self.max_value > 0.0) || self.new_value.is_nan() {
            return None;
        }
        Some((self.new_value / self.max_value).clamp(0.0, 1.0))
    }
}

/// Observable snapshot of an encounter, for HUDs and one-way state sync.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EncounterState {
    pub encounter_active: bool,
    pub current_phase: u32,
    pub is_transitioning_phase: bool,
    pub health_fraction: f32,
    pub executing_pattern: Option<String>,
    /// Seconds of simulation time since the encounter started.
    pub elapsed: f32,
}

/// Owns the encounter lifecycle, the phase controller, the pattern executor
/// and the cooldowns.
///
/// Each frame the caller invokes [`tick`](Self::tick). Within a tick,
/// cooldowns decay first, then phase transition timers fire, then pattern
/// steps run, so a pattern that just completed sees its own fresh cooldown.
pub struct BossEncounter {
    definition: Arc<BossDefinition>,
    config: EncounterConfig,
    active: bool,
    now: f64,
    health_fraction: f32,
    phases: PhaseTransitionController,
    executor: PatternExecutor,
    cooldowns: CooldownTracker,
    rng: RandomStream,
    hooks: Box<dyn BossHooks>,
}

impl BossEncounter {
    /// Validates `definition` and builds an inactive encounter in phase 0.
    ///
    /// # Errors
    ///
    /// Returns the first problem [`BossDefinition::validate`] finds.
    pub fn new(
        definition: impl Into<Arc<BossDefinition>>,
        config: EncounterConfig,
    ) -> Result<Self, DefinitionError> {
        let definition = definition.into();
        definition.validate()?;

        debug!(
            boss = %definition.name,
            phases = definition.phase_count(),
            patterns = definition.patterns.len(),
            seed = config.rng_seed,
            "encounter created"
        );

        Ok(Self {
            rng: RandomStream::new(config.rng_seed),
            definition,
            config,
            active: false,
            now: 0.0,
            health_fraction: 1.0,
            phases: PhaseTransitionController::new(),
            executor: PatternExecutor::new(),
            cooldowns: CooldownTracker::new(),
            hooks: Box::new(NoHooks),
        })
    }

    #[must_use]
    pub fn with_hooks(mut self, hooks: impl BossHooks + 'static) -> Self {
        self.hooks = Box::new(hooks);
        self
    }

    #[must_use]
    pub fn with_boxed_hooks(mut self, hooks: Box<dyn BossHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    /// Replaces the random stream, e.g. to inject a scripted oracle.
    #[must_use]
    pub fn with_random_stream(mut self, rng: RandomStream) -> Self {
        self.rng = rng;
        self
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Starts the fight.
    ///
    /// Anything left over from a previous run (phase effects, cooldowns, a
    /// running pattern) is cleared first. With `apply_initial_phase` set the
    /// phase 0 config is applied without transition visuals.
    ///
    /// # Errors
    ///
    /// Returns [`EncounterError::AlreadyActive`] if the encounter is running.
    pub fn start_encounter(&mut self, env: &mut EncounterEnv<'_>) -> Result<(), EncounterError> {
        if self.active {
            warn!(boss = %self.definition.name, "encounter already active");
            return Err(EncounterError::AlreadyActive);
        }

        self.stop_current_pattern(env);
        {
            let (phases, mut scope) = self.split_phase_scope(env);
            phases.reset(&mut scope);
        }
        self.cooldowns.clear();
        self.now = 0.0;
        self.health_fraction = 1.0;
        self.active = true;

        if self.config.apply_initial_phase {
            let (phases, mut scope) = self.split_phase_scope(env);
            phases.apply_initial(&mut scope);
        }

        info!(boss = %self.definition.name, "encounter started");
        env.notify(EncounterEvent::EncounterStarted);
        self.hooks.on_encounter_start();
        Ok(())
    }

    /// Ends the fight. In-flight patterns and phase transitions are left to
    /// finish on later ticks.
    ///
    /// # Errors
    ///
    /// Returns [`EncounterError::NotActive`] if no encounter is running.
    pub fn end_encounter(
        &mut self,
        defeated: bool,
        env: &mut EncounterEnv<'_>,
    ) -> Result<(), EncounterError> {
        if !self.active {
            debug!(boss = %self.definition.name, "end requested with no active encounter");
            return Err(EncounterError::NotActive);
        }

        self.active = false;
        info!(boss = %self.definition.name, defeated, "encounter ended");
        env.notify(EncounterEvent::EncounterEnded { defeated });
        self.hooks.on_encounter_end(defeated);
        Ok(())
    }

    /// Advances simulation time by `dt` seconds. Non-positive or
    /// non-finite steps are ignored.
    pub fn tick(&mut self, dt: f32, env: &mut EncounterEnv<'_>) {
        if !(dt.is_finite() && dt > 0.0) {
            return;
        }
        self.now += f64::from(dt);

        self.cooldowns.tick(dt);

        {
            let (phases, mut scope) = self.split_phase_scope(env);
            phases.advance(&mut scope);
        }

        let (executor, mut scope) = self.split_execution_scope(env);
        executor.advance(&mut scope);
    }

    // ------------------------------------------------------------------
    // Phases
    // ------------------------------------------------------------------

    /// Forces a transition to `phase` regardless of health.
    ///
    /// # Errors
    ///
    /// Returns a [`PhaseError`] when `phase` is the current phase, lies
    /// behind it, or another transition is still open.
    pub fn set_phase(&mut self, phase: u32, env: &mut EncounterEnv<'_>) -> Result<(), PhaseError> {
        let (phases, mut scope) = self.split_phase_scope(env);
        phases
            .start_transition(phase, &mut scope)
            .inspect_err(|error| debug!(%error, "phase change rejected"))
    }

    pub fn can_transition_phase(&self) -> bool {
        self.phases.can_transition()
    }

    /// Feeds a health change through the phase thresholds.
    ///
    /// Returns the phase a transition was started for, if any. Crossings
    /// that arrive while a transition is open are dropped, not queued.
    pub fn on_health_changed(
        &mut self,
        change: HealthChange,
        env: &mut EncounterEnv<'_>,
    ) -> Option<u32> {
        if !self.active {
            debug!("health change ignored, encounter inactive");
            return None;
        }
        let Some(fraction) = change.fraction() else {
            warn!(max = change.max_value, "health change with non-positive max ignored");
            return None;
        };
        self.health_fraction = fraction;

        let current = self.phases.current_phase();
        let target = self.definition.phase_for_health(fraction);
        if target <= current {
            return None;
        }
        if !self.phases.can_transition() {
            debug!(
                current,
                target,
                fraction,
                "threshold crossed during transition, dropped"
            );
            return None;
        }

        debug!(
            old = change.old_value,
            new = change.new_value,
            fraction,
            target,
            "health threshold crossed"
        );
        self.set_phase(target, env).ok().map(|()| target)
    }

    // ------------------------------------------------------------------
    // Patterns
    // ------------------------------------------------------------------

    /// Starts the named pattern if every gate passes.
    ///
    /// # Errors
    ///
    /// Returns [`PatternError::UnknownPattern`] for names missing from the
    /// catalog, otherwise the first failing gate.
    pub fn execute_pattern(
        &mut self,
        name: &str,
        env: &mut EncounterEnv<'_>,
    ) -> Result<(), PatternError> {
        let definition = Arc::clone(&self.definition);
        let pattern = Self::lookup(&definition, name)?;
        self.executor
            .can_execute(pattern, self.phases.current_phase(), &self.cooldowns, env)
            .inspect_err(|error| debug!(%error, "pattern rejected"))?;
        self.start_pattern(pattern, env);
        Ok(())
    }

    /// Checks the gates for `name` without starting it.
    ///
    /// # Errors
    ///
    /// Same as [`execute_pattern`](Self::execute_pattern).
    pub fn can_execute_pattern(&self, name: &str, env: &EncounterEnv<'_>) -> Result<(), PatternError> {
        let pattern = Self::lookup(&self.definition, name)?;
        self.executor
            .can_execute(pattern, self.phases.current_phase(), &self.cooldowns, env)
    }

    /// Names of the patterns that could start now, in catalog order.
    pub fn available_patterns(&self, env: &EncounterEnv<'_>) -> Vec<&str> {
        self.eligible(&self.definition, env)
            .into_iter()
            .map(|pattern| pattern.name.as_str())
            .collect()
    }

    /// Picks one eligible pattern by weight and starts it.
    ///
    /// # Errors
    ///
    /// Returns [`PatternError::NoPatternAvailable`] when nothing passes the
    /// gates.
    pub fn execute_random_pattern(
        &mut self,
        env: &mut EncounterEnv<'_>,
    ) -> Result<String, PatternError> {
        let definition = Arc::clone(&self.definition);
        let candidates = self.eligible(&definition, env);
        let Some(pattern) = PatternSelector::select(&candidates, &mut self.rng) else {
            debug!(phase = self.phases.current_phase(), "no pattern available");
            return Err(PatternError::NoPatternAvailable);
        };
        self.start_pattern(pattern, env);
        Ok(pattern.name.clone())
    }

    /// Stops the running pattern without starting its cooldown. Returns
    /// false if nothing was running.
    pub fn stop_current_pattern(&mut self, env: &mut EncounterEnv<'_>) -> bool {
        let (executor, mut scope) = self.split_execution_scope(env);
        executor.stop(&mut scope)
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn definition(&self) -> &BossDefinition {
        &self.definition
    }

    pub fn shared_definition(&self) -> Arc<BossDefinition> {
        Arc::clone(&self.definition)
    }

    pub fn config(&self) -> &EncounterConfig {
        &self.config
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn current_phase(&self) -> u32 {
        self.phases.current_phase()
    }

    pub fn is_transitioning_phase(&self) -> bool {
        self.phases.is_transitioning()
    }

    pub fn health_fraction(&self) -> f32 {
        self.health_fraction
    }

    pub fn elapsed(&self) -> f32 {
        self.now as f32
    }

    pub fn is_executing_pattern(&self) -> bool {
        self.executor.is_executing()
    }

    pub fn current_pattern(&self) -> Option<&str> {
        self.executor.current_pattern()
    }

    pub fn pattern_state(&self) -> &PatternRuntimeState {
        self.executor.state()
    }

    pub fn cooldowns(&self) -> &CooldownTracker {
        &self.cooldowns
    }

    pub fn phases(&self) -> &PhaseTransitionController {
        &self.phases
    }

    pub fn executor(&self) -> &PatternExecutor {
        &self.executor
    }

    pub fn current_multipliers(&self) -> StatMultipliers {
        self.phases.current_multipliers()
    }

    pub fn state(&self) -> EncounterState {
        EncounterState {
            encounter_active: self.active,
            current_phase: self.phases.current_phase(),
            is_transitioning_phase: self.phases.is_transitioning(),
            health_fraction: self.health_fraction,
            executing_pattern: self.executor.current_pattern().map(str::to_owned),
            elapsed: self.now as f32,
        }
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn lookup<'d>(
        definition: &'d BossDefinition,
        name: &str,
    ) -> Result<&'d AttackPattern, PatternError> {
        definition.pattern(name).ok_or_else(|| {
            warn!(boss = %definition.name, pattern = name, "unknown pattern");
            PatternError::UnknownPattern {
                name: name.to_owned(),
            }
        })
    }

    fn eligible<'d>(
        &self,
        definition: &'d BossDefinition,
        env: &EncounterEnv<'_>,
    ) -> Vec<&'d AttackPattern> {
        let phase = self.phases.current_phase();
        definition
            .patterns
            .iter()
            .filter(|pattern| {
                self.executor
                    .can_execute(pattern, phase, &self.cooldowns, env)
                    .is_ok()
            })
            .collect()
    }

    fn start_pattern(&mut self, pattern: &AttackPattern, env: &mut EncounterEnv<'_>) {
        let (executor, mut scope) = self.split_execution_scope(env);
        executor.start(pattern, &mut scope);
    }

    fn split_phase_scope<'s, 'e>(
        &'s mut self,
        env: &'s mut EncounterEnv<'e>,
    ) -> (&'s mut PhaseTransitionController, PhaseScope<'s, 'e>) {
        let Self {
            definition,
            config,
            now,
            phases,
            hooks,
            ..
        } = self;
        let scope = PhaseScope {
            now: *now,
            definition: &**definition,
            config: &*config,
            hooks: hooks.as_mut(),
            env,
        };
        (phases, scope)
    }

    fn split_execution_scope<'s, 'e>(
        &'s mut self,
        env: &'s mut EncounterEnv<'e>,
    ) -> (&'s mut PatternExecutor, ExecutionScope<'s, 'e>) {
        let Self {
            config,
            now,
            executor,
            cooldowns,
            rng,
            hooks,
            ..
        } = self;
        let scope = ExecutionScope {
            now: *now,
            ability_level: config.temporary_ability_level,
            cooldowns,
            rng,
            hooks: hooks.as_mut(),
            env,
        };
        (executor, scope)
    }
}

impl std::fmt::Debug for BossEncounter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BossEncounter")
            .field("boss", &self.definition.name)
            .field("active", &self.active)
            .field("now", &self.now)
            .field("phases", &self.phases)
            .field("executor", &self.executor)
            .field("cooldowns", &self.cooldowns)
            .field("rng", &self.rng)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::{ExecutionMode, PhaseConfig};
    use crate::host::EventLog;
    use crate::memory::MemoryBoss;

    fn definition() -> BossDefinition {
        BossDefinition::new("Warden")
            .with_thresholds([0.66, 0.33])
            .with_phase(PhaseConfig::new(0).applying_tags(["Phase.Opening"].into_iter().collect()))
            .with_phase(PhaseConfig::new(1).with_transition(1.0, true))
            .with_pattern(AttackPattern::new("Slam", ExecutionMode::Single).with_cooldown(3.0))
    }

    fn encounter() -> BossEncounter {
        BossEncounter::new(definition(), EncounterConfig::default()).unwrap()
    }

    #[test]
    fn rejects_invalid_definition() {
        let broken = BossDefinition::new("Broken").with_thresholds([0.3, 0.6]);
        assert!(matches!(
            BossEncounter::new(broken, EncounterConfig::default()),
            Err(DefinitionError::ThresholdsNotDescending { index: 1 })
        ));
    }

    #[test]
    fn start_applies_initial_phase() {
        let mut boss = MemoryBoss::new();
        let mut log = EventLog::new();
        let mut encounter = encounter();

        encounter.start_encounter(&mut boss.env(&mut log)).unwrap();

        assert!(encounter.is_active());
        assert!(boss.abilities.has_tag("Phase.Opening"));
        assert_eq!(log.events(), &[EncounterEvent::EncounterStarted]);
    }

    #[test]
    fn initial_phase_can_be_skipped() {
        let mut boss = MemoryBoss::new();
        let mut log = EventLog::new();
        let config = EncounterConfig::default().with_initial_phase(false);
        let mut encounter = BossEncounter::new(definition(), config).unwrap();

        encounter.start_encounter(&mut boss.env(&mut log)).unwrap();

        assert!(!boss.abilities.has_tag("Phase.Opening"));
    }

    #[test]
    fn health_is_ignored_while_inactive() {
        let mut log = EventLog::new();
        let mut env = EncounterEnv::empty().with_sink(&mut log);
        let mut encounter = encounter();

        let triggered = encounter.on_health_changed(HealthChange::new(100.0, 10.0, 100.0), &mut env);

        assert_eq!(triggered, None);
        assert_eq!(encounter.current_phase(), 0);
        assert_eq!(encounter.health_fraction(), 1.0);
    }

    #[test]
    fn zero_max_health_is_ignored() {
        let mut env = EncounterEnv::empty();
        let mut encounter = encounter();
        encounter.start_encounter(&mut env).unwrap();

        let triggered = encounter.on_health_changed(HealthChange::new(0.0, 0.0, 0.0), &mut env);

        assert_eq!(triggered, None);
        assert_eq!(encounter.current_phase(), 0);
    }

    #[test]
    fn fraction_is_clamped() {
        assert_eq!(HealthChange::new(0.0, 150.0, 100.0).fraction(), Some(1.0));
        assert_eq!(HealthChange::new(0.0, -5.0, 100.0).fraction(), Some(0.0));
        assert_eq!(HealthChange::new(0.0, 5.0, -1.0).fraction(), None);
    }

    #[test]
    fn bad_time_steps_are_ignored() {
        let mut env = EncounterEnv::empty();
        let mut encounter = encounter();
        encounter.tick(0.0, &mut env);
        encounter.tick(-1.0, &mut env);
        encounter.tick(f32::NAN, &mut env);
        assert_eq!(encounter.elapsed(), 0.0);

        encounter.tick(0.25, &mut env);
        assert_eq!(encounter.elapsed(), 0.25);
    }

    #[test]
    fn restart_clears_previous_run() {
        let mut boss = MemoryBoss::new();
        let mut log = EventLog::new();
        let mut encounter = encounter();

        encounter.start_encounter(&mut boss.env(&mut log)).unwrap();
        encounter.execute_pattern("Slam", &mut boss.env(&mut log)).unwrap();
        encounter.set_phase(1, &mut boss.env(&mut log)).unwrap();
        encounter.end_encounter(true, &mut boss.env(&mut log)).unwrap();
        assert!(encounter.cooldowns().is_on_cooldown("Slam"));

        encounter.start_encounter(&mut boss.env(&mut log)).unwrap();

        assert_eq!(encounter.current_phase(), 0);
        assert!(!encounter.is_transitioning_phase());
        assert!(encounter.cooldowns().is_empty());
        assert!(!boss.abilities.has_tag("State.Invulnerable"));
        assert!(boss.abilities.has_tag("Phase.Opening"));
        assert_eq!(encounter.elapsed(), 0.0);
    }

    #[test]
    fn state_snapshot_tracks_controller() {
        let mut boss = MemoryBoss::new();
        let mut log = EventLog::new();
        let mut encounter = encounter();
        encounter.start_encounter(&mut boss.env(&mut log)).unwrap();

        let triggered =
            encounter.on_health_changed(HealthChange::new(100.0, 50.0, 100.0), &mut boss.env(&mut log));
        assert_eq!(triggered, Some(1));
        encounter.tick(0.5, &mut boss.env(&mut log));

        assert_eq!(
            encounter.state(),
            EncounterState {
                encounter_active: true,
                current_phase: 1,
                is_transitioning_phase: true,
                health_fraction: 0.5,
                executing_pattern: None,
                elapsed: 0.5,
            }
        );
    }

    #[test]
    fn available_patterns_follow_cooldowns() {
        let mut boss = MemoryBoss::new();
        let mut log = EventLog::new();
        let mut encounter = encounter();

        assert_eq!(encounter.available_patterns(&boss.env(&mut log)), vec!["Slam"]);
        encounter.execute_pattern("Slam", &mut boss.env(&mut log)).unwrap();
        assert!(encounter.available_patterns(&boss.env(&mut log)).is_empty());
    }
}
