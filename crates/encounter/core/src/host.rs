//! Capabilities the encounter consumes from its surroundings.
//!
//! The boss lives inside an engine that owns the ability system, animation,
//! VFX and stats. The core reaches them only through the traits below. The
//! [`EncounterEnv`] bundle carries whichever hosts are available for one call;
//! a missing host turns the operations that need it into logged no-ops.

use crate::ability::{AbilityHandle, AbilityRef, AssetRef};
use crate::definition::StatMultipliers;
use crate::error::{EncounterFault, ErrorSeverity};
use crate::event::EncounterEvent;
use crate::tags::TagSet;

/// Ability system owned by the boss actor (grants, activation, loose tags).
pub trait AbilityHost {
    /// Returns true if the boss currently holds an instance of `ability`.
    fn has_ability(&self, ability: &AbilityRef) -> bool;

    /// Attempts to activate a held instance. Activation gating belongs to the
    /// ability; a `false` here is not a pattern failure.
    fn try_activate_ability(&mut self, ability: &AbilityRef) -> bool;

    fn grant_ability(&mut self, ability: &AbilityRef, level: u32) -> AbilityHandle;

    fn remove_ability(&mut self, handle: AbilityHandle);

    /// Looks up a handle for an ability granted outside the encounter.
    fn find_ability(&self, ability: &AbilityRef) -> Option<AbilityHandle>;

    fn has_all_tags(&self, tags: &TagSet) -> bool;

    fn has_any_tags(&self, tags: &TagSet) -> bool;

    fn add_loose_tags(&mut self, tags: &TagSet);

    fn remove_loose_tags(&mut self, tags: &TagSet);
}

/// Fire-and-forget animation and VFX playback.
pub trait PresentationHost {
    fn play_montage(&mut self, montage: &AssetRef);

    fn spawn_effect_at_actor(&mut self, effect: &AssetRef);
}

/// Receives the stat multipliers of the active phase.
pub trait StatHost {
    fn apply_multipliers(&mut self, multipliers: StatMultipliers);
}

/// Receives encounter notifications (HUD, health bar, analytics).
pub trait NotificationSink {
    fn notify(&mut self, event: &EncounterEvent);
}

/// Overridable reactions to state-machine transitions.
///
/// Called synchronously at the matching transition point, after the state
/// change and before the next step runs. All bodies default to empty.
pub trait BossHooks: Send {
    fn on_encounter_start(&mut self) {}

    fn on_encounter_end(&mut self, _defeated: bool) {}

    fn on_phase_exit(&mut self, _phase: u32) {}

    fn on_phase_enter(&mut self, _phase: u32) {}

    fn on_phase_transition_complete(&mut self, _phase: u32) {}

    fn on_pattern_start(&mut self, _pattern: &str) {}

    fn on_pattern_end(&mut self, _pattern: &str, _completed: bool) {}
}

/// Hooks that do nothing.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoHooks;

impl BossHooks for NoHooks {}

/// Sink that records every event, in order.
#[derive(Clone, Debug, Default)]
pub struct EventLog {
    events: Vec<EncounterEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[EncounterEvent] {
        &self.events
    }

    /// Drains the recorded events.
    pub fn take(&mut self) -> Vec<EncounterEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn count(&self, predicate: impl Fn(&EncounterEvent) -> bool) -> usize {
        self.events.iter().filter(|event| predicate(event)).count()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl NotificationSink for EventLog {
    fn notify(&mut self, event: &EncounterEvent) {
        self.events.push(event.clone());
    }
}

/// A required host was not supplied in the [`EncounterEnv`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum HostError {
    #[error("ability host not available")]
    AbilitiesNotAvailable,
    #[error("presentation host not available")]
    PresentationNotAvailable,
    #[error("stat host not available")]
    StatsNotAvailable,
}

impl EncounterFault for HostError {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Internal
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::AbilitiesNotAvailable => "abilities_not_available",
            Self::PresentationNotAvailable => "presentation_not_available",
            Self::StatsNotAvailable => "stats_not_available",
        }
    }
}

/// Per-call bundle of optional hosts.
///
/// Built with [`EncounterEnv::empty`] and the `with_*` methods:
///
/// ```rust,ignore
/// let mut env = EncounterEnv::empty()
///     .with_abilities(&mut boss)
///     .with_sink(&mut log);
/// encounter.tick(0.016, &mut env);
/// ```
#[derive(Default)]
pub struct EncounterEnv<'a> {
    abilities: Option<&'a mut dyn AbilityHost>,
    presentation: Option<&'a mut dyn PresentationHost>,
    stats: Option<&'a mut dyn StatHost>,
    sink: Option<&'a mut dyn NotificationSink>,
}

impl<'a> EncounterEnv<'a> {
    pub fn empty() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_abilities(mut self, host: &'a mut dyn AbilityHost) -> Self {
        self.abilities = Some(host);
        self
    }

    #[must_use]
    pub fn with_presentation(mut self, host: &'a mut dyn PresentationHost) -> Self {
        self.presentation = Some(host);
        self
    }

    #[must_use]
    pub fn with_stats(mut self, host: &'a mut dyn StatHost) -> Self {
        self.stats = Some(host);
        self
    }

    #[must_use]
    pub fn with_sink(mut self, sink: &'a mut dyn NotificationSink) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn abilities(&mut self) -> Option<&mut (dyn AbilityHost + 'a)> {
        self.abilities.as_deref_mut()
    }

    /// Read-only view of the ability host, for gating checks.
    pub fn abilities_ref(&self) -> Option<&(dyn AbilityHost + 'a)> {
        self.abilities.as_deref()
    }

    /// Returns the ability host, or an error if none was supplied.
    ///
    /// # Errors
    ///
    /// Returns `HostError::AbilitiesNotAvailable` if no ability host was provided.
    pub fn require_abilities(&mut self) -> Result<&mut (dyn AbilityHost + 'a), HostError> {
        self.abilities
            .as_deref_mut()
            .ok_or(HostError::AbilitiesNotAvailable)
    }

    pub fn presentation(&mut self) -> Option<&mut (dyn PresentationHost + 'a)> {
        self.presentation.as_deref_mut()
    }

    /// # Errors
    ///
    /// Returns `HostError::PresentationNotAvailable` if no presentation host was provided.
    pub fn require_presentation(
        &mut self,
    ) -> Result<&mut (dyn PresentationHost + 'a), HostError> {
        self.presentation
            .as_deref_mut()
            .ok_or(HostError::PresentationNotAvailable)
    }

    pub fn stats(&mut self) -> Option<&mut (dyn StatHost + 'a)> {
        self.stats.as_deref_mut()
    }

    /// # Errors
    ///
    /// Returns `HostError::StatsNotAvailable` if no stat host was provided.
    pub fn require_stats(&mut self) -> Result<&mut (dyn StatHost + 'a), HostError> {
        self.stats.as_deref_mut().ok_or(HostError::StatsNotAvailable)
    }

    pub fn has_abilities(&self) -> bool {
        self.abilities.is_some()
    }

    /// Forwards `event` to the sink, if any.
    pub fn notify(&mut self, event: EncounterEvent) {
        tracing::debug!(event = event.as_str(), "encounter notification");
        if let Some(sink) = self.sink.as_deref_mut() {
            sink.notify(&event);
        }
    }
}

impl std::fmt::Debug for EncounterEnv<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncounterEnv")
            .field("abilities", &self.abilities.is_some())
            .field("presentation", &self.presentation.is_some())
            .field("stats", &self.stats.is_some())
            .field("sink", &self.sink.is_some())
            .finish()
    }
}
