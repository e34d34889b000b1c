//! Deterministic boss encounter state machine.
//!
//! `encounter-core` owns the rules of a boss fight: encounter lifecycle,
//! health-threshold phase transitions, and attack-pattern scheduling. It is
//! frame-driven and single-threaded; callers advance it with
//! [`BossEncounter::tick`] and feed health changes through
//! [`BossEncounter::on_health_changed`].
//!
//! Everything outside the state machine (ability system, animation, VFX,
//! stats, UI) is reached through the narrow host traits in [`host`], bundled
//! per call in an [`EncounterEnv`].
//!
//! Modules are organized leaf to root:
//! - [`cooldown`] per-pattern cooldown countdowns
//! - [`selector`] weighted random pattern choice
//! - [`executor`] single-pattern execution (single/sequence/simultaneous/random)
//! - [`phase`] phase transition window and phase effects
//! - [`encounter`] the root controller tying them together
pub mod ability;
pub mod config;
pub mod cooldown;
pub mod definition;
pub mod encounter;
pub mod error;
pub mod event;
pub mod executor;
pub mod host;
pub mod memory;
pub mod phase;
pub mod rng;
pub mod schedule;
pub mod selector;
pub mod tags;

pub use ability::{AbilityHandle, AbilityRef, AssetRef};
pub use config::EncounterConfig;
pub use cooldown::CooldownTracker;
pub use definition::{
    AttackPattern, BossDefinition, DefinitionError, ExecutionMode, PhaseConfig, StatMultipliers,
};
pub use encounter::{BossEncounter, EncounterError, EncounterState, HealthChange};
pub use error::{EncounterFault, ErrorSeverity};
pub use event::EncounterEvent;
pub use executor::{PatternError, PatternExecutor, PatternRuntimeState};
pub use host::{
    AbilityHost, BossHooks, EncounterEnv, EventLog, HostError, NoHooks, NotificationSink,
    PresentationHost, StatHost,
};
pub use memory::{MemoryAbilities, MemoryBoss, RecordingPresentation, RecordingStats};
pub use phase::{PhaseError, PhaseTransitionController};
pub use rng::{PcgRng, RandomStream, RngOracle, compute_seed};
pub use schedule::{DueTimer, TIME_EPSILON, TimerQueue, TimerToken};
pub use selector::PatternSelector;
pub use tags::{Tag, TagSet};
