//! Async orchestration around a single boss encounter.
//!
//! The [`Runtime`] spawns a simulation worker that owns the authoritative
//! [`encounter_core::BossEncounter`] together with a [`HeadlessBoss`] host.
//! Clients drive it through a cloneable [`RuntimeHandle`] and observe it
//! through the topic-routed [`EventBus`].
pub mod api;
pub mod boss;
pub mod events;
pub mod runtime;

mod workers;

pub use api::{Result, RuntimeError, RuntimeHandle};
pub use boss::{DamageOutcome, HeadlessBoss};
pub use events::{Event, EventBus, HealthEvent, Topic};
pub use runtime::{Runtime, RuntimeBuilder, RuntimeConfig};
pub use workers::EncounterSnapshot;
