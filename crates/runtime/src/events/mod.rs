//! Topic-based event bus for runtime events.
//!
//! Every [`encounter_core::EncounterEvent`] the simulation worker observes is
//! republished here, routed by topic so consumers subscribe only to what
//! they render.

mod bus;

pub use bus::{Event, EventBus, HealthEvent, Topic};
