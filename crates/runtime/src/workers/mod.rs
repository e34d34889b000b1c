//! Worker tasks that back the runtime orchestration.
//!
//! The simulation worker owns the encounter and executes every command
//! against it in arrival order.

mod simulation;

pub use simulation::{Command, EncounterSnapshot, SimulationWorker};
