//! Headless boss fight simulator.
//!
//! # Architecture
//!
//! ```text
//! encounter-sim (binary)
//!   ├─→ SimConfig (environment / .env)
//!   ├─→ encounter-content (boss + encounter config loading)
//!   ├─→ runtime (simulation worker, handle, event bus)
//!   └─→ fight (scripted damage + random-pattern boss AI)
//! ```
pub mod config;
pub mod fight;
pub mod logging;

use std::sync::Arc;

use anyhow::Result;
use encounter_content::{BossRegistry, ConfigLoader};
use encounter_core::{BossDefinition, EncounterConfig};

pub use config::SimConfig;
pub use fight::{FightOutcome, FightReport, run_scripted_fight};

/// Resolves the boss named by `sim.boss` against the bundled registry, then
/// the filesystem.
pub fn resolve_boss(sim: &SimConfig) -> Result<Arc<BossDefinition>> {
    let registry = BossRegistry::bundled()?;
    registry.resolve(&sim.boss)
}

/// Loads the encounter settings file if one is configured, else the bundled
/// defaults.
pub fn resolve_encounter_config(sim: &SimConfig) -> Result<EncounterConfig> {
    match &sim.encounter_config {
        Some(path) => ConfigLoader::load(path),
        None => ConfigLoader::bundled(),
    }
}
