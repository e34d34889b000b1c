//! Boss encounter simulator binary.
//!
//! Composition root: loads settings, sets up logging, starts the runtime
//! and plays one scripted fight.
//!
//! # Examples
//!
//! ```bash
//! # Bundled boss with default settings
//! cargo run -p encounter-client
//!
//! # Custom boss file, faster kill, replayable seed
//! BOSS_DEFINITION=bosses/golem.ron SIM_DPS=200 ENCOUNTER_SEED=7 cargo run -p encounter-client
//! ```

use anyhow::Result;
use encounter_client::{SimConfig, logging, resolve_boss, resolve_encounter_config, run_scripted_fight};
use runtime::{Runtime, RuntimeConfig};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists (silently ignore if not found)
    let _ = dotenvy::dotenv();

    // 1. Load configuration from environment
    let sim = SimConfig::from_env();

    // 2. Setup logging
    let _log_guard = logging::setup_logging(sim.session_id.as_deref())?;

    // 3. Resolve content
    let boss = resolve_boss(&sim)?;
    let encounter = resolve_encounter_config(&sim)?;
    let mut runtime_config = RuntimeConfig {
        encounter,
        ..RuntimeConfig::default()
    }
    .with_env_overrides();
    // The scripted fight advances time itself.
    runtime_config.tick_interval = None;

    tracing::info!(
        boss = %boss.name,
        seed = runtime_config.encounter.rng_seed,
        max_health = runtime_config.boss_max_health,
        "starting encounter simulation"
    );

    // 4. Start runtime and fight
    let runtime = Runtime::start(runtime_config, boss)?;
    let report = run_scripted_fight(&runtime.handle(), &sim).await?;

    println!(
        "{} {} after {:.1}s in phase {} ({} patterns, {} hits absorbed)",
        report.boss,
        report.outcome,
        report.elapsed,
        report.final_phase,
        report.patterns_started.len(),
        report.absorbed_hits,
    );

    runtime.shutdown().await?;
    Ok(())
}
