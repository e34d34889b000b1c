use std::time::Duration;

use encounter_client::{FightOutcome, SimConfig, resolve_boss, resolve_encounter_config, run_scripted_fight};
use runtime::{Runtime, RuntimeConfig};

fn sim(boss: &str, dps: f32, max_seconds: f32) -> SimConfig {
    SimConfig {
        boss: boss.to_owned(),
        dps,
        frame: Duration::from_millis(100),
        max_seconds,
        ..SimConfig::default()
    }
}

async fn fight(sim: &SimConfig) -> encounter_client::FightReport {
    let boss = resolve_boss(sim).unwrap();
    let config = RuntimeConfig {
        encounter: resolve_encounter_config(sim).unwrap(),
        ..RuntimeConfig::default()
    };
    let runtime = Runtime::start(config, boss).unwrap();
    let report = run_scripted_fight(&runtime.handle(), sim).await.unwrap();
    runtime.shutdown().await.unwrap();
    report
}

#[tokio::test]
async fn warden_dies_after_every_phase() {
    let report = fight(&sim("warden", 500.0, 60.0)).await;

    assert_eq!(report.outcome, FightOutcome::Defeated);
    assert_eq!(report.boss, "Warden");
    assert_eq!(report.phases_entered, vec![1, 2]);
    assert_eq!(report.final_phase, 2);
    assert!(!report.patterns_started.is_empty());
    // Both phase transitions are invulnerable.
    assert!(report.absorbed_hits > 0);
}

#[tokio::test]
async fn slow_fight_times_out() {
    let report = fight(&sim("Hydra", 1.0, 2.0)).await;

    assert_eq!(report.outcome, FightOutcome::TimedOut);
    assert!(report.elapsed >= 2.0 - 1e-3);
    assert_eq!(report.final_phase, 0);
    assert!(report.phases_entered.is_empty());
}

#[tokio::test]
async fn same_seed_replays_same_patterns() {
    let first = fight(&sim("Warden", 120.0, 30.0)).await;
    let second = fight(&sim("Warden", 120.0, 30.0)).await;

    assert_eq!(first.patterns_started, second.patterns_started);
}

#[test]
fn unknown_boss_is_an_error() {
    assert!(resolve_boss(&sim("Nobody", 1.0, 1.0)).is_err());
}
