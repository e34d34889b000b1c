//! Scripted fight driver.
//!
//! Each frame deals `dps * frame` damage, advances simulated time, and lets a
//! trivial boss AI fire a random pattern whenever the boss is idle.

use std::collections::HashMap;
use std::fmt;

use anyhow::Result;
use encounter_core::{EncounterEvent, PatternError};
use runtime::{Event, RuntimeError, RuntimeHandle, Topic};
use tokio::sync::broadcast::{self, error::TryRecvError};
use tracing::{debug, info, warn};

use crate::config::SimConfig;

/// How a scripted fight ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FightOutcome {
    Defeated,
    TimedOut,
}

impl fmt::Display for FightOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FightOutcome::Defeated => "defeated",
            FightOutcome::TimedOut => "timed out",
        };
        write!(f, "{}", label)
    }
}

/// Summary of one scripted fight.
#[derive(Debug, Clone, PartialEq)]
pub struct FightReport {
    pub boss: String,
    pub outcome: FightOutcome,
    pub elapsed: f32,
    pub final_phase: u32,
    pub patterns_started: Vec<String>,
    pub phases_entered: Vec<u32>,
    pub absorbed_hits: usize,
}

impl FightReport {
    fn new(boss: String) -> Self {
        Self {
            boss,
            outcome: FightOutcome::TimedOut,
            elapsed: 0.0,
            final_phase: 0,
            patterns_started: Vec::new(),
            phases_entered: Vec::new(),
            absorbed_hits: 0,
        }
    }

    /// Records the parts of an event the report keeps.
    fn observe(&mut self, event: &Event) {
        match event {
            Event::Encounter(EncounterEvent::PatternStarted { name }) => {
                self.patterns_started.push(name.clone());
            }
            Event::Encounter(EncounterEvent::PhaseChanged { new, .. }) => {
                self.phases_entered.push(*new);
            }
            _ => {}
        }
    }
}

/// Runs one fight to the boss's death or the time limit.
pub async fn run_scripted_fight(handle: &RuntimeHandle, sim: &SimConfig) -> Result<FightReport> {
    let mut receivers = handle.subscribe_multiple(&[Topic::Encounter, Topic::Phase, Topic::Pattern]);

    handle.start_encounter().await?;
    let snapshot = handle.snapshot().await?;
    let mut report = FightReport::new(snapshot.boss);

    let frame = sim.frame_seconds();
    let damage_per_frame = sim.dps * frame;
    info!(
        boss = %report.boss,
        dps = sim.dps,
        frame,
        max_seconds = sim.max_seconds,
        "fight started"
    );

    loop {
        let outcome = handle.apply_damage(damage_per_frame).await?;
        if outcome.absorbed {
            report.absorbed_hits += 1;
        }
        if let Some(phase) = outcome.phase_started {
            info!(phase, health = outcome.health, "boss entering new phase");
        }

        if outcome.is_dead() {
            handle.end_encounter(true).await?;
            report.outcome = FightOutcome::Defeated;
            drain_events(&mut receivers, &mut report);
            break;
        }

        handle.advance(frame).await?;

        let snapshot = handle.snapshot().await?;
        if snapshot.state.executing_pattern.is_none() && !snapshot.state.is_transitioning_phase {
            boss_ai_step(handle).await?;
        }

        drain_events(&mut receivers, &mut report);

        if snapshot.state.elapsed >= sim.max_seconds {
            warn!(elapsed = snapshot.state.elapsed, "time limit reached");
            handle.end_encounter(false).await?;
            drain_events(&mut receivers, &mut report);
            break;
        }

        if sim.realtime {
            tokio::time::sleep(sim.frame).await;
        }
    }

    let snapshot = handle.snapshot().await?;
    report.elapsed = snapshot.state.elapsed;
    report.final_phase = snapshot.state.current_phase;

    info!(
        boss = %report.boss,
        outcome = %report.outcome,
        elapsed = report.elapsed,
        final_phase = report.final_phase,
        patterns = report.patterns_started.len(),
        "fight finished"
    );

    Ok(report)
}

/// Fires a random pattern. Gated-out patterns are expected and only logged.
async fn boss_ai_step(handle: &RuntimeHandle) -> Result<()> {
    match handle.execute_random_pattern().await {
        Ok(name) => debug!(pattern = %name, "boss ai picked pattern"),
        Err(RuntimeError::Pattern(PatternError::NoPatternAvailable)) => {
            debug!("boss ai idle, nothing off cooldown");
        }
        Err(error) if error.is_recoverable() => debug!(%error, "boss ai pattern rejected"),
        Err(error) => return Err(error.into()),
    }
    Ok(())
}

fn drain_events(receivers: &mut HashMap<Topic, broadcast::Receiver<Event>>, report: &mut FightReport) {
    for (topic, rx) in receivers.iter_mut() {
        loop {
            match rx.try_recv() {
                Ok(event) => {
                    log_event(*topic, &event);
                    report.observe(&event);
                }
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!(%topic, skipped, "event receiver lagged");
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => break,
            }
        }
    }
}

fn log_event(topic: Topic, event: &Event) {
    match event {
        Event::Encounter(event) => info!(%topic, event = event.as_str(), detail = ?event, "event"),
        Event::Health(health) => debug!(
            %topic,
            old = health.old_value,
            new = health.new_value,
            max = health.max_value,
            "health changed"
        ),
    }
}
