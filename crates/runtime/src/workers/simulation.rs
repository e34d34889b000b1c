//! Simulation worker that owns the authoritative [`BossEncounter`].
//!
//! Receives commands from [`RuntimeHandle`](crate::RuntimeHandle), applies
//! them to the encounter and the headless boss, and republishes every
//! encounter notification on the [`EventBus`].

use std::time::Duration;

use encounter_core::{BossEncounter, EncounterState, HealthChange, StatMultipliers};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Interval, MissedTickBehavior};
use tracing::{debug, info};

use crate::api::Result;
use crate::boss::{DamageOutcome, HeadlessBoss};
use crate::events::{Event, EventBus, HealthEvent};

/// Commands that can be sent to the simulation worker
pub enum Command {
    StartEncounter {
        reply: oneshot::Sender<Result<()>>,
    },
    EndEncounter {
        defeated: bool,
        reply: oneshot::Sender<Result<()>>,
    },
    ApplyDamage {
        amount: f32,
        reply: oneshot::Sender<Result<DamageOutcome>>,
    },
    Heal {
        amount: f32,
        reply: oneshot::Sender<Result<DamageOutcome>>,
    },
    ExecutePattern {
        name: String,
        reply: oneshot::Sender<Result<()>>,
    },
    ExecuteRandomPattern {
        reply: oneshot::Sender<Result<String>>,
    },
    StopPattern {
        reply: oneshot::Sender<bool>,
    },
    SetPhase {
        phase: u32,
        reply: oneshot::Sender<Result<()>>,
    },
    /// Advance simulation time by `dt` seconds.
    Advance {
        dt: f32,
        reply: oneshot::Sender<()>,
    },
    /// Query a read-only snapshot.
    Snapshot {
        reply: oneshot::Sender<EncounterSnapshot>,
    },
    /// Stop the worker loop after replying.
    Shutdown { reply: oneshot::Sender<()> },
}

/// Everything an observer needs to draw the fight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncounterSnapshot {
    pub boss: String,
    pub state: EncounterState,
    pub health: f32,
    pub max_health: f32,
    pub multipliers: StatMultipliers,
    /// Patterns that would pass every gate right now, in catalog order.
    pub available_patterns: Vec<String>,
}

/// Background task that processes encounter commands.
pub struct SimulationWorker {
    encounter: BossEncounter,
    boss: HeadlessBoss,
    command_rx: mpsc::Receiver<Command>,
    event_bus: EventBus,
    tick_interval: Option<Duration>,
}

impl SimulationWorker {
    pub fn new(
        encounter: BossEncounter,
        boss: HeadlessBoss,
        command_rx: mpsc::Receiver<Command>,
        event_bus: EventBus,
        tick_interval: Option<Duration>,
    ) -> Self {
        info!(
            boss = %encounter.definition().name,
            phases = encounter.definition().phase_count(),
            patterns = encounter.definition().patterns.len(),
            ?tick_interval,
            "SimulationWorker initialized"
        );

        Self {
            encounter,
            boss,
            command_rx,
            event_bus,
            tick_interval,
        }
    }

    /// Main worker loop.
    ///
    /// Exits when every command sender is dropped or on [`Command::Shutdown`].
    pub async fn run(mut self) {
        let mut ticker = self.tick_interval.map(|period| {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval
        });
        let step = self.tick_interval.map_or(0.0, |period| period.as_secs_f32());

        loop {
            tokio::select! {
                cmd = self.command_rx.recv() => match cmd {
                    Some(Command::Shutdown { reply }) => {
                        let _ = reply.send(());
                        break;
                    }
                    Some(cmd) => self.handle_command(cmd),
                    None => break,
                },
                () = next_tick(&mut ticker) => self.advance(step),
            }
        }

        info!(boss = %self.encounter.definition().name, "SimulationWorker stopped");
    }

    fn handle_command(&mut self, cmd: Command) {
        match cmd {
            Command::StartEncounter { reply } => {
                let result = self.start_encounter();
                if reply.send(result).is_err() {
                    debug!("StartEncounter reply channel closed (caller dropped)");
                }
            }
            Command::EndEncounter { defeated, reply } => {
                let mut env = self.boss.env(&mut self.event_bus);
                let result = self
                    .encounter
                    .end_encounter(defeated, &mut env)
                    .map_err(Into::into);
                if reply.send(result).is_err() {
                    debug!("EndEncounter reply channel closed (caller dropped)");
                }
            }
            Command::ApplyDamage { amount, reply } => {
                let result = self
                    .boss
                    .apply_damage(amount)
                    .map(|change| self.apply_health_change(change));
                if reply.send(result).is_err() {
                    debug!("ApplyDamage reply channel closed (caller dropped)");
                }
            }
            Command::Heal { amount, reply } => {
                let result = self
                    .boss
                    .heal(amount)
                    .map(|change| self.apply_health_change(Some(change)));
                if reply.send(result).is_err() {
                    debug!("Heal reply channel closed (caller dropped)");
                }
            }
            Command::ExecutePattern { name, reply } => {
                let mut env = self.boss.env(&mut self.event_bus);
                let result = self
                    .encounter
                    .execute_pattern(&name, &mut env)
                    .map_err(Into::into);
                if reply.send(result).is_err() {
                    debug!("ExecutePattern reply channel closed (caller dropped)");
                }
            }
            Command::ExecuteRandomPattern { reply } => {
                let mut env = self.boss.env(&mut self.event_bus);
                let result = self
                    .encounter
                    .execute_random_pattern(&mut env)
                    .map_err(Into::into);
                if reply.send(result).is_err() {
                    debug!("ExecuteRandomPattern reply channel closed (caller dropped)");
                }
            }
            Command::StopPattern { reply } => {
                let mut env = self.boss.env(&mut self.event_bus);
                let stopped = self.encounter.stop_current_pattern(&mut env);
                if reply.send(stopped).is_err() {
                    debug!("StopPattern reply channel closed (caller dropped)");
                }
            }
            Command::SetPhase { phase, reply } => {
                let mut env = self.boss.env(&mut self.event_bus);
                let result = self
                    .encounter
                    .set_phase(phase, &mut env)
                    .map_err(Into::into);
                if reply.send(result).is_err() {
                    debug!("SetPhase reply channel closed (caller dropped)");
                }
            }
            Command::Advance { dt, reply } => {
                self.advance(dt);
                if reply.send(()).is_err() {
                    debug!("Advance reply channel closed (caller dropped)");
                }
            }
            Command::Snapshot { reply } => {
                if reply.send(self.snapshot()).is_err() {
                    debug!("Snapshot reply channel closed (caller dropped)");
                }
            }
            Command::Shutdown { reply } => {
                // Handled by the run loop; answer anyway.
                let _ = reply.send(());
            }
        }
    }

    /// Refills the boss and starts the fight.
    fn start_encounter(&mut self) -> Result<()> {
        if !self.encounter.is_active() {
            self.boss.restore();
        }
        let mut env = self.boss.env(&mut self.event_bus);
        self.encounter.start_encounter(&mut env)?;
        Ok(())
    }

    /// Publishes a health change and feeds it to the encounter. `None`
    /// means the hit was absorbed.
    fn apply_health_change(&mut self, change: Option<HealthChange>) -> DamageOutcome {
        let phase_started = change.and_then(|change| {
            self.event_bus.publish(Event::Health(HealthEvent {
                old_value: change.old_value,
                new_value: change.new_value,
                max_value: change.max_value,
            }));
            let mut env = self.boss.env(&mut self.event_bus);
            self.encounter.on_health_changed(change, &mut env)
        });

        DamageOutcome {
            health: self.boss.health(),
            max_health: self.boss.max_health(),
            phase_started,
            absorbed: change.is_none(),
        }
    }

    fn advance(&mut self, dt: f32) {
        let mut env = self.boss.env(&mut self.event_bus);
        self.encounter.tick(dt, &mut env);
    }

    fn snapshot(&mut self) -> EncounterSnapshot {
        let available_patterns = {
            let env = self.boss.env(&mut self.event_bus);
            self.encounter
                .available_patterns(&env)
                .into_iter()
                .map(str::to_owned)
                .collect()
        };

        EncounterSnapshot {
            boss: self.encounter.definition().name.clone(),
            state: self.encounter.state(),
            health: self.boss.health(),
            max_health: self.boss.max_health(),
            multipliers: self.encounter.current_multipliers(),
            available_patterns,
        }
    }
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}
