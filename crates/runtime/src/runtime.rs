//! High-level runtime orchestrator.
//!
//! The runtime owns the simulation worker, wires up command/event channels,
//! and exposes a builder-based API for clients to drive the encounter.

use std::env;
use std::sync::Arc;
use std::time::Duration;

use encounter_core::{BossDefinition, BossEncounter, BossHooks, EncounterConfig};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use crate::api::{Result, RuntimeError, RuntimeHandle};
use crate::boss::HeadlessBoss;
use crate::events::{Event, EventBus, Topic};
use crate::workers::{Command, SimulationWorker};

/// Runtime configuration shared across the orchestrator and workers.
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeConfig {
    pub encounter: EncounterConfig,
    pub event_buffer_size: usize,
    pub command_buffer_size: usize,
    /// Advance the encounter on a wall-clock interval. `None` means time
    /// only moves through [`RuntimeHandle::advance`].
    pub tick_interval: Option<Duration>,
    pub boss_max_health: f32,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            encounter: EncounterConfig::default(),
            event_buffer_size: 100,
            command_buffer_size: 32,
            tick_interval: None,
            boss_max_health: HeadlessBoss::DEFAULT_MAX_HEALTH,
        }
    }
}

impl RuntimeConfig {
    /// Defaults overridden by environment variables:
    ///
    /// - `ENCOUNTER_SEED`: RNG seed for pattern choice
    /// - `ENCOUNTER_TICK_MS`: real-time tick period, `0` disables ticking
    /// - `ENCOUNTER_EVENT_BUFFER`, `ENCOUNTER_COMMAND_BUFFER`: channel sizes
    /// - `BOSS_MAX_HEALTH`: health pool of the headless boss
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Applies the same overrides as [`from_env`](Self::from_env) on top of
    /// an existing config.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(seed) = read_env::<u64>("ENCOUNTER_SEED") {
            self.encounter.rng_seed = seed;
        }

        if let Some(ms) = read_env::<u64>("ENCOUNTER_TICK_MS") {
            self.tick_interval = (ms > 0).then(|| Duration::from_millis(ms));
        }

        if let Some(capacity) = read_env::<usize>("ENCOUNTER_EVENT_BUFFER") {
            self.event_buffer_size = capacity.max(1);
        }

        if let Some(capacity) = read_env::<usize>("ENCOUNTER_COMMAND_BUFFER") {
            self.command_buffer_size = capacity.max(1);
        }

        if let Some(health) = read_env::<f32>("BOSS_MAX_HEALTH") {
            self.boss_max_health = health;
        }

        self
    }
}

fn read_env<T>(key: &str) -> Option<T>
where
    T: std::str::FromStr,
{
    env::var(key).ok()?.parse().ok()
}

/// Main runtime that orchestrates one encounter
///
/// [`RuntimeHandle`] provides a cloneable façade for clients.
pub struct Runtime {
    handle: RuntimeHandle,
    sim_worker_handle: JoinHandle<()>,
}

impl Runtime {
    /// Create a new runtime builder
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Builds and spawns a runtime with default hooks.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(
        config: RuntimeConfig,
        definition: impl Into<Arc<BossDefinition>>,
    ) -> Result<Self> {
        Self::builder()
            .config(config)
            .definition(definition)
            .build()
    }

    /// Get a cloneable handle to this runtime
    ///
    /// The handle can be shared across clients and async tasks.
    pub fn handle(&self) -> RuntimeHandle {
        self.handle.clone()
    }

    /// Subscribe to events from one topic
    pub fn subscribe(&self, topic: Topic) -> broadcast::Receiver<Event> {
        self.handle.subscribe(topic)
    }

    /// Shutdown the runtime gracefully
    ///
    /// Stops the worker even if clones of the handle are still alive.
    pub async fn shutdown(self) -> Result<()> {
        match self.handle.shutdown().await {
            Ok(()) | Err(RuntimeError::CommandChannelClosed) => {}
            Err(RuntimeError::ReplyChannelClosed(_)) => {
                tracing::debug!("worker exited before acknowledging shutdown");
            }
            Err(error) => return Err(error),
        }
        drop(self.handle);

        self.sim_worker_handle
            .await
            .map_err(RuntimeError::WorkerJoin)?;

        Ok(())
    }
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("handle", &self.handle)
            .field("finished", &self.sim_worker_handle.is_finished())
            .finish()
    }
}

/// Builder for [`Runtime`] with flexible configuration.
pub struct RuntimeBuilder {
    config: RuntimeConfig,
    definition: Option<Arc<BossDefinition>>,
    hooks: Option<Box<dyn BossHooks>>,
}

impl RuntimeBuilder {
    fn new() -> Self {
        Self {
            config: RuntimeConfig::default(),
            definition: None,
            hooks: None,
        }
    }

    /// Override runtime configuration
    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the boss to fight (required)
    pub fn definition(mut self, definition: impl Into<Arc<BossDefinition>>) -> Self {
        self.definition = Some(definition.into());
        self
    }

    /// Set reactions to encounter transitions (optional)
    pub fn hooks(mut self, hooks: impl BossHooks + 'static) -> Self {
        self.hooks = Some(Box::new(hooks));
        self
    }

    /// Build the runtime and spawn its worker.
    ///
    /// Must be called from within a tokio runtime.
    pub fn build(self) -> Result<Runtime> {
        let definition = self.definition.ok_or(RuntimeError::MissingDefinition)?;

        let mut encounter = BossEncounter::new(definition, self.config.encounter.clone())
            .map_err(RuntimeError::InvalidDefinition)?;
        if let Some(hooks) = self.hooks {
            encounter = encounter.with_boxed_hooks(hooks);
        }

        let (command_tx, command_rx) = mpsc::channel::<Command>(self.config.command_buffer_size.max(1));
        let event_bus = EventBus::with_capacity(self.config.event_buffer_size);

        let handle = RuntimeHandle::new(command_tx, event_bus.clone());

        let sim_worker = SimulationWorker::new(
            encounter,
            HeadlessBoss::new(
                self.config.boss_max_health,
                self.config.encounter.invulnerability_tag.clone(),
            ),
            command_rx,
            event_bus,
            self.config.tick_interval,
        );

        let sim_worker_handle = tokio::spawn(async move {
            sim_worker.run().await;
        });

        Ok(Runtime {
            handle,
            sim_worker_handle,
        })
    }
}
