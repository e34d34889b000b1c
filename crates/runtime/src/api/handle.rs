//! Cloneable façade for issuing commands to the runtime.
//!
//! [`RuntimeHandle`] hides channel plumbing and offers async helpers for
//! driving the encounter or streaming events from specific topics.
use std::collections::HashMap;

use tokio::sync::{broadcast, mpsc, oneshot};

use super::errors::{Result, RuntimeError};
use crate::boss::DamageOutcome;
use crate::events::{Event, EventBus, Topic};
use crate::workers::{Command, EncounterSnapshot};

/// Client-facing handle to interact with the runtime
#[derive(Clone)]
pub struct RuntimeHandle {
    command_tx: mpsc::Sender<Command>,
    event_bus: EventBus,
}

impl RuntimeHandle {
    pub(crate) fn new(command_tx: mpsc::Sender<Command>, event_bus: EventBus) -> Self {
        Self {
            command_tx,
            event_bus,
        }
    }

    /// Sends a command built around a fresh reply channel and awaits the reply.
    async fn request<T>(&self, build: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
        let (reply_tx, reply_rx) = oneshot::channel();

        self.command_tx
            .send(build(reply_tx))
            .await
            .map_err(|_| RuntimeError::CommandChannelClosed)?;

        reply_rx.await.map_err(RuntimeError::ReplyChannelClosed)
    }

    /// Start the fight with the boss at full health.
    pub async fn start_encounter(&self) -> Result<()> {
        self.request(|reply| Command::StartEncounter { reply })
            .await?
    }

    /// End the fight. Running patterns and transitions finish on later ticks.
    pub async fn end_encounter(&self, defeated: bool) -> Result<()> {
        self.request(|reply| Command::EndEncounter { defeated, reply })
            .await?
    }

    /// Damage the boss and run the phase thresholds.
    pub async fn apply_damage(&self, amount: f32) -> Result<DamageOutcome> {
        self.request(|reply| Command::ApplyDamage { amount, reply })
            .await?
    }

    /// Heal the boss. Healing never moves the phase backwards.
    pub async fn heal(&self, amount: f32) -> Result<DamageOutcome> {
        self.request(|reply| Command::Heal { amount, reply }).await?
    }

    /// Execute a pattern by name.
    pub async fn execute_pattern(&self, name: impl Into<String>) -> Result<()> {
        let name = name.into();
        self.request(|reply| Command::ExecutePattern { name, reply })
            .await?
    }

    /// Pick and execute a weighted-random eligible pattern; returns its name.
    pub async fn execute_random_pattern(&self) -> Result<String> {
        self.request(|reply| Command::ExecuteRandomPattern { reply })
            .await?
    }

    /// Stop the running pattern. Returns false if nothing was running.
    pub async fn stop_pattern(&self) -> Result<bool> {
        self.request(|reply| Command::StopPattern { reply }).await
    }

    /// Force a phase transition.
    pub async fn set_phase(&self, phase: u32) -> Result<()> {
        self.request(|reply| Command::SetPhase { phase, reply })
            .await?
    }

    /// Advance simulation time by `dt` seconds.
    pub async fn advance(&self, dt: f32) -> Result<()> {
        self.request(|reply| Command::Advance { dt, reply }).await
    }

    /// Query the current encounter state (read-only snapshot)
    pub async fn snapshot(&self) -> Result<EncounterSnapshot> {
        self.request(|reply| Command::Snapshot { reply }).await
    }

    /// Ask the worker to stop. Later commands fail with
    /// [`RuntimeError::CommandChannelClosed`].
    pub async fn shutdown(&self) -> Result<()> {
        self.request(|reply| Command::Shutdown { reply }).await
    }

    /// Subscribe to events from a specific topic
    ///
    /// # Topics
    ///
    /// - `Topic::Encounter` - Start/end and health changes
    /// - `Topic::Phase` - Phase changes and transition completion
    /// - `Topic::Pattern` - Pattern start/end
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// use runtime::Topic;
    ///
    /// let mut phase_rx = handle.subscribe(Topic::Phase);
    /// while let Ok(event) = phase_rx.recv().await {
    ///     // Update the phase banner
    /// }
    /// ```
    pub fn subscribe(&self, topic: Topic) -> broadcast::Receiver<Event> {
        self.event_bus.subscribe(topic)
    }

    /// Subscribe to multiple topics at once
    ///
    /// Returns a map of topic to receiver for each requested topic.
    pub fn subscribe_multiple(&self, topics: &[Topic]) -> HashMap<Topic, broadcast::Receiver<Event>> {
        self.event_bus.subscribe_multiple(topics)
    }

    /// Get a reference to the event bus for advanced usage
    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }
}

impl std::fmt::Debug for RuntimeHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuntimeHandle")
            .field("closed", &self.command_tx.is_closed())
            .finish()
    }
}
