//! Topic-based event bus implementation.

use std::collections::HashMap;
use std::sync::Arc;

use encounter_core::{EncounterEvent, NotificationSink};
use serde::{Deserialize, Serialize};
use strum::{EnumCount, IntoEnumIterator};
use tokio::sync::broadcast;

/// Topics for event routing
#[derive(
    Debug,
    Clone,
    Copy,
    Hash,
    Eq,
    PartialEq,
    Serialize,
    Deserialize,
    strum::EnumCount,
    strum::EnumIter,
    strum::Display,
)]
pub enum Topic {
    /// Encounter start/end and boss health
    Encounter,
    /// Phase changes and transition completion
    Phase,
    /// Pattern start/end
    Pattern,
}

impl Topic {
    const fn index(self) -> usize {
        self as usize
    }
}

/// Boss health after a damage or heal command.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HealthEvent {
    pub old_value: f32,
    pub new_value: f32,
    pub max_value: f32,
}

/// Event wrapper that carries the topic and typed event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    Encounter(EncounterEvent),
    Health(HealthEvent),
}

impl Event {
    pub fn topic(&self) -> Topic {
        match self {
            Event::Encounter(event) if event.is_phase() => Topic::Phase,
            Event::Encounter(event) if event.is_pattern() => Topic::Pattern,
            Event::Encounter(_) | Event::Health(_) => Topic::Encounter,
        }
    }
}

/// Topic-based event bus
///
/// Channels exist for every topic from construction on, so publishing and
/// subscribing never wait on a lock.
#[derive(Clone)]
pub struct EventBus {
    channels: Arc<[broadcast::Sender<Event>; Topic::COUNT]>,
}

impl EventBus {
    /// Creates a new event bus with default capacity for each topic
    pub fn new() -> Self {
        Self::with_capacity(100)
    }

    /// Creates a new event bus with specified capacity per topic
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            channels: Arc::new(std::array::from_fn(|_| broadcast::channel(capacity).0)),
        }
    }

    /// Publish an event to its corresponding topic
    pub fn publish(&self, event: Event) {
        let topic = event.topic();
        if self.channels[topic.index()].send(event).is_err() {
            // No subscribers for this topic - this is normal, not an error
            tracing::trace!(%topic, "no subscribers");
        }
    }

    /// Subscribe to a specific topic
    ///
    /// Returns a receiver that will only receive events for that topic.
    pub fn subscribe(&self, topic: Topic) -> broadcast::Receiver<Event> {
        self.channels[topic.index()].subscribe()
    }

    /// Subscribe to multiple topics
    ///
    /// Returns receivers for each requested topic.
    pub fn subscribe_multiple(
        &self,
        topics: &[Topic],
    ) -> HashMap<Topic, broadcast::Receiver<Event>> {
        topics
            .iter()
            .map(|&topic| (topic, self.subscribe(topic)))
            .collect()
    }

    /// Subscribe to every topic.
    pub fn subscribe_all(&self) -> HashMap<Topic, broadcast::Receiver<Event>> {
        Topic::iter()
            .map(|topic| (topic, self.subscribe(topic)))
            .collect()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("topics", &Topic::COUNT)
            .finish()
    }
}

impl NotificationSink for EventBus {
    fn notify(&mut self, event: &EncounterEvent) {
        tracing::debug!(event = event.as_str(), "encounter event");
        self.publish(Event::Encounter(event.clone()));
    }
}
