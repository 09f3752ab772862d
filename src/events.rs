// Change notifications
//
// Independent views learn about mutations through a broadcast bus instead
// of being wired to each other. Each event names a topic ("family-changed"),
// a change kind and the affected ids.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;
use tracing::trace;

const BUS_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Topic {
    #[serde(rename = "forane-changed")]
    Forane,
    #[serde(rename = "parish-changed")]
    Parish,
    #[serde(rename = "community-changed")]
    Community,
    #[serde(rename = "family-changed")]
    Family,
    #[serde(rename = "individual-changed")]
    Individual,
    #[serde(rename = "institution-changed")]
    Institution,
}

impl Topic {
    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::Forane => "forane-changed",
            Topic::Parish => "parish-changed",
            Topic::Community => "community-changed",
            Topic::Family => "family-changed",
            Topic::Individual => "individual-changed",
            Topic::Institution => "institution-changed",
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Change {
    Added,
    Updated,
    Deleted,
    ContributionAdded,
    ContributionDeleted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub topic: Topic,
    pub change: Change,

    /// Affected ids; for contribution changes: [owner id, contribution id]
    pub ids: Vec<u64>,
}

impl ChangeEvent {
    pub fn new(topic: Topic, change: Change, ids: Vec<u64>) -> Self {
        ChangeEvent { topic, change, ids }
    }
}

/// Broadcast bus shared by the store and its observers
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<ChangeEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(BUS_CAPACITY);
        EventBus { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.sender.subscribe()
    }

    /// Publish an event; having no listeners is fine
    pub fn emit(&self, event: ChangeEvent) {
        trace!(topic = %event.topic, change = ?event.change, ids = ?event.ids, "emit");
        let _ = self.sender.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
