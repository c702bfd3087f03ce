//! Named in-process event channels.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::lock_unpoisoned;
use super::subscription::{Subscribers, Subscription};

/// Event published whenever a realtime update has been delivered.
pub const LIVENESS_EVENT: &str = "realtime:update";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BusEvent {
    pub name: String,
    #[serde(default)]
    pub payload: Value,
}

impl BusEvent {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            payload: Value::Null,
        }
    }

    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = payload;
        self
    }
}

/// Cloneable handle to one bus; clones share channels.
#[derive(Clone, Default)]
pub struct EventBus {
    channels: Arc<Mutex<BTreeMap<String, Subscribers<BusEvent>>>>,
}

impl EventBus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Listens on `name`. The channel is dropped from the bus once its last
    /// listener is released.
    pub fn subscribe<F>(&self, name: impl Into<String>, listener: F) -> Subscription
    where
        F: Fn(&BusEvent) + Send + Sync + 'static,
    {
        let name = name.into();
        let subscription = lock_unpoisoned(&self.channels)
            .entry(name.clone())
            .or_default()
            .subscribe(listener);

        let channels = Arc::clone(&self.channels);
        subscription.then_release(move || {
            let mut channels = lock_unpoisoned(&channels);
            if channels.get(&name).is_some_and(Subscribers::is_empty) {
                channels.remove(&name);
            }
        })
    }

    /// Delivers `event` to the listeners of `event.name`; returns how many
    /// were reached.
    pub fn publish(&self, event: &BusEvent) -> usize {
        let channel = lock_unpoisoned(&self.channels).get(&event.name).cloned();
        channel.map_or(0, |channel| channel.notify(event))
    }

    /// Number of names with at least one listener.
    pub fn channel_count(&self) -> usize {
        lock_unpoisoned(&self.channels).len()
    }

    pub fn subscriber_count(&self, name: &str) -> usize {
        lock_unpoisoned(&self.channels)
            .get(name)
            .map_or(0, Subscribers::len)
    }
}
