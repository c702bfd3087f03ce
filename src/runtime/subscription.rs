//! Typed listener registries and subscription handles.

use std::fmt;
use std::sync::{Arc, Mutex};

use super::lock_unpoisoned;

/// Stable identifier for a listener within one registry.
///
/// Semantics:
/// - IDs are unique within a registry instance.
/// - IDs are never reused for the lifetime of the registry.
#[repr(transparent)]
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct SubscriberId(u64);

impl SubscriberId {
    pub fn raw(self) -> u64 {
        self.0
    }
}

pub type Listener<T> = Arc<dyn Fn(&T) + Send + Sync + 'static>;

struct Registry<T> {
    entries: Vec<(SubscriberId, Listener<T>)>,
    next_id: u64,
}

impl<T> Default for Registry<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            next_id: 0,
        }
    }
}

/// Listener registry delivering values in registration order.
///
/// Delivery runs outside the registry lock. A listener may therefore add or
/// release subscriptions while being notified; such changes take effect from
/// the next delivery.
pub struct Subscribers<T> {
    registry: Arc<Mutex<Registry<T>>>,
}

impl<T> Clone for Subscribers<T> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
        }
    }
}

impl<T> Default for Subscribers<T> {
    fn default() -> Self {
        Self {
            registry: Arc::new(Mutex::new(Registry::default())),
        }
    }
}

impl<T: 'static> Subscribers<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let id = {
            let mut registry = lock_unpoisoned(&self.registry);
            let id = SubscriberId(registry.next_id);
            registry.next_id += 1;
            registry.entries.push((id, Arc::new(listener)));
            id
        };

        let registry = Arc::clone(&self.registry);
        Subscription::new(id, move || {
            lock_unpoisoned(&registry)
                .entries
                .retain(|(entry_id, _)| *entry_id != id);
        })
    }

    /// Delivers `value` to every current listener; returns how many were reached.
    pub fn notify(&self, value: &T) -> usize {
        let listeners: Vec<Listener<T>> = lock_unpoisoned(&self.registry)
            .entries
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        for listener in &listeners {
            listener(value);
        }

        listeners.len()
    }

    pub fn len(&self) -> usize {
        lock_unpoisoned(&self.registry).entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Handle for one registered listener.
///
/// The listener stays registered until [`Subscription::unsubscribe`] is called
/// or the handle is dropped. [`Subscription::detach`] keeps it registered for
/// the lifetime of the registry.
#[must_use = "dropping a Subscription unsubscribes its listener"]
pub struct Subscription {
    id: SubscriberId,
    release: Option<Box<dyn FnOnce() + Send + 'static>>,
}

impl Subscription {
    fn new(id: SubscriberId, release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            id,
            release: Some(Box::new(release)),
        }
    }

    pub fn id(&self) -> SubscriberId {
        self.id
    }

    pub fn unsubscribe(mut self) {
        self.release_now();
    }

    pub fn detach(mut self) {
        self.release = None;
    }

    /// Runs `after` once this subscription's own release has happened.
    /// A detached subscription runs neither.
    pub(crate) fn then_release(mut self, after: impl FnOnce() + Send + 'static) -> Self {
        let release = self.release.take();
        Self::new(self.id, move || {
            if let Some(release) = release {
                release();
            }
            after();
        })
    }

    fn release_now(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release_now();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.release.is_some())
            .finish()
    }
}
