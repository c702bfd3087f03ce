//! Optimistic realtime connectivity indicator fed by liveness events.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};

use time::OffsetDateTime;
use tracing::{debug, info};

use super::event_bus::EventBus;
use super::lock_unpoisoned;
use super::options::ConnectivityOptions;
use super::subscription::{Subscribers, Subscription};
use crate::core::clock::Clock;
use crate::logging::TARGET_CONNECTIVITY;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ConnectivityState {
    pub connected: bool,
    /// Never moves backwards, even if the clock does.
    pub last_update_at: Option<OffsetDateTime>,
}

impl Default for ConnectivityState {
    fn default() -> Self {
        Self {
            connected: true,
            last_update_at: None,
        }
    }
}

pub struct ConnectivitySignal {
    inner: Arc<SignalInner>,
    bus_subscription: Mutex<Option<Subscription>>,
}

struct SignalInner {
    clock: Arc<dyn Clock>,
    options: ConnectivityOptions,
    mounted_at: OffsetDateTime,
    state: Mutex<ConnectivityState>,
    delivery: Mutex<()>,
    subscribers: Subscribers<ConnectivityState>,
    unmounted: AtomicBool,
}

impl ConnectivitySignal {
    /// Starts listening for `options.event_name` on `bus`.
    #[must_use]
    pub fn mount(bus: &EventBus, options: ConnectivityOptions, clock: Arc<dyn Clock>) -> Self {
        let mounted_at = clock.now();
        let event_name = options.event_name.clone();
        let inner = Arc::new(SignalInner {
            clock,
            options,
            mounted_at,
            state: Mutex::new(ConnectivityState::default()),
            delivery: Mutex::new(()),
            subscribers: Subscribers::new(),
            unmounted: AtomicBool::new(false),
        });

        let weak: Weak<SignalInner> = Arc::downgrade(&inner);
        let subscription = bus.subscribe(event_name.clone(), move |_| {
            if let Some(inner) = weak.upgrade() {
                inner.record_update();
            }
        });
        debug!(target: TARGET_CONNECTIVITY, event = %event_name, "connectivity signal mounted");

        Self {
            inner,
            bus_subscription: Mutex::new(Some(subscription)),
        }
    }

    pub fn snapshot(&self) -> ConnectivityState {
        *lock_unpoisoned(&self.inner.state)
    }

    pub fn connected(&self) -> bool {
        self.snapshot().connected
    }

    pub fn last_update_at(&self) -> Option<OffsetDateTime> {
        self.snapshot().last_update_at
    }

    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&ConnectivityState) + Send + Sync + 'static,
    {
        self.inner.subscribers.subscribe(listener)
    }

    /// Flips to disconnected once the last update (or the mount time) is
    /// older than `stale_after`. Returns whether the state flipped.
    ///
    /// Always `false` when no staleness threshold is configured.
    pub fn expire_if_stale(&self) -> bool {
        self.inner.expire_if_stale()
    }

    /// Releases the bus subscription; later events leave the state untouched.
    pub fn unmount(&self) {
        self.inner.unmounted.store(true, Ordering::SeqCst);
        if let Some(subscription) = lock_unpoisoned(&self.bus_subscription).take() {
            subscription.unsubscribe();
            debug!(target: TARGET_CONNECTIVITY, "connectivity signal unmounted");
        }
    }

    pub fn is_mounted(&self) -> bool {
        !self.inner.unmounted.load(Ordering::SeqCst)
    }
}

impl Drop for ConnectivitySignal {
    fn drop(&mut self) {
        self.unmount();
    }
}

impl SignalInner {
    fn record_update(&self) {
        let _delivery = lock_unpoisoned(&self.delivery);
        if self.unmounted.load(Ordering::SeqCst) {
            return;
        }

        let now = self.clock.now();
        let next = {
            let mut state = lock_unpoisoned(&self.state);
            let stamp = match state.last_update_at {
                Some(previous) if previous > now => previous,
                _ => now,
            };
            let next = ConnectivityState {
                connected: true,
                last_update_at: Some(stamp),
            };
            if *state == next {
                return;
            }
            if !state.connected {
                info!(target: TARGET_CONNECTIVITY, "realtime updates resumed");
            }
            *state = next;
            next
        };
        self.subscribers.notify(&next);
    }

    fn expire_if_stale(&self) -> bool {
        let Some(stale_after) = self.options.stale_after else {
            return false;
        };
        let Ok(threshold) = time::Duration::try_from(stale_after) else {
            return false;
        };

        let _delivery = lock_unpoisoned(&self.delivery);
        if self.unmounted.load(Ordering::SeqCst) {
            return false;
        }

        let now = self.clock.now();
        let next = {
            let mut state = lock_unpoisoned(&self.state);
            if !state.connected {
                return false;
            }
            let reference = state.last_update_at.unwrap_or(self.mounted_at);
            if now - reference <= threshold {
                return false;
            }
            state.connected = false;
            *state
        };

        info!(
            target: TARGET_CONNECTIVITY,
            stale_after_ms = stale_after.as_millis() as u64,
            "no realtime update within threshold; marking disconnected"
        );
        self.subscribers.notify(&next);
        true
    }
}
