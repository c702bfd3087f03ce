//! Session, role and connectivity synchronization runtime.

pub mod connectivity;
pub mod event_bus;
pub mod options;
pub mod role_resolver;
pub mod session_store;
pub mod subscription;

use std::sync::{Mutex, MutexGuard};

pub use connectivity::{ConnectivitySignal, ConnectivityState};
pub use event_bus::{BusEvent, EventBus, LIVENESS_EVENT};
pub use options::{ConnectivityOptions, SyncOptions, DEFAULT_QUERY_TIMEOUT};
pub use role_resolver::RoleResolver;
pub use session_store::SessionStore;
pub use subscription::{SubscriberId, Subscribers, Subscription};

pub(crate) fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
