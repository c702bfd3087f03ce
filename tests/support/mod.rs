#![allow(dead_code)]

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use authsync::{RoleResolver, SessionStore, SyncOptions};
use identity_backend_mock::{MockIdentityClient, MockRoleQuery};

pub fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Polls `done` until it holds, failing the test after two seconds.
pub async fn wait_until(mut done: impl FnMut() -> bool) {
    let reached = tokio::time::timeout(Duration::from_secs(2), async move {
        while !done() {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    })
    .await;
    assert!(reached.is_ok(), "condition not reached within 2s");
}

/// Lets already-woken tasks run to completion.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(20)).await;
}

/// Records every value delivered to a listener.
pub struct Recorder<T> {
    seen: Arc<Mutex<Vec<T>>>,
}

impl<T> Clone for Recorder<T> {
    fn clone(&self) -> Self {
        Self {
            seen: Arc::clone(&self.seen),
        }
    }
}

impl<T: Clone + Send + 'static> Recorder<T> {
    pub fn new() -> Self {
        Self {
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn listener(&self) -> impl Fn(&T) + Send + Sync + 'static {
        let seen = Arc::clone(&self.seen);
        move |value: &T| lock_unpoisoned(&seen).push(value.clone())
    }

    pub fn values(&self) -> Vec<T> {
        lock_unpoisoned(&self.seen).clone()
    }
}

pub struct Harness {
    pub identity: Arc<MockIdentityClient>,
    pub queries: Arc<MockRoleQuery>,
    pub store: SessionStore,
    pub resolver: RoleResolver,
}

impl Harness {
    /// Store and resolver wired to the mocks; the store is not yet initialized.
    pub fn new(identity: MockIdentityClient, queries: MockRoleQuery, options: SyncOptions) -> Self {
        let identity = Arc::new(identity);
        let queries = Arc::new(queries);
        let store = SessionStore::new(identity.clone(), options.clone());
        let resolver =
            RoleResolver::attach(&store, queries.clone(), options).expect("resolver attaches");
        Self {
            identity,
            queries,
            store,
            resolver,
        }
    }
}
