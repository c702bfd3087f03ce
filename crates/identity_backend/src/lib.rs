//! Minimal backend-neutral contract for identity lookups and role-table queries.
//!
//! This crate defines only the shapes exchanged with the hosted identity and
//! authorization backend. It excludes transport details and any client-side
//! state tracking; those live in the HTTP adapter and in `authsync` itself.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Opaque identifier of an authenticated user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for UserId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Identity reported by the backend for the current credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    #[serde(rename = "id")]
    pub user_id: UserId,
    #[serde(default)]
    pub email: Option<String>,
}

impl Identity {
    #[must_use]
    pub fn new(user_id: impl Into<UserId>) -> Self {
        Self {
            user_id: user_id.into(),
            email: None,
        }
    }
}

/// One row of the remote role table, as returned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleRow {
    pub role: String,
}

impl RoleRow {
    #[must_use]
    pub fn new(role: impl Into<String>) -> Self {
        Self { role: role.into() }
    }
}

/// Failure of a remote identity or role query.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("permission denied: {0}")]
    Permission(String),
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("query timed out after {0:?}")]
    Timeout(Duration),
}

/// Callback fired when the backend's notion of the current identity may have changed.
///
/// The callback carries no payload; receivers re-query the current identity.
pub type IdentityChangeCallback = Arc<dyn Fn() + Send + Sync + 'static>;

/// Registration handle returned from [`IdentityClient::on_identity_change`].
///
/// Dropping the handle releases the registration.
pub struct IdentityListenerHandle {
    release: Option<Box<dyn FnOnce() + Send + 'static>>,
}

impl IdentityListenerHandle {
    #[must_use]
    pub fn new(release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }

    /// Handle for clients that never emit change notifications.
    #[must_use]
    pub fn noop() -> Self {
        Self { release: None }
    }

    pub fn release(mut self) {
        self.run_release();
    }

    fn run_release(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for IdentityListenerHandle {
    fn drop(&mut self) {
        self.run_release();
    }
}

impl fmt::Debug for IdentityListenerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityListenerHandle")
            .field("active", &self.release.is_some())
            .finish()
    }
}

#[derive(Default)]
struct ListenerTable {
    entries: Vec<(u64, IdentityChangeCallback)>,
    next_id: u64,
}

/// Listener table shared by identity client implementations.
///
/// Listeners are notified in registration order. Callbacks run outside the
/// table lock, so a callback may register or release listeners.
#[derive(Clone, Default)]
pub struct IdentityListeners {
    table: Arc<Mutex<ListenerTable>>,
}

impl IdentityListeners {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, callback: IdentityChangeCallback) -> IdentityListenerHandle {
        let id = {
            let mut table = lock_unpoisoned(&self.table);
            let id = table.next_id;
            table.next_id += 1;
            table.entries.push((id, callback));
            id
        };

        let table = Arc::clone(&self.table);
        IdentityListenerHandle::new(move || {
            lock_unpoisoned(&table)
                .entries
                .retain(|(entry_id, _)| *entry_id != id);
        })
    }

    /// Notifies every registered listener; returns how many were reached.
    pub fn notify(&self) -> usize {
        let callbacks: Vec<IdentityChangeCallback> = lock_unpoisoned(&self.table)
            .entries
            .iter()
            .map(|(_, callback)| Arc::clone(callback))
            .collect();

        for callback in &callbacks {
            callback();
        }

        callbacks.len()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        lock_unpoisoned(&self.table).entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Remote identity lookup interface.
pub trait IdentityClient: Send + Sync + 'static {
    /// Resolves the identity bound to the current credentials, or `None`.
    fn current_identity(&self) -> BoxFuture<'_, Result<Option<Identity>, QueryError>>;

    /// Registers a change listener; the registration lives as long as the handle.
    fn on_identity_change(&self, callback: IdentityChangeCallback) -> IdentityListenerHandle;
}

/// Remote role-table query interface.
pub trait RoleQueryService: Send + Sync + 'static {
    /// Fetches the role rows bound to `user_id`.
    fn roles_for(&self, user_id: UserId) -> BoxFuture<'_, Result<Vec<RoleRow>, QueryError>>;
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
