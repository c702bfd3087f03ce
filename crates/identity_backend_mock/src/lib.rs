//! Deterministic mock implementation of the shared `identity_backend` contract.
//!
//! This crate contains no transport logic and is intended for local development
//! and contract-level integration testing. Both mocks answer immediately by
//! default; switching them to held mode parks every query until the test
//! releases it, which makes completion order fully test-controlled.

use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use futures_util::future::{BoxFuture, FutureExt};
use identity_backend::{
    Identity, IdentityChangeCallback, IdentityClient, IdentityListenerHandle, IdentityListeners,
    QueryError, RoleQueryService, RoleRow, UserId,
};
use tokio::sync::{oneshot, Notify};

type IdentityOutcome = Result<Option<Identity>, QueryError>;
type RolesOutcome = Result<Vec<RoleRow>, QueryError>;

const ABANDONED: &str = "mock query abandoned before it was answered";

/// An identity lookup parked until the test answers it.
#[derive(Debug)]
pub struct PendingLookup {
    sender: oneshot::Sender<IdentityOutcome>,
}

impl PendingLookup {
    pub fn resolve(self, identity: Option<Identity>) {
        let _ = self.sender.send(Ok(identity));
    }

    pub fn fail(self, error: QueryError) {
        let _ = self.sender.send(Err(error));
    }
}

struct IdentityState {
    outcome: IdentityOutcome,
    hold: bool,
}

/// Scripted identity client; notifications are fired only when the test asks.
pub struct MockIdentityClient {
    state: Mutex<IdentityState>,
    pending: Mutex<VecDeque<PendingLookup>>,
    pending_ready: Notify,
    listeners: IdentityListeners,
    lookups: AtomicUsize,
}

impl MockIdentityClient {
    fn with_outcome(outcome: IdentityOutcome) -> Self {
        Self {
            state: Mutex::new(IdentityState {
                outcome,
                hold: false,
            }),
            pending: Mutex::new(VecDeque::new()),
            pending_ready: Notify::new(),
            listeners: IdentityListeners::new(),
            lookups: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub fn signed_out() -> Self {
        Self::with_outcome(Ok(None))
    }

    #[must_use]
    pub fn signed_in(user_id: impl Into<UserId>) -> Self {
        Self::with_outcome(Ok(Some(Identity::new(user_id))))
    }

    #[must_use]
    pub fn failing(error: QueryError) -> Self {
        Self::with_outcome(Err(error))
    }

    /// Replaces the answer for future immediate lookups without notifying.
    pub fn set_outcome(&self, outcome: IdentityOutcome) {
        lock_unpoisoned(&self.state).outcome = outcome;
    }

    /// Parks future lookups until answered through [`Self::next_pending`].
    pub fn hold_lookups(&self, hold: bool) {
        lock_unpoisoned(&self.state).hold = hold;
    }

    /// Switches to `user_id` and notifies listeners.
    pub fn sign_in(&self, user_id: impl Into<UserId>) -> usize {
        self.set_outcome(Ok(Some(Identity::new(user_id))));
        self.notify_change()
    }

    /// Switches to no identity and notifies listeners.
    pub fn sign_out(&self) -> usize {
        self.set_outcome(Ok(None));
        self.notify_change()
    }

    pub fn notify_change(&self) -> usize {
        self.listeners.notify()
    }

    #[must_use]
    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    #[must_use]
    pub fn take_pending(&self) -> Option<PendingLookup> {
        lock_unpoisoned(&self.pending).pop_front()
    }

    /// Waits for the next parked lookup in issue order.
    pub async fn next_pending(&self) -> PendingLookup {
        loop {
            if let Some(pending) = self.take_pending() {
                return pending;
            }
            self.pending_ready.notified().await;
        }
    }
}

impl IdentityClient for MockIdentityClient {
    fn current_identity(&self) -> BoxFuture<'_, IdentityOutcome> {
        self.lookups.fetch_add(1, Ordering::SeqCst);

        let receiver = {
            let state = lock_unpoisoned(&self.state);
            if !state.hold {
                let outcome = state.outcome.clone();
                return async move { outcome }.boxed();
            }

            let (sender, receiver) = oneshot::channel();
            lock_unpoisoned(&self.pending).push_back(PendingLookup { sender });
            receiver
        };
        self.pending_ready.notify_one();

        async move {
            receiver
                .await
                .unwrap_or_else(|_| Err(QueryError::Transport(ABANDONED.to_string())))
        }
        .boxed()
    }

    fn on_identity_change(&self, callback: IdentityChangeCallback) -> IdentityListenerHandle {
        self.listeners.register(callback)
    }
}

/// A role query parked until the test answers it.
#[derive(Debug)]
pub struct PendingRoleQuery {
    pub user_id: UserId,
    sender: oneshot::Sender<RolesOutcome>,
}

impl PendingRoleQuery {
    pub fn resolve<I, S>(self, roles: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let rows = roles.into_iter().map(RoleRow::new).collect();
        let _ = self.sender.send(Ok(rows));
    }

    pub fn fail(self, error: QueryError) {
        let _ = self.sender.send(Err(error));
    }
}

#[derive(Default)]
struct RoleState {
    table: BTreeMap<UserId, RolesOutcome>,
    hold: bool,
}

/// Scripted role table. Users missing from the table have no roles.
#[derive(Default)]
pub struct MockRoleQuery {
    state: Mutex<RoleState>,
    pending: Mutex<VecDeque<PendingRoleQuery>>,
    pending_ready: Notify,
    calls: Mutex<Vec<UserId>>,
}

impl MockRoleQuery {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_roles<I, S>(self, user_id: impl Into<UserId>, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.set_roles(user_id, roles);
        self
    }

    pub fn set_roles<I, S>(&self, user_id: impl Into<UserId>, roles: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let rows = roles.into_iter().map(RoleRow::new).collect();
        lock_unpoisoned(&self.state)
            .table
            .insert(user_id.into(), Ok(rows));
    }

    pub fn set_failure(&self, user_id: impl Into<UserId>, error: QueryError) {
        lock_unpoisoned(&self.state)
            .table
            .insert(user_id.into(), Err(error));
    }

    pub fn hold_queries(&self, hold: bool) {
        lock_unpoisoned(&self.state).hold = hold;
    }

    /// User ids queried so far, in issue order.
    #[must_use]
    pub fn calls(&self) -> Vec<UserId> {
        lock_unpoisoned(&self.calls).clone()
    }

    #[must_use]
    pub fn take_pending(&self) -> Option<PendingRoleQuery> {
        lock_unpoisoned(&self.pending).pop_front()
    }

    pub async fn next_pending(&self) -> PendingRoleQuery {
        loop {
            if let Some(pending) = self.take_pending() {
                return pending;
            }
            self.pending_ready.notified().await;
        }
    }
}

impl RoleQueryService for MockRoleQuery {
    fn roles_for(&self, user_id: UserId) -> BoxFuture<'_, RolesOutcome> {
        lock_unpoisoned(&self.calls).push(user_id.clone());

        let receiver = {
            let state = lock_unpoisoned(&self.state);
            if !state.hold {
                let outcome = state.table.get(&user_id).cloned().unwrap_or(Ok(Vec::new()));
                return async move { outcome }.boxed();
            }

            let (sender, receiver) = oneshot::channel();
            lock_unpoisoned(&self.pending).push_back(PendingRoleQuery { user_id, sender });
            receiver
        };
        self.pending_ready.notify_one();

        async move {
            receiver
                .await
                .unwrap_or_else(|_| Err(QueryError::Transport(ABANDONED.to_string())))
        }
        .boxed()
    }
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
