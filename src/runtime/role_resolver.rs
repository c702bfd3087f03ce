//! Role set derived from the session store.
//!
//! Each role query is tagged with the `seq` of the transition that issued it.
//! A result is applied only while that transition is still the latest one the
//! resolver has seen, so a slow answer for a previous user can never overwrite
//! the roles of the current one.

use std::sync::{Arc, Mutex, Weak};

use identity_backend::{QueryError, RoleQueryService, RoleRow, UserId};
use tokio::runtime::Handle;
use tracing::{debug, warn};

use super::lock_unpoisoned;
use super::options::{bounded, SyncOptions};
use super::session_store::SessionStore;
use super::subscription::{Subscribers, Subscription};
use crate::core::roles::RoleSet;
use crate::core::session::{Session, SessionTransition};
use crate::error::SyncError;
use crate::logging::TARGET_ROLES;

pub struct RoleResolver {
    inner: Arc<ResolverInner>,
    store_subscription: Mutex<Option<Subscription>>,
}

struct ResolverInner {
    queries: Arc<dyn RoleQueryService>,
    options: SyncOptions,
    runtime: Handle,
    state: Mutex<ResolverState>,
    /// Held while a role set is committed and delivered.
    delivery: Mutex<()>,
    subscribers: Subscribers<RoleSet>,
}

struct ResolverState {
    latest_seq: Option<u64>,
    roles: RoleSet,
    detached: bool,
}

impl RoleResolver {
    /// Follows `store` and immediately processes its current transition.
    ///
    /// Role queries are spawned on the tokio runtime current at this call.
    pub fn attach(
        store: &SessionStore,
        queries: Arc<dyn RoleQueryService>,
        options: SyncOptions,
    ) -> Result<Self, SyncError> {
        let runtime = Handle::try_current().map_err(|_| SyncError::NoRuntime)?;
        let inner = Arc::new(ResolverInner {
            queries,
            options,
            runtime,
            state: Mutex::new(ResolverState {
                latest_seq: None,
                roles: RoleSet::pending(),
                detached: false,
            }),
            delivery: Mutex::new(()),
            subscribers: Subscribers::new(),
        });

        let weak: Weak<ResolverInner> = Arc::downgrade(&inner);
        let subscription = store.subscribe(move |transition| {
            if let Some(inner) = weak.upgrade() {
                ResolverInner::on_transition(&inner, transition);
            }
        });
        ResolverInner::on_transition(&inner, &store.current_transition());

        Ok(Self {
            inner,
            store_subscription: Mutex::new(Some(subscription)),
        })
    }

    pub fn current(&self) -> RoleSet {
        lock_unpoisoned(&self.inner.state).roles.clone()
    }

    pub fn is_admin(&self) -> bool {
        lock_unpoisoned(&self.inner.state).roles.is_admin()
    }

    pub fn is_moderator(&self) -> bool {
        lock_unpoisoned(&self.inner.state).roles.is_moderator()
    }

    pub fn loading(&self) -> bool {
        lock_unpoisoned(&self.inner.state).roles.loading
    }

    /// Registers `listener` for every role set published from now on.
    ///
    /// Listeners must not call [`Self::detach`].
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&RoleSet) + Send + Sync + 'static,
    {
        self.inner.subscribers.subscribe(listener)
    }

    /// Stops following the store. The role set resets to empty and results
    /// still in flight are discarded.
    pub fn detach(&self) {
        if let Some(subscription) = lock_unpoisoned(&self.store_subscription).take() {
            subscription.unsubscribe();
        }
        self.inner.detach();
    }

    pub fn is_detached(&self) -> bool {
        lock_unpoisoned(&self.inner.state).detached
    }
}

impl Drop for RoleResolver {
    fn drop(&mut self) {
        self.detach();
    }
}

impl ResolverInner {
    fn on_transition(inner: &Arc<Self>, transition: &SessionTransition) {
        let _delivery = lock_unpoisoned(&inner.delivery);

        let changed = {
            let mut state = lock_unpoisoned(&inner.state);
            if state.detached {
                return;
            }
            if state.latest_seq.is_some_and(|seen| transition.seq <= seen) {
                return;
            }
            state.latest_seq = Some(transition.seq);

            let next = match &transition.session {
                Session::Authenticated { .. } | Session::Resolving => RoleSet::pending(),
                Session::Unauthenticated => RoleSet::empty(),
            };
            if state.roles == next {
                None
            } else {
                state.roles = next.clone();
                Some(next)
            }
        };

        if let Session::Authenticated { user_id } = &transition.session {
            Self::spawn_query(inner, transition.seq, user_id.clone());
        }
        if let Some(roles) = changed {
            inner.subscribers.notify(&roles);
        }
    }

    /// Runs the query in its own task; a query task that panics or is
    /// cancelled still settles `seq` as a failed query.
    fn spawn_query(inner: &Arc<Self>, seq: u64, user_id: UserId) {
        debug!(target: TARGET_ROLES, seq, user_id = %user_id, "querying roles");
        let task = Arc::clone(inner);
        let queried = user_id.clone();
        let query = inner.runtime.spawn(async move {
            bounded(task.options.role_query_timeout, task.queries.roles_for(queried)).await
        });

        let supervisor = Arc::clone(inner);
        inner.runtime.spawn(async move {
            let outcome = match query.await {
                Ok(outcome) => outcome,
                Err(failure) => Err(QueryError::Transport(format!(
                    "role query task failed: {failure}"
                ))),
            };
            supervisor.apply_query(seq, &user_id, outcome);
        });
    }

    fn apply_query(&self, seq: u64, user_id: &UserId, outcome: Result<Vec<RoleRow>, QueryError>) {
        let _delivery = lock_unpoisoned(&self.delivery);

        let roles = {
            let mut state = lock_unpoisoned(&self.state);
            if state.detached || state.latest_seq != Some(seq) {
                debug!(
                    target: TARGET_ROLES,
                    seq,
                    latest = ?state.latest_seq,
                    "discarding stale role result"
                );
                return;
            }

            state.roles = match outcome {
                Ok(rows) => RoleSet::from_rows(&rows),
                Err(error) => {
                    let error = SyncError::RoleQuery(error);
                    warn!(
                        target: TARGET_ROLES,
                        seq,
                        user_id = %user_id,
                        %error,
                        "treating user as having no roles"
                    );
                    RoleSet::empty()
                }
            };
            state.roles.clone()
        };

        debug!(
            target: TARGET_ROLES,
            seq,
            admin = roles.is_admin(),
            moderator = roles.is_moderator(),
            "roles resolved"
        );
        self.subscribers.notify(&roles);
    }

    fn detach(&self) {
        let _delivery = lock_unpoisoned(&self.delivery);

        let changed = {
            let mut state = lock_unpoisoned(&self.state);
            if state.detached {
                return;
            }
            state.detached = true;
            let changed = state.roles != RoleSet::empty();
            state.roles = RoleSet::empty();
            changed
        };

        if changed {
            self.subscribers.notify(&RoleSet::empty());
        }
    }
}
