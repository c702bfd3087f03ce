//! Authoritative session snapshot kept in step with the identity service.
//!
//! The store starts in `Resolving` (seq 0). Every resolution, initial or
//! triggered by an identity-change notification, is tagged with a ticket and
//! only the most recently issued one may publish. Published transitions carry
//! a strictly increasing `seq`; subscribers see them in `seq` order.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};

use identity_backend::{IdentityClient, IdentityListenerHandle, QueryError};
use tokio::runtime::Handle;
use tracing::{debug, warn};

use super::lock_unpoisoned;
use super::options::{bounded, SyncOptions};
use super::subscription::{Subscribers, Subscription};
use crate::core::session::{Session, SessionTransition};
use crate::error::SyncError;
use crate::logging::TARGET_SESSION;

pub struct SessionStore {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    identity: Arc<dyn IdentityClient>,
    options: SyncOptions,
    state: Mutex<StoreState>,
    /// Held while a transition is committed and delivered.
    delivery: Mutex<()>,
    subscribers: Subscribers<SessionTransition>,
    lifecycle: Mutex<Lifecycle>,
    torn_down: AtomicBool,
}

struct StoreState {
    current: SessionTransition,
    issued_checks: u64,
}

#[derive(Default)]
struct Lifecycle {
    listener: Option<IdentityListenerHandle>,
    runtime: Option<Handle>,
    initialized: bool,
}

impl SessionStore {
    #[must_use]
    pub fn new(identity: Arc<dyn IdentityClient>, options: SyncOptions) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                identity,
                options,
                state: Mutex::new(StoreState {
                    current: SessionTransition::initial(),
                    issued_checks: 0,
                }),
                delivery: Mutex::new(()),
                subscribers: Subscribers::new(),
                lifecycle: Mutex::new(Lifecycle::default()),
                torn_down: AtomicBool::new(false),
            }),
        }
    }

    /// Registers the identity-change listener and performs the first
    /// resolution.
    ///
    /// Must be called from within a tokio runtime; re-checks are spawned on
    /// that runtime. Calling it again (or after [`Self::teardown`]) returns
    /// the current transition without side effects.
    pub async fn initialize(&self) -> Result<SessionTransition, SyncError> {
        let runtime = {
            let mut lifecycle = lock_unpoisoned(&self.inner.lifecycle);
            if lifecycle.initialized || self.inner.is_torn_down() {
                return Ok(self.current_transition());
            }
            let runtime = Handle::try_current().map_err(|_| SyncError::NoRuntime)?;

            let weak: Weak<StoreInner> = Arc::downgrade(&self.inner);
            let listener = self.inner.identity.on_identity_change(Arc::new(move || {
                if let Some(inner) = weak.upgrade() {
                    StoreInner::schedule_recheck(&inner);
                }
            }));

            lifecycle.listener = Some(listener);
            lifecycle.runtime = Some(runtime.clone());
            lifecycle.initialized = true;
            runtime
        };

        let ticket = self.inner.issue_ticket();
        let session = StoreInner::supervised_lookup(Arc::clone(&self.inner), &runtime).await;
        self.inner.apply_check(ticket, session);
        Ok(self.current_transition())
    }

    pub fn current(&self) -> Session {
        self.current_transition().session
    }

    pub fn current_transition(&self) -> SessionTransition {
        lock_unpoisoned(&self.inner.state).current.clone()
    }

    /// Registers `listener` for every transition published from now on.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&SessionTransition) + Send + Sync + 'static,
    {
        self.inner.subscribers.subscribe(listener)
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.len()
    }

    /// Releases the identity-change listener. Resolutions still in flight
    /// complete without publishing.
    pub fn teardown(&self) {
        if self.inner.torn_down.swap(true, Ordering::SeqCst) {
            return;
        }
        let listener = {
            let mut lifecycle = lock_unpoisoned(&self.inner.lifecycle);
            lifecycle.runtime = None;
            lifecycle.listener.take()
        };
        if let Some(listener) = listener {
            listener.release();
        }
        debug!(target: TARGET_SESSION, "session store torn down");
    }

    pub fn is_torn_down(&self) -> bool {
        self.inner.is_torn_down()
    }
}

impl Drop for SessionStore {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl StoreInner {
    fn is_torn_down(&self) -> bool {
        self.torn_down.load(Ordering::SeqCst)
    }

    fn issue_ticket(&self) -> u64 {
        let mut state = lock_unpoisoned(&self.state);
        state.issued_checks += 1;
        state.issued_checks
    }

    fn schedule_recheck(inner: &Arc<Self>) {
        if inner.is_torn_down() {
            return;
        }
        let Some(runtime) = lock_unpoisoned(&inner.lifecycle).runtime.clone() else {
            return;
        };

        let ticket = inner.issue_ticket();
        debug!(target: TARGET_SESSION, ticket, "identity changed; re-checking session");
        let inner = Arc::clone(inner);
        let handle = runtime.clone();
        runtime.spawn(async move {
            let session = Self::supervised_lookup(Arc::clone(&inner), &handle).await;
            inner.apply_check(ticket, session);
        });
    }

    /// Resolves in a task of its own so that a lookup which panics or is
    /// cancelled still settles as unauthenticated.
    async fn supervised_lookup(inner: Arc<Self>, runtime: &Handle) -> Session {
        match runtime.spawn(async move { inner.lookup_session().await }).await {
            Ok(session) => session,
            Err(failure) => {
                let error = SyncError::IdentityResolution(QueryError::Transport(format!(
                    "identity lookup task failed: {failure}"
                )));
                warn!(
                    target: TARGET_SESSION,
                    %error,
                    "treating session as unauthenticated"
                );
                Session::Unauthenticated
            }
        }
    }

    async fn lookup_session(&self) -> Session {
        match bounded(self.options.identity_timeout, self.identity.current_identity()).await {
            Ok(Some(identity)) => Session::Authenticated {
                user_id: identity.user_id,
            },
            Ok(None) => Session::Unauthenticated,
            Err(error) => {
                let error = SyncError::IdentityResolution(error);
                warn!(
                    target: TARGET_SESSION,
                    %error,
                    "treating session as unauthenticated"
                );
                Session::Unauthenticated
            }
        }
    }

    fn apply_check(&self, ticket: u64, session: Session) {
        let _delivery = lock_unpoisoned(&self.delivery);
        if self.is_torn_down() {
            return;
        }

        let transition = {
            let mut state = lock_unpoisoned(&self.state);
            if ticket != state.issued_checks {
                debug!(
                    target: TARGET_SESSION,
                    ticket,
                    latest = state.issued_checks,
                    "discarding superseded identity check"
                );
                return;
            }
            if state.current.session == session {
                return;
            }
            state.current = SessionTransition {
                seq: state.current.seq + 1,
                session,
            };
            state.current.clone()
        };

        debug!(
            target: TARGET_SESSION,
            seq = transition.seq,
            status = %transition.session.status(),
            "session transition"
        );
        self.subscribers.notify(&transition);
    }
}
