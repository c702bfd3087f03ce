//! Tunables for the synchronization runtime.

use std::future::Future;
use std::time::Duration;

use identity_backend::QueryError;

use super::event_bus::LIVENESS_EVENT;

/// Upper bound applied to identity and role queries unless overridden.
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SyncOptions {
    /// Bound on each identity lookup; `None` waits indefinitely.
    pub identity_timeout: Option<Duration>,
    /// Bound on each role query; `None` waits indefinitely.
    pub role_query_timeout: Option<Duration>,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            identity_timeout: Some(DEFAULT_QUERY_TIMEOUT),
            role_query_timeout: Some(DEFAULT_QUERY_TIMEOUT),
        }
    }
}

impl SyncOptions {
    pub fn with_identity_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.identity_timeout = timeout;
        self
    }

    pub fn with_role_query_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.role_query_timeout = timeout;
        self
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ConnectivityOptions {
    /// Bus event that signals a delivered realtime update.
    pub event_name: String,
    /// Staleness threshold for [`expire_if_stale`]; `None` keeps the signal
    /// optimistic and event-only.
    ///
    /// [`expire_if_stale`]: super::ConnectivitySignal::expire_if_stale
    pub stale_after: Option<Duration>,
}

impl Default for ConnectivityOptions {
    fn default() -> Self {
        Self {
            event_name: LIVENESS_EVENT.to_string(),
            stale_after: None,
        }
    }
}

impl ConnectivityOptions {
    pub fn with_event_name(mut self, event_name: impl Into<String>) -> Self {
        self.event_name = event_name.into();
        self
    }

    pub fn with_stale_after(mut self, stale_after: Option<Duration>) -> Self {
        self.stale_after = stale_after;
        self
    }
}

/// Awaits `query`, converting an elapsed `limit` into [`QueryError::Timeout`].
pub(crate) async fn bounded<F, T>(limit: Option<Duration>, query: F) -> Result<T, QueryError>
where
    F: Future<Output = Result<T, QueryError>>,
{
    match limit {
        Some(limit) => match tokio::time::timeout(limit, query).await {
            Ok(outcome) => outcome,
            Err(_) => Err(QueryError::Timeout(limit)),
        },
        None => query.await,
    }
}
