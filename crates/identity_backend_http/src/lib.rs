//! Hosted-backend implementation of the shared `identity_backend` contract.
//!
//! This adapter translates `backend_api` transport results into the
//! `IdentityClient` and `RoleQueryService` semantics expected by `authsync`.
//! It owns a local access-token slot; replacing or clearing the token is what
//! fires identity-change notifications.

use std::sync::{Arc, Mutex, MutexGuard};

use backend_api::{BackendApiClient, BackendApiConfig, BackendApiError, RoleRecord, UserRecord};
use futures_util::future::{BoxFuture, FutureExt};
use identity_backend::{
    Identity, IdentityChangeCallback, IdentityClient, IdentityListenerHandle, IdentityListeners,
    QueryError, RoleQueryService, RoleRow, UserId,
};

trait BackendTransport: Send + Sync {
    fn fetch_user(
        &self,
        access_token: String,
    ) -> BoxFuture<'_, Result<Option<UserRecord>, BackendApiError>>;

    fn fetch_roles(
        &self,
        user_id: String,
        access_token: Option<String>,
    ) -> BoxFuture<'_, Result<Vec<RoleRecord>, BackendApiError>>;
}

#[derive(Debug)]
struct DefaultTransport {
    client: BackendApiClient,
}

impl BackendTransport for DefaultTransport {
    fn fetch_user(
        &self,
        access_token: String,
    ) -> BoxFuture<'_, Result<Option<UserRecord>, BackendApiError>> {
        async move { self.client.fetch_user(&access_token).await }.boxed()
    }

    fn fetch_roles(
        &self,
        user_id: String,
        access_token: Option<String>,
    ) -> BoxFuture<'_, Result<Vec<RoleRecord>, BackendApiError>> {
        async move {
            self.client
                .fetch_roles(&user_id, access_token.as_deref())
                .await
        }
        .boxed()
    }
}

/// Identity client and role query service backed by the hosted backend.
pub struct HttpIdentityBackend {
    transport: Arc<dyn BackendTransport>,
    access_token: Mutex<Option<String>>,
    listeners: IdentityListeners,
}

impl HttpIdentityBackend {
    pub fn new(config: BackendApiConfig) -> Result<Self, BackendApiError> {
        let access_token = config
            .access_token
            .as_deref()
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(str::to_string);
        let client = BackendApiClient::new(config)?;
        let backend = Self::with_transport(Arc::new(DefaultTransport { client }));
        *lock_unpoisoned(&backend.access_token) = access_token;
        Ok(backend)
    }

    fn with_transport(transport: Arc<dyn BackendTransport>) -> Self {
        Self {
            transport,
            access_token: Mutex::new(None),
            listeners: IdentityListeners::new(),
        }
    }

    /// Installs a session token and notifies identity-change listeners.
    ///
    /// Blank tokens are treated as signing out.
    pub fn set_access_token(&self, token: impl Into<String>) -> usize {
        let token = token.into();
        let token = token.trim();
        let next = (!token.is_empty()).then(|| token.to_string());
        self.replace_token(next)
    }

    pub fn clear_access_token(&self) -> usize {
        self.replace_token(None)
    }

    #[must_use]
    pub fn has_access_token(&self) -> bool {
        self.token_snapshot().is_some()
    }

    fn replace_token(&self, next: Option<String>) -> usize {
        *lock_unpoisoned(&self.access_token) = next;
        self.listeners.notify()
    }

    fn token_snapshot(&self) -> Option<String> {
        lock_unpoisoned(&self.access_token).clone()
    }
}

impl IdentityClient for HttpIdentityBackend {
    fn current_identity(&self) -> BoxFuture<'_, Result<Option<Identity>, QueryError>> {
        let token = self.token_snapshot();
        async move {
            let Some(token) = token else {
                return Ok(None);
            };

            let user = self
                .transport
                .fetch_user(token)
                .await
                .map_err(query_error_from_backend)?;
            Ok(user.map(identity_from_record))
        }
        .boxed()
    }

    fn on_identity_change(&self, callback: IdentityChangeCallback) -> IdentityListenerHandle {
        self.listeners.register(callback)
    }
}

impl RoleQueryService for HttpIdentityBackend {
    fn roles_for(&self, user_id: UserId) -> BoxFuture<'_, Result<Vec<RoleRow>, QueryError>> {
        let token = self.token_snapshot();
        async move {
            let records = self
                .transport
                .fetch_roles(user_id.as_str().to_string(), token)
                .await
                .map_err(query_error_from_backend)?;
            Ok(records
                .into_iter()
                .map(|record| RoleRow::new(record.role))
                .collect())
        }
        .boxed()
    }
}

fn identity_from_record(record: UserRecord) -> Identity {
    Identity {
        user_id: UserId::new(record.id),
        email: record.email,
    }
}

fn query_error_from_backend(error: BackendApiError) -> QueryError {
    match error {
        BackendApiError::Status(status, message)
            if matches!(status.as_u16(), 401 | 403) =>
        {
            QueryError::Permission(message)
        }
        BackendApiError::Serde(error) => QueryError::Malformed(error.to_string()),
        BackendApiError::Request(error) if error.is_decode() => {
            QueryError::Malformed(error.to_string())
        }
        other => QueryError::Transport(other.to_string()),
    }
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use backend_api::{BackendApiConfig, BackendApiError, RoleRecord, UserRecord};
    use futures_util::future::{BoxFuture, FutureExt};
    use identity_backend::{Identity, IdentityClient, QueryError, RoleQueryService, RoleRow, UserId};

    use super::{BackendTransport, HttpIdentityBackend};

    #[derive(Default)]
    struct FakeTransport {
        user: Mutex<Option<UserRecord>>,
        roles: Mutex<Vec<String>>,
        fail_roles_forbidden: bool,
        seen_tokens: Mutex<Vec<Option<String>>>,
        user_calls: AtomicUsize,
    }

    impl BackendTransport for FakeTransport {
        fn fetch_user(
            &self,
            access_token: String,
        ) -> BoxFuture<'_, Result<Option<UserRecord>, BackendApiError>> {
            self.user_calls.fetch_add(1, Ordering::SeqCst);
            self.seen_tokens
                .lock()
                .expect("tokens lock")
                .push(Some(access_token));
            let user = self.user.lock().expect("user lock").clone();
            async move { Ok(user) }.boxed()
        }

        fn fetch_roles(
            &self,
            _user_id: String,
            access_token: Option<String>,
        ) -> BoxFuture<'_, Result<Vec<RoleRecord>, BackendApiError>> {
            self.seen_tokens
                .lock()
                .expect("tokens lock")
                .push(access_token);
            let outcome = if self.fail_roles_forbidden {
                Err(BackendApiError::Status(
                    reqwest_status(403),
                    "permission denied".to_string(),
                ))
            } else {
                Ok(self
                    .roles
                    .lock()
                    .expect("roles lock")
                    .iter()
                    .map(|role| RoleRecord { role: role.clone() })
                    .collect())
            };
            async move { outcome }.boxed()
        }
    }

    fn reqwest_status(code: u16) -> backend_api::StatusCode {
        backend_api::StatusCode::from_u16(code).expect("valid status")
    }

    #[tokio::test]
    async fn no_token_means_no_identity_without_network_call() {
        let transport = Arc::new(FakeTransport::default());
        let backend = HttpIdentityBackend::with_transport(transport.clone());

        assert_eq!(backend.current_identity().await, Ok(None));
        assert_eq!(transport.user_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn token_resolves_identity_through_transport() {
        let transport = Arc::new(FakeTransport::default());
        *transport.user.lock().expect("user lock") = Some(UserRecord {
            id: "u1".to_string(),
            email: None,
        });
        let backend = HttpIdentityBackend::with_transport(transport.clone());
        backend.set_access_token("  jwt-1 ");

        assert_eq!(backend.current_identity().await, Ok(Some(Identity::new("u1"))));
        assert_eq!(
            *transport.seen_tokens.lock().expect("tokens lock"),
            vec![Some("jwt-1".to_string())]
        );
    }

    #[test]
    fn token_changes_notify_listeners() {
        let backend = HttpIdentityBackend::with_transport(Arc::new(FakeTransport::default()));
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let _handle = backend.on_identity_change(Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        backend.set_access_token("jwt");
        assert!(backend.has_access_token());
        backend.set_access_token("   ");
        assert!(!backend.has_access_token());
        backend.clear_access_token();

        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn role_rows_are_forwarded_with_session_token() {
        let transport = Arc::new(FakeTransport::default());
        *transport.roles.lock().expect("roles lock") =
            vec!["admin".to_string(), "user".to_string()];
        let backend = HttpIdentityBackend::with_transport(transport.clone());
        backend.set_access_token("jwt");

        let rows = backend
            .roles_for(UserId::new("u1"))
            .await
            .expect("role query should succeed");

        assert_eq!(rows, vec![RoleRow::new("admin"), RoleRow::new("user")]);
        assert_eq!(
            *transport.seen_tokens.lock().expect("tokens lock"),
            vec![Some("jwt".to_string())]
        );
    }

    #[tokio::test]
    async fn forbidden_role_query_maps_to_permission_error() {
        let transport = Arc::new(FakeTransport {
            fail_roles_forbidden: true,
            ..FakeTransport::default()
        });
        let backend = HttpIdentityBackend::with_transport(transport);

        assert_eq!(
            backend.roles_for(UserId::new("u1")).await,
            Err(QueryError::Permission("permission denied".to_string()))
        );
    }

    #[test]
    fn decode_failures_map_to_malformed() {
        let error = serde_json::from_str::<Vec<RoleRecord>>("{}").expect_err("not a list");
        let mapped = super::query_error_from_backend(BackendApiError::Serde(error));
        assert!(matches!(mapped, QueryError::Malformed(_)));
    }

    #[test]
    fn construction_validates_configuration() {
        assert!(HttpIdentityBackend::new(BackendApiConfig::new("", "key")).is_err());
        assert!(
            HttpIdentityBackend::new(BackendApiConfig::new("https://p.example.co", "key")).is_ok()
        );
    }

    #[test]
    fn configured_access_token_seeds_the_token_slot() {
        let seeded = HttpIdentityBackend::new(
            BackendApiConfig::new("https://p.example.co", "key").with_access_token("jwt"),
        )
        .expect("valid config");
        assert!(seeded.has_access_token());

        let blank = HttpIdentityBackend::new(
            BackendApiConfig::new("https://p.example.co", "key").with_access_token("  "),
        )
        .expect("valid config");
        assert!(!blank.has_access_token());
    }
}
