//! Error taxonomy of the synchronization core.
//!
//! Identity and role failures are never returned to consumers; they are
//! converted to their fail-closed state and logged in this form.

use identity_backend::QueryError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    #[error("no tokio runtime is available to run background queries")]
    NoRuntime,

    #[error("identity resolution failed: {0}")]
    IdentityResolution(#[source] QueryError),

    #[error("role query failed: {0}")]
    RoleQuery(#[source] QueryError),
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use identity_backend::QueryError;

    use super::SyncError;

    #[test]
    fn wrapped_query_errors_stay_reachable_as_source() {
        let error = SyncError::RoleQuery(QueryError::Transport("reset".to_string()));

        assert_eq!(
            error.to_string(),
            "role query failed: transport failure: reset"
        );
        assert_eq!(
            error.source().map(ToString::to_string).as_deref(),
            Some("transport failure: reset")
        );
    }
}
