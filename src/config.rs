//! Environment configuration.

use std::env;
use std::time::Duration;

use crate::runtime::{ConnectivityOptions, SyncOptions};

pub const ENV_BACKEND_URL: &str = "AUTHSYNC_BACKEND_URL";
pub const ENV_BACKEND_KEY: &str = "AUTHSYNC_BACKEND_KEY";
pub const ENV_LOG: &str = "AUTHSYNC_LOG";
pub const ENV_IDENTITY_TIMEOUT_MS: &str = "AUTHSYNC_IDENTITY_TIMEOUT_MS";
pub const ENV_ROLE_TIMEOUT_MS: &str = "AUTHSYNC_ROLE_TIMEOUT_MS";
pub const ENV_LIVENESS_EVENT: &str = "AUTHSYNC_LIVENESS_EVENT";
pub const ENV_STALE_AFTER_MS: &str = "AUTHSYNC_STALE_AFTER_MS";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvConfig {
    pub backend_url: Option<String>,
    pub backend_key: Option<String>,
    pub log_filter: Option<String>,
    /// `Some(0)` disables the identity timeout.
    pub identity_timeout_ms: Option<u64>,
    /// `Some(0)` disables the role query timeout.
    pub role_timeout_ms: Option<u64>,
    pub liveness_event: Option<String>,
    pub stale_after_ms: Option<u64>,
}

impl EnvConfig {
    pub fn from_env() -> Self {
        Self {
            backend_url: env_string_opt(ENV_BACKEND_URL),
            backend_key: env_string_opt(ENV_BACKEND_KEY),
            log_filter: env_string_opt(ENV_LOG),
            identity_timeout_ms: env_u64_opt(ENV_IDENTITY_TIMEOUT_MS),
            role_timeout_ms: env_u64_opt(ENV_ROLE_TIMEOUT_MS),
            liveness_event: env_string_opt(ENV_LIVENESS_EVENT),
            stale_after_ms: env_u64_opt(ENV_STALE_AFTER_MS),
        }
    }

    pub fn sync_options(&self) -> SyncOptions {
        let defaults = SyncOptions::default();
        SyncOptions {
            identity_timeout: timeout_from_ms(self.identity_timeout_ms, defaults.identity_timeout),
            role_query_timeout: timeout_from_ms(self.role_timeout_ms, defaults.role_query_timeout),
        }
    }

    pub fn connectivity_options(&self) -> ConnectivityOptions {
        let mut options = ConnectivityOptions::default();
        if let Some(event_name) = &self.liveness_event {
            options.event_name = event_name.clone();
        }
        options.stale_after = self
            .stale_after_ms
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis);
        options
    }
}

fn timeout_from_ms(value: Option<u64>, default: Option<Duration>) -> Option<Duration> {
    match value {
        None => default,
        Some(0) => None,
        Some(ms) => Some(Duration::from_millis(ms)),
    }
}

fn env_string_opt(key: &str) -> Option<String> {
    env::var(key).ok().and_then(|value| {
        if value.trim().is_empty() {
            None
        } else {
            Some(value)
        }
    })
}

fn env_u64_opt(key: &str) -> Option<u64> {
    env_string_opt(key).and_then(|value| value.trim().parse().ok())
}
