//! Tracing targets and subscriber setup.

use tracing_subscriber::{fmt, EnvFilter};

use crate::config::EnvConfig;

pub const TARGET_SESSION: &str = "authsync::session";
pub const TARGET_ROLES: &str = "authsync::roles";
pub const TARGET_CONNECTIVITY: &str = "authsync::connectivity";
pub const TARGET_FAULT: &str = "authsync::fault";

pub const DEFAULT_LOG_FILTER: &str = "info";

/// Builds the filter from `RUST_LOG`, then the configured filter, then `info`.
pub fn env_filter(config: &EnvConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_filter.as_deref().unwrap_or(DEFAULT_LOG_FILTER)))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
}

/// Installs a global `fmt` subscriber.
///
/// Returns `false` when a global subscriber was already installed.
pub fn init_logging(config: &EnvConfig) -> bool {
    fmt()
        .with_env_filter(env_filter(config))
        .with_target(true)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::init_logging;
    use crate::config::EnvConfig;

    #[test]
    fn second_initialization_is_rejected_without_panicking() {
        let config = EnvConfig::default();
        let _ = init_logging(&config);
        assert!(!init_logging(&config));
    }
}
