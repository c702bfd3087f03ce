use std::collections::BTreeMap;
use std::time::Duration;

use crate::url::DEFAULT_ROLES_TABLE;

/// Transport configuration for backend requests.
#[derive(Debug, Clone)]
pub struct BackendApiConfig {
    /// Project base URL, e.g. `https://project.example.co`.
    pub base_url: String,
    /// Public project key sent in the `apikey` header.
    pub api_key: String,
    /// Session token an adapter starts with; per-request tokens take precedence.
    pub access_token: Option<String>,
    /// Table holding `(user_id, role)` rows.
    pub roles_table: String,
    /// Optional `User-Agent` override.
    pub user_agent: Option<String>,
    /// Additional headers merged into request headers.
    pub extra_headers: BTreeMap<String, String>,
    /// Optional request timeout.
    pub timeout: Option<Duration>,
}

impl Default for BackendApiConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            api_key: String::new(),
            access_token: None,
            roles_table: DEFAULT_ROLES_TABLE.to_string(),
            user_agent: None,
            extra_headers: BTreeMap::new(),
            timeout: None,
        }
    }
}

impl BackendApiConfig {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            ..Self::default()
        }
    }

    pub fn with_access_token(mut self, access_token: impl Into<String>) -> Self {
        self.access_token = Some(access_token.into());
        self
    }

    pub fn with_roles_table(mut self, roles_table: impl Into<String>) -> Self {
        self.roles_table = roles_table.into();
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn insert_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_headers.insert(key.into(), value.into());
        self
    }
}
