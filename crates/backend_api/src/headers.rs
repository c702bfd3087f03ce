use std::collections::BTreeMap;

use crate::config::BackendApiConfig;
use crate::error::BackendApiError;

pub const HEADER_API_KEY: &str = "apikey";
pub const HEADER_AUTHORIZATION: &str = "authorization";
pub const HEADER_ACCEPT: &str = "accept";
pub const HEADER_USER_AGENT: &str = "user-agent";

const DEFAULT_USER_AGENT: &str = concat!("authsync/", env!("CARGO_PKG_VERSION"));

/// Build a deterministic header map for backend requests.
///
/// The bearer is the session access token when one is supplied, and the
/// project key otherwise, which is what the REST service expects from an
/// anonymous caller.
pub fn build_headers(
    config: &BackendApiConfig,
    access_token: Option<&str>,
) -> Result<BTreeMap<String, String>, BackendApiError> {
    let api_key = config.api_key.trim();
    if api_key.is_empty() {
        return Err(BackendApiError::MissingApiKey);
    }

    let mut headers = BTreeMap::new();
    headers.insert(HEADER_API_KEY.to_owned(), api_key.to_owned());

    let bearer = access_token
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .unwrap_or(api_key);
    headers.insert(HEADER_AUTHORIZATION.to_owned(), format!("Bearer {bearer}"));
    headers.insert(HEADER_ACCEPT.to_owned(), "application/json".to_owned());

    let user_agent = config
        .user_agent
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(DEFAULT_USER_AGENT);
    headers.insert(HEADER_USER_AGENT.to_owned(), user_agent.to_owned());

    for (key, value) in &config.extra_headers {
        headers.insert(key.trim().to_ascii_lowercase(), value.trim().to_owned());
    }

    Ok(headers)
}
