use reqwest::Url;

use crate::error::BackendApiError;

/// Role table queried when the configuration does not name one.
pub const DEFAULT_ROLES_TABLE: &str = "user_roles";

pub const AUTH_USER_PATH: &str = "auth/v1/user";
pub const REST_PATH: &str = "rest/v1";

/// Normalize a backend base URL.
///
/// Normalization rules:
/// 1) trim surrounding whitespace
/// 2) strip trailing slashes
/// 3) reject empty input and anything that is not an absolute http(s) URL
pub fn normalize_base_url(input: &str) -> Result<String, BackendApiError> {
    let trimmed = input.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(BackendApiError::InvalidBaseUrl(
            "base URL is empty".to_string(),
        ));
    }

    let parsed = Url::parse(trimmed)
        .map_err(|error| BackendApiError::InvalidBaseUrl(format!("{trimmed}: {error}")))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(BackendApiError::InvalidBaseUrl(format!(
            "{trimmed}: unsupported scheme '{}'",
            parsed.scheme()
        )));
    }

    Ok(trimmed.to_string())
}

pub fn auth_user_url(base_url: &str) -> Result<Url, BackendApiError> {
    let base = normalize_base_url(base_url)?;
    parse_url(&format!("{base}/{AUTH_USER_PATH}"))
}

/// Role-table query for one user: `select=role&user_id=eq.<id>`.
pub fn roles_url(base_url: &str, table: &str, user_id: &str) -> Result<Url, BackendApiError> {
    let base = normalize_base_url(base_url)?;
    let table = table.trim();
    let table = if table.is_empty() {
        DEFAULT_ROLES_TABLE
    } else {
        table
    };

    let mut url = parse_url(&format!("{base}/{REST_PATH}/{table}"))?;
    url.query_pairs_mut()
        .append_pair("select", "role")
        .append_pair("user_id", &format!("eq.{user_id}"));
    Ok(url)
}

fn parse_url(value: &str) -> Result<Url, BackendApiError> {
    Url::parse(value).map_err(|error| BackendApiError::InvalidBaseUrl(format!("{value}: {error}")))
}
