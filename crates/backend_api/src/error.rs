use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackendApiError {
    #[error("api key is required")]
    MissingApiKey,
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),
    #[error("invalid header: {0}")]
    InvalidHeader(String),
    #[error("request error: {0}")]
    Request(#[from] reqwest::Error),
    #[error("HTTP {0} {1}")]
    Status(StatusCode, String),
    #[error("response decode error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl BackendApiError {
    /// Returns the HTTP status when the backend answered with a non-success code.
    #[must_use]
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status(status, _) => Some(*status),
            Self::Request(error) => error.status(),
            _ => None,
        }
    }
}

/// Error body shapes emitted by the auth and REST services.
#[derive(Debug, Default, Deserialize)]
struct ErrorPayload {
    message: Option<String>,
    msg: Option<String>,
    error_description: Option<String>,
    error: Option<String>,
    hint: Option<String>,
}

impl ErrorPayload {
    fn best_message(&self) -> Option<String> {
        let message = [
            self.message.as_deref(),
            self.msg.as_deref(),
            self.error_description.as_deref(),
            self.error.as_deref(),
        ]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|value| !value.is_empty())?;

        match self.hint.as_deref().map(str::trim) {
            Some(hint) if !hint.is_empty() => Some(format!("{message} ({hint})")),
            _ => Some(message.to_string()),
        }
    }
}

pub fn parse_error_message(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<ErrorPayload>(body) {
        if let Some(message) = payload.best_message() {
            return message;
        }
    }

    if body.trim().is_empty() {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    } else {
        body.to_string()
    }
}
