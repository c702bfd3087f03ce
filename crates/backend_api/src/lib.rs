//! Transport-only client primitives for the hosted identity backend.
//!
//! This crate owns request building and response parsing for the auth `user`
//! endpoint and the REST role table only. It holds no session state and has no
//! coupling to the client-side synchronization core.

pub mod client;
pub mod config;
pub mod error;
pub mod headers;
pub mod payload;
pub mod url;

pub use client::BackendApiClient;
pub use config::BackendApiConfig;
pub use error::BackendApiError;
pub use payload::{RoleRecord, UserRecord};
pub use reqwest::StatusCode;
pub use url::{normalize_base_url, DEFAULT_ROLES_TABLE};
