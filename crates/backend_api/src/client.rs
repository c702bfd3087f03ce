use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;

use crate::config::BackendApiConfig;
use crate::error::{parse_error_message, BackendApiError};
use crate::headers::build_headers;
use crate::payload::{RoleRecord, UserRecord};
use crate::url::{auth_user_url, normalize_base_url, roles_url};

#[derive(Debug)]
pub struct BackendApiClient {
    http: Client,
    config: BackendApiConfig,
}

impl BackendApiClient {
    pub fn new(config: BackendApiConfig) -> Result<Self, BackendApiError> {
        normalize_base_url(&config.base_url)?;
        if config.api_key.trim().is_empty() {
            return Err(BackendApiError::MissingApiKey);
        }

        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build()?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &BackendApiConfig {
        &self.config
    }

    pub fn build_headers(
        &self,
        access_token: Option<&str>,
    ) -> Result<HeaderMap, BackendApiError> {
        let headers = build_headers(&self.config, access_token)?;
        let mut out = HeaderMap::new();
        for (key, value) in headers {
            out.insert(
                HeaderName::from_bytes(key.as_bytes())
                    .map_err(|_| BackendApiError::InvalidHeader(format!("invalid key: {key}")))?,
                HeaderValue::from_str(&value).map_err(|_| {
                    BackendApiError::InvalidHeader(format!("invalid value for {key}"))
                })?,
            );
        }
        Ok(out)
    }

    pub fn build_user_request(
        &self,
        access_token: &str,
    ) -> Result<RequestBuilder, BackendApiError> {
        let url = auth_user_url(&self.config.base_url)?;
        let headers = self.build_headers(Some(access_token))?;
        Ok(self.http.get(url).headers(headers))
    }

    pub fn build_roles_request(
        &self,
        user_id: &str,
        access_token: Option<&str>,
    ) -> Result<RequestBuilder, BackendApiError> {
        let url = roles_url(&self.config.base_url, &self.config.roles_table, user_id)?;
        let headers = self.build_headers(access_token)?;
        Ok(self.http.get(url).headers(headers))
    }

    /// Fetches the user bound to `access_token`.
    ///
    /// `401`/`403` mean the token no longer maps to a user and yield `Ok(None)`.
    pub async fn fetch_user(
        &self,
        access_token: &str,
    ) -> Result<Option<UserRecord>, BackendApiError> {
        let response = self.build_user_request(access_token)?.send().await?;
        if matches!(
            response.status(),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN
        ) {
            return Ok(None);
        }

        decode_json(response).await.map(Some)
    }

    pub async fn fetch_roles(
        &self,
        user_id: &str,
        access_token: Option<&str>,
    ) -> Result<Vec<RoleRecord>, BackendApiError> {
        let response = self
            .build_roles_request(user_id, access_token)?
            .send()
            .await?;
        decode_json(response).await
    }
}

async fn decode_json<T>(response: Response) -> Result<T, BackendApiError>
where
    T: DeserializeOwned,
{
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(BackendApiError::Status(
            status,
            parse_error_message(status, &body),
        ));
    }

    Ok(serde_json::from_str(&body)?)
}
