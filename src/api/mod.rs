//! REST transport module.
//!
//! Wraps the backend's `/api` surface. Every response passes through
//! [`ApiClient::check`], which is the single place 401/403 are intercepted.

mod introspection;
mod media;
mod resources;

pub use media::UploadFile;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::redirect::Policy;
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;

use crate::config::Config;
use crate::errors::{AppError, ServerErrorBody};

/// Header identifying this client to the backend.
pub const CLIENT_IDENTITY_HEADER: &str = "x-client-identity";

/// HTTP client bound to one backend.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    /// Build a client from configuration.
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(
            CLIENT_IDENTITY_HEADER,
            HeaderValue::from_str(&config.client_identity)
                .map_err(|e| AppError::Config(format!("Invalid client identity: {}", e)))?,
        );
        if let Some(token) = &config.api_token {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {}", token))
                    .map_err(|e| AppError::Config(format!("Invalid API token: {}", e)))?,
            );
        }

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .redirect(Policy::none())
            .build()?;

        Ok(Self {
            http,
            base_url: config.api_base_url(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Send a request and decode its JSON body; an empty body decodes as `null`.
    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, AppError> {
        let response = Self::check(request.send().await?).await?;
        let body = response.text().await?;
        let body = if body.trim().is_empty() { "null" } else { body.as_str() };
        Ok(serde_json::from_str(body)?)
    }

    /// Send a request whose response body is ignored.
    async fn send_unit(&self, request: RequestBuilder) -> Result<(), AppError> {
        Self::check(request.send().await?).await?;
        Ok(())
    }

    async fn check(response: Response) -> Result<Response, AppError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let url = response.url().clone();
        let reason = status.canonical_reason().unwrap_or("Request failed").to_string();
        let body = response.text().await.unwrap_or_default();
        let err = ServerErrorBody::into_error(status.as_u16(), &reason, &body);

        if err.requires_sign_in() {
            tracing::warn!("Authorization rejected for {}: {}", url, err.message());
        } else {
            tracing::error!("Error\nCode: {}\nStatus: {}\nUrl: {}", status.as_u16(), reason, url);
        }

        Err(err)
    }
}
