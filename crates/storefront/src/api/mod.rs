//! Remote storefront API client.
//!
//! # Architecture
//!
//! - Plain JSON over HTTP with `reqwest`; every path is joined onto `API_URL`
//! - The remote API is source of truth for items, carts, orders and reviews
//! - Every response uses the envelope `{ statusCode, message, data }`:
//!   `statusCode == 200` is success, anything else is a business failure whose
//!   reason is carried in `message`
//!
//! Caching is not done here; callers go through [`crate::query_cache`].
//!
//! # Example
//!
//! ```rust,ignore
//! use farmerspot_storefront::api::ApiClient;
//!
//! let client = ApiClient::new(&config.api)?;
//! let item = client.get_item(&ItemId::new("65a1")).await?;
//! client.add_to_cart(&user_id, &item.id, 2).await?;
//! ```

mod admin;
mod auth;
mod cart;
mod catalog;
mod orders;
mod reviews;
pub mod types;

use std::sync::Arc;

use reqwest::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::config::ApiConfig;

pub use auth::NewAccount;
pub use types::*;

/// Envelope status code signalling success.
pub const STATUS_OK: u16 = 200;

/// Errors that can occur when talking to the remote API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP request failed (connection, timeout, TLS).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success HTTP status and no envelope.
    #[error("Unexpected HTTP status {status}: {body}")]
    Status { status: u16, body: String },

    /// The server understood the request but declined it.
    #[error("Rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// Response body was not a valid envelope.
    #[error("JSON parse error: {0}")]
    Decode(#[from] serde_json::Error),

    /// The configured base URL cannot carry path segments.
    #[error("Invalid API base URL: {0}")]
    InvalidBaseUrl(String),
}

impl ApiError {
    /// Whether the failure was a business-level rejection rather than a
    /// transport problem.
    #[must_use]
    pub const fn is_rejection(&self) -> bool {
        matches!(self, Self::Rejected { .. })
    }
}

/// Client for the remote storefront API.
///
/// Cheaply cloneable; clones share the underlying connection pool.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base_url: Url,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.inner.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Create a new API client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                client,
                base_url: config.base_url.clone(),
            }),
        })
    }

    /// The origin every request is prefixed with.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// Build an endpoint URL from path segments (each segment is escaped).
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.inner.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ApiError::InvalidBaseUrl(self.inner.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Issue a GET and unwrap the envelope.
    async fn get<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, ApiError> {
        self.execute::<(), T>(Method::GET, segments, None).await
    }

    /// Issue a POST with a JSON body and unwrap the envelope.
    async fn post<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        segments: &[&str],
        body: &B,
    ) -> Result<T, ApiError> {
        self.execute(Method::POST, segments, Some(body)).await
    }

    /// Issue a PATCH with a JSON body and unwrap the envelope.
    async fn patch<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        segments: &[&str],
        body: &B,
    ) -> Result<T, ApiError> {
        self.execute(Method::PATCH, segments, Some(body)).await
    }

    /// Send a request and decode its envelope.
    async fn execute<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        method: Method,
        segments: &[&str],
        body: Option<&B>,
    ) -> Result<T, ApiError> {
        let url = self.endpoint(segments)?;
        debug!(method = %method, url = %url, "API request");

        let mut request = self.inner.client.request(method, url);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();

        // Get response body as text first for better error diagnostics
        let response_text = response.text().await?;

        decode_envelope(status, &response_text)
    }
}

/// Decode an envelope body, mapping non-200 `statusCode`s to `Rejected`.
///
/// Some API errors come back with a 4xx/5xx HTTP status but a well-formed
/// envelope; the envelope wins so the server's message reaches the user.
fn decode_envelope<T: DeserializeOwned>(
    status: reqwest::StatusCode,
    response_text: &str,
) -> Result<T, ApiError> {
    let envelope: Envelope<serde_json::Value> = match serde_json::from_str(response_text) {
        Ok(envelope) => envelope,
        Err(e) => {
            if !status.is_success() {
                tracing::error!(
                    status = %status,
                    body = %response_text.chars().take(500).collect::<String>(),
                    "API returned non-success status without envelope"
                );
                return Err(ApiError::Status {
                    status: status.as_u16(),
                    body: response_text.chars().take(200).collect(),
                });
            }
            tracing::error!(
                error = %e,
                body = %response_text.chars().take(500).collect::<String>(),
                "Failed to parse API envelope"
            );
            return Err(ApiError::Decode(e));
        }
    };

    if envelope.status_code != STATUS_OK {
        let message = envelope
            .message
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| "Request was declined".to_string());
        debug!(status_code = envelope.status_code, %message, "API rejected request");
        return Err(ApiError::Rejected {
            status: envelope.status_code,
            message,
        });
    }

    Ok(serde_json::from_value(
        envelope.data.unwrap_or(serde_json::Value::Null),
    )?)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use reqwest::StatusCode;
    use serde::de::IgnoredAny;

    fn client(base: &str) -> ApiClient {
        let config = crate::config::StorefrontConfig::for_api_url(base).unwrap();
        ApiClient::new(&config.api).unwrap()
    }

    #[test]
    fn test_endpoint_escapes_segments() {
        let api = client("http://localhost:4000/api");
        let url = api.endpoint(&["search", "sweet potato"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:4000/api/search/sweet%20potato");
    }

    #[test]
    fn test_endpoint_on_bare_origin() {
        let api = client("http://localhost:4000");
        let url = api.endpoint(&["cart", "u1"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:4000/cart/u1");
    }

    #[test]
    fn test_decode_success_envelope() {
        let body = r#"{"statusCode":200,"message":"ok","data":[{"item":"a","count":2}]}"#;
        let lines: Vec<serde_json::Value> = decode_envelope(StatusCode::OK, body).unwrap();
        assert_eq!(lines.len(), 1);
    }

    #[test]
    fn test_decode_rejected_envelope_carries_message() {
        let body = r#"{"statusCode":400,"message":"out of stock","data":null}"#;
        let err = decode_envelope::<IgnoredAny>(StatusCode::OK, body).unwrap_err();
        assert!(err.is_rejection());
        assert_eq!(err.to_string(), "Rejected (400): out of stock");
    }

    #[test]
    fn test_decode_envelope_on_error_status_prefers_envelope() {
        let body = r#"{"statusCode":404,"message":"Item not found"}"#;
        let err = decode_envelope::<IgnoredAny>(StatusCode::NOT_FOUND, body).unwrap_err();
        assert!(matches!(err, ApiError::Rejected { status: 404, ref message } if message == "Item not found"));
    }

    #[test]
    fn test_decode_non_envelope_error_status() {
        let err = decode_envelope::<IgnoredAny>(StatusCode::BAD_GATEWAY, "<html>").unwrap_err();
        assert!(matches!(err, ApiError::Status { status: 502, .. }));
        assert!(!err.is_rejection());
    }

    #[test]
    fn test_decode_missing_message_gets_default() {
        let body = r#"{"statusCode":500}"#;
        let err = decode_envelope::<IgnoredAny>(StatusCode::OK, body).unwrap_err();
        assert!(matches!(err, ApiError::Rejected { ref message, .. } if message == "Request was declined"));
    }

    #[test]
    fn test_decode_garbage_body() {
        let err = decode_envelope::<IgnoredAny>(StatusCode::OK, "not json").unwrap_err();
        assert!(matches!(err, ApiError::Decode(_)));
    }
}
