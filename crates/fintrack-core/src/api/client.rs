//! Shared HTTP plumbing for talking to the finance backend.
//!
//! `BackendClient` owns the pooled `reqwest::Client` and the backend base
//! URL. The authenticator, the refresher and the gateway each hold a clone.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{Client, Response};
use serde_json::Value;

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// Default HTTP request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Backend client.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone, Debug)]
pub struct BackendClient {
    client: Client,
    base_url: String,
}

impl BackendClient {
    /// Create a client with the default timeout
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::with_timeout(base_url, Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS))
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        let base_url = base_url.into().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            anyhow::bail!("Backend base URL must not be empty");
        }

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn http(&self) -> &Client {
        &self.client
    }

    /// Join a resource path onto the base URL.
    /// `"/transactions/"` and `"transactions"` address the same resource.
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_matches('/'))
    }

    /// Read a successful response body as JSON. An empty body (e.g. 204 on
    /// delete) is `null`; anything unparsable is a malformed response.
    pub(crate) async fn read_json(response: Response, what: &str) -> Result<Value, ApiError> {
        let text = response
            .text()
            .await
            .map_err(|e| ApiError::from_transport(&e))?;

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&text).map_err(|e| {
            ApiError::Network(format!("Malformed response from {}: {}", what, e))
        })
    }

    /// Read a non-2xx response body. A body that cannot be read is treated
    /// as empty so error mapping still succeeds.
    pub(crate) async fn read_error_body(response: Response) -> String {
        response.text().await.unwrap_or_default()
    }
}
