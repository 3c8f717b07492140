//! Authenticated forwarding of resource requests to the backend.
//!
//! Every call goes through `TokenRefresher::ensure_valid` first, so the
//! request that reaches the backend always carries a current access token.
//! Failures come back as `ApiError` values; nothing here panics on a bad
//! backend response.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::auth::{SessionStore, TokenRefresher};

use super::{ApiError, BackendClient};

/// Method, body and extra headers for a proxied request.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub method: Method,
    pub body: Option<Value>,
    pub headers: HeaderMap,
}

impl RequestOptions {
    pub fn get() -> Self {
        Self::default()
    }

    pub fn post(body: Value) -> Self {
        Self {
            method: Method::POST,
            body: Some(body),
            ..Self::default()
        }
    }

    pub fn delete() -> Self {
        Self {
            method: Method::DELETE,
            ..Self::default()
        }
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }
}

/// Forwards requests for one backend, refreshing tokens as needed.
/// Clone is cheap; all clones share the HTTP connection pool.
#[derive(Clone, Debug)]
pub struct AuthGateway {
    backend: BackendClient,
    refresher: TokenRefresher,
}

impl AuthGateway {
    pub fn new(backend: BackendClient) -> Self {
        Self {
            refresher: TokenRefresher::new(backend.clone()),
            backend,
        }
    }

    pub fn refresher(&self) -> &TokenRefresher {
        &self.refresher
    }

    /// Send `options` to `<base>/<resource_path>` on behalf of the session
    /// in `store` and return the backend's JSON body.
    pub async fn proxy(
        &self,
        store: &SessionStore,
        resource_path: &str,
        options: RequestOptions,
    ) -> Result<Value, ApiError> {
        let resource = resource_path.trim_matches('/');

        let session = self.refresher.ensure_valid(store).await.map_err(|e| {
            debug!(resource = %resource, error = %e, "No usable session for proxied request");
            ApiError::Unauthorized(e.to_string())
        })?;

        let bearer = HeaderValue::from_str(&format!("Bearer {}", session.access_token()))
            .map_err(|_| ApiError::Unauthorized("access token is not a valid header value".to_string()))?;

        // Caller headers never replace the bearer credential
        let mut headers = options.headers;
        headers.remove(AUTHORIZATION);
        headers.insert(AUTHORIZATION, bearer);

        let method = options.method;
        let mut request = self
            .backend
            .http()
            .request(method.clone(), self.backend.url(resource))
            .headers(headers);
        if let Some(ref body) = options.body {
            request = request.json(body);
        }

        debug!(method = %method, resource = %resource, "Forwarding request");
        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(method = %method, resource = %resource, error = %e, "Backend request failed");
                return Err(ApiError::from_transport(&e));
            }
        };

        let status = response.status();
        if !status.is_success() {
            let body = BackendClient::read_error_body(response).await;
            warn!(
                method = %method,
                resource = %resource,
                status = status.as_u16(),
                body = %ApiError::truncate_body(&body),
                "Backend returned an error"
            );
            return Err(ApiError::from_status(status, &body, resource));
        }

        BackendClient::read_json(response, resource).await.map_err(|e| {
            warn!(method = %method, resource = %resource, error = %e, "Unreadable backend response");
            e
        })
    }

    /// `proxy` followed by deserialization into `T`.
    pub async fn proxy_as<T: DeserializeOwned>(
        &self,
        store: &SessionStore,
        resource_path: &str,
        options: RequestOptions,
    ) -> Result<T, ApiError> {
        let value = self.proxy(store, resource_path, options).await?;
        serde_json::from_value(value).map_err(|e| {
            warn!(resource = %resource_path, error = %e, "Backend response did not match the expected shape");
            ApiError::Network(format!("Malformed response from {}: {}", resource_path, e))
        })
    }
}
