//! Access-token freshness checks and the refresh exchange.
//!
//! `TokenRefresher::ensure_valid` is called at the top of every gateway
//! operation. A stale access token is exchanged at most once per expiry,
//! however many requests for the same session arrive at the same time: the
//! first caller takes the store's refresh guard and performs the exchange,
//! later callers wait on the guard and then reuse whatever it produced.

use chrono::Utc;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::api::{ApiError, BackendClient};

use super::authenticator::Expiry;
use super::session::{Session, SessionStore, Token, TokenState};

const REFRESH_PATH: &str = "auth/refresh";

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access_token: String,
    #[serde(alias = "expires_at")]
    access_token_expires: Expiry,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    refresh_token_expires: Option<Expiry>,
}

impl RefreshResponse {
    /// Apply a refresh result to the session it was obtained for.
    fn apply_to(self, mut session: Session) -> Result<Session, String> {
        if self.access_token.is_empty() {
            return Err("refresh response is missing the access token".to_string());
        }

        let access_expiry = self
            .access_token_expires
            .to_utc()
            .ok_or_else(|| "refresh response has an invalid expiry".to_string())?;
        if access_expiry <= Utc::now() {
            return Err(format!("refresh returned an already expired token ({})", access_expiry));
        }

        session.access = Token::new(self.access_token, access_expiry);

        // Rotated refresh token. Without a new expiry the old one still bounds it.
        if let Some(rotated) = self.refresh_token.filter(|t| !t.is_empty()) {
            let expiry = self
                .refresh_token_expires
                .and_then(|e| e.to_utc())
                .unwrap_or(session.refresh.expires_at);
            session.refresh = Token::new(rotated, expiry);
        }

        session.error = None;
        Ok(session)
    }
}

/// Keeps the access token in a `SessionStore` usable.
#[derive(Clone, Debug)]
pub struct TokenRefresher {
    backend: BackendClient,
}

impl TokenRefresher {
    pub fn new(backend: BackendClient) -> Self {
        Self { backend }
    }

    /// Return a session whose access token is valid right now, refreshing
    /// it first if needed.
    ///
    /// Errors:
    /// - `Unauthorized` when the store is empty
    /// - `SessionExpired` when the refresh token expired or an earlier
    ///   refresh failed
    /// - `RefreshFailed` when this call's refresh exchange failed
    pub async fn ensure_valid(&self, store: &SessionStore) -> Result<Session, ApiError> {
        let session = Self::current(store).await?;
        if let Some(result) = Self::settled(session.clone()) {
            return result;
        }

        let _guard = store.lock_refresh().await;

        // Someone else may have refreshed (or failed) while we waited.
        let session = Self::current(store).await?;
        if let Some(result) = Self::settled(session.clone()) {
            debug!(user_id = %session.user_id(), "Refresh already handled by a concurrent caller");
            return result;
        }

        self.refresh(store, session).await
    }

    async fn current(store: &SessionStore) -> Result<Session, ApiError> {
        store
            .snapshot()
            .await
            .ok_or_else(|| ApiError::Unauthorized("no active session".to_string()))
    }

    /// Outcome for every state that needs no refresh exchange.
    fn settled(session: Session) -> Option<Result<Session, ApiError>> {
        match session.state() {
            TokenState::Valid => Some(Ok(session)),
            TokenState::Errored | TokenState::RefreshExpired => Some(Err(ApiError::SessionExpired)),
            TokenState::Expired | TokenState::Refreshing => None,
        }
    }

    /// Perform the exchange. Must be called with the refresh guard held.
    ///
    /// The outcome is only written back if the store still holds the session
    /// that was refreshed. A logout or a new login during the exchange wins.
    async fn refresh(&self, store: &SessionStore, session: Session) -> Result<Session, ApiError> {
        debug!(user_id = %session.user_id(), "Access token expired, refreshing");

        let outcome = self
            .exchange(&session)
            .await
            .and_then(|response| response.apply_to(session.clone()));

        match outcome {
            Ok(refreshed) => {
                if !store.commit_refresh(&session, refreshed.clone()).await {
                    return Self::superseded(store, &session).await;
                }
                info!(
                    user_id = %refreshed.user_id(),
                    expires_at = %refreshed.access.expires_at,
                    "Access token refreshed"
                );
                Ok(refreshed)
            }
            Err(reason) => {
                if !store.mark_refresh_failed(&session).await {
                    debug!(reason = %reason, "Discarding refresh failure for a superseded session");
                    return Self::superseded(store, &session).await;
                }
                warn!(reason = %reason, "Token refresh failed, session needs a new login");
                Err(ApiError::RefreshFailed(reason))
            }
        }
    }

    /// Answer for a caller whose refresh result was discarded because the
    /// session was cleared or replaced while the exchange was in flight.
    async fn superseded(store: &SessionStore, refreshed_from: &Session) -> Result<Session, ApiError> {
        info!(user_id = %refreshed_from.user_id(), "Session changed during refresh, result discarded");
        let current = Self::current(store).await?;
        Self::settled(current).unwrap_or_else(|| {
            Err(ApiError::Unauthorized("session changed during refresh".to_string()))
        })
    }

    async fn exchange(&self, session: &Session) -> Result<RefreshResponse, String> {
        let response = self
            .backend
            .http()
            .post(self.backend.url(REFRESH_PATH))
            .bearer_auth(session.refresh_token())
            .send()
            .await
            .map_err(|e| ApiError::from_transport(&e).to_string())?;

        let status = response.status();
        if !status.is_success() {
            let body = BackendClient::read_error_body(response).await;
            return Err(format!(
                "backend answered {}: {}",
                status.as_u16(),
                ApiError::truncate_body(&body)
            ));
        }

        let body = BackendClient::read_json(response, REFRESH_PATH)
            .await
            .map_err(|e| e.to_string())?;
        serde_json::from_value(body).map_err(|e| format!("malformed refresh response: {}", e))
    }
}
