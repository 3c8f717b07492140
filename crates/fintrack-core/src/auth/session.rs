use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, MutexGuard, RwLock};

/// Tag recorded on a session whose last refresh attempt failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionError {
    RefreshFailed,
}

/// An opaque credential together with the instant it stops being valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub value: String,
    pub expires_at: DateTime<Utc>,
}

impl Token {
    pub fn new(value: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            value: value.into(),
            expires_at,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Where a session stands with respect to its tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenState {
    Valid,
    Expired,
    Refreshing,
    RefreshExpired,
    Errored,
}

/// The authenticated context for one logged-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    user_id: String,
    pub username: String,
    pub access: Token,
    pub refresh: Token,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<SessionError>,
}

impl Session {
    pub fn new(user_id: impl Into<String>, username: impl Into<String>, access: Token, refresh: Token) -> Self {
        Self {
            user_id: user_id.into(),
            username: username.into(),
            access,
            refresh,
            error: None,
        }
    }

    /// Identifier assigned at login. There is no setter.
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn access_token(&self) -> &str {
        &self.access.value
    }

    pub fn refresh_token(&self) -> &str {
        &self.refresh.value
    }

    /// Classify the session at `now`. Never returns `Refreshing`; that
    /// state belongs to the store holding the session.
    ///
    /// An unexpired access token is usable even when the refresh token has
    /// lapsed; the refresh expiry only matters once a refresh is needed.
    pub fn state_at(&self, now: DateTime<Utc>) -> TokenState {
        if self.error.is_some() {
            TokenState::Errored
        } else if !self.access.is_expired_at(now) {
            TokenState::Valid
        } else if self.refresh.is_expired_at(now) {
            TokenState::RefreshExpired
        } else {
            TokenState::Expired
        }
    }

    /// Whether `other` came from the same login grant as `self`.
    pub(crate) fn same_grant(&self, other: &Session) -> bool {
        self.user_id == other.user_id && self.refresh.value == other.refresh.value
    }

    pub fn state(&self) -> TokenState {
        self.state_at(Utc::now())
    }

    pub fn time_until_expiry(&self) -> Duration {
        self.access.expires_at - Utc::now()
    }

    /// Get minutes remaining until the access token expires (for display)
    pub fn minutes_until_expiry(&self) -> i64 {
        self.time_until_expiry().num_minutes().max(0)
    }
}

/// Shared holder of the current session for one user.
///
/// Clones share the same session. Readers always see a whole session, and
/// the refresh guard serializes refresh exchanges for this session only.
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    inner: Arc<StoreInner>,
}

#[derive(Debug, Default)]
struct StoreInner {
    session: RwLock<Option<Session>>,
    refresh_guard: Mutex<()>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(session: Session) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                session: RwLock::new(Some(session)),
                refresh_guard: Mutex::new(()),
            }),
        }
    }

    /// Copy of the current session, if any
    pub async fn snapshot(&self) -> Option<Session> {
        self.inner.session.read().await.clone()
    }

    /// Replace the session wholesale (login, successful refresh)
    pub async fn replace(&self, session: Session) {
        *self.inner.session.write().await = Some(session);
    }

    /// Drop the session (logout)
    pub async fn clear(&self) -> Option<Session> {
        self.inner.session.write().await.take()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.session.read().await.is_none()
    }

    /// Current state, reporting `Refreshing` while a refresh is in flight.
    /// Returns `None` for an empty store.
    pub async fn state(&self) -> Option<TokenState> {
        if self.inner.refresh_guard.try_lock().is_err() {
            return Some(TokenState::Refreshing);
        }
        self.snapshot().await.map(|s| s.state())
    }

    /// Store the result of refreshing `refreshed_from`, unless the session
    /// was cleared or replaced in the meantime. Returns whether it was stored.
    pub(crate) async fn commit_refresh(&self, refreshed_from: &Session, refreshed: Session) -> bool {
        let mut slot = self.inner.session.write().await;
        match slot.as_ref() {
            Some(current) if current.same_grant(refreshed_from) => {
                *slot = Some(refreshed);
                true
            }
            _ => false,
        }
    }

    /// Mark the stored session as errored after a failed refresh of
    /// `refreshed_from`. A session that was cleared or replaced since is left
    /// alone. Returns whether the mark was applied.
    pub(crate) async fn mark_refresh_failed(&self, refreshed_from: &Session) -> bool {
        match self.inner.session.write().await.as_mut() {
            Some(current) if current.same_grant(refreshed_from) => {
                current.error = Some(SessionError::RefreshFailed);
                true
            }
            _ => false,
        }
    }

    pub(crate) async fn lock_refresh(&self) -> MutexGuard<'_, ()> {
        self.inner.refresh_guard.lock().await
    }
}
