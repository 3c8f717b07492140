use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::api::{ApiError, BackendClient};

use super::session::{Session, SessionStore, Token};

const LOGIN_PATH: &str = "auth/login";
const LOGOUT_PATH: &str = "auth/logout";

/// Expiry timestamp as the backend sends it.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum Expiry {
    Timestamp(DateTime<Utc>),
    /// ISO timestamp without an offset, taken as UTC
    Naive(NaiveDateTime),
    UnixSeconds(i64),
}

impl Expiry {
    pub(crate) fn to_utc(&self) -> Option<DateTime<Utc>> {
        match self {
            Expiry::Timestamp(ts) => Some(*ts),
            Expiry::Naive(naive) => Some(naive.and_utc()),
            Expiry::UnixSeconds(secs) => DateTime::from_timestamp(*secs, 0),
        }
    }
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    access_token: String,
    refresh_token: String,
    #[serde(alias = "expires_at")]
    access_token_expires: Expiry,
    refresh_token_expires: Expiry,
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    user: Option<LoginUser>,
}

#[derive(Debug, Deserialize)]
struct LoginUser {
    #[serde(default)]
    id: Option<Value>,
}

impl LoginResponse {
    fn into_session(self, username: &str) -> Result<Session, ApiError> {
        if self.access_token.is_empty() || self.refresh_token.is_empty() {
            return Err(ApiError::Network("Login response is missing a token".to_string()));
        }

        let access_expiry = self.access_token_expires.to_utc();
        let refresh_expiry = self.refresh_token_expires.to_utc();
        let (Some(access_expiry), Some(refresh_expiry)) = (access_expiry, refresh_expiry) else {
            return Err(ApiError::Network("Login response has an invalid expiry".to_string()));
        };

        let user_id = self
            .user
            .and_then(|u| u.id)
            .or(self.id)
            .and_then(|id| id_to_string(&id))
            .unwrap_or_else(|| username.to_string());

        Ok(Session::new(
            user_id,
            username,
            Token::new(self.access_token, access_expiry),
            Token::new(self.refresh_token, refresh_expiry),
        ))
    }
}

fn id_to_string(id: &Value) -> Option<String> {
    match id {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Exchanges credentials for a token pair.
#[derive(Clone, Debug)]
pub struct CredentialAuthenticator {
    backend: BackendClient,
}

impl CredentialAuthenticator {
    pub fn new(backend: BackendClient) -> Self {
        Self { backend }
    }

    /// Log in and return the new session. Persisting it is up to the caller.
    pub async fn login(&self, username: &str, password: &str) -> Result<Session, ApiError> {
        if username.is_empty() || password.is_empty() {
            return Err(ApiError::InvalidCredentials(
                "Username and password are required".to_string(),
            ));
        }

        let url = self.backend.url(LOGIN_PATH);
        debug!(username = %username, "Sending login request");

        let response = self
            .backend
            .http()
            .post(&url)
            .json(&LoginRequest { username, password })
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "Login request failed");
                ApiError::from_transport(&e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = BackendClient::read_error_body(response).await;
            warn!(status = status.as_u16(), username = %username, "Login rejected");
            return Err(ApiError::from_login_rejection(&body));
        }

        let body = BackendClient::read_json(response, LOGIN_PATH).await?;
        let login: LoginResponse = serde_json::from_value(body)
            .map_err(|e| ApiError::Network(format!("Malformed login response: {}", e)))?;
        let session = login.into_session(username)?;

        info!(user_id = %session.user_id(), "Logged in");
        Ok(session)
    }

    /// Log in and place the session in `store`, replacing whatever was
    /// there (including an errored session).
    pub async fn login_into(
        &self,
        store: &SessionStore,
        username: &str,
        password: &str,
    ) -> Result<Session, ApiError> {
        let session = self.login(username, password).await?;
        store.replace(session.clone()).await;
        Ok(session)
    }

    /// Clear the store and ask the backend to revoke the refresh token.
    /// Revocation is best effort; failures are only logged.
    pub async fn logout(&self, store: &SessionStore) {
        let Some(session) = store.clear().await else {
            debug!("Logout requested without a session");
            return;
        };

        let result = self
            .backend
            .http()
            .post(self.backend.url(LOGOUT_PATH))
            .bearer_auth(session.access_token())
            .json(&json!({ "refresh_token": session.refresh_token() }))
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {
                info!(user_id = %session.user_id(), "Logged out");
            }
            Ok(response) => {
                warn!(status = response.status().as_u16(), "Backend rejected logout");
            }
            Err(e) => {
                warn!(error = %e, "Logout request failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expiry_formats() {
        let rfc: Expiry = serde_json::from_str(r#""2030-01-01T00:00:00Z""#).expect("rfc3339");
        let naive: Expiry = serde_json::from_str(r#""2030-01-01T00:00:00""#).expect("naive");
        let unix: Expiry = serde_json::from_str("1893456000").expect("unix");

        let expected = DateTime::from_timestamp(1_893_456_000, 0);
        assert_eq!(rfc.to_utc(), expected);
        assert_eq!(naive.to_utc(), expected);
        assert_eq!(unix.to_utc(), expected);
    }

    #[test]
    fn test_login_response_user_id_sources() {
        let nested: LoginResponse = serde_json::from_str(
            r#"{"access_token":"a","refresh_token":"r","access_token_expires":1893456000,
                "refresh_token_expires":1893456000,"user":{"id":"u-42","name":"Alice"}}"#,
        )
        .expect("parse");
        assert_eq!(nested.into_session("alice").expect("session").user_id(), "u-42");

        let top_level: LoginResponse = serde_json::from_str(
            r#"{"access_token":"a","refresh_token":"r","access_token_expires":1893456000,
                "refresh_token_expires":1893456000,"id":7}"#,
        )
        .expect("parse");
        assert_eq!(top_level.into_session("alice").expect("session").user_id(), "7");

        let missing: LoginResponse = serde_json::from_str(
            r#"{"access_token":"a","refresh_token":"r","access_token_expires":1893456000,
                "refresh_token_expires":1893456000}"#,
        )
        .expect("parse");
        assert_eq!(missing.into_session("alice").expect("session").user_id(), "alice");
    }

    fn authenticator_for(server: &mockito::ServerGuard) -> CredentialAuthenticator {
        CredentialAuthenticator::new(BackendClient::new(server.url()).expect("client"))
    }

    #[tokio::test]
    async fn test_login_success() {
        let mut server = mockito::Server::new_async().await;
        let access_expires = (Utc::now() + chrono::Duration::minutes(15)).to_rfc3339();
        let refresh_expires = (Utc::now() + chrono::Duration::days(7)).to_rfc3339();
        let login = server
            .mock("POST", "/auth/login")
            .match_body(mockito::Matcher::Json(json!({"username": "alice", "password": "correct-pw"})))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(format!(
                r#"{{"access_token":"acc-abc","refresh_token":"ref-xyz",
                    "access_token_expires":"{access_expires}","refresh_token_expires":"{refresh_expires}",
                    "user":{{"id":"u-1","name":"Alice","email":"alice@example.com"}}}}"#
            ))
            .expect(1)
            .create_async()
            .await;

        let session = authenticator_for(&server)
            .login("alice", "correct-pw")
            .await
            .expect("login");

        let now = Utc::now();
        assert!(!session.access_token().is_empty());
        assert!(!session.refresh_token().is_empty());
        assert!(session.access.expires_at > now);
        assert!(session.refresh.expires_at > now);
        assert_eq!(session.user_id(), "u-1");
        assert_eq!(session.username, "alice");
        assert_eq!(session.error, None);
        login.assert_async().await;
    }

    #[tokio::test]
    async fn test_login_wrong_password() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/auth/login")
            .with_status(401)
            .with_body(r#"{"msg":"Invalid username or password"}"#)
            .expect(1)
            .create_async()
            .await;

        let result = authenticator_for(&server).login("alice", "wrong-pw").await;
        assert_eq!(
            result,
            Err(ApiError::InvalidCredentials("Invalid username or password".to_string()))
        );
    }

    #[tokio::test]
    async fn test_login_rejection_without_message() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/auth/login")
            .with_status(403)
            .create_async()
            .await;

        let result = authenticator_for(&server).login("alice", "pw").await;
        assert_eq!(
            result,
            Err(ApiError::InvalidCredentials(crate::api::error::GENERIC_LOGIN_FAILURE.to_string()))
        );
    }

    #[tokio::test]
    async fn test_login_empty_credentials_skip_network() {
        let mut server = mockito::Server::new_async().await;
        let any = server.mock("POST", mockito::Matcher::Any).expect(0).create_async().await;

        let authenticator = authenticator_for(&server);
        assert!(matches!(authenticator.login("", "pw").await, Err(ApiError::InvalidCredentials(_))));
        assert!(matches!(authenticator.login("alice", "").await, Err(ApiError::InvalidCredentials(_))));
        any.assert_async().await;
    }

    #[tokio::test]
    async fn test_login_into_replaces_errored_session() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/auth/login")
            .with_status(200)
            .with_body(
                r#"{"access_token":"acc-new","refresh_token":"ref-new",
                    "access_token_expires":4102444800,"refresh_token_expires":4102444800,"id":9}"#,
            )
            .create_async()
            .await;

        let mut old = crate::auth::session::tests::session_with(
            chrono::Duration::minutes(-1),
            chrono::Duration::days(1),
        );
        old.error = Some(crate::auth::SessionError::RefreshFailed);
        let store = SessionStore::with_session(old);

        authenticator_for(&server)
            .login_into(&store, "alice", "pw")
            .await
            .expect("login");

        let stored = store.snapshot().await.expect("session");
        assert_eq!(stored.access_token(), "acc-new");
        assert_eq!(stored.user_id(), "9");
        assert_eq!(stored.state(), crate::auth::TokenState::Valid);
    }

    #[tokio::test]
    async fn test_logout_revokes_and_clears() {
        let mut server = mockito::Server::new_async().await;
        let logout = server
            .mock("POST", "/auth/logout")
            .match_header("authorization", "Bearer access-1")
            .match_body(mockito::Matcher::Json(json!({"refresh_token": "refresh-1"})))
            .with_status(204)
            .expect(1)
            .create_async()
            .await;

        let store = SessionStore::with_session(crate::auth::session::tests::session_with(
            chrono::Duration::minutes(10),
            chrono::Duration::days(1),
        ));
        authenticator_for(&server).logout(&store).await;

        assert!(store.is_empty().await);
        logout.assert_async().await;
    }

    #[tokio::test]
    async fn test_logout_clears_even_when_backend_fails() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/auth/logout")
            .with_status(500)
            .create_async()
            .await;

        let store = SessionStore::with_session(crate::auth::session::tests::session_with(
            chrono::Duration::minutes(10),
            chrono::Duration::days(1),
        ));
        authenticator_for(&server).logout(&store).await;
        assert!(store.is_empty().await);

        // Second logout has nothing to revoke
        authenticator_for(&server).logout(&store).await;
        assert!(store.is_empty().await);
    }

    #[test]
    fn test_login_response_rejects_empty_token() {
        let resp: LoginResponse = serde_json::from_str(
            r#"{"access_token":"","refresh_token":"r","access_token_expires":1893456000,
                "refresh_token_expires":1893456000}"#,
        )
        .expect("parse");
        assert!(matches!(resp.into_session("alice"), Err(ApiError::Network(_))));
    }
}
