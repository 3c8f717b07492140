use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApiError {
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("Session expired - please log in again")]
    SessionExpired,

    #[error("Token refresh failed: {0}")]
    RefreshFailed(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Upstream error ({status}): {message}")]
    Upstream {
        status: u16,
        message: String,
        details: Value,
    },

    #[error("Network error: {0}")]
    Network(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// Message used when a login rejection carries no message of its own
pub(crate) const GENERIC_LOGIN_FAILURE: &str = "Invalid credentials";

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    pub(crate) fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            return body.to_string();
        }
        let mut end = MAX_ERROR_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
    }

    /// Parse an error body leniently. Anything that is not a JSON object
    /// becomes an empty object so callers always get a stable shape.
    pub(crate) fn parse_details(body: &str) -> Value {
        match serde_json::from_str::<Value>(body) {
            Ok(value @ Value::Object(_)) => value,
            _ => Value::Object(Map::new()),
        }
    }

    /// Build an `Upstream` error from a non-2xx backend response.
    pub fn from_status(status: reqwest::StatusCode, body: &str, resource_path: &str) -> Self {
        let details = Self::parse_details(body);
        let message = string_field(&details, &["error"])
            .unwrap_or_else(|| format!("failed to fetch {}", resource_path));

        ApiError::Upstream {
            status: status.as_u16(),
            message,
            details,
        }
    }

    /// Build an `InvalidCredentials` error from a rejected login response.
    pub fn from_login_rejection(body: &str) -> Self {
        let details = Self::parse_details(body);
        let message = string_field(&details, &["msg", "detail", "error"])
            .unwrap_or_else(|| GENERIC_LOGIN_FAILURE.to_string());
        ApiError::InvalidCredentials(message)
    }

    /// Convert a transport-level failure. Timeouts and connection errors
    /// both end up here; nothing is retried.
    pub fn from_transport(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Network(format!("request timed out: {}", err))
        } else {
            ApiError::Network(err.to_string())
        }
    }

    /// HTTP status a browser-facing layer should answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::InvalidCredentials(_)
            | ApiError::SessionExpired
            | ApiError::RefreshFailed(_)
            | ApiError::Unauthorized(_) => 401,
            ApiError::Upstream { status, .. } => *status,
            ApiError::Network(_) => 502,
        }
    }

    /// Stable machine-readable tag for the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::InvalidCredentials(_) => "InvalidCredentials",
            ApiError::SessionExpired => "SessionExpired",
            ApiError::RefreshFailed(_) => "RefreshFailed",
            ApiError::Unauthorized(_) => "Unauthorized",
            ApiError::Upstream { .. } => "UpstreamError",
            ApiError::Network(_) => "NetworkError",
        }
    }

    /// Whether the user has to log in again to recover.
    pub fn requires_login(&self) -> bool {
        matches!(
            self,
            ApiError::InvalidCredentials(_)
                | ApiError::SessionExpired
                | ApiError::RefreshFailed(_)
                | ApiError::Unauthorized(_)
        )
    }
}

/// First non-empty string among `keys` in a JSON object.
fn string_field(value: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| value.get(*key))
        .filter_map(Value::as_str)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;
    use serde_json::json;

    #[test]
    fn test_from_status_uses_error_field() {
        let err = ApiError::from_status(StatusCode::NOT_FOUND, r#"{"error":"not found"}"#, "transactions/7");
        assert_eq!(
            err,
            ApiError::Upstream {
                status: 404,
                message: "not found".to_string(),
                details: json!({"error": "not found"}),
            }
        );
    }

    #[test]
    fn test_from_status_unparsable_body() {
        let err = ApiError::from_status(StatusCode::BAD_GATEWAY, "<html>oops</html>", "accounts");
        match err {
            ApiError::Upstream { status, message, details } => {
                assert_eq!(status, 502);
                assert_eq!(message, "failed to fetch accounts");
                assert_eq!(details, json!({}));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_from_status_non_string_error_field() {
        let err = ApiError::from_status(StatusCode::BAD_REQUEST, r#"{"error":{"code":3}}"#, "transactions");
        match err {
            ApiError::Upstream { message, details, .. } => {
                assert_eq!(message, "failed to fetch transactions");
                assert_eq!(details, json!({"error": {"code": 3}}));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_parse_details_rejects_non_objects() {
        assert_eq!(ApiError::parse_details("[1,2]"), json!({}));
        assert_eq!(ApiError::parse_details("\"text\""), json!({}));
        assert_eq!(ApiError::parse_details(""), json!({}));
    }

    #[test]
    fn test_login_rejection_message() {
        assert_eq!(
            ApiError::from_login_rejection(r#"{"msg":"Invalid username or password"}"#),
            ApiError::InvalidCredentials("Invalid username or password".to_string())
        );
        assert_eq!(
            ApiError::from_login_rejection(r#"{"detail":"Incorrect email or password"}"#),
            ApiError::InvalidCredentials("Incorrect email or password".to_string())
        );
        assert_eq!(
            ApiError::from_login_rejection("not json"),
            ApiError::InvalidCredentials(GENERIC_LOGIN_FAILURE.to_string())
        );
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(ApiError::SessionExpired.status_code(), 401);
        assert_eq!(ApiError::Unauthorized("x".into()).status_code(), 401);
        assert_eq!(ApiError::Network("down".into()).status_code(), 502);
        let upstream = ApiError::Upstream { status: 409, message: "dup".into(), details: json!({}) };
        assert_eq!(upstream.status_code(), 409);
        assert!(!upstream.requires_login());
        assert!(ApiError::SessionExpired.requires_login());
    }

    #[test]
    fn test_truncate_body() {
        let short = "short body";
        assert_eq!(ApiError::truncate_body(short), short);

        let long = "é".repeat(400);
        let truncated = ApiError::truncate_body(&long);
        assert!(truncated.contains("truncated, 800 total bytes"));
    }
}
