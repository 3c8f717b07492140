//! The `{ok, data | error}` shape handed to browser-facing collaborators.

use serde::Serialize;
use serde_json::Value;

use super::ApiError;

/// Error half of a `GatewayReply`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct ReplyError {
    pub kind: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl From<&ApiError> for ReplyError {
    fn from(err: &ApiError) -> Self {
        let (message, status, details) = match err {
            ApiError::Upstream { status, message, details } => {
                (message.clone(), Some(*status), Some(details.clone()))
            }
            ApiError::InvalidCredentials(message) => (message.clone(), None, None),
            other => (other.to_string(), None, None),
        };
        Self {
            kind: err.kind().to_string(),
            message,
            status,
            details,
        }
    }
}

/// Normalized outcome of a login or proxied call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct GatewayReply<T> {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ReplyError>,
    /// HTTP status a browser-facing handler should answer with
    #[serde(skip)]
    pub http_status: u16,
}

impl<T> GatewayReply<T> {
    pub fn success(data: T) -> Self {
        Self {
            ok: true,
            data: Some(data),
            error: None,
            http_status: 200,
        }
    }

    pub fn failure(err: &ApiError) -> Self {
        Self {
            ok: false,
            data: None,
            error: Some(ReplyError::from(err)),
            http_status: err.status_code(),
        }
    }

    pub fn from_result(result: Result<T, ApiError>) -> Self {
        match result {
            Ok(data) => Self::success(data),
            Err(err) => Self::failure(&err),
        }
    }
}

impl<T> From<Result<T, ApiError>> for GatewayReply<T> {
    fn from(result: Result<T, ApiError>) -> Self {
        Self::from_result(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_success_shape() {
        let reply = GatewayReply::from_result(Ok(json!([{"id": "t-1"}])));
        assert_eq!(
            serde_json::to_value(&reply).expect("serialize"),
            json!({"ok": true, "data": [{"id": "t-1"}]})
        );
        assert_eq!(reply.http_status, 200);
    }

    #[test]
    fn test_upstream_failure_shape() {
        let err = ApiError::Upstream {
            status: 404,
            message: "not found".to_string(),
            details: json!({"error": "not found"}),
        };
        let reply: GatewayReply<Value> = GatewayReply::from_result(Err(err));
        assert_eq!(
            serde_json::to_value(&reply).expect("serialize"),
            json!({
                "ok": false,
                "error": {
                    "kind": "UpstreamError",
                    "message": "not found",
                    "status": 404,
                    "details": {"error": "not found"}
                }
            })
        );
        assert_eq!(reply.http_status, 404);
    }

    #[test]
    fn test_auth_failure_shape() {
        let reply: GatewayReply<Value> =
            GatewayReply::from_result(Err(ApiError::InvalidCredentials("Invalid username or password".to_string())));
        let error = reply.error.as_ref().expect("error present");
        assert_eq!(error.kind, "InvalidCredentials");
        assert_eq!(error.message, "Invalid username or password");
        assert_eq!(reply.http_status, 401);
    }
}
