//! Meeting Hub error types.
//!
//! `HubError` is shared by the actor layer and the HTTP layer. HTTP responses
//! carry a generic client message; internal details are logged server-side.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Meeting Hub error type.
///
/// Maps to HTTP status codes:
/// - `MeetingNotFound`: 404 Not Found
/// - `Forbidden`: 403 Forbidden
/// - `MalformedMessage`: 400 Bad Request
/// - `MeetingClosed`: 410 Gone
/// - Store, Transport, Internal: 500 Internal Server Error
#[derive(Debug, Error)]
pub enum HubError {
    /// No hub is registered under the requested meeting id.
    #[error("Meeting not found: {0}")]
    MeetingNotFound(String),

    /// The hub's control loop has exited (reclaimed or shut down).
    #[error("Meeting closed: {0}")]
    MeetingClosed(String),

    /// Request rejected by the origin check.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Persistence gateway failure.
    #[error("Store error: {0}")]
    Store(String),

    /// WebSocket read/write failure or deadline expiry.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Inbound frame did not decode as a client message.
    #[error("Malformed message: {0}")]
    MalformedMessage(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl HubError {
    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            HubError::MeetingNotFound(_) => 404,
            HubError::Forbidden(_) => 403,
            HubError::MalformedMessage(_) => 400,
            HubError::MeetingClosed(_) => 410,
            HubError::Store(_) | HubError::Transport(_) | HubError::Internal(_) => 500,
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

impl IntoResponse for HubError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            HubError::MeetingNotFound(_) => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                "Meeting not found".to_string(),
            ),
            HubError::MeetingClosed(_) => (
                StatusCode::GONE,
                "MEETING_CLOSED",
                "Meeting is no longer available".to_string(),
            ),
            HubError::Forbidden(reason) => (StatusCode::FORBIDDEN, "FORBIDDEN", reason.clone()),
            HubError::MalformedMessage(_) => (
                StatusCode::BAD_REQUEST,
                "MALFORMED_MESSAGE",
                "Malformed message".to_string(),
            ),
            HubError::Store(err) => {
                tracing::error!(target: "hub.store", error = %err, "Store operation failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "STORE_ERROR",
                    "An internal storage error occurred".to_string(),
                )
            }
            HubError::Transport(_) | HubError::Internal(_) => {
                tracing::error!(target: "hub.errors", error = %self, "Request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let error_response = ErrorResponse {
            error: ErrorDetail {
                code: code.to_string(),
                message,
            },
        };

        (status, Json(error_response)).into_response()
    }
}

impl From<sqlx::Error> for HubError {
    fn from(err: sqlx::Error) -> Self {
        HubError::Store(err.to_string())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::body::Body;
    use http_body_util::BodyExt;

    async fn read_body_json(body: Body) -> serde_json::Value {
        let bytes = body.collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_status_code_mapping() {
        assert_eq!(HubError::MeetingNotFound("m".to_string()).status_code(), 404);
        assert_eq!(HubError::Forbidden("origin".to_string()).status_code(), 403);
        assert_eq!(
            HubError::MalformedMessage("eof".to_string()).status_code(),
            400
        );
        assert_eq!(HubError::MeetingClosed("m".to_string()).status_code(), 410);
        assert_eq!(HubError::Store("locked".to_string()).status_code(), 500);
        assert_eq!(HubError::Transport("reset".to_string()).status_code(), 500);
        assert_eq!(HubError::Internal("oops".to_string()).status_code(), 500);
    }

    #[test]
    fn test_display_formatting() {
        assert_eq!(
            format!("{}", HubError::MeetingNotFound("abc".to_string())),
            "Meeting not found: abc"
        );
        assert_eq!(
            format!("{}", HubError::Store("database is locked".to_string())),
            "Store error: database is locked"
        );
    }

    #[tokio::test]
    async fn test_not_found_response_body() {
        let response = HubError::MeetingNotFound("meeting-123".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = read_body_json(response.into_body()).await;
        assert_eq!(body["error"]["code"], "NOT_FOUND");
        assert_eq!(body["error"]["message"], "Meeting not found");
    }

    #[tokio::test]
    async fn test_store_error_hides_details() {
        let response =
            HubError::Store("unable to open database file /var/lib/hub.db".to_string())
                .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = read_body_json(response.into_body()).await;
        assert_eq!(body["error"]["code"], "STORE_ERROR");
        let message = body["error"]["message"].as_str().unwrap();
        assert!(!message.contains("/var/lib"));
    }

    #[tokio::test]
    async fn test_forbidden_response_keeps_reason() {
        let response = HubError::Forbidden("Origin not allowed".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let body = read_body_json(response.into_body()).await;
        assert_eq!(body["error"]["code"], "FORBIDDEN");
        assert_eq!(body["error"]["message"], "Origin not allowed");
    }
}
