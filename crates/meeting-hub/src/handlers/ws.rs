//! WebSocket join handler.
//!
//! - `GET /?meeting_id=<id>` - Upgrade to a WebSocket attached to the meeting's hub
//!
//! # Security
//!
//! - Cross-origin upgrades are rejected unless `DISABLEWEBSOCKETORIGINCHECK` is set
//! - Unknown meetings are rejected before the upgrade

use crate::actors::serve_connection;
use crate::errors::HubError;
use crate::models::JoinParams;
use crate::routes::AppState;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Query, State};
use axum::http::{header, HeaderMap};
use axum::response::Response;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Handler for GET /?meeting_id=<id>
///
/// # Response
///
/// - 101 Switching Protocols: connection attached to the hub
/// - 403 Forbidden: cross-origin request
/// - 404 Not Found: unknown or reclaimed meeting
#[instrument(
    skip_all,
    name = "hub.meeting.join",
    fields(meeting_id = tracing::field::Empty)
)]
pub async fn join_meeting(
    State(state): State<Arc<AppState>>,
    Query(params): Query<JoinParams>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Result<Response, HubError> {
    tracing::Span::current().record("meeting_id", params.meeting_id.as_str());

    if !state.config.disable_origin_check && !origin_allowed(&headers) {
        warn!(
            target: "hub.handlers",
            origin = ?headers.get(header::ORIGIN),
            "Rejected cross-origin WebSocket upgrade"
        );
        return Err(HubError::Forbidden("Origin not allowed".to_string()));
    }

    let hub = state
        .registry
        .lookup(&params.meeting_id)
        .await
        .ok_or_else(|| HubError::MeetingNotFound(params.meeting_id.clone()))?;

    debug!(target: "hub.handlers", "Upgrading connection");

    let settings = state.connection;
    Ok(ws
        .max_message_size(state.config.max_message_size)
        .on_upgrade(move |socket| serve_connection(socket, hub, settings)))
}

/// Same-origin check for WebSocket upgrades.
///
/// Passes when there is no `Origin` header, or when the origin's authority
/// equals the `Host` header ignoring ASCII case.
pub fn origin_allowed(headers: &HeaderMap) -> bool {
    let Some(origin) = headers.get(header::ORIGIN) else {
        return true;
    };
    let Ok(origin) = origin.to_str() else {
        return false;
    };
    let Some(origin_host) = origin_host(origin) else {
        return false;
    };

    headers
        .get(header::HOST)
        .and_then(|host| host.to_str().ok())
        .is_some_and(|host| host.eq_ignore_ascii_case(origin_host))
}

/// Authority (`host[:port]`) of an origin URL such as `https://example.com:8080`.
fn origin_host(origin: &str) -> Option<&str> {
    let (_scheme, rest) = origin.split_once("://")?;
    let authority = rest.split(['/', '?', '#']).next().unwrap_or_default();
    // Drop any userinfo.
    let authority = authority.rsplit('@').next().unwrap_or_default();
    if authority.is_empty() {
        None
    } else {
        Some(authority)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(origin: Option<&str>, host: Option<&str>) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(origin) = origin {
            headers.insert(header::ORIGIN, HeaderValue::from_str(origin).unwrap());
        }
        if let Some(host) = host {
            headers.insert(header::HOST, HeaderValue::from_str(host).unwrap());
        }
        headers
    }

    #[test]
    fn test_origin_host() {
        assert_eq!(origin_host("http://localhost:8080"), Some("localhost:8080"));
        assert_eq!(origin_host("https://example.com/path"), Some("example.com"));
        assert_eq!(origin_host("https://user@example.com"), Some("example.com"));
        assert_eq!(origin_host("example.com"), None);
        assert_eq!(origin_host("http://"), None);
    }

    #[test]
    fn test_missing_origin_is_allowed() {
        assert!(origin_allowed(&headers(None, Some("localhost:8080"))));
    }

    #[test]
    fn test_same_origin_is_allowed() {
        assert!(origin_allowed(&headers(
            Some("http://localhost:8080"),
            Some("localhost:8080")
        )));
        assert!(origin_allowed(&headers(
            Some("https://Example.COM"),
            Some("example.com")
        )));
    }

    #[test]
    fn test_cross_origin_is_rejected() {
        assert!(!origin_allowed(&headers(
            Some("http://evil.example"),
            Some("localhost:8080")
        )));
        // Port is part of the comparison.
        assert!(!origin_allowed(&headers(
            Some("http://localhost:3000"),
            Some("localhost:8080")
        )));
    }

    #[test]
    fn test_origin_without_host_is_rejected() {
        assert!(!origin_allowed(&headers(Some("http://localhost"), None)));
        assert!(!origin_allowed(&headers(Some("null"), Some("localhost"))));
    }
}
