//! Meeting Hub HTTP models.

use serde::{Deserialize, Serialize};

/// Meeting creation request body.
///
/// `actions` lists the action names only the moderator may trigger.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateMeetingRequest {
    #[serde(default)]
    pub actions: Vec<String>,
}

/// Meeting creation response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMeetingResponse {
    pub meeting_id: String,
}

/// Query string of the join (WebSocket upgrade) endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct JoinParams {
    pub meeting_id: String,
}

/// Liveness report returned by `/health`.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// "healthy" or "degraded".
    pub status: &'static str,

    /// Store reachability ("healthy" or "unhealthy").
    pub store: &'static str,

    /// Live meetings in the registry.
    pub meetings: usize,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_create_request_defaults_actions() {
        let request: CreateMeetingRequest = serde_json::from_str("{}").unwrap();
        assert!(request.actions.is_empty());

        let request: CreateMeetingRequest =
            serde_json::from_str(r#"{"actions":["next","clear"]}"#).unwrap();
        assert_eq!(request.actions, vec!["next", "clear"]);
    }

    #[test]
    fn test_create_response_is_camel_case() {
        let response = CreateMeetingResponse {
            meeting_id: "abc".to_string(),
        };
        let json = serde_json::to_string(&response).unwrap();
        assert_eq!(json, r#"{"meetingId":"abc"}"#);
    }
}
