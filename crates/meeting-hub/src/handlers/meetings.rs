//! Meeting creation handler.
//!
//! - `POST /` - Create a meeting and start its hub

use crate::models::{CreateMeetingRequest, CreateMeetingResponse};
use crate::routes::AppState;
use axum::extract::State;
use axum::Json;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Handler for POST /
///
/// The body is `{ "actions": [...] }`. A body that does not decode is
/// treated as an empty action list rather than rejected.
///
/// # Response
///
/// - 200 OK: `{ "meetingId": "..." }`
#[instrument(
    skip_all,
    name = "hub.meeting.create",
    fields(method = "POST", endpoint = "/")
)]
pub async fn create_meeting(
    State(state): State<Arc<AppState>>,
    body: axum::body::Bytes,
) -> Json<CreateMeetingResponse> {
    let request: CreateMeetingRequest = serde_json::from_slice(&body).unwrap_or_else(|e| {
        debug!(
            target: "hub.handlers",
            error = %e,
            "Undecodable meeting request body, creating meeting without restricted actions"
        );
        CreateMeetingRequest::default()
    });

    let hub = state.registry.create(request.actions).await;
    let meeting_id = hub.meeting_id().to_string();

    info!(target: "hub.handlers", meeting_id = %meeting_id, "Meeting created via HTTP");

    Json(CreateMeetingResponse { meeting_id })
}
