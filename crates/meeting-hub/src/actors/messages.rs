//! Message types for hub communication.
//!
//! Everything a hub does arrives through one `tokio::sync::mpsc` mailbox, so
//! registrations, departures and broadcasts are processed strictly in arrival
//! order. Request-reply uses `tokio::sync::oneshot`.

use crate::errors::HubError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

/// Action broadcast when a client joins a meeting.
pub const ACTION_NEW_USER: &str = "newuser";

/// Action broadcast when a client leaves a meeting.
pub const ACTION_LEAVE: &str = "leave";

/// A serialized outbound message, shared by every recipient of a broadcast.
pub type Payload = Arc<str>;

/// Client message carried over the WebSocket in both directions.
///
/// Inbound messages may omit `meetingId` and `clientId`; they decode as empty
/// strings and are forwarded unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientMessage {
    #[serde(default)]
    pub meeting_id: String,
    pub action: String,
    #[serde(default)]
    pub client_id: String,
}

impl ClientMessage {
    pub fn new(meeting_id: &str, action: &str, client_id: &str) -> Self {
        Self {
            meeting_id: meeting_id.to_string(),
            action: action.to_string(),
            client_id: client_id.to_string(),
        }
    }

    /// Serialize into a broadcast payload.
    pub fn to_payload(&self) -> Result<Payload, HubError> {
        serde_json::to_string(self)
            .map(Payload::from)
            .map_err(|e| HubError::Internal(format!("failed to encode client message: {e}")))
    }
}

/// Everything the hub needs to own a newly connected client.
#[derive(Debug)]
pub struct ClientRegistration {
    pub client_id: String,
    /// Sending half of the client's outbound queue. The hub holds the only
    /// sender, so dropping it closes the queue.
    pub outbound: mpsc::Sender<Payload>,
    /// Cancelled by the hub to make the client's inbound task close the transport.
    pub close_token: CancellationToken,
}

/// Messages sent to a `HubActor`.
#[derive(Debug)]
pub enum HubMessage {
    /// Add a client; the first client becomes moderator.
    Register {
        registration: ClientRegistration,
        /// Response channel for the registration outcome.
        respond_to: oneshot::Sender<Result<RegisterAck, HubError>>,
    },

    /// Remove a client (no-op if it is not a member).
    Unregister { client_id: String },

    /// Fan a payload out to every client, ungated.
    Broadcast { payload: Payload },

    /// Inbound message from a client; restricted actions are moderator-gated.
    Submit {
        client_id: String,
        message: ClientMessage,
    },

    /// Snapshot of hub state.
    GetState {
        respond_to: oneshot::Sender<HubState>,
    },

    /// Stop the hub if it has no clients and is eligible for reclamation.
    RetireIfIdle {
        /// Minimum age for a hub that never had a client.
        grace: Duration,
        /// `true` if the hub stopped.
        respond_to: oneshot::Sender<bool>,
    },
}

/// Result of a successful registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterAck {
    pub client_id: String,
    pub is_moderator: bool,
    pub client_count: usize,
}

/// Point-in-time view of a hub.
#[derive(Debug, Clone)]
pub struct HubState {
    pub meeting_id: String,
    /// Client ids in registration order.
    pub client_ids: Vec<String>,
    pub moderator: Option<String>,
    /// Sorted.
    pub restricted_actions: Vec<String>,
    /// Unix timestamp (seconds).
    pub created_at: i64,
}

impl HubState {
    pub fn client_count(&self) -> usize {
        self.client_ids.len()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_client_message_uses_camel_case() {
        let message = ClientMessage::new("m-1", "next", "c-1");
        let json: serde_json::Value =
            serde_json::from_str(&message.to_payload().unwrap()).unwrap();

        assert_eq!(json["meetingId"], "m-1");
        assert_eq!(json["action"], "next");
        assert_eq!(json["clientId"], "c-1");
    }

    #[test]
    fn test_client_message_ids_default_to_empty() {
        let message: ClientMessage = serde_json::from_str(r#"{"action":"next"}"#).unwrap();
        assert_eq!(message, ClientMessage::new("", "next", ""));
    }

    #[test]
    fn test_client_message_requires_action() {
        let result = serde_json::from_str::<ClientMessage>(r#"{"meetingId":"m","clientId":"c"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_client_message_rejects_wrong_types() {
        let result =
            serde_json::from_str::<ClientMessage>(r#"{"meetingId":7,"action":"next","clientId":"c"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_client_message_ignores_unknown_fields() {
        let message: ClientMessage = serde_json::from_str(
            r#"{"meetingId":"m","action":"raise","clientId":"c","extra":true}"#,
        )
        .unwrap();
        assert_eq!(message, ClientMessage::new("m", "raise", "c"));
    }
}
