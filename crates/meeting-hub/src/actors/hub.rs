//! `HubActor` - per-meeting actor that owns the meeting's client set.
//!
//! Each `HubActor`:
//! - Owns the connected clients, in registration order
//! - Holds the moderator slot (first registrant, then earliest-registered survivor)
//! - Gates the meeting's restricted actions to the moderator
//! - Fans broadcasts out to every client's bounded outbound queue
//!
//! All state is touched only by the actor task, one mailbox message at a time.
//!
//! # Backpressure
//!
//! Broadcasts never wait on a client. A client whose outbound queue is full
//! is removed on the spot, through the same routine as an unregister, so a
//! slow consumer cannot stall delivery to the rest of the meeting.

use crate::errors::HubError;
use crate::observability::metrics::{
    record_backpressure_drop, record_broadcast, record_client_connected,
    record_client_disconnected, record_restricted_action_rejected,
};

use super::messages::{
    ClientMessage, ClientRegistration, HubMessage, HubState, Payload, RegisterAck,
};

use std::collections::HashSet;
use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

/// Default channel buffer size for the hub mailbox.
const HUB_CHANNEL_BUFFER: usize = 500;

/// Handle to a `HubActor`.
#[derive(Clone, Debug)]
pub struct HubHandle {
    sender: mpsc::Sender<HubMessage>,
    cancel_token: CancellationToken,
    meeting_id: String,
}

impl HubHandle {
    /// Get the meeting ID.
    #[must_use]
    pub fn meeting_id(&self) -> &str {
        &self.meeting_id
    }

    /// Register a client. The hub takes ownership of the outbound sender.
    pub async fn register(&self, registration: ClientRegistration) -> Result<RegisterAck, HubError> {
        let (tx, rx) = oneshot::channel();
        self.send(HubMessage::Register {
            registration,
            respond_to: tx,
        })
        .await?;

        rx.await.map_err(|_| self.closed())?
    }

    /// Request removal of a client. Unknown ids are ignored by the hub.
    pub async fn unregister(&self, client_id: String) -> Result<(), HubError> {
        self.send(HubMessage::Unregister { client_id }).await
    }

    /// Broadcast a payload to every client, bypassing the moderator gate.
    pub async fn broadcast(&self, payload: Payload) -> Result<(), HubError> {
        self.send(HubMessage::Broadcast { payload }).await
    }

    /// Serialize and broadcast a hub-originated notification.
    pub async fn announce(&self, message: &ClientMessage) -> Result<(), HubError> {
        self.broadcast(message.to_payload()?).await
    }

    /// Forward an inbound client message, subject to the moderator gate.
    pub async fn submit(&self, client_id: String, message: ClientMessage) -> Result<(), HubError> {
        self.send(HubMessage::Submit { client_id, message }).await
    }

    /// Get current hub state.
    pub async fn get_state(&self) -> Result<HubState, HubError> {
        let (tx, rx) = oneshot::channel();
        self.send(HubMessage::GetState { respond_to: tx }).await?;

        rx.await.map_err(|_| self.closed())
    }

    /// Ask the hub to stop if it is idle.
    ///
    /// Returns `true` if the hub had no clients (and, if it never had any,
    /// was at least `grace` old) and has stopped.
    pub async fn retire_if_idle(&self, grace: Duration) -> Result<bool, HubError> {
        let (tx, rx) = oneshot::channel();
        self.send(HubMessage::RetireIfIdle {
            grace,
            respond_to: tx,
        })
        .await?;

        rx.await.map_err(|_| self.closed())
    }

    /// Cancel the hub actor, dropping all of its clients.
    pub fn cancel(&self) {
        self.cancel_token.cancel();
    }

    /// Whether the hub's control loop has exited.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    async fn send(&self, message: HubMessage) -> Result<(), HubError> {
        self.sender.send(message).await.map_err(|_| self.closed())
    }

    fn closed(&self) -> HubError {
        HubError::MeetingClosed(self.meeting_id.clone())
    }
}

/// Why a client left the hub.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RemovalReason {
    /// The client's own tasks asked to leave.
    Unregistered,
    /// The outbound queue was full at broadcast time.
    Backpressure,
    /// The outbound task had already exited.
    QueueClosed,
    /// The hub is shutting down.
    Shutdown,
}

impl RemovalReason {
    fn as_str(self) -> &'static str {
        match self {
            RemovalReason::Unregistered => "unregistered",
            RemovalReason::Backpressure => "backpressure",
            RemovalReason::QueueClosed => "queue_closed",
            RemovalReason::Shutdown => "shutdown",
        }
    }
}

/// A registered client as seen by the hub.
struct ClientEntry {
    client_id: String,
    outbound: mpsc::Sender<Payload>,
    close_token: CancellationToken,
}

/// The `HubActor` implementation.
pub struct HubActor {
    meeting_id: String,
    receiver: mpsc::Receiver<HubMessage>,
    cancel_token: CancellationToken,
    /// Registration order; the front is the next moderator candidate.
    clients: Vec<ClientEntry>,
    moderator: Option<String>,
    restricted_actions: HashSet<String>,
    /// Unix timestamp (seconds).
    created_at: i64,
    started: Instant,
    /// Whether any client has ever registered.
    ever_joined: bool,
    messages_processed: u64,
}

impl HubActor {
    /// Spawn a new hub actor.
    ///
    /// Returns a handle and the task join handle.
    ///
    /// # Arguments
    ///
    /// * `meeting_id` - Unique meeting identifier
    /// * `restricted_actions` - Actions only the moderator may trigger
    /// * `cancel_token` - Cancellation token (child of the registry's token)
    pub fn spawn(
        meeting_id: String,
        restricted_actions: impl IntoIterator<Item = String>,
        cancel_token: CancellationToken,
    ) -> (HubHandle, JoinHandle<()>) {
        let (sender, receiver) = mpsc::channel(HUB_CHANNEL_BUFFER);

        let actor = Self {
            meeting_id: meeting_id.clone(),
            receiver,
            cancel_token: cancel_token.clone(),
            clients: Vec::new(),
            moderator: None,
            restricted_actions: restricted_actions.into_iter().collect(),
            created_at: chrono::Utc::now().timestamp(),
            started: Instant::now(),
            ever_joined: false,
            messages_processed: 0,
        };

        let task_handle = tokio::spawn(actor.run());

        let handle = HubHandle {
            sender,
            cancel_token,
            meeting_id,
        };

        (handle, task_handle)
    }

    /// Run the actor message loop.
    #[instrument(skip_all, name = "hub.actor.meeting", fields(meeting_id = %self.meeting_id))]
    async fn run(mut self) {
        info!(
            target: "hub.actor.meeting",
            restricted_actions = self.restricted_actions.len(),
            "HubActor started"
        );

        loop {
            tokio::select! {
                () = self.cancel_token.cancelled() => {
                    info!(
                        target: "hub.actor.meeting",
                        "HubActor received cancellation signal"
                    );
                    self.shutdown();
                    break;
                }

                msg = self.receiver.recv() => {
                    let Some(message) = msg else {
                        info!(
                            target: "hub.actor.meeting",
                            "HubActor channel closed, exiting"
                        );
                        break;
                    };
                    self.messages_processed += 1;
                    if self.handle_message(message).is_break() {
                        break;
                    }
                }
            }
        }

        info!(
            target: "hub.actor.meeting",
            clients = self.clients.len(),
            messages_processed = self.messages_processed,
            "HubActor stopped"
        );
    }

    /// Handle a single message. `Break` stops the actor.
    fn handle_message(&mut self, message: HubMessage) -> ControlFlow<()> {
        match message {
            HubMessage::Register {
                registration,
                respond_to,
            } => {
                let result = self.handle_register(registration);
                let _ = respond_to.send(result);
            }

            HubMessage::Unregister { client_id } => {
                self.remove_client(&client_id, RemovalReason::Unregistered);
            }

            HubMessage::Broadcast { payload } => {
                self.broadcast(&payload);
            }

            HubMessage::Submit { client_id, message } => {
                self.handle_submit(&client_id, &message);
            }

            HubMessage::GetState { respond_to } => {
                let _ = respond_to.send(self.get_state());
            }

            HubMessage::RetireIfIdle { grace, respond_to } => {
                let idle = self.is_reclaimable(grace);
                let _ = respond_to.send(idle);
                if idle {
                    info!(target: "hub.actor.meeting", "Idle hub retiring");
                    return ControlFlow::Break(());
                }
            }
        }

        ControlFlow::Continue(())
    }

    fn handle_register(&mut self, registration: ClientRegistration) -> Result<RegisterAck, HubError> {
        let ClientRegistration {
            client_id,
            outbound,
            close_token,
        } = registration;

        if self.clients.iter().any(|c| c.client_id == client_id) {
            warn!(
                target: "hub.actor.meeting",
                client_id = %client_id,
                "Rejected duplicate client registration"
            );
            return Err(HubError::Internal(format!(
                "client {client_id} already registered"
            )));
        }

        let is_moderator = self.moderator.is_none();
        if is_moderator {
            self.moderator = Some(client_id.clone());
        }

        self.clients.push(ClientEntry {
            client_id: client_id.clone(),
            outbound,
            close_token,
        });
        self.ever_joined = true;
        record_client_connected();

        info!(
            target: "hub.actor.meeting",
            client_id = %client_id,
            is_moderator,
            total_clients = self.clients.len(),
            "Client registered"
        );

        Ok(RegisterAck {
            client_id,
            is_moderator,
            client_count: self.clients.len(),
        })
    }

    /// Forward a client message unless it is a restricted action from a
    /// non-moderator.
    fn handle_submit(&mut self, client_id: &str, message: &ClientMessage) {
        if self.restricted_actions.contains(&message.action)
            && self.moderator.as_deref() != Some(client_id)
        {
            warn!(
                target: "hub.actor.meeting",
                client_id = %client_id,
                action = %message.action,
                "Ignoring restricted action from non-moderator"
            );
            record_restricted_action_rejected();
            return;
        }

        match message.to_payload() {
            Ok(payload) => self.broadcast(&payload),
            Err(e) => {
                error!(
                    target: "hub.actor.meeting",
                    client_id = %client_id,
                    error = %e,
                    "Failed to encode client message"
                );
            }
        }
    }

    /// Enqueue `payload` on every client's outbound queue without waiting.
    fn broadcast(&mut self, payload: &Payload) {
        let mut dropped = Vec::new();

        for client in &self.clients {
            match client.outbound.try_send(Arc::clone(payload)) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    dropped.push((client.client_id.clone(), RemovalReason::Backpressure));
                }
                Err(TrySendError::Closed(_)) => {
                    dropped.push((client.client_id.clone(), RemovalReason::QueueClosed));
                }
            }
        }

        record_broadcast(self.clients.len() - dropped.len());

        for (client_id, reason) in dropped {
            if reason == RemovalReason::Backpressure {
                record_backpressure_drop();
            }
            self.remove_client(&client_id, reason);
        }
    }

    /// Remove a client: close its outbound queue and its transport, and hand
    /// the moderator slot to the earliest-registered survivor if needed.
    ///
    /// Returns `false` if the client was not a member.
    fn remove_client(&mut self, client_id: &str, reason: RemovalReason) -> bool {
        let Some(index) = self.clients.iter().position(|c| c.client_id == client_id) else {
            debug!(
                target: "hub.actor.meeting",
                client_id = %client_id,
                reason = reason.as_str(),
                "Removal requested for unknown client"
            );
            return false;
        };

        // Dropping the entry drops the only outbound sender, closing the queue.
        let entry = self.clients.remove(index);
        entry.close_token.cancel();
        drop(entry);
        record_client_disconnected();

        if self.moderator.as_deref() == Some(client_id) {
            self.moderator = self.clients.first().map(|c| c.client_id.clone());
            info!(
                target: "hub.actor.meeting",
                previous = %client_id,
                moderator = ?self.moderator,
                "Moderator reassigned"
            );
        }

        if reason == RemovalReason::Backpressure {
            warn!(
                target: "hub.actor.meeting",
                client_id = %client_id,
                remaining_clients = self.clients.len(),
                "Client dropped, outbound queue full"
            );
        } else {
            info!(
                target: "hub.actor.meeting",
                client_id = %client_id,
                reason = reason.as_str(),
                remaining_clients = self.clients.len(),
                "Client removed"
            );
        }

        true
    }

    fn is_reclaimable(&self, grace: Duration) -> bool {
        self.clients.is_empty() && (self.ever_joined || self.started.elapsed() >= grace)
    }

    fn get_state(&self) -> HubState {
        let mut restricted_actions: Vec<String> =
            self.restricted_actions.iter().cloned().collect();
        restricted_actions.sort();

        HubState {
            meeting_id: self.meeting_id.clone(),
            client_ids: self.clients.iter().map(|c| c.client_id.clone()).collect(),
            moderator: self.moderator.clone(),
            restricted_actions,
            created_at: self.created_at,
        }
    }

    /// Drop every client so their tasks close their transports.
    fn shutdown(&mut self) {
        let client_ids: Vec<String> = self.clients.iter().map(|c| c.client_id.clone()).collect();
        for client_id in client_ids {
            self.remove_client(&client_id, RemovalReason::Shutdown);
        }
    }
}
