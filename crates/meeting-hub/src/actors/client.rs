//! Connection proxy - the two tasks bridging one WebSocket to its hub.
//!
//! Each connected client gets:
//! - An inbound task that reads frames, decodes `ClientMessage`s and submits
//!   them to the hub
//! - An outbound task that drains the client's bounded queue onto the socket
//!   and sends keepalive pings
//!
//! # Lifecycle
//!
//! 1. Registered with the hub, then a `newuser` notification is broadcast
//! 2. Runs until the peer closes, a read/write fails, or the hub removes it
//! 3. The inbound task always requests its own unregister on exit
//! 4. When the hub closes the queue, the outbound task sends a close frame and
//!    broadcasts a `leave` notification for the client

use crate::config::Config;
use crate::errors::HubError;

use super::hub::HubHandle;
use super::messages::{ClientMessage, ClientRegistration, Payload, ACTION_LEAVE, ACTION_NEW_USER};

use axum::extract::ws::Message;
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use std::fmt::Display;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn, Instrument};

/// Per-connection timing and queue settings.
#[derive(Debug, Clone, Copy)]
pub struct ConnectionSettings {
    /// Outbound queue capacity.
    pub send_buffer: usize,
    /// Read deadline, renewed on each pong.
    pub pong_wait: Duration,
    /// Deadline for each write.
    pub write_wait: Duration,
    /// Keepalive ping period; must be shorter than the peer's pong wait.
    pub ping_period: Duration,
}

impl ConnectionSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            send_buffer: config.client_send_buffer,
            pong_wait: config.pong_wait(),
            write_wait: config.write_wait(),
            ping_period: config.ping_period(),
        }
    }
}

/// How the outbound loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutboundExit {
    /// The hub closed the queue.
    QueueClosed,
    /// A write failed or timed out.
    WriteFailed,
}

/// Serve one upgraded WebSocket until the client is gone.
#[instrument(
    skip_all,
    name = "hub.actor.client",
    fields(meeting_id = %hub.meeting_id(), client_id = tracing::field::Empty)
)]
pub async fn serve_connection<S, E>(socket: S, hub: HubHandle, settings: ConnectionSettings)
where
    S: Stream<Item = Result<Message, E>> + Sink<Message, Error = E> + Send + 'static,
    E: Display + Send + 'static,
{
    let client_id = uuid::Uuid::new_v4().to_string();
    tracing::Span::current().record("client_id", client_id.as_str());

    let (outbound_tx, outbound_rx) = mpsc::channel(settings.send_buffer);
    let close_token = CancellationToken::new();

    let ack = match hub
        .register(ClientRegistration {
            client_id: client_id.clone(),
            outbound: outbound_tx,
            close_token: close_token.clone(),
        })
        .await
    {
        Ok(ack) => ack,
        Err(e) => {
            warn!(target: "hub.actor.client", error = %e, "Client registration failed");
            return;
        }
    };

    info!(
        target: "hub.actor.client",
        is_moderator = ack.is_moderator,
        clients = ack.client_count,
        "Client connected"
    );

    let joined = ClientMessage::new(hub.meeting_id(), ACTION_NEW_USER, &client_id);
    if let Err(e) = hub.announce(&joined).await {
        debug!(target: "hub.actor.client", error = %e, "Failed to announce new client");
    }

    let (sink, stream) = socket.split();

    let writer = tokio::spawn(
        run_outbound(
            sink,
            outbound_rx,
            hub.clone(),
            client_id.clone(),
            settings.write_wait,
            settings.ping_period,
        )
        .in_current_span(),
    );

    match run_inbound(stream, &hub, &client_id, &close_token, settings.pong_wait).await {
        Ok(()) => debug!(target: "hub.actor.client", "Inbound task finished"),
        Err(e) => info!(target: "hub.actor.client", error = %e, "Inbound task terminated"),
    }

    if let Err(e) = writer.await {
        warn!(target: "hub.actor.client", error = %e, "Outbound task panicked");
    }

    info!(target: "hub.actor.client", "Client disconnected");
}

/// Inbound task: read frames and submit decoded messages to the hub.
///
/// Returns `Ok` on a clean close (close frame, end of stream, or removal by
/// the hub). Malformed input, read errors and an expired read deadline are
/// errors. Either way the client's unregister has been requested on return.
pub(crate) async fn run_inbound<S, E>(
    mut stream: S,
    hub: &HubHandle,
    client_id: &str,
    close_token: &CancellationToken,
    pong_wait: Duration,
) -> Result<(), HubError>
where
    S: Stream<Item = Result<Message, E>> + Unpin,
    E: Display,
{
    let result = read_loop(&mut stream, hub, client_id, close_token, pong_wait).await;

    if let Err(e) = hub.unregister(client_id.to_string()).await {
        debug!(target: "hub.actor.client", error = %e, "Unregister after read loop failed");
    }

    result
}

async fn read_loop<S, E>(
    stream: &mut S,
    hub: &HubHandle,
    client_id: &str,
    close_token: &CancellationToken,
    pong_wait: Duration,
) -> Result<(), HubError>
where
    S: Stream<Item = Result<Message, E>> + Unpin,
    E: Display,
{
    let mut deadline = Instant::now() + pong_wait;

    loop {
        let next = tokio::select! {
            () = close_token.cancelled() => {
                debug!(target: "hub.actor.client", "Closed by hub");
                return Ok(());
            }
            next = tokio::time::timeout_at(deadline, stream.next()) => next,
        };

        let frame = match next {
            Err(_) => return Err(HubError::Transport("read deadline exceeded".to_string())),
            Ok(None) => {
                debug!(target: "hub.actor.client", "Stream ended without close frame");
                return Ok(());
            }
            Ok(Some(Err(e))) => return Err(HubError::Transport(e.to_string())),
            Ok(Some(Ok(frame))) => frame,
        };

        let message = match frame {
            Message::Text(text) => decode(text.as_bytes())?,
            Message::Binary(bytes) => decode(&bytes)?,
            Message::Pong(_) => {
                deadline = Instant::now() + pong_wait;
                continue;
            }
            // Answered by the transport.
            Message::Ping(_) => continue,
            Message::Close(_) => return Ok(()),
        };

        hub.submit(client_id.to_string(), message).await?;
    }
}

fn decode(bytes: &[u8]) -> Result<ClientMessage, HubError> {
    serde_json::from_slice(bytes).map_err(|e| HubError::MalformedMessage(e.to_string()))
}

/// Outbound task: write queued payloads and keepalive pings.
///
/// Queued payloads are coalesced with `\n` into a single text frame. When the
/// queue closes, a close frame is sent and a `leave` notification is
/// broadcast on the client's behalf. A failed write requests unregister first
/// and then waits for the hub to close the queue.
pub(crate) async fn run_outbound<K, E>(
    mut sink: K,
    mut outbound: mpsc::Receiver<Payload>,
    hub: HubHandle,
    client_id: String,
    write_wait: Duration,
    ping_period: Duration,
) where
    K: Sink<Message, Error = E> + Unpin,
    E: Display,
{
    let mut keepalive = tokio::time::interval_at(Instant::now() + ping_period, ping_period);
    keepalive.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let exit = loop {
        tokio::select! {
            queued = outbound.recv() => {
                let Some(first) = queued else {
                    break OutboundExit::QueueClosed;
                };
                let batch = coalesce(&first, &mut outbound);
                if let Err(e) = write_frame(&mut sink, Message::Text(batch), write_wait).await {
                    warn!(target: "hub.actor.client", error = %e, "Write failed");
                    break OutboundExit::WriteFailed;
                }
            }

            _ = keepalive.tick() => {
                if let Err(e) = write_frame(&mut sink, Message::Ping(Vec::new()), write_wait).await {
                    warn!(target: "hub.actor.client", error = %e, "Keepalive ping failed");
                    break OutboundExit::WriteFailed;
                }
            }
        }
    };

    match exit {
        OutboundExit::QueueClosed => {
            if let Err(e) = write_frame(&mut sink, Message::Close(None), write_wait).await {
                debug!(target: "hub.actor.client", error = %e, "Close frame not delivered");
            }
        }
        OutboundExit::WriteFailed => {
            if let Err(e) = hub.unregister(client_id.clone()).await {
                debug!(target: "hub.actor.client", error = %e, "Unregister after write failure failed");
            }
            // Discard whatever is still queued until the hub lets go.
            while outbound.recv().await.is_some() {}
        }
    }

    let leave = ClientMessage::new(hub.meeting_id(), ACTION_LEAVE, &client_id);
    if let Err(e) = hub.announce(&leave).await {
        debug!(target: "hub.actor.client", error = %e, "Failed to announce departure");
    }
}

/// Join `first` with every payload already queued behind it.
fn coalesce(first: &Payload, outbound: &mut mpsc::Receiver<Payload>) -> String {
    let mut batch = String::from(&**first);
    for _ in 0..outbound.len() {
        let Ok(next) = outbound.try_recv() else {
            break;
        };
        batch.push('\n');
        batch.push_str(&next);
    }
    batch
}

async fn write_frame<K, E>(sink: &mut K, frame: Message, write_wait: Duration) -> Result<(), HubError>
where
    K: Sink<Message, Error = E> + Unpin,
    E: Display,
{
    match tokio::time::timeout(write_wait, sink.send(frame)).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(HubError::Transport(e.to_string())),
        Err(_) => Err(HubError::Transport("write deadline exceeded".to_string())),
    }
}
