//! WebSocket test client.
//!
//! Wraps a tokio-tungstenite connection. The hub may coalesce several
//! messages into one text frame separated by `\n`; `next_message` splits
//! them and hands them out one at a time.

use futures_util::{SinkExt, StreamExt};
use std::collections::VecDeque;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

/// Default wait for an expected message.
pub const DEFAULT_RECV_TIMEOUT: Duration = Duration::from_secs(5);

/// A connected meeting participant.
pub struct WsTestClient {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    pending: VecDeque<serde_json::Value>,
}

impl WsTestClient {
    /// Connect to a meeting's WebSocket URL.
    pub async fn connect(url: &str) -> Result<Self, anyhow::Error> {
        let (stream, _response) = tokio_tungstenite::connect_async(url).await?;
        Ok(Self {
            stream,
            pending: VecDeque::new(),
        })
    }

    /// Attempt an upgrade and return the HTTP status of a rejected handshake.
    ///
    /// Returns `101` if the upgrade succeeded.
    pub async fn handshake_status(url: &str, origin: Option<&str>) -> Result<u16, anyhow::Error> {
        let mut request = url.into_client_request()?;
        if let Some(origin) = origin {
            request
                .headers_mut()
                .insert("Origin", HeaderValue::from_str(origin)?);
        }

        match tokio_tungstenite::connect_async(request).await {
            Ok((mut stream, response)) => {
                let _ = stream.close(None).await;
                Ok(response.status().as_u16())
            }
            Err(WsError::Http(response)) => Ok(response.status().as_u16()),
            Err(e) => Err(e.into()),
        }
    }

    /// Send a client message.
    pub async fn send_action(
        &mut self,
        meeting_id: &str,
        action: &str,
        client_id: &str,
    ) -> Result<(), anyhow::Error> {
        let body = serde_json::json!({
            "meetingId": meeting_id,
            "action": action,
            "clientId": client_id,
        });
        self.stream.send(Message::Text(body.to_string())).await?;
        Ok(())
    }

    /// Send a raw text frame.
    pub async fn send_text(&mut self, text: &str) -> Result<(), anyhow::Error> {
        self.stream.send(Message::Text(text.to_string())).await?;
        Ok(())
    }

    /// Next JSON message, waiting up to [`DEFAULT_RECV_TIMEOUT`].
    pub async fn next_message(&mut self) -> Result<serde_json::Value, anyhow::Error> {
        self.next_message_within(DEFAULT_RECV_TIMEOUT).await
    }

    /// Next JSON message, waiting up to `wait`.
    pub async fn next_message_within(
        &mut self,
        wait: Duration,
    ) -> Result<serde_json::Value, anyhow::Error> {
        let deadline = tokio::time::Instant::now() + wait;
        loop {
            if let Some(message) = self.pending.pop_front() {
                return Ok(message);
            }

            let frame = tokio::time::timeout_at(deadline, self.stream.next())
                .await
                .map_err(|_| anyhow::anyhow!("timed out waiting for message"))?;

            match frame {
                Some(Ok(Message::Text(text))) => {
                    for line in text.split('\n').filter(|line| !line.is_empty()) {
                        self.pending.push_back(serde_json::from_str(line)?);
                    }
                }
                Some(Ok(Message::Close(_))) | None => {
                    anyhow::bail!("connection closed");
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e.into()),
            }
        }
    }

    /// Wait for the next message carrying `action`, skipping others.
    pub async fn expect_action(&mut self, action: &str) -> Result<serde_json::Value, anyhow::Error> {
        loop {
            let message = self.next_message().await?;
            if message["action"] == action {
                return Ok(message);
            }
        }
    }

    /// `true` if no message arrives within `wait`.
    pub async fn expect_silence(&mut self, wait: Duration) -> bool {
        self.next_message_within(wait).await.is_err() && self.pending.is_empty()
    }

    /// Wait until the server closes the connection.
    pub async fn expect_closed(&mut self, wait: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + wait;
        loop {
            match tokio::time::timeout_at(deadline, self.stream.next()).await {
                Err(_) => return false,
                Ok(None) | Ok(Some(Ok(Message::Close(_)))) | Ok(Some(Err(_))) => return true,
                Ok(Some(Ok(_))) => {}
            }
        }
    }

    /// Close the connection from the client side.
    pub async fn close(mut self) -> Result<(), anyhow::Error> {
        self.stream.close(None).await?;
        Ok(())
    }
}
