//! WebSocket transport between the conversation server and the ingress.
//!
//! One task owns the socket. Inbound text frames are parsed into
//! [`ServerMessage`]s and handed to the ingress; outbound frames arrive
//! through [`WsEgress`], which the ingress holds as its `TransportEgress`.
//! When the socket drops, the task reconnects with exponential backoff.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chorus_core::{ClientMessage, ServerMessage, TransportEgress, TransportError};
use chorus_voice::ConversationIngress;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

/// Keep-alive interval.
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(30);

// ── Egress ─────────────────────────────────────────────────────────

/// Outbound half handed to the ingress.
///
/// Holds the sender of the live connection, if any. Sends while no
/// connection is attached fail with [`TransportError::Disconnected`].
#[derive(Debug, Default)]
pub struct WsEgress {
    tx: Mutex<Option<mpsc::UnboundedSender<ClientMessage>>>,
}

impl WsEgress {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn attach(&self, tx: mpsc::UnboundedSender<ClientMessage>) {
        *self.tx.lock().unwrap_or_else(PoisonError::into_inner) = Some(tx);
    }

    fn detach(&self) {
        self.tx.lock().unwrap_or_else(PoisonError::into_inner).take();
    }
}

impl TransportEgress for WsEgress {
    fn send(&self, message: ClientMessage) -> Result<(), TransportError> {
        let guard = self.tx.lock().unwrap_or_else(PoisonError::into_inner);
        let tx = guard.as_ref().ok_or(TransportError::Disconnected)?;
        tx.send(message).map_err(|_| TransportError::Disconnected)
    }
}

// ── Connection loop ────────────────────────────────────────────────

/// How a single connection attempt ended.
#[derive(Debug)]
enum ConnectionEnd {
    /// Shutdown was requested.
    Cancelled,
    /// Connected, then lost the socket.
    Dropped(TransportError),
    /// Never connected.
    Failed(TransportError),
}

/// Keep a connection to `url` open until `cancel` fires.
pub async fn run(
    url: String,
    ingress: Arc<ConversationIngress>,
    egress: Arc<WsEgress>,
    cancel: CancellationToken,
) {
    let mut backoff = INITIAL_BACKOFF;

    loop {
        match connect_once(&url, &ingress, &egress, &cancel).await {
            ConnectionEnd::Cancelled => break,
            ConnectionEnd::Dropped(e) => {
                tracing::error!(error = %e, "Connection lost, reconnecting");
                backoff = INITIAL_BACKOFF;
            }
            ConnectionEnd::Failed(e) => {
                tracing::error!(error = %e, retry_in = ?backoff, "Could not connect");
            }
        }

        tokio::select! {
            () = cancel.cancelled() => break,
            () = tokio::time::sleep(backoff) => {}
        }
        backoff = (backoff * 2).min(MAX_BACKOFF);
    }

    tracing::debug!("Transport stopped");
}

async fn connect_once(
    url: &str,
    ingress: &ConversationIngress,
    egress: &WsEgress,
    cancel: &CancellationToken,
) -> ConnectionEnd {
    let connect = tokio::select! {
        () = cancel.cancelled() => return ConnectionEnd::Cancelled,
        result = connect_async(url) => result,
    };
    let (stream, _) = match connect {
        Ok(pair) => pair,
        Err(e) => return ConnectionEnd::Failed(TransportError::Session(e.to_string())),
    };

    let (mut sink, mut source) = stream.split();
    let (tx, mut outbound) = mpsc::unbounded_channel::<ClientMessage>();
    egress.attach(tx);
    ingress.mark_connected();
    tracing::info!(%url, "WebSocket connected");

    let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
    heartbeat.tick().await;

    let end = loop {
        tokio::select! {
            () = cancel.cancelled() => break ConnectionEnd::Cancelled,

            _ = heartbeat.tick() => {
                if let Err(e) = ingress.ping() {
                    tracing::debug!(error = %e, "Heartbeat skipped");
                }
            }

            message = outbound.recv() => {
                let Some(message) = message else {
                    break ConnectionEnd::Dropped(TransportError::Disconnected);
                };
                let frame = match message.to_json() {
                    Ok(json) => Message::Text(json.into()),
                    Err(e) => {
                        tracing::error!(error = %e, "Could not encode outbound frame");
                        continue;
                    }
                };
                if let Err(e) = sink.send(frame).await {
                    break ConnectionEnd::Dropped(TransportError::Send(e.to_string()));
                }
            }

            frame = source.next() => match frame {
                Some(Ok(Message::Text(text))) => dispatch(ingress, text.as_str()),
                Some(Ok(Message::Close(_))) | None => {
                    break ConnectionEnd::Dropped(TransportError::Disconnected);
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    break ConnectionEnd::Dropped(TransportError::Protocol(e.to_string()));
                }
            },
        }
    };

    egress.detach();
    ingress.mark_disconnected();
    let _ = sink.close().await;
    end
}

/// Parse one text frame and route it. Malformed frames are logged and dropped.
fn dispatch(ingress: &ConversationIngress, raw: &str) {
    match ServerMessage::from_json(raw) {
        Ok(message) => {
            ingress.handle_server_message(message);
        }
        Err(e) => tracing::warn!(error = %e, "Ignoring malformed server frame"),
    }
}
