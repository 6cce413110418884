//! Transport egress and session lifecycle ports.

use async_trait::async_trait;
use thiserror::Error;

use crate::contracts::ws::ClientMessage;

/// Errors surfaced by transport adapters.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// No live connection to the conversation server.
    #[error("Not connected to the conversation server")]
    Disconnected,

    /// A frame could not be written.
    #[error("Failed to send frame: {0}")]
    Send(String),

    /// Session setup or teardown failed.
    #[error("Session error: {0}")]
    Session(String),

    /// The server sent something we could not understand.
    #[error("Protocol error: {0}")]
    Protocol(String),
}

/// Outbound side of the conversation channel.
///
/// `send` hands the frame to the transport and returns immediately; it must
/// not wait for the server.
pub trait TransportEgress: Send + Sync {
    fn send(&self, message: ClientMessage) -> Result<(), TransportError>;
}

/// Collaborator responsible for establishing conversation sessions.
///
/// The ingress calls [`restart`](SessionLifecycle::restart) after a local
/// reset so the server side starts over as well.
#[async_trait]
pub trait SessionLifecycle: Send + Sync {
    async fn restart(&self) -> Result<(), TransportError>;
}

/// Session lifecycle that does nothing (tests, offline use).
#[derive(Debug, Clone, Default)]
pub struct NoopSession;

#[async_trait]
impl SessionLifecycle for NoopSession {
    async fn restart(&self) -> Result<(), TransportError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn noop_session_restart_succeeds() {
        assert!(NoopSession.restart().await.is_ok());
    }

    #[test]
    fn error_messages_are_readable() {
        assert_eq!(
            TransportError::Disconnected.to_string(),
            "Not connected to the conversation server"
        );
        assert_eq!(
            TransportError::Send("closed".into()).to_string(),
            "Failed to send frame: closed"
        );
    }
}
