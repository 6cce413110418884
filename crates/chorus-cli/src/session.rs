//! HTTP session management against the conversation server.

use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use chorus_core::contracts::http::{RESET_PATH, SESSION_PATH, ws_path};
use chorus_core::{SessionLifecycle, SessionRequest, SessionResponse, TransportError};

/// Creates the server-side session and resets it on request.
pub struct HttpSession {
    http: reqwest::Client,
    base_url: String,
    request: SessionRequest,
    current: RwLock<Option<String>>,
}

impl HttpSession {
    pub fn new(base_url: &str, request: SessionRequest) -> Result<Self, TransportError> {
        let base_url = base_url.trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(TransportError::Session(format!(
                "server URL must start with http:// or https://, got '{base_url}'"
            )));
        }

        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| TransportError::Session(e.to_string()))?;

        Ok(Self {
            http,
            base_url,
            request,
            current: RwLock::new(None),
        })
    }

    /// `POST /session` and remember the new session id.
    pub async fn create(&self) -> Result<SessionResponse, TransportError> {
        let url = format!("{}{SESSION_PATH}", self.base_url);
        tracing::debug!(%url, mode = %self.request.mode, "Creating session");

        let response = self
            .http
            .post(&url)
            .json(&self.request)
            .send()
            .await
            .map_err(|e| TransportError::Session(e.to_string()))?
            .error_for_status()
            .map_err(|e| TransportError::Session(e.to_string()))?;

        let session: SessionResponse = response
            .json()
            .await
            .map_err(|e| TransportError::Protocol(format!("invalid session response: {e}")))?;

        tracing::info!(
            session_id = %session.session_id,
            agents = session.agents.len(),
            "Session created"
        );
        *self.current.write().unwrap_or_else(PoisonError::into_inner) =
            Some(session.session_id.clone());
        Ok(session)
    }

    #[must_use]
    pub fn session_id(&self) -> Option<String> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// WebSocket URL for the current session.
    pub fn ws_url(&self) -> Result<String, TransportError> {
        let session_id = self
            .session_id()
            .ok_or_else(|| TransportError::Session("no active session".into()))?;
        Ok(websocket_url(&self.base_url, &session_id))
    }
}

#[async_trait]
impl SessionLifecycle for HttpSession {
    /// `POST /reset?session_id=...` so the agents forget the conversation too.
    async fn restart(&self) -> Result<(), TransportError> {
        let session_id = self
            .session_id()
            .ok_or_else(|| TransportError::Session("no active session".into()))?;
        let url = format!("{}{RESET_PATH}", self.base_url);

        self.http
            .post(&url)
            .query(&[("session_id", session_id.as_str())])
            .send()
            .await
            .map_err(|e| TransportError::Session(e.to_string()))?
            .error_for_status()
            .map_err(|e| TransportError::Session(e.to_string()))?;

        tracing::info!(%session_id, "Server session reset");
        Ok(())
    }
}

/// Swap the HTTP scheme for the matching WebSocket scheme.
fn websocket_url(base_url: &str, session_id: &str) -> String {
    let base = base_url
        .strip_prefix("https://")
        .map(|rest| format!("wss://{rest}"))
        .or_else(|| {
            base_url
                .strip_prefix("http://")
                .map(|rest| format!("ws://{rest}"))
        })
        .unwrap_or_else(|| base_url.to_string());
    format!("{base}{}", ws_path(session_id))
}

#[cfg(test)]
mod tests {
    use chorus_core::ConversationMode;

    use super::*;

    fn request() -> SessionRequest {
        SessionRequest {
            mode: ConversationMode::Environment,
            user_name: Some("Sam".into()),
            environment_type: None,
        }
    }

    #[test]
    fn websocket_url_follows_scheme() {
        assert_eq!(
            websocket_url("http://localhost:8000", "abc"),
            "ws://localhost:8000/ws/abc"
        );
        assert_eq!(
            websocket_url("https://panel.example.com", "abc"),
            "wss://panel.example.com/ws/abc"
        );
    }

    #[test]
    fn rejects_non_http_server() {
        assert!(matches!(
            HttpSession::new("ftp://host", request()),
            Err(TransportError::Session(_))
        ));
    }

    #[test]
    fn ws_url_requires_session() {
        let session = HttpSession::new("http://localhost:8000/", request()).unwrap();
        assert!(session.ws_url().is_err());

        *session.current.write().unwrap() = Some("s-1".into());
        assert_eq!(session.ws_url().unwrap(), "ws://localhost:8000/ws/s-1");
    }

    #[tokio::test]
    async fn restart_without_session_fails_fast() {
        let session = HttpSession::new("http://localhost:8000", request()).unwrap();
        assert!(matches!(
            session.restart().await,
            Err(TransportError::Session(_))
        ));
    }
}
