//! HTTP session contract.
//!
//! Route strings and JSON shapes for the session endpoints the client calls
//! before opening the WebSocket.

use serde::{Deserialize, Serialize};

use super::ws::AgentGender;

/// `POST` - create a new conversation session.
pub const SESSION_PATH: &str = "/session";

/// `POST` - reset a session (`?session_id=...`).
pub const RESET_PATH: &str = "/reset";

/// WebSocket path for a session.
#[must_use]
pub fn ws_path(session_id: &str) -> String {
    format!("/ws/{session_id}")
}

/// Which agent roster the server should use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConversationMode {
    #[serde(rename = "presentation-jury-mode")]
    PresentationJury,
    #[default]
    #[serde(rename = "environment")]
    Environment,
}

impl ConversationMode {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::PresentationJury => "presentation-jury-mode",
            Self::Environment => "environment",
        }
    }
}

impl std::str::FromStr for ConversationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "presentation-jury-mode" | "jury" => Ok(Self::PresentationJury),
            "environment" => Ok(Self::Environment),
            other => Err(format!(
                "unknown mode '{other}' (expected 'environment' or 'presentation-jury-mode')"
            )),
        }
    }
}

impl std::fmt::Display for ConversationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Body of `POST /session`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRequest {
    pub mode: ConversationMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment_type: Option<String>,
}

/// One participant in a session roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionAgent {
    pub name: String,
    #[serde(default)]
    pub persona: Option<String>,
    #[serde(default)]
    pub gender: AgentGender,
    #[serde(default)]
    pub voice_id: Option<String>,
}

/// Response of `POST /session`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionResponse {
    pub session_id: String,
    pub mode: ConversationMode,
    #[serde(default)]
    pub agents: Vec<SessionAgent>,
    #[serde(default)]
    pub background_audio_enabled: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_round_trips_through_wire_names() {
        assert_eq!(
            serde_json::to_string(&ConversationMode::PresentationJury).unwrap(),
            "\"presentation-jury-mode\""
        );
        assert_eq!("environment".parse::<ConversationMode>(), Ok(ConversationMode::Environment));
        assert!("karaoke".parse::<ConversationMode>().is_err());
    }

    #[test]
    fn parses_session_response() {
        let raw = r#"{
            "session_id": "abc",
            "mode": "environment",
            "agents": [
                {"name": "Max", "persona": "student_tech", "gender": "male", "voice_id": "TxGEqnHWrfWFTfGW9XjX"},
                {"name": "Jordan", "gender": "neutral"}
            ],
            "background_audio_enabled": true
        }"#;
        let resp: SessionResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(resp.session_id, "abc");
        assert_eq!(resp.agents.len(), 2);
        assert_eq!(resp.agents[0].gender, AgentGender::Male);
        assert!(resp.agents[1].voice_id.is_none());
    }

    #[test]
    fn ws_path_embeds_session() {
        assert_eq!(ws_path("s-1"), "/ws/s-1");
    }
}
