//! WebSocket message shapes.
//!
//! Every frame is a JSON object with a `type` tag:
//!
//! ```json
//! { "type": "agent_message", "agent_name": "Luna", "message": "Hi!",
//!   "agent_gender": "female", "voice_id": "EXAVITQu4vr4xnSDxMaL",
//!   "timestamp": "2024-05-01T10:00:00.123456" }
//! ```

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Gender hint attached to agent messages, used for voice fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum AgentGender {
    Male,
    Female,
    #[default]
    Neutral,
}

impl AgentGender {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Male => "male",
            Self::Female => "female",
            Self::Neutral => "neutral",
        }
    }
}

impl std::fmt::Display for AgentGender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for AgentGender {
    fn from(value: String) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "male" => Self::Male,
            "female" => Self::Female,
            _ => Self::Neutral,
        }
    }
}

/// An agent turn delivered by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentMessage {
    pub agent_name: String,
    pub message: String,
    #[serde(default)]
    pub agent_gender: AgentGender,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl AgentMessage {
    /// Parse the server timestamp.
    ///
    /// Accepts RFC 3339 and the naive ISO-8601 form (no offset), which is
    /// interpreted as UTC. Returns `None` if absent or unparseable.
    #[must_use]
    pub fn parsed_timestamp(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(self.timestamp.as_deref()?)
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Frames received from the conversation server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// An agent spoke.
    AgentMessage(AgentMessage),

    /// The server acknowledged a user message.
    MessageReceived {
        #[serde(default)]
        content: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<String>,
    },

    /// The server reported a problem. Older servers use `message` for the text.
    Error {
        #[serde(default, alias = "message")]
        content: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<String>,
    },

    /// Heartbeat reply.
    Pong {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<String>,
    },

    /// Any frame type this client does not know about.
    #[serde(other)]
    Unknown,
}

impl ServerMessage {
    /// Parse a text frame.
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// The `type` tag, for logging.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::AgentMessage(_) => "agent_message",
            Self::MessageReceived { .. } => "message_received",
            Self::Error { .. } => "error",
            Self::Pong { .. } => "pong",
            Self::Unknown => "unknown",
        }
    }
}

/// Frames sent to the conversation server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Text typed by the human participant.
    UserMessage { content: String, user_name: String },

    /// Heartbeat.
    Ping,
}

impl ClientMessage {
    /// Build a user message frame.
    pub fn user(content: impl Into<String>, user_name: impl Into<String>) -> Self {
        Self::UserMessage {
            content: content.into(),
            user_name: user_name.into(),
        }
    }

    /// Serialize to a text frame.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Datelike, Timelike};

    use super::*;

    #[test]
    fn parses_agent_message() {
        let raw = r#"{"type":"agent_message","agent_name":"Luna","message":"[excited] Hi!",
            "agent_gender":"female","voice_id":"EXAVITQu4vr4xnSDxMaL",
            "timestamp":"2024-05-01T10:00:00.123456"}"#;
        let ServerMessage::AgentMessage(msg) = ServerMessage::from_json(raw).unwrap() else {
            panic!("expected agent message");
        };
        assert_eq!(msg.agent_name, "Luna");
        assert_eq!(msg.agent_gender, AgentGender::Female);
        assert_eq!(msg.voice_id.as_deref(), Some("EXAVITQu4vr4xnSDxMaL"));

        let ts = msg.parsed_timestamp().unwrap();
        assert_eq!(ts.year(), 2024);
        assert_eq!(ts.hour(), 10);
    }

    #[test]
    fn agent_message_without_optional_fields() {
        let raw = r#"{"type":"agent_message","agent_name":"Max","message":"yo"}"#;
        let ServerMessage::AgentMessage(msg) = ServerMessage::from_json(raw).unwrap() else {
            panic!("expected agent message");
        };
        assert_eq!(msg.agent_gender, AgentGender::Neutral);
        assert!(msg.voice_id.is_none());
        assert!(msg.parsed_timestamp().is_none());
    }

    #[test]
    fn unknown_gender_maps_to_neutral() {
        let raw = r#"{"type":"agent_message","agent_name":"X","message":"m","agent_gender":"robot"}"#;
        let ServerMessage::AgentMessage(msg) = ServerMessage::from_json(raw).unwrap() else {
            panic!("expected agent message");
        };
        assert_eq!(msg.agent_gender, AgentGender::Neutral);
    }

    #[test]
    fn error_accepts_message_key() {
        let raw = r#"{"type":"error","message":"Session not found"}"#;
        let parsed = ServerMessage::from_json(raw).unwrap();
        assert_eq!(
            parsed,
            ServerMessage::Error {
                content: "Session not found".into(),
                timestamp: None
            }
        );
    }

    #[test]
    fn unknown_type_is_tolerated() {
        let parsed = ServerMessage::from_json(r#"{"type":"system_message","content":"x"}"#).unwrap();
        assert_eq!(parsed, ServerMessage::Unknown);
        assert_eq!(parsed.kind(), "unknown");
    }

    #[test]
    fn rfc3339_timestamp_is_accepted() {
        let msg = AgentMessage {
            agent_name: "A".into(),
            message: "m".into(),
            agent_gender: AgentGender::Male,
            voice_id: None,
            avatar_url: None,
            timestamp: Some("2024-05-01T10:00:00+02:00".into()),
        };
        assert_eq!(msg.parsed_timestamp().unwrap().hour(), 8);
    }

    #[test]
    fn user_message_wire_shape() {
        let json = ClientMessage::user("hello", "Dana").to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["type"], "user_message");
        assert_eq!(value["content"], "hello");
        assert_eq!(value["user_name"], "Dana");

        let ping = ClientMessage::Ping.to_json().unwrap();
        assert_eq!(ping, r#"{"type":"ping"}"#);
    }
}
