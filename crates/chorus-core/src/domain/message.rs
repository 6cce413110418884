//! Displayed conversation messages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Who a displayed message belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    User,
    Agent,
    System,
}

impl MessageKind {
    /// Convert kind to string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Agent => "agent",
            Self::System => "system",
        }
    }
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A message in the conversation log.
///
/// Immutable once appended to the message store. Agent messages are created
/// ahead of time but only become visible when their audio starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayMessage {
    pub id: Uuid,
    pub kind: MessageKind,
    pub text: String,
    pub sender: String,
    pub timestamp: DateTime<Utc>,
}

impl DisplayMessage {
    fn new(kind: MessageKind, sender: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            text: text.into(),
            sender: sender.into(),
            timestamp: Utc::now(),
        }
    }

    /// A message typed by the human participant.
    pub fn user(sender: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(MessageKind::User, sender, text)
    }

    /// A message spoken by one of the agents.
    pub fn agent(sender: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(MessageKind::Agent, sender, text)
    }

    /// An informational message (server errors, notices).
    pub fn system(text: impl Into<String>) -> Self {
        Self::new(MessageKind::System, "system", text)
    }

    /// Override the timestamp (e.g. with the one carried by the server event).
    #[must_use]
    pub const fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Re-stamp with the current time.
    #[must_use]
    pub fn stamped_now(self) -> Self {
        self.with_timestamp(Utc::now())
    }
}
