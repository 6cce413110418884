//! Turn-taking state.

use serde::{Deserialize, Serialize};

/// Who currently holds the floor.
///
/// Exactly one value at any instant. Only the turn-taking machine in
/// `chorus-voice` writes it; everything else reads snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", content = "speaker", rename_all = "snake_case")]
pub enum TurnState {
    /// No conversation started yet.
    #[default]
    Idle,

    /// An agent's audio is playing; the human may not send.
    AgentSpeaking(String),

    /// The human may send a message.
    UserMayRespond,
}

impl TurnState {
    /// Whether the human's send action is enabled.
    #[must_use]
    pub const fn may_send(&self) -> bool {
        matches!(self, Self::UserMayRespond)
    }

    /// Name of the agent currently speaking, if any.
    #[must_use]
    pub fn speaker(&self) -> Option<&str> {
        match self {
            Self::AgentSpeaking(name) => Some(name),
            _ => None,
        }
    }
}

impl std::fmt::Display for TurnState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::AgentSpeaking(name) => write!(f, "{name} is speaking"),
            Self::UserMayRespond => write!(f, "your turn"),
        }
    }
}
