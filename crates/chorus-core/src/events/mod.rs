//! Conversation events emitted to observers.
//!
//! A single discriminated union covering turn changes, message store appends,
//! speech lifecycle and transport notices. Observers (terminal renderer,
//! tests, a future UI bridge) receive these through
//! [`ConversationObserver`](crate::ports::ConversationObserver).
//!
//! # Wire Format
//!
//! ```json
//! { "type": "speech_started", "requestId": 3, "speaker": "Luna" }
//! ```

use serde::{Deserialize, Serialize};

use crate::domain::{DisplayMessage, SpeechRequestId, TurnState};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConversationEvent {
    /// The turn-taking state changed.
    TurnChanged { state: TurnState },

    /// A message became visible in the conversation log.
    MessageAppended { message: DisplayMessage },

    /// A speech request was accepted by the sequencing queue.
    SpeechQueued {
        #[serde(rename = "requestId")]
        request_id: SpeechRequestId,
        speaker: String,
        /// Pending items after this one was added.
        #[serde(rename = "queueLen")]
        queue_len: usize,
    },

    /// Audio for a request became audible.
    SpeechStarted {
        #[serde(rename = "requestId")]
        request_id: SpeechRequestId,
        speaker: String,
    },

    /// Audio for a request ended (naturally or interrupted).
    SpeechFinished {
        #[serde(rename = "requestId")]
        request_id: SpeechRequestId,
    },

    /// Synthesis or playback failed; the item was skipped.
    SpeechFailed {
        #[serde(rename = "requestId")]
        request_id: SpeechRequestId,
        speaker: String,
        error: String,
    },

    /// The human tried to send while an agent was speaking.
    SendBlocked { speaker: Option<String> },

    /// Informational frame from the server (acknowledgement, error notice).
    ServerNotice { kind: String, content: String },

    /// The conversation was reset: queue drained, log cleared.
    ConversationReset,

    /// Transport connectivity changed.
    ConnectionChanged { connected: bool },
}

impl ConversationEvent {
    /// Create a turn change event.
    #[must_use]
    pub const fn turn_changed(state: TurnState) -> Self {
        Self::TurnChanged { state }
    }

    /// Create a message appended event.
    #[must_use]
    pub const fn message_appended(message: DisplayMessage) -> Self {
        Self::MessageAppended { message }
    }
}
