//! Core domain types and port definitions for chorus.
//!
//! This crate has no runtime I/O. It defines what a spoken multi-agent
//! conversation looks like (messages, turn state, speech request ids), the
//! wire shapes exchanged with the conversation server, and the ports the
//! coordinator in `chorus-voice` talks to.

#![deny(unused_crate_dependencies)]

pub mod contracts;
pub mod domain;
pub mod events;
pub mod ports;
pub mod settings;

// Re-export commonly used types for convenience
pub use contracts::http::{ConversationMode, SessionAgent, SessionRequest, SessionResponse};
pub use contracts::ws::{AgentGender, AgentMessage, ClientMessage, ServerMessage};
pub use domain::{DisplayMessage, MessageKind, SpeechRequestId, TurnState};
pub use events::ConversationEvent;
pub use ports::{
    ChannelObserver, ConversationObserver, NoopObserver, NoopSession, SessionLifecycle,
    TransportEgress, TransportError,
};
pub use settings::{
    ConversationSettings, DEFAULT_INTER_ITEM_PAUSE_MS, DEFAULT_PLAYBACK_TIMEOUT_SECS,
    DEFAULT_SYNTHESIS_TIMEOUT_SECS, DEFAULT_USER_NAME, DEFAULT_VOICE_ID, FailureFallback,
    SettingsError, TurnPolicy, validate_settings,
};
