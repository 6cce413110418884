//! Domain types for a spoken multi-agent conversation.
//!
//! These types are independent of any transport or audio backend.

mod message;
mod speech;
mod turn;

pub use message::{DisplayMessage, MessageKind};
pub use speech::SpeechRequestId;
pub use turn::TurnState;
