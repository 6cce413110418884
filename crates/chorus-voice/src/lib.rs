//! Speech sequencing and turn-taking for spoken multi-agent conversations.
//!
//! Several agents talk to one human. Their lines arrive faster than they can
//! be spoken, so this crate serializes them:
//!
//! - [`SpeechQueue`] synthesizes and plays one line at a time, in arrival
//!   order, and never lets a failure stall the queue;
//! - [`TurnTaking`] blocks the human's input while an agent is audible;
//! - [`ConversationIngress`] wires both to the transcript so a line appears
//!   exactly when its audio starts.
//!
//! Synthesis and playback are injected through [`SpeechSynthesizer`] and
//! [`PlaybackDriver`]. [`ElevenLabsSynthesizer`] and [`TimedPlayback`] ship
//! here; `RodioPlayback` is available behind the `rodio` feature.

#![deny(unused_crate_dependencies)]

pub mod audio_io;
#[cfg(feature = "rodio")]
pub mod audio_thread;
pub mod backend;
pub mod error;
pub mod ingress;
pub mod playback;
pub mod queue;
pub mod store;
pub mod text_utils;
pub mod turn;

// Re-export key types for convenience
pub use audio_io::{PlaybackDriver, PlaybackEvent, PlaybackEvents};
#[cfg(feature = "rodio")]
pub use audio_thread::RodioPlayback;
pub use backend::elevenlabs::{ElevenLabsConfig, ElevenLabsSynthesizer};
pub use backend::paced::PacedSynthesizer;
pub use backend::{AudioFormat, SpeechAudio, SpeechSynthesizer};
pub use error::{SendError, VoiceError};
pub use ingress::{ConversationIngress, IngressPorts};
pub use playback::TimedPlayback;
pub use queue::{QueueConfig, QueueStatus, SpeechCallbacks, SpeechQueue, SpeechRequest};
pub use store::MessageStore;
pub use turn::TurnTaking;

#[cfg(test)]
use mockall as _;
// Used by the integration tests only
#[cfg(test)]
use chrono as _;
