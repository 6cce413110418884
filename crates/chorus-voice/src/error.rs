//! Coordinator error types.

use std::time::Duration;

use chorus_core::TransportError;

/// Errors raised while synthesizing or playing a speech request.
///
/// Every variant is recoverable from the queue's point of view: the failing
/// item is skipped and the conversation moves on.
#[derive(Debug, thiserror::Error)]
pub enum VoiceError {
    /// The synthesis service reported a failure.
    #[error("Speech synthesis failed: {0}")]
    Synthesis(String),

    /// The synthesis service returned no audio.
    #[error("Speech synthesis returned an empty payload")]
    EmptyAudio,

    /// The synthesis call did not complete in time.
    #[error("Speech synthesis timed out after {0:?}")]
    SynthesisTimeout(Duration),

    /// Audio could not be decoded or played.
    #[error("Playback failed: {0}")]
    Playback(String),

    /// Playback never reported completion.
    #[error("Playback did not finish within {0:?}")]
    PlaybackTimeout(Duration),

    /// Failed to open the audio output.
    #[error("Failed to open audio output stream: {0}")]
    OutputStream(String),

    /// The dedicated audio thread is gone.
    #[error("Audio thread terminated unexpectedly")]
    AudioThreadDied,

    /// HTTP transport error talking to the synthesis service.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The request was interrupted by `stop()`.
    #[error("Speech request cancelled")]
    Cancelled,
}

impl VoiceError {
    /// Whether the failure happened before any audio was produced.
    #[must_use]
    pub const fn is_synthesis_failure(&self) -> bool {
        matches!(
            self,
            Self::Synthesis(_) | Self::EmptyAudio | Self::SynthesisTimeout(_) | Self::Http(_)
        )
    }
}

/// Why a send attempt from the human did not reach the transport.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SendError {
    /// An agent is speaking. Not a failure: the UI should show "please wait".
    #[error("Please wait, {speaker} is still speaking")]
    Blocked { speaker: String },

    /// The conversation has not started yet.
    #[error("The conversation has not started yet")]
    NotStarted,

    /// No connection to the conversation server.
    #[error("Not connected to the conversation server")]
    Disconnected,

    /// Nothing to send.
    #[error("Message is empty")]
    EmptyMessage,

    /// The transport refused the frame.
    #[error(transparent)]
    Transport(#[from] TransportError),
}
