//! `PlaybackDriver` trait abstraction for speech audio output.
//!
//! This trait decouples the [`SpeechQueue`](crate::queue::SpeechQueue) from
//! any specific output backend:
//!
//! | Implementor | Where used |
//! |---|---|
//! | [`TimedPlayback`](crate::playback::TimedPlayback) | Headless / CLI `--mute` / tests - paces the clip without sound |
//! | `RodioPlayback` (feature `rodio`) | Desktop / CLI - decodes and plays on the default output device |
//!
//! The trait is **object-safe** (`Arc<dyn PlaybackDriver>`). All methods take
//! `&self`; implementations use channels or locks for their state.

use tokio::sync::mpsc;

use crate::backend::SpeechAudio;
use crate::error::VoiceError;

/// Lifecycle notifications for one clip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackEvent {
    /// Audio is now audible.
    Started,
    /// Audio drained or was stopped after it had started.
    Finished,
    /// Audio could not be decoded or played.
    Failed(String),
}

/// Channel on which a driver reports [`PlaybackEvent`]s for a single clip.
pub type PlaybackEvents = mpsc::UnboundedSender<PlaybackEvent>;

/// Abstraction over an audio output device.
///
/// # Contract
/// - `play` returns without waiting for the clip to finish.
/// - For each accepted clip the driver sends `Started` at most once, then
///   exactly one of `Finished` / `Failed`. Dropping the sender without a
///   terminal event counts as a failure.
/// - Starting a new clip stops the previous one.
pub trait PlaybackDriver: Send + Sync {
    /// Begin playing `audio`, reporting its lifecycle on `events`.
    fn play(&self, audio: SpeechAudio, events: PlaybackEvents) -> Result<(), VoiceError>;

    /// Stop the current clip immediately.
    ///
    /// Idempotent. A clip that had started reports `Finished`.
    fn stop(&self);
}
