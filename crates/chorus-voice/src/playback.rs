//! Headless playback - paces clips on the tokio clock without producing sound.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::audio_io::{PlaybackDriver, PlaybackEvent, PlaybackEvents};
use crate::backend::SpeechAudio;
use crate::error::VoiceError;

/// Clips shorter than this are held for this long so the speaker is visible.
const MIN_CLIP: Duration = Duration::from_millis(250);

/// [`PlaybackDriver`] that "plays" a clip by sleeping for its estimated
/// duration.
///
/// Used when no output device is wanted (`--mute`, servers, tests). Each clip
/// runs on a spawned task, so `play` must be called from within a tokio
/// runtime.
#[derive(Debug)]
pub struct TimedPlayback {
    current: Mutex<Option<CancellationToken>>,
    /// Multiplier applied to the estimated duration (1.0 = real time).
    speed: f32,
}

impl TimedPlayback {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            current: Mutex::new(None),
            speed: 1.0,
        }
    }

    /// Play clips faster (`> 1.0`) or slower (`< 1.0`) than real time.
    #[must_use]
    pub fn with_speed(mut self, speed: f32) -> Self {
        self.speed = speed.max(0.1);
        self
    }

    fn clip_length(&self, audio: &SpeechAudio) -> Duration {
        audio.estimated_duration().div_f32(self.speed).max(MIN_CLIP)
    }
}

impl Default for TimedPlayback {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaybackDriver for TimedPlayback {
    fn play(&self, audio: SpeechAudio, events: PlaybackEvents) -> Result<(), VoiceError> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| VoiceError::OutputStream(e.to_string()))?;

        self.stop();

        let length = self.clip_length(&audio);
        let token = CancellationToken::new();
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = Some(token.clone());

        runtime.spawn(async move {
            let _ = events.send(PlaybackEvent::Started);
            tokio::select! {
                () = tokio::time::sleep(length) => {
                    tracing::trace!(?length, "Timed clip finished");
                }
                () = token.cancelled() => {
                    tracing::trace!("Timed clip stopped");
                }
            }
            let _ = events.send(PlaybackEvent::Finished);
        });

        Ok(())
    }

    fn stop(&self) {
        let current = self
            .current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(token) = current {
            token.cancel();
        }
    }
}
