//! Offline synthesizer that produces silence paced like speech.
//!
//! Lets the conversation run without a speech service (`--mute`, no API
//! key, demos). Each line becomes a silent PCM clip whose length matches
//! roughly how long it would take to say it.

use std::time::Duration;

use async_trait::async_trait;

use super::{AudioFormat, SpeechAudio, SpeechSynthesizer};
use crate::error::VoiceError;
use crate::text_utils::strip_voice_tags;

/// Low rate keeps silent buffers small.
const SAMPLE_RATE: u32 = 8_000;

/// About 150 words per minute.
const DEFAULT_CHARS_PER_SECOND: f32 = 14.0;

const MIN_CLIP: Duration = Duration::from_millis(500);
const MAX_CLIP: Duration = Duration::from_secs(60);

/// [`SpeechSynthesizer`] returning silent audio sized to the text.
#[derive(Debug, Clone)]
pub struct PacedSynthesizer {
    chars_per_second: f32,
}

impl PacedSynthesizer {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            chars_per_second: DEFAULT_CHARS_PER_SECOND,
        }
    }

    /// Speaking rate in characters per second.
    #[must_use]
    pub fn with_rate(mut self, chars_per_second: f32) -> Self {
        self.chars_per_second = chars_per_second.max(1.0);
        self
    }

    /// How long `text` would take to say. Voice tags do not count.
    #[must_use]
    pub fn speaking_time(&self, text: &str) -> Duration {
        let chars = strip_voice_tags(text).chars().count();
        #[allow(clippy::cast_precision_loss)]
        let secs = chars as f32 / self.chars_per_second;
        Duration::from_secs_f32(secs).clamp(MIN_CLIP, MAX_CLIP)
    }
}

impl Default for PacedSynthesizer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SpeechSynthesizer for PacedSynthesizer {
    async fn synthesize(&self, text: &str, _voice_id: &str) -> Result<SpeechAudio, VoiceError> {
        let length = self.speaking_time(text);
        let millis = u64::try_from(length.as_millis()).unwrap_or(u64::MAX);
        let samples = u64::from(SAMPLE_RATE) * millis / 1000;
        let bytes = usize::try_from(samples * 2)
            .map_err(|_| VoiceError::Synthesis("clip too long".into()))?;

        Ok(SpeechAudio::new(
            vec![0; bytes],
            AudioFormat::Pcm16 {
                sample_rate: SAMPLE_RATE,
            },
        ))
    }

    fn name(&self) -> &'static str {
        "paced"
    }
}
