//! Speech synthesis backend trait - engine-agnostic interface for TTS.
//!
//! The [`SpeechQueue`](crate::queue::SpeechQueue) holds an
//! `Arc<dyn SpeechSynthesizer>` so the concrete service can be swapped (or
//! mocked in tests) without touching the sequencing logic.
//!
//! ## Backend implementations
//!
//! | Module            | Service                          |
//! |-------------------|----------------------------------|
//! | [`elevenlabs`]    | ElevenLabs HTTP text-to-speech   |
//! | [`paced`]         | Offline silence paced like speech |

pub mod elevenlabs;
pub mod paced;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::VoiceError;

// ── Shared types ───────────────────────────────────────────────────

/// Container format of a synthesized clip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    /// MPEG layer III at the given bitrate (bits per second).
    Mp3 { bitrate: u32 },

    /// RIFF/WAVE with its own header.
    Wav,

    /// Raw signed 16-bit little-endian mono PCM.
    Pcm16 { sample_rate: u32 },
}

/// Audio produced by speech synthesis.
#[derive(Debug, Clone)]
pub struct SpeechAudio {
    /// Encoded audio bytes.
    pub data: Vec<u8>,

    /// How `data` is encoded.
    pub format: AudioFormat,
}

impl SpeechAudio {
    pub const fn new(data: Vec<u8>, format: AudioFormat) -> Self {
        Self { data, format }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Rough play time of the clip, derived from its size and format.
    ///
    /// Used by headless playback to pace the conversation. Returns zero for
    /// WAV data whose header cannot be read.
    #[must_use]
    pub fn estimated_duration(&self) -> Duration {
        let bytes = self.data.len() as u64;
        match self.format {
            AudioFormat::Mp3 { bitrate } if bitrate > 0 => {
                Duration::from_millis(bytes * 8 * 1000 / u64::from(bitrate))
            }
            AudioFormat::Pcm16 { sample_rate } if sample_rate > 0 => {
                Duration::from_millis(bytes / 2 * 1000 / u64::from(sample_rate))
            }
            AudioFormat::Wav => wav_byte_rate(&self.data).map_or(Duration::ZERO, |rate| {
                let payload = bytes.saturating_sub(WAV_HEADER_LEN);
                Duration::from_millis(payload * 1000 / u64::from(rate))
            }),
            _ => Duration::ZERO,
        }
    }
}

const WAV_HEADER_LEN: u64 = 44;

/// Byte rate field of a canonical WAV header (offset 28, little-endian).
fn wav_byte_rate(data: &[u8]) -> Option<u32> {
    if data.len() < 32 || &data[0..4] != b"RIFF" || &data[8..12] != b"WAVE" {
        return None;
    }
    let rate = u32::from_le_bytes([data[28], data[29], data[30], data[31]]);
    (rate > 0).then_some(rate)
}

// ── Synthesis trait ────────────────────────────────────────────────

/// Backend-agnostic text-to-speech service.
///
/// Implementations must be `Send + Sync`; the queue worker calls
/// `synthesize` from a spawned task and may drop the future early on
/// timeout or `stop()`.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Convert `text` into audio spoken with `voice_id`.
    ///
    /// The text is passed through untouched, including any bracketed
    /// expression tags.
    async fn synthesize(&self, text: &str, voice_id: &str) -> Result<SpeechAudio, VoiceError>;

    /// Short name for logs.
    fn name(&self) -> &'static str {
        "synthesizer"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wav_with_rate(rate: u32, payload: usize) -> Vec<u8> {
        let mut data = vec![0_u8; 44 + payload];
        data[0..4].copy_from_slice(b"RIFF");
        data[8..12].copy_from_slice(b"WAVE");
        data[28..32].copy_from_slice(&rate.to_le_bytes());
        data
    }

    #[test]
    fn mp3_duration_follows_bitrate() {
        // 16 000 bytes at 128 kbit/s is one second.
        let audio = SpeechAudio::new(vec![0; 16_000], AudioFormat::Mp3 { bitrate: 128_000 });
        assert_eq!(audio.estimated_duration(), Duration::from_secs(1));
    }

    #[test]
    fn pcm_duration_follows_sample_rate() {
        let audio = SpeechAudio::new(vec![0; 48_000], AudioFormat::Pcm16 { sample_rate: 24_000 });
        assert_eq!(audio.estimated_duration(), Duration::from_secs(1));
    }

    #[test]
    fn wav_duration_reads_header() {
        let audio = SpeechAudio::new(wav_with_rate(32_000, 16_000), AudioFormat::Wav);
        assert_eq!(audio.estimated_duration(), Duration::from_millis(500));
    }

    #[test]
    fn malformed_wav_has_zero_duration() {
        let audio = SpeechAudio::new(vec![1, 2, 3], AudioFormat::Wav);
        assert_eq!(audio.estimated_duration(), Duration::ZERO);
    }
}
