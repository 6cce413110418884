//! ElevenLabs text-to-speech over HTTPS.
//!
//! Each request is a single `POST /v1/text-to-speech/{voice_id}` returning
//! the complete MP3 clip. Bracketed expression tags in the text are
//! forwarded as-is; the service interprets them.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use serde::Serialize;

use super::{AudioFormat, SpeechAudio, SpeechSynthesizer};
use crate::error::VoiceError;

const XI_API_KEY_HEADER: &str = "xi-api-key";

/// Default API origin.
pub const DEFAULT_BASE_URL: &str = "https://api.elevenlabs.io";

/// Model that understands inline `[tag]` voice expressions.
pub const DEFAULT_MODEL_ID: &str = "eleven_v3";

/// Output format requested from the service and its bitrate.
const OUTPUT_FORMAT: &str = "mp3_44100_128";
const OUTPUT_BITRATE: u32 = 128_000;

/// Connection settings for [`ElevenLabsSynthesizer`].
#[derive(Debug, Clone)]
pub struct ElevenLabsConfig {
    pub api_key: String,
    pub base_url: String,
    pub model_id: String,
    /// Transport-level timeout. The queue applies its own, usually shorter,
    /// synthesis timeout on top of this.
    pub request_timeout: Duration,
}

impl ElevenLabsConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model_id: DEFAULT_MODEL_ID.to_string(),
            request_timeout: Duration::from_secs(60),
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    #[must_use]
    pub fn with_model_id(mut self, model_id: impl Into<String>) -> Self {
        self.model_id = model_id.into();
        self
    }

    fn endpoint(&self, voice_id: &str) -> String {
        format!(
            "{}/v1/text-to-speech/{voice_id}?output_format={OUTPUT_FORMAT}",
            self.base_url.trim_end_matches('/')
        )
    }
}

#[derive(Debug, Serialize)]
struct TextToSpeechBody<'a> {
    text: &'a str,
    model_id: &'a str,
}

/// [`SpeechSynthesizer`] backed by the ElevenLabs REST API.
pub struct ElevenLabsSynthesizer {
    client: reqwest::Client,
    config: ElevenLabsConfig,
}

impl ElevenLabsSynthesizer {
    pub fn new(config: ElevenLabsConfig) -> Result<Self, VoiceError> {
        if config.api_key.trim().is_empty() {
            return Err(VoiceError::Synthesis("ElevenLabs API key is empty".into()));
        }

        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self { client, config })
    }
}

#[async_trait]
impl SpeechSynthesizer for ElevenLabsSynthesizer {
    async fn synthesize(&self, text: &str, voice_id: &str) -> Result<SpeechAudio, VoiceError> {
        let url = self.config.endpoint(voice_id);
        tracing::debug!(voice_id, chars = text.len(), "Requesting ElevenLabs synthesis");

        let response = self
            .client
            .post(&url)
            .header(XI_API_KEY_HEADER, &self.config.api_key)
            .header(ACCEPT, "audio/mpeg")
            .json(&TextToSpeechBody {
                text,
                model_id: &self.config.model_id,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(VoiceError::Synthesis(format!(
                "ElevenLabs returned HTTP {status}: {}",
                body.trim()
            )));
        }

        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Err(VoiceError::EmptyAudio);
        }

        tracing::debug!(voice_id, bytes = bytes.len(), "ElevenLabs synthesis complete");
        Ok(SpeechAudio::new(
            bytes.to_vec(),
            AudioFormat::Mp3 {
                bitrate: OUTPUT_BITRATE,
            },
        ))
    }

    fn name(&self) -> &'static str {
        "elevenlabs"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_includes_voice_and_format() {
        let config = ElevenLabsConfig::new("key").with_base_url("http://localhost:9000/");
        assert_eq!(
            config.endpoint("abc123"),
            "http://localhost:9000/v1/text-to-speech/abc123?output_format=mp3_44100_128"
        );
    }

    #[test]
    fn empty_api_key_is_rejected() {
        let result = ElevenLabsSynthesizer::new(ElevenLabsConfig::new("  "));
        assert!(matches!(result, Err(VoiceError::Synthesis(_))));
    }

    #[test]
    fn request_body_shape() {
        let body = TextToSpeechBody {
            text: "[excited] Hello",
            model_id: DEFAULT_MODEL_ID,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["text"], "[excited] Hello");
        assert_eq!(json["model_id"], "eleven_v3");
    }
}
