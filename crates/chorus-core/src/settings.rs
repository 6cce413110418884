//! Conversation settings and validation.
//!
//! Pure configuration types with no infrastructure dependencies. Every field
//! is optional so partial configs (env, flags, files) can be layered; the
//! `effective_*` accessors supply defaults.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::contracts::ws::AgentGender;

/// Default pause inserted after each spoken item.
pub const DEFAULT_INTER_ITEM_PAUSE_MS: u64 = 400;

/// Default upper bound on a single synthesis call.
pub const DEFAULT_SYNTHESIS_TIMEOUT_SECS: u64 = 20;

/// Default upper bound on a single clip's playback.
pub const DEFAULT_PLAYBACK_TIMEOUT_SECS: u64 = 180;

/// Voice used when an agent event carries no voice and no gender voice is set.
pub const DEFAULT_VOICE_ID: &str = "EXAVITQu4vr4xnSDxMaL";

/// Display name of the human participant.
pub const DEFAULT_USER_NAME: &str = "User";

/// What happens to the human's turn in the pause between two agent clips.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnPolicy {
    /// Every clip end hands the turn back, even if more clips are queued.
    #[default]
    ReopenBetweenItems,

    /// Keep the agent's turn while further clips are waiting.
    HoldWhileQueued,
}

/// What is shown when an agent clip cannot be synthesized or played.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureFallback {
    /// Skip the turn entirely (logged).
    #[default]
    Skip,

    /// Show the text without matching audio.
    ShowText,
}

/// Conversation client settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ConversationSettings {
    /// Pause after each clip, in milliseconds (0-10 000).
    pub inter_item_pause_ms: Option<u64>,

    /// Synthesis timeout in seconds (1-300).
    pub synthesis_timeout_secs: Option<u64>,

    /// Playback timeout in seconds (1-3600).
    pub playback_timeout_secs: Option<u64>,

    pub turn_policy: Option<TurnPolicy>,

    pub failure_fallback: Option<FailureFallback>,

    /// Voice used when nothing more specific applies.
    pub default_voice_id: Option<String>,

    pub male_voice_id: Option<String>,
    pub female_voice_id: Option<String>,
    pub neutral_voice_id: Option<String>,

    /// Name attached to outgoing user messages.
    pub user_name: Option<String>,
}

impl ConversationSettings {
    /// Create settings with sensible defaults.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self {
            inter_item_pause_ms: Some(DEFAULT_INTER_ITEM_PAUSE_MS),
            synthesis_timeout_secs: Some(DEFAULT_SYNTHESIS_TIMEOUT_SECS),
            playback_timeout_secs: Some(DEFAULT_PLAYBACK_TIMEOUT_SECS),
            turn_policy: Some(TurnPolicy::default()),
            failure_fallback: Some(FailureFallback::default()),
            default_voice_id: Some(DEFAULT_VOICE_ID.to_string()),
            male_voice_id: None,
            female_voice_id: None,
            neutral_voice_id: None,
            user_name: Some(DEFAULT_USER_NAME.to_string()),
        }
    }

    #[must_use]
    pub fn effective_inter_item_pause(&self) -> Duration {
        Duration::from_millis(self.inter_item_pause_ms.unwrap_or(DEFAULT_INTER_ITEM_PAUSE_MS))
    }

    #[must_use]
    pub fn effective_synthesis_timeout(&self) -> Duration {
        Duration::from_secs(
            self.synthesis_timeout_secs
                .unwrap_or(DEFAULT_SYNTHESIS_TIMEOUT_SECS),
        )
    }

    #[must_use]
    pub fn effective_playback_timeout(&self) -> Duration {
        Duration::from_secs(
            self.playback_timeout_secs
                .unwrap_or(DEFAULT_PLAYBACK_TIMEOUT_SECS),
        )
    }

    #[must_use]
    pub fn effective_turn_policy(&self) -> TurnPolicy {
        self.turn_policy.unwrap_or_default()
    }

    #[must_use]
    pub fn effective_failure_fallback(&self) -> FailureFallback {
        self.failure_fallback.unwrap_or_default()
    }

    #[must_use]
    pub fn effective_user_name(&self) -> &str {
        self.user_name.as_deref().unwrap_or(DEFAULT_USER_NAME)
    }

    /// Pick the voice for an agent turn.
    ///
    /// An explicit voice on the event wins, then the voice configured for the
    /// agent's gender, then the default voice.
    #[must_use]
    pub fn resolve_voice<'a>(&'a self, explicit: Option<&'a str>, gender: AgentGender) -> &'a str {
        if let Some(voice) = explicit.filter(|v| !v.trim().is_empty()) {
            return voice;
        }
        let by_gender = match gender {
            AgentGender::Male => self.male_voice_id.as_deref(),
            AgentGender::Female => self.female_voice_id.as_deref(),
            AgentGender::Neutral => self.neutral_voice_id.as_deref(),
        };
        by_gender
            .or(self.default_voice_id.as_deref())
            .unwrap_or(DEFAULT_VOICE_ID)
    }

    /// Overlay another settings value: fields that are `Some` in `other` win.
    pub fn merge(&mut self, other: &Self) {
        macro_rules! overlay {
            ($($field:ident),* $(,)?) => {
                $(
                    if other.$field.is_some() {
                        self.$field.clone_from(&other.$field);
                    }
                )*
            };
        }
        overlay!(
            inter_item_pause_ms,
            synthesis_timeout_secs,
            playback_timeout_secs,
            turn_policy,
            failure_fallback,
            default_voice_id,
            male_voice_id,
            female_voice_id,
            neutral_voice_id,
            user_name,
        );
    }
}

/// Settings validation error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    #[error("Inter-item pause must be at most 10000 ms, got {0}")]
    InvalidPause(u64),

    #[error("Synthesis timeout must be between 1 and 300 seconds, got {0}")]
    InvalidSynthesisTimeout(u64),

    #[error("Playback timeout must be between 1 and 3600 seconds, got {0}")]
    InvalidPlaybackTimeout(u64),

    #[error("Voice id for {0} cannot be empty")]
    EmptyVoiceId(&'static str),

    #[error("User name cannot be empty")]
    EmptyUserName,
}

/// Validate settings values.
pub fn validate_settings(settings: &ConversationSettings) -> Result<(), SettingsError> {
    if let Some(pause) = settings.inter_item_pause_ms {
        if pause > 10_000 {
            return Err(SettingsError::InvalidPause(pause));
        }
    }

    if let Some(secs) = settings.synthesis_timeout_secs {
        if !(1..=300).contains(&secs) {
            return Err(SettingsError::InvalidSynthesisTimeout(secs));
        }
    }

    if let Some(secs) = settings.playback_timeout_secs {
        if !(1..=3600).contains(&secs) {
            return Err(SettingsError::InvalidPlaybackTimeout(secs));
        }
    }

    let voices = [
        ("default voice", &settings.default_voice_id),
        ("male voice", &settings.male_voice_id),
        ("female voice", &settings.female_voice_id),
        ("neutral voice", &settings.neutral_voice_id),
    ];
    for (label, voice) in voices {
        if voice.as_ref().is_some_and(|v| v.trim().is_empty()) {
            return Err(SettingsError::EmptyVoiceId(label));
        }
    }

    if settings
        .user_name
        .as_ref()
        .is_some_and(|n| n.trim().is_empty())
    {
        return Err(SettingsError::EmptyUserName);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = ConversationSettings::with_defaults();
        assert_eq!(settings.inter_item_pause_ms, Some(DEFAULT_INTER_ITEM_PAUSE_MS));
        assert_eq!(settings.effective_turn_policy(), TurnPolicy::ReopenBetweenItems);
        assert_eq!(settings.effective_failure_fallback(), FailureFallback::Skip);
        assert_eq!(settings.effective_user_name(), "User");
        assert!(validate_settings(&settings).is_ok());
    }

    #[test]
    fn test_empty_settings_fall_back_to_defaults() {
        let settings = ConversationSettings::default();
        assert_eq!(
            settings.effective_synthesis_timeout(),
            Duration::from_secs(DEFAULT_SYNTHESIS_TIMEOUT_SECS)
        );
        assert_eq!(
            settings.effective_inter_item_pause(),
            Duration::from_millis(DEFAULT_INTER_ITEM_PAUSE_MS)
        );
        assert_eq!(settings.resolve_voice(None, AgentGender::Male), DEFAULT_VOICE_ID);
    }

    #[test]
    fn test_resolve_voice_precedence() {
        let settings = ConversationSettings {
            female_voice_id: Some("female-voice".into()),
            default_voice_id: Some("fallback".into()),
            ..Default::default()
        };
        assert_eq!(settings.resolve_voice(Some("explicit"), AgentGender::Female), "explicit");
        assert_eq!(settings.resolve_voice(Some("  "), AgentGender::Female), "female-voice");
        assert_eq!(settings.resolve_voice(None, AgentGender::Male), "fallback");
    }

    #[test]
    fn test_validate_synthesis_timeout_out_of_range() {
        let settings = ConversationSettings {
            synthesis_timeout_secs: Some(0),
            ..Default::default()
        };
        assert_eq!(
            validate_settings(&settings),
            Err(SettingsError::InvalidSynthesisTimeout(0))
        );
    }

    #[test]
    fn test_validate_pause_too_long() {
        let settings = ConversationSettings {
            inter_item_pause_ms: Some(60_000),
            ..Default::default()
        };
        assert!(matches!(
            validate_settings(&settings),
            Err(SettingsError::InvalidPause(60_000))
        ));
    }

    #[test]
    fn test_validate_empty_voice() {
        let settings = ConversationSettings {
            male_voice_id: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(
            validate_settings(&settings),
            Err(SettingsError::EmptyVoiceId("male voice"))
        );
    }

    #[test]
    fn test_merge_only_overrides_present_fields() {
        let mut base = ConversationSettings::with_defaults();
        let overlay = ConversationSettings {
            inter_item_pause_ms: Some(0),
            user_name: Some("Dana".into()),
            ..Default::default()
        };
        base.merge(&overlay);
        assert_eq!(base.inter_item_pause_ms, Some(0));
        assert_eq!(base.effective_user_name(), "Dana");
        assert_eq!(base.default_voice_id.as_deref(), Some(DEFAULT_VOICE_ID));
    }

    #[test]
    fn test_policies_deserialize_snake_case() {
        let settings: ConversationSettings =
            serde_json::from_str(r#"{"turn_policy":"hold_while_queued","failure_fallback":"show_text"}"#)
                .unwrap();
        assert_eq!(settings.effective_turn_policy(), TurnPolicy::HoldWhileQueued);
        assert_eq!(settings.effective_failure_fallback(), FailureFallback::ShowText);
    }
}
