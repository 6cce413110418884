//! Command-line arguments.
//!
//! Every flag can also come from the environment (`CHORUS_*`, or
//! `ELEVENLABS_API_KEY`), and `main` loads `.env` first, so precedence is
//! defaults < `.env` < environment < flags.

use clap::Parser;

use chorus_core::{ConversationMode, ConversationSettings, FailureFallback, TurnPolicy};

/// Command-line interface for the chorus conversation client.
#[derive(Debug, Parser)]
#[command(name = "chorus")]
#[command(about = "Talk with a panel of AI agents that take turns speaking")]
#[command(version)]
pub struct Cli {
    /// Conversation server base URL
    #[arg(long, env = "CHORUS_SERVER", default_value = "http://localhost:8000")]
    pub server: String,

    /// Agent roster: "environment" or "presentation-jury-mode" (alias "jury")
    #[arg(long, env = "CHORUS_MODE", default_value_t = ConversationMode::Environment)]
    pub mode: ConversationMode,

    /// Scenario for environment mode (e.g. "classroom", "office")
    #[arg(long, env = "CHORUS_ENVIRONMENT")]
    pub environment: Option<String>,

    /// Your display name in the conversation
    #[arg(long, env = "CHORUS_USER_NAME")]
    pub user_name: Option<String>,

    /// Do not synthesize or play audio; pace agents by text length instead
    #[arg(long, env = "CHORUS_MUTE")]
    pub mute: bool,

    /// ElevenLabs API key for speech synthesis
    #[arg(long, env = "ELEVENLABS_API_KEY", hide_env_values = true)]
    pub elevenlabs_api_key: Option<String>,

    /// Voice used when an agent has no voice of its own
    #[arg(long, env = "CHORUS_VOICE_ID")]
    pub voice_id: Option<String>,

    /// Voice for male agents without an explicit voice
    #[arg(long, env = "CHORUS_MALE_VOICE_ID")]
    pub male_voice_id: Option<String>,

    /// Voice for female agents without an explicit voice
    #[arg(long, env = "CHORUS_FEMALE_VOICE_ID")]
    pub female_voice_id: Option<String>,

    /// Voice for neutral agents without an explicit voice
    #[arg(long, env = "CHORUS_NEUTRAL_VOICE_ID")]
    pub neutral_voice_id: Option<String>,

    /// Pause between agent lines in milliseconds
    #[arg(long, env = "CHORUS_PAUSE_MS")]
    pub pause_ms: Option<u64>,

    /// Keep the floor with the agents until everything queued has been spoken
    #[arg(long, env = "CHORUS_HOLD_TURN")]
    pub hold_turn: bool,

    /// Show an agent's line even when its audio could not be produced
    #[arg(long, env = "CHORUS_SHOW_FAILED_TEXT")]
    pub show_failed_text: bool,

    /// Enable verbose/debug output
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

impl Cli {
    /// Conversation settings implied by the flags, on top of the defaults.
    #[must_use]
    pub fn settings(&self) -> ConversationSettings {
        let mut settings = ConversationSettings::with_defaults();
        settings.merge(&ConversationSettings {
            inter_item_pause_ms: self.pause_ms,
            turn_policy: self.hold_turn.then_some(TurnPolicy::HoldWhileQueued),
            failure_fallback: self.show_failed_text.then_some(FailureFallback::ShowText),
            default_voice_id: self.voice_id.clone(),
            male_voice_id: self.male_voice_id.clone(),
            female_voice_id: self.female_voice_id.clone(),
            neutral_voice_id: self.neutral_voice_id.clone(),
            user_name: self.user_name.clone(),
            ..ConversationSettings::default()
        });
        settings
    }
}
