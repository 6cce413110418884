//! CLI bootstrap - the composition root.
//!
//! The only place where concrete adapters are chosen and wired together:
//! - HTTP session client (`session`)
//! - WebSocket egress (`transport`)
//! - Speech synthesizer and playback driver (via chorus-voice)
//! - Terminal observer (`presentation`)

use std::sync::Arc;

use chorus_core::{
    ChannelObserver, ConversationEvent, ConversationSettings, SessionRequest, SessionResponse,
    validate_settings,
};
use chorus_voice::{
    ConversationIngress, ElevenLabsConfig, ElevenLabsSynthesizer, IngressPorts, PacedSynthesizer,
    PlaybackDriver, SendError, SpeechSynthesizer, TimedPlayback,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::CliError;
use crate::input::{HELP, InputCommand, parse_line};
use crate::parser::Cli;
use crate::presentation;
use crate::session::HttpSession;
use crate::transport::{self, WsEgress};

/// Where agent speech goes.
#[derive(Clone)]
pub enum VoiceBackend {
    /// No audio; lines are paced by their length.
    Silent,
    /// ElevenLabs synthesis.
    ElevenLabs { api_key: String },
}

impl std::fmt::Debug for VoiceBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Silent => f.write_str("Silent"),
            Self::ElevenLabs { .. } => f.write_str("ElevenLabs { api_key: <redacted> }"),
        }
    }
}

/// Bootstrap configuration for the CLI.
#[derive(Debug, Clone)]
pub struct CliConfig {
    /// Conversation server base URL.
    pub server: String,
    /// Body of the session request.
    pub session: SessionRequest,
    /// Coordinator settings (validated).
    pub settings: ConversationSettings,
    pub voice: VoiceBackend,
}

impl CliConfig {
    /// Build and validate the configuration from parsed flags.
    pub fn from_cli(cli: &Cli) -> Result<Self, CliError> {
        let settings = cli.settings();
        validate_settings(&settings)?;

        let voice = match (&cli.elevenlabs_api_key, cli.mute) {
            (_, true) => VoiceBackend::Silent,
            (Some(key), false) if !key.trim().is_empty() => VoiceBackend::ElevenLabs {
                api_key: key.trim().to_string(),
            },
            _ => {
                tracing::warn!("ELEVENLABS_API_KEY is not set, running without audio");
                VoiceBackend::Silent
            }
        };

        Ok(Self {
            server: cli.server.clone(),
            session: SessionRequest {
                mode: cli.mode,
                user_name: Some(settings.effective_user_name().to_string()),
                environment_type: cli.environment.clone(),
            },
            settings,
            voice,
        })
    }
}

/// Fully composed context for a conversation run.
pub struct CliContext {
    pub ingress: Arc<ConversationIngress>,
    pub session: Arc<HttpSession>,
    pub egress: Arc<WsEgress>,
    /// Roster returned when the session was created.
    pub roster: SessionResponse,
    events: mpsc::UnboundedReceiver<ConversationEvent>,
}

fn voice_ports(
    voice: &VoiceBackend,
) -> Result<(Arc<dyn SpeechSynthesizer>, Arc<dyn PlaybackDriver>), CliError> {
    match voice {
        VoiceBackend::Silent => Ok((
            Arc::new(PacedSynthesizer::new()),
            Arc::new(TimedPlayback::new()),
        )),
        VoiceBackend::ElevenLabs { api_key } => {
            let synthesizer = ElevenLabsSynthesizer::new(ElevenLabsConfig::new(api_key.clone()))?;
            Ok((Arc::new(synthesizer), output_device()?))
        }
    }
}

#[cfg(feature = "rodio")]
fn output_device() -> Result<Arc<dyn PlaybackDriver>, CliError> {
    Ok(Arc::new(chorus_voice::RodioPlayback::spawn()?))
}

#[cfg(not(feature = "rodio"))]
fn output_device() -> Result<Arc<dyn PlaybackDriver>, CliError> {
    tracing::warn!("Built without the `rodio` feature, speech will not be audible");
    Ok(Arc::new(TimedPlayback::new()))
}

/// Create the server session and compose the coordinator around it.
pub async fn bootstrap(config: CliConfig) -> Result<CliContext, CliError> {
    let session = Arc::new(HttpSession::new(&config.server, config.session)?);
    let roster = session.create().await?;

    let (synthesizer, playback) = voice_ports(&config.voice)?;
    let egress = Arc::new(WsEgress::new());
    let (observer, events) = ChannelObserver::new();

    let ports = IngressPorts::new(synthesizer, playback, Arc::clone(&egress) as _)
        .with_session(Arc::clone(&session) as _)
        .with_observer(Arc::new(observer));
    let ingress = Arc::new(ConversationIngress::new(ports, config.settings)?);

    Ok(CliContext {
        ingress,
        session,
        egress,
        roster,
        events,
    })
}

/// Run the conversation until the user quits or stdin closes.
pub async fn run(ctx: CliContext) -> Result<(), CliError> {
    let CliContext {
        ingress,
        session,
        egress,
        roster,
        events,
    } = ctx;

    presentation::print_roster(&roster);
    let url = session.ws_url()?;
    let cancel = CancellationToken::new();

    let renderer = tokio::spawn(presentation::run_renderer(events));
    let connection = tokio::spawn(transport::run(
        url,
        Arc::clone(&ingress),
        egress,
        cancel.clone(),
    ));

    let result = read_input(&ingress, &session).await;

    cancel.cancel();
    ingress.stop_speech();
    if let Err(e) = connection.await {
        tracing::warn!(error = %e, "Transport task ended abnormally");
    }
    renderer.abort();
    result
}

async fn read_input(ingress: &ConversationIngress, session: &HttpSession) -> Result<(), CliError> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let line = tokio::select! {
            _ = tokio::signal::ctrl_c() => return Ok(()),
            line = lines.next_line() => line?,
        };
        let Some(line) = line else {
            return Ok(());
        };

        match parse_line(&line) {
            InputCommand::Say(text) => match ingress.send_user_text(&text) {
                // The renderer reports blocked sends
                Ok(_) | Err(SendError::Blocked { .. }) => {}
                Err(e) => println!("({e})"),
            },
            InputCommand::Reset => {
                if let Err(e) = ingress.reset().await {
                    println!("(server reset failed: {e})");
                }
            }
            InputCommand::Status => print_status(ingress, session),
            InputCommand::Skip => ingress.stop_speech(),
            InputCommand::Help => println!("{HELP}"),
            InputCommand::Quit => return Ok(()),
            InputCommand::Empty => {}
            InputCommand::Unknown(command) => println!("(unknown command {command}, try /help)"),
        }
    }
}

fn print_status(ingress: &ConversationIngress, session: &HttpSession) {
    let queue = ingress.queue_status();
    println!(
        "session {} | {} | {} | playing: {} | queued: {} | messages: {}",
        session.session_id().as_deref().unwrap_or("-"),
        if ingress.is_connected() {
            "connected"
        } else {
            "disconnected"
        },
        ingress.turn_state(),
        queue.is_playing,
        queue.queue_length,
        ingress.store().len(),
    );
}
