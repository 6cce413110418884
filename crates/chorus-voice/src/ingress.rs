//! Conversation coordinator - the single entry point for server events and
//! human input.
//!
//! `ConversationIngress` owns the [`SpeechQueue`], the [`TurnTaking`] gate
//! and the [`MessageStore`], and is the only component that drives them:
//!
//! - an agent line is queued for speech and only appears in the transcript
//!   once its audio starts;
//! - a human line is accepted only when the gate is open;
//! - `reset()` silences everything, empties the transcript and asks the
//!   session collaborator to start over.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use chorus_core::{
    AgentMessage, ClientMessage, ConversationEvent, ConversationObserver, ConversationSettings,
    DisplayMessage, FailureFallback, NoopObserver, NoopSession, ServerMessage, SessionLifecycle,
    SettingsError, SpeechRequestId, TransportEgress, TransportError, TurnState,
    validate_settings,
};

use crate::audio_io::PlaybackDriver;
use crate::backend::SpeechSynthesizer;
use crate::error::{SendError, VoiceError};
use crate::queue::{QueueConfig, QueueStatus, SpeechCallbacks, SpeechQueue, SpeechRequest};
use crate::store::MessageStore;
use crate::text_utils;
use crate::turn::TurnTaking;

/// Collaborators injected into [`ConversationIngress`].
pub struct IngressPorts {
    pub synthesizer: Arc<dyn SpeechSynthesizer>,
    pub playback: Arc<dyn PlaybackDriver>,
    pub egress: Arc<dyn TransportEgress>,
    pub session: Arc<dyn SessionLifecycle>,
    pub observer: Arc<dyn ConversationObserver>,
}

impl IngressPorts {
    /// Ports with a no-op session and observer.
    pub fn new(
        synthesizer: Arc<dyn SpeechSynthesizer>,
        playback: Arc<dyn PlaybackDriver>,
        egress: Arc<dyn TransportEgress>,
    ) -> Self {
        Self {
            synthesizer,
            playback,
            egress,
            session: Arc::new(NoopSession),
            observer: Arc::new(NoopObserver),
        }
    }

    #[must_use]
    pub fn with_session(mut self, session: Arc<dyn SessionLifecycle>) -> Self {
        self.session = session;
        self
    }

    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn ConversationObserver>) -> Self {
        self.observer = observer;
        self
    }
}

/// The agent line that is being prepared but not yet audible.
///
/// At most one exists at a time because the queue works on one request at a
/// time.
#[derive(Debug, Clone, Default)]
struct PendingDisplay(Arc<Mutex<Option<DisplayMessage>>>);

impl PendingDisplay {
    fn set(&self, message: DisplayMessage) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = Some(message);
    }

    fn take(&self) -> Option<DisplayMessage> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).take()
    }

    fn get(&self) -> Option<DisplayMessage> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

/// Coordinates speech, turn-taking and the transcript for one conversation.
pub struct ConversationIngress {
    queue: SpeechQueue,
    turn: TurnTaking,
    store: MessageStore,
    pending: PendingDisplay,
    egress: Arc<dyn TransportEgress>,
    session: Arc<dyn SessionLifecycle>,
    observer: Arc<dyn ConversationObserver>,
    settings: ConversationSettings,
    connected: AtomicBool,
}

impl ConversationIngress {
    /// Validate `settings` and start the speech queue.
    ///
    /// Must be called inside a tokio runtime.
    pub fn new(ports: IngressPorts, settings: ConversationSettings) -> Result<Self, SettingsError> {
        validate_settings(&settings)?;

        let IngressPorts {
            synthesizer,
            playback,
            egress,
            session,
            observer,
        } = ports;

        let queue = SpeechQueue::new(
            synthesizer,
            playback,
            Arc::clone(&observer),
            QueueConfig::from_settings(&settings),
        );
        let turn = TurnTaking::new(settings.effective_turn_policy(), Arc::clone(&observer));

        Ok(Self {
            queue,
            turn,
            store: MessageStore::new(),
            pending: PendingDisplay::default(),
            egress,
            session,
            observer,
            settings,
            connected: AtomicBool::new(false),
        })
    }

    // ── Server events ──────────────────────────────────────────────

    /// Route one inbound frame.
    pub fn handle_server_message(&self, message: ServerMessage) {
        match message {
            ServerMessage::AgentMessage(agent) => {
                self.handle_agent_message(agent);
            }
            ServerMessage::MessageReceived { content, .. } => {
                tracing::debug!(%content, "Server acknowledged message");
                self.observer.emit(ConversationEvent::ServerNotice {
                    kind: "message_received".into(),
                    content,
                });
            }
            ServerMessage::Error { content, .. } => {
                tracing::warn!(%content, "Server reported an error");
                let text = if content.trim().is_empty() {
                    "Server error".to_string()
                } else {
                    format!("Server error: {content}")
                };
                self.publish(DisplayMessage::system(text));
                self.observer.emit(ConversationEvent::ServerNotice {
                    kind: "error".into(),
                    content,
                });
            }
            ServerMessage::Pong { .. } => tracing::trace!("Pong"),
            ServerMessage::Unknown => tracing::debug!("Ignoring unknown server frame"),
        }
    }

    /// Queue an agent line for speech.
    ///
    /// Returns the request id, or `None` when the line has no text.
    pub fn handle_agent_message(&self, message: AgentMessage) -> Option<SpeechRequestId> {
        if message.message.trim().is_empty() {
            tracing::debug!(agent = %message.agent_name, "Ignoring empty agent message");
            return None;
        }

        let display = DisplayMessage::agent(
            message.agent_name.clone(),
            text_utils::display_text(&message.message),
        );
        let server_timestamp = message.parsed_timestamp();
        let display = match server_timestamp {
            Some(timestamp) => display.with_timestamp(timestamp),
            None => display,
        };

        let voice_id = self
            .settings
            .resolve_voice(message.voice_id.as_deref(), message.agent_gender)
            .to_owned();
        let callbacks = self.speech_callbacks(
            display,
            server_timestamp.is_none(),
            message.agent_name.clone(),
        );

        let request = SpeechRequest::new(message.message, voice_id, message.agent_name, callbacks);
        Some(self.queue.enqueue(request))
    }

    /// `stamp_on_start` re-stamps the line when it is shown; lines carrying
    /// a server timestamp keep it.
    fn speech_callbacks(
        &self,
        candidate: DisplayMessage,
        stamp_on_start: bool,
        speaker: String,
    ) -> SpeechCallbacks {
        let on_begin = {
            let pending = self.pending.clone();
            move || pending.set(candidate)
        };

        let on_start = {
            let pending = self.pending.clone();
            let store = self.store.clone();
            let observer = Arc::clone(&self.observer);
            let turn = self.turn.clone();
            move || {
                if let Some(message) = pending.take() {
                    let message = if stamp_on_start {
                        message.stamped_now()
                    } else {
                        message
                    };
                    publish(&store, observer.as_ref(), message);
                }
                turn.on_start(&speaker);
            }
        };

        let on_failed = {
            let pending = self.pending.clone();
            let store = self.store.clone();
            let observer = Arc::clone(&self.observer);
            let fallback = self.settings.effective_failure_fallback();
            move |error: &VoiceError| {
                let Some(message) = pending.take() else {
                    return;
                };
                match fallback {
                    FailureFallback::ShowText => {
                        tracing::debug!(%error, sender = %message.sender, "Showing text without audio");
                        let message = if stamp_on_start {
                            message.stamped_now()
                        } else {
                            message
                        };
                        publish(&store, observer.as_ref(), message);
                    }
                    FailureFallback::Skip => {
                        tracing::debug!(%error, sender = %message.sender, "Skipping agent turn");
                    }
                }
            }
        };

        let on_end = {
            let pending = self.pending.clone();
            let turn = self.turn.clone();
            move |status: QueueStatus| {
                pending.take();
                turn.on_end(status);
            }
        };

        SpeechCallbacks::new()
            .on_begin(on_begin)
            .on_start(on_start)
            .on_failed(on_failed)
            .on_end(on_end)
    }

    // ── Human input ────────────────────────────────────────────────

    /// Send a line typed by the human.
    ///
    /// On success the line is on its way to the server and already in the
    /// transcript.
    pub fn send_user_text(&self, text: &str) -> Result<DisplayMessage, SendError> {
        let content = text.trim();
        if content.is_empty() {
            return Err(SendError::EmptyMessage);
        }

        match self.turn.state() {
            TurnState::Idle => return Err(SendError::NotStarted),
            TurnState::AgentSpeaking(speaker) => {
                tracing::info!(%speaker, "Send blocked while agent is speaking");
                self.observer.emit(ConversationEvent::SendBlocked {
                    speaker: Some(speaker.clone()),
                });
                return Err(SendError::Blocked { speaker });
            }
            TurnState::UserMayRespond => {}
        }

        if !self.is_connected() {
            return Err(SendError::Disconnected);
        }

        let user_name = self.settings.effective_user_name();
        self.egress.send(ClientMessage::user(content, user_name))?;

        let message = DisplayMessage::user(user_name, content);
        self.publish(message.clone());
        tracing::debug!(chars = content.len(), "User message sent");
        Ok(message)
    }

    /// Keep-alive frame.
    pub fn ping(&self) -> Result<(), TransportError> {
        self.egress.send(ClientMessage::Ping)
    }

    // ── Lifecycle ──────────────────────────────────────────────────

    /// Silence all speech, clear the transcript and restart the session.
    ///
    /// The local state is reset even if the session restart fails.
    pub async fn reset(&self) -> Result<(), TransportError> {
        tracing::info!("Resetting conversation");
        self.turn.reset(&self.queue);
        self.pending.take();
        self.store.clear();
        self.observer.emit(ConversationEvent::ConversationReset);

        self.session.restart().await.inspect_err(|e| {
            tracing::warn!(error = %e, "Session restart failed");
        })
    }

    /// Interrupt current speech and drop anything queued.
    pub fn stop_speech(&self) {
        self.queue.stop();
    }

    /// The transport is up. Opens the conversation on first connect.
    pub fn mark_connected(&self) {
        if !self.connected.swap(true, Ordering::SeqCst) {
            tracing::info!("Connected to conversation server");
            self.observer
                .emit(ConversationEvent::ConnectionChanged { connected: true });
        }
        self.turn.open();
    }

    /// The transport went away. Sends fail until the next `mark_connected`.
    pub fn mark_disconnected(&self) {
        if self.connected.swap(false, Ordering::SeqCst) {
            tracing::warn!("Disconnected from conversation server");
            self.observer
                .emit(ConversationEvent::ConnectionChanged { connected: false });
        }
    }

    // ── Queries ────────────────────────────────────────────────────

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn turn(&self) -> &TurnTaking {
        &self.turn
    }

    #[must_use]
    pub fn turn_state(&self) -> TurnState {
        self.turn.state()
    }

    #[must_use]
    pub fn messages(&self) -> Vec<DisplayMessage> {
        self.store.snapshot()
    }

    #[must_use]
    pub fn store(&self) -> &MessageStore {
        &self.store
    }

    /// The agent line being synthesized right now, not yet shown.
    #[must_use]
    pub fn pending_display(&self) -> Option<DisplayMessage> {
        self.pending.get()
    }

    #[must_use]
    pub fn queue_status(&self) -> QueueStatus {
        self.queue.status()
    }

    #[must_use]
    pub fn settings(&self) -> &ConversationSettings {
        &self.settings
    }

    fn publish(&self, message: DisplayMessage) {
        publish(&self.store, self.observer.as_ref(), message);
    }
}

impl std::fmt::Debug for ConversationIngress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationIngress")
            .field("turn", &self.turn)
            .field("queue", &self.queue)
            .field("messages", &self.store.len())
            .field("connected", &self.is_connected())
            .finish_non_exhaustive()
    }
}

fn publish(store: &MessageStore, observer: &dyn ConversationObserver, message: DisplayMessage) {
    store.append(message.clone());
    observer.emit(ConversationEvent::message_appended(message));
}
