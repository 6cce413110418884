//! Terminal rendering of conversation events.
//!
//! Format-only: every event maps to at most one line of text. Messages
//! appear when the store publishes them, so agent lines print at the moment
//! their audio starts.

use chorus_core::{ConversationEvent, DisplayMessage, MessageKind, SessionResponse, TurnState};
use tokio::sync::mpsc;

/// Render one message as a transcript line.
#[must_use]
pub fn format_message(message: &DisplayMessage) -> String {
    let time = message.timestamp.format("%H:%M:%S");
    match message.kind {
        MessageKind::User => format!("[{time}] you: {}", message.text),
        MessageKind::Agent => format!("[{time}] {}: {}", message.sender, message.text),
        MessageKind::System => format!("[{time}] * {}", message.text),
    }
}

/// Render an event, or `None` for events that stay silent.
#[must_use]
pub fn render(event: &ConversationEvent) -> Option<String> {
    match event {
        ConversationEvent::MessageAppended { message } => Some(format_message(message)),
        ConversationEvent::TurnChanged {
            state: TurnState::UserMayRespond,
        } => Some("-- your turn --".to_string()),
        ConversationEvent::SendBlocked { speaker } => Some(match speaker {
            Some(name) => format!("(wait, {name} is still speaking)"),
            None => "(wait, an agent is still speaking)".to_string(),
        }),
        ConversationEvent::SpeechFailed { speaker, error, .. } => {
            Some(format!("(could not voice {speaker}: {error})"))
        }
        ConversationEvent::ConversationReset => Some("-- conversation reset --".to_string()),
        ConversationEvent::ConnectionChanged { connected: false } => {
            Some("(disconnected, retrying)".to_string())
        }
        ConversationEvent::ConnectionChanged { connected: true } => {
            Some("(connected)".to_string())
        }
        ConversationEvent::TurnChanged { .. }
        | ConversationEvent::SpeechQueued { .. }
        | ConversationEvent::SpeechStarted { .. }
        | ConversationEvent::SpeechFinished { .. }
        | ConversationEvent::ServerNotice { .. } => None,
    }
}

/// Print the session roster.
pub fn print_roster(session: &SessionResponse) {
    println!("Session {} ({})", session.session_id, session.mode);
    for agent in &session.agents {
        match &agent.persona {
            Some(persona) => println!("  {} ({persona}, {})", agent.name, agent.gender),
            None => println!("  {} ({})", agent.name, agent.gender),
        }
    }
    println!("Type /help for commands.");
}

/// Print rendered events until the channel closes.
pub async fn run_renderer(mut events: mpsc::UnboundedReceiver<ConversationEvent>) {
    while let Some(event) = events.recv().await {
        if let Some(line) = render(&event) {
            println!("{line}");
        }
    }
}
