//! Observer trait for conversation events.
//!
//! The coordinator receives an observer at construction instead of reaching
//! for ambient global state. Implementations handle delivery details
//! (channels, terminal rendering, UI bridges).

use tokio::sync::mpsc;

use crate::events::ConversationEvent;

/// Sink for [`ConversationEvent`]s.
///
/// # Implementations
///
/// - [`NoopObserver`] - for tests and contexts without a listener
/// - [`ChannelObserver`] - forwards into an unbounded tokio channel
pub trait ConversationObserver: Send + Sync {
    /// Deliver an event.
    ///
    /// Called from inside the coordinator's callbacks, some of them under the
    /// speech queue's lock. Must not block, and must not call back into the
    /// coordinator (queue status, sends, reset); hand the event off instead.
    fn emit(&self, event: ConversationEvent);
}

/// An observer that discards everything.
#[derive(Debug, Clone, Default)]
pub struct NoopObserver;

impl NoopObserver {
    pub const fn new() -> Self {
        Self
    }
}

impl ConversationObserver for NoopObserver {
    fn emit(&self, _event: ConversationEvent) {}
}

/// An observer that forwards events into an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    tx: mpsc::UnboundedSender<ConversationEvent>,
}

impl ChannelObserver {
    /// Create the observer and the receiving end.
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ConversationEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl ConversationObserver for ChannelObserver {
    fn emit(&self, event: ConversationEvent) {
        if self.tx.send(event).is_err() {
            tracing::trace!("Conversation event receiver dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tokio_test::{assert_pending, assert_ready_eq, task};

    use super::*;
    use crate::domain::TurnState;

    #[test]
    fn noop_observer_accepts_events() {
        let observer: Arc<dyn ConversationObserver> = Arc::new(NoopObserver::new());
        observer.emit(ConversationEvent::ConversationReset);
    }

    #[test]
    fn channel_observer_forwards_in_order() {
        let (observer, mut rx) = ChannelObserver::new();
        observer.emit(ConversationEvent::turn_changed(TurnState::UserMayRespond));
        observer.emit(ConversationEvent::ConversationReset);

        assert_eq!(
            rx.try_recv().unwrap(),
            ConversationEvent::turn_changed(TurnState::UserMayRespond)
        );
        assert_eq!(rx.try_recv().unwrap(), ConversationEvent::ConversationReset);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn channel_observer_wakes_waiting_receiver() {
        let (observer, mut rx) = ChannelObserver::new();
        let mut recv = task::spawn(rx.recv());
        assert_pending!(recv.poll());

        observer.emit(ConversationEvent::ConversationReset);

        assert!(recv.is_woken());
        assert_ready_eq!(recv.poll(), Some(ConversationEvent::ConversationReset));
    }

    #[test]
    fn channel_observer_survives_dropped_receiver() {
        let (observer, rx) = ChannelObserver::new();
        drop(rx);
        observer.emit(ConversationEvent::ConversationReset);
    }
}
