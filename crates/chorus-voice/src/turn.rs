//! Turn-taking gate - decides whether the human may send a message.
//!
//! Agents speak one at a time through the [`SpeechQueue`]. While one is
//! audible the human's input is held back so replies are never sent into
//! the middle of someone else's sentence. The state is shared through a
//! `tokio::sync::watch` channel so any number of readers can observe it.
//!
//! Only the coordinator drives transitions. The writers are crate-private;
//! everything outside this crate gets read access.

use std::sync::Arc;

use chorus_core::{ConversationEvent, ConversationObserver, TurnPolicy, TurnState};
use tokio::sync::watch;

use crate::queue::{QueueStatus, SpeechQueue};

/// Shared turn state. Cheap to clone; all clones see the same state.
#[derive(Clone)]
pub struct TurnTaking {
    inner: Arc<Inner>,
}

struct Inner {
    state: watch::Sender<TurnState>,
    policy: TurnPolicy,
    observer: Arc<dyn ConversationObserver>,
}

impl TurnTaking {
    pub(crate) fn new(policy: TurnPolicy, observer: Arc<dyn ConversationObserver>) -> Self {
        let (state, _) = watch::channel(TurnState::Idle);
        Self {
            inner: Arc::new(Inner {
                state,
                policy,
                observer,
            }),
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> TurnState {
        self.inner.state.borrow().clone()
    }

    /// Whether a user message would be accepted right now.
    #[must_use]
    pub fn may_send(&self) -> bool {
        self.inner.state.borrow().may_send()
    }

    /// Name of the agent currently speaking, if any.
    #[must_use]
    pub fn speaker(&self) -> Option<String> {
        self.inner.state.borrow().speaker().map(str::to_owned)
    }

    #[must_use]
    pub fn policy(&self) -> TurnPolicy {
        self.inner.policy
    }

    /// Watch for state changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<TurnState> {
        self.inner.state.subscribe()
    }

    /// The conversation has begun. Only leaves `Idle`.
    pub(crate) fn open(&self) {
        if matches!(*self.inner.state.borrow(), TurnState::Idle) {
            self.transition(TurnState::UserMayRespond);
        }
    }

    /// `speaker` became audible.
    pub(crate) fn on_start(&self, speaker: &str) {
        self.transition(TurnState::AgentSpeaking(speaker.to_owned()));
    }

    /// The active speech item ended (finished, failed or cancelled).
    pub(crate) fn on_end(&self, status: QueueStatus) {
        let hold = matches!(self.inner.policy, TurnPolicy::HoldWhileQueued)
            && status.queue_length > 0
            && matches!(*self.inner.state.borrow(), TurnState::AgentSpeaking(_));
        if hold {
            tracing::debug!(
                queued = status.queue_length,
                "Holding turn: more speech queued"
            );
            return;
        }
        self.transition(TurnState::UserMayRespond);
    }

    /// Silence everything and hand the floor back to the human.
    pub(crate) fn reset(&self, queue: &SpeechQueue) {
        queue.stop();
        self.transition(TurnState::UserMayRespond);
    }

    fn transition(&self, next: TurnState) {
        let mut previous = None;
        let changed = self.inner.state.send_if_modified(|state| {
            if *state == next {
                return false;
            }
            previous = Some(std::mem::replace(state, next.clone()));
            true
        });

        if changed {
            tracing::debug!(from = ?previous, to = %next, "Turn state changed");
            self.inner.observer.emit(ConversationEvent::turn_changed(next));
        }
    }
}

impl std::fmt::Debug for TurnTaking {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TurnTaking")
            .field("state", &*self.inner.state.borrow())
            .field("policy", &self.inner.policy)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use chorus_core::{ChannelObserver, NoopObserver};
    use tokio_test::{assert_pending, assert_ready_ok, task};

    use super::*;

    fn turn(policy: TurnPolicy) -> TurnTaking {
        TurnTaking::new(policy, Arc::new(NoopObserver))
    }

    const fn status(queue_length: usize) -> QueueStatus {
        QueueStatus {
            is_playing: false,
            queue_length,
        }
    }

    #[test]
    fn starts_idle_and_closed() {
        let turn = turn(TurnPolicy::default());
        assert_eq!(turn.state(), TurnState::Idle);
        assert!(!turn.may_send());
    }

    #[test]
    fn open_only_leaves_idle() {
        let turn = turn(TurnPolicy::default());
        turn.open();
        assert_eq!(turn.state(), TurnState::UserMayRespond);

        turn.on_start("Sarah");
        turn.open();
        assert_eq!(turn.state(), TurnState::AgentSpeaking("Sarah".into()));
    }

    #[test]
    fn speaking_blocks_then_reopens() {
        let turn = turn(TurnPolicy::ReopenBetweenItems);
        turn.open();

        turn.on_start("Sarah");
        assert!(!turn.may_send());
        assert_eq!(turn.speaker().as_deref(), Some("Sarah"));

        turn.on_end(status(1));
        assert!(turn.may_send());
    }

    #[test]
    fn hold_policy_keeps_floor_while_queued() {
        let turn = turn(TurnPolicy::HoldWhileQueued);
        turn.open();
        turn.on_start("Sarah");

        turn.on_end(status(2));
        assert_eq!(turn.state(), TurnState::AgentSpeaking("Sarah".into()));

        turn.on_start("Alex");
        turn.on_end(status(0));
        assert_eq!(turn.state(), TurnState::UserMayRespond);
    }

    #[test]
    fn end_from_idle_opens_the_floor() {
        let turn = turn(TurnPolicy::HoldWhileQueued);
        turn.on_end(status(3));
        assert_eq!(turn.state(), TurnState::UserMayRespond);
    }

    #[test]
    fn only_real_changes_are_emitted() {
        let (observer, mut rx) = ChannelObserver::new();
        let turn = TurnTaking::new(TurnPolicy::default(), Arc::new(observer));

        turn.open();
        turn.open();
        turn.on_end(status(0));
        turn.on_start("Sarah");

        let mut states = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let ConversationEvent::TurnChanged { state } = event {
                states.push(state);
            }
        }
        assert_eq!(
            states,
            vec![
                TurnState::UserMayRespond,
                TurnState::AgentSpeaking("Sarah".into())
            ]
        );
    }

    #[test]
    fn subscribers_wake_on_real_transitions_only() {
        let turn = turn(TurnPolicy::default());
        let mut rx = turn.subscribe();

        {
            let mut changed = task::spawn(rx.changed());
            assert_pending!(changed.poll());
            turn.open();
            assert!(changed.is_woken());
            assert_ready_ok!(changed.poll());
        }
        assert_eq!(*rx.borrow_and_update(), TurnState::UserMayRespond);

        let mut changed = task::spawn(rx.changed());
        turn.open();
        assert!(!changed.is_woken());
        assert_pending!(changed.poll());
    }
}
