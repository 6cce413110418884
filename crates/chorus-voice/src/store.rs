//! Conversation transcript.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chorus_core::DisplayMessage;

/// Append-only (until reset) list of messages shown to the human.
///
/// Cloning shares the underlying list.
#[derive(Debug, Clone, Default)]
pub struct MessageStore {
    messages: Arc<RwLock<Vec<DisplayMessage>>>,
}

impl MessageStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message and return its position.
    pub fn append(&self, message: DisplayMessage) -> usize {
        let mut messages = self.write();
        messages.push(message);
        messages.len() - 1
    }

    /// Copy of every message, oldest first.
    #[must_use]
    pub fn snapshot(&self) -> Vec<DisplayMessage> {
        self.read().clone()
    }

    #[must_use]
    pub fn last(&self) -> Option<DisplayMessage> {
        self.read().last().cloned()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn clear(&self) {
        self.write().clear();
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<DisplayMessage>> {
        self.messages.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<DisplayMessage>> {
        self.messages.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_and_clear() {
        let store = MessageStore::new();
        assert!(store.is_empty());

        assert_eq!(store.append(DisplayMessage::agent("Sarah", "Hi")), 0);
        assert_eq!(store.append(DisplayMessage::user("Sam", "Hello")), 1);
        assert_eq!(store.len(), 2);
        assert_eq!(store.last().map(|m| m.text), Some("Hello".to_string()));

        let shared = store.clone();
        shared.clear();
        assert!(store.is_empty());
    }
}
