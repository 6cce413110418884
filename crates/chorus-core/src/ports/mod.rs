//! Port definitions (trait abstractions) for external collaborators.
//!
//! Ports define the interfaces the coordinator expects from infrastructure.
//! They contain no implementation details and use only domain types.
//!
//! # Design Rules
//!
//! - No WebSocket, HTTP or audio types in any signature
//! - Observers never block; they buffer or drop
//! - Egress is fire-and-forget from the caller's point of view

pub mod observer;
pub mod transport;

pub use observer::{ChannelObserver, ConversationObserver, NoopObserver};
pub use transport::{NoopSession, SessionLifecycle, TransportEgress, TransportError};
