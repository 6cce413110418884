//! Terminal client for chorus conversations.
//!
//! Creates a session on the conversation server, streams agent turns over
//! a WebSocket, voices them one at a time and lets the human answer when
//! the floor is open.

#![deny(unsafe_code)]
#![deny(unused_crate_dependencies)]

// Used by main.rs only
use anyhow as _;
use dotenvy as _;
use tracing_subscriber as _;

pub mod bootstrap;
pub mod error;
pub mod input;
pub mod parser;
pub mod presentation;
pub mod session;
pub mod transport;

pub use bootstrap::{CliConfig, CliContext, VoiceBackend, bootstrap, run};
pub use error::CliError;
pub use parser::Cli;
