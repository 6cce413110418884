//! CLI-specific error types and exit codes.

use chorus_core::{SettingsError, TransportError};
use chorus_voice::VoiceError;
use thiserror::Error;

/// CLI-specific error type.
#[derive(Debug, Error)]
pub enum CliError {
    /// Invalid flag or environment value.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Session could not be created or reset.
    #[error("Session error: {0}")]
    Session(String),

    /// WebSocket or HTTP transport failure.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Audio backend could not be set up.
    #[error("Audio error: {0}")]
    Audio(String),

    /// Terminal I/O failure.
    #[error("IO error: {0}")]
    Io(String),
}

impl CliError {
    /// Map error to an exit code (sysexits.h conventions).
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => 78,    // EX_CONFIG
            Self::Session(_) => 69,   // EX_UNAVAILABLE
            Self::Transport(_) => 76, // EX_PROTOCOL
            Self::Audio(_) => 71,     // EX_OSERR
            Self::Io(_) => 74,        // EX_IOERR
        }
    }
}

impl From<SettingsError> for CliError {
    fn from(err: SettingsError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<TransportError> for CliError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Session(msg) => Self::Session(msg),
            other => Self::Transport(other.to_string()),
        }
    }
}

impl From<VoiceError> for CliError {
    fn from(err: VoiceError) -> Self {
        Self::Audio(err.to_string())
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
