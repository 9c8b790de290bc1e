//! Error types for the lobby client

use thiserror::Error;

/// Result type for lobby operations
pub type Result<T> = std::result::Result<T, LobbyError>;

/// Lobby error types
#[derive(Debug, Error)]
pub enum LobbyError {
    /// Transport failed to open, read or write
    #[error("Transport error: {0}")]
    Transport(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// No open transport to send on
    #[error("Not connected")]
    NotConnected,

    /// The server reported that the requested lobby does not exist
    #[error("Lobby not found")]
    LobbyNotFound,
}

impl From<serde_json::Error> for LobbyError {
    fn from(err: serde_json::Error) -> Self {
        LobbyError::Serialization(err.to_string())
    }
}
