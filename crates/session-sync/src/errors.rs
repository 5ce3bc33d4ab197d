//! Session synchronizer error types.
//!
//! Malformed inbound signals are never surfaced as errors; they are counted
//! and dropped by the synchronizer. Everything here is reported to the caller.

use common::error::ProviderError;
use thiserror::Error;

/// Session synchronizer error type.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Establishing the session failed; nothing was retained.
    #[error("Connection failed: {0}")]
    Connection(ProviderError),

    /// The synchronizer is not (or no longer) connected.
    #[error("Session is not connected")]
    NotConnected,

    /// Participant not found in the registry.
    #[error("Participant not found: {0}")]
    ParticipantNotFound(String),

    /// Reaction symbol is not part of the configured vocabulary.
    #[error("Unknown reaction: {0}")]
    UnknownReaction(String),

    /// The request cannot target this participant.
    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    /// Side channel unavailable or send failed.
    #[error("Side channel error: {0}")]
    SideChannel(String),

    /// Camera/microphone acquisition failed; the previous track is kept.
    #[error("Device error: {0}")]
    Device(ProviderError),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl SyncError {
    /// Whether constructing a new synchronizer and trying again can succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, SyncError::Connection(_))
    }

    /// Returns a user-facing message (no provider details).
    #[must_use]
    pub fn client_message(&self) -> String {
        match self {
            SyncError::Connection(_) => "Could not join the room, please try again".to_string(),
            SyncError::NotConnected => "You are not connected to a room".to_string(),
            SyncError::ParticipantNotFound(_) => "Participant not found".to_string(),
            SyncError::UnknownReaction(_) => "That reaction is not available".to_string(),
            SyncError::InvalidTarget(msg) => msg.clone(),
            SyncError::SideChannel(_) => "Could not send, please try again".to_string(),
            SyncError::Device(_) => "Could not switch device".to_string(),
            SyncError::Config(_) | SyncError::Internal(_) => {
                "An internal error occurred".to_string()
            }
        }
    }
}
