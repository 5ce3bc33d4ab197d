//! Common error types for Huddle components.

use thiserror::Error;

/// Errors reported by the external collaborators a session depends on
/// (session provider, side channel, media devices).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// Establishing the session failed
    #[error("Connect failed: {0}")]
    Connect(String),

    /// The underlying transport reported an error
    #[error("Transport error: {0}")]
    Transport(String),

    /// A camera or microphone could not be acquired
    #[error("Device unavailable: {0}")]
    DeviceUnavailable(String),

    /// The resource has already been closed
    #[error("Closed")]
    Closed,
}

/// Result type alias using `ProviderError`
pub type Result<T> = std::result::Result<T, ProviderError>;
