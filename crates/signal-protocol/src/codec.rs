//! Codec for encoding and decoding signal messages.

use crate::signal::SignalMessage;
use bytes::Bytes;
use serde_json::Value;

/// Actions this codec understands
const KNOWN_ACTIONS: [&str; 3] = ["reaction", "mute", "unmute"];

/// Error type for codec operations
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CodecError {
    /// Payload is not a JSON object, or a field has the wrong shape
    #[error("Malformed payload: {0}")]
    Malformed(String),

    /// A required field is absent
    #[error("Missing field: {0}")]
    MissingField(&'static str),

    /// `action` is not one this codec understands
    #[error("Unknown action: {0}")]
    UnknownAction(String),

    /// Serialization failed
    #[error("Encode failed: {0}")]
    Encode(String),
}

impl CodecError {
    /// Bounded reason label for drop metrics
    #[must_use]
    pub const fn reason(&self) -> &'static str {
        match self {
            CodecError::Malformed(_) => "malformed",
            CodecError::MissingField(_) => "missing_field",
            CodecError::UnknownAction(_) => "unknown_action",
            CodecError::Encode(_) => "encode",
        }
    }
}

/// Encode a signal message to bytes
///
/// # Errors
///
/// Returns an error if serialization fails
pub fn encode_signal(message: &SignalMessage) -> Result<Bytes, CodecError> {
    serde_json::to_vec(message)
        .map(Bytes::from)
        .map_err(|e| CodecError::Encode(e.to_string()))
}

/// Decode a signal message from bytes
///
/// Reaction symbols are not checked here; vocabulary filtering is the
/// receiver's concern.
///
/// # Errors
///
/// Returns an error if the payload is not valid JSON, has no `action`, names
/// an unknown action, or lacks the action's fields
pub fn decode_signal(data: &[u8]) -> Result<SignalMessage, CodecError> {
    let value: Value =
        serde_json::from_slice(data).map_err(|e| CodecError::Malformed(e.to_string()))?;

    let Value::Object(fields) = &value else {
        return Err(CodecError::Malformed("expected a JSON object".to_string()));
    };

    let action = match fields.get("action") {
        None | Some(Value::Null) => return Err(CodecError::MissingField("action")),
        Some(Value::String(action)) => action.as_str(),
        Some(_) => return Err(CodecError::Malformed("action must be a string".to_string())),
    };

    if !KNOWN_ACTIONS.contains(&action) {
        return Err(CodecError::UnknownAction(action.to_string()));
    }

    let required = if action == "reaction" {
        "reaction"
    } else {
        "participantSid"
    };
    if !fields.contains_key(required) {
        return Err(CodecError::MissingField(required));
    }

    serde_json::from_value(value).map_err(|e| CodecError::Malformed(e.to_string()))
}
