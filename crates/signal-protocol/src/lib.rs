//! Signaling protocol for the Huddle side channel.
//!
//! Messages are JSON objects discriminated by an `action` field:
//!
//! ```text
//! {"action":"reaction","reaction":"👍"}
//! {"action":"mute","participantSid":"PA..."}
//! {"action":"unmute","participantSid":"PA..."}
//! ```
//!
//! The side channel is lossy and best-effort. Decoding reports malformed
//! payloads as [`codec::CodecError`] so the receiver can count and drop them.

#![warn(clippy::pedantic)]

pub mod codec;
pub mod signal;
pub mod vocabulary;

pub use codec::{decode_signal, encode_signal, CodecError};
pub use signal::{MuteAction, SignalMessage};
pub use vocabulary::ReactionVocabulary;
