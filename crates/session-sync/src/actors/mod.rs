//! Actor model for the session synchronizer.
//!
//! ```text
//! SynchronizerActor (one per session)
//! ├── owns ParticipantRegistry (nodes, tracks, layout, dominant pointer)
//! ├── owns ReactionDecay (one expiry per participant)
//! ├── consumes SessionEvents from the provider
//! └── serves SynchronizerHandles (mpsc mailbox, oneshot replies)
//! ```
//!
//! # Modules
//!
//! - [`synchronizer`] - `SynchronizerActor` and its handle
//! - [`messages`] - Commands, state snapshots and UI updates

pub mod messages;
pub mod synchronizer;

// Re-export primary types
pub use messages::*;
pub use synchronizer::{SessionEnvironment, SessionRuntime, SynchronizerActor, SynchronizerHandle};
