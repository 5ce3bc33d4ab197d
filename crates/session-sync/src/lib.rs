//! Session synchronization engine for Huddle.
//!
//! Keeps a client's view of a live room consistent with the remote session:
//!
//! - Participants joining and leaving, each rendered as one node
//! - Tracks published, subscribed, enabled and disabled, attached exactly once
//! - Reactions and remote mute requests carried on the data-track side channel
//! - Dominant-speaker highlight and the responsive grid
//!
//! # Architecture
//!
//! ```text
//! SessionProvider ──events──▶ SynchronizerActor ──▶ RenderTarget
//!                                │      ▲
//!                     SessionUpdates   SynchronizerHandle
//! ```
//!
//! All mutation happens on the actor task. Collaborators (provider, render
//! target, devices, side channel) are traits from `common::provider`, so the
//! engine runs against mocks in tests.
//!
//! # Modules
//!
//! - [`actors`] - Synchronizer actor, handle and message types
//! - [`registry`] - Participant registry
//! - [`track`] - Track lifecycle adapter
//! - [`reaction`] - Reaction decay timer
//! - [`layout`] - Grid layout
//! - [`device`] - Camera/microphone switching
//! - [`audio_level`] - Microphone level meter
//! - [`config`] - Configuration from environment
//! - [`errors`] - Error types

#![warn(clippy::pedantic)]

pub mod actors;
pub mod audio_level;
pub mod config;
pub mod device;
pub mod errors;
pub mod layout;
pub mod observability;
pub mod reaction;
pub mod registry;
pub mod track;
