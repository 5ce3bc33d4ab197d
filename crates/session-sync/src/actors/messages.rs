//! Message types for the synchronizer actor.
//!
//! Commands travel over `tokio::sync::mpsc`; replies use `tokio::sync::oneshot`.
//! Updates for the UI layer travel the other way on a bounded channel.

use crate::errors::SyncError;
use crate::layout::GridLayout;
use crate::reaction::ReactionOverlay;
use chrono::{DateTime, Utc};
use common::error::ProviderError;
use common::provider::LocalTrack;
use common::types::ParticipantId;
use serde::Serialize;
use signal_protocol::MuteAction;
use std::fmt;
use std::sync::Arc;
use tokio::sync::oneshot;

pub use crate::registry::{ParticipantInfo, TrackState};

/// Commands sent to the `SynchronizerActor`.
#[derive(Debug)]
pub enum SynchronizerMessage {
    /// Snapshot the session.
    GetState {
        respond_to: oneshot::Sender<SessionState>,
    },

    /// Broadcast a reaction on the side channel.
    SendReaction {
        symbol: String,
        respond_to: oneshot::Sender<Result<(), SyncError>>,
    },

    /// Ask a remote participant to mute or unmute.
    ///
    /// With `action: None` the action the target's mute control currently
    /// offers is sent.
    RequestMute {
        target: ParticipantId,
        action: Option<MuteAction>,
        /// Response channel with the action actually sent.
        respond_to: oneshot::Sender<Result<MuteAction, SyncError>>,
    },

    /// Publish a new local camera or microphone track in place of the
    /// current one.
    ReplaceLocalTrack {
        track: Arc<dyn LocalTrack>,
        respond_to: oneshot::Sender<Result<(), SyncError>>,
    },

    /// Leave the session. Answered once cleanup completed.
    Disconnect { respond_to: oneshot::Sender<()> },

    /// The hosting page is going away. `persisted` is set when the page is
    /// only being cached for back navigation, in which case the session is
    /// kept.
    PageTerminating { persisted: bool },
}

/// Lifecycle phase of a session.
///
/// A handle only exists once the provider accepted the connection, so a
/// session starts `Connected` and moves to `Disconnected` once; it is never
/// reconnected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Connected,
    Disconnected,
}

impl SessionPhase {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            SessionPhase::Connected => "connected",
            SessionPhase::Disconnected => "disconnected",
        }
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of a live session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionState {
    pub phase: SessionPhase,
    pub room_name: String,
    pub local_participant_id: ParticipantId,
    /// Participants in join order, local first.
    pub participants: Vec<ParticipantInfo>,
    pub layout: GridLayout,
    pub dominant_speaker: Option<ParticipantId>,
    pub connected_at: DateTime<Utc>,
}

/// Changes published to the UI layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionUpdate {
    /// A participant was added to the registry.
    ParticipantAdded(ParticipantInfo),

    /// A participant was removed from the registry.
    ParticipantRemoved(ParticipantId),

    /// The grid was recomputed after a membership change.
    LayoutChanged(GridLayout),

    /// The dominant-speaker highlight moved; `None` when it was cleared
    /// because the new holder has not joined yet.
    DominantSpeakerChanged(Option<ParticipantId>),

    /// A participant's muted indicator changed.
    MuteChanged {
        participant_id: ParticipantId,
        muted: bool,
    },

    /// The local microphone was enabled or disabled by a remote request.
    LocalAudioChanged { enabled: bool },

    /// A participant's reaction overlay changed (empty on expiry).
    ReactionChanged {
        participant_id: ParticipantId,
        reaction: ReactionOverlay,
    },

    /// The session ended. Always the last update, sent after cleanup.
    Disconnected { error: Option<ProviderError> },
}
