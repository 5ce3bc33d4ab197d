//! Interfaces to the environment a session runs in.
//!
//! The session engine never talks to a transport, a device or a UI toolkit
//! directly. It consumes:
//!
//! - a [`SessionProvider`] that connects and then delivers [`SessionEvent`]s
//! - a [`SideChannel`] for the low-bandwidth signaling protocol
//! - [`LocalTrack`]s and [`MediaDevices`] for the local camera/microphone
//!
//! and writes to exactly one [`RenderTarget`] container.

use crate::error::ProviderError;
use crate::secret::SecretString;
use crate::types::{ElementId, NodeId, ParticipantId, TrackId, TrackKind};
use async_trait::async_trait;
use bytes::Bytes;
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Options passed to the provider on connect.
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    /// Room to join.
    pub room_name: String,
    /// Ask the provider to emit dominant-speaker events.
    pub dominant_speaker: bool,
    /// Local tracks to publish on connect.
    pub local_tracks: Vec<TrackInfo>,
}

/// A subscribed (media-carrying) track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackInfo {
    /// Track identifier.
    pub id: TrackId,
    /// Track kind.
    pub kind: TrackKind,
    /// Whether the track is currently enabled (unmuted).
    pub enabled: bool,
}

/// A track publication as announced by a participant.
///
/// `track` is present when media is already subscribed at announcement time
/// (late-join case); otherwise it arrives later via
/// [`SessionEvent::TrackSubscribed`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackPublication {
    /// Identifier of the published track.
    pub track_id: TrackId,
    /// Track kind.
    pub kind: TrackKind,
    /// The live track, if already subscribed.
    pub track: Option<TrackInfo>,
}

/// A participant as enumerated by the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantSnapshot {
    /// Participant identifier.
    pub id: ParticipantId,
    /// Human-readable identity.
    pub identity: String,
    /// Publications known at enumeration time.
    pub publications: Vec<TrackPublication>,
}

/// Session-level and participant-level events, keyed by participant id.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// A remote participant connected.
    ParticipantJoined(ParticipantSnapshot),
    /// A remote participant disconnected.
    ParticipantLeft(ParticipantId),
    /// A participant published a track.
    TrackPublished {
        participant_id: ParticipantId,
        publication: TrackPublication,
    },
    /// A participant unpublished a track.
    TrackUnpublished {
        participant_id: ParticipantId,
        track_id: TrackId,
    },
    /// Media for a publication became available.
    TrackSubscribed {
        participant_id: ParticipantId,
        track: TrackInfo,
    },
    /// Media for a publication went away.
    TrackUnsubscribed {
        participant_id: ParticipantId,
        track_id: TrackId,
    },
    /// A track was enabled (unmuted) at its source.
    TrackEnabled {
        participant_id: ParticipantId,
        track_id: TrackId,
    },
    /// A track was disabled (muted) at its source.
    TrackDisabled {
        participant_id: ParticipantId,
        track_id: TrackId,
    },
    /// The dominant speaker changed; `None` means nobody is dominant.
    DominantSpeakerChanged(Option<ParticipantId>),
    /// A message arrived on a participant's data track.
    Message {
        participant_id: ParticipantId,
        track_id: TrackId,
        payload: Bytes,
    },
    /// The session ended, optionally with an error.
    Disconnected(Option<ProviderError>),
}

impl SessionEvent {
    /// Returns the event name for log fields and metric labels.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            SessionEvent::ParticipantJoined(_) => "participant_joined",
            SessionEvent::ParticipantLeft(_) => "participant_left",
            SessionEvent::TrackPublished { .. } => "track_published",
            SessionEvent::TrackUnpublished { .. } => "track_unpublished",
            SessionEvent::TrackSubscribed { .. } => "track_subscribed",
            SessionEvent::TrackUnsubscribed { .. } => "track_unsubscribed",
            SessionEvent::TrackEnabled { .. } => "track_enabled",
            SessionEvent::TrackDisabled { .. } => "track_disabled",
            SessionEvent::DominantSpeakerChanged(_) => "dominant_speaker_changed",
            SessionEvent::Message { .. } => "message",
            SessionEvent::Disconnected(_) => "disconnected",
        }
    }
}

/// Result of a successful connect.
pub struct ConnectedSession {
    /// The local participant.
    pub local: ParticipantSnapshot,
    /// Remote participants already present at connect time.
    pub participants: Vec<ParticipantSnapshot>,
    /// Event stream for everything that happens after connect.
    pub events: mpsc::Receiver<SessionEvent>,
    /// Control surface for the live session.
    pub control: Box<dyn SessionControl>,
}

impl fmt::Debug for ConnectedSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectedSession")
            .field("local", &self.local.id)
            .field("participants", &self.participants.len())
            .finish_non_exhaustive()
    }
}

/// Establishes sessions.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// Connect to a room.
    async fn connect(
        &self,
        credential: &SecretString,
        options: &ConnectOptions,
    ) -> Result<ConnectedSession, ProviderError>;
}

/// Control surface of a connected session.
pub trait SessionControl: Send {
    /// Ask the provider to end the session. The provider answers with
    /// [`SessionEvent::Disconnected`].
    fn disconnect(&self);

    /// Publish a local track to the room.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider rejects the publication.
    fn publish_track(&self, track: &TrackInfo) -> Result<(), ProviderError>;

    /// Stop publishing a local track. No-op if it is not published.
    fn unpublish_track(&self, track_id: &TrackId);
}

/// Best-effort, unordered message transport scoped to the session.
pub trait SideChannel: Send + Sync {
    /// Send a payload to every other participant.
    fn send(&self, payload: Bytes) -> Result<(), ProviderError>;
}

/// A camera, microphone or data track owned by the local participant.
pub trait LocalTrack: Send + Sync + fmt::Debug {
    /// Track identifier.
    fn id(&self) -> TrackId;
    /// Track kind.
    fn kind(&self) -> TrackKind;
    /// Whether the track is currently enabled.
    fn is_enabled(&self) -> bool;
    /// Enable (unmute) the track.
    fn enable(&self);
    /// Disable (mute) the track.
    fn disable(&self);
    /// Release the underlying device.
    fn stop(&self);

    /// Snapshot of this track for publication and rendering.
    fn info(&self) -> TrackInfo {
        TrackInfo {
            id: self.id(),
            kind: self.kind(),
            enabled: self.is_enabled(),
        }
    }
}

/// Acquires new local tracks from physical devices.
#[async_trait]
pub trait MediaDevices: Send + Sync {
    /// Create a track of `kind` bound to the given device.
    async fn create_track(
        &self,
        kind: TrackKind,
        device_id: &str,
    ) -> Result<Arc<dyn LocalTrack>, ProviderError>;
}

/// The single UI container the engine renders into.
///
/// The engine is the only writer of participant nodes within it.
pub trait RenderTarget: Send {
    /// Create a participant node.
    fn create_node(&mut self, participant_id: &ParticipantId, is_local: bool) -> NodeId;
    /// Delete a participant node and everything inside it.
    fn remove_node(&mut self, node: NodeId);
    /// Render a media track into a node; returns the elements produced.
    fn attach_track(&mut self, node: NodeId, track: &TrackInfo) -> Vec<ElementId>;
    /// Remove one element previously returned by `attach_track`.
    fn remove_element(&mut self, element: ElementId);
    /// Set the `--grid-rows` / `--grid-columns` layout properties.
    fn set_grid(&mut self, rows: u32, columns: u32);
    /// Toggle the dominant-speaker highlight on a node.
    fn set_dominant(&mut self, node: NodeId, dominant: bool);
    /// Toggle the muted indicator (and the remote mute control label).
    fn set_muted(&mut self, node: NodeId, muted: bool);
    /// Show a reaction overlay, or clear it with `None`.
    fn set_reaction(&mut self, node: NodeId, symbol: Option<&str>, intensity: u8);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_names_are_stable() {
        assert_eq!(
            SessionEvent::ParticipantLeft(ParticipantId::new("PA1")).name(),
            "participant_left"
        );
        assert_eq!(
            SessionEvent::DominantSpeakerChanged(None).name(),
            "dominant_speaker_changed"
        );
        assert_eq!(SessionEvent::Disconnected(None).name(), "disconnected");
    }
}
