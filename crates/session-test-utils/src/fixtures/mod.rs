//! Pre-configured participant fixtures.
//!
//! Identifiers are derived from the fixture name so tests can refer to them
//! without threading values around:
//! - participant: `PA-<name>`
//! - tracks: `MT-<name>-audio`, `MT-<name>-video`, `MT-<name>-data`

use common::provider::{ParticipantSnapshot, TrackInfo, TrackPublication};
use common::types::{ParticipantId, TrackId, TrackKind};
use std::sync::Arc;

use crate::mock_media::MockLocalTrack;

/// Test participant fixture.
#[derive(Debug, Clone)]
pub struct TestParticipant {
    /// Fixture name, also used as the identity.
    pub name: String,
    /// Announce publications without media (media arrives via subscribe).
    published_only: bool,
    tracks: Vec<TrackInfo>,
}

impl TestParticipant {
    /// Create a participant with no tracks.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            published_only: false,
            tracks: Vec::new(),
        }
    }

    /// Announce publications without a live track.
    #[must_use]
    pub fn published_only(mut self) -> Self {
        self.published_only = true;
        self
    }

    /// Add an enabled audio track.
    #[must_use]
    pub fn with_audio(self) -> Self {
        self.with_track(TrackKind::Audio, true)
    }

    /// Add an audio track that starts disabled.
    #[must_use]
    pub fn with_muted_audio(self) -> Self {
        self.with_track(TrackKind::Audio, false)
    }

    /// Add an enabled video track.
    #[must_use]
    pub fn with_video(self) -> Self {
        self.with_track(TrackKind::Video, true)
    }

    /// Add a data track (the side channel).
    #[must_use]
    pub fn with_data(self) -> Self {
        self.with_track(TrackKind::Data, true)
    }

    fn with_track(mut self, kind: TrackKind, enabled: bool) -> Self {
        let id = self.track_id(kind);
        self.tracks.retain(|t| t.id != id);
        self.tracks.push(TrackInfo { id, kind, enabled });
        self
    }

    /// Participant ID.
    #[must_use]
    pub fn id(&self) -> ParticipantId {
        ParticipantId::new(format!("PA-{}", self.name))
    }

    /// ID of this participant's track of `kind`.
    #[must_use]
    pub fn track_id(&self, kind: TrackKind) -> TrackId {
        TrackId::new(format!("MT-{}-{}", self.name, kind.as_str()))
    }

    #[must_use]
    pub fn audio_track_id(&self) -> TrackId {
        self.track_id(TrackKind::Audio)
    }

    #[must_use]
    pub fn video_track_id(&self) -> TrackId {
        self.track_id(TrackKind::Video)
    }

    #[must_use]
    pub fn data_track_id(&self) -> TrackId {
        self.track_id(TrackKind::Data)
    }

    /// The configured track of `kind`, or an enabled one if not configured.
    #[must_use]
    pub fn track(&self, kind: TrackKind) -> TrackInfo {
        let id = self.track_id(kind);
        self.tracks
            .iter()
            .find(|t| t.id == id)
            .cloned()
            .unwrap_or(TrackInfo {
                id,
                kind,
                enabled: true,
            })
    }

    #[must_use]
    pub fn audio_track(&self) -> TrackInfo {
        self.track(TrackKind::Audio)
    }

    #[must_use]
    pub fn video_track(&self) -> TrackInfo {
        self.track(TrackKind::Video)
    }

    #[must_use]
    pub fn data_track(&self) -> TrackInfo {
        self.track(TrackKind::Data)
    }

    /// Publication for the track of `kind`, carrying media unless
    /// [`Self::published_only`] was set.
    #[must_use]
    pub fn publication(&self, kind: TrackKind) -> TrackPublication {
        let track = self.track(kind);
        TrackPublication {
            track_id: track.id.clone(),
            kind,
            track: (!self.published_only).then_some(track),
        }
    }

    #[must_use]
    pub fn audio_publication(&self) -> TrackPublication {
        self.publication(TrackKind::Audio)
    }

    #[must_use]
    pub fn video_publication(&self) -> TrackPublication {
        self.publication(TrackKind::Video)
    }

    #[must_use]
    pub fn data_publication(&self) -> TrackPublication {
        self.publication(TrackKind::Data)
    }

    /// The participant as a provider would enumerate it.
    #[must_use]
    pub fn snapshot(&self) -> ParticipantSnapshot {
        ParticipantSnapshot {
            id: self.id(),
            identity: self.name.clone(),
            publications: self
                .tracks
                .iter()
                .map(|t| self.publication(t.kind))
                .collect(),
        }
    }

    /// A mock local track matching this participant's track of `kind`.
    #[must_use]
    pub fn local_track(&self, kind: TrackKind) -> Arc<MockLocalTrack> {
        Arc::new(MockLocalTrack::from_info(&self.track(kind)))
    }
}
