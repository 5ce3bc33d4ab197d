//! Participant registry.
//!
//! The single source of truth for who is in the session. Owns the render
//! target and the [`TrackAdapter`]; nothing else writes participant nodes.
//!
//! Event delivery across participants is unordered, so track events for a
//! participant that has not been added yet are buffered and replayed when it
//! is. Events for a removed participant are dropped: ids are never reused
//! within a session, so a removed id can never come back.

use crate::layout::{grid_layout, GridLayout};
use crate::observability::metrics;
use crate::reaction::ReactionOverlay;
use crate::track::{Attach, TrackAdapter};
use common::provider::{ParticipantSnapshot, RenderTarget, TrackInfo, TrackPublication};
use common::types::{NodeId, ParticipantId, TrackId, TrackKind};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

/// Cap on buffered track events per not-yet-added participant.
const MAX_PENDING_EVENTS: usize = 64;

/// A track as seen from the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackState {
    pub track_id: TrackId,
    pub kind: TrackKind,
    /// Media (or the data channel) is available and attached.
    pub subscribed: bool,
    /// Source-side enabled state; `false` while unsubscribed.
    pub enabled: bool,
}

/// Snapshot of one participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParticipantInfo {
    pub participant_id: ParticipantId,
    pub identity: String,
    pub is_local: bool,
    pub tracks: Vec<TrackState>,
    pub audio_muted: bool,
    pub dominant: bool,
    pub reaction: ReactionOverlay,
}

#[derive(Debug)]
struct Publication {
    track_id: TrackId,
    kind: TrackKind,
    /// Present while subscribed (and, for media, attached).
    track: Option<TrackInfo>,
}

#[derive(Debug)]
struct Participant {
    identity: String,
    is_local: bool,
    node: NodeId,
    /// Publication order is preserved.
    publications: Vec<Publication>,
    audio_muted: bool,
    reaction: ReactionOverlay,
}

impl Participant {
    /// Muted while any subscribed audio track is disabled.
    fn computed_audio_muted(&self) -> bool {
        self.publications
            .iter()
            .filter_map(|p| p.track.as_ref())
            .any(|t| t.kind == TrackKind::Audio && !t.enabled)
    }

    /// Re-render the muted indicator if the audio state changed.
    fn refresh_muted(&mut self, target: &mut dyn RenderTarget) -> bool {
        let muted = self.computed_audio_muted();
        if muted == self.audio_muted {
            return false;
        }
        self.audio_muted = muted;
        target.set_muted(self.node, muted);
        true
    }

    fn publication_mut(&mut self, track_id: &TrackId) -> Option<&mut Publication> {
        self.publications.iter_mut().find(|p| &p.track_id == track_id)
    }
}

/// Track events received before their participant was added.
#[derive(Debug)]
enum PendingTrackEvent {
    Published(TrackPublication),
    Subscribed(TrackInfo),
    Unsubscribed(TrackId),
    Enabled { track_id: TrackId, enabled: bool },
}

impl PendingTrackEvent {
    fn track_id(&self) -> &TrackId {
        match self {
            PendingTrackEvent::Published(publication) => &publication.track_id,
            PendingTrackEvent::Subscribed(track) => &track.id,
            PendingTrackEvent::Unsubscribed(track_id)
            | PendingTrackEvent::Enabled { track_id, .. } => track_id,
        }
    }
}

/// Owns every participant's render node, tracks and derived UI state.
pub struct ParticipantRegistry {
    target: Box<dyn RenderTarget>,
    adapter: TrackAdapter,
    participants: HashMap<ParticipantId, Participant>,
    /// Join order.
    order: Vec<ParticipantId>,
    local: Option<ParticipantId>,
    dominant: Option<ParticipantId>,
    layout: GridLayout,
    removed: HashSet<ParticipantId>,
    unpublished: HashSet<(ParticipantId, TrackId)>,
    pending: HashMap<ParticipantId, Vec<PendingTrackEvent>>,
}

impl ParticipantRegistry {
    /// Create an empty registry rendering into `target`.
    #[must_use]
    pub fn new(target: Box<dyn RenderTarget>) -> Self {
        Self {
            target,
            adapter: TrackAdapter::new(),
            participants: HashMap::new(),
            order: Vec::new(),
            local: None,
            dominant: None,
            layout: grid_layout(0),
            removed: HashSet::new(),
            unpublished: HashSet::new(),
            pending: HashMap::new(),
        }
    }

    /// Add a participant: allocate its node, publish its announced tracks,
    /// replay buffered track events and recompute the layout.
    ///
    /// Returns `false` if the participant is already present or was removed
    /// earlier in this session.
    pub fn add(&mut self, snapshot: ParticipantSnapshot, is_local: bool) -> bool {
        let id = snapshot.id;
        if self.participants.contains_key(&id) || self.removed.contains(&id) {
            debug!(
                target: "session.registry",
                participant_id = %id,
                "Ignoring duplicate add"
            );
            return false;
        }

        let node = self.target.create_node(&id, is_local);
        self.participants.insert(
            id.clone(),
            Participant {
                identity: snapshot.identity,
                is_local,
                node,
                publications: Vec::new(),
                audio_muted: false,
                reaction: ReactionOverlay::empty(),
            },
        );
        self.order.push(id.clone());
        if is_local {
            self.local = Some(id.clone());
        }

        for publication in snapshot.publications {
            self.on_track_published(&id, publication);
        }
        for event in self.pending.remove(&id).unwrap_or_default() {
            self.apply_pending(&id, event);
        }

        self.recompute_layout();
        info!(
            target: "session.registry",
            participant_id = %id,
            is_local,
            participants = self.participants.len(),
            "Participant added"
        );
        true
    }

    /// Remove a participant: detach all its tracks, delete its node and
    /// recompute the layout. No-op for unknown ids.
    pub fn remove(&mut self, participant_id: &ParticipantId) -> bool {
        if !self.remove_entry(participant_id) {
            return false;
        }
        self.recompute_layout();
        info!(
            target: "session.registry",
            participant_id = %participant_id,
            participants = self.participants.len(),
            "Participant removed"
        );
        true
    }

    /// Remove every participant with a single layout recompute.
    ///
    /// Returns the number of participants removed.
    pub fn clear(&mut self) -> usize {
        let ids = std::mem::take(&mut self.order);
        let mut removed = 0;
        for id in &ids {
            if self.remove_entry(id) {
                removed += 1;
            }
        }
        self.pending.clear();
        self.dominant = None;
        self.local = None;
        self.recompute_layout();
        info!(
            target: "session.registry",
            removed,
            "Registry cleared"
        );
        removed
    }

    fn remove_entry(&mut self, participant_id: &ParticipantId) -> bool {
        let Some(entry) = self.participants.remove(participant_id) else {
            return false;
        };

        for publication in &entry.publications {
            if publication.track.is_some() {
                self.adapter
                    .detach(&mut *self.target, entry.node, &publication.track_id);
            }
        }
        self.target.remove_node(entry.node);

        self.order.retain(|id| id != participant_id);
        self.pending.remove(participant_id);
        self.unpublished.retain(|(id, _)| id != participant_id);
        self.removed.insert(participant_id.clone());
        if self.dominant.as_ref() == Some(participant_id) {
            self.dominant = None;
        }
        if self.local.as_ref() == Some(participant_id) {
            self.local = None;
        }
        true
    }

    /// A participant announced a track.
    ///
    /// Attaches immediately if the publication already carries media, and
    /// always registers the publication for later subscribe/unsubscribe.
    /// Returns `true` if something was attached now.
    pub fn on_track_published(
        &mut self,
        participant_id: &ParticipantId,
        publication: TrackPublication,
    ) -> bool {
        let Some(entry) = self.participants.get_mut(participant_id) else {
            self.buffer(participant_id, PendingTrackEvent::Published(publication));
            return false;
        };

        self.unpublished
            .remove(&(participant_id.clone(), publication.track_id.clone()));
        if entry.publication_mut(&publication.track_id).is_none() {
            entry.publications.push(Publication {
                track_id: publication.track_id.clone(),
                kind: publication.kind,
                track: None,
            });
        }

        match publication.track {
            Some(track) => self.on_track_subscribed(participant_id, track),
            None => false,
        }
    }

    /// Media for a publication became available. Attaches exactly once.
    ///
    /// Subscriptions for unpublished tracks are dropped and never render.
    pub fn on_track_subscribed(
        &mut self,
        participant_id: &ParticipantId,
        track: TrackInfo,
    ) -> bool {
        let Some(entry) = self.participants.get_mut(participant_id) else {
            self.buffer(participant_id, PendingTrackEvent::Subscribed(track));
            return false;
        };
        if self
            .unpublished
            .contains(&(participant_id.clone(), track.id.clone()))
        {
            debug!(
                target: "session.registry",
                participant_id = %participant_id,
                track_id = %track.id,
                "Dropping subscription for unpublished track"
            );
            return false;
        }

        if entry.publication_mut(&track.id).is_none() {
            entry.publications.push(Publication {
                track_id: track.id.clone(),
                kind: track.kind,
                track: None,
            });
        }
        let node = entry.node;
        let Some(publication) = entry.publication_mut(&track.id) else {
            return false;
        };
        if publication.track.is_some() {
            return false;
        }

        let attached = self.adapter.attach(&mut *self.target, node, &track);
        publication.track = Some(track);
        entry.refresh_muted(&mut *self.target);
        attached == Attach::Attached
    }

    /// Media for a publication went away. Detaches exactly once.
    pub fn on_track_unsubscribed(
        &mut self,
        participant_id: &ParticipantId,
        track_id: &TrackId,
    ) -> bool {
        let Some(entry) = self.participants.get_mut(participant_id) else {
            self.buffer(
                participant_id,
                PendingTrackEvent::Unsubscribed(track_id.clone()),
            );
            return false;
        };
        let node = entry.node;
        let Some(publication) = entry.publication_mut(track_id) else {
            return false;
        };
        if publication.track.take().is_none() {
            return false;
        }

        let detached = self.adapter.detach(&mut *self.target, node, track_id);
        entry.refresh_muted(&mut *self.target);
        detached
    }

    /// A participant stopped publishing a track. Detaches if attached.
    pub fn on_track_unpublished(
        &mut self,
        participant_id: &ParticipantId,
        track_id: &TrackId,
    ) -> bool {
        if self.removed.contains(participant_id) {
            return false;
        }
        self.unpublished.insert((participant_id.clone(), track_id.clone()));

        let Some(entry) = self.participants.get_mut(participant_id) else {
            if let Some(events) = self.pending.get_mut(participant_id) {
                events.retain(|event| event.track_id() != track_id);
            }
            return false;
        };

        let Some(publication) = entry
            .publications
            .iter()
            .position(|p| &p.track_id == track_id)
            .map(|index| entry.publications.remove(index))
        else {
            return false;
        };

        let detached = publication.track.is_some()
            && self.adapter.detach(&mut *self.target, entry.node, track_id);
        entry.refresh_muted(&mut *self.target);
        detached
    }

    /// Record a source-side enable/disable of a subscribed track.
    ///
    /// Returns `true` if the track's state changed.
    pub fn set_track_enabled(
        &mut self,
        participant_id: &ParticipantId,
        track_id: &TrackId,
        enabled: bool,
    ) -> bool {
        let Some(entry) = self.participants.get_mut(participant_id) else {
            self.buffer(
                participant_id,
                PendingTrackEvent::Enabled {
                    track_id: track_id.clone(),
                    enabled,
                },
            );
            return false;
        };
        let Some(track) = entry
            .publication_mut(track_id)
            .and_then(|p| p.track.as_mut())
        else {
            return false;
        };
        if track.enabled == enabled {
            return false;
        }

        track.enabled = enabled;
        entry.refresh_muted(&mut *self.target);
        true
    }

    /// Swap one of the local participant's tracks for a new one.
    ///
    /// The old track is detached and forgotten; the new one is published
    /// and attached.
    pub fn replace_local_track(&mut self, old: &TrackId, new: TrackInfo) -> bool {
        let Some(local) = self.local.clone() else {
            return false;
        };
        let Some(entry) = self.participants.get_mut(&local) else {
            return false;
        };

        if let Some(index) = entry.publications.iter().position(|p| &p.track_id == old) {
            let publication = entry.publications.remove(index);
            if publication.track.is_some() {
                self.adapter.detach(&mut *self.target, entry.node, old);
            }
        }

        let publication = TrackPublication {
            track_id: new.id.clone(),
            kind: new.kind,
            track: Some(new),
        };
        self.on_track_published(&local, publication)
    }

    /// Move the dominant-speaker highlight to `participant_id`.
    ///
    /// The previous holder's highlight is cleared first. Returns `false` if
    /// the participant is unknown or already dominant.
    pub fn set_dominant(&mut self, participant_id: &ParticipantId) -> bool {
        let Some(node) = self.participants.get(participant_id).map(|p| p.node) else {
            return false;
        };
        if self.dominant.as_ref() == Some(participant_id) {
            return false;
        }

        self.clear_dominant();
        self.target.set_dominant(node, true);
        self.dominant = Some(participant_id.clone());
        true
    }

    /// Clear the dominant-speaker highlight, if any.
    pub fn clear_dominant(&mut self) -> Option<ParticipantId> {
        let previous = self.dominant.take()?;
        if let Some(entry) = self.participants.get(&previous) {
            self.target.set_dominant(entry.node, false);
        }
        Some(previous)
    }

    /// Render a reaction overlay on a participant's node.
    pub fn set_reaction(
        &mut self,
        participant_id: &ParticipantId,
        overlay: ReactionOverlay,
    ) -> bool {
        let Some(entry) = self.participants.get_mut(participant_id) else {
            return false;
        };
        self.target
            .set_reaction(entry.node, overlay.symbol.as_deref(), overlay.intensity);
        entry.reaction = overlay;
        true
    }

    /// Whether messages on `track_id` from `participant_id` should be
    /// processed: the participant is present and the data track is
    /// subscribed.
    #[must_use]
    pub fn is_listening(&self, participant_id: &ParticipantId, track_id: &TrackId) -> bool {
        self.participants.get(participant_id).is_some_and(|entry| {
            entry.publications.iter().any(|p| {
                &p.track_id == track_id
                    && p.kind == TrackKind::Data
                    && p.track.is_some()
            })
        })
    }

    /// Current muted indicator of a participant.
    #[must_use]
    pub fn audio_muted(&self, participant_id: &ParticipantId) -> Option<bool> {
        self.participants.get(participant_id).map(|p| p.audio_muted)
    }

    #[must_use]
    pub fn contains(&self, participant_id: &ParticipantId) -> bool {
        self.participants.contains_key(participant_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.participants.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    #[must_use]
    pub fn layout(&self) -> GridLayout {
        self.layout
    }

    #[must_use]
    pub fn dominant(&self) -> Option<&ParticipantId> {
        self.dominant.as_ref()
    }

    #[must_use]
    pub fn local_id(&self) -> Option<&ParticipantId> {
        self.local.as_ref()
    }

    /// Number of attached tracks across all participants.
    #[must_use]
    pub fn attached_tracks(&self) -> usize {
        self.adapter.len()
    }

    /// Snapshot of one participant.
    #[must_use]
    pub fn info(&self, participant_id: &ParticipantId) -> Option<ParticipantInfo> {
        let entry = self.participants.get(participant_id)?;
        Some(ParticipantInfo {
            participant_id: participant_id.clone(),
            identity: entry.identity.clone(),
            is_local: entry.is_local,
            tracks: entry
                .publications
                .iter()
                .map(|p| TrackState {
                    track_id: p.track_id.clone(),
                    kind: p.kind,
                    subscribed: p.track.is_some(),
                    enabled: p.track.as_ref().is_some_and(|t| t.enabled),
                })
                .collect(),
            audio_muted: entry.audio_muted,
            dominant: self.dominant.as_ref() == Some(participant_id),
            reaction: entry.reaction.clone(),
        })
    }

    /// Snapshots of every participant, in join order.
    #[must_use]
    pub fn infos(&self) -> Vec<ParticipantInfo> {
        self.order.iter().filter_map(|id| self.info(id)).collect()
    }

    fn recompute_layout(&mut self) {
        self.layout = grid_layout(self.participants.len());
        self.target.set_grid(self.layout.rows, self.layout.columns);
        metrics::set_participants_active(self.participants.len());
    }

    fn buffer(&mut self, participant_id: &ParticipantId, event: PendingTrackEvent) {
        if self.removed.contains(participant_id) {
            debug!(
                target: "session.registry",
                participant_id = %participant_id,
                "Dropping track event for removed participant"
            );
            return;
        }

        let events = self.pending.entry(participant_id.clone()).or_default();
        if events.len() >= MAX_PENDING_EVENTS {
            debug!(
                target: "session.registry",
                participant_id = %participant_id,
                "Pending track event buffer full, dropping event"
            );
            return;
        }
        events.push(event);
    }

    fn apply_pending(&mut self, participant_id: &ParticipantId, event: PendingTrackEvent) {
        match event {
            PendingTrackEvent::Published(publication) => {
                self.on_track_published(participant_id, publication);
            }
            PendingTrackEvent::Subscribed(track) => {
                self.on_track_subscribed(participant_id, track);
            }
            PendingTrackEvent::Unsubscribed(track_id) => {
                self.on_track_unsubscribed(participant_id, &track_id);
            }
            PendingTrackEvent::Enabled { track_id, enabled } => {
                self.set_track_enabled(participant_id, &track_id, enabled);
            }
        }
    }
}

impl std::fmt::Debug for ParticipantRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParticipantRegistry")
            .field("participants", &self.order)
            .field("local", &self.local)
            .field("dominant", &self.dominant)
            .field("layout", &self.layout)
            .finish_non_exhaustive()
    }
}
