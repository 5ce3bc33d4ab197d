//! Track lifecycle adapter.
//!
//! Wraps attach/detach of single tracks to/from participant render nodes.
//! Every attach is recorded so that detach can remove exactly the elements
//! it produced. Detach is idempotent: unpublish can race with teardown.
//!
//! Data tracks have no render step but are still recorded, so subscription
//! bookkeeping is uniform across kinds.

use common::provider::{RenderTarget, TrackInfo};
use common::types::{ElementId, NodeId, TrackId, TrackKind};
use std::collections::HashMap;
use tracing::debug;

/// Result of an attach call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attach {
    /// The track was rendered now.
    Attached,
    /// The track was already attached to this node; nothing changed.
    AlreadyAttached,
}

/// Render artifacts produced for one attached track.
#[derive(Debug, Clone)]
struct RenderHandle {
    kind: TrackKind,
    elements: Vec<ElementId>,
}

/// Tracks currently attached, keyed by node and track.
#[derive(Debug, Default)]
pub struct TrackAdapter {
    attached: HashMap<(NodeId, TrackId), RenderHandle>,
}

impl TrackAdapter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Render `track` into `node`.
    pub fn attach(
        &mut self,
        target: &mut dyn RenderTarget,
        node: NodeId,
        track: &TrackInfo,
    ) -> Attach {
        let key = (node, track.id.clone());
        if self.attached.contains_key(&key) {
            return Attach::AlreadyAttached;
        }

        let elements = if track.kind.is_media() {
            target.attach_track(node, track)
        } else {
            Vec::new()
        };

        debug!(
            target: "session.track",
            track_id = %track.id,
            kind = %track.kind,
            elements = elements.len(),
            "Track attached"
        );

        self.attached.insert(
            key,
            RenderHandle {
                kind: track.kind,
                elements,
            },
        );
        Attach::Attached
    }

    /// Remove every render artifact produced for `track_id` in `node`.
    ///
    /// Returns `false` (and does nothing) if the track is not attached.
    pub fn detach(
        &mut self,
        target: &mut dyn RenderTarget,
        node: NodeId,
        track_id: &TrackId,
    ) -> bool {
        let Some(handle) = self.attached.remove(&(node, track_id.clone())) else {
            return false;
        };

        for element in handle.elements {
            target.remove_element(element);
        }

        debug!(
            target: "session.track",
            track_id = %track_id,
            kind = %handle.kind,
            "Track detached"
        );
        true
    }

    /// Whether `track_id` is attached to `node`.
    #[must_use]
    pub fn is_attached(&self, node: NodeId, track_id: &TrackId) -> bool {
        self.attached.contains_key(&(node, track_id.clone()))
    }

    /// Number of attached tracks (all nodes).
    #[must_use]
    pub fn len(&self) -> usize {
        self.attached.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.attached.is_empty()
    }
}
