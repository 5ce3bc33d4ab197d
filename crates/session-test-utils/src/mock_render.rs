//! Render target mock.
//!
//! Records every node, element and indicator the synchronizer writes so
//! tests can assert on what the user would see.
//!
//! # Example
//!
//! ```rust,ignore
//! use session_test_utils::MockRenderTarget;
//!
//! let render = MockRenderTarget::new();
//! let registry = ParticipantRegistry::new(Box::new(render.clone()));
//! // ... drive the registry ...
//! assert_eq!(render.grid(), Some((1, 2)));
//! ```

use common::provider::{RenderTarget, TrackInfo};
use common::types::{ElementId, NodeId, ParticipantId, TrackId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Mock render target; clones share state.
#[derive(Debug, Clone, Default)]
pub struct MockRenderTarget {
    inner: Arc<Mutex<RenderState>>,
}

#[derive(Debug, Default)]
struct RenderState {
    next_id: u64,
    nodes: HashMap<NodeId, RenderNode>,
    elements: HashMap<ElementId, (NodeId, TrackId)>,
    attach_counts: HashMap<TrackId, usize>,
    detach_counts: HashMap<TrackId, usize>,
    grids: Vec<(u32, u32)>,
    removed_nodes: usize,
}

#[derive(Debug)]
struct RenderNode {
    participant_id: ParticipantId,
    is_local: bool,
    dominant: bool,
    muted: bool,
    muted_transitions: usize,
    reaction: Option<(String, u8)>,
}

impl RenderState {
    fn allocate(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn node(&self, participant_id: &ParticipantId) -> Option<(&NodeId, &RenderNode)> {
        self.nodes
            .iter()
            .find(|(_, node)| &node.participant_id == participant_id)
    }
}

impl MockRenderTarget {
    /// Create an empty render target.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Node currently rendering `participant_id`.
    pub fn node_for(&self, participant_id: &ParticipantId) -> Option<NodeId> {
        let inner = self.inner.lock().unwrap();
        inner.node(participant_id).map(|(id, _)| *id)
    }

    /// Number of live participant nodes.
    pub fn node_count(&self) -> usize {
        self.inner.lock().unwrap().nodes.len()
    }

    /// Number of nodes deleted so far.
    pub fn removed_node_count(&self) -> usize {
        self.inner.lock().unwrap().removed_nodes
    }

    /// Number of live media elements across all nodes.
    pub fn element_count(&self) -> usize {
        self.inner.lock().unwrap().elements.len()
    }

    /// How many times `track_id` was rendered.
    pub fn attach_count(&self, track_id: &TrackId) -> usize {
        let inner = self.inner.lock().unwrap();
        inner.attach_counts.get(track_id).copied().unwrap_or(0)
    }

    /// How many render elements of `track_id` were removed.
    pub fn detach_count(&self, track_id: &TrackId) -> usize {
        let inner = self.inner.lock().unwrap();
        inner.detach_counts.get(track_id).copied().unwrap_or(0)
    }

    /// Current `(--grid-rows, --grid-columns)`.
    pub fn grid(&self) -> Option<(u32, u32)> {
        self.inner.lock().unwrap().grids.last().copied()
    }

    /// Every grid ever set, oldest first.
    pub fn grid_history(&self) -> Vec<(u32, u32)> {
        self.inner.lock().unwrap().grids.clone()
    }

    /// Participants whose node currently carries the dominant highlight.
    pub fn dominant_participants(&self) -> Vec<ParticipantId> {
        let inner = self.inner.lock().unwrap();
        let mut dominant: Vec<_> = inner
            .nodes
            .values()
            .filter(|node| node.dominant)
            .map(|node| node.participant_id.clone())
            .collect();
        dominant.sort();
        dominant
    }

    /// Whether the participant's node shows the muted indicator.
    pub fn is_muted(&self, participant_id: &ParticipantId) -> bool {
        let inner = self.inner.lock().unwrap();
        inner
            .node(participant_id)
            .is_some_and(|(_, node)| node.muted)
    }

    /// How many times the muted indicator changed on the participant's node.
    pub fn muted_transitions(&self, participant_id: &ParticipantId) -> usize {
        let inner = self.inner.lock().unwrap();
        inner
            .node(participant_id)
            .map_or(0, |(_, node)| node.muted_transitions)
    }

    /// Reaction overlay currently shown on the participant's node.
    pub fn reaction(&self, participant_id: &ParticipantId) -> Option<(String, u8)> {
        let inner = self.inner.lock().unwrap();
        inner
            .node(participant_id)
            .and_then(|(_, node)| node.reaction.clone())
    }

    /// Whether the participant's node was created as the local one.
    pub fn is_local(&self, participant_id: &ParticipantId) -> bool {
        let inner = self.inner.lock().unwrap();
        inner
            .node(participant_id)
            .is_some_and(|(_, node)| node.is_local)
    }
}

impl RenderTarget for MockRenderTarget {
    fn create_node(&mut self, participant_id: &ParticipantId, is_local: bool) -> NodeId {
        let mut inner = self.inner.lock().unwrap();
        let id = NodeId(inner.allocate());
        inner.nodes.insert(
            id,
            RenderNode {
                participant_id: participant_id.clone(),
                is_local,
                dominant: false,
                muted: false,
                muted_transitions: 0,
                reaction: None,
            },
        );
        id
    }

    fn remove_node(&mut self, node: NodeId) {
        let mut inner = self.inner.lock().unwrap();
        if inner.nodes.remove(&node).is_some() {
            inner.removed_nodes += 1;
        }
        inner.elements.retain(|_, (owner, _)| *owner != node);
    }

    fn attach_track(&mut self, node: NodeId, track: &TrackInfo) -> Vec<ElementId> {
        let mut inner = self.inner.lock().unwrap();
        let element = ElementId(inner.allocate());
        inner.elements.insert(element, (node, track.id.clone()));
        *inner.attach_counts.entry(track.id.clone()).or_default() += 1;
        vec![element]
    }

    fn remove_element(&mut self, element: ElementId) {
        let mut inner = self.inner.lock().unwrap();
        if let Some((_, track_id)) = inner.elements.remove(&element) {
            *inner.detach_counts.entry(track_id).or_default() += 1;
        }
    }

    fn set_grid(&mut self, rows: u32, columns: u32) {
        self.inner.lock().unwrap().grids.push((rows, columns));
    }

    fn set_dominant(&mut self, node: NodeId, dominant: bool) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(node) = inner.nodes.get_mut(&node) {
            node.dominant = dominant;
        }
    }

    fn set_muted(&mut self, node: NodeId, muted: bool) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(node) = inner.nodes.get_mut(&node) {
            if node.muted != muted {
                node.muted_transitions += 1;
            }
            node.muted = muted;
        }
    }

    fn set_reaction(&mut self, node: NodeId, symbol: Option<&str>, intensity: u8) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(node) = inner.nodes.get_mut(&node) {
            node.reaction = symbol.map(|s| (s.to_string(), intensity));
        }
    }
}
