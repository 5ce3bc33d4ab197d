//! Reaction decay timer.
//!
//! One explicit state record per participant: the displayed symbol, its
//! intensity and the key of its pending expiry in a shared `DelayQueue`.
//!
//! - a new symbol replaces the old one and resets intensity to 1
//! - the same symbol again increments intensity, capped at [`MAX_INTENSITY`]
//! - every signal reschedules the participant's single expiry (never stacks)
//! - on expiry the record is dropped and the overlay returns to empty

use common::types::ParticipantId;
use serde::Serialize;
use std::collections::HashMap;
use std::future::poll_fn;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio_util::time::{delay_queue, DelayQueue};
use tracing::debug;

/// Highest intensity a repeated reaction reaches.
pub const MAX_INTENSITY: u8 = 5;

/// What a participant's reaction overlay currently shows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReactionOverlay {
    /// Displayed symbol, `None` when empty.
    pub symbol: Option<String>,
    /// 0 when empty, otherwise 1..=5.
    pub intensity: u8,
}

impl ReactionOverlay {
    /// The empty overlay.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.symbol.is_none()
    }
}

#[derive(Debug)]
struct ReactionState {
    symbol: String,
    intensity: u8,
    expiry: delay_queue::Key,
}

/// Per-participant reaction state with a single live expiry each.
#[derive(Debug)]
pub struct ReactionDecay {
    window: Duration,
    states: HashMap<ParticipantId, ReactionState>,
    expiries: DelayQueue<ParticipantId>,
}

impl ReactionDecay {
    /// Create a decay timer with the given window.
    #[must_use]
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            states: HashMap::new(),
            expiries: DelayQueue::new(),
        }
    }

    /// Apply an incoming reaction from `participant_id`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn on_signal(&mut self, participant_id: &ParticipantId, symbol: &str) -> ReactionOverlay {
        if let Some(state) = self.states.get_mut(participant_id) {
            self.expiries.reset(&state.expiry, self.window);
            if state.symbol == symbol {
                state.intensity = state.intensity.saturating_add(1).min(MAX_INTENSITY);
            } else {
                state.symbol = symbol.to_string();
                state.intensity = 1;
            }
        } else {
            let expiry = self.expiries.insert(participant_id.clone(), self.window);
            self.states.insert(
                participant_id.clone(),
                ReactionState {
                    symbol: symbol.to_string(),
                    intensity: 1,
                    expiry,
                },
            );
        }

        let overlay = self.overlay(participant_id);
        debug!(
            target: "session.reaction",
            participant_id = %participant_id,
            intensity = overlay.intensity,
            "Reaction applied"
        );
        overlay
    }

    /// Current overlay for `participant_id`.
    #[must_use]
    pub fn overlay(&self, participant_id: &ParticipantId) -> ReactionOverlay {
        self.states
            .get(participant_id)
            .map(|state| ReactionOverlay {
                symbol: Some(state.symbol.clone()),
                intensity: state.intensity,
            })
            .unwrap_or_default()
    }

    /// Drop a participant's state and cancel its expiry.
    pub fn clear(&mut self, participant_id: &ParticipantId) -> bool {
        match self.states.remove(participant_id) {
            Some(state) => {
                self.expiries.remove(&state.expiry);
                true
            }
            None => false,
        }
    }

    /// Drop every participant's state.
    pub fn clear_all(&mut self) {
        self.states.clear();
        self.expiries.clear();
    }

    /// Whether no expiry is pending.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.states.is_empty()
    }

    /// Number of participants with a live reaction.
    #[must_use]
    pub fn active(&self) -> usize {
        self.states.len()
    }

    /// Poll for the next participant whose reaction expired.
    ///
    /// Returns `Ready(None)` when nothing is pending.
    pub fn poll_expired(&mut self, cx: &mut Context<'_>) -> Poll<Option<ParticipantId>> {
        match self.expiries.poll_expired(cx) {
            Poll::Ready(Some(expired)) => {
                let participant_id = expired.into_inner();
                self.states.remove(&participant_id);
                debug!(
                    target: "session.reaction",
                    participant_id = %participant_id,
                    "Reaction expired"
                );
                Poll::Ready(Some(participant_id))
            }
            Poll::Ready(None) => Poll::Ready(None),
            Poll::Pending => Poll::Pending,
        }
    }

    /// Wait for the next participant whose reaction expired.
    pub async fn next_expired(&mut self) -> Option<ParticipantId> {
        poll_fn(|cx| self.poll_expired(cx)).await
    }
}
