//! End-to-end session lifecycle tests.
//!
//! Drives a `SynchronizerActor` through a mock provider and asserts on what
//! the render target shows: nodes, attached tracks, grid and highlights.
//! A `get_state()` round trip is used as a barrier: session events are
//! drained before commands, so every event sent earlier has been applied
//! once it returns.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::collections::HashMap;
use std::time::Duration;

use common::error::ProviderError;
use common::provider::SessionEvent;
use common::types::{ParticipantId, TrackKind};
use session_sync::actors::{
    SessionEnvironment, SessionPhase, SessionRuntime, SessionUpdate, SynchronizerActor,
};
use session_sync::config::Config;
use session_sync::errors::SyncError;
use session_sync::layout::GridLayout;
use session_test_utils::{MockRenderTarget, MockSessionProvider, TestParticipant};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

// ============================================================================
// Helpers
// ============================================================================

fn config() -> Config {
    let vars = HashMap::from([
        ("SESSION_ROOM_NAME".to_string(), "standup".to_string()),
        ("SESSION_CREDENTIAL".to_string(), "token-abc".to_string()),
    ]);
    Config::from_vars(&vars).unwrap()
}

async fn connect(provider: &MockSessionProvider, render: &MockRenderTarget) -> SessionRuntime {
    let environment = SessionEnvironment {
        render_target: Box::new(render.clone()),
        local_audio: None,
        local_video: None,
        side_channel: None,
    };
    SynchronizerActor::connect(provider, &config(), environment, CancellationToken::new())
        .await
        .expect("connect should succeed")
}

async fn send(provider: &MockSessionProvider, event: SessionEvent) {
    provider.event_sender().send(event).await.unwrap();
}

fn drain(updates: &mut mpsc::Receiver<SessionUpdate>) -> Vec<SessionUpdate> {
    let mut drained = Vec::new();
    while let Ok(update) = updates.try_recv() {
        drained.push(update);
    }
    drained
}

// ============================================================================
// Membership and layout
// ============================================================================

#[tokio::test]
async fn test_join_leave_disconnect_end_to_end() {
    let render = MockRenderTarget::new();
    let alice = TestParticipant::new("alice").with_audio();
    let bob = TestParticipant::new("bob").with_audio().with_video();
    let carol = TestParticipant::new("carol").with_video();
    let provider = MockSessionProvider::builder().local(alice.clone()).build();
    let mut runtime = connect(&provider, &render).await;

    send(&provider, SessionEvent::ParticipantJoined(bob.snapshot())).await;
    send(&provider, SessionEvent::ParticipantJoined(carol.snapshot())).await;
    let state = runtime.handle.get_state().await.unwrap();

    assert_eq!(state.participants.len(), 3);
    assert_eq!(state.layout, GridLayout { rows: 2, columns: 2 });
    assert_eq!(render.node_count(), 3);
    assert_eq!(render.attach_count(&bob.audio_track_id()), 1);
    assert_eq!(render.attach_count(&bob.video_track_id()), 1);
    assert_eq!(render.attach_count(&carol.video_track_id()), 1);

    send(&provider, SessionEvent::ParticipantLeft(carol.id())).await;
    let state = runtime.handle.get_state().await.unwrap();

    assert_eq!(state.layout, GridLayout { rows: 1, columns: 2 });
    assert_eq!(render.detach_count(&carol.video_track_id()), 1);
    assert!(render.node_for(&carol.id()).is_none());
    assert_eq!(render.grid_history(), vec![(1, 1), (1, 2), (2, 2), (1, 2)]);

    runtime.handle.disconnect().await.unwrap();
    runtime.task.await.unwrap();

    assert_eq!(render.node_count(), 0);
    assert_eq!(render.element_count(), 0);
    assert_eq!(render.removed_node_count(), 3);
    assert!(render.dominant_participants().is_empty());
    assert_eq!(runtime.handle.phase(), SessionPhase::Disconnected);
    assert_eq!(provider.control().disconnect_count(), 1);

    let updates = drain(&mut runtime.updates);
    assert_eq!(
        updates.last(),
        Some(&SessionUpdate::Disconnected { error: None })
    );
}

#[tokio::test]
async fn test_updates_follow_membership() {
    let render = MockRenderTarget::new();
    let alice = TestParticipant::new("alice");
    let bob = TestParticipant::new("bob");
    let provider = MockSessionProvider::builder().local(alice.clone()).build();
    let mut runtime = connect(&provider, &render).await;

    send(&provider, SessionEvent::ParticipantJoined(bob.snapshot())).await;
    send(&provider, SessionEvent::ParticipantLeft(bob.id())).await;
    runtime.handle.get_state().await.unwrap();

    let updates = drain(&mut runtime.updates);
    let kinds: Vec<_> = updates
        .iter()
        .map(|update| match update {
            SessionUpdate::ParticipantAdded(info) => format!("added:{}", info.participant_id),
            SessionUpdate::ParticipantRemoved(id) => format!("removed:{id}"),
            SessionUpdate::LayoutChanged(layout) => {
                format!("layout:{}x{}", layout.rows, layout.columns)
            }
            other => format!("{other:?}"),
        })
        .collect();
    assert_eq!(
        kinds,
        vec![
            "added:PA-alice",
            "layout:1x1",
            "added:PA-bob",
            "layout:1x2",
            "removed:PA-bob",
            "layout:1x1",
        ]
    );

    runtime.handle.cancel();
    runtime.task.await.unwrap();
}

#[tokio::test]
async fn test_duplicate_join_and_unknown_leave_are_ignored() {
    let render = MockRenderTarget::new();
    let bob = TestParticipant::new("bob").with_video();
    let provider = MockSessionProvider::builder()
        .local(TestParticipant::new("alice"))
        .participant(bob.clone())
        .build();
    let runtime = connect(&provider, &render).await;

    send(&provider, SessionEvent::ParticipantJoined(bob.snapshot())).await;
    send(
        &provider,
        SessionEvent::ParticipantLeft(ParticipantId::new("PA-ghost")),
    )
    .await;
    let state = runtime.handle.get_state().await.unwrap();

    assert_eq!(state.participants.len(), 2);
    assert_eq!(render.node_count(), 2);
    assert_eq!(render.attach_count(&bob.video_track_id()), 1);

    runtime.handle.cancel();
    runtime.task.await.unwrap();
}

#[tokio::test]
async fn test_state_snapshot_serializes() {
    let render = MockRenderTarget::new();
    let provider = MockSessionProvider::builder()
        .local(TestParticipant::new("alice").with_audio())
        .build();
    let runtime = connect(&provider, &render).await;

    let state = runtime.handle.get_state().await.unwrap();
    let json = serde_json::to_value(&state).unwrap();

    assert_eq!(json["phase"], "connected");
    assert_eq!(json["room_name"], "standup");
    assert_eq!(json["local_participant_id"], "PA-alice");
    assert_eq!(json["layout"]["rows"], 1);
    assert_eq!(json["participants"][0]["is_local"], true);

    runtime.handle.cancel();
    runtime.task.await.unwrap();
}

// ============================================================================
// Track lifecycle
// ============================================================================

#[tokio::test]
async fn test_early_track_event_applies_after_join() {
    let render = MockRenderTarget::new();
    let dave = TestParticipant::new("dave").with_audio();
    let provider = MockSessionProvider::builder().build();
    let runtime = connect(&provider, &render).await;

    send(
        &provider,
        SessionEvent::TrackSubscribed {
            participant_id: dave.id(),
            track: dave.audio_track(),
        },
    )
    .await;
    send(
        &provider,
        SessionEvent::ParticipantJoined(dave.clone().published_only().snapshot()),
    )
    .await;
    runtime.handle.get_state().await.unwrap();

    assert_eq!(render.attach_count(&dave.audio_track_id()), 1);

    runtime.handle.cancel();
    runtime.task.await.unwrap();
}

#[tokio::test]
async fn test_resubscribe_attaches_once_per_subscription() {
    let render = MockRenderTarget::new();
    let bob = TestParticipant::new("bob").with_video();
    let provider = MockSessionProvider::builder()
        .participant(bob.clone())
        .build();
    let runtime = connect(&provider, &render).await;

    send(
        &provider,
        SessionEvent::TrackSubscribed {
            participant_id: bob.id(),
            track: bob.video_track(),
        },
    )
    .await;
    send(
        &provider,
        SessionEvent::TrackUnsubscribed {
            participant_id: bob.id(),
            track_id: bob.video_track_id(),
        },
    )
    .await;
    send(
        &provider,
        SessionEvent::TrackSubscribed {
            participant_id: bob.id(),
            track: bob.video_track(),
        },
    )
    .await;
    runtime.handle.get_state().await.unwrap();

    assert_eq!(render.attach_count(&bob.video_track_id()), 2);
    assert_eq!(render.detach_count(&bob.video_track_id()), 1);
    assert_eq!(render.element_count(), 1);

    runtime.handle.cancel();
    runtime.task.await.unwrap();
}

#[tokio::test]
async fn test_unpublished_track_is_not_attached_later() {
    let render = MockRenderTarget::new();
    let bob = TestParticipant::new("bob").with_video().published_only();
    let provider = MockSessionProvider::builder()
        .participant(bob.clone())
        .build();
    let runtime = connect(&provider, &render).await;

    send(
        &provider,
        SessionEvent::TrackUnpublished {
            participant_id: bob.id(),
            track_id: bob.video_track_id(),
        },
    )
    .await;
    send(
        &provider,
        SessionEvent::TrackSubscribed {
            participant_id: bob.id(),
            track: bob.video_track(),
        },
    )
    .await;
    runtime.handle.get_state().await.unwrap();

    assert_eq!(render.attach_count(&bob.video_track_id()), 0);

    runtime.handle.cancel();
    runtime.task.await.unwrap();
}

#[tokio::test]
async fn test_muted_indicator_follows_remote_audio() {
    let render = MockRenderTarget::new();
    let bob = TestParticipant::new("bob").with_audio();
    let provider = MockSessionProvider::builder()
        .participant(bob.clone())
        .build();
    let mut runtime = connect(&provider, &render).await;
    drain(&mut runtime.updates);

    for event in [
        SessionEvent::TrackDisabled {
            participant_id: bob.id(),
            track_id: bob.audio_track_id(),
        },
        SessionEvent::TrackDisabled {
            participant_id: bob.id(),
            track_id: bob.audio_track_id(),
        },
        SessionEvent::TrackEnabled {
            participant_id: bob.id(),
            track_id: bob.audio_track_id(),
        },
    ] {
        send(&provider, event).await;
    }
    runtime.handle.get_state().await.unwrap();

    assert!(!render.is_muted(&bob.id()));
    assert_eq!(render.muted_transitions(&bob.id()), 2);
    assert_eq!(
        drain(&mut runtime.updates),
        vec![
            SessionUpdate::MuteChanged {
                participant_id: bob.id(),
                muted: true
            },
            SessionUpdate::MuteChanged {
                participant_id: bob.id(),
                muted: false
            },
        ]
    );

    runtime.handle.cancel();
    runtime.task.await.unwrap();
}

// ============================================================================
// Dominant speaker
// ============================================================================

#[tokio::test]
async fn test_dominant_speaker_highlight_moves() {
    let render = MockRenderTarget::new();
    let alice = TestParticipant::new("alice");
    let bob = TestParticipant::new("bob");
    let carol = TestParticipant::new("carol");
    let provider = MockSessionProvider::builder()
        .local(alice.clone())
        .participant(bob.clone())
        .participant(carol.clone())
        .build();
    let runtime = connect(&provider, &render).await;

    assert!(runtime.handle.get_state().await.unwrap().dominant_speaker.is_none());

    send(&provider, SessionEvent::DominantSpeakerChanged(Some(bob.id()))).await;
    runtime.handle.get_state().await.unwrap();
    assert_eq!(render.dominant_participants(), vec![bob.id()]);

    send(&provider, SessionEvent::DominantSpeakerChanged(Some(carol.id()))).await;
    runtime.handle.get_state().await.unwrap();
    assert_eq!(render.dominant_participants(), vec![carol.id()]);

    // No dominant speaker highlights the local participant
    send(&provider, SessionEvent::DominantSpeakerChanged(None)).await;
    let state = runtime.handle.get_state().await.unwrap();
    assert_eq!(render.dominant_participants(), vec![alice.id()]);
    assert_eq!(state.dominant_speaker, Some(alice.id()));

    // A holder that never joins clears the highlight
    send(
        &provider,
        SessionEvent::DominantSpeakerChanged(Some(ParticipantId::new("PA-ghost"))),
    )
    .await;
    let state = runtime.handle.get_state().await.unwrap();
    assert!(render.dominant_participants().is_empty());
    assert!(state.dominant_speaker.is_none());

    runtime.handle.cancel();
    runtime.task.await.unwrap();
}

#[tokio::test]
async fn test_dominant_speaker_before_join_is_applied_on_join() {
    let render = MockRenderTarget::new();
    let bob = TestParticipant::new("bob");
    let dave = TestParticipant::new("dave");
    let provider = MockSessionProvider::builder()
        .participant(bob.clone())
        .build();
    let mut runtime = connect(&provider, &render).await;

    send(&provider, SessionEvent::DominantSpeakerChanged(Some(bob.id()))).await;
    runtime.handle.get_state().await.unwrap();
    assert_eq!(render.dominant_participants(), vec![bob.id()]);
    drain(&mut runtime.updates);

    // The provider moves the highlight to dave before the join is applied.
    send(&provider, SessionEvent::DominantSpeakerChanged(Some(dave.id()))).await;
    let state = runtime.handle.get_state().await.unwrap();
    assert!(render.dominant_participants().is_empty());
    assert!(state.dominant_speaker.is_none());

    send(&provider, SessionEvent::ParticipantJoined(dave.snapshot())).await;
    let state = runtime.handle.get_state().await.unwrap();
    assert_eq!(render.dominant_participants(), vec![dave.id()]);
    assert_eq!(state.dominant_speaker, Some(dave.id()));

    let dominant: Vec<_> = drain(&mut runtime.updates)
        .into_iter()
        .filter_map(|update| match update {
            SessionUpdate::DominantSpeakerChanged(holder) => Some(holder),
            _ => None,
        })
        .collect();
    assert_eq!(dominant, vec![None, Some(dave.id())]);

    runtime.handle.cancel();
    runtime.task.await.unwrap();
}

#[tokio::test]
async fn test_pending_dominant_speaker_is_dropped_on_leave() {
    let render = MockRenderTarget::new();
    let dave = TestParticipant::new("dave");
    let provider = MockSessionProvider::builder().build();
    let runtime = connect(&provider, &render).await;

    send(&provider, SessionEvent::DominantSpeakerChanged(Some(dave.id()))).await;
    send(&provider, SessionEvent::ParticipantLeft(dave.id())).await;
    send(&provider, SessionEvent::ParticipantJoined(dave.snapshot())).await;
    let state = runtime.handle.get_state().await.unwrap();

    assert!(state.participants.iter().any(|p| p.participant_id == dave.id()));
    assert!(render.dominant_participants().is_empty());
    assert!(state.dominant_speaker.is_none());

    runtime.handle.cancel();
    runtime.task.await.unwrap();
}

#[tokio::test]
async fn test_dominant_speaker_leaving_clears_pointer() {
    let render = MockRenderTarget::new();
    let bob = TestParticipant::new("bob");
    let provider = MockSessionProvider::builder()
        .participant(bob.clone())
        .build();
    let runtime = connect(&provider, &render).await;

    send(&provider, SessionEvent::DominantSpeakerChanged(Some(bob.id()))).await;
    send(&provider, SessionEvent::ParticipantLeft(bob.id())).await;
    let state = runtime.handle.get_state().await.unwrap();

    assert!(state.dominant_speaker.is_none());
    assert!(render.dominant_participants().is_empty());

    runtime.handle.cancel();
    runtime.task.await.unwrap();
}

// ============================================================================
// Connection and teardown
// ============================================================================

#[tokio::test]
async fn test_connection_failure_then_fresh_synchronizer() {
    let render = MockRenderTarget::new();
    let failing = MockSessionProvider::builder()
        .failing(ProviderError::Connect("room not found".to_string()))
        .build();
    let environment = SessionEnvironment {
        render_target: Box::new(render.clone()),
        local_audio: None,
        local_video: None,
        side_channel: None,
    };

    let result =
        SynchronizerActor::connect(&failing, &config(), environment, CancellationToken::new())
            .await;

    assert!(matches!(result, Err(SyncError::Connection(_))));
    assert_eq!(render.node_count(), 0);

    let provider = MockSessionProvider::builder().build();
    let runtime = connect(&provider, &render).await;
    assert_eq!(render.node_count(), 1);

    runtime.handle.cancel();
    runtime.task.await.unwrap();
}

#[tokio::test]
async fn test_persisted_page_keeps_session() {
    let render = MockRenderTarget::new();
    let provider = MockSessionProvider::builder()
        .participant(TestParticipant::new("bob"))
        .build();
    let runtime = connect(&provider, &render).await;

    runtime.handle.page_terminating(true).await.unwrap();
    let state = runtime.handle.get_state().await.unwrap();
    assert_eq!(state.phase, SessionPhase::Connected);
    assert_eq!(provider.control().disconnect_count(), 0);

    runtime.handle.page_terminating(false).await.unwrap();
    runtime.task.await.unwrap();

    assert_eq!(provider.control().disconnect_count(), 1);
    assert_eq!(render.node_count(), 0);
    assert!(matches!(
        runtime.handle.disconnect().await,
        Err(SyncError::NotConnected)
    ));
}

#[tokio::test]
async fn test_dropping_every_handle_disconnects() {
    let render = MockRenderTarget::new();
    let provider = MockSessionProvider::builder().build();
    let SessionRuntime {
        handle,
        updates: _updates,
        task,
    } = connect(&provider, &render).await;

    drop(handle);
    tokio::time::timeout(Duration::from_secs(1), task)
        .await
        .expect("actor should stop")
        .unwrap();

    assert_eq!(provider.control().disconnect_count(), 1);
    assert_eq!(render.node_count(), 0);
}

#[tokio::test]
async fn test_track_events_after_disconnect_are_ignored() {
    let render = MockRenderTarget::new();
    let bob = TestParticipant::new("bob").with_video().published_only();
    let provider = MockSessionProvider::builder()
        .participant(bob.clone())
        .build();
    let runtime = connect(&provider, &render).await;

    runtime.handle.disconnect().await.unwrap();
    let _ = provider
        .event_sender()
        .send(SessionEvent::TrackSubscribed {
            participant_id: bob.id(),
            track: bob.video_track(),
        })
        .await;
    runtime.task.await.unwrap();

    assert_eq!(render.attach_count(&bob.track_id(TrackKind::Video)), 0);
    assert_eq!(render.node_count(), 0);
}
