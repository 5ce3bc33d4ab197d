//! Camera/microphone switching.
//!
//! Acquiring a device track and publishing it are the slow, interleavable
//! steps in the engine. Per track kind:
//! - a request that arrives while a switch is in flight is dropped, not queued
//! - a result that completes after [`DeviceSwitcher::invalidate`] is stopped
//!   and discarded
//! - the previous track is stopped only once the new one is published, so a
//!   failed acquisition or a rejected publish leaves the previous track active

use crate::errors::SyncError;
use crate::observability::metrics;
use common::error::ProviderError;
use common::provider::{LocalTrack, MediaDevices};
use common::types::TrackKind;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Result of a switch request that did not fail.
#[derive(Clone)]
pub enum SwitchOutcome {
    /// The new track is published and active; the previous one was stopped.
    Switched(Arc<dyn LocalTrack>),
    /// Another switch of the same kind was in flight.
    Dropped,
    /// The switcher was invalidated mid-switch; the new track was stopped and
    /// the switcher's tracks were left alone.
    Superseded,
}

impl SwitchOutcome {
    /// Metric label for the outcome.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            SwitchOutcome::Switched(_) => "switched",
            SwitchOutcome::Dropped => "dropped",
            SwitchOutcome::Superseded => "superseded",
        }
    }
}

impl fmt::Debug for SwitchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SwitchOutcome::Switched(track) => f.debug_tuple("Switched").field(&track.id()).finish(),
            SwitchOutcome::Dropped => f.write_str("Dropped"),
            SwitchOutcome::Superseded => f.write_str("Superseded"),
        }
    }
}

#[derive(Default)]
struct SwitchState {
    in_progress: HashSet<TrackKind>,
    generations: HashMap<TrackKind, u64>,
    active: HashMap<TrackKind, Arc<dyn LocalTrack>>,
}

impl SwitchState {
    fn generation(&self, kind: TrackKind) -> u64 {
        self.generations.get(&kind).copied().unwrap_or(0)
    }
}

/// Clears the in-progress flag when the switch finishes or is dropped.
struct InProgress<'a> {
    switcher: &'a DeviceSwitcher,
    kind: TrackKind,
}

impl Drop for InProgress<'_> {
    fn drop(&mut self) {
        self.switcher.state().in_progress.remove(&self.kind);
    }
}

/// Replaces the active local camera and microphone tracks.
pub struct DeviceSwitcher {
    devices: Arc<dyn MediaDevices>,
    state: Mutex<SwitchState>,
}

impl DeviceSwitcher {
    #[must_use]
    pub fn new(devices: Arc<dyn MediaDevices>) -> Self {
        Self {
            devices,
            state: Mutex::new(SwitchState::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, SwitchState> {
        // State stays consistent across panics; every mutation is a single
        // insert or remove.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register the track currently in use for its kind.
    pub fn set_active(&self, track: Arc<dyn LocalTrack>) {
        self.state().active.insert(track.kind(), track);
    }

    /// The track currently in use for `kind`.
    #[must_use]
    pub fn active(&self, kind: TrackKind) -> Option<Arc<dyn LocalTrack>> {
        self.state().active.get(&kind).cloned()
    }

    /// Whether a switch of `kind` is in flight.
    #[must_use]
    pub fn is_switching(&self, kind: TrackKind) -> bool {
        self.state().in_progress.contains(&kind)
    }

    fn is_current(&self, kind: TrackKind, generation: u64) -> bool {
        self.state().generation(kind) == generation
    }

    /// Switch the `kind` track to `device_id`.
    ///
    /// The acquired track is handed to `publish` (normally
    /// [`SynchronizerHandle::replace_local_track`]). It becomes the active
    /// track, and the previous one is stopped, only if `publish` succeeds.
    /// The switch counts as in flight until `publish` returns.
    ///
    /// [`SynchronizerHandle::replace_local_track`]: crate::actors::SynchronizerHandle::replace_local_track
    ///
    /// # Errors
    ///
    /// Returns `SyncError::Device` if the device cannot be acquired or `kind`
    /// has no device, and the error from `publish` if it fails. In both cases
    /// the previous track stays active and any new track is stopped.
    pub async fn switch<F, Fut>(
        &self,
        kind: TrackKind,
        device_id: &str,
        publish: F,
    ) -> Result<SwitchOutcome, SyncError>
    where
        F: FnOnce(Arc<dyn LocalTrack>) -> Fut,
        Fut: Future<Output = Result<(), SyncError>>,
    {
        if !kind.is_media() {
            return Err(SyncError::Device(ProviderError::DeviceUnavailable(format!(
                "{kind} tracks have no device"
            ))));
        }

        let generation = {
            let mut state = self.state();
            if !state.in_progress.insert(kind) {
                debug!(
                    target: "session.device",
                    kind = %kind,
                    device_id = %device_id,
                    "Switch already in progress, dropping request"
                );
                metrics::record_device_switch(kind.as_str(), "dropped");
                return Ok(SwitchOutcome::Dropped);
            }
            state.generation(kind)
        };
        let _in_progress = InProgress {
            switcher: self,
            kind,
        };

        let start = Instant::now();
        let result = self.devices.create_track(kind, device_id).await;
        metrics::record_device_switch_duration(kind.as_str(), start.elapsed());

        let track = match result {
            Ok(track) => track,
            Err(e) => {
                warn!(
                    target: "session.device",
                    kind = %kind,
                    device_id = %device_id,
                    error = %e,
                    "Device acquisition failed, keeping previous track"
                );
                metrics::record_device_switch(kind.as_str(), "error");
                return Err(SyncError::Device(e));
            }
        };

        if !self.is_current(kind, generation) {
            return Ok(Self::discard(kind, device_id, &track));
        }

        if let Err(e) = publish(Arc::clone(&track)).await {
            track.stop();
            warn!(
                target: "session.device",
                kind = %kind,
                device_id = %device_id,
                error = %e,
                "Publishing new device track failed, keeping previous track"
            );
            metrics::record_device_switch(kind.as_str(), "error");
            return Err(e);
        }

        let previous = {
            let mut state = self.state();
            if state.generation(kind) != generation {
                drop(state);
                return Ok(Self::discard(kind, device_id, &track));
            }
            state.active.insert(kind, Arc::clone(&track))
        };

        if let Some(previous) = previous {
            previous.stop();
        }

        info!(
            target: "session.device",
            kind = %kind,
            device_id = %device_id,
            track_id = %track.id(),
            "Device switched"
        );
        metrics::record_device_switch(kind.as_str(), "switched");
        Ok(SwitchOutcome::Switched(track))
    }

    fn discard(kind: TrackKind, device_id: &str, track: &Arc<dyn LocalTrack>) -> SwitchOutcome {
        track.stop();
        info!(
            target: "session.device",
            kind = %kind,
            device_id = %device_id,
            "Discarding superseded device track"
        );
        metrics::record_device_switch(kind.as_str(), "superseded");
        SwitchOutcome::Superseded
    }

    /// Invalidate every in-flight switch; their results will be discarded.
    pub fn invalidate(&self) {
        let mut state = self.state();
        for kind in [TrackKind::Audio, TrackKind::Video] {
            *state.generations.entry(kind).or_default() += 1;
        }
    }

    /// Invalidate in-flight switches and stop every active track.
    pub fn stop_all(&self) {
        self.invalidate();
        let active: Vec<_> = self.state().active.drain().map(|(_, t)| t).collect();
        for track in active {
            track.stop();
        }
    }
}

impl fmt::Debug for DeviceSwitcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state();
        f.debug_struct("DeviceSwitcher")
            .field("in_progress", &state.in_progress)
            .field("active", &state.active.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use common::types::TrackId;
    use session_test_utils::{MockLocalTrack, MockMediaDevices};
    use std::time::Duration;

    fn switcher(devices: &MockMediaDevices) -> Arc<DeviceSwitcher> {
        Arc::new(DeviceSwitcher::new(Arc::new(devices.clone())))
    }

    async fn wait_for_requests(devices: &MockMediaDevices, n: usize) {
        while devices.request_count() < n {
            tokio::task::yield_now().await;
        }
    }

    async fn accept(_track: Arc<dyn LocalTrack>) -> Result<(), SyncError> {
        Ok(())
    }

    async fn reject(_track: Arc<dyn LocalTrack>) -> Result<(), SyncError> {
        Err(SyncError::Device(ProviderError::Transport(
            "publish rejected".to_string(),
        )))
    }

    #[tokio::test]
    async fn test_switch_stops_previous_after_new_is_published() {
        let devices = MockMediaDevices::new();
        let switcher = switcher(&devices);
        let old = Arc::new(MockLocalTrack::new("MT-cam-1", TrackKind::Video));
        switcher.set_active(old.clone());

        let outcome = switcher
            .switch(TrackKind::Video, "cam-2", |track| {
                let old = old.clone();
                async move {
                    // The previous track is still live while publishing.
                    assert!(!old.is_stopped());
                    accept(track).await
                }
            })
            .await
            .unwrap();

        assert!(
            matches!(outcome, SwitchOutcome::Switched(_)),
            "unexpected outcome {outcome:?}"
        );
        let created = devices.created();
        let new = created.first().unwrap();
        assert!(old.is_stopped());
        assert!(!new.is_stopped());
        assert_eq!(
            switcher.active(TrackKind::Video).map(|t| t.id()),
            Some(new.id())
        );
    }

    #[tokio::test]
    async fn test_failed_acquisition_keeps_previous_track() {
        let devices = MockMediaDevices::new().failing_device("mic-broken");
        let switcher = switcher(&devices);
        let old = Arc::new(MockLocalTrack::new("MT-mic-1", TrackKind::Audio));
        switcher.set_active(old.clone());

        let result = switcher
            .switch(TrackKind::Audio, "mic-broken", accept)
            .await;

        assert!(matches!(result, Err(SyncError::Device(_))));
        assert!(!old.is_stopped());
        assert_eq!(
            switcher.active(TrackKind::Audio).map(|t| t.id()),
            Some(TrackId::new("MT-mic-1"))
        );
        assert!(!switcher.is_switching(TrackKind::Audio));
    }

    #[tokio::test]
    async fn test_rejected_publish_keeps_previous_track() {
        let devices = MockMediaDevices::new();
        let switcher = switcher(&devices);
        let old = Arc::new(MockLocalTrack::new("MT-cam-1", TrackKind::Video));
        switcher.set_active(old.clone());

        let result = switcher.switch(TrackKind::Video, "cam-2", reject).await;

        assert!(matches!(result, Err(SyncError::Device(_))));
        assert!(!old.is_stopped());
        assert!(devices.created().first().unwrap().is_stopped());
        assert_eq!(
            switcher.active(TrackKind::Video).map(|t| t.id()),
            Some(TrackId::new("MT-cam-1"))
        );
        assert!(!switcher.is_switching(TrackKind::Video));
    }

    #[tokio::test]
    async fn test_overlapping_switch_is_dropped() {
        let devices = MockMediaDevices::new().gated();
        let switcher = switcher(&devices);

        let first = tokio::spawn({
            let switcher = switcher.clone();
            async move { switcher.switch(TrackKind::Video, "cam-2", accept).await }
        });
        wait_for_requests(&devices, 1).await;

        let second = switcher
            .switch(TrackKind::Video, "cam-3", accept)
            .await
            .unwrap();
        assert!(matches!(second, SwitchOutcome::Dropped));

        // A different kind is independent.
        assert!(!switcher.is_switching(TrackKind::Audio));

        devices.release(1);
        let first = first.await.unwrap().unwrap();
        assert!(matches!(first, SwitchOutcome::Switched(_)));
        assert_eq!(devices.request_count(), 1);
    }

    #[tokio::test]
    async fn test_switch_stays_in_flight_while_publishing() {
        let devices = MockMediaDevices::new();
        let switcher = switcher(&devices);
        let (published_tx, published_rx) = tokio::sync::oneshot::channel::<()>();

        let first = tokio::spawn({
            let switcher = switcher.clone();
            async move {
                switcher
                    .switch(TrackKind::Audio, "mic-2", |_track| async move {
                        let _ = published_rx.await;
                        Ok(())
                    })
                    .await
            }
        });
        wait_for_requests(&devices, 1).await;

        let second = switcher
            .switch(TrackKind::Audio, "mic-3", accept)
            .await
            .unwrap();
        assert!(matches!(second, SwitchOutcome::Dropped));

        published_tx.send(()).unwrap();
        let first = first.await.unwrap().unwrap();
        assert!(matches!(first, SwitchOutcome::Switched(_)));
        assert!(!switcher.is_switching(TrackKind::Audio));
    }

    #[tokio::test]
    async fn test_result_after_invalidate_is_discarded() {
        let devices = MockMediaDevices::new().gated();
        let switcher = switcher(&devices);
        let old = Arc::new(MockLocalTrack::new("MT-cam-1", TrackKind::Video));
        switcher.set_active(old.clone());

        let pending = tokio::spawn({
            let switcher = switcher.clone();
            async move { switcher.switch(TrackKind::Video, "cam-2", reject).await }
        });
        wait_for_requests(&devices, 1).await;
        switcher.invalidate();
        devices.release(1);

        // Superseded before publishing, so the rejecting publish never runs.
        let outcome = pending.await.unwrap().unwrap();

        assert!(matches!(outcome, SwitchOutcome::Superseded));
        assert!(devices.created().first().unwrap().is_stopped());
        assert!(!old.is_stopped());
        assert_eq!(
            switcher.active(TrackKind::Video).map(|t| t.id()),
            Some(TrackId::new("MT-cam-1"))
        );
    }

    #[tokio::test]
    async fn test_invalidate_during_publish_discards_result() {
        let devices = MockMediaDevices::new();
        let switcher = switcher(&devices);
        let old = Arc::new(MockLocalTrack::new("MT-cam-1", TrackKind::Video));
        switcher.set_active(old.clone());

        let outcome = switcher
            .switch(TrackKind::Video, "cam-2", |_track| {
                switcher.invalidate();
                async { Ok(()) }
            })
            .await
            .unwrap();

        assert!(matches!(outcome, SwitchOutcome::Superseded));
        assert!(devices.created().first().unwrap().is_stopped());
        assert!(!old.is_stopped());
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandoned_switch_clears_in_progress() {
        let devices = MockMediaDevices::new().gated();
        let switcher = switcher(&devices);

        let abandoned = tokio::time::timeout(
            Duration::from_millis(10),
            switcher.switch(TrackKind::Audio, "mic-2", accept),
        )
        .await;
        assert!(abandoned.is_err());
        assert!(!switcher.is_switching(TrackKind::Audio));

        devices.release(1);
        let outcome = switcher
            .switch(TrackKind::Audio, "mic-3", accept)
            .await
            .unwrap();
        assert!(matches!(outcome, SwitchOutcome::Switched(_)));
    }

    #[tokio::test]
    async fn test_data_kind_is_rejected() {
        let devices = MockMediaDevices::new();
        let switcher = switcher(&devices);

        let result = switcher.switch(TrackKind::Data, "any", accept).await;

        assert!(matches!(result, Err(SyncError::Device(_))));
        assert_eq!(devices.request_count(), 0);
    }

    #[tokio::test]
    async fn test_stop_all_releases_active_tracks() {
        let devices = MockMediaDevices::new();
        let switcher = switcher(&devices);
        let cam = Arc::new(MockLocalTrack::new("MT-cam-1", TrackKind::Video));
        let mic = Arc::new(MockLocalTrack::new("MT-mic-1", TrackKind::Audio));
        switcher.set_active(cam.clone());
        switcher.set_active(mic.clone());

        switcher.stop_all();

        assert!(cam.is_stopped());
        assert!(mic.is_stopped());
        assert!(switcher.active(TrackKind::Video).is_none());
    }
}
