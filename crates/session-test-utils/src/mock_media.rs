//! Local track, media device and side channel mocks.

use async_trait::async_trait;
use bytes::Bytes;
use common::error::ProviderError;
use common::provider::{LocalTrack, MediaDevices, SideChannel, TrackInfo};
use common::types::{TrackId, TrackKind};
use signal_protocol::{decode_signal, SignalMessage};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;

/// Mock local camera/microphone track.
#[derive(Debug)]
pub struct MockLocalTrack {
    id: TrackId,
    kind: TrackKind,
    enabled: AtomicBool,
    stopped: AtomicBool,
    enables: AtomicUsize,
    disables: AtomicUsize,
}

impl MockLocalTrack {
    /// Create an enabled track.
    #[must_use]
    pub fn new(id: impl Into<String>, kind: TrackKind) -> Self {
        Self {
            id: TrackId::new(id),
            kind,
            enabled: AtomicBool::new(true),
            stopped: AtomicBool::new(false),
            enables: AtomicUsize::new(0),
            disables: AtomicUsize::new(0),
        }
    }

    /// Create a track matching `info`.
    #[must_use]
    pub fn from_info(info: &TrackInfo) -> Self {
        let track = Self::new(info.id.as_str(), info.kind);
        track.enabled.store(info.enabled, Ordering::SeqCst);
        track
    }

    /// Number of `enable` calls.
    pub fn enable_count(&self) -> usize {
        self.enables.load(Ordering::SeqCst)
    }

    /// Number of `disable` calls.
    pub fn disable_count(&self) -> usize {
        self.disables.load(Ordering::SeqCst)
    }

    /// Whether `stop` was called.
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

impl LocalTrack for MockLocalTrack {
    fn id(&self) -> TrackId {
        self.id.clone()
    }

    fn kind(&self) -> TrackKind {
        self.kind
    }

    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    fn enable(&self) {
        self.enables.fetch_add(1, Ordering::SeqCst);
        self.enabled.store(true, Ordering::SeqCst);
    }

    fn disable(&self) {
        self.disables.fetch_add(1, Ordering::SeqCst);
        self.enabled.store(false, Ordering::SeqCst);
    }

    fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }
}

/// Mock media devices; clones share state.
///
/// In gated mode every `create_track` waits for [`MockMediaDevices::release`],
/// which lets tests interleave overlapping device switches.
#[derive(Debug, Clone, Default)]
pub struct MockMediaDevices {
    inner: Arc<Mutex<DevicesState>>,
}

#[derive(Debug, Default)]
struct DevicesState {
    failing: HashSet<String>,
    gate: Option<Arc<Semaphore>>,
    created: Vec<Arc<MockLocalTrack>>,
    requests: usize,
}

impl MockMediaDevices {
    /// Create devices that always succeed immediately.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make acquisition of `device_id` fail.
    #[must_use]
    pub fn failing_device(self, device_id: &str) -> Self {
        self.inner
            .lock()
            .unwrap()
            .failing
            .insert(device_id.to_string());
        self
    }

    /// Hold every acquisition until released.
    #[must_use]
    pub fn gated(self) -> Self {
        self.inner.lock().unwrap().gate = Some(Arc::new(Semaphore::new(0)));
        self
    }

    /// Let `n` held acquisitions complete.
    pub fn release(&self, n: usize) {
        if let Some(gate) = &self.inner.lock().unwrap().gate {
            gate.add_permits(n);
        }
    }

    /// Tracks created so far, oldest first.
    pub fn created(&self) -> Vec<Arc<MockLocalTrack>> {
        self.inner.lock().unwrap().created.clone()
    }

    /// Number of `create_track` calls.
    pub fn request_count(&self) -> usize {
        self.inner.lock().unwrap().requests
    }
}

#[async_trait]
impl MediaDevices for MockMediaDevices {
    async fn create_track(
        &self,
        kind: TrackKind,
        device_id: &str,
    ) -> Result<Arc<dyn LocalTrack>, ProviderError> {
        let gate = {
            let mut inner = self.inner.lock().unwrap();
            inner.requests += 1;
            inner.gate.clone()
        };
        if let Some(gate) = gate {
            gate.acquire().await.unwrap().forget();
        }

        let mut inner = self.inner.lock().unwrap();
        if inner.failing.contains(device_id) {
            return Err(ProviderError::DeviceUnavailable(device_id.to_string()));
        }
        let track = Arc::new(MockLocalTrack::new(
            format!("MT-local-{}-{device_id}", kind.as_str()),
            kind,
        ));
        inner.created.push(track.clone());
        Ok(track)
    }
}

/// Mock side channel; clones share state.
#[derive(Debug, Clone, Default)]
pub struct MockSideChannel {
    inner: Arc<Mutex<SideChannelState>>,
}

#[derive(Debug, Default)]
struct SideChannelState {
    sent: Vec<Bytes>,
    failing: bool,
}

impl MockSideChannel {
    /// Create a working side channel.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every send fail.
    pub fn set_failing(&self, failing: bool) {
        self.inner.lock().unwrap().failing = failing;
    }

    /// Raw payloads sent, oldest first.
    pub fn sent(&self) -> Vec<Bytes> {
        self.inner.lock().unwrap().sent.clone()
    }

    /// Sent payloads decoded as signal messages.
    pub fn sent_signals(&self) -> Vec<SignalMessage> {
        self.sent()
            .iter()
            .map(|payload| decode_signal(payload).unwrap())
            .collect()
    }
}

impl SideChannel for MockSideChannel {
    fn send(&self, payload: Bytes) -> Result<(), ProviderError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.failing {
            return Err(ProviderError::Transport("data track closed".to_string()));
        }
        inner.sent.push(payload);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_track_counts_transitions() {
        let track = MockLocalTrack::new("MT1", TrackKind::Audio);
        track.disable();
        track.enable();
        assert_eq!(track.disable_count(), 1);
        assert_eq!(track.enable_count(), 1);
        assert!(track.is_enabled());
    }

    #[tokio::test]
    async fn test_failing_device() {
        let devices = MockMediaDevices::new().failing_device("cam-2");
        let result = devices.create_track(TrackKind::Video, "cam-2").await;
        assert!(matches!(result, Err(ProviderError::DeviceUnavailable(_))));
    }

    #[tokio::test]
    async fn test_side_channel_records_payloads() {
        let channel = MockSideChannel::new();
        channel
            .send(Bytes::from_static(br#"{"action":"reaction","reaction":"x"}"#))
            .unwrap();
        assert_eq!(channel.sent_signals().len(), 1);

        channel.set_failing(true);
        assert!(channel.send(Bytes::new()).is_err());
    }
}
