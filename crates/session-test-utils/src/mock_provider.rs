//! Session provider and session control mocks.
//!
//! The provider pre-creates the event channel so tests can grab the sender
//! before connecting and inject events afterwards.
//!
//! # Example
//!
//! ```rust,ignore
//! use session_test_utils::{MockSessionProvider, TestParticipant};
//!
//! let provider = MockSessionProvider::builder()
//!     .local(TestParticipant::new("alice").with_audio())
//!     .participant(TestParticipant::new("bob"))
//!     .build();
//! let events = provider.event_sender();
//! // connect, then:
//! events.send(SessionEvent::ParticipantLeft(bob.id())).await.unwrap();
//! ```

use async_trait::async_trait;
use common::error::ProviderError;
use common::provider::{
    ConnectOptions, ConnectedSession, SessionControl, SessionEvent, SessionProvider, TrackInfo,
};
use common::secret::{ExposeSecret, SecretString};
use common::types::TrackId;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

use crate::fixtures::TestParticipant;

/// Default capacity of the mock event channel.
const EVENT_BUFFER: usize = 64;

/// Mock session provider; clones share state.
#[derive(Debug, Clone)]
pub struct MockSessionProvider {
    inner: Arc<ProviderInner>,
}

#[derive(Debug)]
struct ProviderInner {
    local: TestParticipant,
    participants: Vec<TestParticipant>,
    failure: Option<ProviderError>,
    events_tx: mpsc::Sender<SessionEvent>,
    events_rx: Mutex<Option<mpsc::Receiver<SessionEvent>>>,
    control: MockSessionControl,
    connects: AtomicUsize,
    last_options: Mutex<Option<ConnectOptions>>,
    last_credential: Mutex<Option<String>>,
}

/// Builder for [`MockSessionProvider`].
#[derive(Debug)]
pub struct MockSessionProviderBuilder {
    local: TestParticipant,
    participants: Vec<TestParticipant>,
    failure: Option<ProviderError>,
}

impl Default for MockSessionProviderBuilder {
    fn default() -> Self {
        Self {
            local: TestParticipant::new("local"),
            participants: Vec::new(),
            failure: None,
        }
    }
}

impl MockSessionProviderBuilder {
    /// Set the local participant.
    #[must_use]
    pub fn local(mut self, local: TestParticipant) -> Self {
        self.local = local;
        self
    }

    /// Add a remote participant already present at connect time.
    #[must_use]
    pub fn participant(mut self, participant: TestParticipant) -> Self {
        self.participants.push(participant);
        self
    }

    /// Make `connect` fail with `error`.
    #[must_use]
    pub fn failing(mut self, error: ProviderError) -> Self {
        self.failure = Some(error);
        self
    }

    /// Build the provider.
    #[must_use]
    pub fn build(self) -> MockSessionProvider {
        let (events_tx, events_rx) = mpsc::channel(EVENT_BUFFER);
        let control = MockSessionControl::new(events_tx.clone());
        MockSessionProvider {
            inner: Arc::new(ProviderInner {
                local: self.local,
                participants: self.participants,
                failure: self.failure,
                events_tx,
                events_rx: Mutex::new(Some(events_rx)),
                control,
                connects: AtomicUsize::new(0),
                last_options: Mutex::new(None),
                last_credential: Mutex::new(None),
            }),
        }
    }
}

impl MockSessionProvider {
    /// Create a new builder.
    #[must_use]
    pub fn builder() -> MockSessionProviderBuilder {
        MockSessionProviderBuilder::default()
    }

    /// Sender for injecting session events.
    pub fn event_sender(&self) -> mpsc::Sender<SessionEvent> {
        self.inner.events_tx.clone()
    }

    /// The control surface handed out on connect.
    pub fn control(&self) -> MockSessionControl {
        self.inner.control.clone()
    }

    /// Number of connect attempts.
    pub fn connect_count(&self) -> usize {
        self.inner.connects.load(Ordering::SeqCst)
    }

    /// Options passed to the last connect attempt.
    pub fn last_options(&self) -> Option<ConnectOptions> {
        self.inner.last_options.lock().unwrap().clone()
    }

    /// Credential passed to the last connect attempt.
    pub fn last_credential(&self) -> Option<String> {
        self.inner.last_credential.lock().unwrap().clone()
    }
}

#[async_trait]
impl SessionProvider for MockSessionProvider {
    async fn connect(
        &self,
        credential: &SecretString,
        options: &ConnectOptions,
    ) -> Result<ConnectedSession, ProviderError> {
        self.inner.connects.fetch_add(1, Ordering::SeqCst);
        *self.inner.last_options.lock().unwrap() = Some(options.clone());
        *self.inner.last_credential.lock().unwrap() = Some(credential.expose_secret().to_string());

        if let Some(error) = &self.inner.failure {
            return Err(error.clone());
        }

        let events = self
            .inner
            .events_rx
            .lock()
            .unwrap()
            .take()
            .ok_or(ProviderError::Closed)?;

        Ok(ConnectedSession {
            local: self.inner.local.snapshot(),
            participants: self
                .inner
                .participants
                .iter()
                .map(TestParticipant::snapshot)
                .collect(),
            events,
            control: Box::new(self.inner.control.clone()),
        })
    }
}

/// Mock session control; clones share state.
///
/// `disconnect` answers with [`SessionEvent::Disconnected`] on the event
/// channel, like a real provider does.
#[derive(Debug, Clone)]
pub struct MockSessionControl {
    inner: Arc<Mutex<ControlState>>,
}

#[derive(Debug)]
struct ControlState {
    events: mpsc::Sender<SessionEvent>,
    disconnects: usize,
    published: Vec<TrackInfo>,
    unpublished: Vec<TrackId>,
    fail_publish: bool,
}

impl MockSessionControl {
    fn new(events: mpsc::Sender<SessionEvent>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ControlState {
                events,
                disconnects: 0,
                published: Vec::new(),
                unpublished: Vec::new(),
                fail_publish: false,
            })),
        }
    }

    /// Number of disconnect requests.
    pub fn disconnect_count(&self) -> usize {
        self.inner.lock().unwrap().disconnects
    }

    /// Tracks published after connect.
    pub fn published(&self) -> Vec<TrackInfo> {
        self.inner.lock().unwrap().published.clone()
    }

    /// Tracks unpublished after connect.
    pub fn unpublished(&self) -> Vec<TrackId> {
        self.inner.lock().unwrap().unpublished.clone()
    }

    /// Make `publish_track` fail.
    pub fn set_fail_publish(&self, fail: bool) {
        self.inner.lock().unwrap().fail_publish = fail;
    }
}

impl SessionControl for MockSessionControl {
    fn disconnect(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.disconnects += 1;
        let _ = inner.events.try_send(SessionEvent::Disconnected(None));
    }

    fn publish_track(&self, track: &TrackInfo) -> Result<(), ProviderError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.fail_publish {
            return Err(ProviderError::Transport("publish rejected".to_string()));
        }
        inner.published.push(track.clone());
        Ok(())
    }

    fn unpublish_track(&self, track_id: &TrackId) {
        self.inner.lock().unwrap().unpublished.push(track_id.clone());
    }
}
