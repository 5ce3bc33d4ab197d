//! `SynchronizerActor` - one per session, owns all session state.
//!
//! The actor is the single logical thread every session, track and protocol
//! event is applied on. It owns the participant registry, the reaction
//! timers and the dominant-speaker pointer; nothing is shared with other
//! sessions.
//!
//! # Teardown
//!
//! Teardown runs exactly once, whichever way the session ends (provider
//! disconnect, local disconnect, page termination, cancellation, every
//! handle dropped). It removes every participant, clears the dominant
//! pointer and the reaction timers, releases the side channel and then, last,
//! reports [`SessionUpdate::Disconnected`] with any provider error.

use crate::config::Config;
use crate::errors::SyncError;
use crate::observability::metrics;
use crate::reaction::{ReactionDecay, ReactionOverlay};
use crate::registry::ParticipantRegistry;

use super::messages::{SessionPhase, SessionState, SessionUpdate, SynchronizerMessage};

use bytes::Bytes;
use chrono::{DateTime, Utc};
use common::error::ProviderError;
use common::provider::{
    ConnectOptions, ConnectedSession, LocalTrack, ParticipantSnapshot, RenderTarget,
    SessionControl, SessionEvent, SessionProvider, SideChannel, TrackPublication,
};
use common::types::{ParticipantId, TrackId, TrackKind};
use signal_protocol::{
    decode_signal, encode_signal, MuteAction, ReactionVocabulary, SignalMessage,
};
use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Channel buffer size for the synchronizer mailbox.
const SYNCHRONIZER_CHANNEL_BUFFER: usize = 64;

/// How long teardown waits for room in the update channel to report the
/// final `Disconnected` update.
const FINAL_UPDATE_TIMEOUT: Duration = Duration::from_secs(1);

/// What the engine is given besides the provider.
pub struct SessionEnvironment {
    /// The one container participant nodes are rendered into.
    pub render_target: Box<dyn RenderTarget>,
    /// Local microphone, published on connect and the target of remote
    /// mute requests.
    pub local_audio: Option<Arc<dyn LocalTrack>>,
    /// Local camera, published on connect.
    pub local_video: Option<Arc<dyn LocalTrack>>,
    /// Local data track used to send signals.
    pub side_channel: Option<Arc<dyn SideChannel>>,
}

/// A connected session: the handle, the UI update stream and the actor task.
pub struct SessionRuntime {
    pub handle: SynchronizerHandle,
    pub updates: mpsc::Receiver<SessionUpdate>,
    pub task: JoinHandle<()>,
}

/// Handle to a `SynchronizerActor`.
#[derive(Debug, Clone)]
pub struct SynchronizerHandle {
    sender: mpsc::Sender<SynchronizerMessage>,
    cancel_token: CancellationToken,
    local_id: ParticipantId,
    phase: watch::Receiver<SessionPhase>,
}

impl SynchronizerHandle {
    /// The local participant's id.
    #[must_use]
    pub fn local_participant_id(&self) -> &ParticipantId {
        &self.local_id
    }

    /// Current lifecycle phase.
    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        *self.phase.borrow()
    }

    async fn request<T>(
        &self,
        message: impl FnOnce(oneshot::Sender<T>) -> SynchronizerMessage,
    ) -> Result<T, SyncError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(message(tx))
            .await
            .map_err(|_| SyncError::NotConnected)?;
        rx.await.map_err(|_| SyncError::NotConnected)
    }

    /// Snapshot the session.
    pub async fn get_state(&self) -> Result<SessionState, SyncError> {
        self.request(|respond_to| SynchronizerMessage::GetState { respond_to })
            .await
    }

    /// Broadcast a reaction from the configured vocabulary.
    pub async fn send_reaction(&self, symbol: impl Into<String>) -> Result<(), SyncError> {
        let symbol = symbol.into();
        self.request(|respond_to| SynchronizerMessage::SendReaction { symbol, respond_to })
            .await?
    }

    /// Ask `target` to mute or unmute its microphone.
    pub async fn request_mute(
        &self,
        target: ParticipantId,
        action: MuteAction,
    ) -> Result<(), SyncError> {
        self.request(|respond_to| SynchronizerMessage::RequestMute {
            target,
            action: Some(action),
            respond_to,
        })
        .await?
        .map(|_| ())
    }

    /// Send whatever `target`'s mute control currently offers: `Mute` while
    /// its audio is enabled, `Unmute` while disabled.
    pub async fn toggle_remote_mute(
        &self,
        target: ParticipantId,
    ) -> Result<MuteAction, SyncError> {
        self.request(|respond_to| SynchronizerMessage::RequestMute {
            target,
            action: None,
            respond_to,
        })
        .await?
    }

    /// Publish `track` in place of the current local track of its kind.
    pub async fn replace_local_track(&self, track: Arc<dyn LocalTrack>) -> Result<(), SyncError> {
        self.request(|respond_to| SynchronizerMessage::ReplaceLocalTrack { track, respond_to })
            .await?
    }

    /// Leave the session. Resolves once cleanup completed.
    ///
    /// # Errors
    ///
    /// `SyncError::NotConnected` if the session already ended.
    pub async fn disconnect(&self) -> Result<(), SyncError> {
        self.request(|respond_to| SynchronizerMessage::Disconnect { respond_to })
            .await
    }

    /// Report that the hosting page is going away.
    pub async fn page_terminating(&self, persisted: bool) -> Result<(), SyncError> {
        self.sender
            .send(SynchronizerMessage::PageTerminating { persisted })
            .await
            .map_err(|_| SyncError::NotConnected)
    }

    /// Cancel the actor; it disconnects and tears down.
    pub fn cancel(&self) {
        self.cancel_token.cancel();
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }
}

/// The `SynchronizerActor` implementation.
pub struct SynchronizerActor {
    room_name: String,
    local_id: ParticipantId,
    registry: ParticipantRegistry,
    reactions: ReactionDecay,
    vocabulary: ReactionVocabulary,
    /// Session events from the provider.
    events: mpsc::Receiver<SessionEvent>,
    /// Commands from handles.
    receiver: mpsc::Receiver<SynchronizerMessage>,
    control: Box<dyn SessionControl>,
    side_channel: Option<Arc<dyn SideChannel>>,
    local_audio: Option<Arc<dyn LocalTrack>>,
    local_video: Option<Arc<dyn LocalTrack>>,
    /// Dominant speaker reported before their join was applied.
    pending_dominant: Option<ParticipantId>,
    updates: mpsc::Sender<SessionUpdate>,
    phase: watch::Sender<SessionPhase>,
    cancel_token: CancellationToken,
    connected_at: DateTime<Utc>,
    disconnect_requested: bool,
    shutdown_waiters: Vec<oneshot::Sender<()>>,
    events_processed: u64,
}

impl SynchronizerActor {
    /// Connect to the room in `config` and spawn the actor.
    ///
    /// On failure nothing is retained; construct a new synchronizer to
    /// retry.
    ///
    /// # Errors
    ///
    /// `SyncError::Connection` if the provider fails to connect.
    pub async fn connect(
        provider: &dyn SessionProvider,
        config: &Config,
        environment: SessionEnvironment,
        cancel_token: CancellationToken,
    ) -> Result<SessionRuntime, SyncError> {
        info!(
            target: "session.sync",
            room = %config.room_name,
            "Connecting to room"
        );

        let options = ConnectOptions {
            room_name: config.room_name.clone(),
            dominant_speaker: config.dominant_speaker,
            local_tracks: [&environment.local_audio, &environment.local_video]
                .into_iter()
                .flatten()
                .map(|track| track.info())
                .collect(),
        };

        let ConnectedSession {
            local,
            participants,
            events,
            control,
        } = provider
            .connect(&config.credential, &options)
            .await
            .map_err(|e| {
                warn!(
                    target: "session.sync",
                    room = %config.room_name,
                    error = %e,
                    "Connect failed"
                );
                SyncError::Connection(e)
            })?;

        let (sender, receiver) = mpsc::channel(SYNCHRONIZER_CHANNEL_BUFFER);
        let (updates_tx, updates_rx) = mpsc::channel(config.event_buffer);
        let (phase_tx, phase_rx) = watch::channel(SessionPhase::Connected);
        let local_id = local.id.clone();

        let mut actor = Self {
            room_name: config.room_name.clone(),
            local_id: local_id.clone(),
            registry: ParticipantRegistry::new(environment.render_target),
            reactions: ReactionDecay::new(config.reaction_window),
            vocabulary: config.reactions.clone(),
            events,
            receiver,
            control,
            side_channel: environment.side_channel,
            local_audio: environment.local_audio,
            local_video: environment.local_video,
            pending_dominant: None,
            updates: updates_tx,
            phase: phase_tx,
            cancel_token: cancel_token.clone(),
            connected_at: Utc::now(),
            disconnect_requested: false,
            shutdown_waiters: Vec::new(),
            events_processed: 0,
        };

        // Join events only cover participants connecting from now on, so
        // everyone already present is enumerated here.
        actor.add_participant(local, true);
        for participant in participants {
            actor.add_participant(participant, false);
        }

        info!(
            target: "session.sync",
            room = %actor.room_name,
            local_id = %local_id,
            participants = actor.registry.len(),
            phase = %SessionPhase::Connected,
            "Connected to room"
        );

        let task = tokio::spawn(actor.run());
        let handle = SynchronizerHandle {
            sender,
            cancel_token,
            local_id,
            phase: phase_rx,
        };

        Ok(SessionRuntime {
            handle,
            updates: updates_rx,
            task,
        })
    }

    /// Run the actor loop until the session ends, then tear down.
    #[instrument(
        skip_all,
        name = "session.sync",
        fields(room = %self.room_name, local_id = %self.local_id)
    )]
    async fn run(mut self) {
        let error = loop {
            tokio::select! {
                biased;

                () = self.cancel_token.cancelled() => {
                    info!(
                        target: "session.sync",
                        "Synchronizer received cancellation signal"
                    );
                    self.request_disconnect();
                    break None;
                }

                event = self.events.recv() => {
                    let Some(event) = event else {
                        warn!(
                            target: "session.sync",
                            "Session event stream closed"
                        );
                        break Some(ProviderError::Closed);
                    };
                    self.events_processed += 1;
                    if let ControlFlow::Break(error) = self.handle_event(event) {
                        break error;
                    }
                }

                msg = self.receiver.recv() => {
                    let Some(message) = msg else {
                        info!(
                            target: "session.sync",
                            "All handles dropped, disconnecting"
                        );
                        self.request_disconnect();
                        break None;
                    };
                    if self.handle_message(message).is_break() {
                        break None;
                    }
                }

                Some(participant_id) = self.reactions.next_expired(), if !self.reactions.is_idle() => {
                    self.on_reaction_expired(&participant_id);
                }
            }
        };

        self.teardown(error).await;
    }

    fn handle_event(&mut self, event: SessionEvent) -> ControlFlow<Option<ProviderError>> {
        metrics::record_session_event(event.name());
        debug!(
            target: "session.sync",
            event = event.name(),
            "Session event"
        );

        match event {
            SessionEvent::ParticipantJoined(snapshot) => {
                self.add_participant(snapshot, false);
            }
            SessionEvent::ParticipantLeft(participant_id) => {
                self.remove_participant(&participant_id);
            }
            SessionEvent::TrackPublished {
                participant_id,
                publication,
            } => {
                self.track_mute(&participant_id, |registry, id| {
                    registry.on_track_published(id, publication);
                });
            }
            SessionEvent::TrackUnpublished {
                participant_id,
                track_id,
            } => {
                self.track_mute(&participant_id, |registry, id| {
                    registry.on_track_unpublished(id, &track_id);
                });
            }
            SessionEvent::TrackSubscribed {
                participant_id,
                track,
            } => {
                self.track_mute(&participant_id, |registry, id| {
                    registry.on_track_subscribed(id, track);
                });
            }
            SessionEvent::TrackUnsubscribed {
                participant_id,
                track_id,
            } => {
                self.track_mute(&participant_id, |registry, id| {
                    registry.on_track_unsubscribed(id, &track_id);
                });
            }
            SessionEvent::TrackEnabled {
                participant_id,
                track_id,
            } => {
                self.track_mute(&participant_id, |registry, id| {
                    registry.set_track_enabled(id, &track_id, true);
                });
            }
            SessionEvent::TrackDisabled {
                participant_id,
                track_id,
            } => {
                self.track_mute(&participant_id, |registry, id| {
                    registry.set_track_enabled(id, &track_id, false);
                });
            }
            SessionEvent::DominantSpeakerChanged(speaker) => {
                self.on_dominant_speaker(speaker);
            }
            SessionEvent::Message {
                participant_id,
                track_id,
                payload,
            } => {
                self.on_message(&participant_id, &track_id, &payload);
            }
            SessionEvent::Disconnected(error) => return ControlFlow::Break(error),
        }
        ControlFlow::Continue(())
    }

    fn handle_message(&mut self, message: SynchronizerMessage) -> ControlFlow<()> {
        match message {
            SynchronizerMessage::GetState { respond_to } => {
                let _ = respond_to.send(self.get_state());
            }

            SynchronizerMessage::SendReaction { symbol, respond_to } => {
                let _ = respond_to.send(self.send_reaction(symbol));
            }

            SynchronizerMessage::RequestMute {
                target,
                action,
                respond_to,
            } => {
                let _ = respond_to.send(self.request_mute(&target, action));
            }

            SynchronizerMessage::ReplaceLocalTrack { track, respond_to } => {
                let _ = respond_to.send(self.replace_local_track(track));
            }

            SynchronizerMessage::Disconnect { respond_to } => {
                self.shutdown_waiters.push(respond_to);
                self.request_disconnect();
                return ControlFlow::Break(());
            }

            SynchronizerMessage::PageTerminating { persisted } => {
                if persisted {
                    debug!(
                        target: "session.sync",
                        "Page cached for back navigation, keeping session"
                    );
                } else {
                    info!(
                        target: "session.sync",
                        "Page terminating, disconnecting"
                    );
                    self.request_disconnect();
                    return ControlFlow::Break(());
                }
            }
        }
        ControlFlow::Continue(())
    }

    fn add_participant(&mut self, snapshot: ParticipantSnapshot, is_local: bool) {
        let participant_id = snapshot.id.clone();
        if !self.registry.add(snapshot, is_local) {
            return;
        }
        if let Some(info) = self.registry.info(&participant_id) {
            self.emit(SessionUpdate::ParticipantAdded(info));
        }
        self.emit(SessionUpdate::LayoutChanged(self.registry.layout()));

        if self.pending_dominant.as_ref() == Some(&participant_id) {
            self.pending_dominant = None;
            if self.registry.set_dominant(&participant_id) {
                self.emit(SessionUpdate::DominantSpeakerChanged(Some(participant_id)));
            }
        }
    }

    fn remove_participant(&mut self, participant_id: &ParticipantId) {
        if self.pending_dominant.as_ref() == Some(participant_id) {
            self.pending_dominant = None;
        }
        if !self.registry.remove(participant_id) {
            debug!(
                target: "session.sync",
                participant_id = %participant_id,
                "Ignoring leave for unknown participant"
            );
            return;
        }
        self.reactions.clear(participant_id);
        self.emit(SessionUpdate::ParticipantRemoved(participant_id.clone()));
        self.emit(SessionUpdate::LayoutChanged(self.registry.layout()));
    }

    /// Apply a registry mutation and report a changed muted indicator.
    fn track_mute(
        &mut self,
        participant_id: &ParticipantId,
        apply: impl FnOnce(&mut ParticipantRegistry, &ParticipantId),
    ) {
        let before = self.registry.audio_muted(participant_id);
        apply(&mut self.registry, participant_id);
        let after = self.registry.audio_muted(participant_id);

        if let (Some(before), Some(muted)) = (before, after) {
            if before != muted {
                self.emit(SessionUpdate::MuteChanged {
                    participant_id: participant_id.clone(),
                    muted,
                });
            }
        }
    }

    fn on_dominant_speaker(&mut self, speaker: Option<ParticipantId>) {
        // No dominant speaker means the local participant holds the highlight.
        let holder = speaker.unwrap_or_else(|| self.local_id.clone());
        if !self.registry.contains(&holder) {
            debug!(
                target: "session.sync",
                participant_id = %holder,
                "Dominant speaker has not joined yet, holding highlight until join"
            );
            self.pending_dominant = Some(holder);
            if self.registry.clear_dominant().is_some() {
                self.emit(SessionUpdate::DominantSpeakerChanged(None));
            }
            return;
        }
        self.pending_dominant = None;
        if self.registry.set_dominant(&holder) {
            self.emit(SessionUpdate::DominantSpeakerChanged(Some(holder)));
        }
    }

    fn on_message(&mut self, sender: &ParticipantId, track_id: &TrackId, payload: &Bytes) {
        if !self.registry.is_listening(sender, track_id) {
            metrics::record_signal_dropped("not_listening");
            debug!(
                target: "session.sync",
                participant_id = %sender,
                track_id = %track_id,
                "Dropping message from unsubscribed data track"
            );
            return;
        }

        let message = match decode_signal(payload) {
            Ok(message) => message,
            Err(e) => {
                metrics::record_signal_dropped(e.reason());
                debug!(
                    target: "session.sync",
                    participant_id = %sender,
                    error = %e,
                    "Dropping malformed signal"
                );
                return;
            }
        };
        metrics::record_signal_received(message.action());

        match message {
            SignalMessage::Reaction { reaction } => self.on_reaction(sender, &reaction),
            SignalMessage::Mute { participant_sid } => {
                self.on_mute_request(sender, &participant_sid, MuteAction::Mute);
            }
            SignalMessage::Unmute { participant_sid } => {
                self.on_mute_request(sender, &participant_sid, MuteAction::Unmute);
            }
        }
    }

    fn on_reaction(&mut self, sender: &ParticipantId, symbol: &str) {
        if !self.vocabulary.contains(symbol) {
            metrics::record_signal_dropped("unknown_reaction");
            debug!(
                target: "session.sync",
                participant_id = %sender,
                "Dropping reaction outside the vocabulary"
            );
            return;
        }

        let overlay = self.reactions.on_signal(sender, symbol);
        self.registry.set_reaction(sender, overlay.clone());
        self.emit(SessionUpdate::ReactionChanged {
            participant_id: sender.clone(),
            reaction: overlay,
        });
    }

    fn on_reaction_expired(&mut self, participant_id: &ParticipantId) {
        if self
            .registry
            .set_reaction(participant_id, ReactionOverlay::empty())
        {
            self.emit(SessionUpdate::ReactionChanged {
                participant_id: participant_id.clone(),
                reaction: ReactionOverlay::empty(),
            });
        }
    }

    /// Apply a remote mute request if it targets us and changes our state.
    ///
    /// The sender is not checked: any participant may mute any other.
    fn on_mute_request(
        &mut self,
        sender: &ParticipantId,
        target: &ParticipantId,
        action: MuteAction,
    ) {
        if target != &self.local_id {
            return;
        }
        let Some(audio) = self.local_audio.clone() else {
            debug!(
                target: "session.sync",
                participant_id = %sender,
                "Ignoring mute request, no local audio"
            );
            return;
        };

        let enabled = match (action, audio.is_enabled()) {
            (MuteAction::Mute, true) => {
                audio.disable();
                false
            }
            (MuteAction::Unmute, false) => {
                audio.enable();
                true
            }
            _ => {
                debug!(
                    target: "session.sync",
                    participant_id = %sender,
                    action = action.as_str(),
                    "Mute request does not change state"
                );
                return;
            }
        };

        info!(
            target: "session.sync",
            participant_id = %sender,
            action = action.as_str(),
            "Applied remote mute request"
        );
        let local_id = self.local_id.clone();
        let track_id = audio.id();
        self.track_mute(&local_id, |registry, id| {
            registry.set_track_enabled(id, &track_id, enabled);
        });
        self.emit(SessionUpdate::LocalAudioChanged { enabled });
    }

    fn get_state(&self) -> SessionState {
        SessionState {
            phase: *self.phase.borrow(),
            room_name: self.room_name.clone(),
            local_participant_id: self.local_id.clone(),
            participants: self.registry.infos(),
            layout: self.registry.layout(),
            dominant_speaker: self.registry.dominant().cloned(),
            connected_at: self.connected_at,
        }
    }

    fn send_reaction(&self, symbol: String) -> Result<(), SyncError> {
        if !self.vocabulary.contains(&symbol) {
            return Err(SyncError::UnknownReaction(symbol));
        }
        self.send_signal(&SignalMessage::Reaction { reaction: symbol })
    }

    fn request_mute(
        &self,
        target: &ParticipantId,
        action: Option<MuteAction>,
    ) -> Result<MuteAction, SyncError> {
        if target == &self.local_id {
            return Err(SyncError::InvalidTarget(
                "Cannot send a mute request to yourself".to_string(),
            ));
        }
        let muted = self
            .registry
            .audio_muted(target)
            .ok_or_else(|| SyncError::ParticipantNotFound(target.to_string()))?;

        let action = action.unwrap_or(MuteAction::for_target_state(muted));
        self.send_signal(&SignalMessage::mute_request(action, target.clone()))?;
        Ok(action)
    }

    fn send_signal(&self, message: &SignalMessage) -> Result<(), SyncError> {
        let side_channel = self
            .side_channel
            .as_ref()
            .ok_or_else(|| SyncError::SideChannel("no local data track".to_string()))?;
        let payload = encode_signal(message).map_err(|e| SyncError::Internal(e.to_string()))?;
        side_channel
            .send(payload)
            .map_err(|e| SyncError::SideChannel(e.to_string()))?;

        debug!(
            target: "session.sync",
            action = message.action(),
            "Signal sent"
        );
        Ok(())
    }

    fn replace_local_track(&mut self, track: Arc<dyn LocalTrack>) -> Result<(), SyncError> {
        let kind = track.kind();
        let current = match kind {
            TrackKind::Audio => self.local_audio.clone(),
            TrackKind::Video => self.local_video.clone(),
            TrackKind::Data => {
                return Err(SyncError::InvalidTarget(
                    "Data tracks cannot be replaced".to_string(),
                ))
            }
        };

        // A remotely muted microphone stays muted across a device switch.
        // The new track is left untouched until the publish succeeds.
        let carry_mute = kind == TrackKind::Audio
            && track.is_enabled()
            && current.as_ref().is_some_and(|current| !current.is_enabled());

        let mut info = track.info();
        if carry_mute {
            info.enabled = false;
        }
        self.control
            .publish_track(&info)
            .map_err(SyncError::Device)?;
        if carry_mute {
            track.disable();
        }

        let local_id = self.local_id.clone();
        match &current {
            Some(current) => {
                let old = current.id();
                self.control.unpublish_track(&old);
                self.track_mute(&local_id, |registry, _| {
                    registry.replace_local_track(&old, info);
                });
            }
            None => {
                let publication = TrackPublication {
                    track_id: info.id.clone(),
                    kind,
                    track: Some(info),
                };
                self.track_mute(&local_id, |registry, id| {
                    registry.on_track_published(id, publication);
                });
            }
        }

        info!(
            target: "session.sync",
            kind = %kind,
            track_id = %track.id(),
            "Local track replaced"
        );
        match kind {
            TrackKind::Audio => self.local_audio = Some(track),
            _ => self.local_video = Some(track),
        }
        Ok(())
    }

    /// Ask the provider to end the session, at most once.
    fn request_disconnect(&mut self) {
        if self.disconnect_requested {
            return;
        }
        self.disconnect_requested = true;
        self.control.disconnect();
    }

    fn emit(&self, update: SessionUpdate) {
        if let Err(e) = self.updates.try_send(update) {
            metrics::record_update_dropped();
            debug!(
                target: "session.sync",
                error = %e,
                "Dropping session update"
            );
        }
    }

    /// Cleanup runs unconditionally; the error is reported only afterwards.
    async fn teardown(&mut self, error: Option<ProviderError>) {
        let removed = self.registry.clear();
        self.pending_dominant = None;
        self.reactions.clear_all();
        self.side_channel = None;
        self.receiver.close();
        self.phase.send_replace(SessionPhase::Disconnected);

        match &error {
            Some(e) => warn!(
                target: "session.sync",
                error = %e,
                removed,
                events_processed = self.events_processed,
                "Session disconnected with error"
            ),
            None => info!(
                target: "session.sync",
                removed,
                events_processed = self.events_processed,
                "Session disconnected"
            ),
        }

        let update = SessionUpdate::Disconnected { error };
        let delivered = tokio::time::timeout(FINAL_UPDATE_TIMEOUT, self.updates.send(update)).await;
        if !matches!(delivered, Ok(Ok(()))) {
            metrics::record_update_dropped();
            warn!(
                target: "session.sync",
                "Could not deliver disconnect update"
            );
        }

        for waiter in self.shutdown_waiters.drain(..) {
            let _ = waiter.send(());
        }
    }
}
