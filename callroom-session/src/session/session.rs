use std::future;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

// Internal imports
use crate::config::SessionConfig;
use crate::error::{NegotiationError, ScreenShareError, SessionError};
use crate::media::{
    MediaDevices, MediaStream, MediaTrack, ScreenShare, TrackSource, acquire_local_media,
};
use crate::session::{
    CallHandle, MediaState, PhaseTracker, SessionCommand, SessionEvent, SessionSnapshot,
    TeardownGuard,
};
use crate::signaling::{
    ChangeKind, NegotiationStep, RoomChange, SignalingBridge, SignalingRelay, Subscription,
};
use crate::transport::{
    CandidateBuffer, PeerConnection, PeerConnectionFactory, PeerState, RemoteTrack,
    TransportEvent,
};
use callroom_core::{
    ConnectionPhase, IceCandidate, ParticipantId, Role, RoomId, SdpType, compute_role,
};

const TRANSPORT_BUFFER: usize = 256;

/// Everything needed to run one call.
pub struct SessionSetup {
    pub room_id: RoomId,
    pub local_id: ParticipantId,
    pub remote_id: ParticipantId,
    pub config: SessionConfig,
    pub relay: Arc<dyn SignalingRelay>,
    pub devices: Arc<dyn MediaDevices>,
    pub factory: Arc<dyn PeerConnectionFactory>,
}

/// Actor owning all state of one call between two participants.
///
/// Built with [`CallSession::new`] and driven by [`CallSession::run`], which
/// must be spawned onto a tokio runtime. The paired [`CallHandle`] is the
/// only way to talk to it; dropping the handle ends the call.
pub struct CallSession {
    room_id: RoomId,
    role: Role,
    config: SessionConfig,

    devices: Arc<dyn MediaDevices>,
    factory: Arc<dyn PeerConnectionFactory>,
    bridge: SignalingBridge,

    phase: PhaseTracker,
    guard: TeardownGuard,

    /// Commands from the handle.
    command_rx: mpsc::Receiver<SessionCommand>,

    /// Notifications to the application.
    event_tx: mpsc::UnboundedSender<SessionEvent>,

    /// Kept so the receiver never closes while no connection exists.
    transport_tx: mpsc::Sender<TransportEvent>,
    transport_rx: mpsc::Receiver<TransportEvent>,

    peer: Option<Arc<dyn PeerConnection>>,
    local_stream: Option<MediaStream>,
    remote_stream: Option<MediaStream>,
    buffer: CandidateBuffer,
    screen: ScreenShare,
    media: MediaState,

    room_sub: Option<Subscription<RoomChange>>,
    candidate_sub: Option<Subscription<IceCandidate>>,
    /// Set once the room record has been deleted; nothing is published after.
    room_removed: bool,
    deadline: Option<Instant>,
}

impl CallSession {
    pub fn new(setup: SessionSetup) -> (Self, CallHandle) {
        let role = compute_role(&setup.local_id, &setup.remote_id);
        let (command_tx, command_rx) = mpsc::channel(setup.config.command_buffer.max(1));
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (transport_tx, transport_rx) = mpsc::channel(TRANSPORT_BUFFER);

        let phase = PhaseTracker::new();
        let handle = CallHandle::new(
            setup.room_id.clone(),
            role,
            command_tx,
            phase.subscribe(),
            event_rx,
        );

        let session = Self {
            bridge: SignalingBridge::new(setup.relay, setup.room_id.clone(), role),
            room_id: setup.room_id,
            role,
            guard: TeardownGuard::new(setup.config.teardown_cooldown()),
            config: setup.config,
            devices: setup.devices,
            factory: setup.factory,
            phase,
            command_rx,
            event_tx,
            transport_tx,
            transport_rx,
            peer: None,
            local_stream: None,
            remote_stream: None,
            buffer: CandidateBuffer::new(),
            screen: ScreenShare::default(),
            media: MediaState::default(),
            room_sub: None,
            candidate_sub: None,
            room_removed: false,
            deadline: None,
        };

        (session, handle)
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// Runs the call until it is torn down.
    pub async fn run(mut self) {
        info!(
            "Call session for {} started as {:?}",
            self.room_id.path(),
            self.role
        );

        self.start().await;

        loop {
            let screen_track = self.screen.active_track().cloned();

            tokio::select! {
                cmd = self.command_rx.recv() => {
                    match cmd {
                        Some(c) => self.handle_command(c).await,
                        None => {
                            info!("Call handle dropped. Ending session.");
                            self.teardown().await;
                            break;
                        }
                    }
                }

                Some(evt) = self.transport_rx.recv() => {
                    self.handle_transport_event(evt).await;
                }

                change = next_item(&mut self.room_sub) => {
                    match change {
                        Some(c) => self.handle_room_change(c).await,
                        None => {
                            debug!("Room subscription ended");
                            self.room_sub = None;
                        }
                    }
                }

                candidate = next_item(&mut self.candidate_sub) => {
                    match candidate {
                        Some(c) => self.handle_remote_candidate(c).await,
                        None => {
                            debug!("Candidate subscription ended");
                            self.candidate_sub = None;
                        }
                    }
                }

                _ = track_ended(screen_track) => {
                    info!("Screen capture ended by the platform");
                    self.stop_screen_share().await;
                }

                _ = deadline_elapsed(self.deadline) => {
                    self.on_negotiation_timeout();
                }
            }

            if self.phase.current() == ConnectionPhase::Closed {
                break;
            }
        }

        info!("Call session for {} finished", self.room_id.path());
    }

    async fn start(&mut self) {
        self.set_phase(ConnectionPhase::AcquiringMedia);

        let stream = match acquire_local_media(self.devices.as_ref()).await {
            Ok(stream) => stream,
            Err(e) => {
                self.fail(e.into());
                return;
            }
        };
        self.local_stream = Some(stream.clone());
        self.emit(SessionEvent::LocalPreview(stream));
        self.emit(SessionEvent::MediaStateChanged(self.media));

        self.set_phase(ConnectionPhase::Negotiating);
        self.deadline = self
            .config
            .negotiation_timeout()
            .map(|timeout| Instant::now() + timeout);

        if let Err(e) = self.negotiate().await {
            self.fail(e.into());
        }
    }

    /// Creates the connection, attaches every local track, then starts the
    /// role's side of the exchange.
    async fn negotiate(&mut self) -> Result<(), NegotiationError> {
        let pc = self
            .factory
            .create(&self.config.transport_config(), self.transport_tx.clone())
            .await
            .map_err(NegotiationError::Setup)?;
        self.peer = Some(pc.clone());

        if let Some(stream) = &self.local_stream {
            for track in stream.tracks() {
                pc.add_track(track, stream.id())
                    .await
                    .map_err(NegotiationError::Setup)?;
            }
        }

        self.candidate_sub = Some(self.bridge.subscribe_candidates().await?);

        match self.role {
            Role::Offerer => self.bridge.publish_offer(pc.as_ref()).await?,
            Role::Answerer => self.bridge.prepare_room().await?,
        }
        self.room_sub = Some(self.bridge.subscribe_room().await?);

        Ok(())
    }

    async fn handle_command(&mut self, cmd: SessionCommand) {
        match cmd {
            SessionCommand::ToggleMic { reply } => {
                let _ = reply.send(self.toggle_mic());
            }
            SessionCommand::ToggleCam { reply } => {
                let _ = reply.send(self.toggle_cam());
            }
            SessionCommand::ToggleScreenShare { reply } => {
                let result = self.toggle_screen_share().await;
                let _ = reply.send(result);
            }
            SessionCommand::Hangup { reply } => {
                info!("Hangup requested for {}", self.room_id.path());
                self.teardown().await;
                let _ = reply.send(());
            }
            SessionCommand::Snapshot { reply } => {
                let _ = reply.send(self.snapshot());
            }
        }
    }

    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            phase: self.phase.current(),
            role: self.role,
            pending_candidates: self.buffer.len(),
            media: self.media,
            has_remote_stream: self.remote_stream.is_some(),
        }
    }

    fn camera_stream(&self) -> Result<&MediaStream, SessionError> {
        if self.phase.current().is_terminal() {
            return Err(SessionError::Closed);
        }
        self.local_stream
            .as_ref()
            .ok_or(SessionError::MediaUnavailable)
    }

    fn toggle_mic(&mut self) -> Result<bool, SessionError> {
        let enabled = !self.media.mic_enabled;
        for track in self.camera_stream()?.audio_tracks() {
            track.set_enabled(enabled);
        }
        self.media.mic_enabled = enabled;
        self.emit(SessionEvent::MediaStateChanged(self.media));
        Ok(enabled)
    }

    fn toggle_cam(&mut self) -> Result<bool, SessionError> {
        let enabled = !self.media.cam_enabled;
        for track in self.camera_stream()?.video_tracks() {
            track.set_enabled(enabled);
        }
        self.media.cam_enabled = enabled;
        self.emit(SessionEvent::MediaStateChanged(self.media));
        Ok(enabled)
    }

    async fn toggle_screen_share(&mut self) -> Result<bool, SessionError> {
        self.camera_stream()?;
        if self.screen.is_active() {
            self.stop_screen_share().await;
            return Ok(self.screen.is_active());
        }

        let Some(pc) = self.peer.clone() else {
            return Err(ScreenShareError::NotConnected.into());
        };
        let preview = self.screen.start(self.devices.as_ref(), pc.as_ref()).await?;

        self.media.screen_sharing = true;
        self.emit(SessionEvent::LocalPreview(preview));
        self.emit(SessionEvent::MediaStateChanged(self.media));
        Ok(true)
    }

    async fn stop_screen_share(&mut self) {
        let (Some(pc), Some(camera)) = (self.peer.clone(), self.local_stream.clone()) else {
            self.screen.release();
            return;
        };

        match self.screen.stop(&camera, pc.as_ref()).await {
            Ok(false) => return,
            Ok(true) => {
                self.emit(SessionEvent::LocalPreview(camera));
            }
            Err(e) => {
                warn!("Failed to restore the camera after screen sharing: {}", e);
                self.emit(SessionEvent::ScreenShareFailed(e));
            }
        }
        self.media.screen_sharing = false;
        self.emit(SessionEvent::MediaStateChanged(self.media));
    }

    fn negotiating_or_connected(&self) -> bool {
        matches!(
            self.phase.current(),
            ConnectionPhase::Negotiating | ConnectionPhase::Connected
        )
    }

    async fn handle_room_change(&mut self, change: RoomChange) {
        if change.kind == ChangeKind::Removed {
            self.room_removed = true;
            if self.negotiating_or_connected() {
                info!("Room {} was removed by the other side", self.room_id.path());
                self.emit(SessionEvent::RoomClosed);
            }
            return;
        }

        if !self.negotiating_or_connected() {
            return;
        }
        let Some(pc) = self.peer.clone() else { return };

        match self
            .bridge
            .handle_room_change(pc.as_ref(), &mut self.buffer, change)
            .await
        {
            Ok(NegotiationStep::Completed { drained }) => {
                info!(
                    "Negotiation completed for {} ({} buffered candidates applied)",
                    self.room_id.path(),
                    drained
                );
                self.deadline = None;
                self.set_phase(ConnectionPhase::Connected);
            }
            Ok(NegotiationStep::Skipped | NegotiationStep::Ignored) => {}
            Err(e) => self.fail(e.into()),
        }
    }

    async fn handle_remote_candidate(&mut self, candidate: IceCandidate) {
        if !self.negotiating_or_connected() {
            return;
        }
        let Some(pc) = self.peer.clone() else { return };

        let outcome = self
            .bridge
            .handle_remote_candidate(pc.as_ref(), &mut self.buffer, candidate)
            .await;
        debug!("Remote candidate: {:?}", outcome);
    }

    async fn handle_transport_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::CandidateGenerated(candidate) => {
                if self.phase.current().is_terminal() || self.room_removed {
                    debug!("Dropping local candidate for closed room {}", self.room_id.path());
                    return;
                }
                self.bridge.publish_local_candidate(candidate).await;
            }
            TransportEvent::RemoteTrack(remote) => self.add_remote_track(remote),
            TransportEvent::StateChanged(state) => {
                info!("Transport for {} is {:?}", self.room_id.path(), state);
                if state == PeerState::Failed
                    && self.phase.current() == ConnectionPhase::Connected
                {
                    warn!("Connection lost for {}", self.room_id.path());
                    self.emit(SessionEvent::ConnectionLost);
                }
            }
        }
    }

    fn add_remote_track(&mut self, remote: RemoteTrack) {
        if self.phase.current().is_terminal() {
            return;
        }
        let track = MediaTrack::with_id(remote.track_id, remote.kind, TrackSource::Remote, "");
        let stream = self
            .remote_stream
            .get_or_insert_with(|| MediaStream::with_id(remote.stream_id, Vec::new()));

        if stream.add_track(track) {
            let preview = stream.clone();
            self.emit(SessionEvent::RemotePreview(preview));
        }
    }

    fn on_negotiation_timeout(&mut self) {
        let Some(deadline) = self.deadline.take() else { return };
        if self.phase.current() != ConnectionPhase::Negotiating {
            return;
        }

        let expected = match self.role {
            Role::Offerer => SdpType::Answer,
            Role::Answerer => SdpType::Offer,
        };
        let waited = self
            .config
            .negotiation_timeout()
            .unwrap_or_else(|| deadline.elapsed());
        self.fail(NegotiationError::Timeout { expected, waited }.into());
    }

    /// Releases everything the session holds. Safe from any phase.
    async fn teardown(&mut self) {
        if self.phase.current() == ConnectionPhase::Closed {
            return;
        }
        let Some(_permit) = self.guard.try_begin() else {
            debug!("Teardown already in progress for {}", self.room_id.path());
            return;
        };
        self.set_phase(ConnectionPhase::Ending);

        if let Some(sub) = self.room_sub.take() {
            sub.unsubscribe();
        }
        if let Some(sub) = self.candidate_sub.take() {
            sub.unsubscribe();
        }
        self.deadline = None;

        self.screen.release();
        if let Some(stream) = self.local_stream.take() {
            stream.stop_all();
        }
        self.buffer.clear();

        if let Some(pc) = self.peer.take() {
            if let Err(e) = pc.close().await {
                warn!("Failed to close peer connection: {}", e);
            }
        }
        self.remote_stream = None;

        if let Err(e) = self.bridge.close_room().await {
            warn!("Failed to delete room {}: {}", self.room_id.path(), e);
        }

        self.set_phase(ConnectionPhase::Closed);
        info!("Call session for {} torn down", self.room_id.path());
    }

    fn fail(&mut self, err: SessionError) {
        error!("Call session for {} failed: {}", self.room_id.path(), err);
        self.deadline = None;
        if self.set_phase(ConnectionPhase::Error) {
            self.emit(SessionEvent::Failed(err));
        }
    }

    fn set_phase(&mut self, next: ConnectionPhase) -> bool {
        if !self.phase.advance(next) {
            return false;
        }
        self.emit(SessionEvent::PhaseChanged(next));
        true
    }

    fn emit(&self, event: SessionEvent) {
        let _ = self.event_tx.send(event);
    }
}

async fn next_item<T>(sub: &mut Option<Subscription<T>>) -> Option<T> {
    match sub {
        Some(sub) => sub.recv().await,
        None => future::pending().await,
    }
}

async fn track_ended(track: Option<MediaTrack>) {
    match track {
        Some(track) => track.ended().await,
        None => future::pending().await,
    }
}

async fn deadline_elapsed(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => future::pending().await,
    }
}
