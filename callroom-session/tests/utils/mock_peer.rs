use async_trait::async_trait;
use callroom_core::{IceCandidate, SdpType, SessionDescription};
use callroom_session::media::{MediaKind, MediaTrack};
use callroom_session::transport::{
    PeerConnection, PeerConnectionFactory, PeerState, RemoteTrack, TransportConfig,
    TransportEvent,
};
use callroom_session::TransportError;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{Mutex, mpsc};

/// Candidate text the mock refuses to apply.
pub const MALFORMED_CANDIDATE: &str = "malformed";

/// Knobs shared by every connection a [`MockPeerConnectionFactory`] creates.
#[derive(Debug, Clone)]
pub struct MockPeerOptions {
    /// Local candidates emitted after each local description.
    pub candidates_per_description: usize,
    pub fail_create: bool,
    pub fail_set_remote: bool,
}

impl Default for MockPeerOptions {
    fn default() -> Self {
        Self {
            candidates_per_description: 2,
            fail_create: false,
            fail_set_remote: false,
        }
    }
}

/// Peer connection that records every call and emits fake transport events.
pub struct MockPeerConnection {
    pub label: String,
    options: MockPeerOptions,
    events: mpsc::Sender<TransportEvent>,
    added: Mutex<Vec<(MediaKind, String)>>,
    outgoing: Mutex<HashMap<MediaKind, String>>,
    local: Mutex<Option<SessionDescription>>,
    remote: Mutex<Option<SessionDescription>>,
    remote_sets: AtomicUsize,
    applied: Mutex<Vec<IceCandidate>>,
    closes: AtomicUsize,
}

impl MockPeerConnection {
    fn new(label: String, options: MockPeerOptions, events: mpsc::Sender<TransportEvent>) -> Self {
        Self {
            label,
            options,
            events,
            added: Mutex::new(Vec::new()),
            outgoing: Mutex::new(HashMap::new()),
            local: Mutex::new(None),
            remote: Mutex::new(None),
            remote_sets: AtomicUsize::new(0),
            applied: Mutex::new(Vec::new()),
            closes: AtomicUsize::new(0),
        }
    }

    pub fn candidate(label: &str, n: usize) -> IceCandidate {
        let mut candidate = IceCandidate::new(format!(
            "candidate:{n} 1 udp 2122260223 192.0.2.{n} 5000{n} typ host generation 0 ufrag {label}"
        ));
        candidate.sdp_mid = Some("0".to_owned());
        candidate.sdp_m_line_index = Some(0);
        candidate
    }

    pub async fn added_tracks(&self) -> Vec<(MediaKind, String)> {
        self.added.lock().await.clone()
    }

    pub async fn outgoing(&self, kind: MediaKind) -> Option<String> {
        self.outgoing.lock().await.get(&kind).cloned()
    }

    pub async fn local_description(&self) -> Option<SessionDescription> {
        self.local.lock().await.clone()
    }

    pub async fn applied(&self) -> Vec<IceCandidate> {
        self.applied.lock().await.clone()
    }

    pub fn remote_sets(&self) -> usize {
        self.remote_sets.load(Ordering::SeqCst)
    }

    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    /// Pushes an event as if the transport had raised it.
    pub async fn emit(&self, event: TransportEvent) {
        let _ = self.events.send(event).await;
    }
}

#[async_trait]
impl PeerConnection for MockPeerConnection {
    async fn add_track(&self, track: &MediaTrack, _stream_id: &str) -> Result<(), TransportError> {
        self.added
            .lock()
            .await
            .push((track.kind(), track.id().to_owned()));
        self.outgoing
            .lock()
            .await
            .insert(track.kind(), track.id().to_owned());
        Ok(())
    }

    async fn create_offer(&self) -> Result<SessionDescription, TransportError> {
        Ok(SessionDescription::new(
            SdpType::Offer,
            format!("v=0 offer from {}", self.label),
        ))
    }

    async fn create_answer(&self) -> Result<SessionDescription, TransportError> {
        Ok(SessionDescription::new(
            SdpType::Answer,
            format!("v=0 answer from {}", self.label),
        ))
    }

    async fn set_local_description(&self, desc: SessionDescription) -> Result<(), TransportError> {
        *self.local.lock().await = Some(desc);

        for n in 1..=self.options.candidates_per_description {
            let candidate = Self::candidate(&self.label, n);
            let _ = self
                .events
                .send(TransportEvent::CandidateGenerated(candidate))
                .await;
        }
        Ok(())
    }

    async fn set_remote_description(
        &self,
        desc: SessionDescription,
    ) -> Result<(), TransportError> {
        if self.options.fail_set_remote {
            return Err(TransportError::Backend("remote description rejected".to_owned()));
        }
        *self.remote.lock().await = Some(desc);
        self.remote_sets.fetch_add(1, Ordering::SeqCst);

        for (kind, track_id) in [(MediaKind::Audio, "remote-audio"), (MediaKind::Video, "remote-video")] {
            let remote = RemoteTrack {
                track_id: format!("{}-{}", self.label, track_id),
                stream_id: format!("{}-remote", self.label),
                kind,
            };
            let _ = self.events.send(TransportEvent::RemoteTrack(remote)).await;
        }
        let _ = self
            .events
            .send(TransportEvent::StateChanged(PeerState::Connecting))
            .await;
        Ok(())
    }

    async fn remote_description(&self) -> Option<SessionDescription> {
        self.remote.lock().await.clone()
    }

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<(), TransportError> {
        if candidate.candidate == MALFORMED_CANDIDATE {
            return Err(TransportError::Backend("cannot parse candidate".to_owned()));
        }
        self.applied.lock().await.push(candidate);
        Ok(())
    }

    async fn replace_track(
        &self,
        kind: MediaKind,
        track: &MediaTrack,
    ) -> Result<(), TransportError> {
        let mut outgoing = self.outgoing.lock().await;
        let Some(current) = outgoing.get_mut(&kind) else {
            return Err(TransportError::NoSender(kind));
        };
        *current = track.id().to_owned();
        Ok(())
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Factory handing out [`MockPeerConnection`]s and keeping them for
/// inspection.
#[derive(Clone)]
pub struct MockPeerConnectionFactory {
    label: String,
    options: MockPeerOptions,
    created: Arc<Mutex<Vec<Arc<MockPeerConnection>>>>,
}

impl MockPeerConnectionFactory {
    pub fn new(label: &str) -> Self {
        Self::with_options(label, MockPeerOptions::default())
    }

    pub fn with_options(label: &str, options: MockPeerOptions) -> Self {
        Self {
            label: label.to_owned(),
            options,
            created: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub async fn created(&self) -> usize {
        self.created.lock().await.len()
    }

    pub async fn last(&self) -> Option<Arc<MockPeerConnection>> {
        self.created.lock().await.last().cloned()
    }
}

#[async_trait]
impl PeerConnectionFactory for MockPeerConnectionFactory {
    async fn create(
        &self,
        _config: &TransportConfig,
        events: mpsc::Sender<TransportEvent>,
    ) -> Result<Arc<dyn PeerConnection>, TransportError> {
        if self.options.fail_create {
            return Err(TransportError::Backend("no transport available".to_owned()));
        }

        let mut created = self.created.lock().await;
        let label = format!("{}-{}", self.label, created.len());
        let connection = Arc::new(MockPeerConnection::new(label, self.options.clone(), events));
        created.push(connection.clone());
        Ok(connection)
    }
}
