use crate::error::TransportError;
use crate::media::{MediaKind, MediaTrack};
use crate::transport::{
    PeerConnection, PeerConnectionFactory, PeerState, RemoteTrack, TransportConfig,
    TransportEvent,
};
use async_trait::async_trait;
use bytes::Bytes;
use callroom_core::{IceCandidate, SdpType, SessionDescription};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info, warn};
use webrtc::api::APIBuilder;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::{MIME_TYPE_OPUS, MIME_TYPE_VP8, MediaEngine};
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::media::Sample;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::sdp_type::RTCSdpType;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::rtp_transceiver::RTCRtpTransceiver;
use webrtc::rtp_transceiver::rtp_codec::{RTCRtpCodecCapability, RTPCodecType};
use webrtc::rtp_transceiver::rtp_receiver::RTCRtpReceiver;
use webrtc::rtp_transceiver::rtp_sender::RTCRtpSender;
use webrtc::track::track_local::TrackLocal;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;
use webrtc::track::track_remote::TrackRemote;

struct OutgoingTrack {
    kind: MediaKind,
    /// Shares the `enabled` flag with the session's handle.
    track: MediaTrack,
    stream_id: String,
    sender: Arc<RTCRtpSender>,
    local: Arc<TrackLocalStaticSample>,
}

/// [`PeerConnection`] backed by the `webrtc` crate.
///
/// Every [`MediaTrack`] is mirrored by a [`TrackLocalStaticSample`]; a media
/// pipeline feeds encoded frames through [`ConnectionWrapper::write_sample`].
pub struct ConnectionWrapper {
    pub peer_connection: Arc<RTCPeerConnection>,
    outgoing: Mutex<Vec<OutgoingTrack>>,
    closed: AtomicBool,
}

impl ConnectionWrapper {
    /// Builds the connection and wires its callbacks into `event_tx`.
    pub async fn new(
        config: &TransportConfig,
        event_tx: mpsc::Sender<TransportEvent>,
    ) -> Result<Self, TransportError> {
        let mut m = MediaEngine::default();
        m.register_default_codecs()?;
        let registry = register_default_interceptors(Registry::new(), &mut m)?;

        let api = APIBuilder::new()
            .with_media_engine(m)
            .with_interceptor_registry(registry)
            .build();

        let rtc_config = RTCConfiguration {
            ice_servers: config
                .ice_servers
                .iter()
                .map(|server| RTCIceServer {
                    urls: server.urls.clone(),
                    username: server.username.clone().unwrap_or_default(),
                    credential: server.credential.clone().unwrap_or_default(),
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        };

        let peer_connection = Arc::new(api.new_peer_connection(rtc_config).await?);

        let state_tx = event_tx.clone();
        peer_connection.on_peer_connection_state_change(Box::new(
            move |s: RTCPeerConnectionState| {
                let tx = state_tx.clone();

                Box::pin(async move {
                    info!("Peer connection state changed: {:?}", s);
                    let state = match s {
                        RTCPeerConnectionState::Unspecified | RTCPeerConnectionState::New => {
                            PeerState::New
                        }
                        RTCPeerConnectionState::Connecting => PeerState::Connecting,
                        RTCPeerConnectionState::Connected => PeerState::Connected,
                        RTCPeerConnectionState::Disconnected => PeerState::Disconnected,
                        RTCPeerConnectionState::Failed => PeerState::Failed,
                        RTCPeerConnectionState::Closed => PeerState::Closed,
                    };
                    let _ = tx.send(TransportEvent::StateChanged(state)).await;
                })
            },
        ));

        // Trickle ICE: every gathered candidate goes straight to the session.
        let ice_tx = event_tx.clone();
        peer_connection.on_ice_candidate(Box::new(move |c: Option<RTCIceCandidate>| {
            let tx = ice_tx.clone();

            Box::pin(async move {
                let Some(candidate) = c else { return };
                let json = match candidate.to_json() {
                    Ok(json) => json,
                    Err(e) => {
                        warn!("Failed to serialize local ICE candidate: {}", e);
                        return;
                    }
                };
                let candidate = IceCandidate {
                    candidate: json.candidate,
                    sdp_mid: json.sdp_mid,
                    sdp_m_line_index: json.sdp_mline_index,
                    username_fragment: json.username_fragment,
                };
                let _ = tx.send(TransportEvent::CandidateGenerated(candidate)).await;
            })
        }));

        let track_tx = event_tx;
        peer_connection.on_track(Box::new(
            move |track: Arc<TrackRemote>,
                  _receiver: Arc<RTCRtpReceiver>,
                  _transceiver: Arc<RTCRtpTransceiver>| {
                let tx = track_tx.clone();

                Box::pin(async move {
                    let kind = match track.kind() {
                        RTPCodecType::Audio => MediaKind::Audio,
                        RTPCodecType::Video => MediaKind::Video,
                        RTPCodecType::Unspecified => {
                            warn!("Ignoring remote track {} of unknown kind", track.id());
                            return;
                        }
                    };
                    debug!(
                        "Remote {} track {} in stream {}",
                        kind,
                        track.id(),
                        track.stream_id()
                    );
                    let remote = RemoteTrack {
                        track_id: track.id(),
                        stream_id: track.stream_id(),
                        kind,
                    };
                    let _ = tx.send(TransportEvent::RemoteTrack(remote)).await;
                })
            },
        ));

        Ok(Self {
            peer_connection,
            outgoing: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
        })
    }

    /// Pushes one encoded frame onto the sender that currently carries
    /// `track_id`. Returns `false` when the frame was dropped: the track is
    /// not being sent, or it is muted and stays attached without content.
    pub async fn write_sample(
        &self,
        track_id: &str,
        data: Bytes,
        duration: Duration,
    ) -> Result<bool, TransportError> {
        self.ensure_open()?;
        let local = {
            let outgoing = self.outgoing.lock().await;
            match outgoing.iter().find(|t| t.track.id() == track_id) {
                Some(t) if t.track.enabled() => t.local.clone(),
                _ => return Ok(false),
            }
        };
        local
            .write_sample(&Sample {
                data,
                duration,
                ..Default::default()
            })
            .await?;
        Ok(true)
    }

    fn local_track_for(track: &MediaTrack, stream_id: &str) -> Arc<TrackLocalStaticSample> {
        let codec = match track.kind() {
            MediaKind::Audio => RTCRtpCodecCapability {
                mime_type: MIME_TYPE_OPUS.to_owned(),
                clock_rate: 48000,
                channels: 2,
                ..Default::default()
            },
            MediaKind::Video => RTCRtpCodecCapability {
                mime_type: MIME_TYPE_VP8.to_owned(),
                clock_rate: 90000,
                ..Default::default()
            },
        };
        Arc::new(TrackLocalStaticSample::new(
            codec,
            track.id().to_owned(),
            stream_id.to_owned(),
        ))
    }

    fn ensure_open(&self) -> Result<(), TransportError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(TransportError::Closed);
        }
        Ok(())
    }
}

fn to_rtc_description(desc: SessionDescription) -> Result<RTCSessionDescription, TransportError> {
    let rtc = match desc.sdp_type {
        SdpType::Offer => RTCSessionDescription::offer(desc.sdp)?,
        SdpType::Answer => RTCSessionDescription::answer(desc.sdp)?,
        SdpType::Pranswer => RTCSessionDescription::pranswer(desc.sdp)?,
        SdpType::Rollback => return Err(TransportError::UnsupportedSdp(SdpType::Rollback)),
    };
    Ok(rtc)
}

fn from_rtc_description(desc: RTCSessionDescription) -> Option<SessionDescription> {
    let sdp_type = match desc.sdp_type {
        RTCSdpType::Offer => SdpType::Offer,
        RTCSdpType::Answer => SdpType::Answer,
        RTCSdpType::Pranswer => SdpType::Pranswer,
        RTCSdpType::Rollback => SdpType::Rollback,
        RTCSdpType::Unspecified => return None,
    };
    Some(SessionDescription::new(sdp_type, desc.sdp))
}

#[async_trait]
impl PeerConnection for ConnectionWrapper {
    async fn add_track(&self, track: &MediaTrack, stream_id: &str) -> Result<(), TransportError> {
        self.ensure_open()?;
        let local = Self::local_track_for(track, stream_id);
        let sender = self
            .peer_connection
            .add_track(Arc::clone(&local) as Arc<dyn TrackLocal + Send + Sync>)
            .await?;

        debug!("Added local {} track {}", track.kind(), track.id());
        self.outgoing.lock().await.push(OutgoingTrack {
            kind: track.kind(),
            track: track.clone(),
            stream_id: stream_id.to_owned(),
            sender,
            local,
        });
        Ok(())
    }

    async fn create_offer(&self) -> Result<SessionDescription, TransportError> {
        self.ensure_open()?;
        let offer = self.peer_connection.create_offer(None).await?;
        Ok(SessionDescription::new(SdpType::Offer, offer.sdp))
    }

    async fn create_answer(&self) -> Result<SessionDescription, TransportError> {
        self.ensure_open()?;
        let answer = self.peer_connection.create_answer(None).await?;
        Ok(SessionDescription::new(SdpType::Answer, answer.sdp))
    }

    async fn set_local_description(&self, desc: SessionDescription) -> Result<(), TransportError> {
        self.ensure_open()?;
        self.peer_connection
            .set_local_description(to_rtc_description(desc)?)
            .await?;
        Ok(())
    }

    async fn set_remote_description(
        &self,
        desc: SessionDescription,
    ) -> Result<(), TransportError> {
        self.ensure_open()?;
        self.peer_connection
            .set_remote_description(to_rtc_description(desc)?)
            .await?;
        Ok(())
    }

    async fn remote_description(&self) -> Option<SessionDescription> {
        self.peer_connection
            .remote_description()
            .await
            .and_then(from_rtc_description)
    }

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<(), TransportError> {
        self.ensure_open()?;
        let init = RTCIceCandidateInit {
            candidate: candidate.candidate,
            sdp_mid: candidate.sdp_mid,
            sdp_mline_index: candidate.sdp_m_line_index,
            username_fragment: candidate.username_fragment,
        };
        self.peer_connection.add_ice_candidate(init).await?;
        Ok(())
    }

    async fn replace_track(
        &self,
        kind: MediaKind,
        track: &MediaTrack,
    ) -> Result<(), TransportError> {
        self.ensure_open()?;
        let mut outgoing = self.outgoing.lock().await;
        let Some(slot) = outgoing.iter_mut().find(|t| t.kind == kind) else {
            return Err(TransportError::NoSender(kind));
        };

        let local = Self::local_track_for(track, &slot.stream_id);
        slot.sender
            .replace_track(Some(Arc::clone(&local) as Arc<dyn TrackLocal + Send + Sync>))
            .await?;

        debug!(
            "Replaced outgoing {} track {} with {}",
            kind,
            slot.track.id(),
            track.id()
        );
        slot.track = track.clone();
        slot.local = local;
        Ok(())
    }

    async fn close(&self) -> Result<(), TransportError> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.outgoing.lock().await.clear();
        self.peer_connection.close().await?;
        Ok(())
    }
}

/// Creates [`ConnectionWrapper`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebrtcConnectionFactory;

#[async_trait]
impl PeerConnectionFactory for WebrtcConnectionFactory {
    async fn create(
        &self,
        config: &TransportConfig,
        events: mpsc::Sender<TransportEvent>,
    ) -> Result<Arc<dyn PeerConnection>, TransportError> {
        let connection = ConnectionWrapper::new(config, events).await?;
        Ok(Arc::new(connection))
    }
}
