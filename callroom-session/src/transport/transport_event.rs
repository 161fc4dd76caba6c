use crate::media::MediaKind;
use crate::transport::PeerState;
use callroom_core::IceCandidate;

/// Events a peer connection pushes into the owning session's loop.
#[derive(Debug, Clone)]
pub enum TransportEvent {
    /// A local ICE candidate was gathered and must be published for the remote peer.
    CandidateGenerated(IceCandidate),

    /// Remote media arrived.
    RemoteTrack(RemoteTrack),

    StateChanged(PeerState),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteTrack {
    pub track_id: String,
    pub stream_id: String,
    pub kind: MediaKind,
}
