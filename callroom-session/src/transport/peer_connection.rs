use crate::error::TransportError;
use crate::media::{MediaKind, MediaTrack};
use crate::transport::{TransportConfig, TransportEvent};
use async_trait::async_trait;
use callroom_core::{IceCandidate, SessionDescription};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Connection state as reported by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerState {
    New,
    Connecting,
    Connected,
    Disconnected,
    Failed,
    Closed,
}

/// One peer-to-peer media connection.
///
/// Remote tracks, local ICE candidates and state changes are not returned
/// from these methods; they arrive as [`TransportEvent`]s on the channel the
/// connection was created with.
#[async_trait]
pub trait PeerConnection: Send + Sync {
    async fn add_track(&self, track: &MediaTrack, stream_id: &str) -> Result<(), TransportError>;

    async fn create_offer(&self) -> Result<SessionDescription, TransportError>;

    async fn create_answer(&self) -> Result<SessionDescription, TransportError>;

    async fn set_local_description(&self, desc: SessionDescription) -> Result<(), TransportError>;

    async fn set_remote_description(&self, desc: SessionDescription)
    -> Result<(), TransportError>;

    /// `None` until a typed remote description has been applied.
    async fn remote_description(&self) -> Option<SessionDescription>;

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<(), TransportError>;

    /// Swaps the track of the existing outgoing sender of `kind` without
    /// renegotiating.
    async fn replace_track(&self, kind: MediaKind, track: &MediaTrack)
    -> Result<(), TransportError>;

    /// Releases transport resources. Calling it again is a no-op.
    async fn close(&self) -> Result<(), TransportError>;
}

#[async_trait]
pub trait PeerConnectionFactory: Send + Sync + 'static {
    async fn create(
        &self,
        config: &TransportConfig,
        events: mpsc::Sender<TransportEvent>,
    ) -> Result<Arc<dyn PeerConnection>, TransportError>;
}
