use crate::error::TransportError;
use crate::media::{MediaKind, MediaTrack};
use crate::transport::PeerConnection;
use async_trait::async_trait;
use callroom_core::{IceCandidate, SdpType, SessionDescription};
use std::collections::HashMap;
use std::sync::Mutex;

/// In-crate peer that records what the negotiation code does to it.
#[derive(Default)]
pub(crate) struct RecordingPeer {
    local: Mutex<Option<SessionDescription>>,
    remote: Mutex<Option<SessionDescription>>,
    remote_sets: Mutex<usize>,
    applied: Mutex<Vec<IceCandidate>>,
    outgoing: Mutex<HashMap<MediaKind, String>>,
}

impl RecordingPeer {
    pub(crate) const MALFORMED: &'static str = "malformed";

    pub(crate) fn applied(&self) -> Vec<IceCandidate> {
        self.applied.lock().unwrap().clone()
    }

    pub(crate) fn remote_sets(&self) -> usize {
        *self.remote_sets.lock().unwrap()
    }

    pub(crate) fn local(&self) -> Option<SessionDescription> {
        self.local.lock().unwrap().clone()
    }

    pub(crate) fn outgoing(&self, kind: MediaKind) -> Option<String> {
        self.outgoing.lock().unwrap().get(&kind).cloned()
    }
}

#[async_trait]
impl PeerConnection for RecordingPeer {
    async fn add_track(&self, track: &MediaTrack, _stream_id: &str) -> Result<(), TransportError> {
        self.outgoing
            .lock()
            .unwrap()
            .insert(track.kind(), track.id().to_owned());
        Ok(())
    }

    async fn create_offer(&self) -> Result<SessionDescription, TransportError> {
        Ok(SessionDescription::new(SdpType::Offer, "recorded-offer"))
    }

    async fn create_answer(&self) -> Result<SessionDescription, TransportError> {
        Ok(SessionDescription::new(SdpType::Answer, "recorded-answer"))
    }

    async fn set_local_description(&self, desc: SessionDescription) -> Result<(), TransportError> {
        *self.local.lock().unwrap() = Some(desc);
        Ok(())
    }

    async fn set_remote_description(
        &self,
        desc: SessionDescription,
    ) -> Result<(), TransportError> {
        *self.remote.lock().unwrap() = Some(desc);
        *self.remote_sets.lock().unwrap() += 1;
        Ok(())
    }

    async fn remote_description(&self) -> Option<SessionDescription> {
        self.remote.lock().unwrap().clone()
    }

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<(), TransportError> {
        if candidate.candidate == Self::MALFORMED {
            return Err(TransportError::Backend("unparsable candidate".to_owned()));
        }
        self.applied.lock().unwrap().push(candidate);
        Ok(())
    }

    async fn replace_track(
        &self,
        kind: MediaKind,
        track: &MediaTrack,
    ) -> Result<(), TransportError> {
        let mut outgoing = self.outgoing.lock().unwrap();
        let Some(current) = outgoing.get_mut(&kind) else {
            return Err(TransportError::NoSender(kind));
        };
        *current = track.id().to_owned();
        Ok(())
    }

    async fn close(&self) -> Result<(), TransportError> {
        Ok(())
    }
}
