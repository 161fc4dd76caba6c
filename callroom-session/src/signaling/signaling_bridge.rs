use crate::error::{NegotiationError, SignalingError};
use crate::signaling::{ChangeKind, RoomChange, SignalingRelay, Subscription};
use crate::transport::{CandidateBuffer, CandidateOutcome, PeerConnection};
use callroom_core::{CallRoom, IceCandidate, Role, RoomId, SdpType, SessionDescription};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What a room change did to the negotiation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegotiationStep {
    /// The change carried nothing this role waits for.
    Ignored,
    /// The remote description was already applied; the change was a repeat.
    Skipped,
    /// The remote description was applied and `drained` buffered candidates
    /// were handed to the connection.
    Completed { drained: usize },
}

/// Runs the offer/answer exchange of one role against the relay.
///
/// The offerer publishes its offer and waits for the answer; the answerer
/// waits for the offer and merges its answer into the room.
pub struct SignalingBridge {
    relay: Arc<dyn SignalingRelay>,
    room_id: RoomId,
    role: Role,
}

impl SignalingBridge {
    pub fn new(relay: Arc<dyn SignalingRelay>, room_id: RoomId, role: Role) -> Self {
        Self {
            relay,
            room_id,
            role,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    pub async fn subscribe_room(&self) -> Result<Subscription<RoomChange>, SignalingError> {
        self.relay.subscribe_room(&self.room_id).await
    }

    /// Candidates written by the other participant.
    pub async fn subscribe_candidates(&self) -> Result<Subscription<IceCandidate>, SignalingError> {
        self.relay
            .subscribe_candidates(&self.room_id, self.role.incoming_candidates())
            .await
    }

    /// Makes sure the room exists before the answerer starts listening.
    pub async fn prepare_room(&self) -> Result<(), SignalingError> {
        let room = self.relay.get_or_create_room(&self.room_id).await?;
        if room.offer.is_some() {
            debug!("Room {} already holds an offer", self.room_id.path());
        }
        Ok(())
    }

    /// Creates an offer, applies it locally and overwrites the room with it,
    /// so an answer left over from an earlier call is never picked up.
    pub async fn publish_offer(&self, pc: &dyn PeerConnection) -> Result<(), NegotiationError> {
        let offer = pc
            .create_offer()
            .await
            .map_err(|e| NegotiationError::CreateDescription(SdpType::Offer, e))?;
        pc.set_local_description(offer.clone())
            .await
            .map_err(|e| NegotiationError::SetLocalDescription(SdpType::Offer, e))?;

        self.relay
            .set_room(&self.room_id, CallRoom::with_offer(offer))
            .await?;
        info!("Offer published to {}", self.room_id.path());
        Ok(())
    }

    pub async fn handle_room_change(
        &self,
        pc: &dyn PeerConnection,
        buffer: &mut CandidateBuffer,
        change: RoomChange,
    ) -> Result<NegotiationStep, NegotiationError> {
        if change.kind == ChangeKind::Removed {
            return Ok(NegotiationStep::Ignored);
        }
        let Some(room) = change.room else {
            return Ok(NegotiationStep::Ignored);
        };

        match self.role {
            Role::Offerer => match room.answer {
                Some(answer) => self.apply_remote_description(pc, buffer, answer).await,
                None => Ok(NegotiationStep::Ignored),
            },
            Role::Answerer => {
                let Some(offer) = room.offer else {
                    return Ok(NegotiationStep::Ignored);
                };
                let step = self.apply_remote_description(pc, buffer, offer).await?;
                if let NegotiationStep::Completed { .. } = step {
                    self.publish_answer(pc).await?;
                }
                Ok(step)
            }
        }
    }

    async fn publish_answer(&self, pc: &dyn PeerConnection) -> Result<(), NegotiationError> {
        let answer = pc
            .create_answer()
            .await
            .map_err(|e| NegotiationError::CreateDescription(SdpType::Answer, e))?;
        pc.set_local_description(answer.clone())
            .await
            .map_err(|e| NegotiationError::SetLocalDescription(SdpType::Answer, e))?;

        self.relay
            .write_room(&self.room_id, CallRoom::with_answer(answer))
            .await?;
        info!("Answer published to {}", self.room_id.path());
        Ok(())
    }

    /// Applies `desc` unless a remote description is already set, then
    /// drains the candidates that arrived before it.
    pub async fn apply_remote_description(
        &self,
        pc: &dyn PeerConnection,
        buffer: &mut CandidateBuffer,
        desc: SessionDescription,
    ) -> Result<NegotiationStep, NegotiationError> {
        if pc.remote_description().await.is_some() {
            debug!("Ignoring repeated remote {}", desc.sdp_type);
            return Ok(NegotiationStep::Skipped);
        }

        let sdp_type = desc.sdp_type;
        pc.set_remote_description(desc)
            .await
            .map_err(|e| NegotiationError::SetRemoteDescription(sdp_type, e))?;
        info!("Remote {} applied", sdp_type);

        let drained = buffer.drain(pc).await;
        Ok(NegotiationStep::Completed { drained })
    }

    pub async fn handle_remote_candidate(
        &self,
        pc: &dyn PeerConnection,
        buffer: &mut CandidateBuffer,
        candidate: IceCandidate,
    ) -> CandidateOutcome {
        buffer.add_or_queue(pc, candidate).await
    }

    /// Appends a locally gathered candidate to this role's list. Failures are
    /// logged; a lost candidate only narrows the set of usable paths.
    pub async fn publish_local_candidate(&self, candidate: IceCandidate) {
        let collection = self.role.outgoing_candidates();
        if let Err(e) = self
            .relay
            .append_candidate(&self.room_id, collection, candidate)
            .await
        {
            warn!("Failed to publish ICE candidate to {}: {}", collection, e);
        }
    }

    pub async fn close_room(&self) -> Result<(), SignalingError> {
        self.relay.delete_room(&self.room_id).await
    }
}
