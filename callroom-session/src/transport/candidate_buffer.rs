use crate::error::CandidateApplyError;
use crate::transport::PeerConnection;
use callroom_core::IceCandidate;
use std::collections::VecDeque;
use tracing::{debug, warn};

/// What happened to a remote candidate handed to [`CandidateBuffer::add_or_queue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateOutcome {
    Applied,
    Queued,
    /// Applying failed; the candidate was dropped.
    Rejected,
}

/// FIFO of remote candidates that arrived before the remote description.
#[derive(Debug, Default)]
pub struct CandidateBuffer {
    pending: VecDeque<IceCandidate>,
}

impl CandidateBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Applies `candidate` right away if the remote description is set,
    /// otherwise queues it.
    pub async fn add_or_queue(
        &mut self,
        peer: &dyn PeerConnection,
        candidate: IceCandidate,
    ) -> CandidateOutcome {
        if peer.remote_description().await.is_none() {
            debug!("Queueing early ICE candidate ({} pending)", self.pending.len() + 1);
            self.pending.push_back(candidate);
            return CandidateOutcome::Queued;
        }

        match apply(peer, candidate).await {
            Ok(()) => CandidateOutcome::Applied,
            Err(e) => {
                warn!("{}", e);
                CandidateOutcome::Rejected
            }
        }
    }

    /// Applies every queued candidate in arrival order. Must be called right
    /// after the remote description was set. Returns how many were dequeued.
    pub async fn drain(&mut self, peer: &dyn PeerConnection) -> usize {
        let mut drained = 0;
        while let Some(candidate) = self.pending.pop_front() {
            drained += 1;
            if let Err(e) = apply(peer, candidate).await {
                warn!("{}", e);
            }
        }
        if drained > 0 {
            debug!("Drained {} buffered ICE candidates", drained);
        }
        drained
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

async fn apply(peer: &dyn PeerConnection, candidate: IceCandidate) -> Result<(), CandidateApplyError> {
    peer.add_ice_candidate(candidate)
        .await
        .map_err(CandidateApplyError)
}
