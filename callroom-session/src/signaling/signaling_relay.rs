use crate::error::SignalingError;
use crate::signaling::Subscription;
use async_trait::async_trait;
use callroom_core::{CallRoom, CandidateCollection, IceCandidate, RoomId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Added,
    Modified,
    Removed,
}

/// One change of a room record. `room` is `None` for removals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomChange {
    pub kind: ChangeKind,
    pub room: Option<CallRoom>,
}

impl RoomChange {
    pub fn added(room: CallRoom) -> Self {
        Self {
            kind: ChangeKind::Added,
            room: Some(room),
        }
    }

    pub fn modified(room: CallRoom) -> Self {
        Self {
            kind: ChangeKind::Modified,
            room: Some(room),
        }
    }

    pub fn removed() -> Self {
        Self {
            kind: ChangeKind::Removed,
            room: None,
        }
    }
}

/// Shared store both peers use to exchange descriptions and candidates.
///
/// A room is one record (`offer`, `answer`) plus two append-only candidate
/// lists. Subscriptions deliver the current state first, then every change
/// in write order.
#[async_trait]
pub trait SignalingRelay: Send + Sync + 'static {
    /// Returns the room record, creating an empty one if it does not exist.
    async fn get_or_create_room(&self, room_id: &RoomId) -> Result<CallRoom, SignalingError>;

    /// Replaces the room record. Candidate lists are kept.
    async fn set_room(&self, room_id: &RoomId, room: CallRoom) -> Result<(), SignalingError>;

    /// Merges `patch` into the room record, creating it if needed.
    async fn write_room(&self, room_id: &RoomId, patch: CallRoom) -> Result<(), SignalingError>;

    /// Delivers the record as it is now (if it exists), then every change.
    async fn subscribe_room(
        &self,
        room_id: &RoomId,
    ) -> Result<Subscription<RoomChange>, SignalingError>;

    /// Appends to one of the room's candidate lists. Fails with
    /// [`SignalingError::RoomNotFound`] once the room is gone.
    async fn append_candidate(
        &self,
        room_id: &RoomId,
        collection: CandidateCollection,
        candidate: IceCandidate,
    ) -> Result<(), SignalingError>;

    /// Delivers every candidate already in `collection`, then each new one.
    async fn subscribe_candidates(
        &self,
        room_id: &RoomId,
        collection: CandidateCollection,
    ) -> Result<Subscription<IceCandidate>, SignalingError>;

    /// Deletes the room record together with both candidate lists. Deleting a
    /// missing room is not an error.
    async fn delete_room(&self, room_id: &RoomId) -> Result<(), SignalingError>;
}
