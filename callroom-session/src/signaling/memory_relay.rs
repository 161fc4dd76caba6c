use crate::error::SignalingError;
use crate::signaling::{RoomChange, SignalingRelay, Subscription};
use async_trait::async_trait;
use callroom_core::{CallRoom, CandidateCollection, IceCandidate, RoomId};
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::mpsc;
use tracing::{debug, info};

type WatcherId = u64;

#[derive(Default)]
struct RoomState {
    /// `None` while the room does not exist (never created, or deleted).
    record: Option<CallRoom>,
    offer_candidates: Vec<IceCandidate>,
    answer_candidates: Vec<IceCandidate>,
    room_watchers: Vec<(WatcherId, mpsc::UnboundedSender<RoomChange>)>,
    candidate_watchers: Vec<(
        WatcherId,
        CandidateCollection,
        mpsc::UnboundedSender<IceCandidate>,
    )>,
}

impl RoomState {
    fn candidates_mut(&mut self, collection: CandidateCollection) -> &mut Vec<IceCandidate> {
        match collection {
            CandidateCollection::OfferCandidates => &mut self.offer_candidates,
            CandidateCollection::AnswerCandidates => &mut self.answer_candidates,
        }
    }

    fn candidates(&self, collection: CandidateCollection) -> &[IceCandidate] {
        match collection {
            CandidateCollection::OfferCandidates => &self.offer_candidates,
            CandidateCollection::AnswerCandidates => &self.answer_candidates,
        }
    }

    fn notify_room(&mut self, change: RoomChange) {
        self.room_watchers
            .retain(|(_, tx)| tx.send(change.clone()).is_ok());
    }

    fn notify_candidate(&mut self, collection: CandidateCollection, candidate: &IceCandidate) {
        self.candidate_watchers.retain(|(_, c, tx)| {
            *c != collection || tx.send(candidate.clone()).is_ok()
        });
    }

    /// Applies a write and tells room watchers whether it created or changed
    /// the record.
    fn write(&mut self, apply: impl FnOnce(&mut CallRoom)) {
        let change = match self.record.as_mut() {
            Some(record) => {
                apply(record);
                RoomChange::modified(record.clone())
            }
            None => {
                let mut record = CallRoom::default();
                apply(&mut record);
                self.record = Some(record.clone());
                RoomChange::added(record)
            }
        };
        self.notify_room(change);
    }
}

struct RelayInner {
    rooms: DashMap<RoomId, RoomState>,
    next_watcher: AtomicU64,
}

impl RelayInner {
    fn watcher_id(&self) -> WatcherId {
        self.next_watcher.fetch_add(1, Ordering::Relaxed)
    }
}

/// In-process [`SignalingRelay`].
///
/// Clones share the same rooms, so two sessions given clones of one relay
/// can negotiate with each other.
#[derive(Clone)]
pub struct MemoryRelay {
    inner: Arc<RelayInner>,
}

impl Default for MemoryRelay {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRelay {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RelayInner {
                rooms: DashMap::new(),
                next_watcher: AtomicU64::new(0),
            }),
        }
    }

    /// Current record of `room_id`, `None` if the room does not exist.
    pub fn room(&self, room_id: &RoomId) -> Option<CallRoom> {
        self.inner
            .rooms
            .get(room_id)
            .and_then(|state| state.record.clone())
    }

    pub fn candidates(&self, room_id: &RoomId, collection: CandidateCollection) -> Vec<IceCandidate> {
        self.inner
            .rooms
            .get(room_id)
            .map(|state| state.candidates(collection).to_vec())
            .unwrap_or_default()
    }

    fn remove_watcher(inner: &Weak<RelayInner>, room_id: &RoomId, id: WatcherId) {
        let Some(inner) = inner.upgrade() else { return };
        if let Some(mut state) = inner.rooms.get_mut(room_id) {
            state.room_watchers.retain(|(w, _)| *w != id);
            state.candidate_watchers.retain(|(w, _, _)| *w != id);
        }
    }
}

#[async_trait]
impl SignalingRelay for MemoryRelay {
    async fn get_or_create_room(&self, room_id: &RoomId) -> Result<CallRoom, SignalingError> {
        let mut state = self.inner.rooms.entry(room_id.clone()).or_default();
        if let Some(record) = &state.record {
            return Ok(record.clone());
        }

        info!("Creating room {}", room_id.path());
        state.write(|_| {});
        Ok(CallRoom::default())
    }

    async fn set_room(&self, room_id: &RoomId, room: CallRoom) -> Result<(), SignalingError> {
        debug!("Overwriting room {}", room_id.path());
        let mut state = self.inner.rooms.entry(room_id.clone()).or_default();
        state.write(|record| *record = room);
        Ok(())
    }

    async fn write_room(&self, room_id: &RoomId, patch: CallRoom) -> Result<(), SignalingError> {
        debug!("Merging into room {}", room_id.path());
        let mut state = self.inner.rooms.entry(room_id.clone()).or_default();
        state.write(|record| record.merge(patch));
        Ok(())
    }

    async fn subscribe_room(
        &self,
        room_id: &RoomId,
    ) -> Result<Subscription<RoomChange>, SignalingError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.inner.watcher_id();

        let mut state = self.inner.rooms.entry(room_id.clone()).or_default();
        if let Some(record) = &state.record {
            let _ = tx.send(RoomChange::added(record.clone()));
        }
        state.room_watchers.push((id, tx));
        drop(state);

        let weak = Arc::downgrade(&self.inner);
        let room_id = room_id.clone();
        Ok(Subscription::new(rx, move || {
            MemoryRelay::remove_watcher(&weak, &room_id, id)
        }))
    }

    async fn append_candidate(
        &self,
        room_id: &RoomId,
        collection: CandidateCollection,
        candidate: IceCandidate,
    ) -> Result<(), SignalingError> {
        let mut state = match self.inner.rooms.get_mut(room_id) {
            Some(state) if state.record.is_some() => state,
            _ => {
                debug!("Dropping candidate for missing room {}", room_id.path());
                return Err(SignalingError::RoomNotFound(room_id.clone()));
            }
        };
        state.notify_candidate(collection, &candidate);
        state.candidates_mut(collection).push(candidate);
        Ok(())
    }

    async fn subscribe_candidates(
        &self,
        room_id: &RoomId,
        collection: CandidateCollection,
    ) -> Result<Subscription<IceCandidate>, SignalingError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.inner.watcher_id();

        let mut state = self.inner.rooms.entry(room_id.clone()).or_default();
        for candidate in state.candidates(collection) {
            let _ = tx.send(candidate.clone());
        }
        state.candidate_watchers.push((id, collection, tx));
        drop(state);

        let weak = Arc::downgrade(&self.inner);
        let room_id = room_id.clone();
        Ok(Subscription::new(rx, move || {
            MemoryRelay::remove_watcher(&weak, &room_id, id)
        }))
    }

    async fn delete_room(&self, room_id: &RoomId) -> Result<(), SignalingError> {
        // Watchers are dropped with the entry, which ends their streams.
        let Some((_, mut state)) = self.inner.rooms.remove(room_id) else {
            return Ok(());
        };
        if state.record.take().is_some() {
            info!("Deleting room {}", room_id.path());
            state.notify_room(RoomChange::removed());
        }
        Ok(())
    }
}
