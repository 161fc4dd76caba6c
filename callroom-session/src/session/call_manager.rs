use crate::config::SessionConfig;
use crate::error::SessionError;
use crate::media::MediaDevices;
use crate::session::{CallHandle, CallSession, SessionCommand, SessionSetup};
use crate::signaling::SignalingRelay;
use crate::transport::PeerConnectionFactory;
use callroom_core::{ParticipantId, RoomId};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::info;
use uuid::Uuid;

struct ActiveSession {
    id: Uuid,
    commands: mpsc::WeakSender<SessionCommand>,
}

/// Starts call sessions and keeps at most one running per room.
#[derive(Clone)]
pub struct CallManager {
    sessions: Arc<DashMap<RoomId, ActiveSession>>,
    relay: Arc<dyn SignalingRelay>,
    devices: Arc<dyn MediaDevices>,
    factory: Arc<dyn PeerConnectionFactory>,
    config: SessionConfig,
}

impl CallManager {
    pub fn new(
        relay: Arc<dyn SignalingRelay>,
        devices: Arc<dyn MediaDevices>,
        factory: Arc<dyn PeerConnectionFactory>,
        config: SessionConfig,
    ) -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
            relay,
            devices,
            factory,
            config,
        }
    }

    /// Spawns a session for `room_id` between `local` and `remote`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start_session(
        &self,
        room_id: RoomId,
        local: ParticipantId,
        remote: ParticipantId,
    ) -> Result<CallHandle, SessionError> {
        if local == remote {
            return Err(SessionError::SelfCall);
        }

        let (session, handle) = CallSession::new(SessionSetup {
            room_id: room_id.clone(),
            local_id: local,
            remote_id: remote,
            config: self.config.clone(),
            relay: self.relay.clone(),
            devices: self.devices.clone(),
            factory: self.factory.clone(),
        });

        let id = Uuid::new_v4();
        match self.sessions.entry(room_id.clone()) {
            Entry::Occupied(_) => return Err(SessionError::RoomBusy(room_id)),
            Entry::Vacant(vacant) => {
                vacant.insert(ActiveSession {
                    id,
                    commands: handle.downgrade(),
                });
            }
        }

        info!("Starting call session {} in {}", id, room_id.path());
        let sessions = self.sessions.clone();
        tokio::spawn(async move {
            session.run().await;
            sessions.remove_if(&room_id, |_, active| active.id == id);
        });

        Ok(handle)
    }

    /// Rooms with a session that has not finished yet.
    pub fn active_sessions(&self) -> Vec<RoomId> {
        self.sessions.iter().map(|e| e.key().clone()).collect()
    }

    /// Hangs up every running session and waits for their teardown.
    pub async fn shutdown(&self) {
        let senders: Vec<_> = self
            .sessions
            .iter()
            .filter_map(|e| e.value().commands.upgrade())
            .collect();
        info!("Shutting down {} call sessions", senders.len());

        for tx in senders {
            let (reply, done) = oneshot::channel();
            if tx.send(SessionCommand::Hangup { reply }).await.is_ok() {
                let _ = done.await;
            }
        }
    }
}
