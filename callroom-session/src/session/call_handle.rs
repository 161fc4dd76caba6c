use crate::error::SessionError;
use crate::session::{SessionCommand, SessionEvent, SessionSnapshot};
use callroom_core::{ConnectionPhase, Role, RoomId};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::Instant;

/// Application-side handle to a running call.
///
/// Dropping the handle ends the call, the same way unmounting the call view
/// does.
#[derive(Debug)]
pub struct CallHandle {
    room_id: RoomId,
    role: Role,
    commands: mpsc::Sender<SessionCommand>,
    phase: watch::Receiver<ConnectionPhase>,
    started_at: Instant,
    events: Option<mpsc::UnboundedReceiver<SessionEvent>>,
}

impl CallHandle {
    pub(crate) fn new(
        room_id: RoomId,
        role: Role,
        commands: mpsc::Sender<SessionCommand>,
        phase: watch::Receiver<ConnectionPhase>,
        events: mpsc::UnboundedReceiver<SessionEvent>,
    ) -> Self {
        Self {
            room_id,
            role,
            commands,
            phase,
            started_at: Instant::now(),
            events: Some(events),
        }
    }

    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn phase(&self) -> ConnectionPhase {
        *self.phase.borrow()
    }

    /// Time since the session was started, for the call timer.
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Event stream of the session. Only the first call returns it.
    pub fn take_events(&mut self) -> Option<mpsc::UnboundedReceiver<SessionEvent>> {
        self.events.take()
    }

    /// Waits until the session reaches `target`.
    ///
    /// Returns early with the phase that makes `target` unreachable: `Closed`,
    /// or `Error` when waiting for a phase before teardown.
    pub async fn wait_for_phase(
        &self,
        target: ConnectionPhase,
    ) -> Result<ConnectionPhase, SessionError> {
        let mut rx = self.phase.clone();
        let reached = rx
            .wait_for(|phase| {
                *phase == target
                    || *phase == ConnectionPhase::Closed
                    || (*phase == ConnectionPhase::Error && !target.is_terminal())
            })
            .await
            .map_err(|_| SessionError::Closed)?;
        Ok(*reached)
    }

    /// Ends the call and waits for teardown. Calling it on a session that is
    /// already gone does nothing.
    pub async fn hangup(&self) {
        let _ = self
            .request(|reply| SessionCommand::Hangup { reply })
            .await;
    }

    /// Returns whether the microphone is now enabled.
    pub async fn toggle_mic(&self) -> Result<bool, SessionError> {
        self.request(|reply| SessionCommand::ToggleMic { reply })
            .await?
    }

    /// Returns whether the camera is now enabled.
    pub async fn toggle_cam(&self) -> Result<bool, SessionError> {
        self.request(|reply| SessionCommand::ToggleCam { reply })
            .await?
    }

    /// Returns whether the screen is now being shared.
    pub async fn toggle_screen_share(&self) -> Result<bool, SessionError> {
        self.request(|reply| SessionCommand::ToggleScreenShare { reply })
            .await?
    }

    pub async fn snapshot(&self) -> Result<SessionSnapshot, SessionError> {
        self.request(|reply| SessionCommand::Snapshot { reply })
            .await
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> SessionCommand,
    ) -> Result<T, SessionError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(command(reply))
            .await
            .map_err(|_| SessionError::Closed)?;
        response.await.map_err(|_| SessionError::Closed)
    }

    pub(crate) fn downgrade(&self) -> mpsc::WeakSender<SessionCommand> {
        self.commands.downgrade()
    }
}
