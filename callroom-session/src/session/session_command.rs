use crate::error::SessionError;
use crate::session::MediaState;
use callroom_core::{ConnectionPhase, Role};
use tokio::sync::oneshot;

/// Requests sent to a running session by its [`crate::CallHandle`].
#[derive(Debug)]
pub enum SessionCommand {
    /// Flips the microphone; replies with the new `enabled` value.
    ToggleMic {
        reply: oneshot::Sender<Result<bool, SessionError>>,
    },

    /// Flips the camera; replies with the new `enabled` value.
    ToggleCam {
        reply: oneshot::Sender<Result<bool, SessionError>>,
    },

    /// Starts or stops screen sharing; replies with whether sharing is on.
    ToggleScreenShare {
        reply: oneshot::Sender<Result<bool, SessionError>>,
    },

    /// Ends the call. Replies once teardown is done (or was already running).
    Hangup { reply: oneshot::Sender<()> },

    Snapshot {
        reply: oneshot::Sender<SessionSnapshot>,
    },
}

/// Point-in-time view of a session's state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub phase: ConnectionPhase,
    pub role: Role,
    pub pending_candidates: usize,
    pub media: MediaState,
    pub has_remote_stream: bool,
}
