use crate::error::{ScreenShareError, SessionError};
use crate::media::MediaStream;
use callroom_core::ConnectionPhase;

/// Local media switches as the user sees them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaState {
    pub mic_enabled: bool,
    pub cam_enabled: bool,
    pub screen_sharing: bool,
}

impl Default for MediaState {
    fn default() -> Self {
        Self {
            mic_enabled: true,
            cam_enabled: true,
            screen_sharing: false,
        }
    }
}

/// Notifications a session pushes to the application.
#[derive(Debug)]
pub enum SessionEvent {
    PhaseChanged(ConnectionPhase),

    /// Stream to render as the local preview: the camera stream, or the
    /// screen-only stream while sharing.
    LocalPreview(MediaStream),

    /// Combined stream of every remote track received so far.
    RemotePreview(MediaStream),

    MediaStateChanged(MediaState),

    /// The session moved to `Error`.
    Failed(SessionError),

    /// Screen sharing failed; the call continues with the camera.
    ScreenShareFailed(ScreenShareError),

    /// The transport failed after the call was connected.
    ConnectionLost,

    /// The other participant ended the call and removed the room.
    RoomClosed,
}
