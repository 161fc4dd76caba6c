use crate::media::MediaKind;
use callroom_core::{RoomId, SdpType};
use std::time::Duration;
use thiserror::Error;

/// Failure to obtain local capture devices.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DeviceError {
    #[error("permission to use the camera or microphone was denied")]
    PermissionDenied,

    #[error("no camera or microphone was found")]
    NotFound,

    #[error("camera or microphone is already in use or cannot be read")]
    InUse,

    #[error("no device satisfies the requested constraints: {constraint}")]
    Overconstrained { constraint: String },

    #[error("error accessing camera/microphone: {0}")]
    Other(String),
}

impl DeviceError {
    /// Classifies a platform capture error by its DOM exception name.
    pub fn from_platform(name: &str, message: &str) -> Self {
        match name {
            "NotAllowedError" | "PermissionDeniedError" | "SecurityError" => {
                DeviceError::PermissionDenied
            }
            "NotFoundError" | "DevicesNotFoundError" => DeviceError::NotFound,
            "NotReadableError" | "TrackStartError" | "AbortError" => DeviceError::InUse,
            "OverconstrainedError" | "ConstraintNotSatisfiedError" => {
                DeviceError::Overconstrained {
                    constraint: message.to_owned(),
                }
            }
            _ => DeviceError::Other(format!("{name}: {message}")),
        }
    }

    /// Text shown to the user when the call cannot start.
    pub fn user_message(&self) -> String {
        match self {
            DeviceError::PermissionDenied => {
                "Camera and microphone access was blocked. Allow access in your browser settings and start the call again.".to_owned()
            }
            DeviceError::NotFound => {
                "No camera or microphone was found. Connect a device and start the call again.".to_owned()
            }
            DeviceError::InUse => {
                "Camera or microphone is already in use by another application or tab. Close it and try again.".to_owned()
            }
            DeviceError::Overconstrained { .. } => {
                "Your camera or microphone does not support the requested settings.".to_owned()
            }
            DeviceError::Other(detail) => format!("Error accessing camera/microphone: {detail}"),
        }
    }
}

/// Failures of the peer-connection backend.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("webrtc: {0}")]
    Webrtc(#[from] webrtc::Error),

    #[error("malformed ICE candidate: {0}")]
    Json(#[from] serde_json::Error),

    #[error("peer connection is closed")]
    Closed,

    #[error("no outgoing {0} sender")]
    NoSender(MediaKind),

    #[error("unsupported session description type: {0}")]
    UnsupportedSdp(SdpType),

    #[error("{0}")]
    Backend(String),
}

/// Failures of the signaling relay.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SignalingError {
    #[error("room {0} does not exist")]
    RoomNotFound(RoomId),

    #[error("signaling relay unavailable: {0}")]
    Unavailable(String),
}

/// Fatal failure of the current offer/answer attempt.
#[derive(Debug, Error)]
pub enum NegotiationError {
    #[error("peer connection setup failed: {0}")]
    Setup(#[source] TransportError),

    #[error("failed to create {0}: {1}")]
    CreateDescription(SdpType, #[source] TransportError),

    #[error("failed to apply local {0}: {1}")]
    SetLocalDescription(SdpType, #[source] TransportError),

    #[error("failed to apply remote {0}: {1}")]
    SetRemoteDescription(SdpType, #[source] TransportError),

    #[error("signaling failed during negotiation: {0}")]
    Signaling(#[from] SignalingError),

    #[error("no {expected} arrived within {waited:?}")]
    Timeout { expected: SdpType, waited: Duration },
}

/// A single remote candidate could not be applied. Never fatal.
#[derive(Debug, Error)]
#[error("failed to apply ICE candidate: {0}")]
pub struct CandidateApplyError(#[source] pub TransportError);

/// Screen sharing could not start or stop. The call stays in camera mode.
#[derive(Debug, Error)]
pub enum ScreenShareError {
    #[error("screen capture failed: {0}")]
    Capture(#[from] DeviceError),

    #[error("screen capture returned no video track")]
    NoVideoTrack,

    #[error("failed to swap the outgoing video track: {0}")]
    Replace(#[from] TransportError),

    #[error("no peer connection to share into")]
    NotConnected,
}

/// Errors surfaced to the application through [`crate::CallHandle`].
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Device(#[from] DeviceError),

    #[error(transparent)]
    Negotiation(#[from] NegotiationError),

    #[error(transparent)]
    ScreenShare(#[from] ScreenShareError),

    #[error("local media is not available")]
    MediaUnavailable,

    #[error("room {0} already has an active session")]
    RoomBusy(RoomId),

    #[error("cannot start a call with yourself")]
    SelfCall,

    #[error("session is closed")]
    Closed,
}
