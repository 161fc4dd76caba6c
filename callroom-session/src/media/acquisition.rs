use crate::error::DeviceError;
use crate::media::{MediaConstraints, MediaDevices, MediaKind, MediaStream};
use tracing::{info, warn};

/// Requests simultaneous camera and microphone capture.
///
/// A stream that lacks either an audio or a video track is released and
/// reported as [`DeviceError::NotFound`].
pub async fn acquire_local_media(devices: &dyn MediaDevices) -> Result<MediaStream, DeviceError> {
    let stream = match devices.get_user_media(MediaConstraints::AUDIO_VIDEO).await {
        Ok(stream) => stream,
        Err(e) => {
            warn!("Local media acquisition failed: {}", e);
            return Err(e);
        }
    };

    for kind in [MediaKind::Audio, MediaKind::Video] {
        if !stream.has_kind(kind) {
            warn!("Captured stream {} has no {} track", stream.id(), kind);
            stream.stop_all();
            return Err(DeviceError::NotFound);
        }
    }

    info!(
        "Local media acquired: stream {} with {} tracks",
        stream.id(),
        stream.tracks().len()
    );
    Ok(stream)
}
