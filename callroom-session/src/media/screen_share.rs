use crate::error::ScreenShareError;
use crate::media::{MediaConstraints, MediaDevices, MediaKind, MediaStream, MediaTrack};
use crate::transport::PeerConnection;
use tracing::{info, warn};

/// Swaps the outgoing video between the camera and a screen capture.
///
/// Only the sender's track changes; no new offer/answer round is needed. The
/// camera track stays live while the screen is shared so it can be put back.
#[derive(Debug, Default)]
pub struct ScreenShare {
    active: Option<MediaTrack>,
}

impl ScreenShare {
    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn active_track(&self) -> Option<&MediaTrack> {
        self.active.as_ref()
    }

    /// Starts sharing and returns the screen-only preview stream.
    pub async fn start(
        &mut self,
        devices: &dyn MediaDevices,
        peer: &dyn PeerConnection,
    ) -> Result<MediaStream, ScreenShareError> {
        if let Some(track) = &self.active {
            return Ok(MediaStream::new(vec![track.clone()]));
        }

        let capture = devices.get_display_media(MediaConstraints::VIDEO_ONLY).await?;
        let Some(track) = capture.video_tracks().next().cloned() else {
            capture.stop_all();
            return Err(ScreenShareError::NoVideoTrack);
        };

        // Anything besides the first video track is unused.
        for extra in capture.tracks().iter().filter(|t| **t != track) {
            extra.stop();
        }

        if let Err(e) = peer.replace_track(MediaKind::Video, &track).await {
            track.stop();
            return Err(e.into());
        }

        info!("Screen sharing started with track {}", track.id());
        self.active = Some(track.clone());
        Ok(MediaStream::new(vec![track]))
    }

    /// Stops sharing and puts the camera track back on the video sender.
    /// Returns `false` when nothing was being shared.
    pub async fn stop(
        &mut self,
        camera: &MediaStream,
        peer: &dyn PeerConnection,
    ) -> Result<bool, ScreenShareError> {
        let Some(track) = self.active.take() else {
            return Ok(false);
        };
        track.stop();

        match camera.video_tracks().next() {
            Some(camera_track) => peer.replace_track(MediaKind::Video, camera_track).await?,
            None => warn!("No camera track to restore after screen sharing"),
        }

        info!("Screen sharing stopped, camera restored");
        Ok(true)
    }

    /// Stops the capture without touching the connection. Used on teardown.
    pub fn release(&mut self) {
        if let Some(track) = self.active.take() {
            track.stop();
        }
    }
}
