use crate::error::DeviceError;
use crate::media::MediaStream;
use async_trait::async_trait;

/// Which kinds of capture a request asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaConstraints {
    pub audio: bool,
    pub video: bool,
}

impl MediaConstraints {
    pub const AUDIO_VIDEO: Self = Self {
        audio: true,
        video: true,
    };

    pub const VIDEO_ONLY: Self = Self {
        audio: false,
        video: true,
    };
}

/// Capture devices of the platform the session runs on.
#[async_trait]
pub trait MediaDevices: Send + Sync + 'static {
    /// Camera and microphone capture.
    async fn get_user_media(&self, constraints: MediaConstraints)
    -> Result<MediaStream, DeviceError>;

    /// Screen capture.
    async fn get_display_media(
        &self,
        constraints: MediaConstraints,
    ) -> Result<MediaStream, DeviceError>;
}
