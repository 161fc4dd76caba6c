use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::watch;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Audio,
    Video,
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaKind::Audio => f.write_str("audio"),
            MediaKind::Video => f.write_str("video"),
        }
    }
}

/// Where a track's content comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackSource {
    Microphone,
    Camera,
    Screen,
    Remote,
}

#[derive(Debug)]
struct TrackInner {
    id: String,
    kind: MediaKind,
    source: TrackSource,
    label: String,
    enabled: AtomicBool,
    ended: watch::Sender<bool>,
}

/// Shared handle to one live media track.
///
/// Clones refer to the same track: disabling or stopping it through one
/// clone is visible through all of them.
#[derive(Debug, Clone)]
pub struct MediaTrack(Arc<TrackInner>);

impl MediaTrack {
    pub fn new(kind: MediaKind, source: TrackSource, label: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4().to_string(), kind, source, label)
    }

    pub fn with_id(
        id: impl Into<String>,
        kind: MediaKind,
        source: TrackSource,
        label: impl Into<String>,
    ) -> Self {
        let (ended, _) = watch::channel(false);
        Self(Arc::new(TrackInner {
            id: id.into(),
            kind,
            source,
            label: label.into(),
            enabled: AtomicBool::new(true),
            ended,
        }))
    }

    pub fn id(&self) -> &str {
        &self.0.id
    }

    pub fn kind(&self) -> MediaKind {
        self.0.kind
    }

    pub fn source(&self) -> TrackSource {
        self.0.source
    }

    pub fn label(&self) -> &str {
        &self.0.label
    }

    pub fn enabled(&self) -> bool {
        self.0.enabled.load(Ordering::Acquire)
    }

    /// Muting keeps the track attached; it only stops carrying content.
    pub fn set_enabled(&self, enabled: bool) {
        self.0.enabled.store(enabled, Ordering::Release);
    }

    /// Releases the underlying device. Also used by platforms to report that
    /// the user ended the capture from outside the application.
    pub fn stop(&self) {
        self.0.ended.send_replace(true);
    }

    pub fn is_ended(&self) -> bool {
        *self.0.ended.borrow()
    }

    /// Resolves once the track has ended.
    pub async fn ended(&self) {
        let mut rx = self.0.ended.subscribe();
        let _ = rx.wait_for(|ended| *ended).await;
    }
}

impl PartialEq for MediaTrack {
    fn eq(&self, other: &Self) -> bool {
        self.0.id == other.0.id
    }
}

impl Eq for MediaTrack {}

/// Ordered group of tracks rendered together (a preview).
#[derive(Debug, Clone)]
pub struct MediaStream {
    id: String,
    tracks: Vec<MediaTrack>,
}

impl MediaStream {
    pub fn new(tracks: Vec<MediaTrack>) -> Self {
        Self::with_id(Uuid::new_v4().to_string(), tracks)
    }

    pub fn with_id(id: impl Into<String>, tracks: Vec<MediaTrack>) -> Self {
        Self {
            id: id.into(),
            tracks,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn tracks(&self) -> &[MediaTrack] {
        &self.tracks
    }

    pub fn audio_tracks(&self) -> impl Iterator<Item = &MediaTrack> {
        self.tracks.iter().filter(|t| t.kind() == MediaKind::Audio)
    }

    pub fn video_tracks(&self) -> impl Iterator<Item = &MediaTrack> {
        self.tracks.iter().filter(|t| t.kind() == MediaKind::Video)
    }

    pub fn has_kind(&self, kind: MediaKind) -> bool {
        self.tracks.iter().any(|t| t.kind() == kind)
    }

    /// Adds `track` unless a track with the same id is already present.
    pub fn add_track(&mut self, track: MediaTrack) -> bool {
        if self.tracks.contains(&track) {
            return false;
        }
        self.tracks.push(track);
        true
    }

    pub fn stop_all(&self) {
        for track in &self.tracks {
            track.stop();
        }
    }
}
