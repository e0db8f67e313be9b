use crate::error::MediaError;
use async_trait::async_trait;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Audio,
    Video,
}

/// One local capture track (microphone, camera, screen).
pub trait MediaTrack: Clone + Send + Sync + 'static {
    fn id(&self) -> String;

    fn kind(&self) -> MediaKind;

    /// Muting keeps the track attached but stops it from carrying media.
    fn set_enabled(&self, enabled: bool);

    fn is_enabled(&self) -> bool;

    /// Releases the capture device. A stopped track never restarts.
    fn stop(&self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaConstraints {
    pub audio: bool,
    pub video: bool,
}

impl Default for MediaConstraints {
    fn default() -> Self {
        Self {
            audio: true,
            video: true,
        }
    }
}

/// Source of local media tracks.
#[async_trait]
pub trait MediaDevices: Send + Sync {
    type Track: MediaTrack;

    async fn acquire(&self, constraints: MediaConstraints) -> Result<Vec<Self::Track>, MediaError>;
}
