use crate::error::MediaError;
use crate::media::{MediaConstraints, MediaDevices, MediaKind, MediaTrack};
use anyhow::{Result, bail};
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;
use webrtc::api::media_engine::{MIME_TYPE_OPUS, MIME_TYPE_VP8};
use webrtc::media::Sample;
use webrtc::rtp_transceiver::rtp_codec::RTCRtpCodecCapability;
use webrtc::track::track_local::TrackLocal;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;

/// A local track fed with already-encoded samples (Opus audio or VP8 video).
///
/// Clones share the same underlying track and flags.
#[derive(Clone)]
pub struct SampleTrack {
    local: Arc<TrackLocalStaticSample>,
    kind: MediaKind,
    enabled: Arc<AtomicBool>,
    stopped: Arc<AtomicBool>,
}

impl SampleTrack {
    pub fn new(kind: MediaKind, stream_id: impl Into<String>) -> Self {
        let codec = match kind {
            MediaKind::Audio => RTCRtpCodecCapability {
                mime_type: MIME_TYPE_OPUS.to_owned(),
                clock_rate: 48000,
                channels: 2,
                ..Default::default()
            },
            MediaKind::Video => RTCRtpCodecCapability {
                mime_type: MIME_TYPE_VP8.to_owned(),
                clock_rate: 90000,
                ..Default::default()
            },
        };

        let prefix = match kind {
            MediaKind::Audio => "audio",
            MediaKind::Video => "video",
        };

        Self {
            local: Arc::new(TrackLocalStaticSample::new(
                codec,
                format!("{}-{}", prefix, Uuid::new_v4()),
                stream_id.into(),
            )),
            kind,
            enabled: Arc::new(AtomicBool::new(true)),
            stopped: Arc::new(AtomicBool::new(false)),
        }
    }

    /// The handle the peer connection sends from.
    pub fn local(&self) -> Arc<dyn TrackLocal + Send + Sync> {
        self.local.clone()
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    /// Pushes one encoded frame. Muted tracks swallow the sample.
    pub async fn write_sample(&self, data: Bytes, duration: Duration) -> Result<()> {
        if self.is_stopped() {
            bail!("track {} is stopped", self.id());
        }
        if !self.is_enabled() {
            return Ok(());
        }

        self.local
            .write_sample(&Sample {
                data,
                duration,
                ..Default::default()
            })
            .await?;
        Ok(())
    }
}

impl MediaTrack for SampleTrack {
    fn id(&self) -> String {
        self.local.id().to_owned()
    }

    fn kind(&self) -> MediaKind {
        self.kind
    }

    fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Release);
    }

    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    fn stop(&self) {
        if !self.stopped.swap(true, Ordering::AcqRel) {
            debug!("Track {} stopped", self.id());
        }
    }
}

/// Hands out fresh [`SampleTrack`]s. The application owns capture and
/// encoding and writes into the tracks it gets back.
#[derive(Debug, Clone)]
pub struct SampleTrackDevices {
    stream_id: String,
}

impl SampleTrackDevices {
    pub fn new(stream_id: impl Into<String>) -> Self {
        Self {
            stream_id: stream_id.into(),
        }
    }
}

impl Default for SampleTrackDevices {
    fn default() -> Self {
        Self::new(format!("stream-{}", Uuid::new_v4()))
    }
}

#[async_trait]
impl MediaDevices for SampleTrackDevices {
    type Track = SampleTrack;

    async fn acquire(&self, constraints: MediaConstraints) -> Result<Vec<SampleTrack>, MediaError> {
        let mut tracks = Vec::new();
        if constraints.audio {
            tracks.push(SampleTrack::new(MediaKind::Audio, self.stream_id.clone()));
        }
        if constraints.video {
            tracks.push(SampleTrack::new(MediaKind::Video, self.stream_id.clone()));
        }

        if tracks.is_empty() {
            return Err(MediaError::NotFound);
        }
        Ok(tracks)
    }
}
