use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use super::file::FileCamera;
use super::synthetic::SyntheticCamera;
use crate::error::CaptureError;

/// Kind of an input track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Audio,
    Video,
}

/// A piece of encoded media delivered by the device while it is live
#[derive(Debug, Clone)]
pub struct MediaFragment {
    /// Encoded bytes
    pub data: Vec<u8>,
    /// Milliseconds since the device started producing
    pub timestamp_ms: u64,
}

/// One input track of an acquired stream
///
/// Clones share the same live flag, so the producer side sees `stop()`.
#[derive(Debug, Clone)]
pub struct MediaTrack {
    kind: TrackKind,
    label: String,
    live: Arc<AtomicBool>,
}

impl MediaTrack {
    pub fn new(kind: TrackKind, label: impl Into<String>) -> Self {
        Self {
            kind,
            label: label.into(),
            live: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn kind(&self) -> TrackKind {
        self.kind
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }

    /// Release the device lock held by this track
    pub fn stop(&self) {
        self.live.store(false, Ordering::SeqCst);
    }
}

/// The tracks of an acquired stream
///
/// Dropping the set stops every track so the device lock is never leaked.
#[derive(Debug)]
pub struct TrackSet {
    tracks: Vec<MediaTrack>,
}

impl TrackSet {
    pub fn new(tracks: Vec<MediaTrack>) -> Self {
        Self { tracks }
    }

    pub fn tracks(&self) -> &[MediaTrack] {
        &self.tracks
    }

    pub fn has_kind(&self, kind: TrackKind) -> bool {
        self.tracks.iter().any(|t| t.kind() == kind)
    }

    pub fn any_live(&self) -> bool {
        self.tracks.iter().any(MediaTrack::is_live)
    }

    pub fn stop_all(&self) {
        for track in &self.tracks {
            track.stop();
        }
    }
}

impl Drop for TrackSet {
    fn drop(&mut self) {
        self.stop_all();
    }
}

/// An acquired audio+video input stream
#[derive(Debug)]
pub struct MediaStream {
    pub tracks: TrackSet,
    pub fragments: mpsc::Receiver<MediaFragment>,
    pub mime_type: String,
}

impl MediaStream {
    pub fn new(
        tracks: Vec<MediaTrack>,
        fragments: mpsc::Receiver<MediaFragment>,
        mime_type: impl Into<String>,
    ) -> Self {
        Self {
            tracks: TrackSet::new(tracks),
            fragments,
            mime_type: mime_type.into(),
        }
    }
}

/// Capture device trait
///
/// Implementations:
/// - Synthetic: test-pattern fragments on a fixed cadence
/// - File: replays a recorded file as if it were a live camera
#[async_trait::async_trait]
pub trait CaptureDevice: Send + Sync {
    /// Request an audio+video input stream
    ///
    /// Fails with `DeviceUnavailable` when permission is denied or no device exists.
    async fn acquire(&mut self) -> Result<MediaStream, CaptureError>;

    /// Get device name for logging
    fn name(&self) -> &str;
}

/// Capture source type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureSource {
    Synthetic,
    File,
}

/// Configuration for the capture device used by new sessions
#[derive(Debug, Clone, Deserialize)]
pub struct CaptureSourceConfig {
    #[serde(default = "default_source")]
    pub source: CaptureSource,
    /// Recording to replay when `source = "file"`
    #[serde(default)]
    pub file_path: Option<PathBuf>,
    #[serde(default = "default_fragment_bytes")]
    pub fragment_bytes: usize,
    #[serde(default = "default_fragment_interval_ms")]
    pub fragment_interval_ms: u64,
}

fn default_source() -> CaptureSource {
    CaptureSource::Synthetic
}

fn default_fragment_bytes() -> usize {
    4096
}

fn default_fragment_interval_ms() -> u64 {
    250
}

impl Default for CaptureSourceConfig {
    fn default() -> Self {
        Self {
            source: default_source(),
            file_path: None,
            fragment_bytes: default_fragment_bytes(),
            fragment_interval_ms: default_fragment_interval_ms(),
        }
    }
}

/// Capture device factory
pub struct CaptureDeviceFactory;

impl CaptureDeviceFactory {
    /// Create a fresh device for one session
    pub fn create(config: &CaptureSourceConfig, mime_type: &str) -> Box<dyn CaptureDevice> {
        let interval = Duration::from_millis(config.fragment_interval_ms.max(1));
        let fragment_bytes = config.fragment_bytes.max(1);

        match config.source {
            CaptureSource::Synthetic => Box::new(
                SyntheticCamera::new(fragment_bytes, interval).with_mime_type(mime_type),
            ),
            CaptureSource::File => Box::new(
                FileCamera::new(config.file_path.clone(), fragment_bytes, interval)
                    .with_mime_type(mime_type),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_track_set_drop_stops_tracks() {
        let video = MediaTrack::new(TrackKind::Video, "cam");
        let audio = MediaTrack::new(TrackKind::Audio, "mic");
        let video_track = video.clone();

        let set = TrackSet::new(vec![video, audio]);
        assert!(set.any_live());
        assert!(set.has_kind(TrackKind::Audio));

        drop(set);
        assert!(!video_track.is_live(), "Dropping the stream must release the device");
    }

    #[test]
    fn test_capture_source_config_default() {
        let config = CaptureSourceConfig::default();

        assert_eq!(config.source, CaptureSource::Synthetic);
        assert_eq!(config.fragment_bytes, 4096);
        assert_eq!(config.fragment_interval_ms, 250);
        assert!(config.file_path.is_none());
    }
}
