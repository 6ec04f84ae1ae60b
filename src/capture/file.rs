use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info};

use super::device::{CaptureDevice, MediaFragment, MediaStream, MediaTrack, TrackKind};
use crate::error::CaptureError;

/// Replays a recorded media file as a live camera, looping at the end
pub struct FileCamera {
    path: Option<PathBuf>,
    fragment_bytes: usize,
    interval: Duration,
    mime_type: String,
}

impl FileCamera {
    pub fn new(path: Option<PathBuf>, fragment_bytes: usize, interval: Duration) -> Self {
        Self {
            path,
            fragment_bytes,
            interval,
            mime_type: "video/webm".to_string(),
        }
    }

    pub fn with_mime_type(mut self, mime_type: &str) -> Self {
        self.mime_type = mime_type.to_string();
        self
    }
}

#[async_trait::async_trait]
impl CaptureDevice for FileCamera {
    async fn acquire(&mut self) -> Result<MediaStream, CaptureError> {
        let path = self.path.as_ref().ok_or_else(|| {
            CaptureError::DeviceUnavailable("no capture file configured".to_string())
        })?;

        let bytes = tokio::fs::read(path).await.map_err(|e| {
            CaptureError::DeviceUnavailable(format!("{}: {}", path.display(), e))
        })?;

        if bytes.is_empty() {
            return Err(CaptureError::DeviceUnavailable(format!(
                "{} is empty",
                path.display()
            )));
        }

        info!(
            "File camera opened {} ({} bytes)",
            path.display(),
            bytes.len()
        );

        let tracks = vec![
            MediaTrack::new(TrackKind::Video, format!("file-video:{}", path.display())),
            MediaTrack::new(TrackKind::Audio, format!("file-audio:{}", path.display())),
        ];
        let producer_tracks = tracks.clone();
        let (tx, rx) = mpsc::channel(64);
        let fragment_bytes = self.fragment_bytes;
        let interval = self.interval;

        tokio::spawn(async move {
            let started = Instant::now();
            let mut ticker = tokio::time::interval_at(started + interval, interval);
            let mut sent = 0usize;

            for chunk in bytes.chunks(fragment_bytes).cycle() {
                ticker.tick().await;

                if !producer_tracks.iter().any(MediaTrack::is_live) {
                    break;
                }

                let fragment = MediaFragment {
                    data: chunk.to_vec(),
                    timestamp_ms: started.elapsed().as_millis() as u64,
                };
                if tx.send(fragment).await.is_err() {
                    break;
                }
                sent += 1;
            }

            debug!("File camera stopped after {} fragments", sent);
        });

        Ok(MediaStream::new(tracks, rx, self.mime_type.clone()))
    }

    fn name(&self) -> &str {
        "file camera"
    }
}
