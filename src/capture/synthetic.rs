use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info};

use super::device::{CaptureDevice, MediaFragment, MediaStream, MediaTrack, TrackKind};
use crate::error::CaptureError;

/// Camera that emits a deterministic test pattern on a fixed cadence
///
/// Stands in for real hardware in headless deployments and tests.
pub struct SyntheticCamera {
    fragment_bytes: usize,
    interval: Duration,
    mime_type: String,
    unavailable: Option<String>,
    acquisitions: usize,
}

impl SyntheticCamera {
    pub fn new(fragment_bytes: usize, interval: Duration) -> Self {
        Self {
            fragment_bytes,
            interval,
            mime_type: "video/webm".to_string(),
            unavailable: None,
            acquisitions: 0,
        }
    }

    /// A camera whose every acquire fails, as when permission is denied
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            unavailable: Some(reason.into()),
            ..Self::new(1, Duration::from_secs(1))
        }
    }

    pub fn with_mime_type(mut self, mime_type: &str) -> Self {
        self.mime_type = mime_type.to_string();
        self
    }

    /// Number of successful acquisitions so far
    pub fn acquisitions(&self) -> usize {
        self.acquisitions
    }
}

/// Fill a fragment with bytes derived from its sequence number
pub fn test_pattern(sequence: u64, len: usize) -> Vec<u8> {
    (0..len)
        .map(|i| (sequence as u8).wrapping_add(i as u8))
        .collect()
}

#[async_trait::async_trait]
impl CaptureDevice for SyntheticCamera {
    async fn acquire(&mut self) -> Result<MediaStream, CaptureError> {
        if let Some(reason) = &self.unavailable {
            return Err(CaptureError::DeviceUnavailable(reason.clone()));
        }

        let tracks = vec![
            MediaTrack::new(TrackKind::Video, "synthetic-video"),
            MediaTrack::new(TrackKind::Audio, "synthetic-audio"),
        ];
        let producer_tracks = tracks.clone();
        let (tx, rx) = mpsc::channel(64);
        let fragment_bytes = self.fragment_bytes;
        let interval = self.interval;

        tokio::spawn(async move {
            let started = Instant::now();
            let mut ticker = tokio::time::interval_at(started + interval, interval);
            let mut sequence: u64 = 0;

            loop {
                ticker.tick().await;

                if !producer_tracks.iter().any(MediaTrack::is_live) {
                    break;
                }

                let fragment = MediaFragment {
                    data: test_pattern(sequence, fragment_bytes),
                    timestamp_ms: started.elapsed().as_millis() as u64,
                };

                if tx.send(fragment).await.is_err() {
                    break;
                }
                sequence += 1;
            }

            debug!("Synthetic camera stopped after {} fragments", sequence);
        });

        self.acquisitions += 1;
        info!(
            "Synthetic camera acquired ({} bytes every {}ms)",
            fragment_bytes,
            interval.as_millis()
        );

        Ok(MediaStream::new(tracks, rx, self.mime_type.clone()))
    }

    fn name(&self) -> &str {
        "synthetic camera"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_is_deterministic() {
        assert_eq!(test_pattern(0, 4), vec![0, 1, 2, 3]);
        assert_eq!(test_pattern(255, 3), vec![255, 0, 1]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_synthetic_camera_produces_until_tracks_stop() {
        let mut camera = SyntheticCamera::new(8, Duration::from_millis(100));
        let mut stream = camera.acquire().await.unwrap();
        assert_eq!(camera.acquisitions(), 1);

        let first = stream.fragments.recv().await.unwrap();
        assert_eq!(first.data.len(), 8);
        assert_eq!(first.timestamp_ms, 100);

        stream.tracks.stop_all();

        // Drain what was in flight; the producer then closes the channel
        while stream.fragments.recv().await.is_some() {}
    }

    #[tokio::test]
    async fn test_unavailable_camera_fails_every_acquire() {
        let mut camera = SyntheticCamera::unavailable("permission denied");

        for _ in 0..2 {
            match camera.acquire().await {
                Err(CaptureError::DeviceUnavailable(reason)) => {
                    assert_eq!(reason, "permission denied")
                }
                _ => panic!("Expected DeviceUnavailable"),
            }
        }
        assert_eq!(camera.acquisitions(), 0);
    }
}
