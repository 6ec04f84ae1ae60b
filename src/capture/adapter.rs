use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::buffer::{CaptureBuffer, FinishedMedia};
use super::device::{CaptureDevice, MediaStream, TrackKind, TrackSet};
use crate::error::CaptureError;

/// A recording in progress
struct ActiveCapture {
    tracks: TrackSet,
    stop_tx: oneshot::Sender<()>,
    task: JoinHandle<CaptureBuffer>,
}

/// Wraps a capture device and owns the single continuous recording of a session
pub struct CaptureAdapter {
    device: Box<dyn CaptureDevice>,
    active: Option<ActiveCapture>,
}

impl CaptureAdapter {
    pub fn new(device: Box<dyn CaptureDevice>) -> Self {
        Self {
            device,
            active: None,
        }
    }

    pub fn device_name(&self) -> &str {
        self.device.name()
    }

    /// Request an audio+video input stream from the device
    pub async fn acquire(&mut self) -> Result<MediaStream, CaptureError> {
        info!("Acquiring capture device: {}", self.device.name());

        match self.device.acquire().await {
            Ok(stream) if !stream.tracks.has_kind(TrackKind::Video) => {
                warn!("{} delivered no video track", self.device.name());
                Err(CaptureError::DeviceUnavailable(
                    "no video track available".to_string(),
                ))
            }
            Ok(stream) => {
                info!(
                    "Capture device ready: {} ({} tracks, {})",
                    self.device.name(),
                    stream.tracks.tracks().len(),
                    stream.mime_type
                );
                Ok(stream)
            }
            Err(e) => {
                warn!("Failed to acquire {}: {}", self.device.name(), e);
                Err(e)
            }
        }
    }

    pub fn is_recording(&self) -> bool {
        self.active.is_some()
    }

    /// Start continuous capture, buffering fragments until `finalize`
    pub fn begin_recording(&mut self, stream: MediaStream) -> Result<(), CaptureError> {
        if self.active.is_some() {
            return Err(CaptureError::AlreadyRecording);
        }

        let MediaStream {
            tracks,
            mut fragments,
            mime_type,
        } = stream;

        // Preview frames delivered before start are not part of the recording
        let mut discarded = 0;
        while fragments.try_recv().is_ok() {
            discarded += 1;
        }
        if discarded > 0 {
            debug!("Discarded {} preview fragments", discarded);
        }

        let (stop_tx, mut stop_rx) = oneshot::channel();

        let task = tokio::spawn(async move {
            let mut buffer = CaptureBuffer::new(mime_type);

            loop {
                tokio::select! {
                    fragment = fragments.recv() => match fragment {
                        Some(fragment) => buffer.push(fragment),
                        None => break,
                    },
                    _ = &mut stop_rx => {
                        // Keep whatever the device already delivered
                        fragments.close();
                        while let Some(fragment) = fragments.recv().await {
                            buffer.push(fragment);
                        }
                        break;
                    }
                }
            }

            debug!(
                "Capture task stopped ({} fragments, {} bytes)",
                buffer.len(),
                buffer.byte_len()
            );
            buffer
        });

        self.active = Some(ActiveCapture {
            tracks,
            stop_tx,
            task,
        });

        info!("Recording started on {}", self.device.name());

        Ok(())
    }

    /// Stop capture, release the tracks and assemble the finished media
    pub async fn finalize(&mut self) -> Result<FinishedMedia, CaptureError> {
        let ActiveCapture {
            tracks,
            stop_tx,
            task,
        } = self.active.take().ok_or(CaptureError::NotRecording)?;

        tracks.stop_all();
        // The task may already have ended if the device closed its channel
        let _ = stop_tx.send(());

        let mut buffer = match task.await {
            Ok(buffer) => buffer,
            Err(e) => {
                error!("Capture task panicked: {}", e);
                return Err(CaptureError::TaskFailed(e.to_string()));
            }
        };

        let media = buffer.assemble();

        info!(
            "Recording finalized on {}: {} bytes in {} fragments ({:.1}s)",
            self.device.name(),
            media.len(),
            media.fragment_count(),
            media.duration_ms() as f64 / 1000.0
        );

        Ok(media)
    }

    /// Drop any recording in progress without producing media
    pub fn release(&mut self) {
        if let Some(active) = self.active.take() {
            info!("Releasing capture device: {}", self.device.name());
            active.tracks.stop_all();
            active.task.abort();
        }
    }
}

impl Drop for CaptureAdapter {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::device::{MediaFragment, MediaTrack};
    use tokio::sync::mpsc;

    /// Device handing out pre-built streams so tests control every fragment
    struct ScriptedDevice {
        streams: Vec<MediaStream>,
    }

    #[async_trait::async_trait]
    impl CaptureDevice for ScriptedDevice {
        async fn acquire(&mut self) -> Result<MediaStream, CaptureError> {
            self.streams
                .pop()
                .ok_or_else(|| CaptureError::DeviceUnavailable("no camera".to_string()))
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    fn scripted_stream() -> (MediaStream, mpsc::Sender<MediaFragment>, MediaTrack) {
        let (tx, rx) = mpsc::channel(16);
        let video = MediaTrack::new(TrackKind::Video, "video");
        let video_track = video.clone();
        let stream = MediaStream::new(
            vec![video, MediaTrack::new(TrackKind::Audio, "audio")],
            rx,
            "video/webm",
        );
        (stream, tx, video_track)
    }

    fn fragment(data: &[u8], timestamp_ms: u64) -> MediaFragment {
        MediaFragment {
            data: data.to_vec(),
            timestamp_ms,
        }
    }

    #[tokio::test]
    async fn test_finalize_assembles_fragments_and_releases_tracks() {
        let (stream, tx, video_track) = scripted_stream();
        let mut adapter = CaptureAdapter::new(Box::new(ScriptedDevice {
            streams: vec![stream],
        }));

        let stream = adapter.acquire().await.unwrap();

        // Sent before recording starts, must be discarded
        tx.send(fragment(b"preview", 0)).await.unwrap();

        adapter.begin_recording(stream).unwrap();
        assert!(adapter.is_recording());

        tx.send(fragment(b"one-", 100)).await.unwrap();
        tx.send(fragment(b"two", 200)).await.unwrap();

        let media = adapter.finalize().await.unwrap();
        assert_eq!(media.data(), b"one-two");
        assert_eq!(media.mime_type(), "video/webm");
        assert!(!video_track.is_live(), "Finalize must release the tracks");
        assert!(!adapter.is_recording());
    }

    #[tokio::test]
    async fn test_finalize_without_recording_is_error() {
        let mut adapter = CaptureAdapter::new(Box::new(ScriptedDevice { streams: vec![] }));

        let result = adapter.finalize().await;
        assert_eq!(result.unwrap_err(), CaptureError::NotRecording);
    }

    #[tokio::test]
    async fn test_finalize_only_once_per_recording() {
        let (stream, _tx, _video_track) = scripted_stream();
        let mut adapter = CaptureAdapter::new(Box::new(ScriptedDevice { streams: vec![] }));

        adapter.begin_recording(stream).unwrap();
        adapter.finalize().await.unwrap();

        assert_eq!(
            adapter.finalize().await.unwrap_err(),
            CaptureError::NotRecording
        );
    }

    #[tokio::test]
    async fn test_begin_recording_twice_is_rejected() {
        let (first, _tx1, _p1) = scripted_stream();
        let (second, _tx2, _p2) = scripted_stream();
        let mut adapter = CaptureAdapter::new(Box::new(ScriptedDevice { streams: vec![] }));

        adapter.begin_recording(first).unwrap();
        assert_eq!(
            adapter.begin_recording(second).unwrap_err(),
            CaptureError::AlreadyRecording
        );
    }

    #[tokio::test]
    async fn test_acquire_reports_unavailable_device() {
        let mut adapter = CaptureAdapter::new(Box::new(ScriptedDevice { streams: vec![] }));

        match adapter.acquire().await {
            Err(CaptureError::DeviceUnavailable(reason)) => assert_eq!(reason, "no camera"),
            other => panic!("Expected DeviceUnavailable, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn test_release_stops_tracks_without_media() {
        let (stream, _tx, video_track) = scripted_stream();
        let mut adapter = CaptureAdapter::new(Box::new(ScriptedDevice { streams: vec![] }));

        adapter.begin_recording(stream).unwrap();
        adapter.release();

        assert!(!video_track.is_live());
        assert!(!adapter.is_recording());
    }
}
