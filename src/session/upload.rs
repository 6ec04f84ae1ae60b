use std::sync::Arc;
use tracing::{error, info};

use crate::backend::{InterviewBackend, StoredVideo};
use crate::capture::FinishedMedia;
use crate::error::SessionError;

/// Hands finished media to the video service, tagged with its interview and user
#[derive(Clone)]
pub struct UploadHandoff {
    backend: Arc<dyn InterviewBackend>,
    file_name: String,
}

impl UploadHandoff {
    pub fn new(backend: Arc<dyn InterviewBackend>, file_name: impl Into<String>) -> Self {
        Self {
            backend,
            file_name: file_name.into(),
        }
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub async fn submit(
        &self,
        media: FinishedMedia,
        interview_id: &str,
        user_id: &str,
    ) -> Result<StoredVideo, SessionError> {
        let bytes = media.len();
        info!(
            "Uploading {} ({} bytes) for interview {}, user {}",
            self.file_name, bytes, interview_id, user_id
        );

        match self
            .backend
            .upload_video(media, &self.file_name, interview_id, user_id)
            .await
        {
            Ok(video) => {
                info!("Video uploaded successfully: {:?}", video.id);
                Ok(video)
            }
            Err(e) => {
                error!("Error uploading video: {}", e);
                Err(SessionError::UploadFailed(e.to_string()))
            }
        }
    }
}
