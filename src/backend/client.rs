use reqwest::multipart;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{error, info, warn};

use super::messages::{
    CreateUserResponse, InterviewRecord, QuestionRecord, QuestionsPayload, StoredVideo,
};
use crate::capture::FinishedMedia;
use crate::config::BackendConfig;
use crate::error::BackendError;
use crate::identity::PersonalInfo;

/// The external interview, user and video services
#[async_trait::async_trait]
pub trait InterviewBackend: Send + Sync {
    /// `GET interview/{id}`
    async fn fetch_interview(&self, interview_id: &str) -> Result<InterviewRecord, BackendError>;

    /// `GET interview/{id}/questions`
    async fn fetch_questions(&self, interview_id: &str)
        -> Result<Vec<QuestionRecord>, BackendError>;

    /// `POST users`, returning the new user id
    async fn create_user(&self, info: &PersonalInfo) -> Result<String, BackendError>;

    /// `POST videos` as multipart (file, interviewId, userId)
    async fn upload_video(
        &self,
        media: FinishedMedia,
        file_name: &str,
        interview_id: &str,
        user_id: &str,
    ) -> Result<StoredVideo, BackendError>;

    /// `GET videos`
    async fn list_videos(&self) -> Result<Vec<StoredVideo>, BackendError>;

    /// `DELETE videos/{id}`
    async fn delete_video(&self, video_id: &str) -> Result<(), BackendError>;
}

/// `InterviewBackend` over HTTP
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        info!("Interview backend at {}", config.base_url);

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, BackendError> {
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(BackendError::Status {
                status: status.as_u16(),
                message: body,
            });
        }

        serde_json::from_str(&body).map_err(|e| BackendError::Decode(e.to_string()))
    }
}

#[async_trait::async_trait]
impl InterviewBackend for HttpBackend {
    async fn fetch_interview(&self, interview_id: &str) -> Result<InterviewRecord, BackendError> {
        let response = self
            .client
            .get(self.url(&format!("interview/{}", interview_id)))
            .send()
            .await?;

        Self::decode(response).await
    }

    async fn fetch_questions(
        &self,
        interview_id: &str,
    ) -> Result<Vec<QuestionRecord>, BackendError> {
        let response = self
            .client
            .get(self.url(&format!("interview/{}/questions", interview_id)))
            .send()
            .await?;

        let payload: QuestionsPayload = Self::decode(response).await?;
        Ok(payload.into_questions())
    }

    async fn create_user(&self, info: &PersonalInfo) -> Result<String, BackendError> {
        let response = self.client.post(self.url("users")).json(info).send().await?;

        let created: CreateUserResponse = Self::decode(response).await?;
        created
            .user_id()
            .ok_or_else(|| BackendError::Decode("response carries no user id".to_string()))
    }

    async fn upload_video(
        &self,
        media: FinishedMedia,
        file_name: &str,
        interview_id: &str,
        user_id: &str,
    ) -> Result<StoredVideo, BackendError> {
        let mime_type = media.mime_type().to_string();
        let size = media.len();

        let file_part = multipart::Part::bytes(media.into_bytes())
            .file_name(file_name.to_string())
            .mime_str(&mime_type)?;

        let form = multipart::Form::new()
            .part("file", file_part)
            .text("interviewId", interview_id.to_string())
            .text("userId", user_id.to_string());

        info!(
            "Uploading {} bytes for interview {} (user {})",
            size, interview_id, user_id
        );

        let response = self
            .client
            .post(self.url("videos"))
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                error!("Video upload request failed: {}", e);
                BackendError::from(e)
            })?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            error!("Video upload rejected ({}): {}", status, body);
            return Err(BackendError::Status {
                status: status.as_u16(),
                message: body,
            });
        }

        // Stored is stored, even when the reply is not a readable descriptor
        let video = StoredVideo::from_reply(&body);
        if video.id.is_none() {
            warn!("Video upload accepted ({}) without a video id", status);
        }
        Ok(video)
    }

    async fn list_videos(&self) -> Result<Vec<StoredVideo>, BackendError> {
        let response = self.client.get(self.url("videos")).send().await?;
        Self::decode(response).await
    }

    async fn delete_video(&self, video_id: &str) -> Result<(), BackendError> {
        let response = self
            .client
            .delete(self.url(&format!("videos/{}", video_id)))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(BackendError::Status {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        info!("Deleted video {}", video_id);
        Ok(())
    }
}
