// Shared fixtures for integration tests

#![allow(dead_code)]

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use interview_recorder::backend::QuestionRecord;
use interview_recorder::{
    BackendError, FinishedMedia, InterviewBackend, InterviewRecord, PersonalInfo, StoredVideo,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// One upload received by the fake video service
#[derive(Debug, Clone)]
pub struct ReceivedUpload {
    pub file_name: String,
    pub interview_id: String,
    pub user_id: String,
    pub mime_type: String,
    pub bytes: usize,
}

/// In-memory interview, user and video services
pub struct FakeBackend {
    expire_date: Option<DateTime<Utc>>,
    questions: Vec<QuestionRecord>,
    fail_uploads: bool,
    interview_checks: AtomicUsize,
    uploads: Mutex<Vec<ReceivedUpload>>,
    users: Mutex<Vec<PersonalInfo>>,
}

impl FakeBackend {
    /// A valid interview whose questions last the given number of seconds
    pub fn with_question_seconds(seconds: &[u32]) -> Self {
        let questions = seconds
            .iter()
            .enumerate()
            .map(|(i, s)| QuestionRecord {
                question: format!("Question text {}", i + 1),
                time: Some(*s as f64 / 60.0),
            })
            .collect();

        Self {
            expire_date: Some(Utc::now() + ChronoDuration::days(7)),
            questions,
            fail_uploads: false,
            interview_checks: AtomicUsize::new(0),
            uploads: Mutex::new(Vec::new()),
            users: Mutex::new(Vec::new()),
        }
    }

    pub fn expired(mut self) -> Self {
        self.expire_date = Some(Utc::now() - ChronoDuration::days(1));
        self
    }

    /// The interview lookup itself fails
    pub fn unreachable(mut self) -> Self {
        self.expire_date = None;
        self
    }

    pub fn failing_uploads(mut self) -> Self {
        self.fail_uploads = true;
        self
    }

    pub fn interview_checks(&self) -> usize {
        self.interview_checks.load(Ordering::SeqCst)
    }

    pub fn uploads(&self) -> Vec<ReceivedUpload> {
        self.uploads.lock().unwrap().clone()
    }

    pub fn users(&self) -> Vec<PersonalInfo> {
        self.users.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl InterviewBackend for FakeBackend {
    async fn fetch_interview(&self, _interview_id: &str) -> Result<InterviewRecord, BackendError> {
        self.interview_checks.fetch_add(1, Ordering::SeqCst);
        match self.expire_date {
            Some(expire_date) => Ok(InterviewRecord { expire_date }),
            None => Err(BackendError::Status {
                status: 404,
                message: "Interview not found".to_string(),
            }),
        }
    }

    async fn fetch_questions(
        &self,
        _interview_id: &str,
    ) -> Result<Vec<QuestionRecord>, BackendError> {
        Ok(self.questions.clone())
    }

    async fn create_user(&self, info: &PersonalInfo) -> Result<String, BackendError> {
        let mut users = self.users.lock().unwrap();
        users.push(info.clone());
        Ok(format!("user-{}", users.len()))
    }

    async fn upload_video(
        &self,
        media: FinishedMedia,
        file_name: &str,
        interview_id: &str,
        user_id: &str,
    ) -> Result<StoredVideo, BackendError> {
        self.uploads.lock().unwrap().push(ReceivedUpload {
            file_name: file_name.to_string(),
            interview_id: interview_id.to_string(),
            user_id: user_id.to_string(),
            mime_type: media.mime_type().to_string(),
            bytes: media.len(),
        });

        if self.fail_uploads {
            return Err(BackendError::Status {
                status: 500,
                message: "storage unavailable".to_string(),
            });
        }

        Ok(StoredVideo {
            id: Some("video-1".to_string()),
            fields: serde_json::Map::new(),
        })
    }

    async fn list_videos(&self) -> Result<Vec<StoredVideo>, BackendError> {
        Ok(Vec::new())
    }

    async fn delete_video(&self, _video_id: &str) -> Result<(), BackendError> {
        Ok(())
    }
}
