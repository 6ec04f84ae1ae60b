use serde::{Deserialize, Serialize};

use super::state::{
    Controls, DeviceStatus, Notice, Outcome, Question, Session, SessionState, UploadStatus,
    Validity,
};

/// Snapshot of a session as the candidate sees it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionView {
    pub session_id: String,
    pub interview_id: String,
    pub user_id: Option<String>,
    pub validity: Validity,
    pub state: SessionState,
    pub question_index: usize,
    pub question_count: usize,
    /// Text shown above the camera preview
    pub prompt: String,
    pub question: Option<Question>,
    pub remaining_seconds: Option<u32>,
    /// Countdown as `m:ss`
    pub remaining: Option<String>,
    pub controls: Controls,
    pub device: DeviceStatus,
    pub upload: UploadStatus,
    /// Upload handed off and not yet answered
    pub uploading: bool,
    pub outcome: Option<Outcome>,
    pub notices: Vec<Notice>,
    pub closed: bool,
}

impl SessionView {
    pub fn new(session_id: &str, session: &Session) -> Self {
        let remaining_seconds = session.timer().map(|t| t.remaining_seconds);

        Self {
            session_id: session_id.to_string(),
            interview_id: session.interview_id().to_string(),
            user_id: session.user_id().map(str::to_string),
            validity: session.validity(),
            state: session.state(),
            question_index: session.current_question_index(),
            question_count: session.question_count(),
            prompt: prompt(session),
            question: session.current_question().cloned(),
            remaining_seconds,
            remaining: remaining_seconds.map(format_time),
            controls: session.controls(),
            device: session.device().clone(),
            upload: session.upload().clone(),
            uploading: *session.upload() == UploadStatus::Pending,
            outcome: session.outcome(),
            notices: session.notices().to_vec(),
            closed: session.is_closed(),
        }
    }
}

/// Seconds as `m:ss`
pub fn format_time(seconds: u32) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

fn prompt(session: &Session) -> String {
    match session.state() {
        SessionState::Recording { .. } | SessionState::Advancing => {
            match session.current_question() {
                Some(question) => format!(
                    "Question {}: {}",
                    session.current_question_index() + 1,
                    question.text
                ),
                None if session.question_count() == 0 => "No questions available.".to_string(),
                None => "Saving your recording...".to_string(),
            }
        }
        SessionState::Completed => match session.upload() {
            UploadStatus::Failed { .. } => "Your recording could not be saved.".to_string(),
            _ => "Thank you, your interview has been recorded.".to_string(),
        },
        SessionState::Invalidated => "This interview is no longer available.".to_string(),
        SessionState::Gating => "Checking interview...".to_string(),
        SessionState::Idle => "Start recording to begin questions.".to_string(),
    }
}
