use serde::{Deserialize, Serialize};
use std::fmt;

use crate::backend::{QuestionRecord, StoredVideo};
use crate::error::SessionError;

/// Most recent notices kept on a session
const MAX_NOTICES: usize = 8;

/// One interview question with its countdown length
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub text: String,
    pub allotted_seconds: u32,
}

impl Question {
    pub fn new(text: impl Into<String>, allotted_seconds: u32) -> Self {
        Self {
            text: text.into(),
            allotted_seconds: allotted_seconds.max(1),
        }
    }

    /// Convert a stored question whose time is given in minutes
    ///
    /// Missing, non-positive or non-finite times fall back to `default_seconds`.
    pub fn from_record(record: &QuestionRecord, default_seconds: u32) -> Self {
        let seconds = match record.time {
            Some(minutes) if minutes.is_finite() && minutes > 0.0 => {
                let seconds = (minutes * 60.0).round();
                if seconds >= 1.0 {
                    seconds.min(u32::MAX as f64) as u32
                } else {
                    default_seconds
                }
            }
            _ => default_seconds,
        };

        Self::new(record.question.clone(), seconds)
    }
}

/// Result of the one-time interview validity check
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Validity {
    #[default]
    Unknown,
    Valid,
    Invalid,
}

/// Lifecycle state of a recording session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SessionState {
    /// Waiting for the validity check
    Gating,
    /// Valid interview, ready to record
    Idle,
    /// Capturing; `question` is `None` when the interview has no questions
    Recording { question: Option<usize> },
    /// Between questions, or closing out the recording
    Advancing,
    /// Media handed off for upload
    Completed,
    /// Interview expired or unreachable
    Invalidated,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Completed | SessionState::Invalidated)
    }

    pub fn is_recording(&self) -> bool {
        matches!(self, SessionState::Recording { .. })
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Gating => write!(f, "gating"),
            SessionState::Idle => write!(f, "idle"),
            SessionState::Recording { question: Some(i) } => {
                write!(f, "recording question {}", i + 1)
            }
            SessionState::Recording { question: None } => write!(f, "recording"),
            SessionState::Advancing => write!(f, "advancing"),
            SessionState::Completed => write!(f, "completed"),
            SessionState::Invalidated => write!(f, "invalidated"),
        }
    }
}

/// Countdown of the active question
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerState {
    pub remaining_seconds: u32,
    pub running: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DeviceStatus {
    Pending,
    Ready,
    Unavailable { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum UploadStatus {
    NotStarted,
    Pending,
    Succeeded { video: StoredVideo },
    Failed { reason: String },
}

/// Where the candidate should be sent next
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Completed,
    NotFound,
}

/// A user-visible problem report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub code: String,
    pub message: String,
}

impl From<&SessionError> for Notice {
    fn from(error: &SessionError) -> Self {
        Notice {
            code: error.code().to_string(),
            message: error.to_string(),
        }
    }
}

/// Which recording controls are actionable right now
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Controls {
    pub start: bool,
    pub next: bool,
    pub stop: bool,
    pub retry_device: bool,
}

/// One candidate's interview-recording attempt
///
/// Mutated only by `machine::apply`; everything else reads it.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub(super) interview_id: String,
    pub(super) user_id: Option<String>,
    pub(super) validity: Validity,
    pub(super) state: SessionState,
    pub(super) current_question_index: usize,
    pub(super) questions: Option<Vec<Question>>,
    pub(super) timer: Option<TimerState>,
    pub(super) device: DeviceStatus,
    pub(super) upload: UploadStatus,
    pub(super) outcome: Option<Outcome>,
    pub(super) notices: Vec<Notice>,
    pub(super) history: Vec<SessionState>,
    pub(super) closed: bool,
}

impl Session {
    /// A fresh session, gating on interview validity
    pub fn new(interview_id: impl Into<String>, user_id: Option<String>) -> Self {
        Self {
            interview_id: interview_id.into(),
            user_id,
            validity: Validity::Unknown,
            state: SessionState::Gating,
            current_question_index: 0,
            questions: None,
            timer: None,
            device: DeviceStatus::Pending,
            upload: UploadStatus::NotStarted,
            outcome: None,
            notices: Vec::new(),
            history: vec![SessionState::Gating],
            closed: false,
        }
    }

    pub fn interview_id(&self) -> &str {
        &self.interview_id
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    pub fn validity(&self) -> Validity {
        self.validity
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn current_question_index(&self) -> usize {
        self.current_question_index
    }

    /// Loaded questions; empty while still loading
    pub fn questions(&self) -> &[Question] {
        self.questions.as_deref().unwrap_or(&[])
    }

    pub fn questions_loaded(&self) -> bool {
        self.questions.is_some()
    }

    pub fn question_count(&self) -> usize {
        self.questions().len()
    }

    /// The question on screen, if recording one
    pub fn current_question(&self) -> Option<&Question> {
        match self.state {
            SessionState::Recording { question: Some(i) } => self.questions().get(i),
            _ => None,
        }
    }

    pub fn timer(&self) -> Option<TimerState> {
        self.timer
    }

    pub fn device(&self) -> &DeviceStatus {
        &self.device
    }

    pub fn upload(&self) -> &UploadStatus {
        &self.upload
    }

    pub fn outcome(&self) -> Option<Outcome> {
        self.outcome
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    /// Every state entered so far, in order
    pub fn history(&self) -> &[SessionState] {
        &self.history
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Nothing further can happen: left, invalidated, or completed with the upload answered
    pub fn is_finished(&self) -> bool {
        match self.state {
            _ if self.closed => true,
            SessionState::Invalidated => true,
            SessionState::Completed => self.upload != UploadStatus::Pending,
            _ => false,
        }
    }

    pub fn controls(&self) -> Controls {
        if self.closed {
            return Controls::default();
        }

        let start = self.state == SessionState::Idle
            && self.device == DeviceStatus::Ready
            && self.questions_loaded()
            && self.user_id.is_some();

        let next = match self.state {
            SessionState::Recording { question: Some(i) } => i + 1 < self.question_count(),
            _ => false,
        };

        let retry_device = matches!(self.device, DeviceStatus::Unavailable { .. })
            && matches!(self.state, SessionState::Gating | SessionState::Idle);

        Controls {
            start,
            next,
            stop: self.state.is_recording(),
            retry_device,
        }
    }

    pub(super) fn push_notice(&mut self, error: &SessionError) {
        if self.notices.len() == MAX_NOTICES {
            self.notices.remove(0);
        }
        self.notices.push(Notice::from(error));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(time: Option<f64>) -> QuestionRecord {
        QuestionRecord {
            question: "Tell us about yourself".to_string(),
            time,
        }
    }

    #[test]
    fn test_question_from_record_converts_minutes() {
        assert_eq!(Question::from_record(&record(Some(2.0)), 60).allotted_seconds, 120);
        assert_eq!(Question::from_record(&record(Some(0.5)), 60).allotted_seconds, 30);
        assert_eq!(Question::from_record(&record(Some(0.75)), 60).allotted_seconds, 45);
    }

    #[test]
    fn test_question_from_record_defaults() {
        assert_eq!(Question::from_record(&record(None), 60).allotted_seconds, 60);
        assert_eq!(Question::from_record(&record(Some(0.0)), 60).allotted_seconds, 60);
        assert_eq!(Question::from_record(&record(Some(-3.0)), 60).allotted_seconds, 60);
        assert_eq!(Question::from_record(&record(Some(f64::NAN)), 60).allotted_seconds, 60);
        assert_eq!(Question::from_record(&record(Some(0.001)), 60).allotted_seconds, 60);
    }

    #[test]
    fn test_new_session_is_gating_with_controls_disabled() {
        let session = Session::new("interview-1", Some("user-1".to_string()));

        assert_eq!(session.state(), SessionState::Gating);
        assert_eq!(session.validity(), Validity::Unknown);
        assert_eq!(session.current_question_index(), 0);
        assert_eq!(session.controls(), Controls::default());
        assert_eq!(session.history(), &[SessionState::Gating]);
    }

    #[test]
    fn test_notices_are_bounded() {
        let mut session = Session::new("interview-1", None);
        for i in 0..20 {
            session.push_notice(&SessionError::UploadFailed(format!("attempt {}", i)));
        }

        assert_eq!(session.notices().len(), MAX_NOTICES);
        assert!(session.notices().last().unwrap().message.contains("attempt 19"));
    }

    #[test]
    fn test_finished_only_once_absorbing() {
        let mut session = Session::new("interview-1", None);
        assert!(!session.is_finished());

        session.state = SessionState::Invalidated;
        assert!(session.is_finished());

        session.state = SessionState::Completed;
        session.upload = UploadStatus::Pending;
        assert!(!session.is_finished(), "Upload still in flight");

        session.upload = UploadStatus::Failed {
            reason: "storage unavailable".to_string(),
        };
        assert!(session.is_finished());

        let mut left = Session::new("interview-1", None);
        left.closed = true;
        assert!(left.is_finished());
    }

    #[test]
    fn test_state_display() {
        assert_eq!(
            SessionState::Recording { question: Some(0) }.to_string(),
            "recording question 1"
        );
        assert_eq!(SessionState::Recording { question: None }.to_string(), "recording");
        assert_eq!(SessionState::Invalidated.to_string(), "invalidated");
    }
}
