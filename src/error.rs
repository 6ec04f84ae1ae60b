//! Error types shared by the session controller and its collaborators

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by the capture device adapter
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("Capture device unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("Capture has not been started")]
    NotRecording,

    #[error("Capture is already recording")]
    AlreadyRecording,

    #[error("Capture task failed: {0}")]
    TaskFailed(String),
}

/// Errors raised at the HTTP boundary to the interview services
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Server error ({status}): {message}")]
    Status { status: u16, message: String },

    #[error("Failed to parse response: {0}")]
    Decode(String),
}

/// A single invalid personal-info field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Errors surfaced by a recording session
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("Camera or microphone unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("Interview validity check failed: {0}")]
    ValidityCheckFailed(String),

    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("No questions loaded: {0}")]
    NoQuestionsLoaded(String),

    #[error("Capture failed: {0}")]
    CaptureFailed(String),

    #[error("Cannot {command} while {state}")]
    CommandRejected { command: String, state: String },

    #[error("Session is closed")]
    SessionClosed,

    #[error("Invalid personal information ({} field(s))", .0.len())]
    InvalidPersonalInfo(Vec<FieldError>),

    #[error("Backend request failed: {0}")]
    Backend(String),
}

impl SessionError {
    /// Stable code used in notices and HTTP error bodies
    pub fn code(&self) -> &'static str {
        match self {
            SessionError::DeviceUnavailable(_) => "DEVICE_UNAVAILABLE",
            SessionError::ValidityCheckFailed(_) => "VALIDITY_CHECK_FAILED",
            SessionError::UploadFailed(_) => "UPLOAD_FAILED",
            SessionError::NoQuestionsLoaded(_) => "NO_QUESTIONS_LOADED",
            SessionError::CaptureFailed(_) => "CAPTURE_FAILED",
            SessionError::CommandRejected { .. } => "COMMAND_REJECTED",
            SessionError::SessionClosed => "SESSION_CLOSED",
            SessionError::InvalidPersonalInfo(_) => "INVALID_PERSONAL_INFO",
            SessionError::Backend(_) => "BACKEND_ERROR",
        }
    }
}

impl From<CaptureError> for SessionError {
    fn from(error: CaptureError) -> Self {
        match error {
            CaptureError::DeviceUnavailable(reason) => SessionError::DeviceUnavailable(reason),
            other => SessionError::CaptureFailed(other.to_string()),
        }
    }
}

impl From<BackendError> for SessionError {
    fn from(error: BackendError) -> Self {
        SessionError::Backend(error.to_string())
    }
}

/// Error body returned by the control API
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub error: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldError>,
}

impl From<&SessionError> for ErrorResponse {
    fn from(error: &SessionError) -> Self {
        let fields = match error {
            SessionError::InvalidPersonalInfo(fields) => fields.clone(),
            _ => Vec::new(),
        };

        ErrorResponse {
            code: error.code().to_string(),
            error: error.to_string(),
            fields,
        }
    }
}
