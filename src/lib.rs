pub mod backend;
pub mod capture;
pub mod config;
pub mod error;
pub mod http;
pub mod identity;
pub mod session;

pub use backend::{HttpBackend, InterviewBackend, InterviewRecord, QuestionRecord, StoredVideo};
pub use capture::{
    CaptureAdapter, CaptureDevice, CaptureDeviceFactory, CaptureSource, CaptureSourceConfig,
    FileCamera, FinishedMedia, MediaStream, SyntheticCamera,
};
pub use config::Config;
pub use error::{BackendError, CaptureError, ErrorResponse, FieldError, SessionError};
pub use http::{create_router, AppState};
pub use identity::{format_phone, register, PersonalInfo};
pub use session::{
    SessionCommand, SessionConfig, SessionController, SessionHandle, SessionState, SessionView,
    Validity, ValidityGate,
};
