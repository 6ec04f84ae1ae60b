use serde::{Deserialize, Serialize};

/// Per-session settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Countdown used when a question has no usable time
    /// Default: 60 seconds
    #[serde(default = "default_question_secs")]
    pub default_question_secs: u32,

    /// Container type of the finished recording
    #[serde(default = "default_mime_type")]
    pub mime_type: String,

    /// File name sent with the upload
    #[serde(default = "default_file_name")]
    pub file_name: String,

    /// How long a finished session stays readable before it is forgotten
    /// Default: 300 seconds
    #[serde(default = "default_retain_finished_secs")]
    pub retain_finished_secs: u64,
}

fn default_question_secs() -> u32 {
    60
}

fn default_mime_type() -> String {
    "video/webm".to_string()
}

fn default_file_name() -> String {
    "interview.webm".to_string()
}

fn default_retain_finished_secs() -> u64 {
    300
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            default_question_secs: default_question_secs(),
            mime_type: default_mime_type(),
            file_name: default_file_name(),
            retain_finished_secs: default_retain_finished_secs(),
        }
    }
}
