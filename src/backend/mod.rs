pub mod client;
pub mod messages;

pub use client::{HttpBackend, InterviewBackend};
pub use messages::{InterviewRecord, QuestionRecord, StoredVideo};
