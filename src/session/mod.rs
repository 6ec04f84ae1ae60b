//! Interview recording sessions
//!
//! This module provides the session controller that drives one candidate's
//! recording attempt:
//! - Validity gating against the interview's expiry date
//! - Question sequencing with a per-question countdown
//! - One continuous capture across every question
//! - Handing the finished recording to the video service
//!
//! All decisions live in the pure `machine`; `SessionController` performs
//! the effects it asks for.

mod config;
mod controller;
mod gate;
pub mod machine;
mod state;
mod timer;
mod upload;
mod view;

pub use config::SessionConfig;
pub use controller::{SessionCommand, SessionController, SessionHandle};
pub use gate::ValidityGate;
pub use machine::{Effect, Input, Transition};
pub use state::{
    Controls, DeviceStatus, Notice, Outcome, Question, Session, SessionState, TimerState,
    UploadStatus, Validity,
};
pub use timer::{QuestionTimer, TimerSignal};
pub use upload::UploadHandoff;
pub use view::{format_time, SessionView};
