//! HTTP control API for interview recording sessions
//!
//! This module provides a REST API over the session controller:
//! - POST /users - Register a candidate
//! - POST /interviews/:id/sessions - Open a recording session
//! - GET /sessions/:id - Current session snapshot
//! - POST /sessions/:id/{start,next,stop,retry-device,user} - Session commands
//! - DELETE /sessions/:id - Leave the session
//! - GET /videos, DELETE /videos/:id - Stored recordings
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use handlers::{AttachUserRequest, CreateSessionRequest, RegisterUserResponse};
pub use routes::create_router;
pub use state::AppState;
