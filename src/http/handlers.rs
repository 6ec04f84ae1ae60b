use super::state::AppState;
use crate::error::{ErrorResponse, SessionError};
use crate::identity::{self, PersonalInfo};
use crate::session::{SessionCommand, SessionController, SessionView};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct CreateSessionRequest {
    /// Candidate already registered through `POST /users`
    pub user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AttachUserRequest {
    pub user_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterUserResponse {
    pub user_id: String,
}

fn status_for(error: &SessionError) -> StatusCode {
    match error {
        SessionError::InvalidPersonalInfo(_) => StatusCode::UNPROCESSABLE_ENTITY,
        SessionError::Backend(_) | SessionError::UploadFailed(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::CONFLICT,
    }
}

fn error_response(error: &SessionError) -> Response {
    (status_for(error), Json(ErrorResponse::from(error))).into_response()
}

fn backend_error(error: crate::error::BackendError) -> Response {
    error!("Backend request failed: {}", error);
    error_response(&SessionError::from(error))
}

fn session_not_found(session_id: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            code: "SESSION_NOT_FOUND".to_string(),
            error: format!("Session {} not found", session_id),
            fields: Vec::new(),
        }),
    )
        .into_response()
}

/// Forward a command to a live session and answer with its new snapshot
async fn command(state: &AppState, session_id: &str, command: SessionCommand) -> Response {
    let Some(session) = state.session(session_id).await else {
        return session_not_found(session_id);
    };

    match session.send(command.clone()).await {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(e) => {
            warn!("Session {} rejected {:?}: {}", session_id, command, e);
            error_response(&e)
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /users
/// Validate personal information and create the candidate
pub async fn register_user(
    State(state): State<AppState>,
    Json(info): Json<PersonalInfo>,
) -> impl IntoResponse {
    match identity::register(state.backend.as_ref(), info).await {
        Ok(user_id) => (
            StatusCode::CREATED,
            Json(RegisterUserResponse { user_id }),
        )
            .into_response(),
        Err(e) => error_response(&e),
    }
}

/// POST /interviews/:interview_id/sessions
/// Open a recording session; validity, questions and camera resolve in the background
pub async fn create_session(
    State(state): State<AppState>,
    Path(interview_id): Path<String>,
    body: Option<Json<CreateSessionRequest>>,
) -> impl IntoResponse {
    let request = body.map(|Json(request)| request).unwrap_or_default();

    let handle = SessionController::spawn(
        interview_id.clone(),
        request.user_id,
        state.backend.clone(),
        state.create_device(),
        state.session.clone(),
    );
    let view: SessionView = handle.view();

    info!(
        "Session {} opened for interview {}",
        handle.id(),
        interview_id
    );

    state.register(handle).await;

    (StatusCode::CREATED, Json(view)).into_response()
}

/// GET /sessions/:session_id
/// Latest snapshot of a session
pub async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    match state.session(&session_id).await {
        Some(session) => (StatusCode::OK, Json(session.view())).into_response(),
        None => session_not_found(&session_id),
    }
}

/// POST /sessions/:session_id/start
pub async fn start_recording(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    command(&state, &session_id, SessionCommand::Start).await
}

/// POST /sessions/:session_id/next
pub async fn next_question(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    command(&state, &session_id, SessionCommand::Next).await
}

/// POST /sessions/:session_id/stop
pub async fn stop_recording(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    command(&state, &session_id, SessionCommand::Stop).await
}

/// POST /sessions/:session_id/retry-device
pub async fn retry_device(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    command(&state, &session_id, SessionCommand::RetryDevice).await
}

/// POST /sessions/:session_id/user
pub async fn attach_user(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(req): Json<AttachUserRequest>,
) -> impl IntoResponse {
    command(&state, &session_id, SessionCommand::AttachUser(req.user_id)).await
}

/// DELETE /sessions/:session_id
/// Navigate away: discard any capture in progress and forget the session
pub async fn leave_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    let session = {
        let mut sessions = state.sessions.write().await;
        sessions.remove(&session_id)
    };

    let Some(session) = session else {
        return session_not_found(&session_id);
    };

    match session.leave().await {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        // Already stopped on its own; the last snapshot still stands
        Err(SessionError::SessionClosed) => (StatusCode::OK, Json(session.view())).into_response(),
        Err(e) => error_response(&e),
    }
}

/// GET /videos
pub async fn list_videos(State(state): State<AppState>) -> impl IntoResponse {
    match state.backend.list_videos().await {
        Ok(videos) => (StatusCode::OK, Json(videos)).into_response(),
        Err(e) => backend_error(e),
    }
}

/// DELETE /videos/:video_id
pub async fn delete_video(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
) -> impl IntoResponse {
    match state.backend.delete_video(&video_id).await {
        Ok(()) => {
            info!("Video {} deleted", video_id);
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e) => backend_error(e),
    }
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
