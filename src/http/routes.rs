use super::handlers;
use super::state::AppState;
use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Candidate registration
        .route("/users", post(handlers::register_user))
        // Session lifecycle
        .route(
            "/interviews/:interview_id/sessions",
            post(handlers::create_session),
        )
        .route(
            "/sessions/:session_id",
            get(handlers::get_session).delete(handlers::leave_session),
        )
        // Recording control
        .route("/sessions/:session_id/start", post(handlers::start_recording))
        .route("/sessions/:session_id/next", post(handlers::next_question))
        .route("/sessions/:session_id/stop", post(handlers::stop_recording))
        .route(
            "/sessions/:session_id/retry-device",
            post(handlers::retry_device),
        )
        .route("/sessions/:session_id/user", post(handlers::attach_user))
        // Stored videos
        .route("/videos", get(handlers::list_videos))
        .route("/videos/:video_id", delete(handlers::delete_video))
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
