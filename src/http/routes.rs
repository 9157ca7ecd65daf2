use super::handlers;
use super::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Session lifecycle
        .route(
            "/sessions",
            post(handlers::create_session).get(handlers::list_sessions),
        )
        .route(
            "/sessions/:session_id",
            get(handlers::get_session).delete(handlers::end_session),
        )
        .route("/sessions/:session_id/turns", post(handlers::append_turn))
        // Negotiation
        .route("/realtime/negotiate", post(handlers::negotiate))
        .route("/realtime/token", post(handlers::issue_token))
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
