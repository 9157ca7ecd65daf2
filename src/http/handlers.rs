use super::state::AppState;
use crate::config::RealtimeConfig;
use crate::error::FrontdeskError;
use crate::notify::session_summary;
use crate::realtime::SessionUpdate;
use crate::session::{Session, SessionRole, SessionStatus, Speaker, Turn};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    /// Conversational policy: "visitor" or "sales_rejection".
    pub role: Option<String>,

    /// Optional session ID (if not provided, generate UUID)
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreateSessionResponse {
    pub session_id: String,
    pub status: String,
    /// Realtime endpoint the client negotiates against.
    pub realtime_url: String,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub session: Session,
    /// The configuration message the client sends once the channel opens.
    pub config: SessionUpdate,
}

#[derive(Debug, Deserialize)]
pub struct AppendTurnRequest {
    pub speaker: Option<Speaker>,
    pub text: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AppendTurnResponse {
    pub session_id: String,
    /// False when the turn was suppressed as a near-duplicate.
    pub recorded: bool,
}

#[derive(Debug, Serialize)]
pub struct EndSessionResponse {
    pub session_id: String,
    pub status: String,
    pub turns: usize,
}

#[derive(Debug, Serialize)]
pub struct SessionSummary {
    pub id: String,
    pub role: SessionRole,
    pub status: SessionStatus,
    pub created_at: DateTime<Utc>,
    pub turn_count: usize,
}

#[derive(Debug, Deserialize)]
pub struct NegotiateRequest {
    pub sdp: Option<String>,
    pub model: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct NegotiateResponse {
    pub sdp: String,
}

#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    /// Local session the credential is requested for.
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
    pub expires_at: i64,
    /// The remote session id the credential is scoped to.
    pub session_id: String,
    pub websocket_url: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /sessions
/// Create a session record for an intent chosen on the tablet.
pub async fn create_session(
    State(state): State<AppState>,
    Json(req): Json<CreateSessionRequest>,
) -> Result<impl IntoResponse, FrontdeskError> {
    let role = match req.role.as_deref() {
        Some("visitor") => SessionRole::Visitor,
        Some("sales_rejection") => SessionRole::Rejection,
        Some(other) => {
            return Err(FrontdeskError::Validation(format!(
                "invalid role {:?}: must be \"visitor\" or \"sales_rejection\"",
                other
            )))
        }
        None => {
            return Err(FrontdeskError::Validation(
                "role is required".to_string(),
            ))
        }
    };

    let session_id = req
        .session_id
        .unwrap_or_else(|| format!("session-{}", uuid::Uuid::new_v4()));

    state.store.create(&session_id, role).await?;

    Ok((
        StatusCode::OK,
        Json(CreateSessionResponse {
            session_id,
            status: "connected".to_string(),
            realtime_url: realtime_ws_url(&state.config.realtime),
        }),
    ))
}

fn realtime_ws_url(realtime: &RealtimeConfig) -> String {
    format!(
        "{}/realtime?model={}",
        realtime
            .api_base
            .replacen("https://", "wss://", 1)
            .replacen("http://", "ws://", 1),
        realtime.model
    )
}

/// GET /sessions/:id
/// Session snapshot plus the realtime configuration for the client.
pub async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, FrontdeskError> {
    let session = state.store.get(&session_id).await?;
    let config = SessionUpdate::new(&state.config.realtime, &session.instructions);

    Ok(Json(SessionResponse { session, config }))
}

/// POST /sessions/:id/turns
/// Record one finalized turn in the transcript.
pub async fn append_turn(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(req): Json<AppendTurnRequest>,
) -> Result<impl IntoResponse, FrontdeskError> {
    let speaker = req
        .speaker
        .ok_or_else(|| FrontdeskError::Validation("speaker is required".to_string()))?;
    let text = req
        .text
        .ok_or_else(|| FrontdeskError::Validation("text is required".to_string()))?;
    if text.trim().is_empty() {
        return Err(FrontdeskError::Validation("text must not be empty".to_string()));
    }

    let recorded = state
        .store
        .append_turn(&session_id, Turn::new(speaker, text))
        .await?;

    Ok(Json(AppendTurnResponse {
        session_id,
        recorded,
    }))
}

/// DELETE /sessions/:id
/// End the session: mark it ended, dispatch the transcript notification,
/// then drop the record. A failed notification is logged, never surfaced —
/// the visitor's action has already succeeded.
pub async fn end_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, FrontdeskError> {
    let session = state.store.end(&session_id).await?;
    info!(
        "Session {} ended with {} turns",
        session_id,
        session.transcript.len()
    );

    let message = session_summary(&session, Utc::now());
    if let Err(e) = state.notifier.dispatch(&message).await {
        error!("Notification dispatch failed for {}: {}", session_id, e);
    }

    state.store.remove(&session_id).await;

    Ok(Json(EndSessionResponse {
        session_id,
        status: "ended".to_string(),
        turns: session.transcript.len(),
    }))
}

/// GET /sessions
/// Active-session summaries.
pub async fn list_sessions(State(state): State<AppState>) -> impl IntoResponse {
    let sessions: Vec<SessionSummary> = state
        .store
        .list()
        .await
        .into_iter()
        .map(|s| SessionSummary {
            id: s.id,
            role: s.role,
            status: s.status,
            created_at: s.created_at,
            turn_count: s.transcript.len(),
        })
        .collect();

    Json(sessions)
}

/// POST /realtime/negotiate
/// Forward an SDP offer to the speech endpoint, return its answer.
pub async fn negotiate(
    State(state): State<AppState>,
    Json(req): Json<NegotiateRequest>,
) -> Result<impl IntoResponse, FrontdeskError> {
    let sdp = req
        .sdp
        .ok_or_else(|| FrontdeskError::Validation("sdp offer is required".to_string()))?;
    let model = req
        .model
        .unwrap_or_else(|| state.relay.default_model().to_string());

    let answer = state.relay.negotiate(&sdp, &model).await?;
    Ok(Json(NegotiateResponse { sdp: answer }))
}

/// POST /realtime/token
/// Issue a short-lived credential for direct client-to-endpoint flows.
/// The caller names the session it is connecting on behalf of.
pub async fn issue_token(
    State(state): State<AppState>,
    Json(req): Json<TokenRequest>,
) -> Result<Json<TokenResponse>, FrontdeskError> {
    let session_id = req
        .session_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| FrontdeskError::Validation("session_id is required".to_string()))?;

    info!("Issuing ephemeral credential for session {}", session_id);
    let credential = state.relay.issue_credential().await?;

    Ok(Json(TokenResponse {
        token: credential.token,
        expires_at: credential.expires_at,
        session_id: credential.remote_session_id,
        websocket_url: realtime_ws_url(&state.config.realtime),
    }))
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
