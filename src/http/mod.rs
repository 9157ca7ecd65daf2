//! HTTP API for the UI collaborator
//!
//! Session lifecycle:
//! - POST   /sessions           - create a session for a role
//! - GET    /sessions           - list active sessions
//! - GET    /sessions/:id       - session snapshot + realtime config
//! - POST   /sessions/:id/turns - record a finalized turn
//! - DELETE /sessions/:id       - end: notify, then remove
//!
//! Negotiation:
//! - POST /realtime/negotiate   - SDP offer in, SDP answer out
//! - POST /realtime/token       - short-lived credential
//!
//! - GET /health                - health check

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
