//! Server-side engine of a voice reception desk: session records and
//! transcripts, negotiation relay to the speech endpoint, local audio
//! activity monitoring, realtime event classification, and the
//! end-of-session webhook notification.
//!
//! The binary serves the HTTP API only. The realtime loop — a
//! `SessionLifecycle` wired with a `MicBackend` and `WsConnector` — runs in
//! the process that owns the audio device and drives the conversation; that
//! process embeds this crate as a library and shares the same `SessionStore`
//! and `Notifier`.

pub mod audio;
pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod notify;
pub mod realtime;
pub mod session;

pub use audio::{ActivityState, AudioBackend, AudioFrame, LevelMonitor, MicBackend};
pub use config::Config;
pub use error::FrontdeskError;
pub use http::{create_router, AppState};
pub use lifecycle::{LifecycleState, SessionLifecycle};
pub use notify::Notifier;
pub use realtime::{EventDedup, EventHandler, NegotiationRelay, RealtimeEvent};
pub use session::{Session, SessionRole, SessionStatus, SessionStore, Speaker, Turn};
