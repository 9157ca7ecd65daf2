//! Session data model and registry
//!
//! A `Session` is one end-to-end voice interaction with a single visitor.
//! The `SessionStore` owns session identity and transcript accumulation:
//! transcripts are append-only, status moves `Active -> Ended` exactly once,
//! and a session is removed from the store only after its end-of-session
//! notification has been dispatched.

mod prompts;
mod store;
mod types;

pub use prompts::system_prompt;
pub use store::SessionStore;
pub use types::{Session, SessionRole, SessionStatus, Speaker, Turn};
