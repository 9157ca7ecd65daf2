//! End-of-session notification channel
//!
//! Builds the structured webhook message (title, key/value fields, a
//! free-text transcript block) and dispatches it with a global minimum
//! spacing between calls. Failures here are the caller's to log and
//! swallow; session teardown never depends on a successful dispatch.

mod gate;
mod message;
mod notifier;

pub use gate::DispatchGate;
pub use message::{session_summary, Block, NotificationMessage, Text};
pub use notifier::Notifier;
