//! Local audio capture and activity monitoring
//!
//! One microphone source feeds the realtime connection; alongside it the
//! `LevelMonitor` keeps a continuously-updated normalized activity level and
//! derives the binary "speech likely" signal from a fixed threshold.

pub mod backend;
pub mod mic;
pub mod monitor;

pub use backend::{AudioBackend, AudioFrame};
pub use mic::MicBackend;
pub use monitor::{ActivityState, LevelMonitor, MonitorHandle};
