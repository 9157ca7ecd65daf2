//! Session lifecycle control
//!
//! Drives one session through `Idle -> Negotiating -> Active -> Ending ->
//! Ended` (with `Failed` reachable before and after readiness), owns the
//! acquisition and release ordering of the audio source, activity monitor,
//! and realtime transport, and triggers the end-of-session notification.

mod controller;

pub use controller::{LifecycleState, SessionLifecycle, TransportConnector, WsConnector};
