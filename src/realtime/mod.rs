//! Realtime event channel
//!
//! The speech endpoint delivers a stream of typed events with uncertain
//! ordering and possible redelivery. This module owns the typed protocol
//! (`events`), the transport-identity replay filter (`dedup`), the single
//! classification loop that turns events into transcript/speaking state
//! (`handler`), the SDP offer/answer + credential proxy (`relay`), and the
//! WebSocket transport carrying the channel (`transport`).

pub mod dedup;
pub mod events;
pub mod handler;
pub mod relay;
pub mod transport;

pub use dedup::EventDedup;
pub use events::{Envelope, OutboundCommand, RealtimeEvent, SessionUpdate};
pub use handler::EventHandler;
pub use relay::{EphemeralCredential, NegotiationRelay};
pub use transport::{RealtimeTransport, WsTransport};
