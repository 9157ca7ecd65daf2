use super::dedup::EventDedup;
use super::events::{Envelope, RealtimeEvent};
use crate::session::{SessionStore, Speaker, Turn};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Observable state the handler maintains for one session's event stream.
#[derive(Clone)]
pub struct HandlerState {
    pub speaking: watch::Receiver<bool>,
    pub last_error: watch::Receiver<Option<String>>,
}

/// The classification loop for one session's inbound event stream.
///
/// A single consumer drains the transport's event channel in arrival order:
/// replays are dropped by the identity filter, turn-carrying events are
/// mirrored into the session store (which applies the content-level
/// near-duplicate window), and audio progress events drive the agent
/// speaking flag. Everything on this path is in-memory and lock-scoped;
/// nothing here performs a network call, so a stalled downstream can never
/// stall event intake.
pub struct EventHandler {
    session_id: String,
    store: SessionStore,
    dedup: EventDedup,
    speaking_tx: watch::Sender<bool>,
    error_tx: watch::Sender<Option<String>>,
}

impl EventHandler {
    pub fn new(session_id: String, store: SessionStore, dedup: EventDedup) -> (Self, HandlerState) {
        let (speaking_tx, speaking) = watch::channel(false);
        let (error_tx, last_error) = watch::channel(None);

        let handler = Self {
            session_id,
            store,
            dedup,
            speaking_tx,
            error_tx,
        };
        let state = HandlerState {
            speaking,
            last_error,
        };
        (handler, state)
    }

    /// Consume the event stream until the transport closes it.
    pub fn spawn(self, rx: mpsc::Receiver<Envelope>) -> JoinHandle<()> {
        tokio::spawn(self.run(rx))
    }

    pub async fn run(mut self, mut rx: mpsc::Receiver<Envelope>) {
        info!("Event handler started for session {}", self.session_id);

        while let Some(envelope) = rx.recv().await {
            self.handle(envelope).await;
        }

        // Channel closed: the agent is no longer audible whatever the last
        // delta said.
        let _ = self.speaking_tx.send(false);
        info!("Event handler stopped for session {}", self.session_id);
    }

    async fn handle(&mut self, envelope: Envelope) {
        if !self.dedup.observe(&envelope) {
            debug!(
                "Skipping redelivered event {} for session {}",
                envelope.event.kind(),
                self.session_id
            );
            return;
        }

        match envelope.event {
            RealtimeEvent::ItemCreated { item, .. } => {
                let speaker = match item.role.as_deref() {
                    Some("user") => Speaker::Visitor,
                    Some("assistant") => Speaker::Agent,
                    _ => return,
                };
                if let Some(text) = item.text() {
                    self.record_turn(speaker, text).await;
                }
            }

            RealtimeEvent::TranscriptDone { transcript, .. } => {
                // A completed utterance through the transcript kind; the
                // near-duplicate window in the store keeps this from
                // landing twice when the item kind already delivered it.
                if let Some(text) = transcript.as_deref() {
                    self.record_turn(Speaker::Agent, text).await;
                }
            }

            RealtimeEvent::AudioDelta { .. } => {
                let _ = self.speaking_tx.send(true);
            }

            RealtimeEvent::AudioDone { .. } | RealtimeEvent::ResponseDone { .. } => {
                let _ = self.speaking_tx.send(false);
            }

            RealtimeEvent::Error { error, .. } => {
                let message = error
                    .message
                    .unwrap_or_else(|| "An error occurred during conversation".to_string());
                warn!(
                    "Speech endpoint error for session {}: {}",
                    self.session_id, message
                );
                // Surfaced to observers; whether it is fatal is the
                // lifecycle controller's call.
                let _ = self.error_tx.send(Some(message));
            }

            RealtimeEvent::TranscriptDelta { delta, .. } => {
                debug!("Transcript delta: {:?}", delta);
            }

            RealtimeEvent::OutputItemAdded { .. } => {}

            RealtimeEvent::Unknown => {
                debug!("Ignoring unrecognized event kind");
            }
        }
    }

    async fn record_turn(&self, speaker: Speaker, text: &str) {
        if text.trim().is_empty() {
            return;
        }
        match self
            .store
            .append_turn(&self.session_id, Turn::new(speaker, text))
            .await
        {
            Ok(true) => {}
            Ok(false) => {
                debug!("Turn suppressed for session {}", self.session_id);
            }
            Err(e) => {
                warn!(
                    "Failed to record turn for session {}: {}",
                    self.session_id, e
                );
            }
        }
    }
}
