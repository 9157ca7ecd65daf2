use crate::audio::{AudioBackend, LevelMonitor, MonitorHandle};
use crate::config::{AudioConfig, DedupConfig, RealtimeConfig};
use crate::error::FrontdeskError;
use crate::notify::{session_summary, Notifier};
use crate::realtime::handler::HandlerState;
use crate::realtime::{
    EventDedup, EventHandler, OutboundCommand, RealtimeTransport, SessionUpdate, WsTransport,
};
use crate::session::SessionStore;
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Idle,
    Negotiating,
    Active,
    Ending,
    Ended,
    Failed,
}

/// Opens the negotiated channel to the speech endpoint. A seam so tests can
/// substitute a scripted transport.
#[async_trait]
pub trait TransportConnector: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn RealtimeTransport>, FrontdeskError>;
}

pub struct WsConnector {
    config: RealtimeConfig,
    api_key: String,
}

impl WsConnector {
    pub fn new(config: RealtimeConfig, api_key: String) -> Self {
        Self { config, api_key }
    }
}

#[async_trait]
impl TransportConnector for WsConnector {
    async fn connect(&self) -> Result<Box<dyn RealtimeTransport>, FrontdeskError> {
        let transport = WsTransport::connect(&self.config, &self.api_key).await?;
        Ok(Box::new(transport))
    }
}

/// Per-session controller owning the realtime resources.
///
/// All transitions run on `&mut self`, so there is never more than one
/// in-flight start or end per session; the `Idle` guard in `start` makes a
/// repeated start request a no-op instead of a second connection.
pub struct SessionLifecycle {
    session_id: String,
    store: SessionStore,
    notifier: Arc<Notifier>,
    connector: Box<dyn TransportConnector>,
    mic: Box<dyn AudioBackend>,
    realtime_config: RealtimeConfig,
    audio_config: AudioConfig,
    dedup_config: DedupConfig,

    state_tx: watch::Sender<LifecycleState>,
    state_rx: watch::Receiver<LifecycleState>,
    monitor: Option<MonitorHandle>,
    transport: Option<Box<dyn RealtimeTransport>>,
    handler_task: Option<JoinHandle<()>>,
    handler_state: Option<HandlerState>,
}

impl SessionLifecycle {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        session_id: String,
        store: SessionStore,
        notifier: Arc<Notifier>,
        connector: Box<dyn TransportConnector>,
        mic: Box<dyn AudioBackend>,
        realtime_config: RealtimeConfig,
        audio_config: AudioConfig,
        dedup_config: DedupConfig,
    ) -> Self {
        let (state_tx, state_rx) = watch::channel(LifecycleState::Idle);
        Self {
            session_id,
            store,
            notifier,
            connector,
            mic,
            realtime_config,
            audio_config,
            dedup_config,
            state_tx,
            state_rx,
            monitor: None,
            transport: None,
            handler_task: None,
            handler_state: None,
        }
    }

    pub fn state(&self) -> LifecycleState {
        *self.state_rx.borrow()
    }

    pub fn watch_state(&self) -> watch::Receiver<LifecycleState> {
        self.state_rx.clone()
    }

    /// Activity level/speaking signal of the local source, once active.
    pub fn activity(&self) -> Option<watch::Receiver<crate::audio::ActivityState>> {
        self.monitor.as_ref().map(|m| m.state.clone())
    }

    /// Agent-speaking flag and last channel error, once active.
    pub fn handler_state(&self) -> Option<&HandlerState> {
        self.handler_state.as_ref()
    }

    /// Bring the session up: acquire audio, negotiate the channel, send the
    /// one-time configuration message, start the classification loop.
    pub async fn start(&mut self) -> Result<(), FrontdeskError> {
        if self.state() != LifecycleState::Idle {
            info!(
                "Start request ignored for session {}: already {:?}",
                self.session_id,
                self.state()
            );
            return Ok(());
        }
        self.transition(LifecycleState::Negotiating);

        let session = match self.store.get(&self.session_id).await {
            Ok(s) => s,
            Err(e) => {
                self.transition(LifecycleState::Failed);
                return Err(e);
            }
        };

        // Audio first: a session without a microphone is not worth a
        // remote connection.
        let frames = match self.mic.start().await {
            Ok(rx) => rx,
            Err(e) => {
                error!("Audio acquisition failed for {}: {}", self.session_id, e);
                self.release_local().await;
                self.transition(LifecycleState::Failed);
                return Err(e);
            }
        };
        self.monitor =
            Some(LevelMonitor::new(self.audio_config.speech_threshold).spawn(frames));

        let mut transport = match self.connector.connect().await {
            Ok(t) => t,
            Err(e) => {
                error!("Negotiation failed for {}: {}", self.session_id, e);
                self.release_local().await;
                self.transition(LifecycleState::Failed);
                return Err(e);
            }
        };

        let update = SessionUpdate::new(&self.realtime_config, &session.instructions);
        if let Err(e) = transport.send(OutboundCommand::SessionUpdate(update)).await {
            error!("Initial configuration failed for {}: {}", self.session_id, e);
            let _ = transport.close().await;
            self.release_local().await;
            self.transition(LifecycleState::Failed);
            return Err(e);
        }

        let events = match transport.take_events() {
            Some(rx) => rx,
            None => {
                let _ = transport.close().await;
                self.release_local().await;
                self.transition(LifecycleState::Failed);
                return Err(FrontdeskError::Transport(
                    "transport provided no event stream".to_string(),
                ));
            }
        };
        let dedup = EventDedup::new(
            self.dedup_config.event_cache_max,
            self.dedup_config.event_cache_keep,
        );
        let (handler, handler_state) =
            EventHandler::new(self.session_id.clone(), self.store.clone(), dedup);
        self.handler_task = Some(handler.spawn(events));
        self.handler_state = Some(handler_state);
        self.transport = Some(transport);

        self.transition(LifecycleState::Active);
        info!("Session {} active", self.session_id);
        Ok(())
    }

    /// Explicit end: release everything in fixed order, record the ended
    /// session, dispatch the notification, then drop the record.
    pub async fn end(&mut self) -> Result<(), FrontdeskError> {
        match self.state() {
            LifecycleState::Active | LifecycleState::Negotiating => {}
            _ => return Err(FrontdeskError::NotFound(self.session_id.clone())),
        }
        self.transition(LifecycleState::Ending);

        self.release_local().await;
        self.finalize_and_notify().await;

        self.transition(LifecycleState::Ended);
        Ok(())
    }

    /// Transport failure after readiness: clean up, then best-effort
    /// notification — a partial transcript is still worth delivering.
    pub async fn fail(&mut self, reason: &str) {
        warn!("Session {} failed: {}", self.session_id, reason);
        self.release_local().await;
        self.finalize_and_notify().await;
        self.transition(LifecycleState::Failed);
    }

    /// Client disappeared without an explicit end: release local resources
    /// only. The session record stays; a later explicit end still produces
    /// the notification exactly once.
    pub async fn abandon(&mut self) {
        info!("Session {} abandoned by client", self.session_id);
        self.release_local().await;
        self.transition(LifecycleState::Ended);
    }

    /// Fixed release ladder. Every step runs even if an earlier one fails,
    /// so one stuck resource never leaks the rest:
    /// monitor -> remote audio sink -> event channel -> transport -> mic.
    async fn release_local(&mut self) {
        if let Some(mut monitor) = self.monitor.take() {
            monitor.stop().await;
        }

        if let Some(mut transport) = self.transport.take() {
            if let Err(e) = transport.detach_output().await {
                warn!("Failed to detach remote audio: {}", e);
            }
            if let Err(e) = transport.close_channel().await {
                warn!("Failed to close event channel: {}", e);
            }
            if let Err(e) = transport.close().await {
                warn!("Failed to close transport: {}", e);
            }
        }

        if let Some(task) = self.handler_task.take() {
            if let Err(e) = task.await {
                warn!("Event handler task panicked: {}", e);
            }
        }

        if let Err(e) = self.mic.stop().await {
            warn!("Failed to release microphone: {}", e);
        }
    }

    async fn finalize_and_notify(&mut self) {
        let session = match self.store.end(&self.session_id).await {
            Ok(s) => s,
            Err(e) => {
                warn!("Could not finalize session {}: {}", self.session_id, e);
                return;
            }
        };

        let message = session_summary(&session, Utc::now());
        if let Err(e) = self.notifier.dispatch(&message).await {
            // Ending the conversation already succeeded for the visitor;
            // a lost notification is an operator problem, not a session
            // error.
            error!(
                "Notification dispatch failed for session {}: {}",
                self.session_id, e
            );
        }

        self.store.remove(&self.session_id).await;
    }

    fn transition(&self, next: LifecycleState) {
        let _ = self.state_tx.send(next);
    }
}
