use crate::config::Config;
use crate::notify::Notifier;
use crate::realtime::NegotiationRelay;
use crate::session::SessionStore;
use std::sync::Arc;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub store: SessionStore,
    pub relay: NegotiationRelay,
    pub notifier: Arc<Notifier>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(config: Config, api_key: Option<String>) -> Self {
        let store = SessionStore::new(config.dedup.near_dup_window_ms);
        let relay = NegotiationRelay::new(config.realtime.clone(), api_key);
        let notifier = Arc::new(Notifier::new(config.notify.clone()));

        Self {
            store,
            relay,
            notifier,
            config: Arc::new(config),
        }
    }
}
