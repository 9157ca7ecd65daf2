use super::{Session, SessionRole, SessionStatus, Turn};
use crate::error::FrontdeskError;
use chrono::Duration;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::info;

/// In-memory registry of live sessions.
///
/// The outer map is read-locked for lookups and write-locked only for
/// insert/remove; each session sits behind its own `Mutex`, so concurrent
/// mutation of one id serializes while distinct ids proceed in parallel.
#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<String, Arc<Mutex<Session>>>>>,
    /// Recency window for the content-level near-duplicate check.
    near_dup_window: Duration,
}

impl SessionStore {
    pub fn new(near_dup_window_ms: u64) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            near_dup_window: Duration::milliseconds(near_dup_window_ms as i64),
        }
    }

    /// Create a session under a caller-supplied id.
    pub async fn create(&self, id: &str, role: SessionRole) -> Result<Session, FrontdeskError> {
        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(id) {
            return Err(FrontdeskError::Duplicate(id.to_string()));
        }

        let session = Session::new(id, role);
        sessions.insert(id.to_string(), Arc::new(Mutex::new(session.clone())));
        info!("Session created: {} ({} active)", id, sessions.len());

        Ok(session)
    }

    /// Snapshot of a session by id.
    pub async fn get(&self, id: &str) -> Result<Session, FrontdeskError> {
        let entry = self.entry(id).await?;
        let session = entry.lock().await;
        Ok(session.clone())
    }

    /// Append a finalized turn to a session's transcript.
    ///
    /// Returns `Ok(false)` without touching the transcript when the text is
    /// empty or when an identical `(speaker, text)` turn already landed
    /// within the near-duplicate window; both are expected conditions on
    /// the event path, not errors.
    pub async fn append_turn(&self, id: &str, turn: Turn) -> Result<bool, FrontdeskError> {
        let entry = self.entry(id).await?;
        let mut session = entry.lock().await;

        if turn.text.trim().is_empty() {
            return Ok(false);
        }

        let cutoff = turn.timestamp - self.near_dup_window;
        let near_dup = session
            .transcript
            .iter()
            .rev()
            .take_while(|t| t.timestamp >= cutoff)
            .any(|t| t.speaker == turn.speaker && t.text == turn.text);
        if near_dup {
            info!("Skipping near-duplicate turn for session {}", id);
            return Ok(false);
        }

        session.transcript.push(turn);
        Ok(true)
    }

    /// Mark a session ended and return its final snapshot.
    ///
    /// The record stays in the store until `remove`, so the caller can
    /// dispatch the end-of-session notification from the returned snapshot.
    pub async fn end(&self, id: &str) -> Result<Session, FrontdeskError> {
        let entry = self.entry(id).await?;
        let mut session = entry.lock().await;

        if session.status == SessionStatus::Ended {
            // A second end request races the removal; treat it as unknown.
            return Err(FrontdeskError::NotFound(id.to_string()));
        }

        session.status = SessionStatus::Ended;
        info!(
            "Session ended: {} ({} turns)",
            id,
            session.transcript.len()
        );
        Ok(session.clone())
    }

    /// Drop a session from the registry. The last action taken on a
    /// session, after its notification has been dispatched or abandoned.
    pub async fn remove(&self, id: &str) {
        let mut sessions = self.sessions.write().await;
        if sessions.remove(id).is_some() {
            info!("Session removed: {} ({} remaining)", id, sessions.len());
        }
    }

    /// Snapshots of every live session, for the listing endpoint.
    pub async fn list(&self) -> Vec<Session> {
        let entries: Vec<Arc<Mutex<Session>>> =
            self.sessions.read().await.values().cloned().collect();

        let mut snapshots = Vec::with_capacity(entries.len());
        for entry in entries {
            snapshots.push(entry.lock().await.clone());
        }
        snapshots
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    async fn entry(&self, id: &str) -> Result<Arc<Mutex<Session>>, FrontdeskError> {
        let sessions = self.sessions.read().await;
        sessions
            .get(id)
            .cloned()
            .ok_or_else(|| FrontdeskError::NotFound(id.to_string()))
    }
}
