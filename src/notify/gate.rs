use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Global minimum spacing between notification dispatches.
///
/// The lock is held across the wait, so callers pass through one at a time
/// in arrival order; a caller exceeding the limit is delayed, never dropped.
pub struct DispatchGate {
    min_interval: Duration,
    last_dispatch: Mutex<Option<Instant>>,
}

impl DispatchGate {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_dispatch: Mutex::new(None),
        }
    }

    /// Wait until the minimum spacing since the previous dispatch has
    /// elapsed, then claim the slot.
    pub async fn acquire(&self) {
        let mut last = self.last_dispatch.lock().await;
        if let Some(prev) = *last {
            let next_allowed = prev + self.min_interval;
            let now = Instant::now();
            if next_allowed > now {
                tokio::time::sleep_until(next_allowed).await;
            }
        }
        *last = Some(Instant::now());
    }
}
