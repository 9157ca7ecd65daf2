use super::events::Envelope;
use std::collections::{HashSet, VecDeque};

/// Replay filter for the inbound event stream.
///
/// The transport may redeliver a logically identical event; the identity key
/// `(kind, item/response/event id, payload length)` detects that within a
/// bounded recent-history window. The cache holds at most `max` keys and
/// prunes down to the most recent `keep` on overflow, so memory stays
/// bounded while realistic reorder/redelivery distances are covered.
pub struct EventDedup {
    seen: HashSet<String>,
    order: VecDeque<String>,
    max: usize,
    keep: usize,
}

impl EventDedup {
    pub fn new(max: usize, keep: usize) -> Self {
        Self {
            seen: HashSet::with_capacity(max + 1),
            order: VecDeque::with_capacity(max + 1),
            max,
            keep: keep.min(max),
        }
    }

    /// Record an envelope's identity; returns `true` the first time a key is
    /// seen and `false` on replay. Envelopes with no identifier cannot be
    /// keyed and are always reported fresh.
    pub fn observe(&mut self, envelope: &Envelope) -> bool {
        let Some(id) = envelope.event.identity() else {
            return true;
        };
        let key = format!("{}-{}-{}", envelope.event.kind(), id, envelope.payload_len);

        if self.seen.contains(&key) {
            return false;
        }

        self.seen.insert(key.clone());
        self.order.push_back(key);

        if self.order.len() > self.max {
            while self.order.len() > self.keep {
                if let Some(old) = self.order.pop_front() {
                    self.seen.remove(&old);
                }
            }
        }

        true
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::realtime::events::RealtimeEvent;

    fn envelope(kind_id: &str, payload_len: usize) -> Envelope {
        Envelope {
            event: RealtimeEvent::ResponseDone {
                response_id: Some(kind_id.to_string()),
                event_id: None,
            },
            payload_len,
        }
    }

    #[test]
    fn replayed_identity_is_reported_once() {
        let mut dedup = EventDedup::new(100, 50);
        let env = envelope("resp_1", 42);

        assert!(dedup.observe(&env));
        assert!(!dedup.observe(&env));
    }

    #[test]
    fn payload_length_distinguishes_events() {
        let mut dedup = EventDedup::new(100, 50);

        assert!(dedup.observe(&envelope("resp_1", 42)));
        assert!(dedup.observe(&envelope("resp_1", 43)));
    }

    #[test]
    fn events_without_identity_are_never_suppressed() {
        let mut dedup = EventDedup::new(100, 50);
        let env = Envelope {
            event: RealtimeEvent::Unknown,
            payload_len: 10,
        };

        assert!(dedup.observe(&env));
        assert!(dedup.observe(&env));
        assert!(dedup.is_empty());
    }

    #[test]
    fn cache_prunes_to_keep_on_overflow() {
        let mut dedup = EventDedup::new(100, 50);
        for i in 0..101 {
            assert!(dedup.observe(&envelope(&format!("resp_{}", i), i)));
        }

        assert_eq!(dedup.len(), 50);
        // Oldest keys were evicted and would be processed again.
        assert!(dedup.observe(&envelope("resp_0", 0)));
        // Recent keys survived the prune.
        assert!(!dedup.observe(&envelope("resp_100", 100)));
    }
}
