use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use mcpcore_types::RequestId;

type TimeoutCallback = Box<dyn FnOnce() + Send>;

struct DeadlineEntry {
    deadline: Instant,
    callback: TimeoutCallback,
}

/// Tracks per-request deadlines against a monotonic clock and fires a
/// callback when one elapses.
///
/// `tick` extracts every expired entry and releases the internal lock
/// *before* invoking callbacks, so a callback that re-enters the tracker
/// (e.g. to retire the same request from a pending map) cannot deadlock
/// against the lock it is itself running under.
#[derive(Default)]
pub struct DeadlineTracker {
    deadlines: Mutex<HashMap<RequestId, DeadlineEntry>>,
}

impl DeadlineTracker {
    /// An empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace the deadline for `id`.
    pub fn set(&self, id: RequestId, timeout: Duration, callback: impl FnOnce() + Send + 'static) {
        let entry = DeadlineEntry {
            deadline: Instant::now() + timeout,
            callback: Box::new(callback),
        };
        self.deadlines.lock().unwrap().insert(id, entry);
    }

    /// Remove the deadline for `id`, if any. A no-op if absent. A cancel
    /// that lands after `tick` has already extracted the entry (but
    /// before the callback runs) does not retract the callback — the
    /// entry is gone from the map either way.
    pub fn cancel(&self, id: &RequestId) {
        self.deadlines.lock().unwrap().remove(id);
    }

    /// `true` if a deadline is currently registered for `id`.
    pub fn has_deadline(&self, id: &RequestId) -> bool {
        self.deadlines.lock().unwrap().contains_key(id)
    }

    /// Number of deadlines currently tracked.
    pub fn pending_count(&self) -> usize {
        self.deadlines.lock().unwrap().len()
    }

    /// Extract and invoke every callback whose deadline has passed as of
    /// `now`. At most one callback fires per registered deadline.
    pub fn tick(&self, now: Instant) {
        let expired: Vec<TimeoutCallback> = {
            let mut guard = self.deadlines.lock().unwrap();
            let expired_ids: Vec<RequestId> = guard
                .iter()
                .filter(|(_, entry)| entry.deadline <= now)
                .map(|(id, _)| id.clone())
                .collect();
            expired_ids
                .into_iter()
                .filter_map(|id| guard.remove(&id).map(|entry| entry.callback))
                .collect()
        };
        for callback in expired {
            callback();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn fires_exactly_once_after_deadline() {
        let tracker = DeadlineTracker::new();
        let fired = Arc::new(AtomicUsize::new(0));
        let fired_clone = Arc::clone(&fired);
        tracker.set(RequestId::Number(1), Duration::from_millis(0), move || {
            fired_clone.fetch_add(1, Ordering::SeqCst);
        });
        tracker.tick(Instant::now() + Duration::from_millis(1));
        tracker.tick(Instant::now() + Duration::from_millis(1));
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn cancel_before_tick_prevents_firing() {
        let tracker = DeadlineTracker::new();
        let fired = Arc::new(AtomicUsize::new(0));
        let fired_clone = Arc::clone(&fired);
        let id = RequestId::Number(1);
        tracker.set(id.clone(), Duration::from_millis(0), move || {
            fired_clone.fetch_add(1, Ordering::SeqCst);
        });
        tracker.cancel(&id);
        tracker.tick(Instant::now() + Duration::from_millis(1));
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn tick_before_deadline_does_not_fire() {
        let tracker = DeadlineTracker::new();
        let fired = Arc::new(AtomicUsize::new(0));
        let fired_clone = Arc::clone(&fired);
        tracker.set(RequestId::Number(1), Duration::from_secs(60), move || {
            fired_clone.fetch_add(1, Ordering::SeqCst);
        });
        tracker.tick(Instant::now());
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert_eq!(tracker.pending_count(), 1);
    }

    #[test]
    fn set_replaces_existing_deadline() {
        let tracker = DeadlineTracker::new();
        let fired = Arc::new(AtomicUsize::new(0));
        let id = RequestId::Number(1);

        let f1 = Arc::clone(&fired);
        tracker.set(id.clone(), Duration::from_secs(60), move || {
            f1.fetch_add(100, Ordering::SeqCst);
        });
        let f2 = Arc::clone(&fired);
        tracker.set(id.clone(), Duration::from_millis(0), move || {
            f2.fetch_add(1, Ordering::SeqCst);
        });
        tracker.tick(Instant::now() + Duration::from_millis(1));
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }
}
