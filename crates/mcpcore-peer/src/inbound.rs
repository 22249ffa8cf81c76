use std::collections::HashMap;
use std::sync::Mutex;

use mcpcore_types::RequestId;

use crate::cancel::{CancelObserver, CancelSource, cancel_pair};

/// Tracks the cancellation token for each inbound request this side is
/// currently serving.
///
/// A `notifications/cancelled` from the peer names a request by id and
/// is looked up here (not in [`crate::pending::PendingMap`], which holds
/// *outbound* requests) so the handler still running for that id can
/// observe the signal and return promptly.
#[derive(Default)]
pub struct InboundTracker {
    tokens: Mutex<HashMap<RequestId, CancelSource>>,
}

impl InboundTracker {
    /// An empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin tracking `id`, returning the observer a handler should poll
    /// or await while doing its work.
    pub fn begin(&self, id: RequestId) -> CancelObserver {
        let (source, observer) = cancel_pair();
        self.tokens.lock().unwrap().insert(id, source);
        observer
    }

    /// Stop tracking `id` once its handler has returned a response,
    /// regardless of outcome.
    pub fn finish(&self, id: &RequestId) {
        self.tokens.lock().unwrap().remove(id);
    }

    /// Signal cancellation for `id`. A no-op if no handler is currently
    /// tracked for it (it may have already completed).
    pub fn cancel(&self, id: &RequestId) -> bool {
        match self.tokens.lock().unwrap().get(id) {
            Some(source) => {
                source.cancel();
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_signals_tracked_observer() {
        let tracker = InboundTracker::new();
        let id = RequestId::Number(1);
        let observer = tracker.begin(id.clone());
        assert!(tracker.cancel(&id));
        assert!(observer.is_cancelled());
    }

    #[test]
    fn cancel_unknown_id_is_a_no_op() {
        let tracker = InboundTracker::new();
        assert!(!tracker.cancel(&RequestId::Number(1)));
    }

    #[test]
    fn finish_removes_tracking() {
        let tracker = InboundTracker::new();
        let id = RequestId::Number(1);
        tracker.begin(id.clone());
        tracker.finish(&id);
        assert!(!tracker.cancel(&id));
    }
}
