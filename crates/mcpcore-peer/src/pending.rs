use std::collections::HashMap;
use std::sync::Mutex;

use mcpcore_types::{JsonRpcError, RequestId};
use tokio::sync::oneshot;

/// The outcome delivered to an outbound caller: either the peer's result
/// payload or a reason the call did not complete normally.
#[derive(Debug)]
pub enum Outcome {
    /// The peer replied with a success result.
    Success(serde_json::Value),
    /// The peer replied with a JSON-RPC error.
    Error(JsonRpcError),
    /// The deadline elapsed with no response.
    TimedOut,
    /// The local caller cancelled this request before it completed.
    Cancelled,
    /// The transport closed while this request was outstanding.
    TransportClosed,
}

/// Tracks outbound requests awaiting a response.
///
/// Invariants: every request registered here is removed exactly once, by
/// whichever of {response, timeout, cancel, transport close} observes it
/// first — a later event for the same id is a silent no-op (e.g. a late
/// response arriving after a timeout already retired the entry).
#[derive(Default)]
pub struct PendingMap {
    entries: Mutex<HashMap<RequestId, oneshot::Sender<Outcome>>>,
}

impl PendingMap {
    /// An empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `id` as pending *before* the request frame is handed to
    /// the transport, returning the receiver half the caller awaits for
    /// its [`Outcome`].
    pub fn register(&self, id: RequestId) -> oneshot::Receiver<Outcome> {
        let (tx, rx) = oneshot::channel();
        self.entries.lock().unwrap().insert(id, tx);
        rx
    }

    /// Retire `id` with `outcome` if it is still pending. Returns `true`
    /// if an entry was found and completed, `false` if it had already
    /// been retired (e.g. a duplicate or late response, or a race with a
    /// timeout that fired first).
    pub fn complete(&self, id: &RequestId, outcome: Outcome) -> bool {
        let entry = self.entries.lock().unwrap().remove(id);
        match entry {
            Some(tx) => {
                let _ = tx.send(outcome);
                true
            }
            None => false,
        }
    }

    /// `true` if `id` is currently pending.
    pub fn contains(&self, id: &RequestId) -> bool {
        self.entries.lock().unwrap().contains_key(id)
    }

    /// Number of requests currently pending.
    pub fn pending_count(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    /// Retire every pending request with a freshly constructed outcome,
    /// e.g. on transport close. `make_outcome` is called once per entry
    /// since [`Outcome`] is not `Clone`.
    pub fn drain(&self, mut make_outcome: impl FnMut() -> Outcome) {
        let senders: Vec<oneshot::Sender<Outcome>> = {
            let mut guard = self.entries.lock().unwrap();
            guard.drain().map(|(_, tx)| tx).collect()
        };
        for tx in senders {
            let _ = tx.send(make_outcome());
        }
    }
}
