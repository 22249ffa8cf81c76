use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use mcpcore_transport_traits::{ErrorCallback, MessageCallback};
use tokio::sync::Mutex as AsyncMutex;

/// One event emitted on a session's SSE stream, labeled with a
/// monotonically increasing id so a reconnecting client can resume after
/// `id`.
#[derive(Debug, Clone)]
pub struct StoredEvent {
    /// Monotonically increasing within this session.
    pub id: u64,
    /// The raw JSON-RPC message text.
    pub data: String,
}

struct Inner {
    events: VecDeque<StoredEvent>,
    next_event_id: u64,
    on_message: Option<MessageCallback>,
    on_error: Option<ErrorCallback>,
}

/// A single MCP session bound to an `Mcp-Session-Id`.
///
/// Inbound POST bodies are delivered to the registered message callback.
/// Outbound frames are appended to a capped ring buffer and also pushed
/// to any currently-attached [`crate::SseWriter`]; a client that
/// reconnects with `Last-Event-ID` replays from the buffer instead of
/// missing events emitted while it was disconnected.
pub struct Session {
    id: String,
    replay_buffer_size: usize,
    inner: AsyncMutex<Inner>,
    last_activity: std::sync::Mutex<Instant>,
    sent_count: AtomicU64,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("sent_count", &self.sent_count.load(Ordering::Relaxed))
            .finish()
    }
}

impl Session {
    /// Create a new session with a fresh `Mcp-Session-Id`.
    pub fn new(replay_buffer_size: usize) -> Arc<Self> {
        Arc::new(Self {
            id: uuid::Uuid::new_v4().to_string(),
            replay_buffer_size,
            inner: AsyncMutex::new(Inner {
                events: VecDeque::new(),
                next_event_id: 1,
                on_message: None,
                on_error: None,
            }),
            last_activity: std::sync::Mutex::new(Instant::now()),
            sent_count: AtomicU64::new(0),
        })
    }

    /// This session's id, as carried in the `Mcp-Session-Id` header.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Register the callback invoked for every inbound POST body.
    pub async fn set_on_message(&self, callback: MessageCallback) {
        self.inner.lock().await.on_message = Some(callback);
    }

    /// Register the callback invoked on transport-level failure.
    pub async fn set_on_error(&self, callback: ErrorCallback) {
        self.inner.lock().await.on_error = Some(callback);
    }

    /// Deliver an inbound POST body to the registered message callback
    /// and mark the session active.
    pub async fn receive(&self, body: String) {
        self.touch();
        let cb = self.inner.lock().await.on_message.clone();
        if let Some(cb) = cb {
            cb(body);
        }
    }

    /// Append an outbound frame to the replay buffer and return the
    /// [`StoredEvent`] the caller should hand to any attached
    /// [`crate::SseWriter`].
    pub async fn broadcast_event(&self, data: String) -> StoredEvent {
        self.touch();
        let mut inner = self.inner.lock().await;
        let id = inner.next_event_id;
        inner.next_event_id += 1;
        let event = StoredEvent { id, data };
        inner.events.push_back(event.clone());
        while inner.events.len() > self.replay_buffer_size {
            inner.events.pop_front();
        }
        self.sent_count.fetch_add(1, Ordering::Relaxed);
        event
    }

    /// Every event with id strictly greater than `last_event_id`, in
    /// order. Used to resume a stream after `Last-Event-ID: N`.
    pub async fn replay_from(&self, last_event_id: u64) -> Vec<StoredEvent> {
        self.inner
            .lock()
            .await
            .events
            .iter()
            .filter(|e| e.id > last_event_id)
            .cloned()
            .collect()
    }

    fn touch(&self) {
        *self.last_activity.lock().unwrap() = Instant::now();
    }

    /// Seconds since the last inbound or outbound activity on this session.
    pub fn idle_for(&self) -> std::time::Duration {
        self.last_activity.lock().unwrap().elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn replay_from_returns_strictly_after_match() {
        let session = Session::new(256);
        for i in 0..10 {
            session.broadcast_event(format!("event-{i}")).await;
        }
        let resumed = session.replay_from(7).await;
        assert_eq!(resumed.len(), 3);
        assert_eq!(resumed[0].id, 8);
        assert_eq!(resumed[1].id, 9);
        assert_eq!(resumed[2].id, 10);
    }

    #[tokio::test]
    async fn replay_from_zero_returns_everything() {
        let session = Session::new(256);
        session.broadcast_event("a".into()).await;
        session.broadcast_event("b".into()).await;
        let resumed = session.replay_from(0).await;
        assert_eq!(resumed.len(), 2);
    }

    #[tokio::test]
    async fn ring_buffer_caps_at_configured_size() {
        let session = Session::new(3);
        for i in 0..10 {
            session.broadcast_event(format!("event-{i}")).await;
        }
        let resumed = session.replay_from(0).await;
        assert_eq!(resumed.len(), 3);
        assert_eq!(resumed[0].id, 8);
    }

    #[tokio::test]
    async fn receive_invokes_registered_callback() {
        let session = Session::new(256);
        let seen = Arc::new(std::sync::Mutex::new(None));
        let seen_clone = Arc::clone(&seen);
        session
            .set_on_message(Arc::new(move |msg| {
                *seen_clone.lock().unwrap() = Some(msg);
            }))
            .await;
        session.receive("payload".to_string()).await;
        assert_eq!(seen.lock().unwrap().as_deref(), Some("payload"));
    }
}
