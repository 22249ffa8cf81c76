use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use mcpcore_transport_traits::{
    ErrorCallback, MessageCallback, Transport, TransportCapabilities, TransportError,
    TransportResult, TransportState,
};
use parking_lot::Mutex as SyncMutex;

use crate::session::Session;
use crate::writer::SseWriter;

/// Binds one [`Session`] to the [`Transport`] trait so the peer engine
/// can treat an HTTP/SSE session identically to a stdio connection.
///
/// Outbound frames are always recorded in the session's replay buffer;
/// they are additionally streamed live to whatever [`SseWriter`] is
/// currently attached (a client's open GET request), if any. A send with
/// no writer attached still succeeds — the frame simply waits in the
/// buffer for the next GET (or a `Last-Event-ID` resume).
pub struct HttpSseTransport {
    session: Arc<Session>,
    writer: SyncMutex<Option<Arc<dyn SseWriter>>>,
    state: SyncMutex<TransportState>,
}

impl std::fmt::Debug for HttpSseTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpSseTransport")
            .field("session_id", &self.session.id())
            .field("state", &*self.state.lock())
            .finish()
    }
}

impl HttpSseTransport {
    /// Bind a transport to an existing session.
    pub fn new(session: Arc<Session>) -> Self {
        Self {
            session,
            writer: SyncMutex::new(None),
            state: SyncMutex::new(TransportState::Connected),
        }
    }

    /// The bound session's id.
    pub fn session_id(&self) -> &str {
        self.session.id()
    }

    /// Attach the writer that streams live events for a newly-opened GET
    /// request, replacing any previously attached writer (the prior
    /// stream is assumed to have disconnected).
    pub fn attach_writer(&self, writer: Arc<dyn SseWriter>) {
        *self.writer.lock() = Some(writer);
    }

    /// Detach the current writer, e.g. when the GET connection drops.
    pub fn detach_writer(&self) {
        *self.writer.lock() = None;
    }

    /// Resume an SSE stream: replay everything buffered after
    /// `last_event_id` to the newly attached writer.
    pub async fn resume(&self, writer: Arc<dyn SseWriter>, last_event_id: u64) -> TransportResult<()> {
        let backlog = self.session.replay_from(last_event_id).await;
        for event in backlog {
            writer.write_event(event).await?;
        }
        self.attach_writer(writer);
        Ok(())
    }

    /// Deliver an inbound POST body as if it arrived over the wire.
    pub async fn deliver(&self, body: String) {
        self.session.receive(body).await;
    }
}

impl Transport for HttpSseTransport {
    fn connect(&self) -> Pin<Box<dyn Future<Output = TransportResult<()>> + Send + '_>> {
        Box::pin(async move {
            *self.state.lock() = TransportState::Connected;
            Ok(())
        })
    }

    fn send(&self, message: String) -> Pin<Box<dyn Future<Output = TransportResult<()>> + Send + '_>> {
        Box::pin(async move {
            if *self.state.lock() != TransportState::Connected {
                return Err(TransportError::ConnectionLost(
                    "session is closed".to_string(),
                ));
            }
            let event = self.session.broadcast_event(message).await;
            let writer = self.writer.lock().clone();
            if let Some(writer) = writer {
                writer.write_event(event).await?;
            }
            Ok(())
        })
    }

    fn set_on_message(&self, callback: MessageCallback) {
        let session = Arc::clone(&self.session);
        tokio::spawn(async move {
            session.set_on_message(callback).await;
        });
    }

    fn set_on_error(&self, callback: ErrorCallback) {
        let session = Arc::clone(&self.session);
        tokio::spawn(async move {
            session.set_on_error(callback).await;
        });
    }

    fn disconnect(&self) -> Pin<Box<dyn Future<Output = TransportResult<()>> + Send + '_>> {
        Box::pin(async move {
            *self.state.lock() = TransportState::Closed;
            self.detach_writer();
            Ok(())
        })
    }

    fn state(&self) -> TransportState {
        *self.state.lock()
    }

    fn capabilities(&self) -> TransportCapabilities {
        TransportCapabilities::HTTP_SSE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    struct RecordingWriter(Arc<StdMutex<Vec<u64>>>);

    impl SseWriter for RecordingWriter {
        fn write_event(
            &self,
            event: crate::session::StoredEvent,
        ) -> Pin<Box<dyn Future<Output = TransportResult<()>> + Send + '_>> {
            self.0.lock().unwrap().push(event.id);
            Box::pin(async { Ok(()) })
        }
    }

    #[tokio::test]
    async fn send_buffers_event_even_without_attached_writer() {
        let session = Session::new(256);
        let transport = HttpSseTransport::new(session);
        transport.connect().await.unwrap();
        transport.send("hello".to_string()).await.unwrap();
        let backlog = transport.session.replay_from(0).await;
        assert_eq!(backlog.len(), 1);
    }

    #[tokio::test]
    async fn send_streams_live_to_attached_writer() {
        let session = Session::new(256);
        let transport = HttpSseTransport::new(session);
        transport.connect().await.unwrap();
        let seen = Arc::new(StdMutex::new(Vec::new()));
        transport.attach_writer(Arc::new(RecordingWriter(Arc::clone(&seen))));
        transport.send("a".to_string()).await.unwrap();
        transport.send("b".to_string()).await.unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![1, 2]);
    }

    #[tokio::test]
    async fn resume_replays_backlog_then_attaches() {
        let session = Session::new(256);
        let transport = HttpSseTransport::new(session);
        transport.connect().await.unwrap();
        transport.send("a".to_string()).await.unwrap();
        transport.send("b".to_string()).await.unwrap();
        transport.send("c".to_string()).await.unwrap();

        let seen = Arc::new(StdMutex::new(Vec::new()));
        transport
            .resume(Arc::new(RecordingWriter(Arc::clone(&seen))), 1)
            .await
            .unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![2, 3]);

        transport.send("d".to_string()).await.unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![2, 3, 4]);
    }

    #[tokio::test]
    async fn send_after_disconnect_fails() {
        let session = Session::new(256);
        let transport = HttpSseTransport::new(session);
        transport.connect().await.unwrap();
        transport.disconnect().await.unwrap();
        let err = transport.send("x".to_string()).await.unwrap_err();
        matches!(err, TransportError::ConnectionLost(_));
    }
}
