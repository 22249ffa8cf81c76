use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use mcpcore_transport_traits::{
    ErrorCallback, MessageCallback, Transport, TransportCapabilities, TransportError,
    TransportFactory, TransportResult, TransportState,
};
use parking_lot::Mutex as SyncMutex;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::Mutex as AsyncMutex;
use tokio_util::codec::{FramedRead, LinesCodec};

/// Reader-side pipe accepted by [`StdioTransport`]. Boxed so production
/// code can wire up real process stdio while tests use [`tokio::io::duplex`].
pub type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;
/// Writer-side pipe accepted by [`StdioTransport`].
pub type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

struct Callbacks {
    on_message: Option<MessageCallback>,
    on_error: Option<ErrorCallback>,
}

/// Reject a frame containing a raw newline before attempting to parse it
/// as JSON. This is checked first: a message that is syntactically valid
/// JSON but embeds a literal `\n` would corrupt the newline-delimited
/// framing for every message that follows it on the wire.
fn validate_no_embedded_newline(raw: &str) -> TransportResult<()> {
    if raw.contains('\n') {
        return Err(TransportError::FramingError(
            "message contains an embedded newline".to_string(),
        ));
    }
    Ok(())
}

/// Newline-delimited JSON transport over any duplex byte stream.
///
/// Messages are read one line at a time by a background task and handed
/// to the registered [`MessageCallback`]. Writers serialize through a
/// single async mutex so concurrent callers never interleave partial
/// lines on the wire.
pub struct StdioTransport {
    writer: AsyncMutex<Option<BoxedWriter>>,
    reader_task: AsyncMutex<Option<tokio::task::JoinHandle<()>>>,
    callbacks: Arc<SyncMutex<Callbacks>>,
    state: Arc<SyncMutex<TransportState>>,
    max_message_size: usize,
    messages_sent: AtomicU64,
    messages_received: AtomicU64,
    reader: AsyncMutex<Option<BoxedReader>>,
}

impl std::fmt::Debug for StdioTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StdioTransport")
            .field("state", &*self.state.lock())
            .field("messages_sent", &self.messages_sent.load(Ordering::Relaxed))
            .field(
                "messages_received",
                &self.messages_received.load(Ordering::Relaxed),
            )
            .finish()
    }
}

impl StdioTransport {
    /// Build a transport over the given reader/writer pair, not yet
    /// connected (the background reader task starts on [`Transport::connect`]).
    pub fn new(reader: BoxedReader, writer: BoxedWriter, max_message_size: usize) -> Self {
        Self {
            writer: AsyncMutex::new(Some(writer)),
            reader_task: AsyncMutex::new(None),
            callbacks: Arc::new(SyncMutex::new(Callbacks {
                on_message: None,
                on_error: None,
            })),
            state: Arc::new(SyncMutex::new(TransportState::Disconnected)),
            max_message_size,
            messages_sent: AtomicU64::new(0),
            messages_received: AtomicU64::new(0),
            reader: AsyncMutex::new(Some(reader)),
        }
    }

    /// Build a transport over this process's own stdin/stdout.
    pub fn process_stdio(max_message_size: usize) -> Self {
        Self::new(
            Box::new(tokio::io::stdin()),
            Box::new(tokio::io::stdout()),
            max_message_size,
        )
    }

    fn set_state(&self, new_state: TransportState) {
        *self.state.lock() = new_state;
    }

    fn emit_error(&self, err: TransportError) {
        let cb = self.callbacks.lock().on_error.clone();
        if let Some(cb) = cb {
            cb(err);
        }
    }
}

impl Transport for StdioTransport {
    fn connect(&self) -> Pin<Box<dyn Future<Output = TransportResult<()>> + Send + '_>> {
        Box::pin(async move {
            let mut reader_slot = self.reader.lock().await;
            let reader = reader_slot
                .take()
                .ok_or_else(|| TransportError::ConnectionFailed("already connected".into()))?;
            drop(reader_slot);

            let callbacks = Arc::clone(&self.callbacks);
            let state = Arc::clone(&self.state);
            let max_size = self.max_message_size;

            let handle = tokio::spawn(async move {
                let mut framed = FramedRead::new(reader, LinesCodec::new_with_max_length(max_size));
                use futures::StreamExt;

                loop {
                    match framed.next().await {
                        Some(Ok(line)) => {
                            if line.trim().is_empty() {
                                continue;
                            }
                            if let Err(e) = validate_no_embedded_newline(&line) {
                                let cb = callbacks.lock().on_error.clone();
                                if let Some(cb) = cb {
                                    cb(e);
                                }
                                continue;
                            }
                            let cb = callbacks.lock().on_message.clone();
                            if let Some(cb) = cb {
                                cb(line);
                            }
                        }
                        Some(Err(e)) => {
                            let cb = callbacks.lock().on_error.clone();
                            if let Some(cb) = cb {
                                cb(TransportError::Io(e.to_string()));
                            }
                        }
                        None => {
                            // EOF: mark closed immediately and surface an
                            // error rather than lingering "open" — the
                            // next send() observes this state and fails.
                            *state.lock() = TransportState::Closed;
                            let cb = callbacks.lock().on_error.clone();
                            if let Some(cb) = cb {
                                cb(TransportError::ConnectionLost(
                                    "end of stream reached".to_string(),
                                ));
                            }
                            break;
                        }
                    }
                }
            });

            *self.reader_task.lock().await = Some(handle);
            self.set_state(TransportState::Connected);
            Ok(())
        })
    }

    fn send(&self, message: String) -> Pin<Box<dyn Future<Output = TransportResult<()>> + Send + '_>> {
        Box::pin(async move {
            if *self.state.lock() != TransportState::Connected {
                return Err(TransportError::ConnectionLost(
                    "transport is not connected".to_string(),
                ));
            }
            validate_no_embedded_newline(&message)?;
            if message.len() > self.max_message_size {
                return Err(TransportError::MessageTooLarge {
                    size: message.len(),
                    max: self.max_message_size,
                });
            }

            use tokio::io::AsyncWriteExt;
            let mut guard = self.writer.lock().await;
            let writer = guard
                .as_mut()
                .ok_or_else(|| TransportError::ConnectionLost("writer already closed".into()))?;
            writer
                .write_all(message.as_bytes())
                .await
                .map_err(|e| TransportError::SendFailed(e.to_string()))?;
            writer
                .write_all(b"\n")
                .await
                .map_err(|e| TransportError::SendFailed(e.to_string()))?;
            writer
                .flush()
                .await
                .map_err(|e| TransportError::SendFailed(e.to_string()))?;

            self.messages_sent.fetch_add(1, Ordering::Relaxed);
            Ok(())
        })
    }

    fn set_on_message(&self, callback: MessageCallback) {
        self.callbacks.lock().on_message = Some(callback);
    }

    fn set_on_error(&self, callback: ErrorCallback) {
        self.callbacks.lock().on_error = Some(callback);
    }

    fn disconnect(&self) -> Pin<Box<dyn Future<Output = TransportResult<()>> + Send + '_>> {
        Box::pin(async move {
            if let Some(handle) = self.reader_task.lock().await.take() {
                handle.abort();
            }
            *self.writer.lock().await = None;
            self.set_state(TransportState::Closed);
            Ok(())
        })
    }

    fn state(&self) -> TransportState {
        *self.state.lock()
    }

    fn capabilities(&self) -> TransportCapabilities {
        TransportCapabilities::STDIO
    }
}

/// Builds [`StdioTransport`] instances bound to this process's stdio.
#[derive(Debug, Default)]
pub struct StdioTransportFactory {
    max_message_size: usize,
}

impl StdioTransportFactory {
    /// Build a factory with the given per-message size limit.
    pub fn new(max_message_size: usize) -> Self {
        Self { max_message_size }
    }
}

impl TransportFactory for StdioTransportFactory {
    fn create(&self) -> Box<dyn Transport> {
        let max = if self.max_message_size == 0 {
            mcpcore_types::MAX_MESSAGE_SIZE
        } else {
            self.max_message_size
        };
        Box::new(StdioTransport::process_stdio(max))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;
    use std::sync::Mutex as StdMutex;

    fn duplex_transport(max: usize) -> (StdioTransport, tokio::io::DuplexStream) {
        let (client, server) = tokio::io::duplex(8192);
        let (read_half, write_half) = tokio::io::split(client);
        let transport = StdioTransport::new(Box::new(read_half), Box::new(write_half), max);
        (transport, server)
    }

    #[tokio::test]
    async fn connects_and_sends() {
        let (transport, mut server) = duplex_transport(mcpcore_types::MAX_MESSAGE_SIZE);
        transport.connect().await.unwrap();
        transport.send(r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#.to_string())
            .await
            .unwrap();

        use tokio::io::AsyncReadExt;
        let mut buf = vec![0u8; 256];
        let n = server.read(&mut buf).await.unwrap();
        let line = String::from_utf8(buf[..n].to_vec()).unwrap();
        assert!(line.starts_with('{'));
        assert!(line.ends_with('\n'));
    }

    #[tokio::test]
    async fn delivers_inbound_messages_to_callback() {
        let (transport, mut server) = duplex_transport(mcpcore_types::MAX_MESSAGE_SIZE);
        let received = Arc::new(StdMutex::new(Vec::new()));
        let received_clone = Arc::clone(&received);
        transport.set_on_message(Arc::new(move |msg| {
            received_clone.lock().unwrap().push(msg);
        }));
        transport.connect().await.unwrap();

        use tokio::io::AsyncWriteExt;
        server
            .write_all(b"{\"jsonrpc\":\"2.0\",\"method\":\"notifications/initialized\"}\n")
            .await
            .unwrap();
        server.flush().await.unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert_eq!(received.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn rejects_embedded_newline_on_send() {
        let (transport, _server) = duplex_transport(mcpcore_types::MAX_MESSAGE_SIZE);
        transport.connect().await.unwrap();
        let err = transport
            .send("{\"a\":\"line1\nline2\"}".to_string())
            .await
            .unwrap_err();
        matches!(err, TransportError::FramingError(_));
    }

    #[tokio::test]
    async fn send_before_connect_fails() {
        let (transport, _server) = duplex_transport(mcpcore_types::MAX_MESSAGE_SIZE);
        let err = transport.send("{}".to_string()).await.unwrap_err();
        matches!(err, TransportError::ConnectionLost(_));
    }

    #[tokio::test]
    async fn eof_marks_closed_and_fails_next_send() {
        let (transport, server) = duplex_transport(mcpcore_types::MAX_MESSAGE_SIZE);
        let saw_error = Arc::new(AtomicBool::new(false));
        let saw_error_clone = Arc::clone(&saw_error);
        transport.set_on_error(Arc::new(move |_| {
            saw_error_clone.store(true, Ordering::SeqCst);
        }));
        transport.connect().await.unwrap();
        drop(server);

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert!(saw_error.load(Ordering::SeqCst));
        assert_eq!(transport.state(), TransportState::Closed);

        let err = transport.send("{}".to_string()).await.unwrap_err();
        matches!(err, TransportError::ConnectionLost(_));
    }

    #[tokio::test]
    async fn oversized_message_rejected_before_send() {
        let (transport, _server) = duplex_transport(16);
        transport.connect().await.unwrap();
        let err = transport
            .send(r#"{"jsonrpc":"2.0","id":1,"method":"x"}"#.to_string())
            .await
            .unwrap_err();
        matches!(err, TransportError::MessageTooLarge { .. });
    }

    #[test]
    fn embedded_newline_validation_is_pure() {
        assert!(validate_no_embedded_newline("no newline here").is_ok());
        assert!(validate_no_embedded_newline("has\na newline").is_err());
    }
}
