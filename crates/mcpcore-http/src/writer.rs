use std::future::Future;
use std::pin::Pin;

use mcpcore_transport_traits::TransportResult;

use crate::session::StoredEvent;

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Adapter an embedder implements to stream [`StoredEvent`]s over
/// whatever HTTP stack hosts the GET endpoint.
///
/// This crate never opens a socket; it only decides *what* bytes an SSE
/// response should contain and *when* (on `broadcast_event` and on
/// resumption via `replay_from`). The embedder's implementation is
/// responsible for the `text/event-stream` response headers and framing
/// each event as `data: <json>\nid: <n>\n\n`.
pub trait SseWriter: Send + Sync {
    /// Write one event to the open stream.
    fn write_event(&self, event: StoredEvent) -> BoxFuture<'_, TransportResult<()>>;
}

/// Adapter an embedder implements to reply to a POST request.
///
/// The contract this crate assumes of `respond`: it must be callable
/// exactly once per POST, with whatever JSON-RPC reply (or empty ack,
/// if replies are carried solely over SSE — see the synchronous-vs-SSE
/// open question) the peer engine produced for that inbound message.
pub trait PostResponder: Send + Sync {
    /// Send the HTTP response body for one POST request.
    fn respond(&self, body: String) -> BoxFuture<'_, TransportResult<()>>;
}
