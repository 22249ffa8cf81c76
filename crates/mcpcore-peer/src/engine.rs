use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex as SyncMutex};
use std::time::Duration;

use mcpcore_transport_traits::Transport;
use mcpcore_types::jsonrpc::{
    JsonRpcError, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse, JsonRpcResponsePayload,
    Message, RequestId, extract_id_lossy,
};
use mcpcore_types::protocol::{ClientCapabilities, Implementation, InitializeResult, ServerCapabilities};
use mcpcore_types::{error_codes, methods};
use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::cancel::CancelObserver;
use crate::deadline::DeadlineTracker;
use crate::error::PeerError;
use crate::handshake::SessionState;
use crate::id::IdAllocator;
use crate::inbound::InboundTracker;
use crate::pending::{Outcome, PendingMap};

type HandlerFuture = Pin<Box<dyn Future<Output = Result<Value, JsonRpcError>> + Send>>;

/// Dispatches an inbound request to user code. Returns the `result`
/// payload of the response the engine will send, or an error to wrap
/// into an error response.
pub type InboundHandler = Arc<dyn Fn(Option<Value>, RequestContext) -> HandlerFuture + Send + Sync>;

/// Dispatches an inbound notification. Never produces a reply.
pub type NotificationHandler = Arc<dyn Fn(Option<Value>) + Send + Sync>;

/// Context handed to an inbound request handler.
#[derive(Clone)]
pub struct RequestContext {
    /// The id of the request being served.
    pub id: RequestId,
    /// Signaled if the peer sends `notifications/cancelled` for this id.
    pub cancel: CancelObserver,
    /// The progress token from `params._meta.progressToken`, if present.
    pub progress_token: Option<Value>,
    transport: Arc<dyn Transport>,
}

impl std::fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestContext").field("id", &self.id).finish()
    }
}

impl RequestContext {
    /// Emit a `notifications/progress` update addressed by this
    /// request's progress token. A no-op (returns `Ok(())`) if the
    /// caller did not supply a progress token.
    pub async fn emit_progress(&self, progress: f64, total: Option<f64>) -> mcpcore_transport_traits::TransportResult<()> {
        let Some(token) = self.progress_token.clone() else {
            return Ok(());
        };
        let mut params = serde_json::json!({ "progressToken": token, "progress": progress });
        if let Some(total) = total {
            params["total"] = serde_json::json!(total);
        }
        let notification = JsonRpcNotification::new(methods::PROGRESS, Some(params));
        let raw = serde_json::to_string(&notification).expect("notification always serializes");
        self.transport.send(raw).await
    }
}

fn extract_progress_token(params: &Option<Value>) -> Option<Value> {
    params
        .as_ref()?
        .get("_meta")?
        .get("progressToken")
        .cloned()
}

/// Configuration for a [`PeerEngine`] acting as the server side of a
/// handshake (the side that answers `initialize`).
#[derive(Debug, Clone)]
pub struct ServerIdentity {
    /// This server's implementation identity.
    pub info: Implementation,
    /// This server's capabilities, echoed back in the initialize result.
    pub capabilities: ServerCapabilities,
}

/// The reactor that multiplexes outbound requests against inbound
/// responses, dispatches inbound requests/notifications, and drives the
/// initialize handshake.
pub struct PeerEngine {
    transport: Arc<dyn Transport>,
    ids: IdAllocator,
    pending: Arc<PendingMap>,
    deadlines: Arc<DeadlineTracker>,
    inbound: Arc<InboundTracker>,
    state: Arc<SyncMutex<SessionState>>,
    handlers: SyncMutex<HashMap<String, InboundHandler>>,
    notification_handlers: SyncMutex<HashMap<String, NotificationHandler>>,
    negotiated_version: SyncMutex<Option<String>>,
    default_timeout: Duration,
    server_identity: ServerIdentity,
}

impl std::fmt::Debug for PeerEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PeerEngine")
            .field("state", &self.state())
            .field("pending_count", &self.pending.pending_count())
            .finish()
    }
}

impl PeerEngine {
    /// Build a new engine bound to `transport`. Call
    /// [`PeerEngine::attach`] once wrapped in an `Arc` before
    /// [`PeerEngine::connect`].
    pub fn new(transport: Arc<dyn Transport>, default_timeout: Duration, server_identity: ServerIdentity) -> Self {
        Self {
            transport,
            ids: IdAllocator::new(),
            pending: Arc::new(PendingMap::new()),
            deadlines: Arc::new(DeadlineTracker::new()),
            inbound: Arc::new(InboundTracker::new()),
            state: Arc::new(SyncMutex::new(SessionState::Unconnected)),
            handlers: SyncMutex::new(HashMap::new()),
            notification_handlers: SyncMutex::new(HashMap::new()),
            negotiated_version: SyncMutex::new(None),
            default_timeout,
            server_identity,
        }
    }

    /// Register the handler invoked for inbound requests matching
    /// `method`. Built-in methods (`initialize`, `ping`) are never routed
    /// here.
    pub fn register_handler(&self, method: impl Into<String>, handler: InboundHandler) {
        self.handlers.lock().unwrap().insert(method.into(), handler);
    }

    /// Register the handler invoked for inbound notifications matching
    /// `method`.
    pub fn register_notification_handler(&self, method: impl Into<String>, handler: NotificationHandler) {
        self.notification_handlers
            .lock()
            .unwrap()
            .insert(method.into(), handler);
    }

    /// Wire this engine's dispatch loop to the transport's callbacks and
    /// start the background deadline sweeper. Must be called before
    /// [`PeerEngine::connect`].
    pub fn attach(self: &Arc<Self>) {
        let engine = Arc::clone(self);
        self.transport.set_on_message(Arc::new(move |raw| {
            let engine = Arc::clone(&engine);
            tokio::spawn(async move {
                engine.dispatch(raw).await;
            });
        }));

        let engine = Arc::clone(self);
        self.transport.set_on_error(Arc::new(move |_err| {
            engine.handle_transport_closed();
        }));

        let engine = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(Duration::from_millis(50)).await;
                if *engine.state.lock().unwrap() == SessionState::Closed {
                    break;
                }
                engine.deadlines.tick(std::time::Instant::now());
            }
        });
    }

    /// Current session state.
    pub fn state(&self) -> SessionState {
        *self.state.lock().unwrap()
    }

    /// Connect the underlying transport.
    pub async fn connect(&self) -> Result<(), PeerError> {
        *self.state.lock().unwrap() = SessionState::Connecting;
        self.transport
            .connect()
            .await
            .map_err(|e| PeerError::Transport(e.to_string()))
    }

    /// Perform the client side of the initialize handshake: send
    /// `initialize`, validate the server's selected protocol version
    /// against [`mcpcore_types::SUPPORTED_VERSIONS`], then send
    /// `notifications/initialized`.
    pub async fn initialize(
        &self,
        client_info: Implementation,
        capabilities: ClientCapabilities,
    ) -> Result<InitializeResult, PeerError> {
        *self.state.lock().unwrap() = SessionState::HandshakingInitializeSent;

        let params = serde_json::json!({
            "protocolVersion": mcpcore_types::PROTOCOL_VERSION,
            "capabilities": capabilities,
            "clientInfo": client_info,
        });
        let result = self.call_inner(methods::INITIALIZE, Some(params), self.default_timeout).await;

        let result = match result {
            Ok(value) => value,
            Err(e) => {
                *self.state.lock().unwrap() = SessionState::Closed;
                return Err(e);
            }
        };

        let parsed: InitializeResult = match serde_json::from_value(result) {
            Ok(v) => v,
            Err(e) => {
                *self.state.lock().unwrap() = SessionState::Closed;
                return Err(PeerError::Transport(format!("malformed initialize result: {e}")));
            }
        };

        if !mcpcore_types::SUPPORTED_VERSIONS.contains(&parsed.protocol_version.as_str()) {
            *self.state.lock().unwrap() = SessionState::Closed;
            let _ = self.transport.disconnect().await;
            return Err(PeerError::ProtocolVersionMismatch {
                selected: parsed.protocol_version,
                supported: mcpcore_types::SUPPORTED_VERSIONS.to_vec(),
            });
        }

        *self.negotiated_version.lock().unwrap() = Some(parsed.protocol_version.clone());
        let notification = JsonRpcNotification::new(methods::INITIALIZED, None);
        let raw = serde_json::to_string(&notification).expect("notification always serializes");
        self.transport
            .send(raw)
            .await
            .map_err(|e| PeerError::Transport(e.to_string()))?;

        *self.state.lock().unwrap() = SessionState::Initialized;
        Ok(parsed)
    }

    /// Send an outbound request and await its response, subject to
    /// `timeout`.
    pub async fn call(&self, method: &str, params: Option<Value>, timeout: Duration) -> Result<Value, PeerError> {
        self.call_inner(method, params, timeout).await
    }

    async fn call_inner(&self, method: &str, params: Option<Value>, timeout: Duration) -> Result<Value, PeerError> {
        let id = self.ids.next();
        let rx = self.pending.register(id.clone());

        let deadlines = Arc::clone(&self.deadlines);
        let id_for_timeout = id.clone();
        let pending_for_timeout = Arc::clone(&self.pending);
        // The completion path (response arriving first) removes this
        // deadline via `cancel`; this closure only runs if the deadline
        // actually elapses first.
        let timeout_cb = move || {
            pending_for_timeout.complete(&id_for_timeout, Outcome::TimedOut);
        };
        deadlines.set(id.clone(), timeout, timeout_cb);

        let request = JsonRpcRequest::new(id.clone(), method, params);
        let raw = serde_json::to_string(&request).map_err(|e| PeerError::Transport(e.to_string()))?;

        if let Err(e) = self.transport.send(raw).await {
            self.deadlines.cancel(&id);
            self.pending.complete(&id, Outcome::TransportClosed);
            return Err(PeerError::Transport(e.to_string()));
        }

        match rx.await {
            Ok(Outcome::Success(value)) => {
                self.deadlines.cancel(&id);
                Ok(value)
            }
            Ok(Outcome::Error(e)) => {
                self.deadlines.cancel(&id);
                Err(PeerError::Remote {
                    code: e.code,
                    message: e.message,
                })
            }
            Ok(Outcome::TimedOut) => Err(PeerError::Timeout),
            Ok(Outcome::Cancelled) => Err(PeerError::Cancelled),
            Ok(Outcome::TransportClosed) => Err(PeerError::TransportClosed),
            Err(_) => Err(PeerError::EngineShutdown),
        }
    }

    /// Fire-and-forget an outbound notification.
    pub async fn notify(&self, method: &str, params: Option<Value>) -> Result<(), PeerError> {
        let notification = JsonRpcNotification::new(method, params);
        let raw = serde_json::to_string(&notification).map_err(|e| PeerError::Transport(e.to_string()))?;
        self.transport.send(raw).await.map_err(|e| PeerError::Transport(e.to_string()))
    }

    /// Cancel a local outbound request: retire it locally and tell the
    /// peer via `notifications/cancelled`. A late response the peer
    /// sends anyway is silently discarded by [`PendingMap::complete`].
    pub async fn cancel(&self, id: RequestId, reason: Option<String>) -> Result<(), PeerError> {
        self.deadlines.cancel(&id);
        if !self.pending.complete(&id, Outcome::Cancelled) {
            return Ok(());
        }
        let mut params = serde_json::json!({ "requestId": id });
        if let Some(reason) = reason {
            params["reason"] = serde_json::json!(reason);
        }
        let notification = JsonRpcNotification::new(methods::CANCELLED, Some(params));
        let raw = serde_json::to_string(&notification).map_err(|e| PeerError::Transport(e.to_string()))?;
        self.transport.send(raw).await.map_err(|e| PeerError::Transport(e.to_string()))
    }

    /// Close the session: drain pending requests, cancel in-flight
    /// inbound handlers is left to the caller (cooperative), and
    /// disconnect the transport.
    pub async fn close(&self) {
        self.pending.drain(|| Outcome::Cancelled);
        *self.state.lock().unwrap() = SessionState::Closed;
        let _ = self.transport.disconnect().await;
    }

    fn handle_transport_closed(&self) {
        self.pending.drain(|| Outcome::TransportClosed);
        *self.state.lock().unwrap() = SessionState::Closed;
    }

    async fn dispatch(self: Arc<Self>, raw: String) {
        let value: Value = match serde_json::from_str(&raw) {
            Ok(v) => v,
            Err(_) => {
                let id = extract_id_lossy(&raw);
                self.send_error_response(id, JsonRpcError::parse_error("invalid JSON")).await;
                return;
            }
        };

        match Message::parse(value) {
            Ok(Message::Response(resp)) => self.handle_response(resp),
            Ok(Message::Request(req)) => self.handle_request(req).await,
            Ok(Message::Notification(note)) => self.handle_notification(note),
            Err(reason) => {
                let id = extract_id_lossy(&raw);
                self.send_error_response(id, JsonRpcError::invalid_request(reason)).await;
            }
        }
    }

    fn handle_response(&self, resp: JsonRpcResponse) {
        let outcome = match resp.payload {
            JsonRpcResponsePayload::Result(v) => Outcome::Success(v),
            JsonRpcResponsePayload::Error(e) => Outcome::Error(e),
        };
        if !self.pending.complete(&resp.id, outcome) {
            debug!(id = %resp.id, "dropping response for unknown or already-retired request");
        }
    }

    fn handle_notification(self: &Arc<Self>, note: JsonRpcNotification) {
        if note.method == methods::CANCELLED {
            if let Some(req_id) = note
                .params
                .as_ref()
                .and_then(|p| p.get("requestId"))
                .and_then(|v| serde_json::from_value::<RequestId>(v.clone()).ok())
            {
                if !self.inbound.cancel(&req_id) {
                    trace!(id = %req_id, "cancellation for unknown or already-completed inbound request");
                }
            }
            return;
        }
        if note.method == methods::INITIALIZED {
            return;
        }

        let handler = self.notification_handlers.lock().unwrap().get(&note.method).cloned();
        if let Some(handler) = handler {
            handler(note.params);
        } else {
            trace!(method = %note.method, "no handler registered for notification");
        }
    }

    async fn handle_request(self: &Arc<Self>, req: JsonRpcRequest) {
        let state = self.state();
        if !state.admits(&req.method) {
            self.send_error_response(
                Some(req.id),
                JsonRpcError::new(
                    error_codes::NOT_INITIALIZED.into(),
                    "session has not completed the initialize handshake",
                ),
            )
            .await;
            return;
        }

        if req.method == methods::PING {
            self.send_success_response(req.id, serde_json::json!({})).await;
            return;
        }

        if req.method == methods::INITIALIZE {
            let result = InitializeResult {
                protocol_version: mcpcore_types::PROTOCOL_VERSION.to_string(),
                capabilities: self.server_identity.capabilities.clone(),
                server_info: self.server_identity.info.clone(),
            };
            let value = serde_json::to_value(result).expect("initialize result always serializes");
            self.send_success_response(req.id, value).await;
            *self.state.lock().unwrap() = SessionState::Initialized;
            return;
        }

        let handler = self.handlers.lock().unwrap().get(&req.method).cloned();
        let Some(handler) = handler else {
            self.send_error_response(Some(req.id), JsonRpcError::method_not_found(&req.method)).await;
            return;
        };

        let progress_token = extract_progress_token(&req.params);
        let observer = self.inbound.begin(req.id.clone());
        let ctx = RequestContext {
            id: req.id.clone(),
            cancel: observer,
            progress_token,
            transport: Arc::clone(&self.transport),
        };

        let outcome = handler(req.params, ctx).await;
        self.inbound.finish(&req.id);

        match outcome {
            Ok(value) => self.send_success_response(req.id, value).await,
            Err(e) => self.send_error_response(Some(req.id), e).await,
        }
    }

    async fn send_success_response(&self, id: RequestId, result: Value) {
        let response = JsonRpcResponse::success(id, result);
        self.send_response(response).await;
    }

    async fn send_error_response(&self, id: Option<RequestId>, error: JsonRpcError) {
        let id = id.unwrap_or(RequestId::Number(0));
        let response = JsonRpcResponse::failure(id, error);
        self.send_response(response).await;
    }

    async fn send_response(&self, response: JsonRpcResponse) {
        match serde_json::to_string(&response) {
            Ok(raw) => {
                if let Err(e) = self.transport.send(raw).await {
                    warn!(error = %e, "failed to send response");
                }
            }
            Err(e) => warn!(error = %e, "failed to serialize response"),
        }
    }

    /// The protocol version negotiated during `initialize`, once complete.
    pub fn negotiated_version(&self) -> Option<String> {
        self.negotiated_version.lock().unwrap().clone()
    }

    /// Number of outbound requests currently awaiting a response.
    pub fn pending_count(&self) -> usize {
        self.pending.pending_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcpcore_transport_traits::{
        ErrorCallback, MessageCallback, TransportCapabilities, TransportResult, TransportState,
    };
    use std::sync::Mutex as StdMutex;
    use tokio::sync::mpsc;

    /// A loopback transport: whatever is sent on one end is delivered as
    /// an inbound message on the paired end, with no encoding in between.
    struct LoopbackTransport {
        outbound: mpsc::UnboundedSender<String>,
        on_message: StdMutex<Option<MessageCallback>>,
        on_error: StdMutex<Option<ErrorCallback>>,
        state: StdMutex<TransportState>,
    }

    impl std::fmt::Debug for LoopbackTransport {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("LoopbackTransport").finish()
        }
    }

    fn loopback_pair() -> (Arc<LoopbackTransport>, Arc<LoopbackTransport>) {
        let (tx_a_to_b, mut rx_a_to_b) = mpsc::unbounded_channel::<String>();
        let (tx_b_to_a, mut rx_b_to_a) = mpsc::unbounded_channel::<String>();

        let a = Arc::new(LoopbackTransport {
            outbound: tx_a_to_b,
            on_message: StdMutex::new(None),
            on_error: StdMutex::new(None),
            state: StdMutex::new(TransportState::Connected),
        });
        let b = Arc::new(LoopbackTransport {
            outbound: tx_b_to_a,
            on_message: StdMutex::new(None),
            on_error: StdMutex::new(None),
            state: StdMutex::new(TransportState::Connected),
        });

        let b_for_a = Arc::clone(&b);
        tokio::spawn(async move {
            while let Some(msg) = rx_b_to_a.recv().await {
                let cb = b_for_a.on_message.lock().unwrap().clone();
                if let Some(cb) = cb {
                    cb(msg);
                }
            }
        });
        let a_for_b = Arc::clone(&a);
        tokio::spawn(async move {
            while let Some(msg) = rx_a_to_b.recv().await {
                let cb = a_for_b.on_message.lock().unwrap().clone();
                if let Some(cb) = cb {
                    cb(msg);
                }
            }
        });

        (a, b)
    }

    impl Transport for LoopbackTransport {
        fn connect(&self) -> Pin<Box<dyn Future<Output = TransportResult<()>> + Send + '_>> {
            Box::pin(async move { Ok(()) })
        }

        fn send(&self, message: String) -> Pin<Box<dyn Future<Output = TransportResult<()>> + Send + '_>> {
            Box::pin(async move {
                let _ = self.outbound.send(message);
                Ok(())
            })
        }

        fn set_on_message(&self, callback: MessageCallback) {
            *self.on_message.lock().unwrap() = Some(callback);
        }

        fn set_on_error(&self, callback: ErrorCallback) {
            *self.on_error.lock().unwrap() = Some(callback);
        }

        fn disconnect(&self) -> Pin<Box<dyn Future<Output = TransportResult<()>> + Send + '_>> {
            Box::pin(async move {
                *self.state.lock().unwrap() = TransportState::Closed;
                Ok(())
            })
        }

        fn state(&self) -> TransportState {
            *self.state.lock().unwrap()
        }

        fn capabilities(&self) -> TransportCapabilities {
            TransportCapabilities::STDIO
        }
    }

    fn server_identity() -> ServerIdentity {
        ServerIdentity {
            info: Implementation {
                name: "test-server".to_string(),
                version: "0.1.0".to_string(),
            },
            capabilities: ServerCapabilities::default(),
        }
    }

    fn client_info() -> Implementation {
        Implementation {
            name: "test-client".to_string(),
            version: "0.1.0".to_string(),
        }
    }

    #[tokio::test]
    async fn ping_round_trip_before_initialize() {
        let (client_t, server_t) = loopback_pair();
        let client = Arc::new(PeerEngine::new(client_t, Duration::from_secs(5), server_identity()));
        let server = Arc::new(PeerEngine::new(server_t, Duration::from_secs(5), server_identity()));
        client.attach();
        server.attach();

        let result = client.call(methods::PING, None, Duration::from_secs(1)).await.unwrap();
        assert_eq!(result, serde_json::json!({}));
    }

    #[tokio::test]
    async fn initialize_handshake_reaches_initialized_state() {
        let (client_t, server_t) = loopback_pair();
        let client = Arc::new(PeerEngine::new(client_t, Duration::from_secs(5), server_identity()));
        let server = Arc::new(PeerEngine::new(server_t, Duration::from_secs(5), server_identity()));
        client.attach();
        server.attach();

        let result = client
            .initialize(client_info(), ClientCapabilities::default())
            .await
            .unwrap();
        assert_eq!(result.protocol_version, mcpcore_types::PROTOCOL_VERSION);

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(client.state(), SessionState::Initialized);
        assert_eq!(server.state(), SessionState::Initialized);
    }

    #[tokio::test]
    async fn request_before_initialized_is_rejected_except_ping_and_initialize() {
        let (client_t, server_t) = loopback_pair();
        let client = Arc::new(PeerEngine::new(client_t, Duration::from_secs(5), server_identity()));
        let server = Arc::new(PeerEngine::new(server_t, Duration::from_secs(5), server_identity()));
        client.attach();
        server.attach();

        let err = client
            .call("tools/list", None, Duration::from_secs(1))
            .await
            .unwrap_err();
        matches!(err, PeerError::Remote { .. });
    }

    #[tokio::test]
    async fn call_times_out_when_peer_never_responds() {
        let (client_t, _server_t) = loopback_pair();
        // server_t is dropped without attaching a server engine, so
        // nothing ever answers.
        let client = Arc::new(PeerEngine::new(client_t, Duration::from_secs(5), server_identity()));
        client.attach();

        let err = client
            .call(methods::PING, None, Duration::from_millis(50))
            .await
            .unwrap_err();
        matches!(err, PeerError::Timeout);
        assert_eq!(client.pending_count(), 0);
    }

    #[tokio::test]
    async fn tool_call_dispatches_to_registered_handler() {
        let (client_t, server_t) = loopback_pair();
        let client = Arc::new(PeerEngine::new(client_t, Duration::from_secs(5), server_identity()));
        let server = Arc::new(PeerEngine::new(server_t, Duration::from_secs(5), server_identity()));
        client.attach();
        server.attach();

        server.register_handler(
            "tools/call",
            Arc::new(|_params, _ctx| Box::pin(async { Ok(serde_json::json!({"ok": true})) })),
        );

        client
            .initialize(client_info(), ClientCapabilities::default())
            .await
            .unwrap();

        let result = client
            .call("tools/call", None, Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(result, serde_json::json!({"ok": true}));
    }

    #[tokio::test]
    async fn list_changed_notification_reaches_handler() {
        let (client_t, server_t) = loopback_pair();
        let client = Arc::new(PeerEngine::new(client_t, Duration::from_secs(5), server_identity()));
        let server = Arc::new(PeerEngine::new(server_t, Duration::from_secs(5), server_identity()));
        client.attach();
        server.attach();

        let seen = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let seen_clone = Arc::clone(&seen);
        client.register_notification_handler(
            methods::TOOLS_LIST_CHANGED,
            Arc::new(move |_params| {
                seen_clone.store(true, std::sync::atomic::Ordering::SeqCst);
            }),
        );

        server.notify(methods::TOOLS_LIST_CHANGED, None).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(seen.load(std::sync::atomic::Ordering::SeqCst));
    }
}
