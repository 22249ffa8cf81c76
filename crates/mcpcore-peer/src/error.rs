use thiserror::Error;

/// Errors surfaced to a caller of the peer engine.
#[derive(Error, Debug, Clone)]
#[non_exhaustive]
pub enum PeerError {
    /// The transport reported a failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// The peer replied with a JSON-RPC error.
    #[error("peer returned error {code}: {message}")]
    Remote {
        /// The JSON-RPC error code.
        code: i32,
        /// The error message.
        message: String,
    },

    /// The deadline elapsed with no response.
    #[error("request timed out")]
    Timeout,

    /// The request was cancelled before it completed.
    #[error("request was cancelled")]
    Cancelled,

    /// The session was closed while this request was outstanding.
    #[error("session closed")]
    TransportClosed,

    /// The peer selected a protocol version this side does not support.
    #[error("protocol version mismatch: peer selected {selected}, supported versions are {supported:?}")]
    ProtocolVersionMismatch {
        /// The version string the peer returned.
        selected: String,
        /// This side's supported version list.
        supported: Vec<&'static str>,
    },

    /// A call was attempted before the session completed its handshake.
    #[error("session is not initialized yet (state: {0})")]
    NotInitialized(String),

    /// The response channel was dropped without completing, which only
    /// happens if the engine itself is torn down mid-call.
    #[error("engine shut down before the request completed")]
    EngineShutdown,
}
