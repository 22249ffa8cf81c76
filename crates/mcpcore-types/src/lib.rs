//! Core JSON-RPC 2.0 message model and MCP protocol types.
//!
//! This crate has no knowledge of transports, reactors, or registries. It
//! exists so every other crate in the workspace agrees on one in-memory
//! shape for a message and one set of protocol record types.
//!
//! ## Module Organization
//!
//! - [`jsonrpc`]: request/response/notification/error types and framing helpers
//! - [`protocol`]: tool/resource/prompt record shapes and capability negotiation types
//! - [`pagination`]: the opaque-cursor contract shared by every paginated list

#![warn(missing_docs, missing_debug_implementations, rust_2018_idioms)]

pub mod jsonrpc;
pub mod pagination;
pub mod protocol;

pub use jsonrpc::{
    JsonRpcError, JsonRpcErrorCode, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse,
    JsonRpcVersion, Message, RequestId, JSONRPC_VERSION,
};
pub use pagination::{Page, Paginated};

/// Protocol version implemented by this crate's default configuration.
pub const PROTOCOL_VERSION: &str = "2025-06-18";

/// Supported protocol versions, newest first. The first entry is the
/// default a fresh session advertises during the initialize handshake.
pub const SUPPORTED_VERSIONS: &[&str] = &["2025-06-18", "2025-03-26", "2024-11-05"];

/// Maximum message size accepted by any transport in this workspace, in bytes.
pub const MAX_MESSAGE_SIZE: usize = 1024 * 1024;

/// Default request timeout, in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Default idle timeout for an HTTP/SSE session, in milliseconds.
pub const DEFAULT_SESSION_IDLE_MS: u64 = 30 * 60 * 1000;

/// Well-known method names used by the peer engine's built-in fast path.
pub mod methods {
    /// Initialize handshake request.
    pub const INITIALIZE: &str = "initialize";
    /// Sent by the client once initialize succeeds.
    pub const INITIALIZED: &str = "notifications/initialized";
    /// Liveness check, answered regardless of handshake state.
    pub const PING: &str = "ping";
    /// Cancellation of a previously sent request.
    pub const CANCELLED: &str = "notifications/cancelled";
    /// Progress update for a long-running request.
    pub const PROGRESS: &str = "notifications/progress";
    /// Tool list changed.
    pub const TOOLS_LIST_CHANGED: &str = "notifications/tools/list_changed";
    /// Resource list changed.
    pub const RESOURCES_LIST_CHANGED: &str = "notifications/resources/list_changed";
    /// Prompt list changed.
    pub const PROMPTS_LIST_CHANGED: &str = "notifications/prompts/list_changed";
    /// List registered tools.
    pub const TOOLS_LIST: &str = "tools/list";
    /// Invoke a tool.
    pub const TOOLS_CALL: &str = "tools/call";
    /// List registered resources.
    pub const RESOURCES_LIST: &str = "resources/list";
    /// Read a resource.
    pub const RESOURCES_READ: &str = "resources/read";
    /// List registered prompts.
    pub const PROMPTS_LIST: &str = "prompts/list";
    /// Fetch a prompt.
    pub const PROMPTS_GET: &str = "prompts/get";
    /// Completion suggestions for a partial argument value.
    pub const COMPLETION_COMPLETE: &str = "completion/complete";
}

/// JSON-RPC and MCP error codes.
pub mod error_codes {
    /// Invalid JSON was received by the server.
    pub const PARSE_ERROR: i32 = -32700;
    /// The JSON sent is not a valid request object.
    pub const INVALID_REQUEST: i32 = -32600;
    /// The method does not exist or is not available.
    pub const METHOD_NOT_FOUND: i32 = -32601;
    /// Invalid method parameter(s).
    pub const INVALID_PARAMS: i32 = -32602;
    /// Internal JSON-RPC error.
    pub const INTERNAL_ERROR: i32 = -32603;
    /// No session exists for the supplied session id.
    pub const SESSION_NOT_FOUND: i32 = -32001;
    /// The request timed out waiting for a response.
    pub const REQUEST_TIMEOUT: i32 = -32002;
    /// The request was cancelled before it completed.
    pub const REQUEST_CANCELLED: i32 = -32003;
    /// The session has not completed the initialize handshake yet.
    pub const NOT_INITIALIZED: i32 = -32004;
}
