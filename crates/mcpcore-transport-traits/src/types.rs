//! Transport kind, lifecycle state, and capability descriptors.

use std::fmt;

/// Which concrete transport a session is using.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportType {
    /// Newline-delimited JSON over stdin/stdout.
    Stdio,
    /// HTTP POST + Server-Sent-Events session transport.
    HttpSse,
}

impl fmt::Display for TransportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportType::Stdio => write!(f, "stdio"),
            TransportType::HttpSse => write!(f, "http-sse"),
        }
    }
}

/// Lifecycle state of a transport connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportState {
    /// Not yet connected.
    Disconnected,
    /// `connect()` has been called but is not yet complete.
    Connecting,
    /// Open and able to send/receive.
    Connected,
    /// Closed, either by request or because of an error.
    Closed,
}

impl fmt::Display for TransportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TransportState::Disconnected => "disconnected",
            TransportState::Connecting => "connecting",
            TransportState::Connected => "connected",
            TransportState::Closed => "closed",
        };
        write!(f, "{s}")
    }
}

/// What a given transport instance supports, queried before use so callers
/// can fail fast rather than discover a limitation mid-session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportCapabilities {
    /// Whether this transport can carry messages in both directions on one
    /// connection (true for stdio and HTTP/SSE as specified here).
    pub bidirectional: bool,
    /// Whether disconnected clients can resume a stream via a replay
    /// buffer (true only for HTTP/SSE).
    pub resumable: bool,
}

impl TransportCapabilities {
    /// Capabilities of the newline-delimited stdio transport.
    pub const STDIO: Self = Self {
        bidirectional: true,
        resumable: false,
    };

    /// Capabilities of the HTTP/SSE session transport.
    pub const HTTP_SSE: Self = Self {
        bidirectional: true,
        resumable: true,
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_type_display() {
        assert_eq!(TransportType::Stdio.to_string(), "stdio");
        assert_eq!(TransportType::HttpSse.to_string(), "http-sse");
    }

    #[test]
    fn stdio_is_not_resumable() {
        assert!(!TransportCapabilities::STDIO.resumable);
        assert!(TransportCapabilities::HTTP_SSE.resumable);
    }
}
