use std::fmt;

/// The session lifecycle state machine.
///
/// See [`PeerEngine`](crate::engine::PeerEngine) for the transitions this
/// crate drives it through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No transport activity has started yet.
    Unconnected,
    /// `connect()` has been called; the initialize request has not yet
    /// been sent.
    Connecting,
    /// The initialize request is outstanding, awaiting the peer's reply.
    HandshakingInitializeSent,
    /// The handshake completed and `notifications/initialized` was sent.
    /// Inbound requests other than `initialize`/`ping` are now dispatched.
    Initialized,
    /// The session is torn down; no further activity is possible.
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionState::Unconnected => "unconnected",
            SessionState::Connecting => "connecting",
            SessionState::HandshakingInitializeSent => "handshaking",
            SessionState::Initialized => "initialized",
            SessionState::Closed => "closed",
        };
        write!(f, "{s}")
    }
}

impl SessionState {
    /// Whether an inbound request for `method` should be dispatched given
    /// the current state. `initialize` and `ping` are always answered;
    /// every other method requires [`SessionState::Initialized`].
    pub fn admits(self, method: &str) -> bool {
        matches!(self, SessionState::Initialized)
            || method == mcpcore_types::methods::INITIALIZE
            || method == mcpcore_types::methods::PING
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initialized_admits_any_method() {
        assert!(SessionState::Initialized.admits("tools/call"));
    }

    #[test]
    fn handshaking_only_admits_initialize_and_ping() {
        assert!(SessionState::HandshakingInitializeSent.admits("initialize"));
        assert!(SessionState::HandshakingInitializeSent.admits("ping"));
        assert!(!SessionState::HandshakingInitializeSent.admits("tools/call"));
    }
}
