use std::sync::Arc;

use dashmap::DashMap;
use mcpcore_transport_traits::{TransportError, TransportResult};

use crate::config::HttpSessionConfig;
use crate::session::Session;

/// Owns every live session for one HTTP/SSE listener, keyed by
/// `Mcp-Session-Id`. Expired sessions are garbage-collected lazily, on
/// the next access that names them, rather than by a background sweep
/// task.
#[derive(Debug)]
pub struct SessionTable {
    sessions: DashMap<String, Arc<Session>>,
    config: HttpSessionConfig,
}

impl SessionTable {
    /// Build an empty table governed by `config`.
    pub fn new(config: HttpSessionConfig) -> Self {
        Self {
            sessions: DashMap::new(),
            config,
        }
    }

    /// Create a new session and register it.
    pub fn create(&self) -> Arc<Session> {
        let session = Session::new(self.config.replay_buffer_size);
        self.sessions.insert(session.id().to_string(), Arc::clone(&session));
        session
    }

    /// Look up a session by id, evicting and returning `SessionNotFound`
    /// if it has exceeded the configured idle timeout.
    pub fn get(&self, id: &str) -> TransportResult<Arc<Session>> {
        let Some(entry) = self.sessions.get(id) else {
            return Err(TransportError::SessionNotFound(id.to_string()));
        };
        if entry.idle_for() > self.config.idle_timeout {
            drop(entry);
            self.sessions.remove(id);
            return Err(TransportError::SessionNotFound(id.to_string()));
        }
        Ok(Arc::clone(&entry))
    }

    /// Explicitly remove a session, e.g. on a client-initiated close.
    pub fn remove(&self, id: &str) {
        self.sessions.remove(id);
    }

    /// Number of sessions currently tracked, including any that are
    /// expired but not yet evicted by a [`SessionTable::get`] call.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// `true` if no sessions are tracked.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Evict every session past its idle timeout. Callers may run this
    /// periodically; it is never required for correctness since
    /// [`SessionTable::get`] also evicts lazily.
    pub fn sweep_expired(&self) -> usize {
        let idle_timeout = self.config.idle_timeout;
        let expired: Vec<String> = self
            .sessions
            .iter()
            .filter(|entry| entry.idle_for() > idle_timeout)
            .map(|entry| entry.key().clone())
            .collect();
        for id in &expired {
            self.sessions.remove(id);
        }
        expired.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn create_then_get_round_trips() {
        let table = SessionTable::new(HttpSessionConfig::default());
        let session = table.create();
        let id = session.id().to_string();
        assert!(table.get(&id).is_ok());
    }

    #[test]
    fn get_unknown_id_is_session_not_found() {
        let table = SessionTable::new(HttpSessionConfig::default());
        let err = table.get("does-not-exist").unwrap_err();
        matches!(err, TransportError::SessionNotFound(_));
    }

    #[test]
    fn expired_session_is_evicted_on_get() {
        let config = HttpSessionConfig::builder()
            .idle_timeout(Duration::from_millis(0))
            .build();
        let table = SessionTable::new(config);
        let session = table.create();
        let id = session.id().to_string();
        std::thread::sleep(Duration::from_millis(5));
        assert!(table.get(&id).is_err());
        assert!(table.is_empty());
    }

    #[test]
    fn sweep_expired_removes_stale_sessions() {
        let config = HttpSessionConfig::builder()
            .idle_timeout(Duration::from_millis(0))
            .build();
        let table = SessionTable::new(config);
        table.create();
        table.create();
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(table.sweep_expired(), 2);
        assert!(table.is_empty());
    }
}
