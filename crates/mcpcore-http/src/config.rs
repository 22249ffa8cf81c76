//! Configuration for HTTP/SSE sessions.

use std::time::Duration;

/// Tunables for the HTTP/SSE transport, shared by every session the
/// owning [`crate::SessionTable`] creates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpSessionConfig {
    /// How long a session may sit idle before it is eligible for expiry.
    pub idle_timeout: Duration,
    /// How many outbound events a session retains for replay after the
    /// client that was streaming them disconnects.
    pub replay_buffer_size: usize,
    /// URL path the embedder mounts both the POST and GET handlers on.
    /// Informational only — this crate does not route HTTP itself.
    pub endpoint_path: String,
}

impl Default for HttpSessionConfig {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::from_millis(mcpcore_types::DEFAULT_SESSION_IDLE_MS),
            replay_buffer_size: 256,
            endpoint_path: "/mcp".to_string(),
        }
    }
}

impl HttpSessionConfig {
    /// Start building a config from the defaults.
    pub fn builder() -> HttpSessionConfigBuilder {
        HttpSessionConfigBuilder(Self::default())
    }
}

/// Builder for [`HttpSessionConfig`].
#[derive(Debug, Clone)]
pub struct HttpSessionConfigBuilder(HttpSessionConfig);

impl HttpSessionConfigBuilder {
    /// Override the idle timeout.
    #[must_use]
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.0.idle_timeout = timeout;
        self
    }

    /// Override the replay buffer size.
    #[must_use]
    pub fn replay_buffer_size(mut self, size: usize) -> Self {
        self.0.replay_buffer_size = size;
        self
    }

    /// Override the endpoint path.
    #[must_use]
    pub fn endpoint_path(mut self, path: impl Into<String>) -> Self {
        self.0.endpoint_path = path.into();
        self
    }

    /// Finish building.
    pub fn build(self) -> HttpSessionConfig {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_idle_timeout_is_thirty_minutes() {
        let cfg = HttpSessionConfig::default();
        assert_eq!(cfg.idle_timeout, Duration::from_secs(30 * 60));
    }

    #[test]
    fn builder_overrides_fields() {
        let cfg = HttpSessionConfig::builder()
            .idle_timeout(Duration::from_secs(60))
            .replay_buffer_size(8)
            .endpoint_path("/api/mcp")
            .build();
        assert_eq!(cfg.idle_timeout, Duration::from_secs(60));
        assert_eq!(cfg.replay_buffer_size, 8);
        assert_eq!(cfg.endpoint_path, "/api/mcp");
    }
}
