//! Shared transport configuration.

use std::time::Duration;

/// Size and timing limits applied uniformly across transports.
///
/// No field here is read from the environment (see the crate's ambient
/// configuration policy); callers build this explicitly or via
/// [`TransportConfig::default`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    /// Maximum accepted size, in bytes, of a single inbound frame.
    pub max_message_size: usize,
    /// Default per-request timeout applied by the peer engine, not the
    /// transport itself — carried here so a single config object can be
    /// threaded through session construction.
    pub default_request_timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            max_message_size: mcpcore_types::MAX_MESSAGE_SIZE,
            default_request_timeout: Duration::from_millis(mcpcore_types::DEFAULT_TIMEOUT_MS),
        }
    }
}

impl TransportConfig {
    /// Start building a config from the defaults.
    pub fn builder() -> TransportConfigBuilder {
        TransportConfigBuilder(Self::default())
    }
}

/// Builder for [`TransportConfig`].
#[derive(Debug, Clone)]
pub struct TransportConfigBuilder(TransportConfig);

impl TransportConfigBuilder {
    /// Override the maximum message size.
    #[must_use]
    pub fn max_message_size(mut self, bytes: usize) -> Self {
        self.0.max_message_size = bytes;
        self
    }

    /// Override the default request timeout.
    #[must_use]
    pub fn default_request_timeout(mut self, timeout: Duration) -> Self {
        self.0.default_request_timeout = timeout;
        self
    }

    /// Finish building.
    pub fn build(self) -> TransportConfig {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_crate_constants() {
        let cfg = TransportConfig::default();
        assert_eq!(cfg.max_message_size, mcpcore_types::MAX_MESSAGE_SIZE);
    }

    #[test]
    fn builder_overrides_fields() {
        let cfg = TransportConfig::builder()
            .max_message_size(4096)
            .default_request_timeout(Duration::from_secs(5))
            .build();
        assert_eq!(cfg.max_message_size, 4096);
        assert_eq!(cfg.default_request_timeout, Duration::from_secs(5));
    }
}
