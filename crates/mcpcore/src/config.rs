//! Session-level configuration: timeouts and the identity advertised
//! during the initialize handshake.

use std::time::Duration;

use mcpcore_types::protocol::{Implementation, ServerCapabilities};

/// Settings a [`crate::Session`] is built from.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Default per-request timeout for outbound calls.
    pub default_request_timeout: Duration,
    /// This side's implementation identity, echoed back during `initialize`.
    pub implementation: Implementation,
    /// This side's capabilities, echoed back during `initialize`. The
    /// registries are always wired regardless of this value; it only
    /// affects what the peer is told to expect.
    pub capabilities: ServerCapabilities,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            default_request_timeout: Duration::from_millis(mcpcore_types::DEFAULT_TIMEOUT_MS),
            implementation: Implementation {
                name: "mcpcore".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            capabilities: ServerCapabilities::default(),
        }
    }
}

impl SessionConfig {
    /// Start building a config from the defaults.
    pub fn builder() -> SessionConfigBuilder {
        SessionConfigBuilder(Self::default())
    }
}

/// Builder for [`SessionConfig`].
#[derive(Debug, Clone)]
pub struct SessionConfigBuilder(SessionConfig);

impl SessionConfigBuilder {
    /// Override the default request timeout.
    #[must_use]
    pub fn default_request_timeout(mut self, timeout: Duration) -> Self {
        self.0.default_request_timeout = timeout;
        self
    }

    /// Override the advertised implementation identity.
    #[must_use]
    pub fn implementation(mut self, implementation: Implementation) -> Self {
        self.0.implementation = implementation;
        self
    }

    /// Override the advertised capabilities.
    #[must_use]
    pub fn capabilities(mut self, capabilities: ServerCapabilities) -> Self {
        self.0.capabilities = capabilities;
        self
    }

    /// Finish building.
    pub fn build(self) -> SessionConfig {
        self.0
    }
}
