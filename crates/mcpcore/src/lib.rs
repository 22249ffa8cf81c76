//! A session facade: one transport, one peer engine, and the tool/
//! resource/prompt registries wired together.
//!
//! ```ignore
//! let transport = Arc::new(StdioTransport::new(max_message_size));
//! let session = Session::new(transport, SessionConfig::default());
//! session.register_tool(descriptor, handler)?;
//! session.connect().await?;
//! session.initialize(client_info, capabilities).await?;
//! ```
//!
//! This crate re-exports [`mcpcore_stdio::StdioTransport`] and
//! [`mcpcore_http::HttpSseTransport`] so a caller only depends on this
//! one crate to assemble either transport variant.

#![warn(missing_docs, missing_debug_implementations, rust_2018_idioms)]

mod config;
mod session;

pub use config::{SessionConfig, SessionConfigBuilder};
pub use session::Session;

pub use mcpcore_http::HttpSseTransport;
pub use mcpcore_peer::{PeerError, SessionState};
pub use mcpcore_registry::{CompletionHandler, InvocationContext, PromptHandler, ResourceHandler, RegistryError, ToolHandler};
pub use mcpcore_stdio::StdioTransport;
pub use mcpcore_types as types;
