//! HTTP POST + Server-Sent-Events session transport.
//!
//! This crate does not run an HTTP server. It models one MCP session's
//! event buffer and replay semantics, and exposes two small adapter
//! traits ([`SseWriter`], [`PostResponder`]) so an embedder can wire it
//! into axum, hyper, or any other stack.

#![warn(missing_docs, missing_debug_implementations, rust_2018_idioms)]

mod config;
mod session;
mod table;
mod transport;
mod writer;

pub use config::{HttpSessionConfig, HttpSessionConfigBuilder};
pub use session::{Session, StoredEvent};
pub use table::SessionTable;
pub use transport::HttpSseTransport;
pub use writer::{PostResponder, SseWriter};
