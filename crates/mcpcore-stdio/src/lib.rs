//! Standard I/O transport: newline-delimited JSON over a duplex stream.

#![warn(missing_docs, missing_debug_implementations, rust_2018_idioms)]

mod transport;

pub use transport::{StdioTransport, StdioTransportFactory};
