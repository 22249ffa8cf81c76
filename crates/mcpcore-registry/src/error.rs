use thiserror::Error;

/// Errors raised by registration or lookup, independent of any particular
/// invocation's outcome (invocation failures are reported as
/// [`mcpcore_types::jsonrpc::JsonRpcError`] instead, since they cross the
/// wire as-is).
#[derive(Error, Debug, Clone)]
#[non_exhaustive]
pub enum RegistryError {
    /// A declared input or output schema failed to compile.
    #[error("schema for '{name}' failed to compile: {reason}")]
    SchemaCompile {
        /// The entry's name.
        name: String,
        /// The compiler's error message.
        reason: String,
    },

    /// No entry exists under this name or URI.
    #[error("no entry named '{0}'")]
    NotFound(String),
}
