//! Tool, resource, and prompt registries: name/URI-keyed stores with
//! schema-validated invocation, cursor pagination, and list-changed hooks.
//!
//! Each registry is independent and has no knowledge of the peer engine
//! or any transport; the facade crate wires their `set_on_list_changed`
//! hooks to outbound notifications and dispatches inbound requests into
//! their `call`/`read`/`get` methods.

#![warn(missing_docs, missing_debug_implementations, rust_2018_idioms)]

mod context;
mod error;
mod prompt;
mod resource;
mod tool;

pub use context::{CompletionHandler, InvocationContext, ProgressEmitter};
pub use error::RegistryError;
pub use prompt::{PromptHandler, PromptRegistry};
pub use resource::{ResourceHandler, ResourceRegistry};
pub use tool::{ToolHandler, ToolRegistry};
