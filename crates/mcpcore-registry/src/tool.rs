//! The tool registry: `tools/list`, `tools/call`, `notifications/tools/list_changed`.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use jsonschema::Validator;
use mcpcore_types::jsonrpc::JsonRpcError;
use mcpcore_types::pagination::{Page, Paginated};
use mcpcore_types::protocol::{CallToolResult, ToolDescriptor};
use parking_lot::Mutex;
use serde_json::Value;

use crate::context::{CompletionHandler, InvocationContext};
use crate::error::RegistryError;

const PAGE_SIZE: usize = 50;

/// A tool's business logic, invoked once its arguments have passed
/// input-schema validation.
#[async_trait::async_trait]
pub trait ToolHandler: Send + Sync {
    /// Run the tool. Returning `Err` produces a JSON-RPC error response;
    /// a tool-level failure that should still reach the caller as a
    /// normal result belongs in [`CallToolResult::error`] instead.
    async fn call(&self, arguments: Value, ctx: InvocationContext) -> Result<CallToolResult, JsonRpcError>;
}

#[async_trait::async_trait]
impl<F, Fut> ToolHandler for F
where
    F: Fn(Value, InvocationContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<CallToolResult, JsonRpcError>> + Send,
{
    async fn call(&self, arguments: Value, ctx: InvocationContext) -> Result<CallToolResult, JsonRpcError> {
        (self)(arguments, ctx).await
    }
}

struct ToolEntry {
    descriptor: ToolDescriptor,
    input_validator: Validator,
    output_validator: Option<Validator>,
    handler: Arc<dyn ToolHandler>,
    completion: Option<Arc<dyn CompletionHandler>>,
}

#[derive(Default)]
struct Inner {
    order: Vec<String>,
    entries: HashMap<String, Arc<ToolEntry>>,
}

/// Registered tools, keyed by name, each with a JSON-Schema compiled once
/// at registration time.
pub struct ToolRegistry {
    inner: Mutex<Inner>,
    on_list_changed: Mutex<Option<Arc<dyn Fn() + Send + Sync>>>,
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("len", &self.inner.lock().order.len())
            .finish()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            on_list_changed: Mutex::new(None),
        }
    }

    /// Set the hook invoked after every registration change. The facade
    /// wires this to emit `notifications/tools/list_changed`.
    pub fn set_on_list_changed(&self, hook: Arc<dyn Fn() + Send + Sync>) {
        *self.on_list_changed.lock() = Some(hook);
    }

    /// Register a tool, compiling its input (and output, if declared)
    /// schema. Registering a name that already exists replaces it in
    /// place, preserving its position in `tools/list` ordering.
    pub fn register(&self, descriptor: ToolDescriptor, handler: Arc<dyn ToolHandler>) -> Result<(), RegistryError> {
        let input_validator = jsonschema::validator_for(&descriptor.input_schema).map_err(|e| RegistryError::SchemaCompile {
            name: descriptor.name.clone(),
            reason: e.to_string(),
        })?;
        let output_validator = match &descriptor.output_schema {
            Some(schema) => Some(jsonschema::validator_for(schema).map_err(|e| RegistryError::SchemaCompile {
                name: descriptor.name.clone(),
                reason: e.to_string(),
            })?),
            None => None,
        };

        let name = descriptor.name.clone();
        let entry = Arc::new(ToolEntry {
            descriptor,
            input_validator,
            output_validator,
            handler,
            completion: None,
        });

        {
            let mut inner = self.inner.lock();
            if !inner.entries.contains_key(&name) {
                inner.order.push(name.clone());
            }
            inner.entries.insert(name, entry);
        }
        self.notify_list_changed();
        Ok(())
    }

    /// Attach a completion handler to an already-registered tool.
    pub fn set_completion(&self, name: &str, handler: Arc<dyn CompletionHandler>) -> Result<(), RegistryError> {
        let mut inner = self.inner.lock();
        let entry = inner.entries.get_mut(name).ok_or_else(|| RegistryError::NotFound(name.to_string()))?;
        *entry = Arc::new(ToolEntry {
            descriptor: entry.descriptor.clone(),
            input_validator: jsonschema::validator_for(&entry.descriptor.input_schema).expect("schema already compiled once"),
            output_validator: entry
                .descriptor
                .output_schema
                .as_ref()
                .map(|s| jsonschema::validator_for(s).expect("schema already compiled once")),
            handler: Arc::clone(&entry.handler),
            completion: Some(handler),
        });
        Ok(())
    }

    /// Remove a tool. Returns whether it was present.
    pub fn unregister(&self, name: &str) -> bool {
        let removed = {
            let mut inner = self.inner.lock();
            let removed = inner.entries.remove(name).is_some();
            if removed {
                inner.order.retain(|n| n != name);
            }
            removed
        };
        if removed {
            self.notify_list_changed();
        }
        removed
    }

    /// Validate `arguments` and invoke the named tool's handler.
    pub async fn call(&self, name: &str, arguments: Value, ctx: InvocationContext) -> Result<CallToolResult, JsonRpcError> {
        let entry = {
            let inner = self.inner.lock();
            inner.entries.get(name).cloned()
        };
        let Some(entry) = entry else {
            return Err(JsonRpcError::invalid_params(format!("unknown tool: {name}")));
        };

        if let Err(reason) = validate(&entry.input_validator, &arguments) {
            return Err(JsonRpcError::invalid_params(format!("tool '{name}' rejected its arguments: {reason}")));
        }

        let result = entry.handler.call(arguments, ctx).await?;

        if let Some(output_validator) = &entry.output_validator {
            let value = serde_json::to_value(&result).map_err(|e| JsonRpcError::internal_error(e.to_string()))?;
            if let Err(reason) = validate(output_validator, &value) {
                return Err(JsonRpcError::internal_error(format!(
                    "tool '{name}' produced a result that fails its declared output schema: {reason}"
                )));
            }
        }

        Ok(result)
    }

    /// Completion suggestions for `argument`, if the tool declared a
    /// completion handler.
    pub async fn complete(&self, name: &str, argument: &str, partial: &str) -> Result<Vec<String>, RegistryError> {
        let entry = {
            let inner = self.inner.lock();
            inner.entries.get(name).cloned()
        };
        let entry = entry.ok_or_else(|| RegistryError::NotFound(name.to_string()))?;
        match &entry.completion {
            Some(handler) => Ok(handler.complete(argument, partial).await),
            None => Ok(Vec::new()),
        }
    }

    /// Number of registered tools.
    pub fn len(&self) -> usize {
        self.inner.lock().order.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn notify_list_changed(&self) {
        if let Some(hook) = self.on_list_changed.lock().clone() {
            hook();
        }
    }
}

fn validate(validator: &Validator, instance: &Value) -> Result<(), String> {
    let errors: Vec<String> = validator.iter_errors(instance).map(|e| format!("{}: {e}", e.instance_path)).collect();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors.join("; "))
    }
}

impl Paginated for ToolRegistry {
    type Item = ToolDescriptor;

    fn list(&self, cursor: Option<&str>) -> Page<ToolDescriptor> {
        let inner = self.inner.lock();
        let start = cursor.and_then(|c| c.parse::<usize>().ok()).unwrap_or(0);
        let end = (start + PAGE_SIZE).min(inner.order.len());
        let items = inner.order[start..end]
            .iter()
            .filter_map(|n| inner.entries.get(n))
            .map(|e| e.descriptor.clone())
            .collect();
        let next_cursor = if end < inner.order.len() { Some(end.to_string()) } else { None };
        Page { items, next_cursor }
    }
}
