//! The prompt registry: `prompts/list`, `prompts/get`,
//! `notifications/prompts/list_changed`.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use mcpcore_types::jsonrpc::JsonRpcError;
use mcpcore_types::pagination::{Page, Paginated};
use mcpcore_types::protocol::{GetPromptResult, PromptDescriptor};
use parking_lot::Mutex;

use crate::context::{CompletionHandler, InvocationContext};
use crate::error::RegistryError;

const PAGE_SIZE: usize = 50;

/// A prompt's rendering logic. `arguments` has already passed required-
/// argument validation against the prompt's declared [`PromptDescriptor`].
#[async_trait::async_trait]
pub trait PromptHandler: Send + Sync {
    /// Render the prompt into its message sequence.
    async fn get(&self, arguments: HashMap<String, String>, ctx: InvocationContext) -> Result<GetPromptResult, JsonRpcError>;
}

#[async_trait::async_trait]
impl<F, Fut> PromptHandler for F
where
    F: Fn(HashMap<String, String>, InvocationContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<GetPromptResult, JsonRpcError>> + Send,
{
    async fn get(&self, arguments: HashMap<String, String>, ctx: InvocationContext) -> Result<GetPromptResult, JsonRpcError> {
        (self)(arguments, ctx).await
    }
}

struct PromptEntry {
    descriptor: PromptDescriptor,
    handler: Arc<dyn PromptHandler>,
    completion: Option<Arc<dyn CompletionHandler>>,
}

#[derive(Default)]
struct Inner {
    order: Vec<String>,
    entries: HashMap<String, PromptEntry>,
}

/// Registered prompts, keyed by name.
pub struct PromptRegistry {
    inner: Mutex<Inner>,
    on_list_changed: Mutex<Option<Arc<dyn Fn() + Send + Sync>>>,
}

impl std::fmt::Debug for PromptRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PromptRegistry")
            .field("len", &self.inner.lock().order.len())
            .finish()
    }
}

impl Default for PromptRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl PromptRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            on_list_changed: Mutex::new(None),
        }
    }

    /// Set the hook invoked after every registration change.
    pub fn set_on_list_changed(&self, hook: Arc<dyn Fn() + Send + Sync>) {
        *self.on_list_changed.lock() = Some(hook);
    }

    /// Register a prompt. Registering an existing name replaces it in place.
    pub fn register(&self, descriptor: PromptDescriptor, handler: Arc<dyn PromptHandler>) {
        let name = descriptor.name.clone();
        let entry = PromptEntry {
            descriptor,
            handler,
            completion: None,
        };
        {
            let mut inner = self.inner.lock();
            if !inner.entries.contains_key(&name) {
                inner.order.push(name.clone());
            }
            inner.entries.insert(name, entry);
        }
        self.notify_list_changed();
    }

    /// Attach a completion handler for one of the prompt's arguments.
    pub fn set_completion(&self, name: &str, handler: Arc<dyn CompletionHandler>) -> Result<(), RegistryError> {
        let mut inner = self.inner.lock();
        let entry = inner.entries.get_mut(name).ok_or_else(|| RegistryError::NotFound(name.to_string()))?;
        entry.completion = Some(handler);
        Ok(())
    }

    /// Remove a prompt. Returns whether it was present.
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

    /// Validate that every required argument is present, then render the
    /// prompt.
    pub async fn get(&self, name: &str, arguments: HashMap<String, String>, ctx: InvocationContext) -> Result<GetPromptResult, JsonRpcError> {
        let (descriptor, handler) = {
            let inner = self.inner.lock();
            match inner.entries.get(name) {
                Some(entry) => (entry.descriptor.clone(), Arc::clone(&entry.handler)),
                None => return Err(JsonRpcError::invalid_params(format!("unknown prompt: {name}"))),
            }
        };

        for argument in &descriptor.arguments {
            if argument.required && !arguments.contains_key(&argument.name) {
                return Err(JsonRpcError::invalid_params(format!(
                    "prompt '{name}' requires argument '{}'",
                    argument.name
                )));
            }
        }

        handler.get(arguments, ctx).await
    }

    /// Completion suggestions for one of the prompt's arguments.
    pub async fn complete(&self, name: &str, argument: &str, partial: &str) -> Result<Vec<String>, RegistryError> {
        let completion = {
            let inner = self.inner.lock();
            let entry = inner.entries.get(name).ok_or_else(|| RegistryError::NotFound(name.to_string()))?;
            entry.completion.clone()
        };
        match completion {
            Some(handler) => Ok(handler.complete(argument, partial).await),
            None => Ok(Vec::new()),
        }
    }

    /// Number of registered prompts.
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

impl Paginated for PromptRegistry {
    type Item = PromptDescriptor;

    fn list(&self, cursor: Option<&str>) -> Page<PromptDescriptor> {
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

#[cfg(test)]
mod tests {
    use super::*;
    use mcpcore_types::protocol::{ContentBlock, PromptArgument, PromptMessage, Role};
    use pretty_assertions::assert_eq;

    fn greeting_descriptor() -> PromptDescriptor {
        PromptDescriptor {
            name: "greeting".to_string(),
            description: None,
            arguments: vec![PromptArgument {
                name: "name".to_string(),
                description: None,
                required: true,
            }],
        }
    }

    fn greeting_handler() -> Arc<dyn PromptHandler> {
        Arc::new(|args: HashMap<String, String>, _ctx: InvocationContext| async move {
            let name = args.get("name").cloned().unwrap_or_default();
            Ok(GetPromptResult {
                description: None,
                messages: vec![PromptMessage {
                    role: Role::User,
                    content: ContentBlock::Text {
                        text: format!("Hello, {name}!"),
                    },
                }],
            })
        })
    }

    #[tokio::test]
    async fn get_rejects_missing_required_argument() {
        let registry = PromptRegistry::new();
        registry.register(greeting_descriptor(), greeting_handler());

        let err = registry.get("greeting", HashMap::new(), InvocationContext::new()).await.unwrap_err();
        assert_eq!(err.code, mcpcore_types::error_codes::INVALID_PARAMS);
    }

    #[tokio::test]
    async fn get_renders_with_supplied_argument() {
        let registry = PromptRegistry::new();
        registry.register(greeting_descriptor(), greeting_handler());

        let mut args = HashMap::new();
        args.insert("name".to_string(), "Ada".to_string());
        let result = registry.get("greeting", args, InvocationContext::new()).await.unwrap();
        match &result.messages[0].content {
            ContentBlock::Text { text } => assert_eq!(text, "Hello, Ada!"),
            other => panic!("unexpected content: {other:?}"),
        }
    }

    #[tokio::test]
    async fn unregister_then_get_is_invalid_params() {
        let registry = PromptRegistry::new();
        registry.register(greeting_descriptor(), greeting_handler());
        assert!(registry.unregister("greeting"));

        let err = registry.get("greeting", HashMap::new(), InvocationContext::new()).await.unwrap_err();
        assert_eq!(err.code, mcpcore_types::error_codes::INVALID_PARAMS);
    }
}
