//! The resource registry: `resources/list`, `resources/read`,
//! `notifications/resources/list_changed`.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use mcpcore_types::jsonrpc::JsonRpcError;
use mcpcore_types::pagination::{Page, Paginated};
use mcpcore_types::protocol::{ReadResourceResult, ResourceDescriptor};
use parking_lot::Mutex;

use crate::context::{CompletionHandler, InvocationContext};
use crate::error::RegistryError;

const PAGE_SIZE: usize = 50;

/// A resource's read logic, invoked with the URI it was registered under.
#[async_trait::async_trait]
pub trait ResourceHandler: Send + Sync {
    /// Produce the resource's current contents.
    async fn read(&self, uri: &str, ctx: InvocationContext) -> Result<ReadResourceResult, JsonRpcError>;
}

#[async_trait::async_trait]
impl<F, Fut> ResourceHandler for F
where
    F: Fn(String, InvocationContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<ReadResourceResult, JsonRpcError>> + Send,
{
    async fn read(&self, uri: &str, ctx: InvocationContext) -> Result<ReadResourceResult, JsonRpcError> {
        (self)(uri.to_string(), ctx).await
    }
}

struct ResourceEntry {
    descriptor: ResourceDescriptor,
    handler: Arc<dyn ResourceHandler>,
    completion: Option<Arc<dyn CompletionHandler>>,
}

#[derive(Default)]
struct Inner {
    order: Vec<String>,
    entries: HashMap<String, ResourceEntry>,
}

/// Registered resources, keyed by URI.
pub struct ResourceRegistry {
    inner: Mutex<Inner>,
    on_list_changed: Mutex<Option<Arc<dyn Fn() + Send + Sync>>>,
}

impl std::fmt::Debug for ResourceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceRegistry")
            .field("len", &self.inner.lock().order.len())
            .finish()
    }
}

impl Default for ResourceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceRegistry {
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

    /// Register a resource under its URI. Registering an existing URI
    /// replaces it in place.
    pub fn register(&self, descriptor: ResourceDescriptor, handler: Arc<dyn ResourceHandler>) {
        let uri = descriptor.uri.clone();
        let entry = ResourceEntry {
            descriptor,
            handler,
            completion: None,
        };
        {
            let mut inner = self.inner.lock();
            if !inner.entries.contains_key(&uri) {
                inner.order.push(uri.clone());
            }
            inner.entries.insert(uri, entry);
        }
        self.notify_list_changed();
    }

    /// Attach a completion handler (e.g. for templated URI arguments) to
    /// an already-registered resource.
    pub fn set_completion(&self, uri: &str, handler: Arc<dyn CompletionHandler>) -> Result<(), RegistryError> {
        let mut inner = self.inner.lock();
        let entry = inner.entries.get_mut(uri).ok_or_else(|| RegistryError::NotFound(uri.to_string()))?;
        entry.completion = Some(handler);
        Ok(())
    }

    /// Remove a resource. Returns whether it was present.
    pub fn unregister(&self, uri: &str) -> bool {
        let removed = {
            let mut inner = self.inner.lock();
            let removed = inner.entries.remove(uri).is_some();
            if removed {
                inner.order.retain(|u| u != uri);
            }
            removed
        };
        if removed {
            self.notify_list_changed();
        }
        removed
    }

    /// Read a resource's current contents.
    pub async fn read(&self, uri: &str, ctx: InvocationContext) -> Result<ReadResourceResult, JsonRpcError> {
        let handler = {
            let inner = self.inner.lock();
            inner.entries.get(uri).map(|e| Arc::clone(&e.handler))
        };
        let Some(handler) = handler else {
            return Err(JsonRpcError::invalid_params(format!("unknown resource: {uri}")));
        };
        handler.read(uri, ctx).await
    }

    /// Completion suggestions for a templated resource argument.
    pub async fn complete(&self, uri: &str, argument: &str, partial: &str) -> Result<Vec<String>, RegistryError> {
        let completion = {
            let inner = self.inner.lock();
            let entry = inner.entries.get(uri).ok_or_else(|| RegistryError::NotFound(uri.to_string()))?;
            entry.completion.clone()
        };
        match completion {
            Some(handler) => Ok(handler.complete(argument, partial).await),
            None => Ok(Vec::new()),
        }
    }

    /// Number of registered resources.
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

impl Paginated for ResourceRegistry {
    type Item = ResourceDescriptor;

    fn list(&self, cursor: Option<&str>) -> Page<ResourceDescriptor> {
        let inner = self.inner.lock();
        let start = cursor.and_then(|c| c.parse::<usize>().ok()).unwrap_or(0);
        let end = (start + PAGE_SIZE).min(inner.order.len());
        let items = inner.order[start..end]
            .iter()
            .filter_map(|u| inner.entries.get(u))
            .map(|e| e.descriptor.clone())
            .collect();
        let next_cursor = if end < inner.order.len() { Some(end.to_string()) } else { None };
        Page { items, next_cursor }
    }
}
