//! [`Session`]: one transport, one peer engine, and the three registries,
//! wired together so registered tools/resources/prompts answer inbound
//! requests and their change hooks become outbound notifications.

use std::sync::Arc;
use std::time::Duration;

use mcpcore_peer::{PeerEngine, PeerError, RequestContext, ServerIdentity, SessionState};
use mcpcore_registry::{
    CompletionHandler, InvocationContext, ProgressEmitter, PromptHandler, PromptRegistry, RegistryError, ResourceHandler,
    ResourceRegistry, ToolHandler, ToolRegistry,
};
use mcpcore_transport_traits::Transport;
use mcpcore_types::jsonrpc::JsonRpcError;
use mcpcore_types::protocol::{
    ClientCapabilities, GetPromptResult, Implementation, InitializeResult, PromptDescriptor, ReadResourceResult,
    ResourceDescriptor, ToolDescriptor,
};
use mcpcore_types::{methods, Paginated, PROTOCOL_VERSION};
use serde_json::Value;

use crate::config::SessionConfig;

/// Binds a single [`Transport`] to a [`PeerEngine`] and the tool/resource/
/// prompt registries. Constructing a session wires every registry
/// operation as an inbound handler and every registry's list-changed
/// hook as an outbound notification; callers only need to register
/// entries and drive the handshake.
pub struct Session {
    peer: Arc<PeerEngine>,
    tools: Arc<ToolRegistry>,
    resources: Arc<ResourceRegistry>,
    prompts: Arc<PromptRegistry>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("state", &self.peer.state())
            .field("tools", &self.tools.len())
            .field("resources", &self.resources.len())
            .field("prompts", &self.prompts.len())
            .finish()
    }
}

impl Session {
    /// Build a session over `transport` using `config`.
    pub fn new(transport: Arc<dyn Transport>, config: SessionConfig) -> Arc<Self> {
        let identity = ServerIdentity {
            info: config.implementation,
            capabilities: config.capabilities,
        };
        let peer = Arc::new(PeerEngine::new(transport, config.default_request_timeout, identity));

        let session = Arc::new(Self {
            peer,
            tools: Arc::new(ToolRegistry::new()),
            resources: Arc::new(ResourceRegistry::new()),
            prompts: Arc::new(PromptRegistry::new()),
        });

        session.wire_handlers();
        session.wire_list_changed_hooks();
        session.peer.attach();
        session
    }

    /// Connect the underlying transport.
    pub async fn connect(&self) -> Result<(), PeerError> {
        self.peer.connect().await
    }

    /// Perform the client side of the initialize handshake.
    pub async fn initialize(&self, client_info: Implementation, capabilities: ClientCapabilities) -> Result<InitializeResult, PeerError> {
        self.peer.initialize(client_info, capabilities).await
    }

    /// Send an outbound request and await its response.
    pub async fn call(&self, method: &str, params: Option<Value>, timeout: Duration) -> Result<Value, PeerError> {
        self.peer.call(method, params, timeout).await
    }

    /// Fire-and-forget an outbound notification.
    pub async fn notify(&self, method: &str, params: Option<Value>) -> Result<(), PeerError> {
        self.peer.notify(method, params).await
    }

    /// Cancel a local outbound request.
    pub async fn cancel(&self, id: mcpcore_types::jsonrpc::RequestId, reason: Option<String>) -> Result<(), PeerError> {
        self.peer.cancel(id, reason).await
    }

    /// Tear the session down.
    pub async fn close(&self) {
        self.peer.close().await
    }

    /// Current handshake state.
    pub fn state(&self) -> SessionState {
        self.peer.state()
    }

    /// The protocol version negotiated during `initialize`.
    pub fn negotiated_version(&self) -> Option<String> {
        self.peer.negotiated_version()
    }

    /// Register a tool. Fails if its input or output schema does not
    /// compile.
    pub fn register_tool(&self, descriptor: ToolDescriptor, handler: Arc<dyn ToolHandler>) -> Result<(), RegistryError> {
        self.tools.register(descriptor, handler)
    }

    /// Attach a completion handler to a registered tool.
    pub fn set_tool_completion(&self, name: &str, handler: Arc<dyn CompletionHandler>) -> Result<(), RegistryError> {
        self.tools.set_completion(name, handler)
    }

    /// Register a resource.
    pub fn register_resource(&self, descriptor: ResourceDescriptor, handler: Arc<dyn ResourceHandler>) {
        self.resources.register(descriptor, handler);
    }

    /// Attach a completion handler to a registered resource.
    pub fn set_resource_completion(&self, uri: &str, handler: Arc<dyn CompletionHandler>) -> Result<(), RegistryError> {
        self.resources.set_completion(uri, handler)
    }

    /// Register a prompt.
    pub fn register_prompt(&self, descriptor: PromptDescriptor, handler: Arc<dyn PromptHandler>) {
        self.prompts.register(descriptor, handler);
    }

    /// Attach a completion handler to one of a registered prompt's arguments.
    pub fn set_prompt_completion(&self, name: &str, handler: Arc<dyn CompletionHandler>) -> Result<(), RegistryError> {
        self.prompts.set_completion(name, handler)
    }

    /// The tool registry, for direct inspection (e.g. `collect_all`).
    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// The resource registry, for direct inspection.
    pub fn resources(&self) -> &ResourceRegistry {
        &self.resources
    }

    /// The prompt registry, for direct inspection.
    pub fn prompts(&self) -> &PromptRegistry {
        &self.prompts
    }

    fn wire_handlers(self: &Arc<Self>) {
        let tools = Arc::clone(&self.tools);
        self.peer.register_handler(
            methods::TOOLS_LIST,
            Arc::new(move |params, _ctx| {
                let tools = Arc::clone(&tools);
                Box::pin(async move { Ok(list_page_value("tools", tools.list(cursor_of(&params)))) })
            }),
        );

        let tools = Arc::clone(&self.tools);
        self.peer.register_handler(
            methods::TOOLS_CALL,
            Arc::new(move |params, ctx| {
                let tools = Arc::clone(&tools);
                Box::pin(async move {
                    let (name, arguments) = name_and_arguments(&params)?;
                    let invocation_ctx = InvocationContext::with_progress(forward_progress(&ctx));
                    let result = tools.call(&name, arguments, invocation_ctx).await?;
                    to_value(result)
                })
            }),
        );

        let resources = Arc::clone(&self.resources);
        self.peer.register_handler(
            methods::RESOURCES_LIST,
            Arc::new(move |params, _ctx| {
                let resources = Arc::clone(&resources);
                Box::pin(async move { Ok(list_page_value("resources", resources.list(cursor_of(&params)))) })
            }),
        );

        let resources = Arc::clone(&self.resources);
        self.peer.register_handler(
            methods::RESOURCES_READ,
            Arc::new(move |params, ctx| {
                let resources = Arc::clone(&resources);
                Box::pin(async move {
                    let uri = params
                        .as_ref()
                        .and_then(|p| p.get("uri"))
                        .and_then(Value::as_str)
                        .ok_or_else(|| JsonRpcError::invalid_params("resources/read requires a 'uri'"))?
                        .to_string();
                    let invocation_ctx = InvocationContext::with_progress(forward_progress(&ctx));
                    let result: ReadResourceResult = resources.read(&uri, invocation_ctx).await?;
                    to_value(result)
                })
            }),
        );

        let prompts = Arc::clone(&self.prompts);
        self.peer.register_handler(
            methods::PROMPTS_LIST,
            Arc::new(move |params, _ctx| {
                let prompts = Arc::clone(&prompts);
                Box::pin(async move { Ok(list_page_value("prompts", prompts.list(cursor_of(&params)))) })
            }),
        );

        let prompts = Arc::clone(&self.prompts);
        self.peer.register_handler(
            methods::PROMPTS_GET,
            Arc::new(move |params, ctx| {
                let prompts = Arc::clone(&prompts);
                Box::pin(async move {
                    let name = params
                        .as_ref()
                        .and_then(|p| p.get("name"))
                        .and_then(Value::as_str)
                        .ok_or_else(|| JsonRpcError::invalid_params("prompts/get requires a 'name'"))?
                        .to_string();
                    let arguments = params
                        .as_ref()
                        .and_then(|p| p.get("arguments"))
                        .and_then(|v| serde_json::from_value(v.clone()).ok())
                        .unwrap_or_default();
                    let invocation_ctx = InvocationContext::with_progress(forward_progress(&ctx));
                    let result: GetPromptResult = prompts.get(&name, arguments, invocation_ctx).await?;
                    to_value(result)
                })
            }),
        );

        let tools = Arc::clone(&self.tools);
        let resources = Arc::clone(&self.resources);
        let prompts = Arc::clone(&self.prompts);
        self.peer.register_handler(
            methods::COMPLETION_COMPLETE,
            Arc::new(move |params, _ctx| {
                let tools = Arc::clone(&tools);
                let resources = Arc::clone(&resources);
                let prompts = Arc::clone(&prompts);
                Box::pin(async move { complete(&tools, &resources, &prompts, params).await })
            }),
        );
    }

    fn wire_list_changed_hooks(self: &Arc<Self>) {
        let peer = Arc::clone(&self.peer);
        self.tools.set_on_list_changed(Arc::new(move || spawn_notify(Arc::clone(&peer), methods::TOOLS_LIST_CHANGED)));

        let peer = Arc::clone(&self.peer);
        self.resources
            .set_on_list_changed(Arc::new(move || spawn_notify(Arc::clone(&peer), methods::RESOURCES_LIST_CHANGED)));

        let peer = Arc::clone(&self.peer);
        self.prompts
            .set_on_list_changed(Arc::new(move || spawn_notify(Arc::clone(&peer), methods::PROMPTS_LIST_CHANGED)));
    }
}

fn spawn_notify(peer: Arc<PeerEngine>, method: &'static str) {
    tokio::spawn(async move {
        if let Err(e) = peer.notify(method, None).await {
            tracing::debug!(error = %e, method, "failed to deliver list_changed notification");
        }
    });
}

fn forward_progress(ctx: &RequestContext) -> ProgressEmitter {
    let ctx = ctx.clone();
    Arc::new(move |progress, total| {
        let ctx = ctx.clone();
        tokio::spawn(async move {
            let _ = ctx.emit_progress(progress, total).await;
        });
    })
}

fn cursor_of(params: &Option<Value>) -> Option<String> {
    params.as_ref()?.get("cursor")?.as_str().map(str::to_string)
}

fn list_page_value<T: serde::Serialize>(key: &str, page: mcpcore_types::Page<T>) -> Value {
    let mut value = serde_json::json!({ key: page.items });
    if let Some(cursor) = page.next_cursor {
        value["nextCursor"] = serde_json::json!(cursor);
    }
    value
}

fn name_and_arguments(params: &Option<Value>) -> Result<(String, Value), JsonRpcError> {
    let params = params
        .as_ref()
        .ok_or_else(|| JsonRpcError::invalid_params("tools/call requires params"))?;
    let name = params
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| JsonRpcError::invalid_params("tools/call requires a 'name'"))?
        .to_string();
    let arguments = params.get("arguments").cloned().unwrap_or_else(|| serde_json::json!({}));
    Ok((name, arguments))
}

fn to_value<T: serde::Serialize>(value: T) -> Result<Value, JsonRpcError> {
    serde_json::to_value(value).map_err(|e| JsonRpcError::internal_error(e.to_string()))
}

async fn complete(
    tools: &ToolRegistry,
    resources: &ResourceRegistry,
    prompts: &PromptRegistry,
    params: Option<Value>,
) -> Result<Value, JsonRpcError> {
    let params = params.ok_or_else(|| JsonRpcError::invalid_params("completion/complete requires params"))?;
    let reference = params
        .get("ref")
        .ok_or_else(|| JsonRpcError::invalid_params("completion/complete requires a 'ref'"))?;
    let argument = params
        .get("argument")
        .ok_or_else(|| JsonRpcError::invalid_params("completion/complete requires an 'argument'"))?;
    let argument_name = argument
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| JsonRpcError::invalid_params("argument requires a 'name'"))?;
    let partial = argument.get("value").and_then(Value::as_str).unwrap_or_default();

    let ref_type = reference.get("type").and_then(Value::as_str).unwrap_or_default();
    let values = match ref_type {
        "ref/prompt" => {
            let name = reference
                .get("name")
                .and_then(Value::as_str)
                .ok_or_else(|| JsonRpcError::invalid_params("ref/prompt requires a 'name'"))?;
            prompts.complete(name, argument_name, partial).await.map_err(|e| JsonRpcError::invalid_params(e.to_string()))?
        }
        "ref/resource" => {
            let uri = reference
                .get("uri")
                .and_then(Value::as_str)
                .ok_or_else(|| JsonRpcError::invalid_params("ref/resource requires a 'uri'"))?;
            resources
                .complete(uri, argument_name, partial)
                .await
                .map_err(|e| JsonRpcError::invalid_params(e.to_string()))?
        }
        "ref/tool" => {
            let name = reference
                .get("name")
                .and_then(Value::as_str)
                .ok_or_else(|| JsonRpcError::invalid_params("ref/tool requires a 'name'"))?;
            tools.complete(name, argument_name, partial).await.map_err(|e| JsonRpcError::invalid_params(e.to_string()))?
        }
        other => return Err(JsonRpcError::invalid_params(format!("unsupported completion ref type: {other}"))),
    };

    let total = values.len();
    Ok(serde_json::json!({
        "completion": { "values": values, "total": total, "hasMore": false },
    }))
}

/// Compile-time sanity anchor: this crate's default protocol version
/// always matches the one negotiated by [`mcpcore_peer`].
const _: () = assert!(!PROTOCOL_VERSION.is_empty());
