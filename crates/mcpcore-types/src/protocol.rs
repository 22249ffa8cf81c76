//! MCP protocol record types: tools, resources, prompts, capabilities,
//! and the content blocks carried in their results.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Client-advertised capabilities sent with `initialize`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientCapabilities {
    /// Present if the client can receive `notifications/roots/list_changed`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roots: Option<RootsCapability>,
    /// Present if the client implements LLM sampling on the server's behalf.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sampling: Option<Value>,
}

/// `roots` sub-capability.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RootsCapability {
    /// Whether the client will emit `list_changed` notifications for roots.
    #[serde(default)]
    pub list_changed: bool,
}

/// Server-advertised capabilities returned from `initialize`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerCapabilities {
    /// Present if the server exposes a tool registry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<ListChangedCapability>,
    /// Present if the server exposes a resource registry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<ListChangedCapability>,
    /// Present if the server exposes a prompt registry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompts: Option<ListChangedCapability>,
}

/// Shared shape for capabilities that may emit `list_changed` notifications.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListChangedCapability {
    /// Whether this registry emits `list_changed` notifications.
    #[serde(default)]
    pub list_changed: bool,
}

/// Identifies the calling implementation during the handshake.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Implementation {
    /// Implementation name.
    pub name: String,
    /// Implementation version string.
    pub version: String,
}

/// Parameters of an `initialize` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    /// The protocol version the caller prefers.
    pub protocol_version: String,
    /// The caller's capabilities.
    #[serde(default)]
    pub capabilities: ClientCapabilities,
    /// The caller's implementation identity.
    pub client_info: Implementation,
}

/// Result of a successful `initialize` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResult {
    /// The protocol version the server selected.
    pub protocol_version: String,
    /// The server's capabilities.
    pub capabilities: ServerCapabilities,
    /// The server's implementation identity.
    pub server_info: Implementation,
}

/// A JSON-Schema object describing a tool's input shape. Stored verbatim;
/// compiled separately by the registry at registration time.
pub type InputSchema = Value;

/// Hints about a tool's behavior, purely advisory to the caller.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolAnnotations {
    /// A human-friendly title, distinct from the machine `name`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Hints that the tool may perform destructive actions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destructive_hint: Option<bool>,
    /// Hints that the tool only reads state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_only_hint: Option<bool>,
}

/// A registered tool's public descriptor, as returned by `tools/list`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDescriptor {
    /// Unique tool name.
    pub name: String,
    /// Human-readable description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Compiled against every `tools/call` invocation before dispatch.
    pub input_schema: InputSchema,
    /// Validated post-hoc against the handler's result, if declared.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_schema: Option<InputSchema>,
    /// Advisory annotations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotations: Option<ToolAnnotations>,
}

/// A block of content returned by a tool, resource, or prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    /// Plain text.
    Text {
        /// The text itself.
        text: String,
    },
    /// Base64-encoded binary payload with an advertised MIME type.
    Image {
        /// Base64-encoded bytes.
        data: String,
        /// MIME type, e.g. `"image/png"`.
        mime_type: String,
    },
    /// An embedded resource reference.
    Resource {
        /// The resource URI.
        uri: String,
        /// Optional MIME type override.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        mime_type: Option<String>,
        /// Inline text, when the resource is textual.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        text: Option<String>,
    },
}

/// Result of a `tools/call` invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallToolResult {
    /// The content blocks produced by the tool.
    pub content: Vec<ContentBlock>,
    /// `true` if the tool reports failure (distinct from a transport-level
    /// JSON-RPC error: the call itself succeeded, the tool's work did not).
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_error: bool,
}

impl CallToolResult {
    /// A successful result wrapping a single text block.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ContentBlock::Text { text: text.into() }],
            is_error: false,
        }
    }

    /// A failed result wrapping a single text block describing the failure.
    pub fn error(text: impl Into<String>) -> Self {
        Self {
            content: vec![ContentBlock::Text { text: text.into() }],
            is_error: true,
        }
    }
}

/// A registered resource's public descriptor, as returned by `resources/list`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceDescriptor {
    /// The resource's URI (any scheme).
    pub uri: String,
    /// Human-readable display name.
    pub name: String,
    /// Optional description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Declared MIME type, if known in advance.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

/// Result of a `resources/read` invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadResourceResult {
    /// One content entry per resource contents returned (usually one).
    pub contents: Vec<ResourceContents>,
}

/// The body of a single resource read, as either text or base64 bytes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceContents {
    /// The URI this content was read from.
    pub uri: String,
    /// MIME type, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    /// Present when the resource is textual.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Present when the resource is binary, base64-encoded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blob: Option<String>,
}

/// A named, optionally-required argument accepted by a prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptArgument {
    /// Argument name.
    pub name: String,
    /// Human-readable description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Whether a `prompts/get` call must supply this argument.
    #[serde(default)]
    pub required: bool,
}

/// A registered prompt's public descriptor, as returned by `prompts/list`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptDescriptor {
    /// Unique prompt name.
    pub name: String,
    /// Human-readable description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Accepted arguments.
    #[serde(default)]
    pub arguments: Vec<PromptArgument>,
}

/// A role tag on a prompt message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// From the user.
    User,
    /// From the assistant.
    Assistant,
}

/// One message in a `prompts/get` result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptMessage {
    /// Who this message is attributed to.
    pub role: Role,
    /// The message body.
    pub content: ContentBlock,
}

/// Result of a `prompts/get` invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetPromptResult {
    /// Optional description echoed back to the caller.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// The ordered message sequence produced by the prompt.
    pub messages: Vec<PromptMessage>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn call_tool_result_helpers_set_is_error() {
        assert!(!CallToolResult::text("ok").is_error);
        assert!(CallToolResult::error("bad").is_error);
    }

    #[test]
    fn content_block_round_trips() {
        let block = ContentBlock::Text {
            text: "hi".to_string(),
        };
        let v = serde_json::to_value(&block).unwrap();
        assert_eq!(v["type"], "text");
        let back: ContentBlock = serde_json::from_value(v).unwrap();
        matches!(back, ContentBlock::Text { .. });
    }
}
