//! JSON-RPC 2.0 message types: requests, notifications, responses, errors.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// The literal JSON-RPC protocol tag. Always serializes to `"2.0"` and
/// rejects anything else on deserialize.
pub const JSONRPC_VERSION: &str = "2.0";

/// A zero-sized marker that serializes as `"2.0"` and nothing else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct JsonRpcVersion;

impl Serialize for JsonRpcVersion {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(JSONRPC_VERSION)
    }
}

impl<'de> Deserialize<'de> for JsonRpcVersion {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        if s == JSONRPC_VERSION {
            Ok(JsonRpcVersion)
        } else {
            Err(serde::de::Error::custom(format!(
                "unsupported jsonrpc version: {s}"
            )))
        }
    }
}

/// A JSON-RPC request or response id. Either a signed integer or a string;
/// the two halves never compare equal to each other.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    /// Numeric id.
    Number(i64),
    /// String id.
    String(String),
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestId::Number(n) => write!(f, "{n}"),
            RequestId::String(s) => write!(f, "{s}"),
        }
    }
}

impl From<i64> for RequestId {
    fn from(n: i64) -> Self {
        RequestId::Number(n)
    }
}

impl From<String> for RequestId {
    fn from(s: String) -> Self {
        RequestId::String(s)
    }
}

impl From<&str> for RequestId {
    fn from(s: &str) -> Self {
        RequestId::String(s.to_string())
    }
}

/// A JSON-RPC request: expects exactly one matching response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    /// Always `"2.0"`.
    pub jsonrpc: JsonRpcVersion,
    /// Correlation id supplied by the caller.
    pub id: RequestId,
    /// The method name being invoked.
    pub method: String,
    /// Method parameters, omitted on the wire when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    /// Build a request with the given id, method, and optional params.
    pub fn new(id: RequestId, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JsonRpcVersion,
            id,
            method: method.into(),
            params,
        }
    }
}

/// A JSON-RPC notification: fire-and-forget, carries no id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcNotification {
    /// Always `"2.0"`.
    pub jsonrpc: JsonRpcVersion,
    /// The method name being invoked.
    pub method: String,
    /// Method parameters, omitted on the wire when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcNotification {
    /// Build a notification.
    pub fn new(method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JsonRpcVersion,
            method: method.into(),
            params,
        }
    }
}

/// Standard and MCP-specific JSON-RPC error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonRpcErrorCode {
    /// Invalid JSON was received (-32700).
    ParseError,
    /// The JSON sent is not a valid request object (-32600).
    InvalidRequest,
    /// The method does not exist (-32601).
    MethodNotFound,
    /// Invalid method parameters (-32602).
    InvalidParams,
    /// Internal JSON-RPC error (-32603).
    InternalError,
    /// A server-defined code outside the standard range.
    Server(i32),
}

impl From<JsonRpcErrorCode> for i32 {
    fn from(code: JsonRpcErrorCode) -> Self {
        match code {
            JsonRpcErrorCode::ParseError => -32700,
            JsonRpcErrorCode::InvalidRequest => -32600,
            JsonRpcErrorCode::MethodNotFound => -32601,
            JsonRpcErrorCode::InvalidParams => -32602,
            JsonRpcErrorCode::InternalError => -32603,
            JsonRpcErrorCode::Server(code) => code,
        }
    }
}

impl From<i32> for JsonRpcErrorCode {
    fn from(code: i32) -> Self {
        match code {
            -32700 => JsonRpcErrorCode::ParseError,
            -32600 => JsonRpcErrorCode::InvalidRequest,
            -32601 => JsonRpcErrorCode::MethodNotFound,
            -32602 => JsonRpcErrorCode::InvalidParams,
            -32603 => JsonRpcErrorCode::InternalError,
            other => JsonRpcErrorCode::Server(other),
        }
    }
}

/// A JSON-RPC error object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    /// The numeric error code.
    pub code: i32,
    /// A short human-readable message.
    pub message: String,
    /// Optional structured detail (e.g. schema validation diagnostics).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcError {
    /// Build an error from a [`JsonRpcErrorCode`] and message.
    pub fn new(code: JsonRpcErrorCode, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            data: None,
        }
    }

    /// Attach structured diagnostic data.
    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// `-32700 Parse error`.
    pub fn parse_error(message: impl Into<String>) -> Self {
        Self::new(JsonRpcErrorCode::ParseError, message)
    }

    /// `-32600 Invalid Request`.
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(JsonRpcErrorCode::InvalidRequest, message)
    }

    /// `-32601 Method not found`.
    pub fn method_not_found(method: &str) -> Self {
        Self::new(
            JsonRpcErrorCode::MethodNotFound,
            format!("method not found: {method}"),
        )
    }

    /// `-32602 Invalid params`.
    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::new(JsonRpcErrorCode::InvalidParams, message)
    }

    /// `-32603 Internal error`.
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(JsonRpcErrorCode::InternalError, message)
    }
}

/// Either side of a JSON-RPC response: exactly one of `result`/`error` may
/// be present, never both, never neither.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JsonRpcResponsePayload {
    /// Success payload.
    Result(Value),
    /// Failure payload.
    Error(JsonRpcError),
}

/// A JSON-RPC response, correlated to a prior request by id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    /// Always `"2.0"`.
    pub jsonrpc: JsonRpcVersion,
    /// The id of the request this responds to.
    pub id: RequestId,
    /// Flattened so the wire shows `result` or `error`, never a wrapper key.
    #[serde(flatten)]
    pub payload: JsonRpcResponsePayload,
}

impl JsonRpcResponse {
    /// Build a success response.
    pub fn success(id: RequestId, result: Value) -> Self {
        Self {
            jsonrpc: JsonRpcVersion,
            id,
            payload: JsonRpcResponsePayload::Result(result),
        }
    }

    /// Build an error response.
    pub fn failure(id: RequestId, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: JsonRpcVersion,
            id,
            payload: JsonRpcResponsePayload::Error(error),
        }
    }

    /// `true` if this response carries an error payload.
    pub fn is_error(&self) -> bool {
        matches!(self.payload, JsonRpcResponsePayload::Error(_))
    }
}

/// The three shapes a decoded JSON value can take on the wire.
#[derive(Debug, Clone)]
pub enum Message {
    /// Expects a matching [`JsonRpcResponse`].
    Request(JsonRpcRequest),
    /// No reply expected.
    Notification(JsonRpcNotification),
    /// Completes a previously sent request.
    Response(JsonRpcResponse),
}

impl Message {
    /// Classify and parse a raw JSON value into one of the three message
    /// shapes, or fail with a description suitable for a `ParseError`/
    /// `InvalidRequest` response.
    pub fn parse(value: Value) -> Result<Message, String> {
        let obj = value
            .as_object()
            .ok_or_else(|| "message must be a JSON object".to_string())?;

        match obj.get("jsonrpc").and_then(Value::as_str) {
            Some(JSONRPC_VERSION) => {}
            Some(other) => return Err(format!("unsupported jsonrpc version: {other}")),
            None => return Err("missing jsonrpc field".to_string()),
        }

        let has_method = obj.contains_key("method");
        let has_id = obj.contains_key("id") && !obj.get("id").is_some_and(Value::is_null);
        let has_result = obj.contains_key("result");
        let has_error = obj.contains_key("error");

        if has_method && has_id {
            let req: JsonRpcRequest =
                serde_json::from_value(value).map_err(|e| format!("invalid request: {e}"))?;
            return Ok(Message::Request(req));
        }
        if has_method && !has_id {
            let note: JsonRpcNotification =
                serde_json::from_value(value).map_err(|e| format!("invalid notification: {e}"))?;
            return Ok(Message::Notification(note));
        }
        if !has_method && has_id {
            if has_result == has_error {
                return Err(
                    "response must have exactly one of result/error, not both or neither"
                        .to_string(),
                );
            }
            let resp: JsonRpcResponse =
                serde_json::from_value(value).map_err(|e| format!("invalid response: {e}"))?;
            return Ok(Message::Response(resp));
        }

        Err("message has neither method nor id".to_string())
    }

    /// Serialize this message back to a JSON value. Total: every
    /// in-memory message produced by this crate re-serializes to valid
    /// JSON-RPC 2.0.
    pub fn to_value(&self) -> Value {
        match self {
            Message::Request(r) => serde_json::to_value(r).expect("request always serializes"),
            Message::Notification(n) => {
                serde_json::to_value(n).expect("notification always serializes")
            }
            Message::Response(r) => serde_json::to_value(r).expect("response always serializes"),
        }
    }
}

/// Recover a request `id` from a raw, possibly-unparsable textual frame
/// without performing a full JSON parse. Used to populate the `id` field
/// of an error response when the body itself failed to parse.
///
/// Tolerates malformed input: returns `None` (the caller should then
/// reply with a `null` id) rather than erroring.
pub fn extract_id_lossy(raw: &str) -> Option<RequestId> {
    let key = raw.find("\"id\"")?;
    let after_colon = raw[key + 4..].find(':')? + key + 5;
    let rest = raw[after_colon..].trim_start();

    if let Some(stripped) = rest.strip_prefix('"') {
        let end = stripped.find('"')?;
        return Some(RequestId::String(stripped[..end].to_string()));
    }

    let end = rest
        .find(|c: char| c == ',' || c == '}' || c.is_whitespace())
        .unwrap_or(rest.len());
    let token = &rest[..end];
    if token == "null" || token.is_empty() {
        return None;
    }
    token.parse::<i64>().ok().map(RequestId::Number)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn classifies_request() {
        let v = json!({"jsonrpc":"2.0","id":1,"method":"ping"});
        match Message::parse(v).unwrap() {
            Message::Request(r) => {
                assert_eq!(r.id, RequestId::Number(1));
                assert_eq!(r.method, "ping");
            }
            _ => panic!("expected request"),
        }
    }

    #[test]
    fn classifies_notification() {
        let v = json!({"jsonrpc":"2.0","method":"notifications/initialized"});
        match Message::parse(v).unwrap() {
            Message::Notification(n) => assert_eq!(n.method, "notifications/initialized"),
            _ => panic!("expected notification"),
        }
    }

    #[test]
    fn classifies_response() {
        let v = json!({"jsonrpc":"2.0","id":1,"result":{}});
        match Message::parse(v).unwrap() {
            Message::Response(r) => assert!(!r.is_error()),
            _ => panic!("expected response"),
        }
    }

    #[test]
    fn response_with_both_result_and_error_is_invalid() {
        let v = json!({"jsonrpc":"2.0","id":1,"result":{},"error":{"code":-32603,"message":"x"}});
        assert!(Message::parse(v).is_err());
    }

    #[test]
    fn response_with_neither_result_nor_error_is_invalid() {
        let v = json!({"jsonrpc":"2.0","id":1});
        assert!(Message::parse(v).is_err());
    }

    #[test]
    fn rejects_wrong_version() {
        let v = json!({"jsonrpc":"1.0","id":1,"method":"ping"});
        assert!(Message::parse(v).is_err());
    }

    #[test]
    fn round_trip_request() {
        let req = JsonRpcRequest::new(RequestId::Number(7), "tools/list", None);
        let msg = Message::Request(req);
        let value = msg.to_value();
        let reparsed = Message::parse(value).unwrap();
        match reparsed {
            Message::Request(r) => {
                assert_eq!(r.id, RequestId::Number(7));
                assert_eq!(r.method, "tools/list");
            }
            _ => panic!("expected request"),
        }
    }

    #[test]
    fn extract_id_lossy_numeric() {
        let raw = r#"{"jsonrpc":"2.0","id":42,"method":"x","params":{"#;
        assert_eq!(extract_id_lossy(raw), Some(RequestId::Number(42)));
    }

    #[test]
    fn extract_id_lossy_string() {
        let raw = r#"{"jsonrpc":"2.0","id":"abc","method":"x"}"#;
        assert_eq!(
            extract_id_lossy(raw),
            Some(RequestId::String("abc".to_string()))
        );
    }

    #[test]
    fn extract_id_lossy_missing() {
        let raw = r#"{"jsonrpc":"2.0","method":"x"}"#;
        assert_eq!(extract_id_lossy(raw), None);
    }

    #[test]
    fn extract_id_lossy_garbage() {
        assert_eq!(extract_id_lossy("not even json"), None);
    }

    proptest::proptest! {
        #[test]
        fn id_round_trips_through_display_and_parse(n: i64) {
            let id = RequestId::Number(n);
            let s = id.to_string();
            prop_assert_eq!(s.parse::<i64>().unwrap(), n);
        }
    }
}
