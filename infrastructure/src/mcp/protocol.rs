//! JSON-RPC 2.0 message types for the MCP stdio transport.
//!
//! Messages are newline-delimited JSON objects.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// MCP protocol revision announced during `initialize`.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

static REQUEST_ID: AtomicU64 = AtomicU64::new(1);

fn next_id() -> u64 {
    REQUEST_ID.fetch_add(1, Ordering::SeqCst)
}

/// JSON-RPC request
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
}

impl JsonRpcRequest {
    /// Creates a new JSON-RPC request with an auto-generated ID.
    pub fn new(method: impl Into<String>, params: Option<serde_json::Value>) -> Self {
        Self {
            jsonrpc: "2.0",
            id: next_id(),
            method: method.into(),
            params,
        }
    }
}

/// JSON-RPC notification (no response expected)
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcNotification {
    pub jsonrpc: &'static str,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
}

impl JsonRpcNotification {
    pub fn new(method: impl Into<String>, params: Option<serde_json::Value>) -> Self {
        Self {
            jsonrpc: "2.0",
            method: method.into(),
            params,
        }
    }
}

/// JSON-RPC response
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcResponse {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub result: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<RpcError>,
}

/// JSON-RPC error object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

/// Outgoing response to a server-initiated request.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcResponseOut {
    pub jsonrpc: &'static str,
    pub id: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl JsonRpcResponseOut {
    pub fn result(id: serde_json::Value, result: serde_json::Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn method_not_found(id: serde_json::Value, method: &str) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: None,
            error: Some(RpcError {
                code: -32601,
                message: format!("Method not found: {method}"),
            }),
        }
    }
}

/// Kind of an incoming message.
#[derive(Debug, Clone, PartialEq)]
pub enum MessageKind {
    /// Response to one of our requests (has `id`, no `method`).
    Response { id: u64 },
    /// Server-initiated request (has `id` + `method`), e.g. `ping`.
    IncomingRequest { id: serde_json::Value },
    /// Notification (has `method`, no `id`), e.g. log messages.
    Notification,
    /// Neither; ignored.
    Invalid,
}

pub fn classify_message(json: &serde_json::Value) -> MessageKind {
    let id = json.get("id").filter(|v| !v.is_null());
    let has_method = json.get("method").and_then(|v| v.as_str()).is_some();

    match (id, has_method) {
        (Some(id), true) => MessageKind::IncomingRequest { id: id.clone() },
        (Some(id), false) => match id.as_u64() {
            Some(id) => MessageKind::Response { id },
            None => MessageKind::Invalid,
        },
        (None, true) => MessageKind::Notification,
        (None, false) => MessageKind::Invalid,
    }
}

/// One entry of a `tools/list` result.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct McpTool {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub input_schema: Option<serde_json::Value>,
}

/// `tools/list` result page.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListToolsResult {
    #[serde(default)]
    pub tools: Vec<McpTool>,
    #[serde(default)]
    pub next_cursor: Option<String>,
}

/// Content block in a `tools/call` result.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ToolContent {
    Text {
        text: String,
    },
    #[serde(other)]
    Other,
}

/// `tools/call` result.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallToolResult {
    #[serde(default)]
    pub content: Vec<ToolContent>,
    #[serde(default)]
    pub is_error: bool,
}

impl CallToolResult {
    /// Text blocks joined by newlines.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|c| match c {
                ToolContent::Text { text } => Some(text.as_str()),
                ToolContent::Other => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_ids_are_unique() {
        let a = JsonRpcRequest::new("tools/list", None);
        let b = JsonRpcRequest::new("tools/list", None);
        assert_ne!(a.id, b.id);
        let wire = serde_json::to_value(&a).unwrap();
        assert_eq!(wire["jsonrpc"], "2.0");
        assert!(wire.get("params").is_none());
    }

    #[test]
    fn classifies_messages() {
        assert_eq!(
            classify_message(&json!({"jsonrpc": "2.0", "id": 3, "result": {}})),
            MessageKind::Response { id: 3 }
        );
        assert_eq!(
            classify_message(&json!({"jsonrpc": "2.0", "id": "p1", "method": "ping"})),
            MessageKind::IncomingRequest { id: json!("p1") }
        );
        assert_eq!(
            classify_message(&json!({"jsonrpc": "2.0", "method": "notifications/message"})),
            MessageKind::Notification
        );
        assert_eq!(classify_message(&json!({"jsonrpc": "2.0"})), MessageKind::Invalid);
    }

    #[test]
    fn call_result_joins_text_blocks() {
        let result: CallToolResult = serde_json::from_value(json!({
            "content": [
                {"type": "text", "text": "line one"},
                {"type": "image", "data": "...", "mimeType": "image/png"},
                {"type": "text", "text": "line two"}
            ],
            "isError": false
        }))
        .unwrap();
        assert_eq!(result.text(), "line one\nline two");
        assert!(!result.is_error);
    }

    #[test]
    fn list_result_tolerates_missing_fields() {
        let page: ListToolsResult = serde_json::from_value(json!({
            "tools": [{"name": "read_file"}]
        }))
        .unwrap();
        assert_eq!(page.tools[0].name, "read_file");
        assert!(page.tools[0].input_schema.is_none());
        assert!(page.next_cursor.is_none());
    }
}
