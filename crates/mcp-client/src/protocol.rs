//! JSON-RPC 2.0 message types for talking to the tool host.
//!
//! One message per line; requests carry an `id`, notifications do not.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const JSONRPC_VERSION: &str = "2.0";
pub const MCP_PROTOCOL_VERSION: &str = "2024-11-05";

/// A request that expects a response with the same `id`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Request {
    pub jsonrpc: String,
    pub id: u64,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl Request {
    pub fn new(id: u64, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.into(),
            id,
            method: method.into(),
            params,
        }
    }
}

/// A fire-and-forget notification.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Notification {
    pub jsonrpc: String,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl Notification {
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.into(),
            method: method.into(),
            params: None,
        }
    }
}

/// A response; exactly one of `result`/`error` is set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Response {
    pub jsonrpc: String,
    pub id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl Response {
    /// Unwrap the result, surfacing an error response as `Err`.
    pub fn into_result(self) -> Result<Value, RpcError> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.result.unwrap_or(Value::Null)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl std::fmt::Display for RpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "JSON-RPC error {}: {}", self.code, self.message)
    }
}

impl std::error::Error for RpcError {}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// MCP payloads
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Parameters for the `initialize` request.
pub fn initialize_params() -> Value {
    serde_json::json!({
        "protocolVersion": MCP_PROTOCOL_VERSION,
        "capabilities": {},
        "clientInfo": {
            "name": "suroo",
            "version": env!("CARGO_PKG_VERSION"),
        }
    })
}

/// One tool definition from `tools/list`. Only the name matters to the
/// dispatcher; the input schema lives in the language-keyed schema files.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolDef {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ToolsListResult {
    pub tools: Vec<ToolDef>,
}

/// One content block in a `tools/call` result.
#[derive(Debug, Clone, Deserialize)]
pub struct CallContent {
    #[serde(rename = "type")]
    pub content_type: String,
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallResult {
    #[serde(default)]
    pub content: Vec<CallContent>,
    #[serde(default, rename = "isError")]
    pub is_error: bool,
}

impl CallResult {
    /// The first textual content block, or `None` for an empty result.
    pub fn first_text(&self) -> Option<&str> {
        self.content
            .iter()
            .find(|c| c.content_type == "text")
            .map(|c| c.text.as_str())
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_serializes_with_id() {
        let req = Request::new(1, "initialize", Some(initialize_params()));
        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains("\"jsonrpc\":\"2.0\""));
        assert!(json.contains("\"id\":1"));
        assert!(json.contains("\"protocolVersion\":\"2024-11-05\""));
    }

    #[test]
    fn request_without_params_omits_field() {
        let req = Request::new(2, "tools/list", None);
        assert!(!serde_json::to_string(&req).unwrap().contains("params"));
    }

    #[test]
    fn notification_has_no_id() {
        let notif = Notification::new("notifications/initialized");
        let json = serde_json::to_string(&notif).unwrap();
        assert!(!json.contains("\"id\""));
    }

    #[test]
    fn success_response_into_result() {
        let raw = r#"{"jsonrpc":"2.0","id":3,"result":{"tools":[]}}"#;
        let resp: Response = serde_json::from_str(raw).unwrap();
        assert!(resp.into_result().is_ok());
    }

    #[test]
    fn error_response_into_result() {
        let raw = r#"{"jsonrpc":"2.0","id":3,"error":{"code":-32601,"message":"Method not found"}}"#;
        let resp: Response = serde_json::from_str(raw).unwrap();
        let err = resp.into_result().unwrap_err();
        assert_eq!(err.code, -32601);
        assert_eq!(format!("{err}"), "JSON-RPC error -32601: Method not found");
    }

    #[test]
    fn tools_list_deserializes() {
        let raw = r#"{"tools":[
            {"name":"get_balance","description":"Account balance","inputSchema":{}},
            {"name":"get_faq_by_category"}
        ]}"#;
        let result: ToolsListResult = serde_json::from_str(raw).unwrap();
        assert_eq!(result.tools.len(), 2);
        assert_eq!(result.tools[0].name, "get_balance");
        assert_eq!(result.tools[1].description, "");
    }

    #[test]
    fn call_result_first_text() {
        let raw = r#"{"content":[{"type":"text","text":"Баланс: 1200 KGS"}]}"#;
        let result: CallResult = serde_json::from_str(raw).unwrap();
        assert_eq!(result.first_text(), Some("Баланс: 1200 KGS"));
        assert!(!result.is_error);
    }

    #[test]
    fn call_result_empty_content() {
        let result: CallResult = serde_json::from_str(r#"{"content":[]}"#).unwrap();
        assert_eq!(result.first_text(), None);
    }

    #[test]
    fn call_result_skips_non_text_blocks() {
        let raw = r#"{"content":[{"type":"image","text":""},{"type":"text","text":"ok"}]}"#;
        let result: CallResult = serde_json::from_str(raw).unwrap();
        assert_eq!(result.first_text(), Some("ok"));
    }
}
