//! The tool host connection and dispatch seam.

use async_trait::async_trait;
use serde_json::Value;

use suroo_domain::config::ToolHostConfig;

use crate::protocol::{self, CallResult, ToolsListResult};
use crate::transport::{StdioTransport, ToolTransport, TransportError};

#[derive(Debug, thiserror::Error)]
pub enum McpError {
    #[error("MCP transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("MCP protocol error: {0}")]
    Protocol(String),

    #[error("tool not found on tool host: {0}")]
    ToolNotFound(String),
}

impl From<McpError> for suroo_domain::Error {
    fn from(e: McpError) -> Self {
        match e {
            McpError::Transport(TransportError::Timeout) => {
                suroo_domain::Error::Timeout("tool host call".into())
            }
            other => suroo_domain::Error::Tool(other.to_string()),
        }
    }
}

/// The orchestrator's dispatch seam: invoke a named tool, get text back.
///
/// Every invocation is independent; a failure is returned as `Err` and
/// the caller decides what to substitute (it never aborts sibling calls).
#[async_trait]
pub trait ToolDispatch: Send + Sync {
    async fn invoke(&self, name: &str, args: Value) -> suroo_domain::Result<String>;
}

/// A connected tool host with its discovered tool names.
pub struct ToolHost {
    transport: Box<dyn ToolTransport>,
    tools: Vec<String>,
}

impl std::fmt::Debug for ToolHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolHost")
            .field("tools", &self.tools)
            .finish_non_exhaustive()
    }
}

impl ToolHost {
    /// Spawn the configured subprocess and run the MCP handshake:
    /// `initialize`, `notifications/initialized`, `tools/list`.
    pub async fn connect(config: &ToolHostConfig) -> Result<Self, McpError> {
        tracing::info!(command = %config.command, "connecting to tool host");
        let transport = StdioTransport::spawn(config)?;
        Self::with_transport(Box::new(transport)).await
    }

    /// Handshake over an already-built transport. Split out so tests can
    /// drive the host with a scripted transport.
    pub async fn with_transport(transport: Box<dyn ToolTransport>) -> Result<Self, McpError> {
        let resp = transport
            .request("initialize", Some(protocol::initialize_params()))
            .await?;
        resp.into_result()
            .map_err(|e| McpError::Protocol(format!("initialize failed: {e}")))?;

        transport.notify("notifications/initialized").await?;

        let resp = transport.request("tools/list", None).await?;
        let listed = resp
            .into_result()
            .map_err(|e| McpError::Protocol(format!("tools/list failed: {e}")))?;
        let listed: ToolsListResult = serde_json::from_value(listed)
            .map_err(|e| McpError::Protocol(format!("bad tools/list result: {e}")))?;

        let tools: Vec<String> = listed.tools.into_iter().map(|t| t.name).collect();
        tracing::info!(tool_count = tools.len(), "tool host ready");

        Ok(Self { transport, tools })
    }

    pub fn tool_names(&self) -> &[String] {
        &self.tools
    }

    pub fn has_tool(&self, name: &str) -> bool {
        self.tools.iter().any(|t| t == name)
    }

    async fn call(&self, name: &str, args: Value) -> Result<String, McpError> {
        // Fail fast on unknown tools instead of waiting out an RPC timeout.
        if !self.has_tool(name) {
            return Err(McpError::ToolNotFound(name.to_string()));
        }

        let params = serde_json::json!({ "name": name, "arguments": args });
        tracing::info!(tool = name, "calling tool");

        let resp = self.transport.request("tools/call", Some(params)).await?;
        let result = resp
            .into_result()
            .map_err(|e| McpError::Protocol(format!("tools/call failed: {e}")))?;
        let result: CallResult = serde_json::from_value(result)
            .map_err(|e| McpError::Protocol(format!("bad tools/call result: {e}")))?;

        if result.is_error {
            tracing::warn!(tool = name, "tool host reported an error result");
        }

        Ok(result.first_text().unwrap_or_default().to_string())
    }

    pub async fn shutdown(&self) {
        tracing::info!("shutting down tool host");
        self.transport.shutdown().await;
    }
}

#[async_trait]
impl ToolDispatch for ToolHost {
    async fn invoke(&self, name: &str, args: Value) -> suroo_domain::Result<String> {
        self.call(name, args).await.map_err(Into::into)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Response;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Scripted transport: pops one canned response per request and
    /// records the methods it saw.
    struct Scripted {
        responses: Mutex<VecDeque<Response>>,
        seen: std::sync::Arc<Mutex<Vec<String>>>,
    }

    impl Scripted {
        fn new(responses: Vec<Value>) -> Self {
            let responses = responses
                .into_iter()
                .enumerate()
                .map(|(i, result)| Response {
                    jsonrpc: "2.0".into(),
                    id: i as u64,
                    result: Some(result),
                    error: None,
                })
                .collect();
            Self {
                responses: Mutex::new(responses),
                seen: Default::default(),
            }
        }
    }

    #[async_trait]
    impl ToolTransport for Scripted {
        async fn request(
            &self,
            method: &str,
            _params: Option<Value>,
        ) -> Result<Response, TransportError> {
            self.seen.lock().unwrap().push(method.to_string());
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .ok_or(TransportError::ProcessExited)
        }

        async fn notify(&self, method: &str) -> Result<(), TransportError> {
            self.seen.lock().unwrap().push(format!("notify:{method}"));
            Ok(())
        }

        fn is_alive(&self) -> bool {
            true
        }

        async fn shutdown(&self) {}
    }

    fn handshake_responses() -> Vec<Value> {
        vec![
            serde_json::json!({"capabilities": {}}),
            serde_json::json!({"tools": [
                {"name": "get_balance"},
                {"name": "get_faq_by_category"},
            ]}),
        ]
    }

    #[tokio::test]
    async fn connect_runs_handshake_and_discovers_tools() {
        let transport = Scripted::new(handshake_responses());
        let host = ToolHost::with_transport(Box::new(transport)).await.unwrap();
        assert_eq!(host.tool_names(), ["get_balance", "get_faq_by_category"]);
        assert!(host.has_tool("get_balance"));
        assert!(!host.has_tool("transfer_money"));
    }

    #[tokio::test]
    async fn handshake_order_is_initialize_then_notify_then_list() {
        let transport = Scripted::new(handshake_responses());
        let seen = transport.seen.clone();
        ToolHost::with_transport(Box::new(transport)).await.unwrap();
        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                "initialize",
                "notify:notifications/initialized",
                "tools/list"
            ]
        );
    }

    #[tokio::test]
    async fn invoke_unknown_tool_fails_fast() {
        let transport = Scripted::new(handshake_responses());
        let host = ToolHost::with_transport(Box::new(transport)).await.unwrap();
        let err = host.call("transfer_money", Value::Null).await.unwrap_err();
        assert!(matches!(err, McpError::ToolNotFound(_)));
    }

    #[tokio::test]
    async fn invoke_returns_first_text_block() {
        let mut responses = handshake_responses();
        responses.push(serde_json::json!({
            "content": [{"type": "text", "text": "Баланс: 1200 KGS"}]
        }));
        let transport = Scripted::new(responses);
        let host = ToolHost::with_transport(Box::new(transport)).await.unwrap();

        let out = host
            .invoke("get_balance", serde_json::json!({"customer_id": 1}))
            .await
            .unwrap();
        assert_eq!(out, "Баланс: 1200 KGS");
    }

    #[tokio::test]
    async fn invoke_empty_content_is_empty_string() {
        let mut responses = handshake_responses();
        responses.push(serde_json::json!({"content": []}));
        let transport = Scripted::new(responses);
        let host = ToolHost::with_transport(Box::new(transport)).await.unwrap();

        let out = host.invoke("get_balance", Value::Null).await.unwrap();
        assert_eq!(out, "");
    }

    #[tokio::test]
    async fn initialize_error_fails_connect() {
        let transport = Scripted {
            responses: Mutex::new(VecDeque::from([Response {
                jsonrpc: "2.0".into(),
                id: 0,
                result: None,
                error: Some(crate::protocol::RpcError {
                    code: -32600,
                    message: "bad init".into(),
                    data: None,
                }),
            }])),
            seen: Default::default(),
        };
        let err = ToolHost::with_transport(Box::new(transport))
            .await
            .unwrap_err();
        assert!(matches!(err, McpError::Protocol(_)));
    }

    #[tokio::test]
    async fn timeout_maps_to_domain_timeout() {
        let err: suroo_domain::Error = McpError::Transport(TransportError::Timeout).into();
        assert!(matches!(err, suroo_domain::Error::Timeout(_)));
    }
}
