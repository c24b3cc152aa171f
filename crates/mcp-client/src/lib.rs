//! `suroo-mcp-client` — client for the banking tool host.
//!
//! The tool host is an MCP server reached over newline-delimited JSON-RPC
//! on a child process's stdin/stdout. Connecting performs the
//! initialize / notifications-initialized / tools-list sequence and
//! remembers the discovered tool names so an unknown tool fails fast
//! instead of timing out at the protocol level.
//!
//! The [`ToolDispatch`] trait is the seam the orchestrator dispatches
//! through; [`ToolHost`] is its production implementation.

pub mod host;
pub mod protocol;
pub mod transport;

pub use host::{McpError, ToolDispatch, ToolHost};
