//! Model Context Protocol (MCP) server.
//!
//! Exposes chart generation as a single tool to MCP clients. The server talks
//! JSON-RPC 2.0 over newline-delimited stdio.
//!
//! ```text
//!   stdin ──▶ LineReader ──▶ McpServer ──▶ tool tasks ──▶ ChartService
//!                                │              │
//!                                ▼              ▼
//!                         responses channel ──▶ LineWriter ──▶ stdout
//! ```

pub mod protocol;
pub mod server;
pub mod transport;

pub use protocol::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, MCP_PROTOCOL_VERSION};
pub use server::{McpServer, ServerState, ToolCallResult, ToolContent, TOOL_NAME};
pub use transport::{LineReader, LineWriter};
