//! MCP (Model Context Protocol) tool server adapter.
//!
//! Repository inspection tools are provided by an external MCP server
//! (by default `github-repo-mcp`, launched through `npx`) speaking
//! newline-delimited JSON-RPC 2.0 over stdio.
//!
//! - [`McpClient`] owns the process and correlates requests/responses
//! - [`McpToolExecutor`] adapts it to the `ToolExecutorPort`

mod client;
pub mod error;
pub mod protocol;
mod executor;

pub use client::{McpClient, McpServerCommand};
pub use error::McpError;
pub use executor::McpToolExecutor;
