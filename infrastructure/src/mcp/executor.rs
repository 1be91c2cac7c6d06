//! [`ToolExecutorPort`] backed by an MCP tool server.

use super::client::{McpClient, McpServerCommand};
use super::error::{McpError, Result};
use super::protocol::McpTool;
use async_trait::async_trait;
use lens_application::ToolExecutorPort;
use lens_domain::{ToolCall, ToolDefinition, ToolError, ToolResult, ToolSpec};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Executes tool calls on a shared MCP server process.
///
/// The tool catalog is fetched once at startup; every analysis session
/// shares the same server.
pub struct McpToolExecutor {
    client: Arc<McpClient>,
    spec: ToolSpec,
}

impl McpToolExecutor {
    /// Spawn the server, perform the handshake and load its tool catalog.
    pub async fn start(command: &McpServerCommand, startup_timeout: Duration) -> Result<Self> {
        let client = McpClient::spawn(command)?;
        match tokio::time::timeout(startup_timeout, Self::from_client(client)).await {
            Ok(result) => result,
            Err(_) => Err(McpError::StartupTimeout(startup_timeout.as_secs())),
        }
    }

    /// Build on an already connected client.
    pub async fn from_client(client: Arc<McpClient>) -> Result<Self> {
        client.initialize().await?;
        let tools = client.list_tools().await?;
        let spec = tools
            .into_iter()
            .map(tool_definition)
            .fold(ToolSpec::new(), ToolSpec::register);
        info!(
            "MCP tool server ready with {} tools: {}",
            spec.len(),
            spec.names().collect::<Vec<_>>().join(", ")
        );
        Ok(Self { client, spec })
    }
}

fn tool_definition(tool: McpTool) -> ToolDefinition {
    let definition = ToolDefinition::new(tool.name, tool.description.unwrap_or_default());
    match tool.input_schema {
        Some(schema) if schema.is_object() => definition.with_schema(schema),
        _ => definition,
    }
}

#[async_trait]
impl ToolExecutorPort for McpToolExecutor {
    fn tool_spec(&self) -> &ToolSpec {
        &self.spec
    }

    async fn execute(&self, call: &ToolCall) -> ToolResult {
        if !self.has_tool(&call.tool_name) {
            return ToolResult::failure(
                &call.call_id,
                &call.tool_name,
                ToolError::unknown_tool(&call.tool_name),
            );
        }
        debug!("MCP tools/call {} ({})", call.tool_name, call.call_id);

        match self
            .client
            .call_tool(&call.tool_name, call.arguments_json())
            .await
        {
            Ok(result) if result.is_error => ToolResult::failure(
                &call.call_id,
                &call.tool_name,
                ToolError::execution_failed(result.text()),
            ),
            Ok(result) => ToolResult::success(&call.call_id, &call.tool_name, result.text()),
            Err(McpError::TransportClosed) => ToolResult::failure(
                &call.call_id,
                &call.tool_name,
                ToolError::execution_failed("tool server is not running"),
            ),
            Err(e) => ToolResult::failure(
                &call.call_id,
                &call.tool_name,
                ToolError::execution_failed(e.to_string()),
            ),
        }
    }
}
