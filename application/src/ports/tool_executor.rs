//! Tool Executor port
//!
//! Defines the interface for executing repository-inspection tools.

use async_trait::async_trait;
use lens_domain::tool::{
    entities::{ToolCall, ToolDefinition, ToolSpec},
    value_objects::ToolResult,
};

/// Port for tool execution
///
/// Implementations must never fail the call itself: every problem is
/// reported as a failed [`ToolResult`] so that the model can react to it.
#[async_trait]
pub trait ToolExecutorPort: Send + Sync {
    /// Get the specification of all available tools
    fn tool_spec(&self) -> &ToolSpec;

    /// Check if a tool is available
    fn has_tool(&self, name: &str) -> bool {
        self.tool_spec().contains(name)
    }

    /// Get the definition of a specific tool
    fn get_tool(&self, name: &str) -> Option<&ToolDefinition> {
        self.tool_spec().get(name)
    }

    /// Execute a tool call
    async fn execute(&self, call: &ToolCall) -> ToolResult;
}
