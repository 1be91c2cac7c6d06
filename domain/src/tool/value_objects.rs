//! Tool domain value objects: immutable result and error types
//!
//! Every tool execution produces a [`ToolResult`]. Failures are ordinary
//! values, never panics or `Err` returns: the orchestrator feeds them back to
//! the model as context.

use serde::{Deserialize, Serialize};

/// Error that occurred during tool execution.
///
/// | Code | Description |
/// |------|-------------|
/// | `INVALID_ARGUMENT` | Missing/wrong parameters |
/// | `NOT_FOUND` | Unknown tool or resource |
/// | `EXECUTION_FAILED` | Runtime failure (I/O, HTTP, MCP server error) |
/// | `TIMEOUT` | Operation timed out |
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolError {
    /// Error code (e.g., "NOT_FOUND")
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ToolError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::new(
            "NOT_FOUND",
            format!("Resource not found: {}", resource.into()),
        )
    }

    pub fn unknown_tool(name: &str) -> Self {
        Self::new("NOT_FOUND", format!("Tool {} not found", name))
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new("INVALID_ARGUMENT", message)
    }

    pub fn execution_failed(message: impl Into<String>) -> Self {
        Self::new("EXECUTION_FAILED", message)
    }

    pub fn timeout(operation: impl Into<String>) -> Self {
        Self::new(
            "TIMEOUT",
            format!("Operation timed out: {}", operation.into()),
        )
    }
}

impl std::fmt::Display for ToolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(details) = &self.details {
            write!(f, " ({})", details)?;
        }
        Ok(())
    }
}

impl std::error::Error for ToolError {}

/// Result of a tool execution, carrying output or error information.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    /// Correlation id of the call this result answers
    pub call_id: String,
    /// Name of the tool that was executed
    pub tool_name: String,
    /// Whether the execution was successful
    pub success: bool,
    /// Output content (for successful execution)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    /// Error information (for failed execution)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ToolError>,
    /// Wall-clock execution time
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

impl ToolResult {
    /// Create a successful result
    pub fn success(
        call_id: impl Into<String>,
        tool_name: impl Into<String>,
        output: impl Into<String>,
    ) -> Self {
        Self {
            call_id: call_id.into(),
            tool_name: tool_name.into(),
            success: true,
            output: Some(output.into()),
            error: None,
            duration_ms: None,
        }
    }

    /// Create a failed result
    pub fn failure(
        call_id: impl Into<String>,
        tool_name: impl Into<String>,
        error: ToolError,
    ) -> Self {
        Self {
            call_id: call_id.into(),
            tool_name: tool_name.into(),
            success: false,
            output: None,
            error: Some(error),
            duration_ms: None,
        }
    }

    pub fn with_duration(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn output(&self) -> Option<&str> {
        self.output.as_deref()
    }

    pub fn error(&self) -> Option<&ToolError> {
        self.error.as_ref()
    }

    /// Text handed back to the model as the tool message content.
    pub fn model_content(&self) -> String {
        match (&self.output, &self.error) {
            (Some(output), _) => output.clone(),
            (None, Some(err)) => format!("Error executing tool {}: {}", self.tool_name, err),
            (None, None) => String::new(),
        }
    }

    /// Display message for the `tool_result` event.
    pub fn display_message(&self) -> String {
        match &self.error {
            None => format!("Completed {}", self.tool_name),
            Some(err) => format!("Failed {}: {}", self.tool_name, err.message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_error() {
        let err = ToolError::not_found("src/missing.rs").with_details("404 from GitHub");

        assert_eq!(err.code, "NOT_FOUND");
        assert!(err.message.contains("src/missing.rs"));
        assert_eq!(
            err.to_string(),
            "[NOT_FOUND] Resource not found: src/missing.rs (404 from GitHub)"
        );
    }

    #[test]
    fn test_tool_result_success() {
        let result = ToolResult::success("c1", "read_file", "fn main() {}").with_duration(12);

        assert!(result.is_success());
        assert_eq!(result.output(), Some("fn main() {}"));
        assert!(result.error().is_none());
        assert_eq!(result.model_content(), "fn main() {}");
        assert_eq!(result.display_message(), "Completed read_file");
    }

    #[test]
    fn test_tool_result_failure() {
        let result = ToolResult::failure("c2", "read_file", ToolError::not_found("nope.rs"));

        assert!(!result.is_success());
        assert!(result.output().is_none());
        assert_eq!(result.error().unwrap().code, "NOT_FOUND");
        assert_eq!(
            result.model_content(),
            "Error executing tool read_file: [NOT_FOUND] Resource not found: nope.rs"
        );
        assert_eq!(
            result.display_message(),
            "Failed read_file: Resource not found: nope.rs"
        );
    }

    #[test]
    fn test_unknown_tool_message() {
        assert_eq!(ToolError::unknown_tool("frobnicate").message, "Tool frobnicate not found");
    }
}
