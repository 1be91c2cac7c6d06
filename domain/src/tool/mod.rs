//! Tool domain module
//!
//! Repository-inspection tools are external capabilities: the domain only
//! knows their names, argument schemas, and the shape of their outcomes.
//!
//! ```text
//! ┌──────────────┐    ┌──────────────┐    ┌──────────────┐
//! │ ToolSpec     │───▶│ ToolCall     │───▶│ ToolResult   │
//! │ (registry)   │    │ (invocation) │    │ (output)     │
//! └──────────────┘    └──────────────┘    └──────────────┘
//! ```
//!
//! Concrete executors (MCP stdio server, GitHub REST API) live in the
//! infrastructure layer behind the application's `ToolExecutorPort`.

pub mod entities;
pub mod value_objects;

pub use entities::{ToolCall, ToolDefinition, ToolSpec};
pub use value_objects::{ToolError, ToolResult};
