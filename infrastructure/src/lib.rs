//! Infrastructure layer for repo-lens
//!
//! This crate contains adapters that implement the ports defined
//! in the application layer, including configuration file loading.
//!
//! - [`providers`] - OpenAI-compatible streaming model gateways
//! - [`mcp`] / [`github`] - repository inspection tool backends
//! - [`jobs`] / [`render`] - export job storage and document rendering
//! - [`logging`] - JSONL session transcripts

pub mod config;
pub mod github;
pub mod jobs;
pub mod logging;
pub mod mcp;
pub mod providers;
pub mod render;

// Re-export commonly used types
pub use config::{
    ConfigLoader, ConfigValidationError, FileConfig, FileGitHubToolsConfig, FileMcpToolsConfig,
    ToolBackend,
};
pub use github::{GitHubApiToolExecutor, GitHubToolsOptions};
pub use jobs::InMemoryJobStore;
pub use logging::JsonlTranscriptLogger;
pub use mcp::{McpClient, McpError, McpServerCommand, McpToolExecutor};
pub use providers::{OpenAiCompatibleGateway, ProviderRegistry};
pub use render::MarkdownReportRenderer;
