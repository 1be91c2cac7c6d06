//! Presentation layer for repo-lens
//!
//! This crate contains the HTTP API, CLI definitions, terminal event
//! formatters and progress reporters.

pub mod cli;
pub mod http;
pub mod output;
pub mod progress;

// Re-export commonly used types
pub use cli::commands::{Cli, Command};
pub use http::{ApiError, AppState, router, serve};
pub use output::{ConsoleFormatter, EventFormatter, JsonLinesFormatter};
pub use progress::reporter::ExportProgress;
