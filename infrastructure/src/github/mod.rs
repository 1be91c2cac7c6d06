//! GitHub REST API tool backend.
//!
//! Implements the three repository inspection tools directly against the
//! GitHub API, for deployments that cannot run the MCP tool server.

mod executor;
mod format;

pub use executor::{GitHubApiToolExecutor, GitHubToolsOptions};
