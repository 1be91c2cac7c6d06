//! Tool backend configuration from TOML (`[tools]` section)
//!
//! ```toml
//! [tools]
//! backend = "mcp"            # or "github"
//!
//! [tools.mcp]
//! command = "npx"
//! args = ["-y", "github-repo-mcp"]
//!
//! [tools.github]
//! token_env = "GITHUB_TOKEN"
//! max_file_bytes = 100000
//! ```

use crate::github::GitHubToolsOptions;
use crate::mcp::McpServerCommand;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Which implementation serves the repository tools.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolBackend {
    /// External MCP server over stdio.
    #[default]
    Mcp,
    /// Built-in GitHub REST client.
    Github,
}

/// MCP server process settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileMcpToolsConfig {
    pub command: String,
    pub args: Vec<String>,
    /// Extra environment for the server process.
    pub env: HashMap<String, String>,
    /// Seconds to wait for the initialize handshake.
    pub startup_timeout_secs: u64,
}

impl Default for FileMcpToolsConfig {
    fn default() -> Self {
        let (command, args) = if cfg!(windows) {
            ("cmd", vec!["/c", "npx", "-y", "github-repo-mcp"])
        } else {
            ("npx", vec!["-y", "github-repo-mcp"])
        };
        Self {
            command: command.to_string(),
            args: args.into_iter().map(String::from).collect(),
            env: HashMap::new(),
            startup_timeout_secs: 60,
        }
    }
}

/// GitHub REST settings (also supplies the token forwarded to MCP servers).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileGitHubToolsConfig {
    /// Environment variable holding the GitHub token.
    pub token_env: String,
    pub api_base_url: String,
    /// Files larger than this are truncated before being handed to the model.
    pub max_file_bytes: usize,
}

impl Default for FileGitHubToolsConfig {
    fn default() -> Self {
        Self {
            token_env: "GITHUB_TOKEN".to_string(),
            api_base_url: "https://api.github.com".to_string(),
            max_file_bytes: 100_000,
        }
    }
}

impl FileGitHubToolsConfig {
    /// Token from the configured environment variable, if set and non-empty.
    pub fn token(&self) -> Option<String> {
        std::env::var(&self.token_env)
            .ok()
            .filter(|t| !t.trim().is_empty())
    }

    pub fn to_options(&self) -> GitHubToolsOptions {
        GitHubToolsOptions {
            api_base_url: self.api_base_url.trim().trim_end_matches('/').to_string(),
            token: self.token(),
            max_file_bytes: self.max_file_bytes,
        }
    }
}

impl FileMcpToolsConfig {
    /// Process description for the server. `github_token` is forwarded as
    /// `GITHUB_TOKEN` unless the configured environment already sets it.
    pub fn server_command(&self, github_token: Option<String>) -> McpServerCommand {
        let mut env: Vec<(String, String)> = self
            .env
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        env.sort();
        if let Some(token) = github_token
            && !self.env.contains_key("GITHUB_TOKEN")
        {
            env.push(("GITHUB_TOKEN".to_string(), token));
        }
        env.into_iter().fold(
            McpServerCommand::new(self.command.trim()).with_args(self.args.iter().cloned()),
            |command, (key, value)| command.with_env(key, value),
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileToolsConfig {
    pub backend: ToolBackend,
    pub mcp: FileMcpToolsConfig,
    pub github: FileGitHubToolsConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_parses_lowercase() {
        let config: FileToolsConfig = toml::from_str("backend = \"github\"").unwrap();
        assert_eq!(config.backend, ToolBackend::Github);
        assert_eq!(config.github.max_file_bytes, 100_000);
    }

    #[test]
    fn server_command_forwards_token() {
        let mut config = FileMcpToolsConfig::default();
        config.env.insert("LOG_LEVEL".into(), "error".into());
        let command = config.server_command(Some("ghp_x".into()));
        assert!(command.env.contains(&("LOG_LEVEL".into(), "error".into())));
        assert!(command.env.contains(&("GITHUB_TOKEN".into(), "ghp_x".into())));

        config.env.insert("GITHUB_TOKEN".into(), "explicit".into());
        let command = config.server_command(Some("ghp_x".into()));
        let tokens: Vec<_> = command.env.iter().filter(|(k, _)| k == "GITHUB_TOKEN").collect();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].1, "explicit");
    }

    #[test]
    fn github_options_trim_base_url() {
        let config = FileGitHubToolsConfig {
            api_base_url: "https://ghe.example.com/api/v3/".into(),
            token_env: "REPO_LENS_TEST_UNSET_GITHUB_TOKEN".into(),
            ..Default::default()
        };
        let options = config.to_options();
        assert_eq!(options.api_base_url, "https://ghe.example.com/api/v3");
        assert!(options.token.is_none());
    }

    #[test]
    fn default_mcp_server_is_github_repo_mcp() {
        let config = FileMcpToolsConfig::default();
        assert!(config.args.iter().any(|a| a == "github-repo-mcp"));
    }
}
