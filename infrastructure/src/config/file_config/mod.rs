//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.
//! They are deserialized directly and converted into application/domain
//! configuration types after validation.

mod analysis;
mod export;
mod logging;
mod providers;
mod server;
mod tools;

pub use analysis::FileAnalysisConfig;
pub use export::FileExportConfig;
pub use logging::FileLoggingConfig;
pub use providers::{FileApiProviderConfig, FileProvidersConfig};
pub use server::FileServerConfig;
pub use tools::{FileGitHubToolsConfig, FileMcpToolsConfig, FileToolsConfig, ToolBackend};

use lens_domain::ProviderKind;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigValidationError {
    #[error("providers.default: unknown provider '{0}' (expected openai, openrouter or gemini)")]
    UnknownProvider(String),

    #[error("providers.temperature: {0} is outside 0.0..=2.0")]
    InvalidTemperature(f32),

    #[error("{0} cannot be 0")]
    Zero(&'static str),

    #[error("tools.mcp.command cannot be empty")]
    EmptyMcpCommand,
}

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub server: FileServerConfig,
    pub providers: FileProvidersConfig,
    pub analysis: FileAnalysisConfig,
    pub tools: FileToolsConfig,
    pub export: FileExportConfig,
    pub logging: FileLoggingConfig,
}

impl FileConfig {
    /// Validate the entire configuration, returning all detected issues.
    pub fn validate(&self) -> Vec<ConfigValidationError> {
        let mut issues = Vec::new();

        if self.providers.default.parse::<ProviderKind>().is_err() {
            issues.push(ConfigValidationError::UnknownProvider(
                self.providers.default.clone(),
            ));
        }
        if !(0.0..=2.0).contains(&self.providers.temperature) {
            issues.push(ConfigValidationError::InvalidTemperature(
                self.providers.temperature,
            ));
        }

        let non_zero: [(&'static str, u64); 7] = [
            ("server.port", self.server.port as u64),
            ("server.event_buffer", self.server.event_buffer as u64),
            ("providers.request_timeout_secs", self.providers.request_timeout_secs),
            ("analysis.max_tool_calls", self.analysis.max_tool_calls as u64),
            ("analysis.max_conversation_chars", self.analysis.max_conversation_chars as u64),
            ("analysis.tool_timeout_secs", self.analysis.tool_timeout_secs),
            ("export.workers", self.export.workers as u64),
        ];
        issues.extend(
            non_zero
                .into_iter()
                .filter(|(_, value)| *value == 0)
                .map(|(field, _)| ConfigValidationError::Zero(field)),
        );

        if self.tools.backend == ToolBackend::Mcp && self.tools.mcp.command.trim().is_empty() {
            issues.push(ConfigValidationError::EmptyMcpCommand);
        }

        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_deserialize_full_config() {
        let toml_str = r#"
[server]
host = "127.0.0.1"
port = 9000

[providers]
default = "openrouter"

[analysis]
max_tool_calls = 10
retry_backoff_ms = 250

[tools]
backend = "github"

[export]
workers = 4
output_dir = "/var/lib/repo-lens/reports"
retention_hours = 48

[logging]
transcript_dir = "/var/log/repo-lens/transcripts"
"#;

        let config: FileConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.bind_address(), "127.0.0.1:9000");
        assert_eq!(config.providers.default, "openrouter");
        assert_eq!(config.tools.backend, ToolBackend::Github);
        assert_eq!(
            config.export.output_dir,
            PathBuf::from("/var/lib/repo-lens/reports")
        );

        let params = config.analysis.to_params(config.server.event_buffer);
        assert_eq!(params.max_tool_calls, 10);
        assert_eq!(params.retry_backoff.as_millis(), 250);

        let export = config.export.to_params();
        assert_eq!(export.workers, 4);
        assert_eq!(export.retention.as_secs(), 48 * 3600);
        assert!(config.validate().is_empty());
    }

    #[test]
    fn test_default_config() {
        let config = FileConfig::default();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.analysis.max_tool_calls, 25);
        assert_eq!(config.tools.backend, ToolBackend::Mcp);
        assert!(config.logging.transcript_dir.is_none());
        assert!(config.validate().is_empty());
    }

    #[test]
    fn test_validate_reports_every_issue() {
        let mut config = FileConfig::default();
        config.providers.default = "acme".to_string();
        config.providers.temperature = 3.5;
        config.analysis.max_tool_calls = 0;
        config.export.workers = 0;
        config.tools.mcp.command = " ".to_string();

        let issues = config.validate();
        assert_eq!(issues.len(), 5);
        assert!(issues.contains(&ConfigValidationError::UnknownProvider("acme".into())));
        assert!(issues.contains(&ConfigValidationError::Zero("analysis.max_tool_calls")));
        assert!(issues.contains(&ConfigValidationError::EmptyMcpCommand));
    }
}
