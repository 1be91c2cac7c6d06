//! Configuration file loading for repo-lens
//!
//! This module handles file I/O and merging of configuration from multiple sources.
//! The priority order (highest to lowest):
//!
//! 1. `--config <path>` specified file
//! 2. Project root: `./repo-lens.toml` or `./.repo-lens.toml`
//! 3. XDG config: `$XDG_CONFIG_HOME/repo-lens/config.toml`
//! 4. Environment: `REPO_LENS_<SECTION>__<KEY>`
//! 5. Default values

mod file_config;
mod loader;

pub use file_config::{
    ConfigValidationError, FileAnalysisConfig, FileApiProviderConfig, FileConfig,
    FileExportConfig, FileGitHubToolsConfig, FileLoggingConfig, FileMcpToolsConfig,
    FileProvidersConfig, FileServerConfig, FileToolsConfig, ToolBackend,
};
pub use loader::ConfigLoader;
