//! Logging configuration from TOML (`[logging]` section)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileLoggingConfig {
    /// Directory for daily-rolling diagnostic log files. Disabled when unset.
    pub dir: Option<PathBuf>,
    /// Directory for per-session JSONL transcripts. Disabled when unset.
    pub transcript_dir: Option<PathBuf>,
}
