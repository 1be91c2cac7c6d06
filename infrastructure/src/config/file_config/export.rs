//! Export queue configuration from TOML (`[export]` section)

use lens_application::ExportParams;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileExportConfig {
    /// Number of export worker tasks.
    pub workers: usize,
    /// Directory rendered reports are written to.
    pub output_dir: PathBuf,
    /// How long finished jobs stay pollable.
    pub retention_hours: u64,
    /// How often expired jobs are swept.
    pub sweep_interval_secs: u64,
}

impl Default for FileExportConfig {
    fn default() -> Self {
        Self {
            workers: 2,
            output_dir: std::env::temp_dir().join("reports"),
            retention_hours: 24 * 7,
            sweep_interval_secs: 3600,
        }
    }
}

impl FileExportConfig {
    pub fn to_params(&self) -> ExportParams {
        ExportParams::default()
            .with_workers(self.workers)
            .with_retention(Duration::from_secs(self.retention_hours * 3600))
            .with_sweep_interval(Duration::from_secs(self.sweep_interval_secs))
    }
}
