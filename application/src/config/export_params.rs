//! Export queue parameters.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Worker pool and retention settings for
/// [`ExportJobQueue`](crate::use_cases::export_queue::ExportJobQueue).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportParams {
    /// Fixed number of worker tasks.
    pub workers: usize,
    /// How long terminal jobs stay pollable.
    pub retention: Duration,
    /// How often expired jobs are swept.
    pub sweep_interval: Duration,
}

impl Default for ExportParams {
    fn default() -> Self {
        Self {
            workers: 2,
            retention: Duration::from_secs(7 * 24 * 3600),
            sweep_interval: Duration::from_secs(3600),
        }
    }
}

impl ExportParams {
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_retention(mut self, retention: Duration) -> Self {
        self.retention = retention;
        self
    }

    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }
}
