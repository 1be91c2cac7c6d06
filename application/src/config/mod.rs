//! Application-level configuration.
//!
//! - [`AnalysisParams`] - orchestration loop control (tool limit, retries, timeouts)
//! - [`ExportParams`] - export worker pool and retention

pub mod analysis_params;
pub mod export_params;

pub use analysis_params::AnalysisParams;
pub use export_params::ExportParams;
