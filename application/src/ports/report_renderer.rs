//! Report Renderer port
//!
//! Turns a finished analysis into a downloadable document.

use async_trait::async_trait;
use lens_domain::{AnalysisReport, ArtifactRef, JobId};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("Invalid artifact name: {0}")]
    InvalidArtifactName(String),

    #[error("Render failed: {0}")]
    Failed(String),
}

#[async_trait]
pub trait ReportRenderer: Send + Sync {
    /// Document format (e.g. "markdown"), for logs and health output.
    fn format(&self) -> &str;

    /// Render `report` and return where the result can be fetched.
    async fn render(
        &self,
        job_id: JobId,
        project_name: &str,
        report: &AnalysisReport,
    ) -> Result<ArtifactRef, RenderError>;

    /// Resolve a download name to a local path, refusing anything that
    /// would escape the output directory. `None` if no such artifact exists.
    fn artifact_path(&self, file_name: &str) -> Option<PathBuf>;

    /// Delete a rendered artifact (retention cleanup).
    async fn remove(&self, artifact: &ArtifactRef) -> Result<(), RenderError>;
}
