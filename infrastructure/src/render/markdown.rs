//! Markdown report renderer.
//!
//! Writes `<output_dir>/<project>_<job_id>.md` and serves it back through
//! `/api/report/download/<file_name>`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lens_application::{RenderError, ReportRenderer};
use lens_domain::{AnalysisReport, ArtifactRef, JobId};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Route prefix the HTTP layer serves artifacts from.
pub const DOWNLOAD_PREFIX: &str = "/api/report/download";

pub struct MarkdownReportRenderer {
    output_dir: PathBuf,
}

impl MarkdownReportRenderer {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    fn file_name(job_id: JobId, project_name: &str) -> String {
        let project: String = project_name
            .chars()
            .map(|c| {
                if c.is_alphanumeric() || c == '-' || c == '_' || c == '.' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        let project = project.trim_matches('.');
        let project = if project.is_empty() { "report" } else { project };
        format!("{}_{}.md", project, job_id.simple())
    }
}

/// Render a report as a Markdown document.
pub fn render_markdown(project_name: &str, report: &AnalysisReport, generated_at: DateTime<Utc>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# {} - Repository Analysis\n", project_name);
    let _ = writeln!(out, "| | |");
    let _ = writeln!(out, "|---|---|");
    let _ = writeln!(out, "| **Repository URL** | {} |", report.repo_url);
    let _ = writeln!(
        out,
        "| **Generated** | {} |",
        generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    let _ = writeln!(out, "| **Analyzer** | repo-lens {} |\n", env!("CARGO_PKG_VERSION"));

    if !report.summary.trim().is_empty() {
        let _ = writeln!(out, "## Summary\n\n{}\n", report.summary.trim());
    }

    let _ = writeln!(out, "## Modules\n");
    for module in &report.modules {
        let _ = writeln!(out, "### {}\n", module.name);
        if !module.description.trim().is_empty() {
            let _ = writeln!(out, "{}\n", module.description.trim());
        }
        for file in &module.files {
            let _ = writeln!(out, "- `{}`", file);
        }
        if !module.files.is_empty() {
            out.push('\n');
        }
    }

    if !report.highlights.is_empty() {
        let _ = writeln!(out, "## Highlights\n");
        for highlight in &report.highlights {
            let _ = write!(out, "- **{}**", highlight.title);
            if !highlight.description.trim().is_empty() {
                let _ = write!(out, ": {}", highlight.description.trim());
            }
            if let Some(reference) = &highlight.reference {
                let _ = write!(out, " (`{}`)", reference);
            }
            out.push('\n');
        }
        out.push('\n');
    }

    if !report.principles.is_empty() {
        let _ = writeln!(out, "## Design Principles\n");
        for principle in &report.principles {
            let _ = writeln!(out, "### {}\n\n{}\n", principle.topic, principle.summary.trim());
        }
    }

    out
}

#[async_trait]
impl ReportRenderer for MarkdownReportRenderer {
    fn format(&self) -> &str {
        "markdown"
    }

    async fn render(
        &self,
        job_id: JobId,
        project_name: &str,
        report: &AnalysisReport,
    ) -> Result<ArtifactRef, RenderError> {
        let file_name = Self::file_name(job_id, project_name);
        let path = self.output_dir.join(&file_name);
        let document = render_markdown(project_name, report, Utc::now());

        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .map_err(|e| RenderError::Io(format!("{}: {}", self.output_dir.display(), e)))?;
        tokio::fs::write(&path, document)
            .await
            .map_err(|e| RenderError::Io(format!("{}: {}", path.display(), e)))?;
        info!("Report written to {}", path.display());

        Ok(ArtifactRef {
            download_url: format!("{}/{}", DOWNLOAD_PREFIX, file_name),
            file_name,
            path,
        })
    }

    fn artifact_path(&self, file_name: &str) -> Option<PathBuf> {
        if file_name.is_empty()
            || file_name.contains(['/', '\\'])
            || file_name.contains("..")
            || !file_name.ends_with(".md")
        {
            return None;
        }
        let path = self.output_dir.join(file_name);
        path.is_file().then_some(path)
    }

    async fn remove(&self, artifact: &ArtifactRef) -> Result<(), RenderError> {
        match tokio::fs::remove_file(&artifact.path).await {
            Ok(()) => {
                debug!("Removed expired artifact {}", artifact.file_name);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(RenderError::Io(format!("{}: {}", artifact.path.display(), e))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn report() -> AnalysisReport {
        AnalysisReport::from_value(json!({
            "repo_url": "https://github.com/acme/widgets",
            "summary": "Widget toolkit",
            "modules": [
                {"name": "core", "description": "Core types", "files": ["src/lib.rs"]},
                {"name": "cli", "files": []}
            ],
            "highlights": [
                {"title": "Zero-copy parsing", "description": "Uses slices", "reference": "src/parse.rs"}
            ],
            "principles": [{"topic": "Layering", "summary": "Strict boundaries"}]
        }))
        .unwrap()
    }

    #[test]
    fn markdown_contains_all_sections() {
        let doc = render_markdown("widgets", &report(), Utc::now());
        assert!(doc.starts_with("# widgets - Repository Analysis"));
        assert!(doc.contains("| **Repository URL** | https://github.com/acme/widgets |"));
        assert!(doc.contains("## Summary\n\nWidget toolkit"));
        assert!(doc.contains("### core\n\nCore types\n\n- `src/lib.rs`"));
        assert!(doc.contains("### cli"));
        assert!(doc.contains("- **Zero-copy parsing**: Uses slices (`src/parse.rs`)"));
        assert!(doc.contains("### Layering\n\nStrict boundaries"));
    }

    #[tokio::test]
    async fn render_writes_file_and_serves_it() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = MarkdownReportRenderer::new(dir.path().join("reports"));
        let job_id = JobId::new();

        let artifact = renderer.render(job_id, "widgets", &report()).await.unwrap();
        assert_eq!(artifact.file_name, format!("widgets_{}.md", job_id.simple()));
        assert_eq!(
            artifact.download_url,
            format!("/api/report/download/{}", artifact.file_name)
        );
        assert!(artifact.path.is_file());
        assert_eq!(renderer.artifact_path(&artifact.file_name), Some(artifact.path.clone()));

        renderer.remove(&artifact).await.unwrap();
        assert!(renderer.artifact_path(&artifact.file_name).is_none());
        // Removing twice is fine
        renderer.remove(&artifact).await.unwrap();
    }

    #[test]
    fn rejects_path_traversal() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("secret.md"), "x").unwrap();
        let renderer = MarkdownReportRenderer::new(dir.path().join("reports"));

        assert!(renderer.artifact_path("../secret.md").is_none());
        assert!(renderer.artifact_path("..\\secret.md").is_none());
        assert!(renderer.artifact_path("").is_none());
        assert!(renderer.artifact_path("missing.md").is_none());
    }

    #[test]
    fn sanitizes_project_names() {
        let id = JobId::new();
        let name = MarkdownReportRenderer::file_name(id, "../my repo");
        assert!(name.starts_with("_my_repo_"));
        assert!(!name.contains('/'));
        assert_eq!(MarkdownReportRenderer::file_name(id, "..").len(), "report_".len() + 32 + 3);
    }
}
