//! Progress reporting for export jobs

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use lens_domain::{Job, JobStatus};
use std::time::Duration;

/// Progress bar for one export job, driven by polling its status.
pub struct ExportProgress {
    bar: ProgressBar,
    last: Option<JobStatus>,
}

impl ExportProgress {
    pub fn new(label: &str) -> Self {
        let bar = ProgressBar::new(100);
        bar.set_style(Self::style());
        bar.set_prefix(label.to_string());
        bar.set_message("Queued");
        bar.enable_steady_tick(Duration::from_millis(120));
        Self { bar, last: None }
    }

    /// Progress bar that draws nothing, for `--quiet`-style output.
    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
            last: None,
        }
    }

    fn style() -> ProgressStyle {
        ProgressStyle::default_bar()
            .template("{spinner:.green} {prefix:.bold.cyan} [{bar:30.cyan/blue}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-")
    }

    fn status_message(status: JobStatus) -> &'static str {
        match status {
            JobStatus::Pending => "Queued",
            JobStatus::Running => "Rendering",
            JobStatus::Succeeded => "Done",
            JobStatus::Failed => "Failed",
        }
    }

    /// Reflect the latest snapshot; repeated statuses are ignored.
    pub fn update(&mut self, job: &Job) {
        if self.last == Some(job.status) {
            return;
        }
        self.last = Some(job.status);
        self.bar.set_position(u64::from(job.status.progress()));
        self.bar.set_message(Self::status_message(job.status));

        match job.status {
            JobStatus::Succeeded => {
                let file = job
                    .artifact
                    .as_ref()
                    .map(|a| a.path.display().to_string())
                    .unwrap_or_default();
                self.bar
                    .finish_with_message(format!("{} {}", "v".green(), file));
            }
            JobStatus::Failed => {
                let reason = job.failure.as_deref().unwrap_or("unknown error");
                self.bar
                    .abandon_with_message(format!("{} {}", "x".red(), reason));
            }
            JobStatus::Pending | JobStatus::Running => {}
        }
    }

    pub fn is_finished(&self) -> bool {
        self.bar.is_finished()
    }
}
