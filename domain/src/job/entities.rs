//! Export job entities

use crate::core::repo::project_name_from_url;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;
use uuid::Uuid;

/// Errors raised by job state changes and submission checks.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JobError {
    #[error("Invalid export request: {0}")]
    InvalidRequest(String),

    #[error("Illegal job transition {from} -> {to}")]
    IllegalTransition { from: JobStatus, to: JobStatus },

    #[error("Job not found: {0}")]
    NotFound(JobId),

    #[error("Job queue is shut down")]
    QueueClosed,
}

/// Opaque job identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn parse(s: &str) -> Option<Self> {
        Uuid::parse_str(s.trim()).ok().map(Self)
    }

    /// Short form used in file names.
    pub fn simple(&self) -> String {
        self.0.simple().to_string()
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Job lifecycle. Transitions only move forward:
///
/// ```text
/// pending ──▶ running ──▶ succeeded
///                    └──▶ failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Succeeded => "succeeded",
            JobStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Succeeded | JobStatus::Failed)
    }

    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Pending, JobStatus::Running)
                | (JobStatus::Pending, JobStatus::Failed)
                | (JobStatus::Running, JobStatus::Succeeded)
                | (JobStatus::Running, JobStatus::Failed)
        )
    }

    /// Coarse progress hint for pollers.
    pub fn progress(&self) -> u8 {
        match self {
            JobStatus::Pending => 0,
            JobStatus::Running => 50,
            JobStatus::Succeeded | JobStatus::Failed => 100,
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Input of an export job: a finished analysis plus presentation metadata.
///
/// `analysis_result` is kept as raw JSON; its schema is checked by the
/// worker so that a malformed analysis ends as a `failed` job with a
/// reason rather than a rejected submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportRequest {
    pub analysis_result: serde_json::Value,
    pub repo_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_name: Option<String>,
}

impl ExportRequest {
    pub fn new(analysis_result: serde_json::Value, repo_url: impl Into<String>) -> Self {
        Self {
            analysis_result,
            repo_url: repo_url.into(),
            project_name: None,
        }
    }

    pub fn with_project_name(mut self, name: impl Into<String>) -> Self {
        self.project_name = Some(name.into());
        self
    }

    /// Envelope checks performed at submission time.
    pub fn validate(&self) -> Result<(), JobError> {
        if self.repo_url.trim().is_empty() {
            return Err(JobError::InvalidRequest("repo_url is empty".to_string()));
        }
        if self.analysis_result.is_null() {
            return Err(JobError::InvalidRequest(
                "analysis_result is missing".to_string(),
            ));
        }
        Ok(())
    }

    /// Explicit project name, or the last segment of `repo_url`.
    pub fn resolved_project_name(&self) -> String {
        match self.project_name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => project_name_from_url(name),
            _ => project_name_from_url(&self.repo_url),
        }
    }
}

/// Where a rendered document can be fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRef {
    pub file_name: String,
    #[serde(skip)]
    pub path: PathBuf,
    pub download_url: String,
}

/// An export job (Entity).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub status: JobStatus,
    pub request: ExportRequest,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact: Option<ArtifactRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
    pub submitted_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Job {
    pub fn new(request: ExportRequest, now: DateTime<Utc>) -> Self {
        Self {
            id: JobId::new(),
            status: JobStatus::Pending,
            request,
            artifact: None,
            failure: None,
            submitted_at: now,
            started_at: None,
            completed_at: None,
        }
    }

    fn transition(&mut self, to: JobStatus) -> Result<(), JobError> {
        if !self.status.can_transition_to(to) {
            return Err(JobError::IllegalTransition {
                from: self.status,
                to,
            });
        }
        self.status = to;
        Ok(())
    }

    pub fn start(&mut self, now: DateTime<Utc>) -> Result<(), JobError> {
        self.transition(JobStatus::Running)?;
        self.started_at = Some(now);
        Ok(())
    }

    pub fn succeed(&mut self, artifact: ArtifactRef, now: DateTime<Utc>) -> Result<(), JobError> {
        self.transition(JobStatus::Succeeded)?;
        self.artifact = Some(artifact);
        self.completed_at = Some(now);
        Ok(())
    }

    pub fn fail(&mut self, reason: impl Into<String>, now: DateTime<Utc>) -> Result<(), JobError> {
        self.transition(JobStatus::Failed)?;
        self.failure = Some(reason.into());
        self.completed_at = Some(now);
        Ok(())
    }

    /// Terminal jobs completed before `cutoff` may be evicted.
    pub fn is_expired(&self, cutoff: DateTime<Utc>) -> bool {
        self.status.is_terminal() && self.completed_at.is_some_and(|t| t < cutoff)
    }
}
