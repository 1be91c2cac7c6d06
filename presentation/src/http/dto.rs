//! Request and response bodies.

use chrono::{DateTime, Utc};
use lens_domain::{Job, JobStatus};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
pub struct AnalyzeRequest {
    pub repo_url: String,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub llm_provider: Option<String>,
    #[serde(default)]
    pub llm_model: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub llm_provider: String,
    pub llm_model: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportAccepted {
    pub job_id: String,
    pub status: JobStatus,
    pub status_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobStatusResponse {
    pub job_id: String,
    pub status: JobStatus,
    pub progress: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<&Job> for JobStatusResponse {
    fn from(job: &Job) -> Self {
        Self {
            job_id: job.id.to_string(),
            status: job.status,
            progress: job.status.progress(),
            download_url: job.artifact.as_ref().map(|a| a.download_url.clone()),
            error: job.failure.clone(),
            created_at: job.submitted_at,
            completed_at: job.completed_at,
        }
    }
}

pub fn status_url(job_id: &str) -> String {
    format!("/api/report/export/{job_id}")
}
