//! Export job domain.
//!
//! A job turns a finished [`AnalysisReport`](crate::report::AnalysisReport)
//! into a downloadable document, asynchronously.

pub mod entities;

pub use entities::{ArtifactRef, ExportRequest, Job, JobError, JobId, JobStatus};
