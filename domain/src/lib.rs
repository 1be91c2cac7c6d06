//! Domain layer for repo-lens
//!
//! This crate contains the core business logic, entities, and value objects.
//! It has no dependencies on infrastructure or presentation concerns.
//!
//! # Core Concepts
//!
//! ## Analysis session
//!
//! A client submits a repository reference and receives a live, ordered
//! stream of [`AnalysisEvent`]s. The [`AnalysisMachine`] decides what
//! happens next: generate more text, invoke a repository-inspection tool,
//! or finish with a structured [`AnalysisReport`].
//!
//! ## Export job
//!
//! A finished report can be rendered into a document by an asynchronous
//! [`Job`] with monotonic `pending -> running -> succeeded | failed`
//! transitions.

pub mod analysis;
pub mod core;
pub mod event;
pub mod job;
pub mod prompt;
pub mod providers;
pub mod report;
pub mod session;
pub mod tool;

// Re-export commonly used types
pub use analysis::{
    AnalysisLimits, AnalysisMachine, AnalysisPhase, Effect, FailureReason, MachineInput, Step,
};
pub use core::{error::DomainError, locale::Locale, repo::RepoRef};
pub use event::{AnalysisEvent, EventKind, EventPayload};
pub use job::{ArtifactRef, ExportRequest, Job, JobError, JobId, JobStatus};
pub use prompt::AnalysisPromptTemplate;
pub use providers::{ApiProviderConfig, ProviderConfig, ProviderKind, ProviderSelection};
pub use report::{AnalysisReport, Highlight, ModuleSummary, Principle, ReportError, parse_report};
pub use session::{
    conversation::{Conversation, Message, Role},
    entities::{AnalysisSession, SessionStatus},
    response::{ContentBlock, LlmResponse, StopReason},
    stream::StreamEvent,
};
pub use tool::{
    entities::{ToolCall, ToolDefinition, ToolSpec},
    value_objects::{ToolError, ToolResult},
};
