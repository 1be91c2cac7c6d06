//! Application layer for repo-lens
//!
//! This crate contains use cases, port definitions, and application configuration.
//! It depends only on the domain layer.

pub mod config;
pub mod ports;
pub mod use_cases;

// Re-export commonly used types
pub use config::{AnalysisParams, ExportParams};
pub use ports::{
    job_store::JobStore,
    model_gateway::{GatewayError, GenerationRequest, ModelGateway, ModelResolver, StreamHandle},
    report_renderer::{RenderError, ReportRenderer},
    tool_executor::ToolExecutorPort,
    transcript_logger::{NoTranscriptLogger, TranscriptEvent, TranscriptLogger},
};
pub use use_cases::event_stream::{EventSink, EventStream, SinkClosed, event_channel};
pub use use_cases::export_queue::ExportJobQueue;
pub use use_cases::run_analysis::{
    AnalysisError, AnalysisOutcome, RunAnalysisInput, RunAnalysisUseCase,
};
