//! Port definitions (interfaces for external adapters)
//!
//! Ports define the contracts that infrastructure adapters must implement.

pub mod job_store;
pub mod model_gateway;
pub mod report_renderer;
pub mod tool_executor;
pub mod transcript_logger;
