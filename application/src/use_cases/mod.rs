//! Use cases
//!
//! Application-level operations that orchestrate domain logic.

pub mod event_stream;
pub mod export_queue;
pub mod run_analysis;
