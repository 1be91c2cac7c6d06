//! Analysis orchestration domain.
//!
//! - [`machine::AnalysisMachine`] - explicit state machine for the
//!   reasoning / tool-invocation loop
//! - [`failure::FailureReason`] - why a session ends in `Failed`

pub mod failure;
pub mod machine;

pub use failure::FailureReason;
pub use machine::{AnalysisLimits, AnalysisMachine, AnalysisPhase, Effect, MachineInput, Step};
