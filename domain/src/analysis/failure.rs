//! Reasons an analysis session fails.

use crate::report::ReportError;
use thiserror::Error;

/// Why a session ended in `Failed`. The `Display` text becomes the `error`
/// event's message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    #[error("step limit exceeded")]
    StepLimitExceeded,

    #[error("conversation exceeded {limit} characters")]
    ConversationTooLarge { limit: usize },

    #[error("model error: {0}")]
    Model(String),

    #[error("tool contract violation: {0}")]
    ToolContract(String),

    #[error("{0}")]
    InvalidResult(ReportError),
}
