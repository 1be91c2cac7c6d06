//! Analysis parameters: orchestration loop control.
//!
//! [`AnalysisParams`] groups the static parameters that control
//! [`RunAnalysisUseCase`](crate::use_cases::run_analysis::RunAnalysisUseCase).

use lens_domain::AnalysisLimits;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Orchestration loop control parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisParams {
    /// Maximum tool invocations per session.
    pub max_tool_calls: usize,
    /// Maximum conversation size in characters.
    pub max_conversation_chars: usize,
    /// Retries for retryable model errors before any token of the turn.
    pub max_model_retries: usize,
    /// Base delay between model retries (multiplied by the attempt number).
    pub retry_backoff: Duration,
    /// Upper bound for a single tool invocation.
    pub tool_timeout: Duration,
    /// Capacity of the per-session event channel.
    pub event_buffer: usize,
}

impl Default for AnalysisParams {
    fn default() -> Self {
        Self {
            max_tool_calls: 25,
            max_conversation_chars: 400_000,
            max_model_retries: 2,
            retry_backoff: Duration::from_millis(500),
            tool_timeout: Duration::from_secs(60),
            event_buffer: 64,
        }
    }
}

impl AnalysisParams {
    pub fn limits(&self) -> AnalysisLimits {
        AnalysisLimits {
            max_tool_calls: self.max_tool_calls,
            max_conversation_chars: self.max_conversation_chars,
        }
    }

    // ==================== Builder Methods ====================

    pub fn with_max_tool_calls(mut self, max: usize) -> Self {
        self.max_tool_calls = max;
        self
    }

    pub fn with_max_conversation_chars(mut self, max: usize) -> Self {
        self.max_conversation_chars = max;
        self
    }

    pub fn with_max_model_retries(mut self, max: usize) -> Self {
        self.max_model_retries = max;
        self
    }

    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    pub fn with_tool_timeout(mut self, timeout: Duration) -> Self {
        self.tool_timeout = timeout;
        self
    }

    pub fn with_event_buffer(mut self, capacity: usize) -> Self {
        self.event_buffer = capacity.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default() {
        let params = AnalysisParams::default();
        assert_eq!(params.max_tool_calls, 25);
        assert_eq!(params.max_model_retries, 2);
        assert_eq!(params.limits().max_conversation_chars, 400_000);
    }

    #[test]
    fn test_builder() {
        let params = AnalysisParams::default()
            .with_max_tool_calls(3)
            .with_event_buffer(0)
            .with_tool_timeout(Duration::from_secs(5));

        assert_eq!(params.limits().max_tool_calls, 3);
        assert_eq!(params.event_buffer, 1);
        assert_eq!(params.tool_timeout, Duration::from_secs(5));
    }
}
