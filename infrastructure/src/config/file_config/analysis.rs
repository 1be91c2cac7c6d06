//! Orchestration limits from TOML (`[analysis]` section)

use lens_application::AnalysisParams;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileAnalysisConfig {
    /// Maximum tool invocations per session.
    pub max_tool_calls: usize,
    /// Maximum conversation size in characters.
    pub max_conversation_chars: usize,
    /// Retries for retryable model errors (before the turn's first token).
    pub max_model_retries: usize,
    /// Base backoff between retries, multiplied by the attempt number.
    pub retry_backoff_ms: u64,
    /// Upper bound for one tool invocation.
    pub tool_timeout_secs: u64,
}

impl Default for FileAnalysisConfig {
    fn default() -> Self {
        let params = AnalysisParams::default();
        Self {
            max_tool_calls: params.max_tool_calls,
            max_conversation_chars: params.max_conversation_chars,
            max_model_retries: params.max_model_retries,
            retry_backoff_ms: params.retry_backoff.as_millis() as u64,
            tool_timeout_secs: params.tool_timeout.as_secs(),
        }
    }
}

impl FileAnalysisConfig {
    /// Convert to application parameters; `event_buffer` comes from `[server]`.
    pub fn to_params(&self, event_buffer: usize) -> AnalysisParams {
        AnalysisParams::default()
            .with_max_tool_calls(self.max_tool_calls)
            .with_max_conversation_chars(self.max_conversation_chars)
            .with_max_model_retries(self.max_model_retries)
            .with_retry_backoff(Duration::from_millis(self.retry_backoff_ms))
            .with_tool_timeout(Duration::from_secs(self.tool_timeout_secs))
            .with_event_buffer(event_buffer)
    }
}
