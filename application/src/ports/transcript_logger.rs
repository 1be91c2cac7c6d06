//! Port for structured transcript logging.
//!
//! Defines the [`TranscriptLogger`] trait for recording what happened in an
//! analysis session (model turns, tool invocations, outcome) to a
//! machine-readable log.
//!
//! This is separate from `tracing`-based operation logs: tracing handles
//! human-readable diagnostics, while this port captures the transcript of
//! a session (JSONL).

use serde_json::Value;

/// A structured transcript record.
pub struct TranscriptEvent {
    /// Session the record belongs to.
    pub session_id: String,
    /// Record type (e.g., "model_turn", "tool_result", "session_end").
    pub event_type: &'static str,
    /// JSON payload with record-specific data.
    pub payload: Value,
}

impl TranscriptEvent {
    pub fn new(session_id: impl Into<String>, event_type: &'static str, payload: Value) -> Self {
        Self {
            session_id: session_id.into(),
            event_type,
            payload,
        }
    }

    /// `session_end` closes the session's transcript.
    pub fn is_session_end(&self) -> bool {
        self.event_type == "session_end"
    }
}

/// Port for logging transcript records.
///
/// The `log` method is synchronous and non-fallible: logging failures must
/// never disturb a running session.
pub trait TranscriptLogger: Send + Sync {
    fn log(&self, event: TranscriptEvent);
}

/// No-op implementation for tests and when transcripts are disabled.
pub struct NoTranscriptLogger;

impl TranscriptLogger for NoTranscriptLogger {
    fn log(&self, _event: TranscriptEvent) {}
}
