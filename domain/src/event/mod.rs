//! Analysis event vocabulary.
//!
//! Every session produces an ordered sequence of [`AnalysisEvent`]s:
//!
//! ```text
//! start ─┬─▶ token* ─┬─▶ complete
//!        │           └─▶ error
//!        └─▶ (tool_call ─▶ tool_result)* interleaved with tokens
//! ```
//!
//! On the wire each event is a JSON object `{type, data, timestamp}` with an
//! ISO-8601 UTC timestamp.

use crate::report::AnalysisReport;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Serialize, Serializer};

/// Event type discriminator, as it appears in the `type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Start,
    Token,
    ToolCall,
    ToolResult,
    Complete,
    Error,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Start => "start",
            EventKind::Token => "token",
            EventKind::ToolCall => "tool_call",
            EventKind::ToolResult => "tool_result",
            EventKind::Complete => "complete",
            EventKind::Error => "error",
        }
    }

    /// `complete` and `error` end a session.
    pub fn is_terminal(&self) -> bool {
        matches!(self, EventKind::Complete | EventKind::Error)
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed event content.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum EventPayload {
    Start {
        repo_url: String,
    },
    Token {
        content: String,
    },
    ToolCall {
        call_id: String,
        tool: String,
        message: String,
        arguments: serde_json::Value,
    },
    ToolResult {
        call_id: String,
        tool: String,
        success: bool,
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        result: Option<String>,
    },
    Complete(AnalysisReport),
    Error {
        error: String,
    },
}

impl EventPayload {
    pub fn kind(&self) -> EventKind {
        match self {
            EventPayload::Start { .. } => EventKind::Start,
            EventPayload::Token { .. } => EventKind::Token,
            EventPayload::ToolCall { .. } => EventKind::ToolCall,
            EventPayload::ToolResult { .. } => EventKind::ToolResult,
            EventPayload::Complete(_) => EventKind::Complete,
            EventPayload::Error { .. } => EventKind::Error,
        }
    }

    pub fn token(content: impl Into<String>) -> Self {
        EventPayload::Token {
            content: content.into(),
        }
    }

    pub fn error(error: impl Into<String>) -> Self {
        EventPayload::Error {
            error: error.into(),
        }
    }

    /// Correlation id for `tool_call` / `tool_result`.
    pub fn call_id(&self) -> Option<&str> {
        match self {
            EventPayload::ToolCall { call_id, .. } | EventPayload::ToolResult { call_id, .. } => {
                Some(call_id)
            }
            _ => None,
        }
    }
}

/// An immutable, timestamped event as emitted to a client.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisEvent {
    /// Zero-based position within the session's event sequence.
    pub sequence: u64,
    pub payload: EventPayload,
    pub timestamp: DateTime<Utc>,
}

impl AnalysisEvent {
    pub fn new(sequence: u64, payload: EventPayload, timestamp: DateTime<Utc>) -> Self {
        Self {
            sequence,
            payload,
            timestamp,
        }
    }

    pub fn kind(&self) -> EventKind {
        self.payload.kind()
    }

    pub fn is_terminal(&self) -> bool {
        self.kind().is_terminal()
    }

    pub fn timestamp_iso(&self) -> String {
        self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    /// Wire representation: `{type, data, timestamp}`.
    pub fn to_json(&self) -> serde_json::Value {
        let mut value = serde_json::to_value(&self.payload)
            .unwrap_or_else(|_| serde_json::json!({ "type": self.kind().as_str() }));
        if let Some(obj) = value.as_object_mut() {
            obj.insert(
                "timestamp".to_string(),
                serde_json::Value::String(self.timestamp_iso()),
            );
        }
        value
    }
}

impl Serialize for AnalysisEvent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn at(payload: EventPayload) -> AnalysisEvent {
        let ts = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        AnalysisEvent::new(0, payload, ts)
    }

    #[test]
    fn start_event_wire_shape() {
        let event = at(EventPayload::Start {
            repo_url: "github.com/acme/widgets".to_string(),
        });
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({
                "type": "start",
                "data": {"repo_url": "github.com/acme/widgets"},
                "timestamp": "2026-03-01T12:00:00.000Z"
            })
        );
    }

    #[test]
    fn token_and_error_wire_shape() {
        let token = at(EventPayload::token("Hel")).to_json();
        assert_eq!(token["type"], "token");
        assert_eq!(token["data"], json!({"content": "Hel"}));

        let error = at(EventPayload::error("step limit exceeded")).to_json();
        assert_eq!(error["type"], "error");
        assert_eq!(error["data"], json!({"error": "step limit exceeded"}));
    }

    #[test]
    fn tool_result_omits_missing_result() {
        let event = at(EventPayload::ToolResult {
            call_id: "c1".to_string(),
            tool: "read_file".to_string(),
            success: false,
            message: "Failed read_file: not found".to_string(),
            result: None,
        })
        .to_json();
        assert_eq!(event["type"], "tool_result");
        assert!(event["data"].get("result").is_none());
        assert_eq!(event["data"]["tool"], "read_file");
    }

    #[test]
    fn kinds_and_terminality() {
        assert!(EventKind::Complete.is_terminal());
        assert!(EventKind::Error.is_terminal());
        assert!(!EventKind::ToolCall.is_terminal());
        assert_eq!(EventKind::ToolResult.to_string(), "tool_result");
        assert_eq!(
            EventPayload::ToolCall {
                call_id: "x".to_string(),
                tool: "t".to_string(),
                message: String::new(),
                arguments: json!({}),
            }
            .call_id(),
            Some("x")
        );
    }
}
