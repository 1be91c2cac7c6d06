//! Streaming events for model generation.
//!
//! [`StreamEvent`] bridges provider-level streaming (SSE chunks from a chat
//! completions endpoint) to the orchestrator, which turns each text delta
//! into a `token` event as soon as it arrives.

use super::response::LlmResponse;

/// An event in a streaming model response.
///
/// A well-behaved stream is any number of `Delta`/`ToolCallDelta` events
/// followed by exactly one terminal event (`CompletedResponse` or `Error`).
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// A text chunk from the model.
    Delta(String),

    /// Incremental tool call data.
    ///
    /// Tool calls arrive in chunks: first `id` and `name`, then argument
    /// fragments that must be concatenated. `index` identifies the call when
    /// the model requests several in one turn.
    ToolCallDelta {
        index: usize,
        id: Option<String>,
        name: Option<String>,
        arguments_delta: Option<String>,
    },

    /// The full structured response (signals stream end).
    CompletedResponse(LlmResponse),

    /// An error that occurred during streaming (signals stream end).
    Error(String),
}

impl StreamEvent {
    /// Returns the text content if this is a Delta event.
    pub fn text(&self) -> Option<&str> {
        match self {
            StreamEvent::Delta(s) => Some(s),
            _ => None,
        }
    }

    /// Returns true if this event signals the end of the stream.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            StreamEvent::Error(_) | StreamEvent::CompletedResponse(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delta_text_returns_content() {
        let event = StreamEvent::Delta("hello".to_string());
        assert_eq!(event.text(), Some("hello"));
        assert!(!event.is_terminal());
    }

    #[test]
    fn error_is_terminal() {
        let event = StreamEvent::Error("oops".to_string());
        assert_eq!(event.text(), None);
        assert!(event.is_terminal());
    }

    #[test]
    fn tool_call_delta_is_not_terminal() {
        let event = StreamEvent::ToolCallDelta {
            index: 0,
            id: Some("call_1".to_string()),
            name: Some("read_file".to_string()),
            arguments_delta: None,
        };
        assert!(!event.is_terminal());
        assert_eq!(event.text(), None);
    }

    #[test]
    fn completed_response_is_terminal() {
        let event = StreamEvent::CompletedResponse(LlmResponse::from_text("done"));
        assert!(event.is_terminal());
    }
}
