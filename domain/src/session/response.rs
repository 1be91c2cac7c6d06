//! Structured model responses.
//!
//! A completed model turn is a list of content blocks mixing text and
//! tool-use requests, plus the reason generation stopped.

use crate::tool::entities::ToolCall;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A single block of content within a model response.
///
/// # Examples
///
/// ```
/// use lens_domain::session::response::ContentBlock;
///
/// let text = ContentBlock::Text("Let me look at the layout.".to_string());
/// assert!(text.as_text().is_some());
///
/// let tool = ContentBlock::ToolUse {
///     id: "call_abc123".to_string(),
///     name: "get_repo_structure".to_string(),
///     input: Default::default(),
/// };
/// assert!(tool.as_tool_use().is_some());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    /// A text content block from the model.
    Text(String),

    /// A tool use request from the model.
    ToolUse {
        /// Provider-assigned id, reused as the event correlation id.
        id: String,
        /// Tool name as requested by the model.
        name: String,
        /// Parsed arguments.
        input: HashMap<String, serde_json::Value>,
    },
}

impl ContentBlock {
    /// Returns the text content if this is a `Text` block.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ContentBlock::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Returns `(id, name, input)` if this is a `ToolUse` block.
    pub fn as_tool_use(&self) -> Option<(&str, &str, &HashMap<String, serde_json::Value>)> {
        match self {
            ContentBlock::ToolUse { id, name, input } => Some((id, name, input)),
            _ => None,
        }
    }
}

/// Reason the model stopped generating.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Natural end of response.
    EndTurn,
    /// The model wants tools executed before continuing.
    ToolUse,
    /// Hit the token limit; text may be truncated.
    MaxTokens,
    /// Provider-specific stop reason.
    Other(String),
}

impl StopReason {
    /// Map an OpenAI-style `finish_reason` string.
    pub fn from_finish_reason(reason: &str) -> Self {
        match reason {
            "stop" => StopReason::EndTurn,
            "tool_calls" | "function_call" => StopReason::ToolUse,
            "length" => StopReason::MaxTokens,
            other => StopReason::Other(other.to_string()),
        }
    }
}

/// A completed model turn.
///
/// ```
/// use lens_domain::session::response::{LlmResponse, ContentBlock, StopReason};
///
/// let response = LlmResponse {
///     content: vec![
///         ContentBlock::Text("Reading README.".to_string()),
///         ContentBlock::ToolUse {
///             id: "call_1".to_string(),
///             name: "read_file".to_string(),
///             input: [("path".to_string(), serde_json::json!("README.md"))]
///                 .into_iter().collect(),
///         },
///     ],
///     stop_reason: Some(StopReason::ToolUse),
///     model: Some("gpt-4o-mini".to_string()),
/// };
/// assert!(response.has_tool_calls());
/// assert_eq!(response.tool_calls()[0].call_id, "call_1");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct LlmResponse {
    /// Content blocks in the response (text and/or tool use).
    pub content: Vec<ContentBlock>,
    /// Why the model stopped generating.
    pub stop_reason: Option<StopReason>,
    /// Model identifier (if returned by the API).
    pub model: Option<String>,
}

impl LlmResponse {
    /// Create a text-only response.
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ContentBlock::Text(text.into())],
            stop_reason: Some(StopReason::EndTurn),
            model: None,
        }
    }

    /// Concatenate all `Text` content blocks into a single string.
    pub fn text_content(&self) -> String {
        self.content
            .iter()
            .filter_map(|b| b.as_text())
            .collect::<Vec<_>>()
            .join("")
    }

    /// Extract all `ToolUse` content blocks as `Vec<ToolCall>`.
    pub fn tool_calls(&self) -> Vec<ToolCall> {
        self.content
            .iter()
            .filter_map(|b| match b {
                ContentBlock::ToolUse { id, name, input } => Some(ToolCall {
                    call_id: id.clone(),
                    tool_name: name.clone(),
                    arguments: input.clone(),
                }),
                _ => None,
            })
            .collect()
    }

    /// Returns `true` if the response contains any tool use requests.
    pub fn has_tool_calls(&self) -> bool {
        self.content
            .iter()
            .any(|b| matches!(b, ContentBlock::ToolUse { .. }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_text_creates_text_only_response() {
        let response = LlmResponse::from_text("Hello, world!");
        assert_eq!(response.text_content(), "Hello, world!");
        assert!(!response.has_tool_calls());
        assert!(response.tool_calls().is_empty());
        assert_eq!(response.stop_reason, Some(StopReason::EndTurn));
    }

    #[test]
    fn tool_calls_extraction() {
        let response = LlmResponse {
            content: vec![
                ContentBlock::Text("Let me read that file.".to_string()),
                ContentBlock::ToolUse {
                    id: "call_a".to_string(),
                    name: "read_file".to_string(),
                    input: [("path".to_string(), serde_json::json!("src/main.rs"))]
                        .into_iter()
                        .collect(),
                },
                ContentBlock::Text(" And list src.".to_string()),
                ContentBlock::ToolUse {
                    id: "call_b".to_string(),
                    name: "list_directory".to_string(),
                    input: [("path".to_string(), serde_json::json!("src"))]
                        .into_iter()
                        .collect(),
                },
            ],
            stop_reason: Some(StopReason::ToolUse),
            model: None,
        };

        assert_eq!(
            response.text_content(),
            "Let me read that file. And list src."
        );
        let calls = response.tool_calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].call_id, "call_a");
        assert_eq!(calls[0].get_string("path"), Some("src/main.rs"));
        assert_eq!(calls[1].tool_name, "list_directory");
    }

    #[test]
    fn finish_reason_mapping() {
        assert_eq!(StopReason::from_finish_reason("stop"), StopReason::EndTurn);
        assert_eq!(StopReason::from_finish_reason("tool_calls"), StopReason::ToolUse);
        assert_eq!(StopReason::from_finish_reason("length"), StopReason::MaxTokens);
        assert_eq!(
            StopReason::from_finish_reason("content_filter"),
            StopReason::Other("content_filter".to_string())
        );
    }
}
