//! Server-sent event parsing for streamed chat completions.
//!
//! Each `data:` line carries one JSON chunk. Text deltas are forwarded as
//! soon as they arrive; tool-call fragments are accumulated by index and
//! assembled into [`ContentBlock::ToolUse`] blocks when the stream ends.

use futures::{Stream, StreamExt};
use lens_domain::{ContentBlock, LlmResponse, StopReason, StreamEvent};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt::Display;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// A classified SSE line.
#[derive(Debug, PartialEq)]
pub enum SseLine {
    Data(Value),
    Done,
    Skip,
}

pub fn parse_line(line: &str) -> SseLine {
    let line = line.trim();
    let Some(data) = line.strip_prefix("data:") else {
        // Comments (": keep-alive"), event names, blank separators
        return SseLine::Skip;
    };
    let data = data.trim();
    if data == "[DONE]" {
        return SseLine::Done;
    }
    match serde_json::from_str(data) {
        Ok(value) => SseLine::Data(value),
        Err(e) => {
            debug!("Skipping unparseable stream chunk: {}", e);
            SseLine::Skip
        }
    }
}

#[derive(Debug, Default)]
struct PendingToolCall {
    id: String,
    name: String,
    arguments: String,
}

/// Accumulates one streamed completion.
#[derive(Debug, Default)]
pub struct ChunkAccumulator {
    text: String,
    tool_calls: BTreeMap<usize, PendingToolCall>,
    finish_reason: Option<String>,
    model: Option<String>,
}

impl ChunkAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one chunk, returning the events to forward.
    pub fn apply(&mut self, chunk: &Value) -> Result<Vec<StreamEvent>, String> {
        if let Some(error) = chunk.get("error") {
            let message = error
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| error.to_string());
            return Err(message);
        }
        if self.model.is_none() {
            self.model = chunk.get("model").and_then(Value::as_str).map(str::to_string);
        }

        let mut events = Vec::new();
        let Some(choice) = chunk.get("choices").and_then(|c| c.get(0)) else {
            return Ok(events);
        };

        if let Some(delta) = choice.get("delta") {
            if let Some(content) = delta.get("content").and_then(Value::as_str)
                && !content.is_empty()
            {
                self.text.push_str(content);
                events.push(StreamEvent::Delta(content.to_string()));
            }

            for call in delta
                .get("tool_calls")
                .and_then(Value::as_array)
                .into_iter()
                .flatten()
            {
                let index = call.get("index").and_then(Value::as_u64).unwrap_or(0) as usize;
                let id = call.get("id").and_then(Value::as_str).map(str::to_string);
                let function = call.get("function");
                let name = function
                    .and_then(|f| f.get("name"))
                    .and_then(Value::as_str)
                    .map(str::to_string);
                let arguments_delta = function
                    .and_then(|f| f.get("arguments"))
                    .and_then(Value::as_str)
                    .map(str::to_string);

                let pending = self.tool_calls.entry(index).or_default();
                if let Some(id) = &id {
                    pending.id = id.clone();
                }
                if let Some(name) = &name {
                    pending.name.push_str(name);
                }
                if let Some(args) = &arguments_delta {
                    pending.arguments.push_str(args);
                }

                events.push(StreamEvent::ToolCallDelta {
                    index,
                    id,
                    name,
                    arguments_delta,
                });
            }
        }

        if let Some(reason) = choice.get("finish_reason").and_then(Value::as_str) {
            self.finish_reason = Some(reason.to_string());
        }
        Ok(events)
    }

    pub fn is_finished(&self) -> bool {
        self.finish_reason.is_some()
    }

    /// Assemble the final response.
    pub fn finish(self) -> LlmResponse {
        let mut content = Vec::new();
        if !self.text.is_empty() {
            content.push(ContentBlock::Text(self.text));
        }
        for (index, call) in self.tool_calls {
            if call.name.is_empty() {
                continue;
            }
            let input = parse_arguments(&call.name, &call.arguments);
            let id = if call.id.is_empty() {
                format!("call_{index}")
            } else {
                call.id
            };
            content.push(ContentBlock::ToolUse {
                id,
                name: call.name,
                input,
            });
        }

        let has_tools = content.iter().any(|b| b.as_tool_use().is_some());
        let stop_reason = match self.finish_reason.as_deref() {
            Some(reason) => StopReason::from_finish_reason(reason),
            None if has_tools => StopReason::ToolUse,
            None => StopReason::EndTurn,
        };

        LlmResponse {
            content,
            stop_reason: Some(stop_reason),
            model: self.model,
        }
    }
}

fn parse_arguments(tool: &str, raw: &str) -> HashMap<String, Value> {
    if raw.trim().is_empty() {
        return HashMap::new();
    }
    match serde_json::from_str::<HashMap<String, Value>>(raw) {
        Ok(map) => map,
        Err(e) => {
            warn!("Invalid arguments for tool {}: {}", tool, e);
            HashMap::new()
        }
    }
}

/// Drive a byte stream to completion, forwarding events to `tx`.
///
/// Returns early when the receiver is dropped; the caller drops the
/// underlying HTTP response, which aborts the request.
pub async fn pump<S, B, E>(stream: S, tx: mpsc::Sender<StreamEvent>)
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: Display,
{
    let mut stream = std::pin::pin!(stream);
    let mut accumulator = ChunkAccumulator::new();
    let mut buffer: Vec<u8> = Vec::new();
    let mut done = false;

    'read: while let Some(chunk) = stream.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) => {
                let _ = tx.send(StreamEvent::Error(format!("stream interrupted: {e}"))).await;
                return;
            }
        };
        buffer.extend_from_slice(chunk.as_ref());

        while let Some(pos) = buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line);
            match parse_line(&line) {
                SseLine::Skip => {}
                SseLine::Done => {
                    done = true;
                    break 'read;
                }
                SseLine::Data(value) => match accumulator.apply(&value) {
                    Ok(events) => {
                        for event in events {
                            if tx.send(event).await.is_err() {
                                return;
                            }
                        }
                    }
                    Err(message) => {
                        let _ = tx.send(StreamEvent::Error(message)).await;
                        return;
                    }
                },
            }
        }
    }

    // A final line without a trailing newline
    if !done && !buffer.is_empty() {
        let line = String::from_utf8_lossy(&buffer).into_owned();
        match parse_line(&line) {
            SseLine::Done => done = true,
            SseLine::Data(value) => {
                if let Ok(events) = accumulator.apply(&value) {
                    for event in events {
                        if tx.send(event).await.is_err() {
                            return;
                        }
                    }
                }
            }
            SseLine::Skip => {}
        }
    }

    let event = if done || accumulator.is_finished() {
        StreamEvent::CompletedResponse(accumulator.finish())
    } else {
        StreamEvent::Error("stream ended before completion".to_string())
    };
    let _ = tx.send(event).await;
}
