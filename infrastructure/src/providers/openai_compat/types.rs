//! Wire-format conversion between domain types and the chat completions API.

use lens_application::GenerationRequest;
use lens_domain::{Message, Role, ToolDefinition};
use serde_json::{Value, json};

/// Sampling settings sent with every request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplingOptions {
    pub temperature: f32,
    pub max_tokens: Option<u32>,
}

/// Build a streaming chat completions request body.
pub fn build_request_body(model: &str, options: SamplingOptions, request: &GenerationRequest) -> Value {
    let mut body = json!({
        "model": model,
        "stream": true,
        "temperature": options.temperature,
        "messages": request.messages.iter().map(message_to_wire).collect::<Vec<_>>(),
    });
    if let Some(max_tokens) = options.max_tokens {
        body["max_tokens"] = json!(max_tokens);
    }
    if !request.tools.is_empty() {
        body["tools"] = Value::Array(request.tools.iter().map(tool_to_wire).collect());
        body["tool_choice"] = json!("auto");
    }
    body
}

fn message_to_wire(message: &Message) -> Value {
    match message.role {
        Role::Assistant if !message.tool_calls.is_empty() => {
            let calls: Vec<Value> = message
                .tool_calls
                .iter()
                .map(|call| {
                    json!({
                        "id": call.call_id,
                        "type": "function",
                        "function": {
                            "name": call.tool_name,
                            "arguments": call.arguments_json().to_string(),
                        },
                    })
                })
                .collect();
            let content = if message.content.is_empty() {
                Value::Null
            } else {
                Value::String(message.content.clone())
            };
            json!({ "role": "assistant", "content": content, "tool_calls": calls })
        }
        Role::Tool => json!({
            "role": "tool",
            "tool_call_id": message.tool_call_id.clone().unwrap_or_default(),
            "content": message.content,
        }),
        role => json!({ "role": role.as_str(), "content": message.content }),
    }
}

fn tool_to_wire(tool: &ToolDefinition) -> Value {
    json!({
        "type": "function",
        "function": {
            "name": tool.name,
            "description": tool.description,
            "parameters": tool.input_schema,
        },
    })
}

/// Pull a readable message out of an error response body.
pub fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("message").or(Some(e)))
                .and_then(|m| m.as_str().map(str::to_string))
        })
        .unwrap_or_else(|| {
            let trimmed = body.trim();
            let end = trimmed.floor_char_boundary(500);
            trimmed[..end].to_string()
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use lens_domain::ToolCall;

    fn options() -> SamplingOptions {
        SamplingOptions {
            temperature: 0.2,
            max_tokens: None,
        }
    }

    #[test]
    fn request_body_carries_conversation_and_tools() {
        let call = ToolCall::new("call_1", "read_file").with_arg("path", "README.md");
        let request = GenerationRequest::new(vec![
            Message::system("sys"),
            Message::user("analyze"),
            Message::assistant_with_tools("", vec![call]),
            Message::tool("call_1", "# Title"),
        ])
        .with_tools(vec![
            ToolDefinition::new("read_file", "Read a file").with_string_param("path", "Path", true),
        ]);

        let body = build_request_body("gpt-4o-mini", options(), &request);
        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["stream"], true);
        assert!(body.get("max_tokens").is_none());

        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages[0]["role"], "system");
        assert_eq!(messages[2]["content"], Value::Null);
        assert_eq!(messages[2]["tool_calls"][0]["function"]["name"], "read_file");
        let args: Value =
            serde_json::from_str(messages[2]["tool_calls"][0]["function"]["arguments"].as_str().unwrap())
                .unwrap();
        assert_eq!(args["path"], "README.md");
        assert_eq!(messages[3]["role"], "tool");
        assert_eq!(messages[3]["tool_call_id"], "call_1");

        assert_eq!(body["tools"][0]["type"], "function");
        assert_eq!(body["tools"][0]["function"]["parameters"]["required"][0], "path");
    }

    #[test]
    fn request_body_without_tools() {
        let options = SamplingOptions {
            temperature: 0.7,
            max_tokens: Some(1024),
        };
        let body = build_request_body("m", options, &GenerationRequest::new(vec![Message::user("hi")]));
        assert!(body.get("tools").is_none());
        assert_eq!(body["max_tokens"], 1024);
    }

    #[test]
    fn extracts_error_messages() {
        assert_eq!(
            error_message(r#"{"error": {"message": "Incorrect API key", "type": "auth"}}"#),
            "Incorrect API key"
        );
        assert_eq!(error_message(r#"{"error": "quota"}"#), "quota");
        assert_eq!(error_message("  Bad Gateway \n"), "Bad Gateway");
    }
}
