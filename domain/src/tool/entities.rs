//! Tool domain entities

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::collections::HashMap;

/// Definition of a repository-inspection tool that the model may call.
///
/// `input_schema` is a JSON Schema object, passed through to the model
/// provider unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Unique name of the tool (e.g., "read_file")
    pub name: String,
    /// Human-readable description
    pub description: String,
    /// JSON Schema for the tool arguments
    #[serde(default = "empty_object_schema")]
    pub input_schema: serde_json::Value,
}

fn empty_object_schema() -> serde_json::Value {
    serde_json::json!({ "type": "object", "properties": {} })
}

impl ToolDefinition {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema: empty_object_schema(),
        }
    }

    pub fn with_schema(mut self, schema: serde_json::Value) -> Self {
        self.input_schema = schema;
        self
    }

    /// Add a string parameter to an object schema.
    pub fn with_string_param(
        mut self,
        name: &str,
        description: &str,
        required: bool,
    ) -> Self {
        if let Some(obj) = self.input_schema.as_object_mut() {
            let props = obj
                .entry("properties")
                .or_insert_with(|| serde_json::json!({}));
            if let Some(props) = props.as_object_mut() {
                props.insert(
                    name.to_string(),
                    serde_json::json!({ "type": "string", "description": description }),
                );
            }
            if required {
                let req = obj
                    .entry("required")
                    .or_insert_with(|| serde_json::json!([]));
                if let Some(list) = req.as_array_mut() {
                    list.push(serde_json::Value::String(name.to_string()));
                }
            }
        }
        self
    }
}

/// Registry of the tools exposed to the model for one session.
///
/// Ordered by name so that the tool list sent to the model is stable.
#[derive(Debug, Clone, Default)]
pub struct ToolSpec {
    tools: BTreeMap<String, ToolDefinition>,
}

impl ToolSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, tool: ToolDefinition) -> Self {
        self.tools.insert(tool.name.clone(), tool);
        self
    }

    pub fn get(&self, name: &str) -> Option<&ToolDefinition> {
        self.tools.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn all(&self) -> impl Iterator<Item = &ToolDefinition> {
        self.tools.values()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tools.keys().map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

/// A call to a tool with arguments, as requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Correlation id shared by the `tool_call` and `tool_result` events
    pub call_id: String,
    /// Name of the tool to call
    pub tool_name: String,
    /// Arguments passed to the tool
    pub arguments: HashMap<String, serde_json::Value>,
}

impl ToolCall {
    pub fn new(call_id: impl Into<String>, tool_name: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            tool_name: tool_name.into(),
            arguments: HashMap::new(),
        }
    }

    pub fn with_arg(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.arguments.insert(key.into(), value.into());
        self
    }

    /// Get a string argument
    pub fn get_string(&self, key: &str) -> Option<&str> {
        self.arguments.get(key).and_then(|v| v.as_str())
    }

    /// Get a required string argument or return an error message
    pub fn require_string(&self, key: &str) -> Result<&str, String> {
        self.get_string(key)
            .ok_or_else(|| format!("Missing required argument: {}", key))
    }

    /// Arguments as a JSON object (for wire formats and logging).
    pub fn arguments_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.arguments
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }

    /// Display message key for the `tool_call` event.
    ///
    /// The UI translates these keys; the path, when present, follows a space.
    pub fn display_message(&self) -> String {
        let path = || {
            self.get_string("path")
                .or_else(|| self.get_string("file_path"))
                .unwrap_or("")
        };
        match self.tool_name.as_str() {
            "read_file" => format!("IsAnalyzingFile {}", path()).trim_end().to_string(),
            "list_directory" => format!("IsListingDirectory {}", path()).trim_end().to_string(),
            "get_repo_structure" => "IsGettingRepoStructure".to_string(),
            other => format!("IsExecuting {}", other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_definition_schema_builder() {
        let tool = ToolDefinition::new("read_file", "Read a file")
            .with_string_param("repoUrl", "Repository URL", true)
            .with_string_param("path", "File path", true)
            .with_string_param("ref", "Branch", false);

        let props = tool.input_schema["properties"].as_object().unwrap();
        assert_eq!(props.len(), 3);
        assert_eq!(tool.input_schema["required"], serde_json::json!(["repoUrl", "path"]));
    }

    #[test]
    fn test_tool_spec_is_ordered() {
        let spec = ToolSpec::new()
            .register(ToolDefinition::new("read_file", "Read"))
            .register(ToolDefinition::new("get_repo_structure", "Tree"))
            .register(ToolDefinition::new("list_directory", "List"));

        let names: Vec<_> = spec.names().collect();
        assert_eq!(names, vec!["get_repo_structure", "list_directory", "read_file"]);
        assert!(spec.contains("read_file"));
        assert!(spec.get("unknown").is_none());
        assert_eq!(spec.len(), 3);
    }

    #[test]
    fn test_display_messages() {
        let read = ToolCall::new("c1", "read_file").with_arg("path", "src/lib.rs");
        assert_eq!(read.display_message(), "IsAnalyzingFile src/lib.rs");

        let list = ToolCall::new("c2", "list_directory").with_arg("path", "src");
        assert_eq!(list.display_message(), "IsListingDirectory src");

        let list_root = ToolCall::new("c3", "list_directory");
        assert_eq!(list_root.display_message(), "IsListingDirectory");

        let tree = ToolCall::new("c4", "get_repo_structure");
        assert_eq!(tree.display_message(), "IsGettingRepoStructure");

        let other = ToolCall::new("c5", "search_code");
        assert_eq!(other.display_message(), "IsExecuting search_code");
    }

    #[test]
    fn test_require_string() {
        let call = ToolCall::new("c1", "read_file").with_arg("path", "README.md");
        assert_eq!(call.require_string("path"), Ok("README.md"));
        assert!(call.require_string("missing").is_err());
        assert_eq!(call.arguments_json()["path"], "README.md");
    }
}
