//! Prompt templates for repository analysis

use crate::core::locale::Locale;
use crate::core::repo::RepoRef;
use crate::tool::entities::ToolSpec;

/// Templates for generating analysis prompts
pub struct AnalysisPromptTemplate;

impl AnalysisPromptTemplate {
    /// System prompt: role, available tools, and output language.
    pub fn system(repo: &RepoRef, locale: &Locale, tool_spec: &ToolSpec) -> String {
        let tool_descriptions = tool_spec
            .all()
            .map(|t| format!("- **{}**: {}", t.name, t.description))
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            r#"You are a senior software architect who explains unfamiliar codebases.
You are analysing the repository {repo_url}.

## Available Tools

{tool_descriptions}

Always pass the repository URL `{canonical}` to tools that ask for one.

## Guidelines

1. Start from the repository structure, then read the files that define the architecture
2. Prefer entry points, manifests, and module roots over leaf files
3. Do not guess file contents: read them
4. If a tool fails, adjust and continue with what you have
5. Write every human-readable field of the final answer in {language}"#,
            repo_url = repo.as_str(),
            canonical = repo.canonical_url(),
            tool_descriptions = tool_descriptions,
            language = locale.display_name(),
        )
    }

    /// The task instruction, including the required output shape.
    pub fn analysis_request(repo: &RepoRef, locale: &Locale) -> String {
        format!(
            r#"Analyse the repository {repo_url} and explain how it is built.

When you have gathered enough information, reply with a single JSON object in a ```json fenced block with exactly this shape:

```json
{{
  "repo_url": "{repo_url}",
  "summary": "one paragraph overview",
  "modules": [
    {{"name": "module name", "description": "what it does", "files": ["path/to/file"]}}
  ],
  "highlights": [
    {{"title": "short title", "description": "why it is interesting", "reference": "path/to/file"}}
  ],
  "principles": [
    {{"topic": "architectural principle", "summary": "how the code applies it"}}
  ]
}}
```

`modules` must not be empty. Write descriptions in {language}."#,
            repo_url = repo.as_str(),
            language = locale.display_name(),
        )
    }

    /// Follow-up sent once when the final answer could not be parsed.
    pub fn correction(problem: &str) -> String {
        format!(
            r#"Your previous answer could not be used: {problem}.

Reply again with only the JSON object described earlier, inside a ```json fenced block. Do not call any more tools."#
        )
    }
}
