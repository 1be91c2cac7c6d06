//! [`ToolExecutorPort`] implemented with the GitHub REST API.

use super::format::{MAX_TREE_ENTRIES, directory_listing, repo_tree, truncate_file};
use async_trait::async_trait;
use lens_application::ToolExecutorPort;
use lens_domain::{RepoRef, ToolCall, ToolDefinition, ToolError, ToolResult, ToolSpec};
use reqwest::{StatusCode, Url};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

pub const LIST_DIRECTORY: &str = "list_directory";
pub const READ_FILE: &str = "read_file";
pub const GET_REPO_STRUCTURE: &str = "get_repo_structure";

const USER_AGENT: &str = concat!("repo-lens/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone)]
pub struct GitHubToolsOptions {
    pub api_base_url: String,
    pub token: Option<String>,
    pub max_file_bytes: usize,
}

impl Default for GitHubToolsOptions {
    fn default() -> Self {
        Self {
            api_base_url: "https://api.github.com".to_string(),
            token: None,
            max_file_bytes: 100_000,
        }
    }
}

pub struct GitHubApiToolExecutor {
    client: reqwest::Client,
    options: GitHubToolsOptions,
    spec: ToolSpec,
}

fn tool_spec() -> ToolSpec {
    let repo_param = "GitHub repository URL, e.g. https://github.com/owner/repo";
    ToolSpec::new()
        .register(
            ToolDefinition::new(
                GET_REPO_STRUCTURE,
                "Get the full file tree of the repository, one path per line.",
            )
            .with_string_param("repoUrl", repo_param, true)
            .with_string_param("ref", "Branch, tag or commit (default branch if omitted)", false),
        )
        .register(
            ToolDefinition::new(
                LIST_DIRECTORY,
                "List the files and directories directly inside a repository directory.",
            )
            .with_string_param("repoUrl", repo_param, true)
            .with_string_param("path", "Directory path relative to the repository root", false)
            .with_string_param("ref", "Branch, tag or commit", false),
        )
        .register(
            ToolDefinition::new(READ_FILE, "Read the contents of a file in the repository.")
                .with_string_param("repoUrl", repo_param, true)
                .with_string_param("path", "File path relative to the repository root", true)
                .with_string_param("ref", "Branch, tag or commit", false),
        )
}

impl GitHubApiToolExecutor {
    pub fn new(client: reqwest::Client, options: GitHubToolsOptions) -> Self {
        Self {
            client,
            options,
            spec: tool_spec(),
        }
    }

    /// Build with a dedicated HTTP client bounded by `timeout`.
    pub fn with_timeout(options: GitHubToolsOptions, timeout: Duration) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(Duration::from_secs(15))
            .timeout(timeout)
            .build()?;
        Ok(Self::new(client, options))
    }

    fn repo(call: &ToolCall) -> Result<RepoRef, ToolError> {
        let url = call
            .get_string("repoUrl")
            .or_else(|| call.get_string("repo_url"))
            .ok_or_else(|| ToolError::invalid_argument("Missing required argument: repoUrl"))?;
        let repo = RepoRef::parse(url).map_err(|e| ToolError::invalid_argument(e.to_string()))?;
        if !repo.is_github() {
            return Err(ToolError::invalid_argument(format!(
                "{} is not a GitHub repository",
                repo
            )));
        }
        Ok(repo)
    }

    /// Build `{base}/repos/{owner}/{name}/{segments...}` with each segment
    /// percent-encoded.
    fn api_url(&self, repo: &RepoRef, segments: &[&str]) -> Result<Url, ToolError> {
        let mut url = Url::parse(&self.options.api_base_url)
            .map_err(|e| ToolError::execution_failed(format!("invalid API base URL: {e}")))?;
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| ToolError::execution_failed("invalid API base URL"))?;
            path.pop_if_empty()
                .extend(["repos", repo.owner(), repo.name()])
                .extend(segments.iter().flat_map(|s| s.split('/')).filter(|s| !s.is_empty()));
        }
        Ok(url)
    }

    async fn get(&self, url: Url, accept: &str, resource: &str) -> Result<reqwest::Response, ToolError> {
        debug!("GET {}", url);
        let mut request = self
            .client
            .get(url)
            .header("User-Agent", USER_AGENT)
            .header("Accept", accept)
            .header("X-GitHub-Api-Version", "2022-11-28");
        if let Some(token) = &self.options.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ToolError::execution_failed(format!("GitHub request failed: {e}")))?;

        match response.status() {
            s if s.is_success() => Ok(response),
            StatusCode::NOT_FOUND => Err(ToolError::not_found(resource)),
            StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS => Err(ToolError::execution_failed(
                "GitHub API rate limit exceeded or access denied",
            )
            .with_details(format!("HTTP {}", response.status().as_u16()))),
            s => Err(ToolError::execution_failed(format!(
                "HTTP error: {} {}",
                s.as_u16(),
                s.canonical_reason().unwrap_or("Unknown")
            ))),
        }
    }

    async fn get_json(&self, url: Url, resource: &str) -> Result<Value, ToolError> {
        self.get(url, "application/vnd.github+json", resource)
            .await?
            .json()
            .await
            .map_err(|e| ToolError::execution_failed(format!("invalid GitHub response: {e}")))
    }

    async fn default_branch(&self, repo: &RepoRef) -> Result<String, ToolError> {
        let meta = self.get_json(self.api_url(repo, &[])?, repo.as_str()).await?;
        Ok(meta
            .get("default_branch")
            .and_then(Value::as_str)
            .unwrap_or("HEAD")
            .to_string())
    }

    async fn repo_structure(&self, call: &ToolCall) -> Result<String, ToolError> {
        let repo = Self::repo(call)?;
        let git_ref = match call.get_string("ref") {
            Some(r) if !r.is_empty() => r.to_string(),
            _ => self.default_branch(&repo).await?,
        };
        let mut url = self.api_url(&repo, &["git", "trees", &git_ref])?;
        url.query_pairs_mut().append_pair("recursive", "1");
        let tree = self.get_json(url, &git_ref).await?;
        Ok(repo_tree(&tree, MAX_TREE_ENTRIES))
    }

    fn contents_url(&self, repo: &RepoRef, path: &str, call: &ToolCall) -> Result<Url, ToolError> {
        let mut url = self.api_url(repo, &["contents", path])?;
        if let Some(git_ref) = call.get_string("ref").filter(|r| !r.is_empty()) {
            url.query_pairs_mut().append_pair("ref", git_ref);
        }
        Ok(url)
    }

    async fn list_directory(&self, call: &ToolCall) -> Result<String, ToolError> {
        let repo = Self::repo(call)?;
        let path = call.get_string("path").unwrap_or("").trim_matches('/');
        let url = self.contents_url(&repo, path, call)?;
        let entries = self.get_json(url, if path.is_empty() { "/" } else { path }).await?;
        directory_listing(&entries)
            .ok_or_else(|| ToolError::invalid_argument(format!("{path} is a file, not a directory")))
    }

    async fn read_file(&self, call: &ToolCall) -> Result<String, ToolError> {
        let repo = Self::repo(call)?;
        let path = call
            .require_string("path")
            .map_err(ToolError::invalid_argument)?
            .trim_matches('/');
        let url = self.contents_url(&repo, path, call)?;
        let body = self
            .get(url, "application/vnd.github.raw+json", path)
            .await?
            .bytes()
            .await
            .map_err(|e| ToolError::execution_failed(format!("Failed to read response body: {e}")))?;
        let text = String::from_utf8_lossy(&body);
        Ok(truncate_file(&text, self.options.max_file_bytes))
    }
}

#[async_trait]
impl ToolExecutorPort for GitHubApiToolExecutor {
    fn tool_spec(&self) -> &ToolSpec {
        &self.spec
    }

    async fn execute(&self, call: &ToolCall) -> ToolResult {
        let outcome = match call.tool_name.as_str() {
            GET_REPO_STRUCTURE => self.repo_structure(call).await,
            LIST_DIRECTORY => self.list_directory(call).await,
            READ_FILE => self.read_file(call).await,
            other => Err(ToolError::unknown_tool(other)),
        };
        match outcome {
            Ok(output) => ToolResult::success(&call.call_id, &call.tool_name, output),
            Err(error) => ToolResult::failure(&call.call_id, &call.tool_name, error),
        }
    }
}
