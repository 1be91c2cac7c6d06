//! Repository reference value object.

use super::error::DomainError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A validated reference to a remote code repository.
///
/// Accepts both scheme-qualified URLs (`https://github.com/acme/widgets`)
/// and bare host paths (`github.com/acme/widgets`). The original text is
/// preserved so that it can be echoed back verbatim in the `start` event.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RepoRef {
    url: String,
    host: String,
    segments: Vec<String>,
}

impl RepoRef {
    pub fn parse(input: &str) -> Result<Self, DomainError> {
        let url = input.trim();
        if url.is_empty() {
            return Err(DomainError::InvalidRepoUrl("empty".to_string()));
        }
        if url.chars().any(char::is_whitespace) {
            return Err(DomainError::InvalidRepoUrl(url.to_string()));
        }

        let without_scheme = match url.split_once("://") {
            Some((scheme, rest)) => {
                if !matches!(scheme.to_ascii_lowercase().as_str(), "http" | "https") {
                    return Err(DomainError::InvalidRepoUrl(url.to_string()));
                }
                rest
            }
            None => url,
        };

        let without_query = without_scheme
            .split(['?', '#'])
            .next()
            .unwrap_or(without_scheme);
        let mut parts = without_query.split('/').filter(|p| !p.is_empty());

        let host = match parts.next() {
            Some(h) if h.contains('.') || h.starts_with("localhost") => h.to_ascii_lowercase(),
            _ => return Err(DomainError::InvalidRepoUrl(url.to_string())),
        };

        let segments: Vec<String> = parts
            .map(|s| s.trim_end_matches(".git").to_string())
            .filter(|s| !s.is_empty())
            .collect();

        if segments.len() < 2 {
            return Err(DomainError::InvalidRepoUrl(format!(
                "{url} (expected <host>/<owner>/<repository>)"
            )));
        }

        Ok(Self {
            url: url.to_string(),
            host,
            segments,
        })
    }

    /// The repository URL as submitted (trimmed).
    pub fn as_str(&self) -> &str {
        &self.url
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn owner(&self) -> &str {
        &self.segments[0]
    }

    pub fn name(&self) -> &str {
        &self.segments[1]
    }

    pub fn is_github(&self) -> bool {
        self.host == "github.com" || self.host == "www.github.com"
    }

    /// Fully qualified `https://` URL, used when talking to tool backends.
    pub fn canonical_url(&self) -> String {
        format!("https://{}/{}/{}", self.host, self.owner(), self.name())
    }

    /// Project name derived from the last path segment of the URL.
    pub fn project_name(&self) -> &str {
        self.segments
            .last()
            .map(String::as_str)
            .unwrap_or_else(|| self.name())
    }
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url)
    }
}

impl TryFrom<String> for RepoRef {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<RepoRef> for String {
    fn from(value: RepoRef) -> Self {
        value.url
    }
}

/// Derive a project name from an arbitrary URL-ish string.
///
/// Used for export jobs, whose `repo_url` is not required to be a valid
/// [`RepoRef`]. Falls back to `"project"` when nothing usable remains.
pub fn project_name_from_url(url: &str) -> String {
    let name = url
        .trim()
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or("")
        .trim_end_matches(".git");

    let sanitized: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if sanitized.is_empty() || sanitized.chars().all(|c| c == '.') {
        "project".to_string()
    } else {
        sanitized
    }
}
