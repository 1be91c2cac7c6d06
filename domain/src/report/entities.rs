//! Structured analysis result.

use super::parser::ReportError;
use serde::{Deserialize, Serialize};

/// A logical module of the analysed repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleSummary {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub files: Vec<String>,
}

/// A notable implementation detail worth pointing out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Highlight {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

/// An architectural note: a design principle the codebase follows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Principle {
    pub topic: String,
    #[serde(default)]
    pub summary: String,
}

/// The payload of the `complete` event and the input of an export job.
///
/// `modules`, `highlights`, and `principles` must all be present;
/// `modules` must additionally be non-empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    #[serde(default)]
    pub repo_url: String,
    #[serde(default)]
    pub summary: String,
    pub modules: Vec<ModuleSummary>,
    pub highlights: Vec<Highlight>,
    #[serde(alias = "architecture")]
    pub principles: Vec<Principle>,
}

impl AnalysisReport {
    /// Deserialize and validate a JSON value.
    pub fn from_value(value: serde_json::Value) -> Result<Self, ReportError> {
        if !value.is_object() {
            return Err(ReportError::Malformed(
                "expected a JSON object".to_string(),
            ));
        }
        let report: AnalysisReport =
            serde_json::from_value(value).map_err(|e| ReportError::Malformed(e.to_string()))?;
        report.validate()?;
        Ok(report)
    }

    pub fn validate(&self) -> Result<(), ReportError> {
        if self.modules.is_empty() {
            return Err(ReportError::NoModules);
        }
        if let Some(idx) = self.modules.iter().position(|m| m.name.trim().is_empty()) {
            return Err(ReportError::Malformed(format!(
                "module #{} has an empty name",
                idx + 1
            )));
        }
        Ok(())
    }

    /// Fill in the repository URL when the model left it out.
    pub fn with_repo_url_fallback(mut self, repo_url: &str) -> Self {
        if self.repo_url.trim().is_empty() {
            self.repo_url = repo_url.to_string();
        }
        self
    }

    pub fn file_count(&self) -> usize {
        self.modules.iter().map(|m| m.files.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> serde_json::Value {
        json!({
            "repo_url": "https://github.com/acme/widgets",
            "summary": "Widget toolkit",
            "modules": [
                {"name": "core", "description": "Core types", "files": ["src/core.rs", "src/lib.rs"]}
            ],
            "highlights": [
                {"title": "Zero-copy parsing", "description": "Uses slices", "reference": "src/parse.rs"}
            ],
            "principles": [
                {"topic": "Layering", "summary": "Strict module boundaries"}
            ]
        })
    }

    #[test]
    fn from_value_accepts_complete_report() {
        let report = AnalysisReport::from_value(sample()).unwrap();
        assert_eq!(report.modules.len(), 1);
        assert_eq!(report.file_count(), 2);
        assert_eq!(report.highlights[0].reference.as_deref(), Some("src/parse.rs"));
    }

    #[test]
    fn from_value_rejects_missing_sections() {
        let mut value = sample();
        value.as_object_mut().unwrap().remove("highlights");
        let err = AnalysisReport::from_value(value).unwrap_err();
        assert!(err.to_string().contains("highlights"));
    }

    #[test]
    fn from_value_rejects_empty_modules() {
        let mut value = sample();
        value["modules"] = json!([]);
        assert_eq!(
            AnalysisReport::from_value(value).unwrap_err(),
            ReportError::NoModules
        );
    }

    #[test]
    fn from_value_rejects_non_object() {
        assert!(matches!(
            AnalysisReport::from_value(json!("text")),
            Err(ReportError::Malformed(_))
        ));
    }

    #[test]
    fn architecture_alias_is_accepted() {
        let mut value = sample();
        let principles = value.as_object_mut().unwrap().remove("principles").unwrap();
        value["architecture"] = principles;
        let report = AnalysisReport::from_value(value).unwrap();
        assert_eq!(report.principles[0].topic, "Layering");
    }

    #[test]
    fn repo_url_fallback_only_when_empty() {
        let mut value = sample();
        value["repo_url"] = json!("");
        let report = AnalysisReport::from_value(value)
            .unwrap()
            .with_repo_url_fallback("github.com/acme/widgets");
        assert_eq!(report.repo_url, "github.com/acme/widgets");

        let kept = AnalysisReport::from_value(sample())
            .unwrap()
            .with_repo_url_fallback("other");
        assert_eq!(kept.repo_url, "https://github.com/acme/widgets");
    }
}
