//! Report extraction from model output.
//!
//! The model is asked to finish with a JSON object. In practice it wraps it
//! in a ` ```json` fence, precedes it with prose, or both. Candidates are
//! tried from the most specific to the least:
//!
//! 1. fenced code blocks, last one first
//! 2. the whole text
//! 3. the first balanced `{ ... }` span

use super::entities::AnalysisReport;
use thiserror::Error;

/// Why the accumulated text could not be turned into a report.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReportError {
    #[error("no JSON object found in model output")]
    NoJson,

    #[error("malformed analysis result: {0}")]
    Malformed(String),

    #[error("analysis result has no modules")]
    NoModules,
}

/// Parse an [`AnalysisReport`] out of free-form model text.
///
/// When some candidate is valid JSON but fails validation, that validation
/// error is returned so the corrective prompt can mention it.
pub fn parse_report(text: &str) -> Result<AnalysisReport, ReportError> {
    let mut first_error: Option<ReportError> = None;

    for candidate in candidates(text) {
        let Ok(value) = serde_json::from_str::<serde_json::Value>(candidate.trim()) else {
            continue;
        };
        match AnalysisReport::from_value(value) {
            Ok(report) => return Ok(report),
            Err(e) => {
                first_error.get_or_insert(e);
            }
        }
    }

    Err(first_error.unwrap_or(ReportError::NoJson))
}

fn candidates(text: &str) -> Vec<&str> {
    let mut out: Vec<&str> = fenced_blocks(text).into_iter().rev().collect();
    out.push(text);
    if let Some(span) = balanced_object(text) {
        out.push(span);
    }
    out
}

/// Bodies of ` ``` ` / ` ```json` fenced blocks, in document order.
fn fenced_blocks(text: &str) -> Vec<&str> {
    let mut blocks = Vec::new();
    let mut rest = text;

    while let Some(open) = rest.find("```") {
        let after_ticks = &rest[open + 3..];
        // Skip the info string (e.g. "json") up to end of line
        let Some(newline) = after_ticks.find('\n') else {
            break;
        };
        let body_start = &after_ticks[newline + 1..];
        let Some(close) = body_start.find("```") else {
            break;
        };
        blocks.push(&body_start[..close]);
        rest = &body_start[close + 3..];
    }

    blocks
}

/// The first `{` and its matching `}`, honoring JSON string escapes.
fn balanced_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }

    None
}
