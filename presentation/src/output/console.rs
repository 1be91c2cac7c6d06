//! Console output for analysis events

use crate::output::formatter::EventFormatter;
use colored::Colorize;
use lens_domain::{AnalysisEvent, AnalysisReport, EventPayload};

/// Human-readable output: streamed model text, tool activity and the final
/// report.
#[derive(Debug, Default)]
pub struct ConsoleFormatter {
    /// Show streamed model text; off by default since the final turn is
    /// usually raw JSON that the report section repeats.
    show_tokens: bool,
    mid_line: bool,
}

impl ConsoleFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tokens(mut self, show: bool) -> Self {
        self.show_tokens = show;
        self
    }

    /// Terminate a partially printed token line before a block of output.
    fn break_line(&mut self, out: &mut String) {
        if self.mid_line {
            out.push('\n');
            self.mid_line = false;
        }
    }

    fn header(title: &str) -> String {
        let line = "=".repeat(60);
        format!("\n{}\n{}\n{}\n", line.cyan(), title.cyan().bold(), line.cyan())
    }

    fn section_header(title: &str) -> String {
        format!("\n{}\n", format!("── {} ──", title).yellow().bold())
    }

    /// Format a finished report.
    pub fn format_report(report: &AnalysisReport) -> String {
        let mut output = Self::header("Repository Analysis");

        if !report.repo_url.is_empty() {
            output.push_str(&format!("{} {}\n", "Repository:".cyan().bold(), report.repo_url));
        }
        if !report.summary.is_empty() {
            output.push_str(&Self::section_header("Summary"));
            output.push_str(&format!("{}\n", report.summary));
        }

        if !report.modules.is_empty() {
            output.push_str(&Self::section_header("Modules"));
            for module in &report.modules {
                output.push_str(&format!("\n{}\n", module.name.bold()));
                if !module.description.is_empty() {
                    output.push_str(&format!("  {}\n", module.description));
                }
                for file in &module.files {
                    output.push_str(&format!("  {} {}\n", "-".dimmed(), file.dimmed()));
                }
            }
        }

        if !report.highlights.is_empty() {
            output.push_str(&Self::section_header("Highlights"));
            for highlight in &report.highlights {
                output.push_str(&format!("  * {}: {}", highlight.title.bold(), highlight.description));
                if let Some(reference) = &highlight.reference {
                    output.push_str(&format!(" ({})", reference.dimmed()));
                }
                output.push('\n');
            }
        }

        if !report.principles.is_empty() {
            output.push_str(&Self::section_header("Design Principles"));
            for principle in &report.principles {
                output.push_str(&format!("  * {}: {}\n", principle.topic.bold(), principle.summary));
            }
        }

        output
    }
}

impl EventFormatter for ConsoleFormatter {
    fn format_event(&mut self, event: &AnalysisEvent) -> String {
        let mut out = String::new();
        match &event.payload {
            EventPayload::Start { repo_url } => {
                out.push_str(&format!("{} {}\n", "Analyzing".green().bold(), repo_url));
            }
            EventPayload::Token { content } => {
                if self.show_tokens && !content.is_empty() {
                    out.push_str(&content.dimmed().to_string());
                    self.mid_line = !content.ends_with('\n');
                }
            }
            EventPayload::ToolCall { message, .. } => {
                self.break_line(&mut out);
                out.push_str(&format!("{} {}\n", "→".cyan(), message));
            }
            EventPayload::ToolResult {
                success, message, ..
            } => {
                self.break_line(&mut out);
                if *success {
                    out.push_str(&format!("  {} {}\n", "✓".green(), message.dimmed()));
                } else {
                    out.push_str(&format!("  {} {}\n", "✗".red(), message.red()));
                }
            }
            EventPayload::Complete(report) => {
                self.break_line(&mut out);
                out.push_str(&Self::format_report(report));
            }
            EventPayload::Error { error } => {
                self.break_line(&mut out);
                out.push_str(&format!("{} {}\n", "Error:".red().bold(), error));
            }
        }
        out
    }

    fn finish(&mut self) -> String {
        let mut out = String::new();
        self.break_line(&mut out);
        out
    }
}

/// One JSON object per line, same shape as the SSE `data` field.
#[derive(Debug, Default)]
pub struct JsonLinesFormatter;

impl EventFormatter for JsonLinesFormatter {
    fn format_event(&mut self, event: &AnalysisEvent) -> String {
        format!("{}\n", event.to_json())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use lens_domain::ModuleSummary;

    fn event(seq: u64, payload: EventPayload) -> AnalysisEvent {
        AnalysisEvent::new(seq, payload, Utc::now())
    }

    fn plain() {
        colored::control::set_override(false);
    }

    #[test]
    fn tokens_hidden_by_default() {
        plain();
        let mut formatter = ConsoleFormatter::new();
        assert!(formatter.format_event(&event(1, EventPayload::token("{"))).is_empty());
        assert!(formatter.finish().is_empty());
    }

    #[test]
    fn breaks_token_line_before_tool_activity() {
        plain();
        let mut formatter = ConsoleFormatter::new().with_tokens(true);
        assert_eq!(formatter.format_event(&event(1, EventPayload::token("Let me look"))), "Let me look");

        let out = formatter.format_event(&event(
            2,
            EventPayload::ToolCall {
                call_id: "c1".into(),
                tool: "read_file".into(),
                message: "IsAnalyzingFile src/lib.rs".into(),
                arguments: serde_json::json!({"path": "src/lib.rs"}),
            },
        ));
        assert_eq!(out, "\n→ IsAnalyzingFile src/lib.rs\n");
        assert!(formatter.finish().is_empty());
    }

    #[test]
    fn formats_report_sections() {
        plain();
        let report = AnalysisReport {
            repo_url: "https://github.com/acme/widgets".into(),
            summary: "Widgets".into(),
            modules: vec![ModuleSummary {
                name: "core".into(),
                description: "Core types".into(),
                files: vec!["src/lib.rs".into()],
            }],
            highlights: vec![],
            principles: vec![],
        };
        let out = ConsoleFormatter::format_report(&report);
        assert!(out.contains("Repository: https://github.com/acme/widgets"));
        assert!(out.contains("── Modules ──"));
        assert!(out.contains("src/lib.rs"));
        assert!(!out.contains("Highlights"));
    }

    #[test]
    fn json_lines_carry_type() {
        let mut formatter = JsonLinesFormatter;
        let line = formatter.format_event(&event(0, EventPayload::error("boom")));
        let value: serde_json::Value = serde_json::from_str(line.trim_end()).unwrap();
        assert_eq!(value["type"], "error");
        assert!(line.ends_with('\n'));
    }
}
