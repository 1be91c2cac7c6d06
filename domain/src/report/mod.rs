//! Analysis report domain.
//!
//! - [`entities::AnalysisReport`] - modules, highlights and architectural
//!   principles of a repository
//! - [`parser::parse_report`] - extraction from model output

pub mod entities;
pub mod parser;

pub use entities::{AnalysisReport, Highlight, ModuleSummary, Principle};
pub use parser::{ReportError, parse_report};
