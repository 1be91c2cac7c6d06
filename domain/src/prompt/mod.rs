//! Prompt domain
//!
//! Templates for the analysis conversation.

pub mod analysis;

pub use analysis::AnalysisPromptTemplate;
