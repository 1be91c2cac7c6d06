//! Report document renderers.

mod markdown;

pub use markdown::{MarkdownReportRenderer, render_markdown};
