//! Terminal output for analysis sessions

pub mod console;
pub mod formatter;

pub use console::{ConsoleFormatter, JsonLinesFormatter};
pub use formatter::EventFormatter;
