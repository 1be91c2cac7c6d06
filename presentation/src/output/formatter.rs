//! Output formatter trait

use lens_domain::AnalysisEvent;

/// Turns analysis events into terminal output.
///
/// Formatters may keep state between events (e.g. whether streamed tokens
/// left the cursor mid-line).
pub trait EventFormatter {
    /// Text to print for one event; may be empty.
    fn format_event(&mut self, event: &AnalysisEvent) -> String;

    /// Text to print after the stream ended.
    fn finish(&mut self) -> String {
        String::new()
    }
}
