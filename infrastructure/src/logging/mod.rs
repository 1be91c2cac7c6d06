//! Logging infrastructure: structured session transcripts.
//!
//! Provides [`JsonlTranscriptLogger`], a JSONL file writer that implements
//! the [`TranscriptLogger`](lens_application::TranscriptLogger) port.

mod jsonl_transcript;

pub use jsonl_transcript::JsonlTranscriptLogger;
