//! JSONL file writer for session transcripts.
//!
//! Each [`TranscriptEvent`] is serialized as a single JSON line with a
//! `type` field and `timestamp`, appended to the session's own file via a
//! buffered writer. A session's file is opened on its first record and
//! closed by its `session_end` record.

use lens_application::{TranscriptEvent, TranscriptLogger};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::warn;

/// Transcript logger that writes one JSONL file per session.
///
/// Thread-safe via `Mutex`. Flushes after every record and on `Drop`.
pub struct JsonlTranscriptLogger {
    dir: PathBuf,
    writers: Mutex<HashMap<String, BufWriter<File>>>,
}

impl JsonlTranscriptLogger {
    /// Create a logger writing into `dir`.
    ///
    /// Creates the directory if it doesn't exist. Returns `None` if it
    /// cannot be created.
    pub fn new(dir: impl AsRef<Path>) -> Option<Self> {
        let dir = dir.as_ref();
        if let Err(e) = std::fs::create_dir_all(dir) {
            warn!(
                "Could not create transcript directory {}: {}",
                dir.display(),
                e
            );
            return None;
        }
        Some(Self {
            dir: dir.to_path_buf(),
            writers: Mutex::new(HashMap::new()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of a session's transcript file.
    pub fn session_path(&self, session_id: &str) -> PathBuf {
        let safe: String = session_id
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
            .collect();
        self.dir.join(format!("{safe}.transcript.jsonl"))
    }

    fn record(event: &TranscriptEvent) -> serde_json::Value {
        let timestamp = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true);

        // Merge payload with type + session + timestamp
        match &event.payload {
            serde_json::Value::Object(map) => {
                let mut map = map.clone();
                map.insert("type".to_string(), event.event_type.into());
                map.insert("session_id".to_string(), event.session_id.clone().into());
                map.insert("timestamp".to_string(), timestamp.into());
                serde_json::Value::Object(map)
            }
            other => serde_json::json!({
                "type": event.event_type,
                "session_id": event.session_id,
                "timestamp": timestamp,
                "data": other,
            }),
        }
    }
}

impl TranscriptLogger for JsonlTranscriptLogger {
    fn log(&self, event: TranscriptEvent) {
        let Ok(line) = serde_json::to_string(&Self::record(&event)) else {
            return;
        };
        let Ok(mut writers) = self.writers.lock() else {
            return;
        };

        if !writers.contains_key(&event.session_id) {
            let path = self.session_path(&event.session_id);
            match File::create(&path) {
                Ok(file) => {
                    writers.insert(event.session_id.clone(), BufWriter::new(file));
                }
                Err(e) => {
                    warn!("Could not create transcript file {}: {}", path.display(), e);
                    return;
                }
            }
        }

        if let Some(writer) = writers.get_mut(&event.session_id) {
            let _ = writeln!(writer, "{}", line);
            // Flush every record for crash safety; JSONL is append-only
            let _ = writer.flush();
        }
        if event.is_session_end() {
            writers.remove(&event.session_id);
        }
    }
}

impl Drop for JsonlTranscriptLogger {
    fn drop(&mut self) {
        if let Ok(mut writers) = self.writers.lock() {
            for writer in writers.values_mut() {
                let _ = writer.flush();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn read_lines(path: &Path) -> Vec<serde_json::Value> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[test]
    fn writes_one_file_per_session() {
        let dir = tempfile::tempdir().unwrap();
        let logger = JsonlTranscriptLogger::new(dir.path()).unwrap();

        logger.log(TranscriptEvent::new(
            "s-1",
            "model_turn",
            json!({"attempt": 1, "text": "hello"}),
        ));
        logger.log(TranscriptEvent::new(
            "s-2",
            "tool_result",
            json!({"tool": "read_file", "success": true}),
        ));
        logger.log(TranscriptEvent::new(
            "s-1",
            "session_end",
            json!({"status": "completed"}),
        ));
        drop(logger);

        let first = read_lines(&dir.path().join("s-1.transcript.jsonl"));
        assert_eq!(first.len(), 2);
        assert_eq!(first[0]["type"], "model_turn");
        assert_eq!(first[0]["text"], "hello");
        assert_eq!(first[1]["type"], "session_end");
        assert!(first.iter().all(|r| r["session_id"] == "s-1"));
        assert!(first[0]["timestamp"].as_str().unwrap().ends_with('Z'));

        let second = read_lines(&dir.path().join("s-2.transcript.jsonl"));
        assert_eq!(second.len(), 1);
        assert_eq!(second[0]["tool"], "read_file");
    }

    #[test]
    fn non_object_payload_is_wrapped() {
        let dir = tempfile::tempdir().unwrap();
        let logger = JsonlTranscriptLogger::new(dir.path()).unwrap();
        logger.log(TranscriptEvent::new("s", "note", json!("plain")));
        drop(logger);

        let lines = read_lines(&dir.path().join("s.transcript.jsonl"));
        assert_eq!(lines[0]["data"], "plain");
    }

    #[test]
    fn session_id_is_sanitized_for_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let logger = JsonlTranscriptLogger::new(dir.path()).unwrap();
        let path = logger.session_path("../evil");
        assert_eq!(path.parent().unwrap(), dir.path());
    }
}
