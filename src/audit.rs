//! JSONL audit trail.
//!
//! The engine appends one JSON object per line for every state-changing
//! operation, so a vault's history can be replayed or inspected offline.
//! Lines are self-contained: the event name and timestamp are merged into
//! the payload object rather than wrapping it.

use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use chrono::Utc;
use serde_json::{Map, Value};

use crate::error::Result;

/// Append-only audit logger.
pub struct AuditLog {
    writer: BufWriter<std::fs::File>,
}

impl AuditLog {
    /// Open (or create) the audit log file for appending.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            writer: BufWriter::new(file),
        })
    }

    /// Append one event. `data` should be a JSON object; `event` and `ts`
    /// keys are merged into it (a non-object payload lands under `data`).
    /// Every line is flushed immediately so a crash loses at most the
    /// in-flight event.
    pub fn log(&mut self, event: &'static str, data: Value) -> Result<()> {
        let mut entry = match data {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                let mut map = Map::new();
                map.insert("data".to_owned(), other);
                map
            }
        };
        entry.insert("event".to_owned(), Value::String(event.to_owned()));
        entry.insert("ts".to_owned(), Value::String(Utc::now().to_rfc3339()));

        writeln!(self.writer, "{}", Value::Object(entry))?;
        self.writer.flush()?;
        Ok(())
    }
}

impl std::fmt::Debug for AuditLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditLog").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn audit_log_writes_jsonl() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vault_audit.jsonl");

        {
            let mut log = AuditLog::open(&path).unwrap();
            log.log("deposit", serde_json::json!({})).unwrap();
            log.log("redeem", serde_json::json!({"holder": "H1", "shares": 100}))
                .unwrap();
        }

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);

        for line in &lines {
            let parsed: Value = serde_json::from_str(line).unwrap();
            assert!(parsed["ts"].is_string());
        }
        assert!(lines[0].contains("\"event\":\"deposit\""));
        assert!(lines[1].contains("\"holder\":\"H1\""));
    }

    #[test]
    fn non_object_payload_nests_under_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");

        let mut log = AuditLog::open(&path).unwrap();
        log.log("note", serde_json::json!(42)).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let parsed: Value = serde_json::from_str(contents.trim()).unwrap();
        assert_eq!(parsed["event"], "note");
        assert_eq!(parsed["data"], 42);
    }

    #[test]
    fn audit_log_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sub").join("deep").join("audit.jsonl");

        let mut log = AuditLog::open(&path).unwrap();
        log.log("opened", serde_json::json!({})).unwrap();

        assert!(path.exists());
    }
}
