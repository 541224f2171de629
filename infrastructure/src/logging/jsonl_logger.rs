//! JSONL file writer for forecast events.
//!
//! Each [`ForecastEvent`] becomes one JSON line carrying its payload plus
//! `type` and `timestamp` fields. Files are opened in append mode so
//! consecutive runs share a daily file.

use chrono::{SecondsFormat, Utc};
use forecast_application::{ForecastEvent, ForecastEventLogger};
use serde_json::{Map, Value};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::warn;

/// JSONL forecast event logger.
///
/// Thread-safe via `Mutex<BufWriter<File>>`. Flushes after every event and on `Drop`.
pub struct JsonlForecastLogger {
    writer: Mutex<BufWriter<File>>,
    path: PathBuf,
}

impl JsonlForecastLogger {
    /// Open (or create) the log file at `path`, creating parent directories.
    pub fn open(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            writer: Mutex::new(BufWriter::new(file)),
            path: path.to_path_buf(),
        })
    }

    /// Open `forecast-events-<YYYY-MM-DD>.jsonl` inside `dir`.
    ///
    /// Returns `None` (after a warning) when the file cannot be opened, so
    /// a broken log directory never stops a run.
    pub fn in_dir(dir: impl AsRef<Path>) -> Option<Self> {
        let path = dir.as_ref().join(format!(
            "forecast-events-{}.jsonl",
            Utc::now().format("%Y-%m-%d")
        ));
        match Self::open(&path) {
            Ok(logger) => Some(logger),
            Err(e) => {
                warn!("Could not open event log {}: {}", path.display(), e);
                None
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn record(event: ForecastEvent) -> Value {
        let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        let mut map = match event.payload {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                let mut map = Map::new();
                map.insert("data".to_string(), other);
                map
            }
        };
        map.insert("type".to_string(), Value::String(event.event_type.to_string()));
        map.insert("timestamp".to_string(), Value::String(timestamp));
        Value::Object(map)
    }
}

impl ForecastEventLogger for JsonlForecastLogger {
    fn log(&self, event: ForecastEvent) {
        let Ok(line) = serde_json::to_string(&Self::record(event)) else {
            return;
        };
        if let Ok(mut writer) = self.writer.lock() {
            let _ = writeln!(writer, "{}", line);
            let _ = writer.flush();
        }
    }
}

impl Drop for JsonlForecastLogger {
    fn drop(&mut self) {
        if let Ok(mut writer) = self.writer.lock() {
            let _ = writer.flush();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn read_lines(path: &Path) -> Vec<Value> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[test]
    fn test_events_written_as_jsonl() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.jsonl");
        let logger = JsonlForecastLogger::open(&path).unwrap();

        logger.log(ForecastEvent::new(
            "research_complete",
            json!({ "question_id": 7, "succeeded": 2, "failed": 1 }),
        ));
        logger.log(ForecastEvent::new(
            "reports_saved",
            json!({ "path": "out.json", "reports": 2 }),
        ));
        drop(logger);

        let lines = read_lines(&path);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["type"], "research_complete");
        assert_eq!(lines[0]["question_id"], 7);
        assert!(lines[0]["timestamp"].is_string());
        assert_eq!(lines[1]["type"], "reports_saved");
    }

    #[test]
    fn test_reopening_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("events.jsonl");

        for run in 0..2 {
            let logger = JsonlForecastLogger::open(&path).unwrap();
            logger.log(ForecastEvent::new("run", json!({ "run": run })));
        }

        let lines = read_lines(&path);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1]["run"], 1);
    }

    #[test]
    fn test_non_object_payload_wrapped() {
        let dir = tempfile::tempdir().unwrap();
        let logger = JsonlForecastLogger::in_dir(dir.path()).unwrap();
        let path = logger.path().to_path_buf();

        logger.log(ForecastEvent::new("note", json!("just a string")));
        drop(logger);

        let lines = read_lines(&path);
        assert_eq!(lines[0]["type"], "note");
        assert_eq!(lines[0]["data"], "just a string");
        assert!(
            path.file_name()
                .unwrap()
                .to_string_lossy()
                .starts_with("forecast-events-")
        );
    }

    #[test]
    fn test_in_dir_tolerates_unusable_directory() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("not-a-dir");
        std::fs::write(&file, "x").unwrap();

        assert!(JsonlForecastLogger::in_dir(&file).is_none());
    }
}
