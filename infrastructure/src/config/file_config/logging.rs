//! Logging settings from TOML (`[logging]` section)

use crate::logging::JsonlForecastLogger;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Raw logging configuration from TOML
///
/// ```toml
/// [logging]
/// directory = "logs"    # daily-rolling log file + JSONL event log
/// event_log = true
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileLoggingConfig {
    /// Directory for log files. Unset: console only.
    pub directory: Option<String>,
    /// Write forecast events as JSONL next to the log file
    pub event_log: bool,
}

impl Default for FileLoggingConfig {
    fn default() -> Self {
        Self {
            directory: None,
            event_log: true,
        }
    }
}

impl FileLoggingConfig {
    pub fn directory(&self) -> Option<PathBuf> {
        self.directory
            .as_deref()
            .filter(|d| !d.trim().is_empty())
            .map(PathBuf::from)
    }

    /// JSONL event logger for this configuration, if enabled and a
    /// directory is set
    pub fn event_logger(&self) -> Option<JsonlForecastLogger> {
        if !self.event_log {
            return None;
        }
        self.directory().and_then(JsonlForecastLogger::in_dir)
    }
}
