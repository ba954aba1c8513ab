//! Append-only structured event log owned by a device.
//!
//! Every entry is also emitted as a `tracing` event under the
//! `relaysim::device` target, so a subscriber installed by the host process
//! sees device activity without the library holding a global logger.

use std::fmt;

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warning => "WARNING",
            LogLevel::Error => "ERROR",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Seconds since the Unix epoch.
    pub timestamp: f64,
    pub level: LogLevel,
    pub message: String,
    pub data: Map<String, Value>,
}

impl LogEntry {
    pub fn new(level: LogLevel, message: impl Into<String>, data: Map<String, Value>) -> Self {
        let now = Utc::now();
        Self {
            timestamp: now.timestamp_micros() as f64 / 1_000_000.0,
            level,
            message: message.into(),
            data,
        }
    }

    pub fn datetime(&self) -> DateTime<Local> {
        let micros = (self.timestamp * 1_000_000.0).round() as i64;
        DateTime::from_timestamp_micros(micros)
            .unwrap_or_default()
            .with_timezone(&Local)
    }

    pub fn to_json(&self) -> Value {
        json!({
            "timestamp": self.timestamp,
            "datetime": self.datetime().to_rfc3339(),
            "level": self.level,
            "message": self.message,
            "data": self.data,
        })
    }
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {}",
            self.datetime().format("%Y-%m-%d %H:%M:%S%.3f"),
            self.level,
            self.message
        )
    }
}

/// Ordered, never auto-trimmed sequence of entries.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    entries: Vec<LogEntry>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry. `data` should be a JSON object; `null` becomes an
    /// empty map and any other value is stored under `"value"`.
    pub fn append(&mut self, level: LogLevel, message: impl Into<String>, data: Value) {
        let data = match data {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                let mut map = Map::new();
                map.insert("value".to_string(), other);
                map
            }
        };
        let entry = LogEntry::new(level, message, data);
        mirror(&entry);
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }
}

fn mirror(entry: &LogEntry) {
    let data = Value::Object(entry.data.clone());
    match entry.level {
        LogLevel::Debug => tracing::debug!(target: "relaysim::device", %data, "{}", entry.message),
        LogLevel::Info => tracing::info!(target: "relaysim::device", %data, "{}", entry.message),
        LogLevel::Warning => tracing::warn!(target: "relaysim::device", %data, "{}", entry.message),
        LogLevel::Error => tracing::error!(target: "relaysim::device", %data, "{}", entry.message),
    }
}
