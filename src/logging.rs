//! Request log: an append-only JSONL file with one record per notable request event.
//!
//! Complements `tracing` output so a failed chat or upload can be traced back by its request
//! id after the fact.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub component: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub message: String,
}

impl LogEntry {
    pub fn new(level: LogLevel, component: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            level,
            component: component.into(),
            request_id: None,
            message: message.into(),
        }
    }

    pub fn for_request(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }
}

pub struct Logger {
    writer: BufWriter<File>,
}

impl Logger {
    pub fn new(file_path: impl AsRef<Path>) -> std::io::Result<Self> {
        let file_path = file_path.as_ref();

        if let Some(parent) = file_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(file_path)?;

        Ok(Self {
            writer: BufWriter::new(file),
        })
    }

    pub fn log(&mut self, entry: &LogEntry) {
        if let Ok(json) = serde_json::to_string(entry) {
            let _ = writeln!(self.writer, "{}", json);
            let _ = self.writer.flush();
        }
    }
}

#[derive(Clone)]
pub struct SharedLogger(Arc<Mutex<Logger>>);

impl SharedLogger {
    pub fn new(file_path: impl AsRef<Path>) -> std::io::Result<Self> {
        Ok(Self(Arc::new(Mutex::new(Logger::new(file_path)?))))
    }

    pub fn log(&self, entry: LogEntry) {
        if let Ok(mut logger) = self.0.lock() {
            logger.log(&entry);
        }
    }

    pub fn info(&self, component: impl Into<String>, message: impl Into<String>) {
        self.log(LogEntry::new(LogLevel::Info, component, message));
    }

    /// Log an event tied to one request.
    pub fn request(
        &self,
        level: LogLevel,
        component: impl Into<String>,
        request_id: &str,
        message: impl Into<String>,
    ) {
        self.log(LogEntry::new(level, component, message).for_request(request_id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_entries(path: &Path) -> Vec<LogEntry> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[test]
    fn test_entries_appended_as_json_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("proxy.log");

        let logger = SharedLogger::new(&path).unwrap();
        logger.info("startup", "listening");
        logger.request(LogLevel::Error, "chat", "req-1", "provider failed");

        let entries = read_entries(&path);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].component, "startup");
        assert!(entries[0].request_id.is_none());
        assert_eq!(entries[1].level, LogLevel::Error);
        assert_eq!(entries[1].request_id.as_deref(), Some("req-1"));
    }

    #[test]
    fn test_reopen_appends_instead_of_truncating() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("proxy.log");

        SharedLogger::new(&path).unwrap().info("startup", "first run");
        SharedLogger::new(&path)
            .unwrap()
            .request(LogLevel::Error, "upload", "req-2", "second run");

        let messages: Vec<_> = read_entries(&path).into_iter().map(|e| e.message).collect();
        assert_eq!(messages, ["first run", "second run"]);
    }
}
