use std::collections::VecDeque;
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::{Arc, Mutex};

use chrono::Local;
use serde::{Deserialize, Serialize};
use tracing::Level;
use tracing_subscriber::EnvFilter;

use crate::domain::error::Result;

/// Install the global subscriber. Logs go to `log_file` in append mode when
/// given, otherwise to stdout. `RUST_LOG` overrides the default `info` filter.
pub fn init_tracing(log_file: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init();
        }
        None => {
            let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
        }
    }

    Ok(())
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct LogEntry {
    pub time: String,
    pub level: String,
    pub source: String,
    pub message: String,
}

/// Bounded in-memory request log. Every entry is also emitted as a tracing
/// event. Clones share the same buffer.
#[derive(Debug, Clone)]
pub struct RequestLog {
    entries: Arc<Mutex<VecDeque<LogEntry>>>,
    capacity: usize,
}

impl RequestLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            capacity,
        }
    }

    pub fn record(&self, level: Level, source: &str, message: &str) -> LogEntry {
        match level {
            Level::ERROR => tracing::error!(source, "{}", message),
            Level::WARN => tracing::warn!(source, "{}", message),
            Level::INFO => tracing::info!(source, "{}", message),
            Level::DEBUG => tracing::debug!(source, "{}", message),
            _ => tracing::trace!(source, "{}", message),
        }

        let entry = LogEntry {
            time: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            level: level.to_string(),
            source: source.to_string(),
            message: message.to_string(),
        };

        if self.capacity == 0 {
            return entry;
        }

        let mut entries = self.entries.lock().unwrap_or_else(|p| p.into_inner());
        if entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry.clone());
        entry
    }

    pub fn info(&self, source: &str, message: &str) {
        self.record(Level::INFO, source, message);
    }

    pub fn warn(&self, source: &str, message: &str) {
        self.record(Level::WARN, source, message);
    }

    pub fn error(&self, source: &str, message: &str) {
        self.record(Level::ERROR, source, message);
    }

    /// Oldest first
    pub fn entries(&self) -> Vec<LogEntry> {
        let entries = self.entries.lock().unwrap_or_else(|p| p.into_inner());
        entries.iter().cloned().collect()
    }
}

impl Default for RequestLog {
    fn default() -> Self {
        Self::new(100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_keeps_entry() {
        let log = RequestLog::new(10);
        let entry = log.record(Level::WARN, "HttpApi", "bad separator");

        assert_eq!(entry.level, "WARN");
        assert_eq!(log.entries(), vec![entry]);
    }

    #[test]
    fn test_capacity_drops_oldest() {
        let log = RequestLog::new(2);
        log.info("a", "1");
        log.info("a", "2");
        log.error("a", "3");

        let messages: Vec<_> = log.entries().into_iter().map(|e| e.message).collect();
        assert_eq!(messages, vec!["2", "3"]);
    }

    #[test]
    fn test_clones_share_buffer() {
        let log = RequestLog::new(5);
        let other = log.clone();
        other.info("a", "shared");
        assert_eq!(log.entries().len(), 1);
    }

    #[test]
    fn test_zero_capacity_keeps_nothing() {
        let log = RequestLog::new(0);
        log.info("a", "dropped");
        assert!(log.entries().is_empty());
    }
}
