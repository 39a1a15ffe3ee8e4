//! User-facing activity log.
//!
//! Entries go to an append-only text file (shown by `logs show`) and to a
//! bounded in-memory buffer, and are mirrored to `tracing`.

use chrono::Local;
use serde::Serialize;
use std::collections::VecDeque;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

const LOG_BUFFER_MAX: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Debug,
    Info,
    Success,
    Warning,
    Error,
}

impl Level {
    pub fn label(self) -> &'static str {
        match self {
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Success => "SUCCESS",
            Level::Warning => "WARNING",
            Level::Error => "ERROR",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    pub timestamp: String,
    pub level: Level,
    pub message: String,
}

impl LogEntry {
    fn line(&self) -> String {
        format!("{} [{}] {}", self.timestamp, self.level.label(), self.message)
    }
}

pub struct ActivityLog {
    path: Option<PathBuf>,
    entries: VecDeque<LogEntry>,
}

impl ActivityLog {
    /// Log to `path` (created on first write) and memory.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        ActivityLog {
            path: Some(path.into()),
            entries: VecDeque::new(),
        }
    }

    /// Memory-only log. For tests.
    pub fn in_memory() -> Self {
        ActivityLog {
            path: None,
            entries: VecDeque::new(),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn push(&mut self, level: Level, message: impl Into<String>) {
        let message = message.into();
        match level {
            Level::Debug => tracing::debug!("{}", message),
            Level::Info | Level::Success => tracing::info!("{}", message),
            Level::Warning => tracing::warn!("{}", message),
            Level::Error => tracing::error!("{}", message),
        }

        let entry = LogEntry {
            timestamp: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            level,
            message,
        };
        if let Some(path) = &self.path {
            // A failing log file must never take the player down with it.
            if let Err(e) = append_line(path, &entry.line()) {
                tracing::warn!(path = %path.display(), "cannot write activity log: {}", e);
            }
        }
        self.entries.push_back(entry);
        while self.entries.len() > LOG_BUFFER_MAX {
            self.entries.pop_front();
        }
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.push(Level::Info, message);
    }

    pub fn success(&mut self, message: impl Into<String>) {
        self.push(Level::Success, message);
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        self.push(Level::Warning, message);
    }

    /// In-memory entries from `since_index` on.
    pub fn entries(&self, since_index: usize) -> Vec<LogEntry> {
        self.entries.iter().skip(since_index).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Full text of the log file, empty if nothing was logged yet.
    pub fn read_file(&self) -> std::io::Result<String> {
        let Some(path) = &self.path else {
            return Ok(String::new());
        };
        match fs::read_to_string(path) {
            Ok(text) => Ok(text),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(e),
        }
    }

    /// Empty both the buffer and the file.
    pub fn clear(&mut self) -> std::io::Result<()> {
        self.entries.clear();
        if let Some(path) = &self.path {
            if path.exists() {
                fs::write(path, "")?;
            }
        }
        Ok(())
    }
}

fn append_line(path: &Path, line: &str) -> std::io::Result<()> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() {
            fs::create_dir_all(dir)?;
        }
    }
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{}", line)
}
