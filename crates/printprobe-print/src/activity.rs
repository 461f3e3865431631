// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Activity log: the human-readable trail of a test run.
//
// One line per significant event (submission start/end, per-copy progress,
// queue status transitions, retries, terminal outcome). Lines are kept in a
// bounded in-memory buffer, mirrored to `tracing`, and can be exported to a
// text file.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Local};
use tracing::{info, warn};

use printprobe_core::error::Result;

/// Lines kept before the oldest are dropped.
const DEFAULT_CAPACITY: usize = 5000;

/// Timestamp format used in every line.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Receiver of timestamped activity messages.
pub trait LogSink: Send + Sync {
    fn record(&self, message: String);
}

/// A single timestamped activity line.
#[derive(Debug, Clone)]
pub struct LogLine {
    pub at: DateTime<Local>,
    pub message: String,
}

impl std::fmt::Display for LogLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.at.format(TIMESTAMP_FORMAT), self.message)
    }
}

/// Bounded, thread-safe activity log. Cheap to clone; clones share lines.
#[derive(Debug, Clone)]
pub struct ActivityLog {
    lines: Arc<Mutex<VecDeque<LogLine>>>,
    capacity: usize,
}

impl Default for ActivityLog {
    fn default() -> Self {
        Self::new()
    }
}

impl ActivityLog {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            lines: Arc::new(Mutex::new(VecDeque::new())),
            capacity: capacity.max(1),
        }
    }

    /// Snapshot of all retained lines, oldest first.
    pub fn lines(&self) -> Vec<LogLine> {
        self.guard().iter().cloned().collect()
    }

    /// Whether any retained line contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.guard().iter().any(|l| l.message.contains(needle))
    }

    pub fn clear(&self) {
        self.guard().clear();
        self.record("log cleared".into());
    }

    /// Lock the lines. A panic elsewhere while holding the lock leaves the
    /// deque intact, so a poisoned lock is taken over rather than abandoned.
    fn guard(&self) -> MutexGuard<'_, VecDeque<LogLine>> {
        self.lines.lock().unwrap_or_else(|poisoned: PoisonError<_>| {
            warn!("activity log lock was poisoned, recovering");
            self.lines.clear_poison();
            poisoned.into_inner()
        })
    }

    /// Write every line to `path`, adding a `.txt` extension when missing.
    ///
    /// Returns the path actually written.
    pub fn export(&self, path: impl AsRef<Path>) -> Result<PathBuf> {
        let mut path = path.as_ref().to_path_buf();
        let has_txt = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("txt"));
        if !has_txt {
            let mut name = path.clone().into_os_string();
            name.push(".txt");
            path = PathBuf::from(name);
        }

        let mut body = String::new();
        for line in self.lines() {
            body.push_str(&line.to_string());
            body.push('\n');
        }
        std::fs::write(&path, body)?;

        self.record(format!("log exported to {}", path.display()));
        Ok(path)
    }
}

impl LogSink for ActivityLog {
    fn record(&self, message: String) {
        info!(target: "printprobe::activity", "{message}");
        let mut lines = self.guard();
        if lines.len() == self.capacity {
            lines.pop_front();
        }
        lines.push_back(LogLine {
            at: Local::now(),
            message,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_are_timestamped() {
        let log = ActivityLog::new();
        log.record("print started".into());

        let lines = log.lines();
        assert_eq!(lines.len(), 1);
        let rendered = lines[0].to_string();
        assert!(rendered.starts_with('['));
        assert!(rendered.ends_with("] print started"));
        // "[YYYY-MM-DD HH:MM:SS] " prefix
        assert_eq!(rendered.find(']'), Some(20));
    }

    #[test]
    fn capacity_drops_oldest() {
        let log = ActivityLog::with_capacity(2);
        log.record("one".into());
        log.record("two".into());
        log.record("three".into());

        let messages: Vec<String> = log.lines().into_iter().map(|l| l.message).collect();
        assert_eq!(messages, vec!["two", "three"]);
    }

    #[test]
    fn clones_share_lines() {
        let log = ActivityLog::new();
        let other = log.clone();
        other.record("from clone".into());
        assert!(log.contains("from clone"));
    }

    #[test]
    fn survives_a_panic_while_locked() {
        let log = ActivityLog::new();
        log.record("before".into());

        let poisoner = log.clone();
        let crashed = std::thread::spawn(move || {
            let _held = poisoner.lines.lock().expect("lock");
            panic!("worker died holding the log");
        })
        .join();
        assert!(crashed.is_err());
        assert!(log.lines.is_poisoned());

        log.record("after".into());
        assert!(log.contains("before"));
        assert!(log.contains("after"));
        assert_eq!(log.lines().len(), 2);
        assert!(!log.lines.is_poisoned());
    }

    #[test]
    fn export_appends_txt_extension() {
        let dir = tempfile::tempdir().expect("tempdir");
        let log = ActivityLog::new();
        log.record("copy 1/2 sent".into());

        let written = log.export(dir.path().join("run")).expect("export");
        assert_eq!(written, dir.path().join("run.txt"));

        let body = std::fs::read_to_string(&written).expect("read export");
        assert!(body.contains("copy 1/2 sent"));
        assert_eq!(body.lines().count(), 1);
    }

    #[test]
    fn export_keeps_existing_txt_extension() {
        let dir = tempfile::tempdir().expect("tempdir");
        let log = ActivityLog::new();
        let written = log.export(dir.path().join("run.TXT")).expect("export");
        assert_eq!(written, dir.path().join("run.TXT"));
    }
}
