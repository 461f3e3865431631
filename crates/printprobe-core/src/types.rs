// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the printprobe driver tester.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ProbeError, Result};

/// Unique identifier for one print session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What started a print session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TriggerSource {
    /// Explicit user request.
    Manual,
    /// Fired by the auto-print scheduler.
    Scheduled,
}

/// A test document on disk.
///
/// Built from an absolute path by the document store and never mutated by the
/// engine. The lower-cased extension drives transport selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    path: PathBuf,
    name: String,
    extension: String,
}

impl Document {
    pub fn from_path(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_owned)
            .ok_or_else(|| ProbeError::UnsupportedDocument(path.display().to_string()))?;
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        Ok(Self {
            path,
            name,
            extension,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name including extension (`label.usb`).
    pub fn base_name(&self) -> &str {
        &self.name
    }

    /// Lower-cased extension without the dot; empty when the file has none.
    pub fn extension(&self) -> &str {
        &self.extension
    }
}

/// Host and port of a raw-socket (JetDirect style) printer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TcpEndpoint {
    pub host: String,
    pub port: u16,
}

impl TcpEndpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl std::fmt::Display for TcpEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// The printer a submission goes to, resolved fresh for every submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrinterTarget {
    pub name: String,
    /// Only set for raw-socket submissions.
    pub endpoint: Option<TcpEndpoint>,
}

impl PrinterTarget {
    pub fn spooled(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            endpoint: None,
        }
    }

    pub fn network(name: impl Into<String>, endpoint: TcpEndpoint) -> Self {
        Self {
            name: name.into(),
            endpoint: Some(endpoint),
        }
    }
}

/// Correlates an outstanding queue entry with the session that submitted it.
///
/// Name-based: two outstanding submissions of the same document to the same
/// printer share one key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PrintJobKey {
    pub printer: String,
    pub document: String,
}

impl PrintJobKey {
    pub fn new(printer: impl Into<String>, document: impl Into<String>) -> Self {
        Self {
            printer: printer.into(),
            document: document.into(),
        }
    }
}

impl std::fmt::Display for PrintJobKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}_{}", self.printer, self.document)
    }
}

/// Normalized category of a spooler job status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueueState {
    Completed,
    Failed,
    /// Paused, spooling, printing, offline, out of paper, ...; poll again.
    InProgress,
}

/// Raw spooler job status bits (Win32 `JOB_STATUS_*`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobStatusFlags(pub u32);

impl JobStatusFlags {
    pub const NONE: Self = Self(0);
    pub const PAUSED: Self = Self(0x0001);
    pub const ERROR: Self = Self(0x0002);
    pub const DELETING: Self = Self(0x0004);
    pub const SPOOLING: Self = Self(0x0008);
    pub const PRINTING: Self = Self(0x0010);
    pub const OFFLINE: Self = Self(0x0020);
    pub const PAPER_OUT: Self = Self(0x0040);
    pub const PRINTED: Self = Self(0x0080);
    pub const DELETED: Self = Self(0x0100);
    pub const BLOCKED_DEVQ: Self = Self(0x0200);
    pub const USER_INTERVENTION: Self = Self(0x0400);
    pub const RESTART: Self = Self(0x0800);
    pub const COMPLETE: Self = Self(0x1000);

    /// Bits that mean the job has left (or is leaving) the printer successfully.
    const SUCCESS_MASK: u32 = Self::COMPLETE.0
        | Self::PRINTED.0
        | Self::DELETED.0
        | Self::DELETING.0
        | Self::RESTART.0;

    const LABELS: [(Self, &'static str); 13] = [
        (Self::PAUSED, "paused"),
        (Self::ERROR, "error"),
        (Self::DELETING, "deleting"),
        (Self::SPOOLING, "spooling"),
        (Self::PRINTING, "printing"),
        (Self::OFFLINE, "offline"),
        (Self::PAPER_OUT, "paper out"),
        (Self::PRINTED, "printed"),
        (Self::DELETED, "deleted"),
        (Self::BLOCKED_DEVQ, "blocked device queue"),
        (Self::USER_INTERVENTION, "user intervention"),
        (Self::RESTART, "restart"),
        (Self::COMPLETE, "complete"),
    ];

    pub fn contains(self, other: Self) -> bool {
        other.0 != 0 && self.0 & other.0 == other.0
    }

    /// Success bits win over the error bit; anything else is still in flight.
    pub fn classify(self) -> QueueState {
        if self.0 & Self::SUCCESS_MASK != 0 {
            QueueState::Completed
        } else if self.contains(Self::ERROR) {
            QueueState::Failed
        } else {
            QueueState::InProgress
        }
    }

    /// Human-readable status for log lines.
    pub fn describe(self) -> String {
        if self.0 == 0 {
            return "queued".into();
        }

        let labels: Vec<&str> = Self::LABELS
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, label)| *label)
            .collect();

        let known = Self::LABELS.iter().fold(0, |acc, (flag, _)| acc | flag.0);
        if labels.is_empty() || self.0 & !known != 0 {
            format!("unknown status (0x{:x})", self.0)
        } else {
            labels.join(", ")
        }
    }
}

impl std::ops::BitOr for JobStatusFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// One entry of a printer's spooler queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueEntry {
    pub job_id: u32,
    /// Document name as recorded by the spooler (may carry decorations).
    pub document: String,
    pub status: JobStatusFlags,
}

/// Whether the dispatcher could observe the end of the submission itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubmissionOutcome {
    /// Fire-and-forget transport; treated as done.
    Completed,
    /// Bytes are in the spooler or on the wire; queue tracking decides.
    PendingConfirmation,
}

/// Aggregate result for all copies of one submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionResult {
    pub outcome: SubmissionOutcome,
    pub copies_sent: u32,
    /// Payload size per copy; zero for shell prints.
    pub bytes_per_copy: usize,
}

/// How a success was established.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Confirmation {
    /// Shell print handed off to the OS; nothing to observe.
    Assumed,
    /// A completion status was seen in the queue.
    Observed,
    /// The job never showed up in the queue and was presumed printed.
    Inferred,
}

/// Terminal outcome of a print session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionOutcome {
    Succeeded { confirmation: Confirmation },
    Failed { reason: String },
    TimedOut { elapsed_secs: u64 },
}

impl SessionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }
}

impl std::fmt::Display for SessionOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Succeeded {
                confirmation: Confirmation::Assumed,
            } => write!(f, "succeeded (handed to shell)"),
            Self::Succeeded {
                confirmation: Confirmation::Observed,
            } => write!(f, "succeeded"),
            Self::Succeeded {
                confirmation: Confirmation::Inferred,
            } => write!(f, "succeeded (inferred, job left the queue unseen)"),
            Self::Failed { reason } => write!(f, "failed: {reason}"),
            Self::TimedOut { elapsed_secs } => write!(
                f,
                "{}",
                ProbeError::Timeout {
                    elapsed_secs: *elapsed_secs
                }
            ),
        }
    }
}

/// Process-lifetime success/failure statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counters {
    pub succeeded: u64,
    pub failed: u64,
}

impl Counters {
    /// Count exactly one of success/failure for a finished session.
    pub fn record(&mut self, outcome: &SessionOutcome) {
        if outcome.is_success() {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }
    }
}

/// Descriptor of the session currently in flight, for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveJob {
    pub session_id: SessionId,
    pub printer: String,
    pub document: String,
    pub copies: u32,
    pub source: TriggerSource,
    pub started_at: DateTime<Utc>,
}

impl ActiveJob {
    pub fn elapsed_secs(&self) -> i64 {
        (Utc::now() - self.started_at).num_seconds()
    }
}
