// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Job tracker: decides what a spooler queue snapshot means for an
// outstanding submission.
//
// The tracker never sleeps and never touches the spooler on its own. The
// session engine fetches a queue snapshot, hands it to `evaluate`, and acts
// on the returned `PollDecision` (finish, or schedule another poll after the
// given delay).
//
// Correlation is by name: the first queue entry whose document field
// contains the document's base name, or is contained by it, is "our" job.
// A job that never shows up is presumed printed once the miss budget is
// spent, because finished jobs leave the queue quickly.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use tracing::{debug, info, warn};

use printprobe_core::config::PollingConfig;
use printprobe_core::error::Result;
use printprobe_core::types::{
    Confirmation, JobStatusFlags, PrintJobKey, QueueEntry, QueueState,
};

/// What the session should do after one poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollDecision {
    /// The key already reached a terminal outcome; do nothing.
    AlreadyResolved,
    /// Terminal success. `job_id` is `None` for inferred completions.
    Completed {
        confirmation: Confirmation,
        job_id: Option<u32>,
    },
    /// Terminal failure reported by the spooler.
    Failed {
        job_id: u32,
        status: JobStatusFlags,
    },
    /// Poll again after `delay`.
    Retry { delay: Duration, reason: RetryReason },
}

/// Why another poll is needed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryReason {
    /// The job is in the queue but not finished.
    InProgress {
        job_id: u32,
        status: JobStatusFlags,
    },
    /// No matching entry yet; `attempt` of the miss budget used.
    NotFound { attempt: u32 },
    /// The queue could not be read.
    QueryFailed(String),
}

impl std::fmt::Display for RetryReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InProgress { job_id, status } => {
                write!(f, "job {job_id} {}", status.describe())
            }
            Self::NotFound { attempt } => write!(f, "job not in queue yet (attempt {attempt})"),
            Self::QueryFailed(e) => write!(f, "{e}"),
        }
    }
}

/// Per-key retry counters and the set of keys that already finished.
#[derive(Debug, Default)]
pub struct JobTracker {
    config: PollingConfig,
    retries: HashMap<PrintJobKey, u32>,
    resolved: HashSet<PrintJobKey>,
}

impl JobTracker {
    pub fn new(config: PollingConfig) -> Self {
        Self {
            config,
            retries: HashMap::new(),
            resolved: HashSet::new(),
        }
    }

    /// Start tracking `key` afresh: clears its retry counter and any earlier
    /// terminal mark.
    pub fn begin(&mut self, key: &PrintJobKey) {
        self.retries.remove(key);
        self.resolved.remove(key);
    }

    /// Record a terminal outcome for `key`. Later polls become no-ops.
    pub fn resolve(&mut self, key: &PrintJobKey) {
        self.retries.remove(key);
        self.resolved.insert(key.clone());
    }

    pub fn is_resolved(&self, key: &PrintJobKey) -> bool {
        self.resolved.contains(key)
    }

    /// Misses recorded for `key` since it was last begun.
    pub fn retry_count(&self, key: &PrintJobKey) -> u32 {
        self.retries.get(key).copied().unwrap_or(0)
    }

    /// Misses tolerated before a job is presumed printed.
    pub fn miss_budget(&self) -> u32 {
        self.config.max_missing_polls
    }

    /// First queue entry whose name contains `document`, or is contained by it.
    pub fn find_match<'a>(entries: &'a [QueueEntry], document: &str) -> Option<&'a QueueEntry> {
        entries.iter().find(|entry| {
            !entry.document.is_empty()
                && (entry.document.contains(document) || document.contains(&entry.document))
        })
    }

    /// Turn one queue snapshot (or the error from reading it) into a decision.
    pub fn evaluate(
        &mut self,
        key: &PrintJobKey,
        snapshot: Result<Vec<QueueEntry>>,
    ) -> PollDecision {
        if self.is_resolved(key) {
            debug!(%key, "poll for resolved job ignored");
            return PollDecision::AlreadyResolved;
        }

        let entries = match snapshot {
            Ok(entries) => entries,
            Err(e) => {
                warn!(%key, error = %e, "queue query failed, will retry");
                return PollDecision::Retry {
                    delay: self.config.missing_delay(),
                    reason: RetryReason::QueryFailed(e.to_string()),
                };
            }
        };

        let Some(entry) = Self::find_match(&entries, &key.document) else {
            return self.record_miss(key);
        };

        match entry.status.classify() {
            QueueState::Completed => {
                info!(%key, job_id = entry.job_id, status = %entry.status.describe(), "job completed");
                self.resolve(key);
                PollDecision::Completed {
                    confirmation: Confirmation::Observed,
                    job_id: Some(entry.job_id),
                }
            }
            QueueState::Failed => {
                warn!(%key, job_id = entry.job_id, status = %entry.status.describe(), "job failed");
                self.resolve(key);
                PollDecision::Failed {
                    job_id: entry.job_id,
                    status: entry.status,
                }
            }
            QueueState::InProgress => PollDecision::Retry {
                delay: self.config.pending_delay(),
                reason: RetryReason::InProgress {
                    job_id: entry.job_id,
                    status: entry.status,
                },
            },
        }
    }

    fn record_miss(&mut self, key: &PrintJobKey) -> PollDecision {
        let attempt = self.retries.entry(key.clone()).or_insert(0);
        *attempt += 1;
        let attempt = *attempt;

        if attempt <= self.config.max_missing_polls {
            debug!(%key, attempt, "job not found in queue");
            PollDecision::Retry {
                delay: self.config.missing_delay(),
                reason: RetryReason::NotFound { attempt },
            }
        } else {
            info!(%key, attempt, "job never seen in queue, presuming it printed");
            self.resolve(key);
            PollDecision::Completed {
                confirmation: Confirmation::Inferred,
                job_id: None,
            }
        }
    }
}
