// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Print session engine.
//
// A single task owns every piece of mutable session state: the active job,
// the counters, the job tracker and the timeout clock. Everything else talks
// to it through an `EngineHandle`:
//
//   EngineHandle ──Command──▶ engine task ──EngineEvent──▶ subscribers
//                                  ▲
//            submission worker ────┤  (Internal::Submitted)
//            deferred queue poll ──┘  (Internal::PollResult)
//
// Background work never mutates state. It posts its result back to the
// engine, which drops results that belong to a session that already ended.
// Only one session is active at a time, and only one submission worker runs
// at a time. A trigger is rejected while a session is pending, and also while
// the worker of a session that already timed out is still sending.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, instrument, warn};

use printprobe_bridge::PrintSpooler;
use printprobe_core::config::{ProbeConfig, validate_copies, validate_timeout};
use printprobe_core::error::{ProbeError, Result};
use printprobe_core::types::{
    ActiveJob, Confirmation, Counters, Document, PrintJobKey, QueueEntry, SessionId,
    SessionOutcome, SubmissionOutcome, SubmissionResult, TriggerSource,
};

use crate::activity::LogSink;
use crate::dispatcher::DocumentDispatcher;
use crate::tracker::{JobTracker, PollDecision, RetryReason};

/// How often the timeout clock is checked while a session is pending.
const TIMEOUT_TICK: Duration = Duration::from_secs(1);

const COMMAND_CAPACITY: usize = 32;
const INTERNAL_CAPACITY: usize = 64;
const EVENT_CAPACITY: usize = 64;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// One "test print": what to send, where, and how many times.
#[derive(Debug, Clone)]
pub struct PrintRequest {
    pub printer: String,
    pub document: Document,
    pub copies: u32,
    pub source: TriggerSource,
}

/// Lifecycle notifications broadcast by the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    SessionStarted {
        session_id: SessionId,
        printer: String,
        document: String,
        copies: u32,
        source: TriggerSource,
    },
    SessionFinished {
        session_id: SessionId,
        printer: String,
        document: String,
        outcome: SessionOutcome,
        counters: Counters,
    },
    /// A trigger arrived while another session was active.
    TriggerSkipped {
        source: TriggerSource,
        reason: String,
    },
}

/// Point-in-time view of the engine for display.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineSnapshot {
    pub counters: Counters,
    pub active: Option<ActiveJob>,
    /// Seconds the active session has been pending.
    pub elapsed_secs: Option<u64>,
    pub timeout_secs: u64,
    /// A submission worker is still running, possibly for a finished session.
    pub submission_pending: bool,
}

enum Command {
    Start {
        request: PrintRequest,
        reply: oneshot::Sender<Result<SessionId>>,
    },
    SetTimeout {
        secs: u64,
        reply: oneshot::Sender<Result<()>>,
    },
    ResetCounters,
    Snapshot {
        reply: oneshot::Sender<EngineSnapshot>,
    },
    Shutdown,
}

enum Internal {
    Submitted {
        session_id: SessionId,
        result: Result<SubmissionResult>,
    },
    PollResult {
        session_id: SessionId,
        snapshot: Result<Vec<QueueEntry>>,
    },
}

// ---------------------------------------------------------------------------
// EngineHandle
// ---------------------------------------------------------------------------

/// Cloneable front door to the engine task.
#[derive(Clone)]
pub struct EngineHandle {
    commands: mpsc::Sender<Command>,
    events: broadcast::Sender<EngineEvent>,
}

impl EngineHandle {
    /// Start a session. Fails with [`ProbeError::SessionActive`] while another
    /// session is pending or its submission worker is still running.
    pub async fn start(&self, request: PrintRequest) -> Result<SessionId> {
        self.request(|reply| Command::Start { request, reply }).await?
    }

    /// Change the pending-session timeout (30–300 s). Applies to the active
    /// session too.
    pub async fn set_timeout(&self, secs: u64) -> Result<()> {
        self.request(|reply| Command::SetTimeout { secs, reply }).await?
    }

    /// Zero the success and failure counters.
    pub async fn reset_counters(&self) -> Result<()> {
        self.commands
            .send(Command::ResetCounters)
            .await
            .map_err(|_| ProbeError::EngineStopped)
    }

    pub async fn snapshot(&self) -> Result<EngineSnapshot> {
        self.request(|reply| Command::Snapshot { reply }).await
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.events.subscribe()
    }

    /// Ask the engine to stop. An in-flight submission is left to finish on
    /// its own; its result is discarded.
    pub async fn shutdown(&self) {
        let _ = self.commands.send(Command::Shutdown).await;
    }

    async fn request<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(make(tx))
            .await
            .map_err(|_| ProbeError::EngineStopped)?;
        rx.await.map_err(|_| ProbeError::EngineStopped)
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

struct ActiveSession {
    key: PrintJobKey,
    job: ActiveJob,
    started: Instant,
}

/// The engine task's state. Constructed and consumed by [`PrintEngine::spawn`].
pub struct PrintEngine {
    spooler: Arc<dyn PrintSpooler>,
    dispatcher: Arc<DocumentDispatcher>,
    tracker: JobTracker,
    log: Arc<dyn LogSink>,
    counters: Counters,
    active: Option<ActiveSession>,
    /// Session whose submission worker has not reported back yet.
    submitting: Option<SessionId>,
    timeout: Duration,
    events: broadcast::Sender<EngineEvent>,
    internal: mpsc::Sender<Internal>,
}

impl PrintEngine {
    /// Spawn the engine task on the current runtime.
    pub fn spawn(
        spooler: Arc<dyn PrintSpooler>,
        config: &ProbeConfig,
        log: Arc<dyn LogSink>,
    ) -> (EngineHandle, JoinHandle<()>) {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CAPACITY);
        let (internal_tx, internal_rx) = mpsc::channel(INTERNAL_CAPACITY);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        let engine = PrintEngine {
            dispatcher: Arc::new(DocumentDispatcher::new(
                Arc::clone(&spooler),
                config.clone(),
                Arc::clone(&log),
            )),
            spooler,
            tracker: JobTracker::new(config.polling.clone()),
            log,
            counters: Counters::default(),
            active: None,
            submitting: None,
            timeout: config.print_timeout(),
            events: events.clone(),
            internal: internal_tx,
        };

        let task = tokio::spawn(engine.run(command_rx, internal_rx));
        let handle = EngineHandle {
            commands: command_tx,
            events,
        };
        (handle, task)
    }

    async fn run(
        mut self,
        mut commands: mpsc::Receiver<Command>,
        mut internal: mpsc::Receiver<Internal>,
    ) {
        let mut tick = time::interval(TIMEOUT_TICK);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                command = commands.recv() => {
                    match command {
                        Some(Command::Start { request, reply }) => {
                            let result = self.start_session(request);
                            if result.is_ok() {
                                // Restart the clock so the first check lands a
                                // full tick after the session began.
                                tick.reset();
                            }
                            let _ = reply.send(result);
                        }
                        Some(Command::SetTimeout { secs, reply }) => {
                            let _ = reply.send(self.set_timeout(secs));
                        }
                        Some(Command::ResetCounters) => {
                            self.counters = Counters::default();
                            self.log.record("counters reset".into());
                        }
                        Some(Command::Snapshot { reply }) => {
                            let _ = reply.send(self.snapshot());
                        }
                        Some(Command::Shutdown) | None => {
                            debug!("print engine shutting down");
                            break;
                        }
                    }
                }

                Some(message) = internal.recv() => {
                    match message {
                        Internal::Submitted { session_id, result } => {
                            if self.submitting == Some(session_id) {
                                self.submitting = None;
                            }
                            self.on_submitted(session_id, result);
                        }
                        Internal::PollResult { session_id, snapshot } => {
                            self.on_poll_result(session_id, snapshot);
                        }
                    }
                }

                _ = tick.tick(), if self.active.is_some() => {
                    self.check_timeout();
                }
            }
        }
    }

    #[instrument(skip(self, request), fields(printer = %request.printer, document = %request.document.base_name()))]
    fn start_session(&mut self, request: PrintRequest) -> Result<SessionId> {
        if let Some(reason) = self.busy_reason() {
            warn!(source = ?request.source, %reason, "trigger skipped");
            self.log
                .record(format!("{} print skipped: {reason}", source_label(request.source)));
            let _ = self.events.send(EngineEvent::TriggerSkipped {
                source: request.source,
                reason: reason.clone(),
            });
            return Err(ProbeError::SessionActive(reason));
        }
        validate_copies(request.copies)?;

        let session_id = SessionId::new();
        let document_name = request.document.base_name().to_string();
        let key = PrintJobKey::new(request.printer.clone(), document_name.clone());
        self.tracker.begin(&key);

        let job = ActiveJob {
            session_id,
            printer: request.printer.clone(),
            document: document_name.clone(),
            copies: request.copies,
            source: request.source,
            started_at: Utc::now(),
        };
        self.active = Some(ActiveSession {
            key,
            job,
            started: Instant::now(),
        });

        info!(%session_id, copies = request.copies, "print session started");
        self.log.record(format!(
            "{} print started: {document_name} to {} ({} {})",
            source_label(request.source),
            request.printer,
            request.copies,
            if request.copies == 1 { "copy" } else { "copies" }
        ));
        let _ = self.events.send(EngineEvent::SessionStarted {
            session_id,
            printer: request.printer.clone(),
            document: document_name,
            copies: request.copies,
            source: request.source,
        });

        let dispatcher = Arc::clone(&self.dispatcher);
        let internal = self.internal.clone();
        self.submitting = Some(session_id);
        tokio::spawn(async move {
            let result = dispatcher
                .submit(&request.document, &request.printer, request.copies)
                .await;
            let _ = internal
                .send(Internal::Submitted { session_id, result })
                .await;
        });

        Ok(session_id)
    }

    /// Why a new trigger cannot start now, if it cannot.
    fn busy_reason(&self) -> Option<String> {
        if let Some(active) = &self.active {
            return Some(format!(
                "{} to {} still pending",
                active.job.document, active.job.printer
            ));
        }
        self.submitting.map(|session_id| {
            format!("submission of timed-out session {session_id} still running")
        })
    }

    fn on_submitted(&mut self, session_id: SessionId, result: Result<SubmissionResult>) {
        if !self.is_current(session_id) {
            debug!(%session_id, "submission result for finished session dropped");
            return;
        }

        match result {
            Ok(SubmissionResult {
                outcome: SubmissionOutcome::Completed,
                ..
            }) => self.finish(SessionOutcome::Succeeded {
                confirmation: Confirmation::Assumed,
            }),
            Ok(SubmissionResult { copies_sent, .. }) => {
                self.log.record(format!(
                    "{copies_sent} {} sent, watching the queue",
                    if copies_sent == 1 { "copy" } else { "copies" }
                ));
                self.schedule_poll(session_id, Duration::ZERO);
            }
            Err(e) => {
                warn!(%session_id, error = %e, "submission failed");
                self.finish(SessionOutcome::Failed {
                    reason: e.to_string(),
                });
            }
        }
    }

    fn on_poll_result(&mut self, session_id: SessionId, snapshot: Result<Vec<QueueEntry>>) {
        let Some(key) = self
            .active
            .as_ref()
            .filter(|active| active.job.session_id == session_id)
            .map(|active| active.key.clone())
        else {
            debug!(%session_id, "queue poll for finished session dropped");
            return;
        };

        match self.tracker.evaluate(&key, snapshot) {
            PollDecision::AlreadyResolved => {}
            PollDecision::Completed {
                confirmation,
                job_id,
            } => {
                match job_id {
                    Some(id) => self.log.record(format!("job {id} completed")),
                    None => self
                        .log
                        .record("job not found in queue, assuming it printed".into()),
                }
                self.finish(SessionOutcome::Succeeded { confirmation });
            }
            PollDecision::Failed { job_id, status } => {
                let reason = format!("job {job_id} reported {}", status.describe());
                self.finish(SessionOutcome::Failed { reason });
            }
            PollDecision::Retry { delay, reason } => {
                let message = match &reason {
                    RetryReason::NotFound { attempt } => format!(
                        "job not found in queue (retry {attempt}/{})",
                        self.tracker.miss_budget()
                    ),
                    other => format!("{other}, checking again in {}s", delay.as_secs()),
                };
                self.log.record(message);
                self.schedule_poll(session_id, delay);
            }
        }
    }

    fn check_timeout(&mut self) {
        let Some(active) = &self.active else {
            return;
        };
        let elapsed = active.started.elapsed();
        if elapsed > self.timeout {
            let elapsed_secs = elapsed.as_secs();
            let error = ProbeError::Timeout { elapsed_secs };
            warn!(session_id = %active.job.session_id, %error, "print session abandoned");
            self.finish(SessionOutcome::TimedOut { elapsed_secs });
        }
    }

    /// Query the queue after `delay`, off the engine task.
    fn schedule_poll(&self, session_id: SessionId, delay: Duration) {
        let Some(active) = &self.active else {
            return;
        };
        let printer = active.key.printer.clone();
        let spooler = Arc::clone(&self.spooler);
        let internal = self.internal.clone();

        tokio::spawn(async move {
            if !delay.is_zero() {
                time::sleep(delay).await;
            }
            let snapshot = tokio::task::spawn_blocking(move || spooler.enum_jobs(&printer))
                .await
                .unwrap_or_else(|e| Err(ProbeError::QueueQuery(format!("queue worker: {e}"))));
            let _ = internal
                .send(Internal::PollResult {
                    session_id,
                    snapshot,
                })
                .await;
        });
    }

    fn finish(&mut self, outcome: SessionOutcome) {
        let Some(active) = self.active.take() else {
            return;
        };
        self.tracker.resolve(&active.key);
        self.counters.record(&outcome);

        info!(
            session_id = %active.job.session_id,
            outcome = %outcome,
            succeeded = self.counters.succeeded,
            failed = self.counters.failed,
            "print session finished"
        );
        self.log.record(format!(
            "{} to {} {outcome} (succeeded: {}, failed: {})",
            active.job.document, active.job.printer, self.counters.succeeded, self.counters.failed
        ));
        let _ = self.events.send(EngineEvent::SessionFinished {
            session_id: active.job.session_id,
            printer: active.job.printer,
            document: active.job.document,
            outcome,
            counters: self.counters,
        });
    }

    fn set_timeout(&mut self, secs: u64) -> Result<()> {
        validate_timeout(secs)?;
        self.timeout = Duration::from_secs(secs);
        self.log.record(format!("print timeout set to {secs}s"));
        Ok(())
    }

    fn snapshot(&self) -> EngineSnapshot {
        EngineSnapshot {
            counters: self.counters,
            active: self.active.as_ref().map(|a| a.job.clone()),
            elapsed_secs: self.active.as_ref().map(|a| a.started.elapsed().as_secs()),
            timeout_secs: self.timeout.as_secs(),
            submission_pending: self.submitting.is_some(),
        }
    }

    fn is_current(&self, session_id: SessionId) -> bool {
        self.active
            .as_ref()
            .is_some_and(|active| active.job.session_id == session_id)
    }
}

fn source_label(source: TriggerSource) -> &'static str {
    match source {
        TriggerSource::Manual => "manual",
        TriggerSource::Scheduled => "scheduled",
    }
}
