// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Auto-print scheduler.
//
// Starts a scheduled print session every `interval`. The printer, document
// and copy count are read from a `watch` channel at each tick so the
// front-end can change its selection while the scheduler runs. The first
// tick lands one full period after `start` (or after an interval change).

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info};

use printprobe_core::config::validate_interval;
use printprobe_core::error::{ProbeError, Result};
use printprobe_core::types::{Document, TriggerSource};

use crate::activity::LogSink;
use crate::session::{EngineHandle, PrintRequest};

/// What the scheduler prints on its next tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub printer: Option<String>,
    pub document: Option<Document>,
    pub copies: u32,
}

impl Default for Selection {
    fn default() -> Self {
        Self {
            printer: None,
            document: None,
            copies: 1,
        }
    }
}

/// Periodic trigger for print sessions.
pub struct AutoPrintScheduler {
    engine: EngineHandle,
    selection: watch::Receiver<Selection>,
    interval: Duration,
    log: Arc<dyn LogSink>,
    task: Option<JoinHandle<()>>,
}

impl AutoPrintScheduler {
    /// Create a stopped scheduler firing every `interval_minutes`.
    pub fn new(
        engine: EngineHandle,
        selection: watch::Receiver<Selection>,
        interval_minutes: u32,
        log: Arc<dyn LogSink>,
    ) -> Result<Self> {
        validate_interval(interval_minutes)?;
        Ok(Self {
            engine,
            selection,
            interval: minutes(interval_minutes),
            log,
            task: None,
        })
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Change the period. A running timer is cancelled and restarted with the
    /// new period; the old phase is not preserved and nothing fires at once.
    pub fn set_interval(&mut self, interval_minutes: u32) -> Result<()> {
        validate_interval(interval_minutes)?;
        self.interval = minutes(interval_minutes);
        self.log
            .record(format!("auto print interval set to {interval_minutes} min"));

        if self.is_running() {
            self.abort_task();
            self.spawn_task();
        }
        Ok(())
    }

    pub fn start(&mut self) {
        if self.is_running() {
            return;
        }
        self.spawn_task();
        info!(interval_secs = self.interval.as_secs(), "auto print started");
        self.log.record(format!(
            "auto print started, every {} min",
            self.interval.as_secs() / 60
        ));
    }

    /// Cancel the timer. A session already in flight is not interrupted.
    pub fn stop(&mut self) {
        if self.task.is_none() {
            return;
        }
        self.abort_task();
        info!("auto print stopped");
        self.log.record("auto print stopped".into());
    }

    fn spawn_task(&mut self) {
        let engine = self.engine.clone();
        let selection = self.selection.clone();
        let log = Arc::clone(&self.log);
        let period = self.interval;

        self.task = Some(tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if !fire(&engine, &selection, log.as_ref()).await {
                    break;
                }
            }
        }));
    }

    fn abort_task(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for AutoPrintScheduler {
    fn drop(&mut self) {
        self.abort_task();
    }
}

/// One tick. Returns `false` once the engine is gone.
async fn fire(
    engine: &EngineHandle,
    selection: &watch::Receiver<Selection>,
    log: &dyn LogSink,
) -> bool {
    let Selection {
        printer,
        document,
        copies,
    } = selection.borrow().clone();

    let (printer, document) = match (printer, document) {
        (Some(printer), Some(document)) => (printer, document),
        (None, _) => {
            log.record(format!("auto print skipped: {}", ProbeError::NoPrinterSelected));
            return true;
        }
        (_, None) => {
            log.record(format!("auto print skipped: {}", ProbeError::NoDocumentSelected));
            return true;
        }
    };

    let request = PrintRequest {
        printer,
        document,
        copies,
        source: TriggerSource::Scheduled,
    };
    match engine.start(request).await {
        Ok(session_id) => {
            debug!(%session_id, "scheduled print started");
            true
        }
        // The engine logs the skip itself.
        Err(ProbeError::SessionActive(_)) => true,
        Err(ProbeError::EngineStopped) => {
            log.record("auto print halted: print engine has stopped".into());
            false
        }
        Err(e) => {
            log.record(format!("auto print could not start: {e}"));
            true
        }
    }
}

fn minutes(m: u32) -> Duration {
    Duration::from_secs(u64::from(m) * 60)
}
