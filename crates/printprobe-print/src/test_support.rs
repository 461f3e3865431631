// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Recording spooler used by the unit tests in this crate.

use std::collections::VecDeque;
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::time::Instant;

use printprobe_bridge::{PrintSpooler, RawJob};
use printprobe_core::error::{ProbeError, Result};
use printprobe_core::types::{JobStatusFlags, QueueEntry};

/// Something the engine asked the spooler to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpoolEvent {
    ShellPrint { printer: String, document: String },
    JobStart { printer: String, document: String },
    Preamble { printer: String, bytes: Vec<u8> },
    JobEnd { printer: String, document: String, bytes: usize },
    EnumJobs { printer: String },
}

/// In-memory spooler with a scripted queue.
///
/// Each `enum_jobs` call pops the next scripted response; once the script is
/// exhausted the fallback queue is returned.
#[derive(Default)]
pub struct MockSpooler {
    printers: Vec<String>,
    default_printer: Option<String>,
    events: Mutex<Vec<(Instant, SpoolEvent)>>,
    script: Mutex<VecDeque<std::result::Result<Vec<QueueEntry>, String>>>,
    fallback: Mutex<Vec<QueueEntry>>,
    raw_failure: Mutex<Option<String>>,
    shell_failure: Mutex<Option<String>>,
    raw_gate: Mutex<Option<mpsc::Receiver<()>>>,
    raw_writers: AtomicUsize,
    max_raw_writers: AtomicUsize,
}

impl MockSpooler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_printers(printers: &[&str], default_printer: Option<&str>) -> Self {
        Self {
            printers: printers.iter().map(|p| p.to_string()).collect(),
            default_printer: default_printer.map(str::to_owned),
            ..Self::default()
        }
    }

    pub fn script(&self, responses: Vec<std::result::Result<Vec<QueueEntry>, String>>) {
        self.script.lock().expect("script lock").extend(responses);
    }

    pub fn set_fallback(&self, entries: Vec<QueueEntry>) {
        *self.fallback.lock().expect("fallback lock") = entries;
    }

    pub fn fail_raw_writes(&self, message: &str) {
        *self.raw_failure.lock().expect("failure lock") = Some(message.to_string());
    }

    pub fn fail_shell_prints(&self, message: &str) {
        *self.shell_failure.lock().expect("failure lock") = Some(message.to_string());
    }

    /// Block the next raw write until the returned sender fires (or drops).
    pub fn hold_next_raw_write(&self) -> mpsc::Sender<()> {
        let (tx, rx) = mpsc::channel();
        *self.raw_gate.lock().expect("gate lock") = Some(rx);
        tx
    }

    /// Most raw writes ever in progress at once.
    pub fn max_concurrent_raw_writes(&self) -> usize {
        self.max_raw_writers.load(Ordering::SeqCst)
    }

    pub fn events(&self) -> Vec<SpoolEvent> {
        self.timed_events().into_iter().map(|(_, e)| e).collect()
    }

    pub fn timed_events(&self) -> Vec<(Instant, SpoolEvent)> {
        self.events.lock().expect("events lock").clone()
    }

    pub fn enum_count(&self) -> usize {
        self.count(|e| matches!(e, SpoolEvent::EnumJobs { .. }))
    }

    pub fn job_start_count(&self) -> usize {
        self.count(|e| matches!(e, SpoolEvent::JobStart { .. }))
    }

    pub fn shell_count(&self) -> usize {
        self.count(|e| matches!(e, SpoolEvent::ShellPrint { .. }))
    }

    fn count(&self, pred: impl Fn(&SpoolEvent) -> bool) -> usize {
        self.events().iter().filter(|e| pred(e)).count()
    }

    fn push(&self, event: SpoolEvent) {
        self.events
            .lock()
            .expect("events lock")
            .push((Instant::now(), event));
    }
}

impl MockSpooler {
    fn spool(&self, printer: &str, job: &RawJob<'_>) -> Result<()> {
        if let Some(message) = self.raw_failure.lock().expect("failure lock").clone() {
            return Err(ProbeError::Transport(message));
        }
        let mut device = MockDevice::default();
        device.start(job.document_name);
        self.push(SpoolEvent::JobStart {
            printer: printer.to_string(),
            document: job.document_name.to_string(),
        });
        if let Some(preamble) = job.preamble {
            device.write(preamble)?;
            self.push(SpoolEvent::Preamble {
                printer: printer.to_string(),
                bytes: preamble.to_vec(),
            });
        }
        device.write(job.data)?;
        device.end();
        self.push(SpoolEvent::JobEnd {
            printer: printer.to_string(),
            document: job.document_name.to_string(),
            bytes: job.data.len(),
        });
        Ok(())
    }
}

/// Printer handle that, like winspool, only accepts bytes inside a job.
#[derive(Default)]
struct MockDevice {
    open_job: Option<String>,
}

impl MockDevice {
    fn start(&mut self, document: &str) {
        self.open_job = Some(document.to_string());
    }

    fn write(&mut self, _bytes: &[u8]) -> Result<()> {
        match self.open_job {
            Some(_) => Ok(()),
            None => Err(ProbeError::Transport(
                "WritePrinter called before StartDocPrinter".into(),
            )),
        }
    }

    fn end(&mut self) {
        self.open_job = None;
    }
}

impl PrintSpooler for MockSpooler {
    fn platform_name(&self) -> &str {
        "mock"
    }

    fn list_printers(&self) -> Result<Vec<String>> {
        Ok(self.printers.clone())
    }

    fn default_printer(&self) -> Result<Option<String>> {
        Ok(self.default_printer.clone())
    }

    fn shell_print(&self, document: &Path, printer: &str) -> Result<()> {
        if let Some(message) = self.shell_failure.lock().expect("failure lock").clone() {
            return Err(ProbeError::Transport(message));
        }
        self.push(SpoolEvent::ShellPrint {
            printer: printer.to_string(),
            document: document.display().to_string(),
        });
        Ok(())
    }

    fn write_raw_job(&self, printer: &str, job: &RawJob<'_>) -> Result<()> {
        let writers = self.raw_writers.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_raw_writers.fetch_max(writers, Ordering::SeqCst);
        let gate = self.raw_gate.lock().expect("gate lock").take();
        if let Some(gate) = gate {
            let _ = gate.recv();
        }
        let result = self.spool(printer, job);
        self.raw_writers.fetch_sub(1, Ordering::SeqCst);
        result
    }

    fn enum_jobs(&self, printer: &str) -> Result<Vec<QueueEntry>> {
        self.push(SpoolEvent::EnumJobs {
            printer: printer.to_string(),
        });
        let next = self.script.lock().expect("script lock").pop_front();
        match next {
            Some(Ok(entries)) => Ok(entries),
            Some(Err(message)) => Err(ProbeError::QueueQuery(message)),
            None => Ok(self.fallback.lock().expect("fallback lock").clone()),
        }
    }
}

/// Shorthand for a queue entry.
pub fn entry(job_id: u32, document: &str, status: JobStatusFlags) -> QueueEntry {
    QueueEntry {
        job_id,
        document: document.to_string(),
        status,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_rejects_bytes_outside_a_job() {
        let mut device = MockDevice::default();
        assert!(matches!(device.write(b"\x1b@"), Err(ProbeError::Transport(_))));

        device.start("label.usb (copy 1/1)");
        device.write(b"\x1b@").expect("inside job");
        device.end();
        assert!(device.write(b"late").is_err());
    }
}
