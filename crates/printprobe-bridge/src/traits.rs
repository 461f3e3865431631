// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Platform-agnostic trait definitions for the OS print spooler.
//
// Every call is blocking and must run off the engine task (inside
// `spawn_blocking`). Implementations acquire printer handles immediately
// before use and release them on every exit path before returning.

use std::path::Path;

use printprobe_core::error::Result;
use printprobe_core::types::QueueEntry;

/// One raw (driver-bypassing) spooler job.
#[derive(Debug, Clone, Copy)]
pub struct RawJob<'a> {
    /// Document name recorded in the spooler queue.
    pub document_name: &'a str,
    /// Bytes written inside the job ahead of `data` (e.g. ESC @ reset).
    pub preamble: Option<&'a [u8]>,
    /// Full document payload, written in one pass.
    pub data: &'a [u8],
}

/// Access to installed printers and their queues.
pub trait PrintSpooler: Send + Sync {
    /// Human-readable backend name (e.g. "Windows spooler").
    fn platform_name(&self) -> &str;

    /// Names of all printers visible to this machine (local, connections,
    /// network, shared). May contain duplicates.
    fn list_printers(&self) -> Result<Vec<String>>;

    /// The system default printer, if one is set.
    fn default_printer(&self) -> Result<Option<String>>;

    /// Ask the application associated with the file type to print it to
    /// `printer`. Fire-and-forget: no job handle comes back.
    fn shell_print(&self, document: &Path, printer: &str) -> Result<()>;

    /// Open `printer`, run one RAW job carrying the preamble (if any)
    /// followed by `job.data`, and close the device.
    fn write_raw_job(&self, printer: &str, job: &RawJob<'_>) -> Result<()>;

    /// Snapshot of the jobs currently in `printer`'s queue.
    fn enum_jobs(&self, printer: &str) -> Result<Vec<QueueEntry>>;
}
