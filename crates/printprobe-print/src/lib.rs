// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// printprobe print: the print-job lifecycle: transport selection and
// submission, spooler queue tracking, the single-session engine, and the
// auto-print scheduler, plus the document folder and printer list they draw
// from.

pub mod activity;
pub mod dispatcher;
pub mod documents;
pub mod printers;
pub mod raw_client;
pub mod scheduler;
pub mod session;
pub mod spool_client;
pub mod tracker;
pub mod transport;

#[cfg(test)]
mod test_support;

pub use activity::{ActivityLog, LogSink};
pub use dispatcher::DocumentDispatcher;
pub use documents::DocumentStore;
pub use printers::PrinterDirectory;
pub use scheduler::{AutoPrintScheduler, Selection};
pub use session::{EngineEvent, EngineHandle, EngineSnapshot, PrintEngine, PrintRequest};
pub use tracker::{JobTracker, PollDecision};
pub use transport::Transport;
