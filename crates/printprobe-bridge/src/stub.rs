// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Stub spooler for platforms without a supported print spooler.
//
// Every spooler call returns `PlatformUnavailable`. Raw-socket printing does
// not go through the spooler and keeps working.

use std::path::Path;

use printprobe_core::error::{ProbeError, Result};
use printprobe_core::types::QueueEntry;

use crate::traits::{PrintSpooler, RawJob};

/// No-op spooler returned on non-Windows platforms.
pub struct StubSpooler;

impl PrintSpooler for StubSpooler {
    fn platform_name(&self) -> &str {
        "unsupported platform (stub)"
    }

    fn list_printers(&self) -> Result<Vec<String>> {
        tracing::warn!("PrintSpooler::list_printers called on stub spooler");
        Err(ProbeError::PlatformUnavailable)
    }

    fn default_printer(&self) -> Result<Option<String>> {
        Err(ProbeError::PlatformUnavailable)
    }

    fn shell_print(&self, _document: &Path, _printer: &str) -> Result<()> {
        tracing::warn!("PrintSpooler::shell_print called on stub spooler");
        Err(ProbeError::PlatformUnavailable)
    }

    fn write_raw_job(&self, _printer: &str, _job: &RawJob<'_>) -> Result<()> {
        tracing::warn!("PrintSpooler::write_raw_job called on stub spooler");
        Err(ProbeError::PlatformUnavailable)
    }

    fn enum_jobs(&self, _printer: &str) -> Result<Vec<QueueEntry>> {
        Err(ProbeError::PlatformUnavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_call_is_unavailable() {
        let spooler = StubSpooler;
        assert!(matches!(
            spooler.list_printers(),
            Err(ProbeError::PlatformUnavailable)
        ));
        let job = RawJob {
            document_name: "x",
            preamble: None,
            data: b"x",
        };
        assert!(matches!(
            spooler.write_raw_job("p", &job),
            Err(ProbeError::PlatformUnavailable)
        ));
        assert!(matches!(
            spooler.enum_jobs("p"),
            Err(ProbeError::PlatformUnavailable)
        ));
    }
}
