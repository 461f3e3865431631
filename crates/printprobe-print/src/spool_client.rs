// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Spooler-backed transports: RAW spool jobs and shell print-to.
//
// Spooler calls block, so each one runs on the blocking pool. The spooler
// implementation owns the printer handle for the duration of the call only.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, instrument};

use printprobe_bridge::{PrintSpooler, RawJob};
use printprobe_core::error::{ProbeError, Result};

/// Spooler document name for one copy of a raw job.
///
/// Carries the document's base name so the job tracker can find it in the
/// queue.
pub fn raw_job_name(base_name: &str, copy: u32, copies: u32) -> String {
    format!("{base_name} (copy {copy}/{copies})")
}

/// Write one copy of `data` as a RAW spooler job.
#[instrument(skip(spooler, preamble, data), fields(bytes = data.len()))]
pub async fn send_raw_spool(
    spooler: Arc<dyn PrintSpooler>,
    printer: String,
    job_name: String,
    preamble: Option<&'static [u8]>,
    data: Arc<[u8]>,
) -> Result<()> {
    tokio::task::spawn_blocking(move || {
        let job = RawJob {
            document_name: &job_name,
            preamble,
            data: &data,
        };
        spooler.write_raw_job(&printer, &job)
    })
    .await
    .map_err(|e| ProbeError::Transport(format!("raw spool worker: {e}")))??;

    debug!("raw spool job written");
    Ok(())
}

/// Hand `document` to the OS "printto" association for `printer`.
#[instrument(skip(spooler, document), fields(document = %document.display()))]
pub async fn send_shell_print(
    spooler: Arc<dyn PrintSpooler>,
    printer: String,
    document: PathBuf,
) -> Result<()> {
    tokio::task::spawn_blocking(move || spooler.shell_print(&document, &printer))
        .await
        .map_err(|e| ProbeError::Transport(format!("shell print worker: {e}")))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{MockSpooler, SpoolEvent};
    use crate::transport::ESC_POS_INIT;

    #[test]
    fn job_name_carries_document_name() {
        assert_eq!(raw_job_name("label.usb", 2, 3), "label.usb (copy 2/3)");
    }

    #[tokio::test]
    async fn preamble_leads_the_job_payload() {
        let mock = Arc::new(MockSpooler::new());
        send_raw_spool(
            mock.clone(),
            "Sunmi".into(),
            "label.usb (copy 1/1)".into(),
            Some(ESC_POS_INIT),
            Arc::from(&b"payload"[..]),
        )
        .await
        .expect("spool");

        assert_eq!(
            mock.events(),
            vec![
                SpoolEvent::JobStart {
                    printer: "Sunmi".into(),
                    document: "label.usb (copy 1/1)".into(),
                },
                SpoolEvent::Preamble {
                    printer: "Sunmi".into(),
                    bytes: ESC_POS_INIT.to_vec(),
                },
                SpoolEvent::JobEnd {
                    printer: "Sunmi".into(),
                    document: "label.usb (copy 1/1)".into(),
                    bytes: 7,
                },
            ]
        );
    }

    #[tokio::test]
    async fn driver_failure_surfaces_as_transport_error() {
        let mock = Arc::new(MockSpooler::new());
        mock.fail_raw_writes("StartDocPrinter: access denied");

        let err = send_raw_spool(
            mock,
            "Sunmi".into(),
            "x".into(),
            None,
            Arc::from(&b"x"[..]),
        )
        .await
        .expect_err("write fails");
        assert!(matches!(err, ProbeError::Transport(_)));
    }
}
