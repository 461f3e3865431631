// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Document dispatcher: picks a transport for a document and sends every
// requested copy through it.
//
// Copies go out one after another with a fixed pause in between so the
// driver and network stack are not flooded. The caller gets one aggregate
// result for the batch; the first failing copy aborts the rest.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use printprobe_bridge::PrintSpooler;
use printprobe_core::config::{ProbeConfig, validate_copies};
use printprobe_core::error::{ProbeError, Result};
use printprobe_core::types::{Document, PrinterTarget, SubmissionResult};

use crate::activity::LogSink;
use crate::raw_client;
use crate::spool_client::{raw_job_name, send_raw_spool, send_shell_print};
use crate::transport::Transport;

/// Sends documents to printers using the transport their extension selects.
pub struct DocumentDispatcher {
    spooler: Arc<dyn PrintSpooler>,
    config: ProbeConfig,
    log: Arc<dyn LogSink>,
}

impl DocumentDispatcher {
    pub fn new(spooler: Arc<dyn PrintSpooler>, config: ProbeConfig, log: Arc<dyn LogSink>) -> Self {
        Self {
            spooler,
            config,
            log,
        }
    }

    /// Resolve the printer for this transport. Raw-socket printers must have
    /// an endpoint in the configuration.
    pub fn resolve_target(&self, printer: &str, transport: Transport) -> Result<PrinterTarget> {
        match transport {
            Transport::RawSocket => self
                .config
                .tcp_printers
                .get(printer)
                .cloned()
                .map(|endpoint| PrinterTarget::network(printer, endpoint))
                .ok_or_else(|| {
                    ProbeError::Configuration(format!("no TCP endpoint configured for '{printer}'"))
                }),
            Transport::ShellPrint | Transport::RawSpool { .. } => {
                Ok(PrinterTarget::spooled(printer))
            }
        }
    }

    /// Send `copies` copies of `document` to `printer`.
    ///
    /// Shell prints report [`SubmissionOutcome::Completed`] straight away;
    /// raw transports report `PendingConfirmation` and leave completion to
    /// the job tracker.
    ///
    /// [`SubmissionOutcome::Completed`]: printprobe_core::types::SubmissionOutcome::Completed
    #[instrument(skip(self, document), fields(document = %document.base_name()))]
    pub async fn submit(
        &self,
        document: &Document,
        printer: &str,
        copies: u32,
    ) -> Result<SubmissionResult> {
        validate_copies(copies)?;
        let transport = Transport::for_document(document);
        let target = self.resolve_target(printer, transport).inspect_err(|e| {
            self.log.record(format!("{} print rejected: {e}", transport.display_name()));
        })?;

        let payload: Arc<[u8]> = if transport.is_observable() {
            tokio::fs::read(document.path())
                .await
                .map(Arc::from)
                .map_err(|e| {
                    ProbeError::Transport(format!("read {}: {e}", document.path().display()))
                })?
        } else {
            Arc::from(Vec::new())
        };

        let delay = transport.copy_delay(&self.config);
        for copy in 1..=copies {
            if let Err(e) = self
                .submit_copy(transport, &target, document, &payload, copy, copies)
                .await
            {
                warn!(copy, copies, error = %e, "copy submission failed");
                self.log.record(format!(
                    "{} print failed on copy {copy}/{copies}: {e}",
                    transport.display_name()
                ));
                return Err(e);
            }

            self.log.record(format!(
                "{} copy {copy}/{copies} of {} sent to {}",
                transport.display_name(),
                document.base_name(),
                describe_target(&target)
            ));

            if copy < copies {
                tokio::time::sleep(delay).await;
            }
        }

        info!(copies, transport = transport.display_name(), "submission handed off");
        Ok(SubmissionResult {
            outcome: transport.submission_outcome(),
            copies_sent: copies,
            bytes_per_copy: payload.len(),
        })
    }

    async fn submit_copy(
        &self,
        transport: Transport,
        target: &PrinterTarget,
        document: &Document,
        payload: &Arc<[u8]>,
        copy: u32,
        copies: u32,
    ) -> Result<()> {
        let result = match (transport, &target.endpoint) {
            (Transport::ShellPrint, _) => {
                send_shell_print(
                    Arc::clone(&self.spooler),
                    target.name.clone(),
                    document.path().to_path_buf(),
                )
                .await
            }
            (Transport::RawSpool { .. }, _) => {
                send_raw_spool(
                    Arc::clone(&self.spooler),
                    target.name.clone(),
                    raw_job_name(document.base_name(), copy, copies),
                    transport.preamble(),
                    Arc::clone(payload),
                )
                .await
            }
            (Transport::RawSocket, Some(endpoint)) => {
                raw_client::send_raw(endpoint, payload, self.config.socket_timeout()).await
            }
            (Transport::RawSocket, None) => Err(ProbeError::Configuration(format!(
                "no TCP endpoint configured for '{}'",
                target.name
            ))),
        };

        // Everything below the dispatcher is a transport failure, whatever
        // layer raised it.
        result.map_err(|e| match e {
            ProbeError::Transport(_) | ProbeError::Configuration(_) => e,
            other => ProbeError::Transport(other.to_string()),
        })
    }
}

fn describe_target(target: &PrinterTarget) -> String {
    match &target.endpoint {
        Some(endpoint) => format!("{} ({endpoint})", target.name),
        None => target.name.clone(),
    }
}
