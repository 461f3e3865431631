// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Transport selection by document extension.
//
// Table:
//   .txt .doc .docx .pdf  -> ShellPrint (associated app "printto")
//   .usb                  -> RawSpool with an ESC/POS reset before each copy
//   .tcp                  -> RawSocket (direct TCP to a configured endpoint)
//   anything else         -> RawSpool (generic raw fallback)

use std::time::Duration;

use printprobe_core::config::ProbeConfig;
use printprobe_core::types::{Document, SubmissionOutcome};

/// ESC @: resets most ESC/POS thermal printers to power-on defaults.
pub const ESC_POS_INIT: &[u8] = &[0x1B, 0x40];

/// How a document's bytes reach the printer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    /// Hand the file to the OS's associated application.
    ShellPrint,
    /// Write bytes through the spooler as a RAW job.
    RawSpool {
        /// Send [`ESC_POS_INIT`] before each copy (USB thermal printers).
        device_reset: bool,
    },
    /// Stream bytes over TCP to the printer's raw port.
    RawSocket,
}

impl Transport {
    /// Pick the transport for a (lower-cased, dot-less) file extension.
    pub fn for_extension(extension: &str) -> Self {
        match extension.to_ascii_lowercase().as_str() {
            "txt" | "doc" | "docx" | "pdf" => Self::ShellPrint,
            "usb" => Self::RawSpool { device_reset: true },
            "tcp" => Self::RawSocket,
            _ => Self::RawSpool {
                device_reset: false,
            },
        }
    }

    pub fn for_document(document: &Document) -> Self {
        Self::for_extension(document.extension())
    }

    /// Whether completion can be observed in the spooler queue.
    pub fn is_observable(&self) -> bool {
        !matches!(self, Self::ShellPrint)
    }

    /// What the dispatcher reports once every copy has been handed off.
    pub fn submission_outcome(&self) -> SubmissionOutcome {
        if self.is_observable() {
            SubmissionOutcome::PendingConfirmation
        } else {
            SubmissionOutcome::Completed
        }
    }

    /// Bytes written to the device before each copy's job starts.
    pub fn preamble(&self) -> Option<&'static [u8]> {
        match self {
            Self::RawSpool { device_reset: true } => Some(ESC_POS_INIT),
            _ => None,
        }
    }

    /// Pause between consecutive copies.
    pub fn copy_delay(&self, config: &ProbeConfig) -> Duration {
        match self {
            Self::ShellPrint => config.shell_copy_delay(),
            Self::RawSpool { .. } | Self::RawSocket => config.raw_copy_delay(),
        }
    }

    /// Human-readable name for log lines.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::ShellPrint => "shell print",
            Self::RawSpool { device_reset: true } => "USB raw",
            Self::RawSpool {
                device_reset: false,
            } => "raw spool",
            Self::RawSocket => "TCP raw",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shell_extensions() {
        for ext in ["txt", "doc", "docx", "pdf", "PDF"] {
            assert_eq!(Transport::for_extension(ext), Transport::ShellPrint, "{ext}");
        }
    }

    #[test]
    fn raw_extensions() {
        assert_eq!(
            Transport::for_extension("usb"),
            Transport::RawSpool { device_reset: true }
        );
        assert_eq!(Transport::for_extension("tcp"), Transport::RawSocket);
        for ext in ["xps", "bin", "prn", ""] {
            assert_eq!(
                Transport::for_extension(ext),
                Transport::RawSpool {
                    device_reset: false
                },
                "{ext:?}"
            );
        }
    }

    #[test]
    fn only_shell_print_is_fire_and_forget() {
        assert_eq!(
            Transport::ShellPrint.submission_outcome(),
            SubmissionOutcome::Completed
        );
        assert_eq!(
            Transport::RawSocket.submission_outcome(),
            SubmissionOutcome::PendingConfirmation
        );
        assert_eq!(
            Transport::RawSpool {
                device_reset: false
            }
            .submission_outcome(),
            SubmissionOutcome::PendingConfirmation
        );
    }

    #[test]
    fn usb_gets_reset_preamble() {
        assert_eq!(
            Transport::RawSpool { device_reset: true }.preamble(),
            Some(ESC_POS_INIT)
        );
        assert_eq!(Transport::RawSocket.preamble(), None);
    }

    #[test]
    fn copy_delays_follow_config() {
        let config = ProbeConfig::default();
        assert_eq!(
            Transport::ShellPrint.copy_delay(&config),
            Duration::from_millis(1000)
        );
        assert_eq!(
            Transport::RawSocket.copy_delay(&config),
            Duration::from_millis(500)
        );
    }
}
