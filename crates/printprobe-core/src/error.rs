// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for printprobe.

use thiserror::Error;

/// Top-level error type for all printprobe operations.
#[derive(Debug, Error)]
pub enum ProbeError {
    // -- Submission errors --
    /// Missing endpoint mapping or an out-of-range setting.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// I/O, driver, or socket failure while handing bytes to the printer.
    #[error("transport failed: {0}")]
    Transport(String),

    /// The spooler queue could not be read. Always retried.
    #[error("queue query failed: {0}")]
    QueueQuery(String),

    /// A pending session outlived the configured print timeout.
    #[error("print timed out after {elapsed_secs}s")]
    Timeout { elapsed_secs: u64 },

    // -- Session control --
    #[error("no printer selected")]
    NoPrinterSelected,

    #[error("no test document selected")]
    NoDocumentSelected,

    #[error("a print session is already active ({0})")]
    SessionActive(String),

    #[error("print engine has stopped")]
    EngineStopped,

    // -- Documents --
    #[error("unsupported document type: {0}")]
    UnsupportedDocument(String),

    #[error("document not found: {0}")]
    DocumentNotFound(String),

    // -- Platform / persistence --
    #[error("print spooler not available on this platform")]
    PlatformUnavailable,

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, ProbeError>;
