// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// printprobe: core types, error definitions, and settings shared across all
// crates.

pub mod config;
pub mod error;
pub mod types;

pub use config::ProbeConfig;
pub use error::ProbeError;
pub use types::*;
