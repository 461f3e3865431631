// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Service layer: wires settings, the OS spooler, the document folder and the
// print engine together for the command handlers.

pub mod app_services;
pub mod data_dir;
