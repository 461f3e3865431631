// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// printprobe: OS print spooler bridge.
//
// Defines the `PrintSpooler` seam the engine talks to, and picks the
// implementation for the target operating system: the Win32 spooler on
// Windows, a stub that reports `PlatformUnavailable` everywhere else.

use std::sync::Arc;

pub mod traits;

#[cfg(windows)]
pub mod win32;

#[cfg(not(windows))]
pub mod stub;

pub use traits::{PrintSpooler, RawJob};

/// Spooler implementation for the current operating system.
pub fn platform_spooler() -> Arc<dyn PrintSpooler> {
    #[cfg(windows)]
    {
        Arc::new(win32::WindowsSpooler::new())
    }
    #[cfg(not(windows))]
    {
        Arc::new(stub::StubSpooler)
    }
}
