// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Win32 print spooler backend.
//
// Raw jobs follow the classic winspool sequence:
//   OpenPrinter -> [WritePrinter preamble] -> StartDocPrinter(RAW)
//   -> StartPagePrinter -> WritePrinter -> EndPagePrinter -> EndDocPrinter
//   -> ClosePrinter
// Printer handles and open documents are RAII guards, so every early return
// closes what was opened.

use std::ffi::c_void;
use std::path::Path;

use ::windows::Win32::Foundation::{BOOL, HWND};
use ::windows::Win32::Graphics::Printing::{
    ClosePrinter, DOC_INFO_1W, EndDocPrinter, EndPagePrinter, EnumJobsW, EnumPrintersW,
    GetDefaultPrinterW, JOB_INFO_1W, OpenPrinterW, PRINTER_ENUM_CONNECTIONS, PRINTER_ENUM_LOCAL,
    PRINTER_HANDLE, PRINTER_INFO_4W, StartDocPrinterW, StartPagePrinter, WritePrinter,
};
use ::windows::Win32::UI::Shell::ShellExecuteW;
use ::windows::Win32::UI::WindowsAndMessaging::SW_HIDE;
use ::windows::core::{HSTRING, PWSTR};
use tracing::{debug, instrument};

use printprobe_core::error::{ProbeError, Result};
use printprobe_core::types::{JobStatusFlags, QueueEntry};

use crate::traits::{PrintSpooler, RawJob};

/// `ShellExecuteW` reports success with any value above 32.
const SHELL_EXECUTE_MIN_SUCCESS: isize = 32;

/// Win32 spooler (`winspool.drv`) backend.
#[derive(Debug, Default)]
pub struct WindowsSpooler;

impl WindowsSpooler {
    pub fn new() -> Self {
        Self
    }
}

impl PrintSpooler for WindowsSpooler {
    fn platform_name(&self) -> &str {
        "Windows spooler"
    }

    fn list_printers(&self) -> Result<Vec<String>> {
        let flags = PRINTER_ENUM_LOCAL | PRINTER_ENUM_CONNECTIONS;
        let mut needed = 0u32;
        let mut returned = 0u32;

        // First call sizes the buffer and is expected to fail.
        let _ = unsafe { EnumPrintersW(flags, None, 4, None, &mut needed, &mut returned) };
        if needed == 0 {
            return Ok(Vec::new());
        }

        let mut buffer = vec![0u8; needed as usize];
        unsafe {
            EnumPrintersW(
                flags,
                None,
                4,
                Some(buffer.as_mut_slice()),
                &mut needed,
                &mut returned,
            )
        }
        .win32_ok()
        .map_err(|e| ProbeError::Transport(format!("EnumPrinters: {e}")))?;

        let infos = unsafe {
            std::slice::from_raw_parts(
                buffer.as_ptr() as *const PRINTER_INFO_4W,
                returned as usize,
            )
        };
        Ok(infos
            .iter()
            .filter_map(|info| unsafe { wide_to_string(info.pPrinterName) })
            .collect())
    }

    fn default_printer(&self) -> Result<Option<String>> {
        let mut len = 0u32;
        let _ = unsafe { GetDefaultPrinterW(PWSTR::null(), &mut len) };
        if len == 0 {
            return Ok(None);
        }

        let mut buffer = vec![0u16; len as usize];
        unsafe { GetDefaultPrinterW(PWSTR(buffer.as_mut_ptr()), &mut len) }
            .win32_ok()
            .map_err(|e| ProbeError::Transport(format!("GetDefaultPrinter: {e}")))?;
        Ok(unsafe { wide_to_string(PWSTR(buffer.as_mut_ptr())) })
    }

    #[instrument(skip(self), fields(document = %document.display()))]
    fn shell_print(&self, document: &Path, printer: &str) -> Result<()> {
        let operation = HSTRING::from("printto");
        let file = HSTRING::from(document.as_os_str());
        let parameters = HSTRING::from(format!("\"{printer}\""));
        let directory = HSTRING::from(".");

        let instance = unsafe {
            ShellExecuteW(
                HWND::default(),
                &operation,
                &file,
                &parameters,
                &directory,
                SW_HIDE,
            )
        };

        let code = instance.0 as isize;
        if code <= SHELL_EXECUTE_MIN_SUCCESS {
            return Err(ProbeError::Transport(format!(
                "ShellExecute printto failed with code {code}"
            )));
        }
        debug!("shell print-to handed off");
        Ok(())
    }

    #[instrument(skip(self, job), fields(document = job.document_name, bytes = job.data.len()))]
    fn write_raw_job(&self, printer: &str, job: &RawJob<'_>) -> Result<()> {
        let transport = |stage: &str, e: ::windows::core::Error| {
            ProbeError::Transport(format!("{stage} on '{printer}': {e}"))
        };

        let handle = PrinterHandle::open(printer).map_err(|e| transport("OpenPrinter", e))?;

        let doc = handle
            .start_raw_doc(job.document_name)
            .map_err(|e| transport("StartDocPrinter", e))?;
        unsafe { StartPagePrinter(handle.0) }
            .win32_ok()
            .map_err(|e| transport("StartPagePrinter", e))?;
        // WritePrinter needs a started document, so the reset leads the page.
        if let Some(preamble) = job.preamble {
            handle
                .write(preamble)
                .map_err(|e| transport("WritePrinter (preamble)", e))?;
        }
        handle
            .write(job.data)
            .map_err(|e| transport("WritePrinter", e))?;
        unsafe { EndPagePrinter(handle.0) }
            .win32_ok()
            .map_err(|e| transport("EndPagePrinter", e))?;
        doc.finish().map_err(|e| transport("EndDocPrinter", e))?;

        debug!("raw job spooled");
        Ok(())
    }

    fn enum_jobs(&self, printer: &str) -> Result<Vec<QueueEntry>> {
        let query = |stage: &str, e: ::windows::core::Error| {
            ProbeError::QueueQuery(format!("{stage} on '{printer}': {e}"))
        };

        let handle = PrinterHandle::open(printer).map_err(|e| query("OpenPrinter", e))?;

        let mut needed = 0u32;
        let mut returned = 0u32;
        let _ = unsafe { EnumJobsW(handle.0, 0, u32::MAX, 1, None, &mut needed, &mut returned) };
        if needed == 0 {
            return Ok(Vec::new());
        }

        let mut buffer = vec![0u8; needed as usize];
        unsafe {
            EnumJobsW(
                handle.0,
                0,
                u32::MAX,
                1,
                Some(buffer.as_mut_slice()),
                &mut needed,
                &mut returned,
            )
        }
        .win32_ok()
        .map_err(|e| query("EnumJobs", e))?;

        let infos = unsafe {
            std::slice::from_raw_parts(buffer.as_ptr() as *const JOB_INFO_1W, returned as usize)
        };
        Ok(infos
            .iter()
            .map(|info| QueueEntry {
                job_id: info.JobId,
                document: unsafe { wide_to_string(info.pDocument) }.unwrap_or_default(),
                status: JobStatusFlags(info.Status),
            })
            .collect())
    }
}

/// Open printer handle, closed on drop.
struct PrinterHandle(PRINTER_HANDLE);

impl PrinterHandle {
    fn open(name: &str) -> ::windows::core::Result<Self> {
        let name = HSTRING::from(name);
        let mut handle = PRINTER_HANDLE::default();
        unsafe { OpenPrinterW(&name, &mut handle, None) }.win32_ok()?;
        Ok(Self(handle))
    }

    fn write(&self, bytes: &[u8]) -> ::windows::core::Result<()> {
        let mut written = 0u32;
        unsafe {
            WritePrinter(
                self.0,
                bytes.as_ptr() as *const c_void,
                bytes.len() as u32,
                &mut written,
            )
        }
        .win32_ok()?;
        if written as usize != bytes.len() {
            return Err(::windows::core::Error::from_win32());
        }
        Ok(())
    }

    fn start_raw_doc(&self, document_name: &str) -> ::windows::core::Result<OpenDoc<'_>> {
        let mut name: Vec<u16> = document_name.encode_utf16().chain(Some(0)).collect();
        let mut datatype: Vec<u16> = "RAW".encode_utf16().chain(Some(0)).collect();
        let info = DOC_INFO_1W {
            pDocName: PWSTR(name.as_mut_ptr()),
            pOutputFile: PWSTR::null(),
            pDatatype: PWSTR(datatype.as_mut_ptr()),
        };

        let job_id = unsafe { StartDocPrinterW(self.0, 1, &info) };
        if job_id == 0 {
            return Err(::windows::core::Error::from_win32());
        }
        Ok(OpenDoc {
            printer: self,
            finished: false,
        })
    }
}

impl Drop for PrinterHandle {
    fn drop(&mut self) {
        let _ = unsafe { ClosePrinter(self.0) };
    }
}

/// A started spooler document; ended on drop if not finished explicitly.
struct OpenDoc<'a> {
    printer: &'a PrinterHandle,
    finished: bool,
}

impl OpenDoc<'_> {
    fn finish(mut self) -> ::windows::core::Result<()> {
        self.finished = true;
        unsafe { EndDocPrinter(self.printer.0) }.win32_ok()
    }
}

impl Drop for OpenDoc<'_> {
    fn drop(&mut self) {
        if !self.finished {
            let _ = unsafe { EndDocPrinter(self.printer.0) };
        }
    }
}

/// Normalizes winspool return conventions (`BOOL` or `Result<()>`).
trait Win32Ok {
    fn win32_ok(self) -> ::windows::core::Result<()>;
}

impl Win32Ok for BOOL {
    fn win32_ok(self) -> ::windows::core::Result<()> {
        self.ok()
    }
}

impl Win32Ok for ::windows::core::Result<()> {
    fn win32_ok(self) -> ::windows::core::Result<()> {
        self
    }
}

/// Copy a NUL-terminated UTF-16 string owned by a spooler buffer.
unsafe fn wide_to_string(ptr: PWSTR) -> Option<String> {
    if ptr.is_null() {
        None
    } else {
        unsafe { ptr.to_string() }.ok()
    }
}
