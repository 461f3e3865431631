// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Central service layer: loads settings, opens the document folder, picks the
// platform spooler, and resolves the printer/document a command should use.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{info, warn};

use printprobe_bridge::PrintSpooler;
use printprobe_core::error::{ProbeError, Result};
use printprobe_core::types::Document;
use printprobe_core::ProbeConfig;
use printprobe_print::documents::{DocumentStore, default_document_folder};
use printprobe_print::{ActivityLog, EngineHandle, PrintEngine, PrinterDirectory};

use super::data_dir;

const CONFIG_FILE: &str = "config.json";

/// Everything a command handler needs, built once at startup.
pub struct AppServices {
    config: ProbeConfig,
    data_dir: PathBuf,
    spooler: Arc<dyn PrintSpooler>,
    documents: DocumentStore,
    printers: PrinterDirectory,
    log: ActivityLog,
}

impl AppServices {
    /// Initialise services against the OS spooler.
    pub fn init(data_dir_override: Option<&Path>) -> Result<Self> {
        Self::with_spooler(data_dir_override, printprobe_bridge::platform_spooler())
    }

    pub fn with_spooler(
        data_dir_override: Option<&Path>,
        spooler: Arc<dyn PrintSpooler>,
    ) -> Result<Self> {
        let dir = data_dir::data_dir(data_dir_override);
        info!(path = %dir.display(), spooler = spooler.platform_name(), "initialising app services");

        let config = load_config(&dir);
        let folder = config
            .document_folder
            .clone()
            .unwrap_or_else(default_document_folder);
        let documents = DocumentStore::open(folder)?;
        let printers = PrinterDirectory::new(Arc::clone(&spooler), config.printer_prefix.as_deref());

        Ok(Self {
            config,
            data_dir: dir,
            spooler,
            documents,
            printers,
            log: ActivityLog::new(),
        })
    }

    pub fn config(&self) -> &ProbeConfig {
        &self.config
    }

    /// Replace and persist the settings.
    pub fn save_config(&mut self, config: ProbeConfig) -> Result<()> {
        config.save(self.data_dir.join(CONFIG_FILE))?;
        self.config = config;
        Ok(())
    }

    pub fn documents(&self) -> &DocumentStore {
        &self.documents
    }

    pub fn printers(&self) -> &PrinterDirectory {
        &self.printers
    }

    pub fn log(&self) -> &ActivityLog {
        &self.log
    }

    /// The named printer, or the directory's preferred one.
    pub fn resolve_printer(&self, requested: Option<&str>) -> Result<String> {
        match requested {
            Some(name) => {
                if !self.printers.matches(name) {
                    warn!(printer = name, "printer does not match the configured name filter");
                }
                Ok(name.to_string())
            }
            None => self
                .printers
                .preferred()?
                .ok_or(ProbeError::NoPrinterSelected),
        }
    }

    /// The named document from the folder, or the first one listed.
    pub fn resolve_document(&self, requested: Option<&str>) -> Result<Document> {
        match requested {
            Some(name) => self.documents.find(name),
            None => self
                .documents
                .first()?
                .ok_or(ProbeError::NoDocumentSelected),
        }
    }

    /// Spawn the print engine with the current settings.
    pub fn spawn_engine(&self) -> (EngineHandle, JoinHandle<()>) {
        PrintEngine::spawn(
            Arc::clone(&self.spooler),
            &self.config,
            Arc::new(self.log.clone()),
        )
    }
}

/// Load `config.json`, falling back to defaults when it is missing or broken.
fn load_config(data_dir: &Path) -> ProbeConfig {
    match ProbeConfig::load(data_dir.join(CONFIG_FILE)) {
        Ok(config) => config,
        Err(e) => {
            warn!(error = %e, "settings unreadable, using defaults");
            ProbeConfig::default()
        }
    }
}
