// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Test document folder.
//
// A flat directory of files the engine may print. Only files with an
// allow-listed extension are listed or accepted; everything else in the
// folder is ignored.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use printprobe_core::error::{ProbeError, Result};
use printprobe_core::types::Document;

/// Extensions (lower-case, no dot) the store lists and accepts.
pub const ALLOWED_EXTENSIONS: [&str; 7] = ["pdf", "txt", "doc", "docx", "xps", "tcp", "usb"];

/// Folder name used under the home directory when none is configured.
const DEFAULT_FOLDER_NAME: &str = "PrintTestDocuments";

/// `~/PrintTestDocuments`, or a relative `PrintTestDocuments` when no home
/// directory is known.
pub fn default_document_folder() -> PathBuf {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_default()
        .join(DEFAULT_FOLDER_NAME)
}

/// Whether `path` has an allow-listed extension (case-insensitive).
pub fn is_allowed(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .is_some_and(|ext| ALLOWED_EXTENSIONS.contains(&ext.as_str()))
}

#[derive(Debug, Clone)]
pub struct DocumentStore {
    folder: PathBuf,
}

impl DocumentStore {
    /// Open the store at `folder`, creating the directory if needed.
    pub fn open(folder: impl Into<PathBuf>) -> Result<Self> {
        let folder = std::path::absolute(folder.into())?;
        std::fs::create_dir_all(&folder)?;
        debug!(folder = %folder.display(), "document store opened");
        Ok(Self { folder })
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }

    /// All printable documents in the folder, sorted by file name.
    pub fn list(&self) -> Result<Vec<Document>> {
        let mut documents = Vec::new();
        for entry in std::fs::read_dir(&self.folder)? {
            let path = entry?.path();
            if path.is_file() && is_allowed(&path) {
                documents.push(Document::from_path(path)?);
            }
        }
        documents.sort_by(|a, b| a.base_name().cmp(b.base_name()));
        Ok(documents)
    }

    /// Copy `source` into the folder, replacing a document with the same name.
    pub fn add(&self, source: &Path) -> Result<Document> {
        if !is_allowed(source) {
            return Err(ProbeError::UnsupportedDocument(source.display().to_string()));
        }
        if !source.is_file() {
            return Err(ProbeError::DocumentNotFound(source.display().to_string()));
        }
        let name = source
            .file_name()
            .ok_or_else(|| ProbeError::UnsupportedDocument(source.display().to_string()))?;

        let dest = self.folder.join(name);
        std::fs::copy(source, &dest)?;
        info!(document = %dest.display(), "document added");
        Document::from_path(dest)
    }

    /// Delete the document called `name`.
    pub fn remove(&self, name: &str) -> Result<()> {
        let document = self.find(name)?;
        std::fs::remove_file(document.path())?;
        info!(document = name, "document removed");
        Ok(())
    }

    /// Resolve a file name in the folder to a document.
    pub fn find(&self, name: &str) -> Result<Document> {
        // Plain file names only; no walking out of the folder.
        let is_plain = Path::new(name).file_name().and_then(|n| n.to_str()) == Some(name);
        let path = self.folder.join(name);
        if !is_plain || !path.is_file() || !is_allowed(&path) {
            return Err(ProbeError::DocumentNotFound(name.to_string()));
        }
        Document::from_path(path)
    }

    /// First document by name, used when nothing was picked explicitly.
    pub fn first(&self) -> Result<Option<Document>> {
        Ok(self.list()?.into_iter().next())
    }
}
