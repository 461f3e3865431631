// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Printer directory: the spooler's printer list seen through an optional
// name-prefix filter.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, warn};

use printprobe_bridge::PrintSpooler;
use printprobe_core::error::Result;

pub struct PrinterDirectory {
    spooler: Arc<dyn PrintSpooler>,
    /// Lower-cased prefix; `None` lists everything.
    prefix: Option<String>,
}

impl PrinterDirectory {
    pub fn new(spooler: Arc<dyn PrintSpooler>, prefix: Option<&str>) -> Self {
        let prefix = prefix
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_lowercase);
        Self { spooler, prefix }
    }

    pub fn matches(&self, name: &str) -> bool {
        self.prefix
            .as_deref()
            .is_none_or(|prefix| name.to_lowercase().starts_with(prefix))
    }

    /// Printer names passing the filter, de-duplicated, in spooler order.
    pub fn printers(&self) -> Result<Vec<String>> {
        let mut seen = HashSet::new();
        let printers: Vec<String> = self
            .spooler
            .list_printers()?
            .into_iter()
            .filter(|name| self.matches(name))
            .filter(|name| seen.insert(name.clone()))
            .collect();

        if printers.is_empty() {
            match &self.prefix {
                Some(prefix) => warn!(prefix, "no printers match the name filter"),
                None => warn!("no printers installed"),
            }
        } else {
            debug!(count = printers.len(), "printers listed");
        }
        Ok(printers)
    }

    /// The system default printer, if it passes the filter.
    pub fn default_printer(&self) -> Result<Option<String>> {
        Ok(self
            .spooler
            .default_printer()?
            .filter(|name| self.matches(name)))
    }

    /// The printer to use when none was named: the default if it is listed,
    /// otherwise the first listed printer.
    pub fn preferred(&self) -> Result<Option<String>> {
        let printers = self.printers()?;
        let default = self
            .default_printer()?
            .filter(|name| printers.contains(name));
        Ok(default.or_else(|| printers.into_iter().next()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::test_support::MockSpooler;

    fn directory(printers: &[&str], default: Option<&str>, prefix: Option<&str>) -> PrinterDirectory {
        PrinterDirectory::new(Arc::new(MockSpooler::with_printers(printers, default)), prefix)
    }

    #[test]
    fn prefix_filter_is_case_insensitive_and_dedups() {
        let dir = directory(
            &["Sunmi V2", "HP LaserJet", "SUNMI NT311", "Sunmi V2"],
            None,
            Some("sunmi"),
        );
        assert_eq!(
            dir.printers().expect("list"),
            vec!["Sunmi V2".to_string(), "SUNMI NT311".to_string()]
        );
    }

    #[test]
    fn no_prefix_lists_everything() {
        let dir = directory(&["A", "B"], None, Some("  "));
        assert_eq!(dir.printers().expect("list").len(), 2);
    }

    #[test]
    fn default_must_pass_filter() {
        let dir = directory(&["Sunmi V2", "HP LaserJet"], Some("HP LaserJet"), Some("Sunmi"));
        assert_eq!(dir.default_printer().expect("default"), None);
        assert_eq!(dir.preferred().expect("preferred"), Some("Sunmi V2".into()));

        let dir = directory(&["Sunmi V2", "Sunmi NT311"], Some("Sunmi NT311"), Some("Sunmi"));
        assert_eq!(dir.preferred().expect("preferred"), Some("Sunmi NT311".into()));
    }

    #[test]
    fn empty_list_has_no_preference() {
        let dir = directory(&["HP LaserJet"], None, Some("Sunmi"));
        assert!(dir.printers().expect("list").is_empty());
        assert_eq!(dir.preferred().expect("preferred"), None);
    }
}
