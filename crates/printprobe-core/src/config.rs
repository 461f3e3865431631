// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Application configuration.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ProbeError, Result};
use crate::types::TcpEndpoint;

/// Allowed copy counts per session.
pub const COPIES_RANGE: std::ops::RangeInclusive<u32> = 1..=10;
/// Allowed auto-print periods, in minutes.
pub const INTERVAL_RANGE_MINUTES: std::ops::RangeInclusive<u32> = 1..=120;
/// Allowed session timeouts, in seconds.
pub const TIMEOUT_RANGE_SECS: std::ops::RangeInclusive<u64> = 30..=300;
/// Allowed queue re-poll delays, in milliseconds.
pub const POLL_DELAY_RANGE_MS: std::ops::RangeInclusive<u64> = 500..=60_000;
/// Allowed miss budgets before a job is presumed printed.
pub const MISSING_POLLS_RANGE: std::ops::RangeInclusive<u32> = 1..=10;
/// Allowed pauses between copies, in milliseconds.
pub const COPY_DELAY_RANGE_MS: std::ops::RangeInclusive<u64> = 250..=5_000;
/// Allowed raw-socket timeouts, in seconds.
pub const SOCKET_TIMEOUT_RANGE_SECS: std::ops::RangeInclusive<u64> = 1..=120;

/// Persistent application settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Folder holding the test documents. `None` means `~/PrintTestDocuments`.
    pub document_folder: Option<PathBuf>,
    /// Only list printers whose name starts with this (case-insensitive).
    pub printer_prefix: Option<String>,
    /// Copies per print session.
    pub copies: u32,
    /// Period of the auto-print scheduler.
    pub auto_print_interval_minutes: u32,
    /// A pending session fails after this many seconds.
    pub print_timeout_secs: u64,
    /// Raw-socket printers, keyed by exact printer name.
    pub tcp_printers: BTreeMap<String, TcpEndpoint>,
    /// Queue polling cadence.
    pub polling: PollingConfig,
    /// Pause between copies on raw transports.
    pub raw_copy_delay_ms: u64,
    /// Pause between copies on shell prints.
    pub shell_copy_delay_ms: u64,
    /// Connect/write timeout for raw-socket printers.
    pub socket_timeout_secs: u64,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            document_folder: None,
            printer_prefix: None,
            copies: 1,
            auto_print_interval_minutes: 30,
            print_timeout_secs: 120,
            tcp_printers: BTreeMap::new(),
            polling: PollingConfig::default(),
            raw_copy_delay_ms: 500,
            shell_copy_delay_ms: 1000,
            socket_timeout_secs: 10,
        }
    }
}

/// How the job tracker paces its queue polls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    /// Delay before re-polling a job that is still in the queue.
    pub pending_poll_ms: u64,
    /// Delay before re-polling when the job was not found or the read failed.
    pub missing_poll_ms: u64,
    /// Misses tolerated before the job is presumed printed.
    pub max_missing_polls: u32,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            pending_poll_ms: 3000,
            missing_poll_ms: 5000,
            max_missing_polls: 3,
        }
    }
}

impl PollingConfig {
    pub fn pending_delay(&self) -> Duration {
        Duration::from_millis(self.pending_poll_ms)
    }

    pub fn missing_delay(&self) -> Duration {
        Duration::from_millis(self.missing_poll_ms)
    }

    pub fn validate(&self) -> Result<()> {
        check_range("polling.pending_poll_ms", self.pending_poll_ms, &POLL_DELAY_RANGE_MS)?;
        check_range("polling.missing_poll_ms", self.missing_poll_ms, &POLL_DELAY_RANGE_MS)?;
        check_range(
            "polling.max_missing_polls",
            self.max_missing_polls,
            &MISSING_POLLS_RANGE,
        )
    }
}

impl ProbeConfig {
    /// Load settings from a JSON file, falling back to defaults when the file
    /// is missing.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&data)?;
        config.validate()?;
        Ok(config)
    }

    /// Persist settings as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Reject out-of-range settings.
    pub fn validate(&self) -> Result<()> {
        validate_copies(self.copies)?;
        validate_interval(self.auto_print_interval_minutes)?;
        validate_timeout(self.print_timeout_secs)?;
        self.polling.validate()?;
        check_range("raw_copy_delay_ms", self.raw_copy_delay_ms, &COPY_DELAY_RANGE_MS)?;
        check_range("shell_copy_delay_ms", self.shell_copy_delay_ms, &COPY_DELAY_RANGE_MS)?;
        check_range(
            "socket_timeout_secs",
            self.socket_timeout_secs,
            &SOCKET_TIMEOUT_RANGE_SECS,
        )?;
        for (name, endpoint) in &self.tcp_printers {
            if endpoint.host.trim().is_empty() || endpoint.port == 0 {
                return Err(ProbeError::Configuration(format!(
                    "TCP printer '{name}' has an invalid endpoint {endpoint}"
                )));
            }
        }
        Ok(())
    }

    pub fn print_timeout(&self) -> Duration {
        Duration::from_secs(self.print_timeout_secs)
    }

    pub fn auto_print_interval(&self) -> Duration {
        Duration::from_secs(u64::from(self.auto_print_interval_minutes) * 60)
    }

    pub fn raw_copy_delay(&self) -> Duration {
        Duration::from_millis(self.raw_copy_delay_ms)
    }

    pub fn shell_copy_delay(&self) -> Duration {
        Duration::from_millis(self.shell_copy_delay_ms)
    }

    pub fn socket_timeout(&self) -> Duration {
        Duration::from_secs(self.socket_timeout_secs)
    }
}

fn check_range<T>(name: &str, value: T, range: &std::ops::RangeInclusive<T>) -> Result<()>
where
    T: PartialOrd + std::fmt::Display + std::fmt::Debug,
{
    if range.contains(&value) {
        Ok(())
    } else {
        Err(ProbeError::Configuration(format!(
            "{name} must be within {range:?}, got {value}"
        )))
    }
}

pub fn validate_copies(copies: u32) -> Result<()> {
    if COPIES_RANGE.contains(&copies) {
        Ok(())
    } else {
        Err(ProbeError::Configuration(format!(
            "copies must be within {COPIES_RANGE:?}, got {copies}"
        )))
    }
}

pub fn validate_interval(minutes: u32) -> Result<()> {
    if INTERVAL_RANGE_MINUTES.contains(&minutes) {
        Ok(())
    } else {
        Err(ProbeError::Configuration(format!(
            "auto-print interval must be within {INTERVAL_RANGE_MINUTES:?} minutes, got {minutes}"
        )))
    }
}

pub fn validate_timeout(secs: u64) -> Result<()> {
    if TIMEOUT_RANGE_SECS.contains(&secs) {
        Ok(())
    } else {
        Err(ProbeError::Configuration(format!(
            "print timeout must be within {TIMEOUT_RANGE_SECS:?} seconds, got {secs}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = ProbeConfig::default();
        config.validate().expect("defaults validate");
        assert_eq!(config.print_timeout(), Duration::from_secs(120));
        assert_eq!(config.auto_print_interval(), Duration::from_secs(30 * 60));
        assert_eq!(config.polling.max_missing_polls, 3);
    }

    #[test]
    fn out_of_range_settings_are_rejected() {
        let config = ProbeConfig {
            print_timeout_secs: 10,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ProbeError::Configuration(_))
        ));
        assert!(validate_copies(0).is_err());
        assert!(validate_copies(11).is_err());
        assert!(validate_interval(121).is_err());
        assert!(validate_timeout(300).is_ok());
    }

    #[test]
    fn pacing_settings_are_bounded() {
        let busy_loop = [
            ProbeConfig {
                polling: PollingConfig {
                    pending_poll_ms: 0,
                    ..Default::default()
                },
                ..Default::default()
            },
            ProbeConfig {
                polling: PollingConfig {
                    missing_poll_ms: 0,
                    ..Default::default()
                },
                ..Default::default()
            },
            ProbeConfig {
                polling: PollingConfig {
                    max_missing_polls: 0,
                    ..Default::default()
                },
                ..Default::default()
            },
            ProbeConfig {
                raw_copy_delay_ms: 0,
                ..Default::default()
            },
            ProbeConfig {
                shell_copy_delay_ms: 60_000,
                ..Default::default()
            },
            ProbeConfig {
                socket_timeout_secs: 0,
                ..Default::default()
            },
        ];
        for config in busy_loop {
            assert!(
                matches!(config.validate(), Err(ProbeError::Configuration(_))),
                "{config:?} should be rejected"
            );
        }

        let edges = ProbeConfig {
            polling: PollingConfig {
                pending_poll_ms: 500,
                missing_poll_ms: 60_000,
                max_missing_polls: 10,
            },
            raw_copy_delay_ms: 250,
            shell_copy_delay_ms: 5_000,
            socket_timeout_secs: 120,
            ..Default::default()
        };
        edges.validate().expect("range edges are accepted");
    }

    #[test]
    fn zero_poll_delay_in_file_is_refused() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "polling": { "pending_poll_ms": 0 } }"#).expect("write config");
        assert!(matches!(
            ProbeConfig::load(&path),
            Err(ProbeError::Configuration(message)) if message.contains("pending_poll_ms")
        ));
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{ "copies": 3, "tcp_printers": { "Kitchen": { "host": "10.0.0.7", "port": 9100 } } }"#,
        )
        .expect("write config");

        let config = ProbeConfig::load(&path).expect("load");
        assert_eq!(config.copies, 3);
        assert_eq!(config.print_timeout_secs, 120);
        assert_eq!(
            config.tcp_printers.get("Kitchen"),
            Some(&TcpEndpoint::new("10.0.0.7", 9100))
        );
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = ProbeConfig::load(dir.path().join("absent.json")).expect("load");
        assert_eq!(config, ProbeConfig::default());
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.json");
        let mut config = ProbeConfig::default();
        config.printer_prefix = Some("sunmi".into());
        config.save(&path).expect("save");

        let loaded = ProbeConfig::load(&path).expect("load");
        assert_eq!(loaded.printer_prefix.as_deref(), Some("sunmi"));
    }
}
