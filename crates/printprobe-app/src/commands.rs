// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Command handlers. Output meant for the operator goes to stdout; diagnostics
// go through `tracing` (stderr).

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Local;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{broadcast, watch};
use tracing::{info, warn};

use printprobe_core::config::validate_copies;
use printprobe_core::error::{ProbeError, Result};
use printprobe_core::types::{SessionId, SessionOutcome, TcpEndpoint, TriggerSource};
use printprobe_print::{
    AutoPrintScheduler, EngineEvent, EngineHandle, EngineSnapshot, PrintRequest, Selection,
};

use crate::control::{self, ControlLine};
use crate::services::app_services::AppServices;

/// Session settings given on the command line; `None` falls back to config.
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    pub printer: Option<String>,
    pub document: Option<String>,
    pub copies: Option<u32>,
    pub timeout_secs: Option<u64>,
}

pub enum ConfigChange {
    Tcp {
        printer: String,
        host: String,
        port: u16,
    },
    Folder(PathBuf),
    Prefix(Option<String>),
}

// ---------------------------------------------------------------------------
// Printers, documents, settings
// ---------------------------------------------------------------------------

pub fn list_printers(services: &AppServices) -> Result<()> {
    let directory = services.printers();
    let printers = directory.printers()?;
    if printers.is_empty() {
        match &services.config().printer_prefix {
            Some(prefix) => println!("no printers whose name starts with '{prefix}'"),
            None => println!("no printers installed"),
        }
        return Ok(());
    }

    let default = directory.default_printer()?;
    for name in &printers {
        let marker = if default.as_deref() == Some(name.as_str()) { "*" } else { " " };
        println!("{marker} {name}");
    }
    println!("{} printer(s)", printers.len());
    Ok(())
}

pub fn list_documents(services: &AppServices) -> Result<()> {
    let store = services.documents();
    let documents = store.list()?;
    println!("{}", store.folder().display());
    for document in &documents {
        println!("  {}", document.base_name());
    }
    println!("{} document(s)", documents.len());
    Ok(())
}

pub fn add_document(services: &AppServices, path: &Path) -> Result<()> {
    let document = services.documents().add(path)?;
    println!("added {}", document.base_name());
    Ok(())
}

pub fn remove_document(services: &AppServices, name: &str) -> Result<()> {
    services.documents().remove(name)?;
    println!("removed {name}");
    Ok(())
}

/// Print the settings, or apply one change and persist it.
pub fn config(services: &mut AppServices, change: Option<ConfigChange>) -> Result<()> {
    let Some(change) = change else {
        println!("{}", serde_json::to_string_pretty(services.config())?);
        return Ok(());
    };

    let mut config = services.config().clone();
    match change {
        ConfigChange::Tcp {
            printer,
            host,
            port,
        } => {
            let endpoint = TcpEndpoint::new(host, port);
            println!("{printer} -> {endpoint}");
            config.tcp_printers.insert(printer, endpoint);
        }
        ConfigChange::Folder(path) => {
            let path = std::path::absolute(path)?;
            println!("document folder: {}", path.display());
            config.document_folder = Some(path);
        }
        ConfigChange::Prefix(prefix) => {
            let prefix = prefix.filter(|p| !p.trim().is_empty());
            match &prefix {
                Some(p) => println!("printer filter: names starting with '{p}'"),
                None => println!("printer filter cleared"),
            }
            config.printer_prefix = prefix;
        }
    }
    config.validate()?;
    services.save_config(config)
}

// ---------------------------------------------------------------------------
// print
// ---------------------------------------------------------------------------

/// Run one manual session. Returns whether it succeeded.
pub async fn print_once(services: &AppServices, options: SessionOptions) -> Result<bool> {
    let printer = services.resolve_printer(options.printer.as_deref())?;
    let document = services.resolve_document(options.document.as_deref())?;
    let copies = options.copies.unwrap_or(services.config().copies);
    validate_copies(copies)?;

    let (engine, task) = services.spawn_engine();
    if let Some(secs) = options.timeout_secs {
        engine.set_timeout(secs).await?;
    }
    let mut events = engine.subscribe();

    let session_id = engine
        .start(PrintRequest {
            printer,
            document,
            copies,
            source: TriggerSource::Manual,
        })
        .await?;
    let outcome = wait_for_outcome(&mut events, session_id).await;
    let snapshot = engine.snapshot().await;

    engine.shutdown().await;
    if let Err(e) = task.await {
        warn!(error = %e, "print engine task ended abnormally");
    }

    let outcome = outcome?;
    println!("{outcome}");
    if let Ok(snapshot) = snapshot {
        println!("{}", counters_line(&snapshot));
    }
    Ok(outcome.is_success())
}

async fn wait_for_outcome(
    events: &mut broadcast::Receiver<EngineEvent>,
    session_id: SessionId,
) -> Result<SessionOutcome> {
    loop {
        match events.recv().await {
            Ok(EngineEvent::SessionFinished {
                session_id: finished,
                outcome,
                ..
            }) if finished == session_id => return Ok(outcome),
            Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => continue,
            Err(broadcast::error::RecvError::Closed) => return Err(ProbeError::EngineStopped),
        }
    }
}

// ---------------------------------------------------------------------------
// auto
// ---------------------------------------------------------------------------

/// Run the scheduler until `quit` or Ctrl-C.
pub async fn auto_print(
    services: &AppServices,
    options: SessionOptions,
    interval_minutes: Option<u32>,
    export_log: Option<&Path>,
) -> Result<()> {
    let config = services.config();
    let copies = options.copies.unwrap_or(config.copies);
    validate_copies(copies)?;
    let interval = interval_minutes.unwrap_or(config.auto_print_interval_minutes);

    // A missing printer or document is not fatal: each tick is skipped until
    // the operator fixes it.
    let printer = services
        .resolve_printer(options.printer.as_deref())
        .inspect_err(|e| warn!(error = %e, "no printer for auto print"))
        .ok();
    let document = services
        .resolve_document(options.document.as_deref())
        .inspect_err(|e| warn!(error = %e, "no document for auto print"))
        .ok();

    let (engine, task) = services.spawn_engine();
    if let Some(secs) = options.timeout_secs {
        engine.set_timeout(secs).await?;
    }
    engine.reset_counters().await?;

    let (selection_tx, selection_rx) = watch::channel(Selection {
        printer,
        document,
        copies,
    });
    let mut scheduler = AutoPrintScheduler::new(
        engine.clone(),
        selection_rx,
        interval,
        Arc::new(services.log().clone()),
    )?;
    scheduler.start();

    {
        let selection = selection_tx.borrow();
        println!(
            "auto print every {interval} min: {} -> {} ({copies} per run)",
            selection
                .document
                .as_ref()
                .map_or("<no document>", |d| d.base_name()),
            selection.printer.as_deref().unwrap_or("<no printer>"),
        );
    }
    println!("{}", control::HELP);

    let mut events = engine.subscribe();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                info!("interrupted");
                break;
            }

            line = lines.next_line(), if stdin_open => {
                match line {
                    Ok(Some(line)) => match ControlLine::parse(&line) {
                        None => {}
                        Some(Err(message)) => eprintln!("{message}"),
                        Some(Ok(ControlLine::Quit)) => break,
                        Some(Ok(command)) => {
                            if let Err(e) = apply(command, &engine, &mut scheduler, &selection_tx).await {
                                eprintln!("{e}");
                                if matches!(e, ProbeError::EngineStopped) {
                                    break;
                                }
                            }
                        }
                    },
                    Ok(None) => {
                        info!("stdin closed; press Ctrl-C to stop");
                        stdin_open = false;
                    }
                    Err(e) => {
                        warn!(error = %e, "stdin unreadable; press Ctrl-C to stop");
                        stdin_open = false;
                    }
                }
            }

            event = events.recv() => {
                match event {
                    Ok(event) => report(&event),
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        warn!(missed, "event display fell behind");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }

    scheduler.stop();
    let summary = engine.snapshot().await;
    engine.shutdown().await;
    if let Err(e) = task.await {
        warn!(error = %e, "print engine task ended abnormally");
    }
    if let Ok(snapshot) = summary {
        println!("{}", counters_line(&snapshot));
    }

    if let Some(path) = export_log {
        let written = services.log().export(path)?;
        println!("activity log written to {}", written.display());
    }
    Ok(())
}

async fn apply(
    command: ControlLine,
    engine: &EngineHandle,
    scheduler: &mut AutoPrintScheduler,
    selection: &watch::Sender<Selection>,
) -> Result<()> {
    match command {
        ControlLine::Print => {
            let current = selection.borrow().clone();
            let printer = current.printer.ok_or(ProbeError::NoPrinterSelected)?;
            let document = current.document.ok_or(ProbeError::NoDocumentSelected)?;
            engine
                .start(PrintRequest {
                    printer,
                    document,
                    copies: current.copies,
                    source: TriggerSource::Manual,
                })
                .await?;
        }
        ControlLine::Interval(minutes) => {
            scheduler.set_interval(minutes)?;
            println!("interval: {minutes} min");
        }
        ControlLine::Copies(copies) => {
            validate_copies(copies)?;
            selection.send_modify(|s| s.copies = copies);
            println!("copies: {copies}");
        }
        ControlLine::Timeout(secs) => {
            engine.set_timeout(secs).await?;
            println!("timeout: {secs}s");
        }
        ControlLine::Reset => {
            engine.reset_counters().await?;
            println!("counters reset");
        }
        ControlLine::Status => {
            let snapshot = engine.snapshot().await?;
            println!("{}", status_line(&snapshot, scheduler));
            println!("{}", counters_line(&snapshot));
        }
        ControlLine::Help => println!("{}", control::HELP),
        ControlLine::Quit => {}
    }
    Ok(())
}

fn report(event: &EngineEvent) {
    let now = Local::now().format("%H:%M:%S");
    match event {
        EngineEvent::SessionStarted {
            printer,
            document,
            copies,
            source,
            ..
        } => println!("[{now}] {source:?} print: {document} -> {printer} x{copies}"),
        EngineEvent::SessionFinished {
            document,
            outcome,
            counters,
            ..
        } => println!(
            "[{now}] {document}: {outcome} (succeeded {}, failed {})",
            counters.succeeded, counters.failed
        ),
        EngineEvent::TriggerSkipped { source, reason } => {
            println!("[{now}] {source:?} print skipped: {reason}")
        }
    }
}

fn status_line(snapshot: &EngineSnapshot, scheduler: &AutoPrintScheduler) -> String {
    let schedule = if scheduler.is_running() {
        format!("every {} min", scheduler.interval().as_secs() / 60)
    } else {
        "stopped".into()
    };
    match &snapshot.active {
        Some(job) => format!(
            "auto print {schedule}; printing {} -> {} ({}s of {}s)",
            job.document,
            job.printer,
            snapshot.elapsed_secs.unwrap_or(0),
            snapshot.timeout_secs
        ),
        None if snapshot.submission_pending => format!(
            "auto print {schedule}; waiting for a timed-out submission to finish"
        ),
        None => format!("auto print {schedule}; idle (timeout {}s)", snapshot.timeout_secs),
    }
}

fn counters_line(snapshot: &EngineSnapshot) -> String {
    format!(
        "succeeded: {}  failed: {}",
        snapshot.counters.succeeded, snapshot.counters.failed
    )
}
