// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// printprobe: printer driver soak tester
//
// Entry point. Initialises logging, parses the command line, builds the
// service layer and hands off to the command handlers.

mod commands;
mod control;
mod services;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};

use services::app_services::AppServices;

#[derive(Parser, Debug)]
#[command(
    name = "printprobe",
    version,
    about = "Exercise printer drivers by printing test documents on repeat"
)]
struct Cli {
    /// Directory holding config.json (defaults to the platform data dir)
    #[arg(long, env = "PRINTPROBE_DATA_DIR", global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List printers (after the name filter) and mark the default
    Printers,
    /// Manage the test document folder
    Docs {
        #[command(subcommand)]
        action: DocsAction,
    },
    /// Show or change persisted settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Run one print session and wait for its outcome
    Print(PrintArgs),
    /// Print on a fixed interval until stopped
    Auto(AutoArgs),
}

#[derive(Subcommand, Debug)]
enum DocsAction {
    /// List printable documents
    List,
    /// Copy a file into the document folder
    Add { path: PathBuf },
    /// Delete a document from the folder
    Remove { name: String },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the current settings as JSON
    Show,
    /// Map a printer name to a raw TCP endpoint
    Tcp {
        printer: String,
        host: String,
        #[arg(default_value_t = 9100)]
        port: u16,
    },
    /// Set the document folder
    Folder { path: PathBuf },
    /// Only list printers whose name starts with PREFIX (omit to clear)
    Prefix { prefix: Option<String> },
}

/// Options shared by `print` and `auto`.
#[derive(Args, Debug, Clone)]
struct SessionArgs {
    /// Printer name (defaults to the default printer)
    #[arg(long, short)]
    printer: Option<String>,

    /// Document file name in the document folder (defaults to the first one)
    #[arg(long, short)]
    document: Option<String>,

    /// Copies per session (1-10)
    #[arg(long, short)]
    copies: Option<u32>,

    /// Seconds before a pending session fails (30-300)
    #[arg(long, short)]
    timeout: Option<u64>,
}

#[derive(Args, Debug)]
struct PrintArgs {
    #[command(flatten)]
    session: SessionArgs,
}

#[derive(Args, Debug)]
struct AutoArgs {
    #[command(flatten)]
    session: SessionArgs,

    /// Minutes between scheduled prints (1-120)
    #[arg(long, short)]
    interval: Option<u32>,

    /// Write the activity log here on exit
    #[arg(long)]
    export_log: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    tracing::debug!(?cli, "printprobe starting");

    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Returns `Ok(false)` when the command ran but the print did not succeed.
async fn run(cli: Cli) -> printprobe_core::error::Result<bool> {
    let mut services = AppServices::init(cli.data_dir.as_deref())?;

    match cli.command {
        Command::Printers => commands::list_printers(&services).map(|_| true),
        Command::Docs { action } => match action {
            DocsAction::List => commands::list_documents(&services),
            DocsAction::Add { path } => commands::add_document(&services, &path),
            DocsAction::Remove { name } => commands::remove_document(&services, &name),
        }
        .map(|_| true),
        Command::Config { action } => {
            let change = match action {
                ConfigAction::Show => None,
                ConfigAction::Tcp {
                    printer,
                    host,
                    port,
                } => Some(commands::ConfigChange::Tcp {
                    printer,
                    host,
                    port,
                }),
                ConfigAction::Folder { path } => Some(commands::ConfigChange::Folder(path)),
                ConfigAction::Prefix { prefix } => Some(commands::ConfigChange::Prefix(prefix)),
            };
            commands::config(&mut services, change).map(|_| true)
        }
        Command::Print(args) => commands::print_once(&services, args.session.into()).await,
        Command::Auto(args) => {
            commands::auto_print(
                &services,
                args.session.into(),
                args.interval,
                args.export_log.as_deref(),
            )
            .await?;
            Ok(true)
        }
    }
}

impl From<SessionArgs> for commands::SessionOptions {
    fn from(args: SessionArgs) -> Self {
        Self {
            printer: args.printer,
            document: args.document,
            copies: args.copies,
            timeout_secs: args.timeout,
        }
    }
}
