//! Binary entry point for the `flashsync` CLI.

use std::io::{self, Write};
use std::process;

use clap::Parser;
use thiserror::Error;

use flashsync::{FlashSyncConfig, RunReport, SyncError, logging, run_sync};

mod cli;

use cli::Cli;

const EXIT_OK: i32 = 0;
const EXIT_FATAL: i32 = 1;
const EXIT_PARTIAL: i32 = 2;
const EXIT_INTERRUPTED: i32 = 130;

#[derive(Debug, Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("sync failed: {0}")]
    Sync(#[from] SyncError),
    #[error("failed to write report: {0}")]
    Output(String),
    #[error("interrupted")]
    Interrupted,
}

impl CliError {
    const fn exit_code(&self) -> i32 {
        match self {
            Self::Interrupted => EXIT_INTERRUPTED,
            Self::Config(_) | Self::Sync(_) | Self::Output(_) => EXIT_FATAL,
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let exit_code = match execute(&cli).await {
        Ok(report) => exit_code_for(&report),
        Err(err) => {
            report_error(&err);
            err.exit_code()
        }
    };

    process::exit(exit_code);
}

async fn execute(cli: &Cli) -> Result<RunReport, CliError> {
    let mut config =
        FlashSyncConfig::load_without_cli_args().map_err(|err| CliError::Config(err.to_string()))?;
    config.debug |= cli.debug;
    logging::init(config.debug);

    let report = tokio::select! {
        result = run_sync(&config) => result?,
        Ok(()) = tokio::signal::ctrl_c() => return Err(CliError::Interrupted),
    };

    write_report(io::stdout().lock(), &report, cli.json)
        .map_err(|err| CliError::Output(err.to_string()))?;
    Ok(report)
}

fn exit_code_for(report: &RunReport) -> i32 {
    if report.is_clean() {
        EXIT_OK
    } else {
        EXIT_PARTIAL
    }
}

fn write_report(mut out: impl Write, report: &RunReport, json: bool) -> io::Result<()> {
    if json {
        serde_json::to_writer_pretty(&mut out, report)?;
        return writeln!(out);
    }

    writeln!(
        out,
        "created {} files and {} directories, skipped {}, failed {}",
        report.files_created,
        report.directories_created,
        report.skipped,
        report.failed()
    )?;
    for failure in &report.failures {
        writeln!(out, "  {}: {}", failure.path, failure.error)?;
    }
    Ok(())
}

fn report_error(err: &CliError) {
    write_error(io::stderr(), err);
}

fn write_error(mut target: impl Write, err: &CliError) {
    writeln!(target, "{err}").ok();
}
