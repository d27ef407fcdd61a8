//! Command-line interface definitions for the `flashsync` binary.
//!
//! This module centralises the clap parser structures so both the main binary
//! and the build script can reuse them when generating the manual page.

use clap::Parser;

/// Top-level CLI for the `flashsync` binary.
///
/// Connection settings come from `flashsync.toml` and `FLASHSYNC_*`
/// environment variables; the flags only shape output.
#[derive(Debug, Parser)]
#[command(
    name = "flashsync",
    version,
    about = "Incrementally mirror a FlashAir SD card onto a remote host over SSH",
    after_help = "Exit status: 0 when every entry synced, 2 when some entries failed, \
                  1 on fatal errors, 130 when interrupted."
)]
pub(crate) struct Cli {
    /// Print the run report as JSON instead of a one-line summary.
    #[arg(long)]
    pub(crate) json: bool,
    /// Enable debug logging (overrides the `debug` setting).
    #[arg(long)]
    pub(crate) debug: bool,
}
