//! Core library for the `flashsync` card mirroring tool.
//!
//! The crate lists and downloads files from a FlashAir-style Wi-Fi SD card
//! over HTTP and mirrors them onto a remote host over SSH. Runs are
//! incremental: only new files and files whose size changed are transferred,
//! and nothing on the target is ever deleted.
//!
//! ```no_run
//! let config = flashsync::FlashSyncConfig::load_without_cli_args()?;
//! let report = flashsync::sync(&config)?;
//! assert!(report.is_clean());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod config;
pub mod logging;
pub mod source;
pub mod sync;
pub mod target;
#[cfg(test)]
pub mod test_helpers;
pub mod test_support;

pub use config::{ConfigError, FlashSyncConfig};
pub use source::{FlashAirClient, SourceFetcher, SourceLister};
pub use sync::{
    DirectoryListing, FileEntry, RetryPolicy, RunReport, SyncAction, SyncError, SyncFailure,
    SyncOptions, SyncOrchestrator, run_sync, sync,
};
pub use target::{
    CommandRunner, LocalTarget, ProcessCommandRunner, SshTarget, TargetInspector, TargetWriter,
};
