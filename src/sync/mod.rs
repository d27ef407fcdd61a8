//! Incremental one-way mirroring of the card onto the target.
//!
//! The engine walks the card depth first, compares each directory level with
//! the target by name and size, and transfers only what is new or has changed
//! size. Nothing is ever deleted from the target, and files left unchanged are
//! not touched, so their modification times survive repeated runs.

use crate::config::FlashSyncConfig;
use crate::source::FlashAirClient;
use crate::target::SshTarget;

mod diff;
mod error;
mod orchestrator;
mod retry;
mod types;

pub use camino::Utf8PathBuf;
pub use diff::diff;
pub use error::SyncError;
pub use orchestrator::{SyncOptions, SyncOrchestrator};
pub use retry::RetryPolicy;
pub use types::{DirectoryListing, FileEntry, IoFuture, RunReport, SyncAction, SyncFailure};

/// Runs one pass against the configured card and SSH target.
///
/// # Errors
///
/// Returns [`SyncError::InvalidConfig`] for an unusable configuration, or the
/// error that prevented the walk from starting (target root not creatable,
/// root listing failed on either side).
pub async fn run_sync(config: &FlashSyncConfig) -> Result<RunReport, SyncError> {
    config.validate()?;
    let source = FlashAirClient::new(config)?;
    let target = SshTarget::with_process_runner(config)?;
    SyncOrchestrator::new(source, target, SyncOptions::from_config(config))
        .run()
        .await
}

/// Blocking variant of [`run_sync`] that drives its own single-threaded
/// runtime. Must not be called from within a Tokio runtime.
///
/// # Errors
///
/// Returns [`SyncError::Runtime`] when the runtime cannot be built, otherwise
/// whatever [`run_sync`] returns.
pub fn sync(config: &FlashSyncConfig) -> Result<RunReport, SyncError> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| SyncError::Runtime {
            message: err.to_string(),
        })?;
    runtime.block_on(run_sync(config))
}

#[cfg(test)]
mod tests;
