//! Inspection of and writes to the mirrored directory tree.
//!
//! Paths handed to these traits are relative to the target root. Files are
//! written to a hidden temporary name in their destination directory and then
//! renamed into place, so readers never observe partial content. Inspectors
//! never report those temporary names.

use camino::Utf8Path;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::sync::{DirectoryListing, IoFuture};

mod local;
mod remote_command;
mod runner;
mod ssh;

pub use local::LocalTarget;
pub use remote_command::{classify_failure, parse_find_output};
pub use runner::{CommandOutput, CommandRunner, ProcessCommandRunner, RunnerFuture};
pub use ssh::SshTarget;

/// Suffix carried by every in-flight temporary file.
pub const TEMP_FILE_SUFFIX: &str = ".flashsync-tmp";

/// Lists what already exists on the target.
pub trait TargetInspector {
    /// Returns the immediate entries of `dir`; a missing directory yields an
    /// empty listing.
    ///
    /// # Errors
    ///
    /// Returns [`crate::SyncError::TargetUnreachable`] when the target cannot
    /// be queried.
    fn inspect_directory<'a>(&'a self, dir: &'a Utf8Path) -> IoFuture<'a, DirectoryListing>;
}

/// Creates directories and writes files on the target.
pub trait TargetWriter {
    /// Creates `dir` and any missing ancestors; succeeds when it exists.
    ///
    /// # Errors
    ///
    /// Returns [`crate::SyncError::TargetUnreachable`] or
    /// [`crate::SyncError::TargetPermissionDenied`].
    fn ensure_directory<'a>(&'a self, dir: &'a Utf8Path) -> IoFuture<'a, ()>;

    /// Atomically replaces `path` with `content`, setting its modification
    /// time to `modified`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::SyncError::TargetUnreachable`],
    /// [`crate::SyncError::TargetPermissionDenied`],
    /// [`crate::SyncError::TargetDiskFull`] or
    /// [`crate::SyncError::TargetRejected`].
    fn write_file<'a>(
        &'a self,
        path: &'a Utf8Path,
        content: &'a [u8],
        modified: DateTime<Utc>,
    ) -> IoFuture<'a, ()>;
}

/// Builds a unique hidden temporary name for a file called `name`.
#[must_use]
pub fn temp_file_name(name: &str) -> String {
    format!(".{name}.{}{TEMP_FILE_SUFFIX}", Uuid::new_v4().simple())
}

/// Returns `true` for names produced by [`temp_file_name`].
#[must_use]
pub fn is_temp_file_name(name: &str) -> bool {
    name.starts_with('.') && name.ends_with(TEMP_FILE_SUFFIX)
}

#[cfg(test)]
mod tests;
