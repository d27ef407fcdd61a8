//! Error taxonomy for the sync engine.

use camino::Utf8PathBuf;
use thiserror::Error;

/// Errors surfaced while listing, fetching or writing entries.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum SyncError {
    /// Raised when the card cannot be reached or answers with an HTTP error.
    #[error("card unreachable while accessing {path}: {message}")]
    SourceUnreachable {
        /// Card path being accessed.
        path: String,
        /// Transport or HTTP status description.
        message: String,
    },
    /// Raised when an entry vanished from the card between listing and fetch.
    #[error("card entry not found: {path}")]
    SourceNotFound {
        /// Card path that was requested.
        path: String,
    },
    /// Raised when the card returns a listing that cannot be parsed.
    #[error("malformed card response for {path}: {message}")]
    SourceProtocolError {
        /// Card path whose response was malformed.
        path: String,
        /// Parser error description.
        message: String,
    },
    /// Raised when the target host cannot be reached.
    #[error("target unreachable while accessing {path}: {message}")]
    TargetUnreachable {
        /// Target path being accessed.
        path: Utf8PathBuf,
        /// Transport error description.
        message: String,
    },
    /// Raised when the target refuses access to a path.
    #[error("permission denied on target path {path}: {message}")]
    TargetPermissionDenied {
        /// Target path that was refused.
        path: Utf8PathBuf,
        /// Error reported by the target.
        message: String,
    },
    /// Raised when the target filesystem is out of space or quota.
    #[error("target disk full while writing {path}: {message}")]
    TargetDiskFull {
        /// Target path being written.
        path: Utf8PathBuf,
        /// Error reported by the target.
        message: String,
    },
    /// Raised when a target operation fails for any other reason.
    #[error("target rejected operation on {path}: {message}")]
    TargetRejected {
        /// Target path being accessed.
        path: Utf8PathBuf,
        /// Error reported by the target.
        message: String,
    },
    /// Raised when configuration is missing or has an unusable value.
    #[error(
        "invalid {field}: set FLASHSYNC_{env_suffix} or add {field} to flashsync.toml",
        env_suffix = field.to_uppercase()
    )]
    InvalidConfig {
        /// Configuration field that failed validation.
        field: String,
    },
    /// Raised when a command cannot be spawned.
    #[error("failed to spawn {program}: {message}")]
    Spawn {
        /// Command that failed to start.
        program: String,
        /// Operating system error string.
        message: String,
    },
    /// Raised when a command does not finish within its deadline.
    #[error("{program} did not finish within {seconds} seconds")]
    Timeout {
        /// Command that was killed.
        program: String,
        /// Deadline that elapsed.
        seconds: u64,
    },
    /// Raised when the async runtime backing a blocking run cannot start.
    #[error("failed to start runtime: {message}")]
    Runtime {
        /// Operating system error string.
        message: String,
    },
}

impl SyncError {
    /// Returns `true` for failures worth retrying: the card or the target was
    /// temporarily unreachable.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::SourceUnreachable { .. } | Self::TargetUnreachable { .. }
        )
    }
}
