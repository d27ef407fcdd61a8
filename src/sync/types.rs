//! Entries, listings, actions and run reports shared by the sync engine.

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;

use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use super::SyncError;

/// Future returned by source and target operations.
pub type IoFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, SyncError>> + Send + 'a>>;

/// A single file or directory observed on the card or on the target.
///
/// `relative_path` is relative to the sync root on either side, so entries
/// produced by the source and by the target for the same logical directory
/// can be paired directly.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FileEntry {
    /// Path relative to the sync root, using `/` separators.
    pub relative_path: Utf8PathBuf,
    /// Size in bytes. Directories report whatever the producer returned and
    /// are never compared by size.
    pub size: u64,
    /// Last modification time.
    pub modified: DateTime<Utc>,
    /// Whether the entry is a directory.
    pub is_directory: bool,
}

impl FileEntry {
    /// Builds a regular file entry.
    #[must_use]
    pub fn file(relative_path: impl Into<Utf8PathBuf>, size: u64, modified: DateTime<Utc>) -> Self {
        Self {
            relative_path: relative_path.into(),
            size,
            modified,
            is_directory: false,
        }
    }

    /// Builds a directory entry.
    #[must_use]
    pub fn directory(relative_path: impl Into<Utf8PathBuf>, modified: DateTime<Utc>) -> Self {
        Self {
            relative_path: relative_path.into(),
            size: 0,
            modified,
            is_directory: true,
        }
    }
}

/// Snapshot of the immediate entries of one directory.
///
/// Entries are keyed by relative path so wire ordering is irrelevant.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct DirectoryListing {
    entries: BTreeMap<Utf8PathBuf, FileEntry>,
}

impl DirectoryListing {
    /// Creates an empty listing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a listing, keeping the first occurrence of a duplicated path.
    #[must_use]
    pub fn from_entries(entries: impl IntoIterator<Item = FileEntry>) -> Self {
        let mut listing = Self::new();
        for entry in entries {
            listing.insert(entry);
        }
        listing
    }

    /// Adds an entry unless its path is already present. Returns whether the
    /// entry was inserted.
    pub fn insert(&mut self, entry: FileEntry) -> bool {
        if self.entries.contains_key(&entry.relative_path) {
            debug!(path = %entry.relative_path, "ignoring duplicate listing entry");
            return false;
        }
        self.entries.insert(entry.relative_path.clone(), entry);
        true
    }

    /// Looks up an entry by relative path.
    #[must_use]
    pub fn get(&self, path: &Utf8Path) -> Option<&FileEntry> {
        self.entries.get(path)
    }

    /// Iterates entries in relative-path order.
    pub fn iter(&self) -> impl Iterator<Item = &FileEntry> {
        self.entries.values()
    }

    /// Iterates directory entries in relative-path order.
    pub fn directories(&self) -> impl Iterator<Item = &FileEntry> {
        self.iter().filter(|entry| entry.is_directory)
    }

    /// Iterates regular file entries in relative-path order.
    pub fn files(&self) -> impl Iterator<Item = &FileEntry> {
        self.iter().filter(|entry| !entry.is_directory)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when the listing has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Decision taken for one source entry.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SyncAction {
    /// Transfer the entry (new file, changed size, or missing directory).
    Create(FileEntry),
    /// Leave the target untouched.
    Skip(FileEntry),
}

impl SyncAction {
    /// The source entry the action applies to.
    #[must_use]
    pub const fn entry(&self) -> &FileEntry {
        match self {
            Self::Create(entry) | Self::Skip(entry) => entry,
        }
    }
}

/// A recorded per-entry or per-subtree failure.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct SyncFailure {
    /// Relative path of the file, or of the subtree root for listing failures.
    pub path: Utf8PathBuf,
    /// Error that caused the failure.
    #[serde(serialize_with = "serialize_display")]
    pub error: SyncError,
}

fn serialize_display<S: serde::Serializer>(
    error: &SyncError,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_str(error)
}

/// Outcome of one synchronisation pass.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct RunReport {
    /// Files written to the target.
    pub files_created: usize,
    /// Directories created on the target.
    pub directories_created: usize,
    /// Entries left untouched.
    pub skipped: usize,
    /// Failures recorded during the walk.
    pub failures: Vec<SyncFailure>,
}

impl RunReport {
    /// Number of failed entries or subtrees.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    /// Returns `true` when nothing failed.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// Records a failure for `path`.
    pub fn record_failure(&mut self, path: impl Into<Utf8PathBuf>, error: SyncError) {
        self.failures.push(SyncFailure {
            path: path.into(),
            error,
        });
    }

    /// Looks up the failure recorded for `path`, if any.
    #[must_use]
    pub fn failure_for(&self, path: &Utf8Path) -> Option<&SyncFailure> {
        self.failures.iter().find(|failure| failure.path == path)
    }
}
