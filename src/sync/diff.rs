//! Per-directory decision core.
//!
//! Pairs source and target entries by relative path and decides whether each
//! source entry needs transferring. Size is the only change signal for files:
//! card timestamps have two-second resolution and no timezone, so they are
//! never trusted to detect change. Target-only entries produce no action.

use super::types::{DirectoryListing, FileEntry, SyncAction};

/// Computes the actions for one directory level, in relative-path order.
#[must_use]
pub fn diff(source: &DirectoryListing, target: &DirectoryListing) -> Vec<SyncAction> {
    source
        .iter()
        .map(|entry| classify(entry, target.get(&entry.relative_path)))
        .collect()
}

fn classify(source: &FileEntry, existing: Option<&FileEntry>) -> SyncAction {
    let Some(existing) = existing else {
        return SyncAction::Create(source.clone());
    };

    match (source.is_directory, existing.is_directory) {
        (true, true) => SyncAction::Skip(source.clone()),
        (false, false) if source.size == existing.size => SyncAction::Skip(source.clone()),
        // Kind mismatches are handed to the writer, which refuses to replace a
        // directory with a file and reports the entry as failed.
        _ => SyncAction::Create(source.clone()),
    }
}
