//! Depth-first walk that mirrors the card tree onto the target.
//!
//! Each directory level is listed on both sides, diffed, and its actions
//! applied before the walk descends. Failures below the root are recorded in
//! the [`RunReport`] and the walk carries on with the next entry or sibling.

use bytes::Bytes;
use camino::{Utf8Path, Utf8PathBuf};
use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use crate::config::FlashSyncConfig;
use crate::source::{SourceFetcher, SourceLister};
use crate::target::{TargetInspector, TargetWriter};

use super::SyncError;
use super::diff::diff;
use super::retry::RetryPolicy;
use super::types::{DirectoryListing, FileEntry, RunReport, SyncAction};

/// Tuning knobs for a run.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SyncOptions {
    /// Retry policy applied to every listing, fetch and write.
    pub retry: RetryPolicy,
    /// Upper bound on concurrent file transfers within one directory.
    pub max_parallel_transfers: usize,
}

impl SyncOptions {
    /// Derives options from configuration.
    #[must_use]
    pub const fn from_config(config: &FlashSyncConfig) -> Self {
        Self {
            retry: config.retry_policy(),
            max_parallel_transfers: config.max_parallel_transfers,
        }
    }
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::none(),
            max_parallel_transfers: 4,
        }
    }
}

/// Drives one synchronisation pass from a source to a target.
#[derive(Clone, Debug)]
pub struct SyncOrchestrator<S, T> {
    source: S,
    target: T,
    options: SyncOptions,
}

impl<S, T> SyncOrchestrator<S, T>
where
    S: SourceLister + SourceFetcher + Sync,
    T: TargetInspector + TargetWriter + Sync,
{
    /// Wires a source and a target together.
    #[must_use]
    pub const fn new(source: S, target: T, options: SyncOptions) -> Self {
        Self {
            source,
            target,
            options,
        }
    }

    /// Runs one pass over the whole tree.
    ///
    /// # Errors
    ///
    /// Returns an error only when the target root cannot be created or the
    /// root listing fails on either side. Everything below the root is
    /// reported through [`RunReport::failures`].
    pub async fn run(&self) -> Result<RunReport, SyncError> {
        let root = Utf8Path::new("");
        self.options
            .retry
            .run("ensure target root", || self.target.ensure_directory(root))
            .await?;

        let mut report = RunReport::default();
        let mut pending = vec![Utf8PathBuf::new()];
        while let Some(dir) = pending.pop() {
            let (source, target) = match self.list_both(&dir).await {
                Ok(listings) => listings,
                Err(err) if dir.as_str().is_empty() => return Err(err),
                Err(err) => {
                    warn!(%dir, error = %err, "skipping subtree");
                    report.record_failure(dir, err);
                    continue;
                }
            };

            let descend = self.apply(&source, &target, &mut report).await;
            pending.extend(descend.into_iter().rev());
        }

        info!(
            files_created = report.files_created,
            directories_created = report.directories_created,
            skipped = report.skipped,
            failed = report.failed(),
            "sync finished"
        );
        Ok(report)
    }

    async fn list_both(
        &self,
        dir: &Utf8Path,
    ) -> Result<(DirectoryListing, DirectoryListing), SyncError> {
        let retry = self.options.retry;
        let (source, target) = tokio::join!(
            retry.run("list source", || self.source.list_directory(dir)),
            retry.run("inspect target", || self.target.inspect_directory(dir)),
        );
        debug!(%dir, "listed directory on both sides");
        Ok((source?, target?))
    }

    /// Applies the actions for one level and returns the subdirectories to
    /// descend into, in path order.
    async fn apply(
        &self,
        source: &DirectoryListing,
        target: &DirectoryListing,
        report: &mut RunReport,
    ) -> Vec<Utf8PathBuf> {
        let mut descend = Vec::new();
        let mut transfers = Vec::new();

        for action in diff(source, target) {
            match action {
                SyncAction::Skip(entry) => {
                    debug!(path = %entry.relative_path, "unchanged");
                    report.skipped += 1;
                    if entry.is_directory {
                        descend.push(entry.relative_path);
                    }
                }
                SyncAction::Create(entry) if entry.is_directory => {
                    match self.create_directory(&entry.relative_path).await {
                        Ok(()) => {
                            info!(path = %entry.relative_path, "created directory");
                            report.directories_created += 1;
                            descend.push(entry.relative_path);
                        }
                        Err(err) => {
                            warn!(path = %entry.relative_path, error = %err, "directory failed");
                            report.record_failure(entry.relative_path, err);
                        }
                    }
                }
                SyncAction::Create(entry) => transfers.push(entry),
            }
        }

        let mut results = stream::iter(transfers)
            .map(|entry| async move {
                let result = self.transfer(&entry).await;
                (entry, result)
            })
            .buffer_unordered(self.options.max_parallel_transfers.max(1))
            .collect::<Vec<_>>()
            .await;
        results.sort_by(|(left, _), (right, _)| left.relative_path.cmp(&right.relative_path));

        for (entry, result) in results {
            match result {
                Ok(()) => {
                    info!(path = %entry.relative_path, size = entry.size, "transferred file");
                    report.files_created += 1;
                }
                Err(err) => {
                    warn!(path = %entry.relative_path, error = %err, "transfer failed");
                    report.record_failure(entry.relative_path, err);
                }
            }
        }

        descend
    }

    async fn create_directory(&self, path: &Utf8Path) -> Result<(), SyncError> {
        self.options
            .retry
            .run("create directory", || self.target.ensure_directory(path))
            .await
    }

    async fn transfer(&self, entry: &FileEntry) -> Result<(), SyncError> {
        let path = entry.relative_path.as_path();
        let content: Bytes = self
            .options
            .retry
            .run("fetch file", || self.source.fetch_file(path))
            .await?;
        self.options
            .retry
            .run("write file", || self.target.write_file(path, &content, entry.modified))
            .await
    }
}
