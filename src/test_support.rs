//! Test support utilities shared across unit and integration tests.

use std::collections::{BTreeMap, VecDeque};
use std::ffi::OsString;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bytes::Bytes;
use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, Utc};

use crate::config::{DEFAULT_SOURCE_ROOT, FlashSyncConfig};
use crate::source::{SourceFetcher, SourceLister};
use crate::sync::{DirectoryListing, FileEntry, IoFuture, SyncError};
use crate::target::{CommandOutput, CommandRunner, RunnerFuture};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Scripted command runner that returns pre-seeded outputs in FIFO order.
///
/// Used to drive deterministic command outcomes without spawning processes.
#[derive(Clone, Debug, Default)]
pub struct ScriptedRunner {
    responses: Arc<Mutex<VecDeque<CommandOutput>>>,
    invocations: Arc<Mutex<Vec<CommandInvocation>>>,
}

/// Records a single invocation made through [`ScriptedRunner`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CommandInvocation {
    /// Program name as passed to the runner.
    pub program: String,
    /// Arguments passed to the program.
    pub args: Vec<OsString>,
    /// Bytes fed on stdin, if any.
    pub stdin: Option<Vec<u8>>,
}

impl CommandInvocation {
    /// Returns a shell-like command string for assertions.
    #[must_use]
    pub fn command_string(&self) -> String {
        let mut parts = Vec::with_capacity(self.args.len() + 1);
        parts.push(self.program.clone());
        parts.extend(
            self.args
                .iter()
                .map(|arg| arg.to_string_lossy().into_owned()),
        );
        parts.join(" ")
    }

    /// The final argument, which carries the remote command for SSH.
    #[must_use]
    pub fn remote_command(&self) -> String {
        self.args
            .last()
            .map(|arg| arg.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

impl ScriptedRunner {
    /// Creates a new runner with no queued responses.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of all invocations recorded so far.
    #[must_use]
    pub fn invocations(&self) -> Vec<CommandInvocation> {
        lock(&self.invocations).clone()
    }

    /// Pushes a successful exit status.
    pub fn push_success(&self) {
        self.push_output(Some(0), "", "");
    }

    /// Pushes a failing exit code with stderr text.
    pub fn push_failure(&self, code: i32, stderr: impl Into<String>) {
        self.push_output(Some(code), "", stderr);
    }

    /// Pushes an explicit command output response.
    pub fn push_output(
        &self,
        code: Option<i32>,
        stdout: impl Into<String>,
        stderr: impl Into<String>,
    ) {
        lock(&self.responses).push_back(CommandOutput {
            code,
            stdout: stdout.into(),
            stderr: stderr.into(),
        });
    }
}

impl CommandRunner for ScriptedRunner {
    fn run<'a>(
        &'a self,
        program: &'a str,
        args: &'a [OsString],
        stdin: Option<&'a [u8]>,
    ) -> RunnerFuture<'a> {
        lock(&self.invocations).push(CommandInvocation {
            program: program.to_owned(),
            args: args.to_vec(),
            stdin: stdin.map(<[u8]>::to_vec),
        });
        let response = lock(&self.responses)
            .pop_front()
            .ok_or_else(|| SyncError::Spawn {
                program: program.to_owned(),
                message: String::from("no scripted response available"),
            });
        Box::pin(async move { response })
    }
}

#[derive(Debug, Default)]
struct MemoryCard {
    entries: BTreeMap<Utf8PathBuf, (FileEntry, Bytes)>,
    listing_failures: BTreeMap<Utf8PathBuf, SyncError>,
    fetch_failures: BTreeMap<Utf8PathBuf, SyncError>,
    fetches: Vec<Utf8PathBuf>,
}

/// In-memory card implementing [`SourceLister`] and [`SourceFetcher`].
///
/// Clones share state, so a test can keep a handle while the orchestrator
/// owns another.
#[derive(Clone, Debug, Default)]
pub struct MemorySource {
    card: Arc<Mutex<MemoryCard>>,
}

impl MemorySource {
    /// Creates an empty card.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a file.
    pub fn add_file(&self, path: &str, content: &[u8], modified: DateTime<Utc>) {
        let size = u64::try_from(content.len()).unwrap_or(u64::MAX);
        let entry = FileEntry::file(path, size, modified);
        lock(&self.card).entries.insert(
            Utf8PathBuf::from(path),
            (entry, Bytes::copy_from_slice(content)),
        );
    }

    /// Adds a directory.
    pub fn add_directory(&self, path: &str, modified: DateTime<Utc>) {
        lock(&self.card).entries.insert(
            Utf8PathBuf::from(path),
            (FileEntry::directory(path, modified), Bytes::new()),
        );
    }

    /// Removes a file or directory entry.
    pub fn remove(&self, path: &str) {
        lock(&self.card).entries.remove(Utf8Path::new(path));
    }

    /// Makes every listing of `dir` fail with `error`.
    pub fn fail_listing(&self, dir: &str, error: SyncError) {
        lock(&self.card)
            .listing_failures
            .insert(Utf8PathBuf::from(dir), error);
    }

    /// Makes every fetch of `path` fail with `error`.
    pub fn fail_fetch(&self, path: &str, error: SyncError) {
        lock(&self.card)
            .fetch_failures
            .insert(Utf8PathBuf::from(path), error);
    }

    /// Clears all injected failures.
    pub fn clear_failures(&self) {
        let mut card = lock(&self.card);
        card.listing_failures.clear();
        card.fetch_failures.clear();
    }

    /// Paths fetched so far, in request order.
    #[must_use]
    pub fn fetches(&self) -> Vec<Utf8PathBuf> {
        lock(&self.card).fetches.clone()
    }
}

impl SourceLister for MemorySource {
    fn list_directory<'a>(&'a self, dir: &'a Utf8Path) -> IoFuture<'a, DirectoryListing> {
        let card = lock(&self.card);
        let result = card.listing_failures.get(dir).cloned().map_or_else(
            || {
                Ok(DirectoryListing::from_entries(
                    card.entries
                        .values()
                        .filter(|(entry, _)| entry.relative_path.parent() == Some(dir))
                        .map(|(entry, _)| entry.clone()),
                ))
            },
            Err,
        );
        Box::pin(async move { result })
    }
}

impl SourceFetcher for MemorySource {
    fn fetch_file<'a>(&'a self, path: &'a Utf8Path) -> IoFuture<'a, Bytes> {
        let mut card = lock(&self.card);
        card.fetches.push(path.to_path_buf());
        let result = card.fetch_failures.get(path).cloned().map_or_else(
            || {
                card.entries
                    .get(path)
                    .filter(|(entry, _)| !entry.is_directory)
                    .map(|(_, content)| content.clone())
                    .ok_or_else(|| SyncError::SourceNotFound {
                        path: path.to_string(),
                    })
            },
            Err,
        );
        Box::pin(async move { result })
    }
}

/// Builds a valid configuration pointing at `target_path`.
#[must_use]
pub fn sample_config(target_path: &str) -> FlashSyncConfig {
    FlashSyncConfig {
        sdcard_host: String::from("flashair"),
        sdcard_port: 80,
        source_root: String::from(DEFAULT_SOURCE_ROOT),
        ssh_bin: String::from("ssh"),
        ssh_host: String::from("archive.example"),
        ssh_port: 22,
        ssh_user: String::from("flashair"),
        target_path: target_path.to_owned(),
        ssh_batch_mode: true,
        ssh_strict_host_key_checking: false,
        ssh_known_hosts_file: String::from("/dev/null"),
        ssh_identity_file: None,
        debug: false,
        http_timeout_secs: 30,
        ssh_connect_timeout_secs: 10,
        ssh_timeout_secs: 300,
        retry_attempts: 0,
        retry_backoff_millis: 500,
        max_parallel_transfers: 4,
    }
}
