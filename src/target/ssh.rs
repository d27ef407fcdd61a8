//! Target that mirrors files onto a remote host through the `ssh` client.

use std::env;
use std::ffi::{OsStr, OsString};
use std::path::Path;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, Utc};
use tracing::debug;

use crate::config::FlashSyncConfig;
use crate::sync::{DirectoryListing, IoFuture, SyncError};

use super::remote_command::{
    classify_failure, ensure_directory_command, inspect_command, parse_find_output,
    write_file_command,
};
use super::runner::{CommandOutput, CommandRunner, ProcessCommandRunner};
use super::{TargetInspector, TargetWriter, temp_file_name};

/// Runs shell snippets on the target host via `ssh`.
#[derive(Clone, Debug)]
pub struct SshTarget<R: CommandRunner> {
    ssh_bin: String,
    destination: String,
    options: Vec<OsString>,
    root: Utf8PathBuf,
    runner: R,
}

impl SshTarget<ProcessCommandRunner> {
    /// Convenience constructor that wires the real process runner, bounded by
    /// `ssh_timeout_secs`.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::InvalidConfig`] when validation fails.
    pub fn with_process_runner(config: &FlashSyncConfig) -> Result<Self, SyncError> {
        let runner = ProcessCommandRunner::new(Duration::from_secs(config.ssh_timeout_secs));
        Self::new(config, runner)
    }
}

impl<R: CommandRunner> SshTarget<R> {
    /// Creates a target using the provided runner and configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::InvalidConfig`] when configuration validation
    /// fails.
    pub fn new(config: &FlashSyncConfig, runner: R) -> Result<Self, SyncError> {
        config.validate()?;
        Ok(Self {
            ssh_bin: config.ssh_bin.clone(),
            destination: format!("{}@{}", config.ssh_user, config.ssh_host),
            options: common_ssh_options(config),
            root: Utf8PathBuf::from(config.target_path.trim()),
            runner,
        })
    }

    fn resolve(&self, relative: &Utf8Path) -> Utf8PathBuf {
        if relative.as_str().is_empty() {
            self.root.clone()
        } else {
            self.root.join(relative)
        }
    }

    fn build_ssh_args(&self, remote_command: &str) -> Vec<OsString> {
        let mut args = self.options.clone();
        args.push(OsString::from(&self.destination));
        args.push(OsString::from(remote_command));
        args
    }

    async fn execute(
        &self,
        path: &Utf8Path,
        remote_command: &str,
        stdin: Option<&[u8]>,
    ) -> Result<CommandOutput, SyncError> {
        let args = self.build_ssh_args(remote_command);
        debug!(%path, command = %remote_command, "running remote command");
        let output = self
            .runner
            .run(&self.ssh_bin, &args, stdin)
            .await
            .map_err(|err| SyncError::TargetUnreachable {
                path: path.to_path_buf(),
                message: err.to_string(),
            })?;
        if output.is_success() {
            Ok(output)
        } else {
            Err(classify_failure(path, &output))
        }
    }
}

impl<R: CommandRunner + Sync> TargetInspector for SshTarget<R> {
    fn inspect_directory<'a>(&'a self, dir: &'a Utf8Path) -> IoFuture<'a, DirectoryListing> {
        Box::pin(async move {
            let remote_dir = self.resolve(dir);
            let output = self
                .execute(&remote_dir, &inspect_command(&remote_dir), None)
                .await?;
            parse_find_output(&output.stdout, dir).map_err(|message| {
                SyncError::TargetRejected {
                    path: remote_dir,
                    message,
                }
            })
        })
    }
}

impl<R: CommandRunner + Sync> TargetWriter for SshTarget<R> {
    fn ensure_directory<'a>(&'a self, dir: &'a Utf8Path) -> IoFuture<'a, ()> {
        Box::pin(async move {
            let remote_dir = self.resolve(dir);
            self.execute(&remote_dir, &ensure_directory_command(&remote_dir), None)
                .await
                .map(|_| ())
        })
    }

    fn write_file<'a>(
        &'a self,
        path: &'a Utf8Path,
        content: &'a [u8],
        modified: DateTime<Utc>,
    ) -> IoFuture<'a, ()> {
        Box::pin(async move {
            let destination = self.resolve(path);
            let name = destination.file_name().unwrap_or_default();
            let temp = destination.with_file_name(temp_file_name(name));
            let command = write_file_command(&temp, &destination, content.len(), modified);
            self.execute(&destination, &command, Some(content))
                .await
                .map(|_| ())
        })
    }
}

/// Resolves a `~/` identity path against `home`; other paths pass through.
pub(super) fn identity_path(configured: &str, home: Option<&OsStr>) -> OsString {
    match (configured.strip_prefix("~/"), home) {
        (Some(rest), Some(dir)) => Path::new(dir).join(rest).into_os_string(),
        _ => OsString::from(configured),
    }
}

fn common_ssh_options(config: &FlashSyncConfig) -> Vec<OsString> {
    let mut args = vec![
        OsString::from("-p"),
        OsString::from(config.ssh_port.to_string()),
    ];

    if let Some(ref identity_file) = config.ssh_identity_file {
        args.push(OsString::from("-i"));
        args.push(identity_path(identity_file, env::var_os("HOME").as_deref()));
    }

    if config.ssh_batch_mode {
        args.push(OsString::from("-o"));
        args.push(OsString::from("BatchMode=yes"));
    }

    if !config.ssh_strict_host_key_checking {
        args.push(OsString::from("-o"));
        args.push(OsString::from("StrictHostKeyChecking=no"));
    }

    if !config.ssh_known_hosts_file.trim().is_empty() {
        args.push(OsString::from("-o"));
        args.push(OsString::from(format!(
            "UserKnownHostsFile={}",
            config.ssh_known_hosts_file
        )));
    }

    args.push(OsString::from("-o"));
    args.push(OsString::from(format!(
        "ConnectTimeout={}",
        config.ssh_connect_timeout_secs
    )));

    args
}
