//! Configuration loading via `ortho-config`.
//!
//! [`FlashSyncConfig`] merges defaults, `flashsync.toml` (discovered through
//! `FLASHSYNC_CONFIG_PATH`, the user config directory, a dotfile or the project
//! directory) and `FLASHSYNC_*` environment variables. The sync engine never
//! loads configuration itself; it receives a validated value.

use std::ffi::OsString;
use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;
use thiserror::Error;

use crate::sync::{RetryPolicy, SyncError};

/// Default card directory mirrored to the target.
pub const DEFAULT_SOURCE_ROOT: &str = "/CSVFILES/LOG";

/// Settings for the card, the SSH target and the engine.
#[derive(Clone, Debug, Deserialize, OrthoConfig, PartialEq, Eq)]
#[ortho_config(
    prefix = "FLASHSYNC",
    discovery(
        app_name = "flashsync",
        env_var = "FLASHSYNC_CONFIG_PATH",
        config_file_name = "flashsync.toml",
        dotfile_name = ".flashsync.toml",
        project_file_name = "flashsync.toml"
    )
)]
pub struct FlashSyncConfig {
    /// Hostname or address of the card.
    #[ortho_config(default = "flashair".to_owned())]
    pub sdcard_host: String,
    /// HTTP port of the card.
    #[ortho_config(default = 80)]
    pub sdcard_port: u16,
    /// Card directory whose contents are mirrored.
    #[ortho_config(default = DEFAULT_SOURCE_ROOT.to_owned())]
    pub source_root: String,
    /// Path to the `ssh` executable.
    #[ortho_config(default = "ssh".to_owned())]
    pub ssh_bin: String,
    /// Host receiving the files.
    #[ortho_config(default = "localhost".to_owned())]
    pub ssh_host: String,
    /// SSH port on the target host.
    #[ortho_config(default = 22)]
    pub ssh_port: u16,
    /// Remote user to connect as.
    #[ortho_config(default = "flashair".to_owned())]
    pub ssh_user: String,
    /// Directory on the target host that mirrors the card root.
    #[ortho_config(default = String::new())]
    pub target_path: String,
    /// Whether to force batch mode for SSH to avoid password prompts.
    #[ortho_config(default = true)]
    pub ssh_batch_mode: bool,
    /// Whether to enforce host key checking.
    #[ortho_config(default = false)]
    pub ssh_strict_host_key_checking: bool,
    /// Known hosts file override; defaults to `/dev/null`.
    #[ortho_config(default = "/dev/null".to_owned())]
    pub ssh_known_hosts_file: String,
    /// Path to the SSH private key. Supports tilde expansion. When unset, the
    /// SSH client falls back to its default identities.
    pub ssh_identity_file: Option<String>,
    /// Enables debug logging.
    #[ortho_config(default = false)]
    pub debug: bool,
    /// Timeout for each HTTP request to the card.
    #[ortho_config(default = 30)]
    pub http_timeout_secs: u64,
    /// Timeout for establishing an SSH connection.
    #[ortho_config(default = 10)]
    pub ssh_connect_timeout_secs: u64,
    /// Timeout for a whole SSH command, including data transfer.
    #[ortho_config(default = 300)]
    pub ssh_timeout_secs: u64,
    /// Additional attempts for operations that failed because the card or the
    /// target was unreachable.
    #[ortho_config(default = 0)]
    pub retry_attempts: u32,
    /// Base delay between retries; grows linearly per attempt.
    #[ortho_config(default = 500)]
    pub retry_backoff_millis: u64,
    /// Maximum number of files transferred concurrently within a directory.
    #[ortho_config(default = 4)]
    pub max_parallel_transfers: usize,
}

/// Errors raised when loading configuration from layered sources.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum ConfigError {
    /// Indicates that parsing or merging configuration layers failed.
    #[error("configuration parsing failed: {0}")]
    Parse(String),
}

impl From<ortho_config::OrthoError> for ConfigError {
    fn from(value: ortho_config::OrthoError) -> Self {
        Self::Parse(value.to_string())
    }
}

impl FlashSyncConfig {
    /// Loads configuration from defaults, configuration files and environment
    /// variables without parsing CLI arguments.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when merging sources fails.
    pub fn load_without_cli_args() -> Result<Self, ConfigError> {
        Self::load_from_iter([OsString::from("flashsync")])
            .map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Ensures required values are present and numeric settings usable.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::InvalidConfig`] naming the first offending field.
    pub fn validate(&self) -> Result<(), SyncError> {
        Self::require_value(&self.sdcard_host, "sdcard_host")?;
        Self::require_nonzero(u64::from(self.sdcard_port), "sdcard_port")?;
        Self::require_value(&self.source_root, "source_root")?;
        Self::require_value(&self.ssh_bin, "ssh_bin")?;
        Self::require_value(&self.ssh_host, "ssh_host")?;
        Self::require_nonzero(u64::from(self.ssh_port), "ssh_port")?;
        Self::require_value(&self.ssh_user, "ssh_user")?;
        Self::require_value(&self.target_path, "target_path")?;
        Self::require_optional_value(self.ssh_identity_file.as_deref(), "ssh_identity_file")?;
        Self::require_nonzero(self.http_timeout_secs, "http_timeout_secs")?;
        Self::require_nonzero(self.ssh_connect_timeout_secs, "ssh_connect_timeout_secs")?;
        Self::require_nonzero(self.ssh_timeout_secs, "ssh_timeout_secs")?;
        if self.max_parallel_transfers == 0 {
            return Err(Self::invalid("max_parallel_transfers"));
        }
        Ok(())
    }

    /// Retry policy derived from `retry_attempts` and `retry_backoff_millis`.
    #[must_use]
    pub const fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.retry_attempts,
            Duration::from_millis(self.retry_backoff_millis),
        )
    }

    fn require_optional_value(value: Option<&str>, field: &str) -> Result<(), SyncError> {
        match value {
            None => Ok(()),
            Some(v) if !v.trim().is_empty() => Ok(()),
            Some(_) => Err(Self::invalid(field)),
        }
    }

    fn require_value(value: &str, field: &str) -> Result<(), SyncError> {
        Self::require_optional_value(Some(value), field)
    }

    fn require_nonzero(value: u64, field: &str) -> Result<(), SyncError> {
        if value == 0 {
            return Err(Self::invalid(field));
        }
        Ok(())
    }

    fn invalid(field: &str) -> SyncError {
        SyncError::InvalidConfig {
            field: field.to_owned(),
        }
    }
}
