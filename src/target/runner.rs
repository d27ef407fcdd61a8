//! Command execution abstraction used by the SSH target.

use std::ffi::OsString;
use std::future::Future;
use std::pin::Pin;
use std::process::Stdio;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::debug;

use crate::sync::SyncError;

/// Result of running an external command.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CommandOutput {
    /// Exit code reported by the process, if available.
    pub code: Option<i32>,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
}

impl CommandOutput {
    /// Returns `true` when the exit code equals zero.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self.code, Some(0))
    }
}

/// Future returned by [`CommandRunner::run`].
pub type RunnerFuture<'a> =
    Pin<Box<dyn Future<Output = Result<CommandOutput, SyncError>> + Send + 'a>>;

/// Abstraction over command execution to support fakes in tests.
pub trait CommandRunner {
    /// Runs `program` with `args`, feeding `stdin` when provided and capturing
    /// stdout and stderr.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Spawn`] if the command cannot be started and
    /// [`SyncError::Timeout`] if it does not finish in time.
    fn run<'a>(
        &'a self,
        program: &'a str,
        args: &'a [OsString],
        stdin: Option<&'a [u8]>,
    ) -> RunnerFuture<'a>;
}

/// Real command runner that spawns processes on the host operating system.
///
/// Each command is killed when it exceeds the configured timeout or when the
/// future driving it is dropped.
#[derive(Clone, Debug)]
pub struct ProcessCommandRunner {
    timeout: Duration,
}

impl ProcessCommandRunner {
    /// Creates a runner that kills commands running longer than `timeout`.
    #[must_use]
    pub const fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl CommandRunner for ProcessCommandRunner {
    fn run<'a>(
        &'a self,
        program: &'a str,
        args: &'a [OsString],
        stdin: Option<&'a [u8]>,
    ) -> RunnerFuture<'a> {
        Box::pin(async move {
            let mut child = Command::new(program)
                .args(args)
                .stdin(if stdin.is_some() {
                    Stdio::piped()
                } else {
                    Stdio::null()
                })
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .kill_on_drop(true)
                .spawn()
                .map_err(|err| SyncError::Spawn {
                    program: program.to_owned(),
                    message: err.to_string(),
                })?;

            let pipe = child.stdin.take();
            let feed = async move {
                if let (Some(input), Some(mut pipe)) = (stdin, pipe) {
                    if let Err(err) = pipe.write_all(input).await {
                        debug!(%program, error = %err, "child closed stdin early");
                        return;
                    }
                    if let Err(err) = pipe.shutdown().await {
                        debug!(%program, error = %err, "failed to close child stdin");
                    }
                }
            };

            let work = async {
                let ((), output) = tokio::join!(feed, child.wait_with_output());
                output
            };

            let output = timeout(self.timeout, work)
                .await
                .map_err(|_| SyncError::Timeout {
                    program: program.to_owned(),
                    seconds: self.timeout.as_secs(),
                })?
                .map_err(|err| SyncError::Spawn {
                    program: program.to_owned(),
                    message: err.to_string(),
                })?;

            Ok(CommandOutput {
                code: output.status.code(),
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            })
        })
    }
}
