//! Bounded retry for transient card and target failures.

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::debug;

use super::SyncError;

/// Number of attempts and the backoff between them.
///
/// Only errors for which [`SyncError::is_transient`] holds are retried. The
/// delay grows linearly: `backoff`, `2 * backoff`, and so on.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff: Duration,
}

impl RetryPolicy {
    /// A policy that runs each operation exactly once.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            max_attempts: 1,
            backoff: Duration::ZERO,
        }
    }

    /// A policy allowing `retries` additional attempts after the first.
    #[must_use]
    pub const fn new(retries: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: retries.saturating_add(1),
            backoff,
        }
    }

    /// Total number of attempts, including the first.
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Runs `operation` until it succeeds, fails permanently, or the attempts
    /// are exhausted. The last error is returned.
    ///
    /// # Errors
    ///
    /// Returns the error of the final attempt.
    pub async fn run<T, F, Fut>(&self, label: &str, mut operation: F) -> Result<T, SyncError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, SyncError>>,
    {
        let mut attempt = 1;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && attempt < self.max_attempts => {
                    debug!(%label, attempt, error = %err, "retrying transient failure");
                    sleep(self.backoff.saturating_mul(attempt)).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::none()
    }
}
