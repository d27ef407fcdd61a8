//! Tracing subscriber setup for the `flashsync` binary.
//!
//! Output goes to stderr so stdout stays free for the run summary. The filter
//! is read from `FLASHSYNC_LOG` using `EnvFilter` directive syntax; when unset
//! the level is `debug` or `info` depending on the `debug` setting.

use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

/// Environment variable holding filter directives.
pub const LOG_ENV: &str = "FLASHSYNC_LOG";

/// Builds the filter used by [`init`].
#[must_use]
pub fn env_filter(debug: bool) -> EnvFilter {
    let level = if debug {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    EnvFilter::builder()
        .with_default_directive(level.into())
        .with_env_var(LOG_ENV)
        .from_env_lossy()
}

/// Installs the global subscriber. Calling it twice leaves the first
/// subscriber in place.
pub fn init(debug: bool) {
    let layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(debug);
    if tracing_subscriber::registry()
        .with(env_filter(debug))
        .with(layer)
        .try_init()
        .is_err()
    {
        tracing::debug!("tracing subscriber already installed");
    }
}
