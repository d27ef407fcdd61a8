//! Process runner tests using the system shell.

use super::*;
use crate::sync::SyncError;
use std::ffi::OsString;
use std::time::Duration;

fn shell(script: &str) -> Vec<OsString> {
    vec![OsString::from("-c"), OsString::from(script)]
}

#[tokio::test]
async fn feeds_stdin_and_captures_output() {
    let runner = ProcessCommandRunner::new(Duration::from_secs(10));
    let args = shell("cat; echo note >&2");

    let output = runner
        .run("sh", &args, Some(b"1,2,3\n".as_slice()))
        .await
        .expect("sh should run");

    assert!(output.is_success());
    assert_eq!(output.stdout, "1,2,3\n");
    assert_eq!(output.stderr, "note\n");
}

#[tokio::test]
async fn reports_exit_codes() {
    let runner = ProcessCommandRunner::new(Duration::from_secs(10));
    let args = shell("exit 3");

    let output = runner.run("sh", &args, None).await.expect("sh should run");

    assert_eq!(output.code, Some(3));
    assert!(!output.is_success());
}

#[tokio::test]
async fn kills_commands_that_overrun() {
    let runner = ProcessCommandRunner::new(Duration::from_millis(200));
    let args = shell("sleep 5");

    let err = runner
        .run("sh", &args, None)
        .await
        .expect_err("sleep should time out");

    assert!(matches!(err, SyncError::Timeout { ref program, .. } if program == "sh"));
}

#[tokio::test]
async fn missing_binaries_fail_to_spawn() {
    let runner = ProcessCommandRunner::new(Duration::from_secs(1));

    let err = runner
        .run("/nonexistent/flashsync-ssh", &[], None)
        .await
        .expect_err("missing binary");

    assert!(matches!(err, SyncError::Spawn { .. }), "unexpected error: {err:?}");
}
