//! Local filesystem target tests.

use super::*;
use crate::sync::SyncError;
use camino::Utf8PathBuf;
use chrono::TimeZone;
use rstest::{fixture, rstest};
use tempfile::TempDir;

struct Workspace {
    _tmp: TempDir,
    root: Utf8PathBuf,
    target: LocalTarget,
}

#[fixture]
fn workspace() -> Workspace {
    let tmp = TempDir::new().expect("create temp dir");
    let root = Utf8PathBuf::from_path_buf(tmp.path().join("mirror")).expect("utf8 temp path");
    let target = LocalTarget::new(root.clone());
    Workspace {
        _tmp: tmp,
        root,
        target,
    }
}

fn stamp(hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2023, 11, 5, hour, 0, 10)
        .single()
        .expect("valid timestamp")
}

#[rstest]
#[tokio::test]
async fn missing_directory_lists_empty(workspace: Workspace) {
    let listing = workspace
        .target
        .inspect_directory(Utf8Path::new(""))
        .await
        .expect("missing root is not an error");
    assert!(listing.is_empty());
}

#[rstest]
#[tokio::test]
async fn written_files_carry_size_and_source_mtime(workspace: Workspace) {
    let target = &workspace.target;
    target
        .ensure_directory(Utf8Path::new("logs/2023"))
        .await
        .expect("create nested directory");
    target
        .write_file(Utf8Path::new("logs/2023/a.csv"), b"1,2,3\n", stamp(8))
        .await
        .expect("write file");

    let listing = target
        .inspect_directory(Utf8Path::new("logs/2023"))
        .await
        .expect("inspect");
    let entry = listing
        .get(Utf8Path::new("logs/2023/a.csv"))
        .expect("written file is listed");
    assert_eq!(entry.size, 6);
    assert_eq!(entry.modified, stamp(8));
    assert!(!entry.is_directory);

    let top = target
        .inspect_directory(Utf8Path::new(""))
        .await
        .expect("inspect root");
    assert!(top.get(Utf8Path::new("logs")).is_some_and(|entry| entry.is_directory));
}

#[rstest]
#[tokio::test]
async fn rewrite_replaces_content(workspace: Workspace) {
    let target = &workspace.target;
    target
        .ensure_directory(Utf8Path::new(""))
        .await
        .expect("create root");
    target
        .write_file(Utf8Path::new("a.csv"), b"1\n", stamp(1))
        .await
        .expect("first write");
    target
        .write_file(Utf8Path::new("a.csv"), b"1,2\n", stamp(2))
        .await
        .expect("second write");

    let content = std::fs::read(workspace.root.join("a.csv")).expect("read back");
    assert_eq!(content, b"1,2\n");
    let names = std::fs::read_dir(&workspace.root)
        .expect("read dir")
        .count();
    assert_eq!(names, 1, "no temporary files should remain");
}

#[rstest]
#[tokio::test]
async fn temporary_files_are_not_reported(workspace: Workspace) {
    std::fs::create_dir_all(&workspace.root).expect("create root");
    std::fs::write(workspace.root.join(temp_file_name("a.csv")), b"partial").expect("write temp");
    std::fs::write(workspace.root.join("b.csv"), b"done").expect("write file");

    let listing = workspace
        .target
        .inspect_directory(Utf8Path::new(""))
        .await
        .expect("inspect");

    assert_eq!(listing.len(), 1);
    assert!(listing.get(Utf8Path::new("b.csv")).is_some());
}

#[rstest]
#[tokio::test]
async fn refuses_to_replace_directory_with_file(workspace: Workspace) {
    let target = &workspace.target;
    target
        .ensure_directory(Utf8Path::new("clash"))
        .await
        .expect("create directory");

    let err = target
        .write_file(Utf8Path::new("clash"), b"x", stamp(3))
        .await
        .expect_err("directory must not be replaced");

    assert!(matches!(err, SyncError::TargetRejected { .. }), "unexpected error: {err:?}");
    assert!(workspace.root.join("clash").is_dir());
}

#[rstest]
#[tokio::test]
async fn writing_into_missing_directory_fails_cleanly(workspace: Workspace) {
    let err = workspace
        .target
        .write_file(Utf8Path::new("absent/a.csv"), b"x", stamp(4))
        .await
        .expect_err("parent does not exist");
    assert!(matches!(err, SyncError::TargetRejected { .. }), "unexpected error: {err:?}");
}
