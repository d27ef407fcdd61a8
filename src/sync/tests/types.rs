//! Listing and report behaviour.

use super::*;
use super::fixtures::card_time;
use camino::Utf8Path;

#[test]
fn listings_split_files_and_directories() {
    let listing = DirectoryListing::from_entries([
        FileEntry::file("b.csv", 1, card_time()),
        FileEntry::directory("a", card_time()),
        FileEntry::file("c.csv", 2, card_time()),
    ]);

    let files = listing
        .files()
        .map(|entry| entry.relative_path.as_str())
        .collect::<Vec<_>>();
    let dirs = listing
        .directories()
        .map(|entry| entry.relative_path.as_str())
        .collect::<Vec<_>>();

    assert_eq!(files, ["b.csv", "c.csv"]);
    assert_eq!(dirs, ["a"]);
}

#[test]
fn report_tracks_failures_by_path() {
    let mut report = RunReport::default();
    assert!(report.is_clean());

    report.record_failure(
        "2024/a.csv",
        SyncError::TargetDiskFull {
            path: Utf8PathBuf::from("/srv/2024/a.csv"),
            message: String::from("No space left on device"),
        },
    );

    assert_eq!(report.failed(), 1);
    assert!(!report.is_clean());
    assert!(report.failure_for(Utf8Path::new("2024/a.csv")).is_some());
    assert!(report.failure_for(Utf8Path::new("2024/b.csv")).is_none());
}

#[test]
fn report_serialises_errors_as_text() {
    let mut report = RunReport {
        files_created: 1,
        ..RunReport::default()
    };
    report.record_failure(
        "b.csv",
        SyncError::SourceNotFound {
            path: String::from("/LOG/b.csv"),
        },
    );

    let value = serde_json::to_value(&report).expect("serialise report");

    assert_eq!(value["files_created"], 1);
    assert_eq!(value["failures"][0]["path"], "b.csv");
    assert_eq!(value["failures"][0]["error"], "card entry not found: /LOG/b.csv");
}

#[test]
fn only_unreachable_errors_are_transient() {
    assert!(
        SyncError::TargetUnreachable {
            path: Utf8PathBuf::from("/srv"),
            message: String::new(),
        }
        .is_transient()
    );
    assert!(
        !SyncError::TargetPermissionDenied {
            path: Utf8PathBuf::from("/srv"),
            message: String::new(),
        }
        .is_transient()
    );
}
