//! Decision table tests for the per-directory diff.

use super::*;
use super::fixtures::card_time;
use chrono::Duration;
use rstest::rstest;

fn file(path: &str, size: u64) -> FileEntry {
    FileEntry::file(path, size, card_time())
}

fn dir(path: &str) -> FileEntry {
    FileEntry::directory(path, card_time())
}

#[rstest]
fn new_entries_are_created() {
    let source = DirectoryListing::from_entries([file("a.csv", 6), dir("2024")]);

    let actions = diff(&source, &DirectoryListing::new());

    assert_eq!(
        actions,
        vec![SyncAction::Create(dir("2024")), SyncAction::Create(file("a.csv", 6))]
    );
}

#[rstest]
fn equal_sizes_skip_regardless_of_timestamps() {
    let source = DirectoryListing::from_entries([file("a.csv", 6)]);
    let mut older = file("a.csv", 6);
    older.modified -= Duration::days(30);
    let target = DirectoryListing::from_entries([older]);

    assert_eq!(diff(&source, &target), vec![SyncAction::Skip(file("a.csv", 6))]);
}

#[rstest]
#[case::grew(6, 9)]
#[case::shrank(6, 2)]
#[case::emptied(6, 0)]
fn size_changes_recreate(#[case] target_size: u64, #[case] source_size: u64) {
    let source = DirectoryListing::from_entries([file("a.csv", source_size)]);
    let target = DirectoryListing::from_entries([file("a.csv", target_size)]);

    assert_eq!(
        diff(&source, &target),
        vec![SyncAction::Create(file("a.csv", source_size))]
    );
}

#[rstest]
fn existing_directories_are_skipped() {
    let source = DirectoryListing::from_entries([dir("2024")]);
    let target = DirectoryListing::from_entries([FileEntry {
        size: 4096,
        ..dir("2024")
    }]);

    assert_eq!(diff(&source, &target), vec![SyncAction::Skip(dir("2024"))]);
}

#[rstest]
#[case::file_over_directory(file("x", 1), dir("x"))]
#[case::directory_over_file(dir("x"), file("x", 1))]
fn kind_mismatches_are_handed_to_the_writer(#[case] source: FileEntry, #[case] target: FileEntry) {
    let actions = diff(
        &DirectoryListing::from_entries([source.clone()]),
        &DirectoryListing::from_entries([target]),
    );

    assert_eq!(actions, vec![SyncAction::Create(source)]);
}

#[rstest]
fn target_only_entries_produce_no_action() {
    let target = DirectoryListing::from_entries([file("old.csv", 3), dir("archive")]);

    assert!(diff(&DirectoryListing::new(), &target).is_empty());
}

#[rstest]
fn output_is_sorted_by_path() {
    let source =
        DirectoryListing::from_entries([file("c.csv", 1), file("a.csv", 1), file("b.csv", 1)]);

    let paths = diff(&source, &DirectoryListing::new())
        .iter()
        .map(|action| action.entry().relative_path.to_string())
        .collect::<Vec<_>>();

    assert_eq!(paths, ["a.csv", "b.csv", "c.csv"]);
}
