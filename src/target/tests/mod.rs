//! Unit tests for the target module.

use super::*;
use rstest::rstest;

mod local;
mod runner;

#[rstest]
fn temp_names_are_hidden_and_unique() {
    let first = temp_file_name("a.csv");
    let second = temp_file_name("a.csv");

    assert!(first.starts_with(".a.csv."), "name: {first}");
    assert!(first.ends_with(TEMP_FILE_SUFFIX), "name: {first}");
    assert_ne!(first, second);
}

#[rstest]
#[case::generated(&temp_file_name("b.csv"), true)]
#[case::plain("b.csv", false)]
#[case::dotfile(".profile", false)]
#[case::visible_suffix("b.csv.flashsync-tmp", false)]
fn temp_name_detection(#[case] name: &str, #[case] expected: bool) {
    assert_eq!(is_temp_file_name(name), expected);
}
