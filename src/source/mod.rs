//! Read-only access to the card's filesystem.
//!
//! The card exposes one directory per listing request, so callers walk the
//! tree by listing each subdirectory in turn. Paths handed to these traits are
//! relative to the configured card root.

use bytes::Bytes;
use camino::Utf8Path;

use crate::sync::{DirectoryListing, IoFuture};

mod flashair;
mod listing;

pub use flashair::FlashAirClient;
pub use listing::{FILE_LIST_HEADER, decode_fat_timestamp, encode_fat_timestamp, parse_file_list};

/// Lists one directory level on the card.
pub trait SourceLister {
    /// Returns the immediate entries of `dir`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::SyncError::SourceUnreachable`] on transport or HTTP
    /// failure and [`crate::SyncError::SourceProtocolError`] when the response
    /// cannot be parsed.
    fn list_directory<'a>(&'a self, dir: &'a Utf8Path) -> IoFuture<'a, DirectoryListing>;
}

/// Downloads file content from the card.
pub trait SourceFetcher {
    /// Returns the full content of the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::SyncError::SourceNotFound`] when the file vanished and
    /// [`crate::SyncError::SourceUnreachable`] on transport failure.
    fn fetch_file<'a>(&'a self, path: &'a Utf8Path) -> IoFuture<'a, Bytes>;
}

/// Normalises a card path: leading `/`, no trailing `/`, no empty segments.
///
/// ```
/// # use flashsync::source::normalize_card_path;
/// assert_eq!(normalize_card_path("CSVFILES//LOG/"), "/CSVFILES/LOG");
/// assert_eq!(normalize_card_path(""), "/");
/// ```
#[must_use]
pub fn normalize_card_path(path: &str) -> String {
    let segments = path
        .split('/')
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>();
    format!("/{}", segments.join("/"))
}

/// Resolves `relative` beneath the card `root`.
///
/// ```
/// # use camino::Utf8Path;
/// # use flashsync::source::card_path;
/// let joined = card_path("/CSVFILES/LOG/", Utf8Path::new("2024/a.csv"));
/// assert_eq!(joined, "/CSVFILES/LOG/2024/a.csv");
/// assert_eq!(card_path("/", Utf8Path::new("")), "/");
/// ```
#[must_use]
pub fn card_path(root: &str, relative: &Utf8Path) -> String {
    normalize_card_path(&format!("{root}/{relative}"))
}
