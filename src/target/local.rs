//! Target backed by a directory on the local filesystem.
//!
//! Useful when the mirror lives on a mounted share, and as a real filesystem
//! for exercising the sync engine in tests. Writes follow the same
//! temporary-file-then-rename protocol as the SSH target.

use std::io::{self, Write};
use std::time::SystemTime;

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs_utf8::Dir};
use chrono::{DateTime, Utc};
use tokio::task::spawn_blocking;
use tracing::debug;

use crate::sync::{DirectoryListing, FileEntry, IoFuture, SyncError};

use super::{TargetInspector, TargetWriter, is_temp_file_name, temp_file_name};

/// Mirrors files into `root` on this machine.
#[derive(Clone, Debug)]
pub struct LocalTarget {
    root: Utf8PathBuf,
}

impl LocalTarget {
    /// Creates a target rooted at `root`. The directory is created on demand.
    #[must_use]
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, relative: &Utf8Path) -> Utf8PathBuf {
        if relative.as_str().is_empty() {
            self.root.clone()
        } else {
            self.root.join(relative)
        }
    }
}

impl TargetInspector for LocalTarget {
    fn inspect_directory<'a>(&'a self, dir: &'a Utf8Path) -> IoFuture<'a, DirectoryListing> {
        let absolute = self.resolve(dir);
        let relative = dir.to_path_buf();
        Box::pin(blocking(move || inspect(&absolute, &relative)))
    }
}

impl TargetWriter for LocalTarget {
    fn ensure_directory<'a>(&'a self, dir: &'a Utf8Path) -> IoFuture<'a, ()> {
        let absolute = self.resolve(dir);
        Box::pin(blocking(move || {
            Dir::create_ambient_dir_all(&absolute, ambient_authority())
                .map_err(|err| io_error(&absolute, &err))
        }))
    }

    fn write_file<'a>(
        &'a self,
        path: &'a Utf8Path,
        content: &'a [u8],
        modified: DateTime<Utc>,
    ) -> IoFuture<'a, ()> {
        let destination = self.resolve(path);
        let owned = content.to_vec();
        Box::pin(blocking(move || {
            write_atomically(&destination, &owned, modified)
        }))
    }
}

async fn blocking<T, F>(work: F) -> Result<T, SyncError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, SyncError> + Send + 'static,
{
    spawn_blocking(work).await.map_err(|err| SyncError::Runtime {
        message: err.to_string(),
    })?
}

fn inspect(absolute: &Utf8Path, relative: &Utf8Path) -> Result<DirectoryListing, SyncError> {
    let dir = match Dir::open_ambient_dir(absolute, ambient_authority()) {
        Ok(dir) => dir,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(DirectoryListing::new()),
        Err(err) => return Err(io_error(absolute, &err)),
    };

    let mut listing = DirectoryListing::new();
    for item in dir.entries().map_err(|err| io_error(absolute, &err))? {
        let entry = item.map_err(|err| io_error(absolute, &err))?;
        let name = entry.file_name().map_err(|err| io_error(absolute, &err))?;
        if is_temp_file_name(&name) {
            continue;
        }
        let metadata = entry.metadata().map_err(|err| io_error(absolute, &err))?;
        let modified = metadata
            .modified()
            .map(|time| DateTime::<Utc>::from(time.into_std()))
            .map_err(|err| io_error(absolute, &err))?;
        let path = if relative.as_str().is_empty() {
            Utf8PathBuf::from(&name)
        } else {
            relative.join(&name)
        };
        if metadata.is_dir() {
            listing.insert(FileEntry::directory(path, modified));
        } else if metadata.is_file() {
            listing.insert(FileEntry::file(path, metadata.len(), modified));
        }
    }
    Ok(listing)
}

fn write_atomically(
    destination: &Utf8Path,
    content: &[u8],
    modified: DateTime<Utc>,
) -> Result<(), SyncError> {
    let parent = destination.parent().unwrap_or_else(|| Utf8Path::new("."));
    let name = destination
        .file_name()
        .ok_or_else(|| SyncError::TargetRejected {
            path: destination.to_path_buf(),
            message: String::from("destination has no file name"),
        })?;
    let dir =
        Dir::open_ambient_dir(parent, ambient_authority()).map_err(|err| io_error(parent, &err))?;

    if dir.metadata(name).is_ok_and(|existing| existing.is_dir()) {
        return Err(SyncError::TargetRejected {
            path: destination.to_path_buf(),
            message: String::from("a directory exists at this path"),
        });
    }

    let temp = temp_file_name(name);
    let written = write_temp(&dir, &temp, content, modified)
        .and_then(|()| dir.rename(&temp, &dir, name));
    if let Err(err) = written {
        if let Err(cleanup) = dir.remove_file(&temp)
            && cleanup.kind() != io::ErrorKind::NotFound
        {
            debug!(%temp, error = %cleanup, "failed to remove temporary file");
        }
        return Err(io_error(destination, &err));
    }
    Ok(())
}

fn write_temp(dir: &Dir, temp: &str, content: &[u8], modified: DateTime<Utc>) -> io::Result<()> {
    let mut file = dir.create(temp)?.into_std();
    file.write_all(content)?;
    file.set_modified(SystemTime::from(modified))?;
    file.sync_all()
}

fn io_error(path: &Utf8Path, err: &io::Error) -> SyncError {
    let owned = path.to_path_buf();
    let message = err.to_string();
    match err.kind() {
        io::ErrorKind::PermissionDenied => SyncError::TargetPermissionDenied {
            path: owned,
            message,
        },
        io::ErrorKind::StorageFull | io::ErrorKind::QuotaExceeded => SyncError::TargetDiskFull {
            path: owned,
            message,
        },
        _ => SyncError::TargetRejected {
            path: owned,
            message,
        },
    }
}
