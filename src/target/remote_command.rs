//! Remote shell snippets run over SSH and parsers for their output.
//!
//! Every path interpolated into a snippet is shell-escaped. The write snippet
//! streams file content from stdin into a temporary file next to the
//! destination, checks the byte count, stamps the modification time and only
//! then renames the temporary file over the destination. A trap removes the
//! temporary file when the shell exits early.

use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, Utc};
use shell_escape::unix::escape;

use crate::sync::{DirectoryListing, FileEntry, SyncError};

use super::is_temp_file_name;
use super::runner::CommandOutput;

/// `find -printf` format: kind, size, mtime as fractional epoch seconds, name.
const FIND_FORMAT: &str = "%y %s %T@ %f\\0";

const PERMISSION_MARKERS: [&str; 2] = ["Permission denied", "Operation not permitted"];
const DISK_FULL_MARKERS: [&str; 2] = ["No space left on device", "Disk quota exceeded"];

/// Exit status the OpenSSH client reports for connection failures.
const SSH_CONNECTION_FAILURE: i32 = 255;

fn quote(path: &Utf8Path) -> String {
    escape(path.as_str().into()).into_owned()
}

/// Lists the immediate children of `dir`, printing nothing when `dir` is
/// absent. `-H` follows `dir` itself when it is a symlink; symlinked children
/// are still reported as links and skipped.
pub(crate) fn inspect_command(dir: &Utf8Path) -> String {
    let quoted = quote(dir);
    format!(
        "if [ -d {quoted} ]; then \
         find -H {quoted} -mindepth 1 -maxdepth 1 -printf '{FIND_FORMAT}'; fi"
    )
}

pub(crate) fn ensure_directory_command(dir: &Utf8Path) -> String {
    format!("mkdir -p {}", quote(dir))
}

/// Writes stdin to `temp`, verifies `size`, sets the mtime and renames the
/// result onto `destination`. `mv -T` refuses to replace a directory.
pub(crate) fn write_file_command(
    temp: &Utf8Path,
    destination: &Utf8Path,
    size: usize,
    modified: DateTime<Utc>,
) -> String {
    let quoted_temp = quote(temp);
    let quoted_destination = quote(destination);
    let seconds = modified.timestamp();
    format!(
        "tmp={quoted_temp}; trap 'rm -f \"$tmp\"' EXIT; trap 'exit 129' HUP INT TERM; \
         cat > \"$tmp\" && [ \"$(wc -c < \"$tmp\")\" -eq {size} ] && \
         touch -d @{seconds} \"$tmp\" && mv -fT \"$tmp\" {quoted_destination}"
    )
}

/// Parses NUL-terminated `find -printf` records for `relative_dir`.
///
/// Only regular files and directories are reported; symlinks, devices and
/// in-flight temporary files are skipped.
///
/// # Errors
///
/// Returns a description of the first malformed record.
pub fn parse_find_output(
    stdout: &str,
    relative_dir: &Utf8Path,
) -> Result<DirectoryListing, String> {
    let mut listing = DirectoryListing::new();
    for record in stdout.split('\0').filter(|record| !record.is_empty()) {
        let mut fields = record.splitn(4, ' ');
        let (Some(kind), Some(raw_size), Some(mtime), Some(name)) =
            (fields.next(), fields.next(), fields.next(), fields.next())
        else {
            return Err(format!("truncated record {record:?}"));
        };
        if name.is_empty() || is_temp_file_name(name) {
            continue;
        }
        let path = join(relative_dir, name);
        let modified = parse_epoch(mtime).ok_or_else(|| format!("bad mtime in {record:?}"))?;
        match kind {
            "d" => {
                listing.insert(FileEntry::directory(path, modified));
            }
            "f" => {
                let size = raw_size
                    .parse::<u64>()
                    .map_err(|_| format!("bad size in {record:?}"))?;
                listing.insert(FileEntry::file(path, size, modified));
            }
            _ => {}
        }
    }
    Ok(listing)
}

fn join(dir: &Utf8Path, name: &str) -> Utf8PathBuf {
    if dir.as_str().is_empty() {
        Utf8PathBuf::from(name)
    } else {
        dir.join(name)
    }
}

/// Parses `%T@` output (`1700000000.1234567890`) without going through floats.
fn parse_epoch(raw: &str) -> Option<DateTime<Utc>> {
    let (whole, fraction) = raw.split_once('.').unwrap_or((raw, ""));
    let secs = whole.parse::<i64>().ok()?;
    let digits = fraction.get(..fraction.len().min(9)).unwrap_or_default();
    let nanos = if digits.is_empty() {
        0
    } else {
        let scale = 10_u32.pow(9 - u32::try_from(digits.len()).ok()?);
        digits.parse::<u32>().ok()?.checked_mul(scale)?
    };
    DateTime::from_timestamp(secs, nanos)
}

/// Maps a failed remote command onto the error taxonomy.
#[must_use]
pub fn classify_failure(path: &Utf8Path, output: &CommandOutput) -> SyncError {
    let message = summarise(output);
    let path_buf = path.to_path_buf();
    if matches!(output.code, None | Some(SSH_CONNECTION_FAILURE)) {
        return SyncError::TargetUnreachable {
            path: path_buf,
            message,
        };
    }
    if PERMISSION_MARKERS
        .iter()
        .any(|marker| output.stderr.contains(marker))
    {
        return SyncError::TargetPermissionDenied {
            path: path_buf,
            message,
        };
    }
    if DISK_FULL_MARKERS
        .iter()
        .any(|marker| output.stderr.contains(marker))
    {
        return SyncError::TargetDiskFull {
            path: path_buf,
            message,
        };
    }
    SyncError::TargetRejected {
        path: path_buf,
        message,
    }
}

fn summarise(output: &CommandOutput) -> String {
    let stderr = output.stderr.trim();
    let status = output
        .code
        .map_or_else(|| String::from("terminated by signal"), |code| format!("exit code {code}"));
    if stderr.is_empty() {
        status
    } else {
        format!("{status}: {stderr}")
    }
}
