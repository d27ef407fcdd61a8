//! Parser for the FlashAir `op=100` file list and FAT timestamps.
//!
//! A listing body starts with [`FILE_LIST_HEADER`] and carries one entry per
//! line: `<directory>,<name>,<size>,<attribute>,<date>,<time>`. Directory and
//! name may both contain commas, so the four numeric fields are split off the
//! right-hand side and the directory prefix is matched against the directory
//! that was requested.

use camino::Utf8Path;
use chrono::{DateTime, Datelike, NaiveDate, Timelike, Utc};

use crate::sync::{DirectoryListing, FileEntry};

/// First line of every file list response.
pub const FILE_LIST_HEADER: &str = "WLANSD_FILELIST";

const ATTR_VOLUME: u8 = 0x08;
const ATTR_DIRECTORY: u8 = 0x10;
const FAT_EPOCH_YEAR: i32 = 1980;
const FAT_EPOCH_UNIX_SECONDS: i64 = 315_532_800;

/// Parses a file list for `card_dir`, producing entries whose paths are
/// `relative_dir` joined with each entry name.
///
/// # Errors
///
/// Returns a description of the first malformed line, or of a missing header.
pub fn parse_file_list(
    body: &str,
    card_dir: &str,
    relative_dir: &Utf8Path,
) -> Result<DirectoryListing, String> {
    let mut lines = body
        .lines()
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| !line.trim().is_empty());

    match lines.next() {
        Some(header) if header.trim() == FILE_LIST_HEADER => {}
        Some(other) => return Err(format!("unexpected header line {other:?}")),
        None => return Err(String::from("empty response")),
    }

    let mut listing = DirectoryListing::new();
    for line in lines {
        if let Some(entry) = parse_line(line, card_dir, relative_dir)? {
            listing.insert(entry);
        }
    }
    Ok(listing)
}

fn parse_line(
    line: &str,
    card_dir: &str,
    relative_dir: &Utf8Path,
) -> Result<Option<FileEntry>, String> {
    let mut fields = line.rsplitn(5, ',');
    let (Some(raw_time), Some(raw_date), Some(raw_attribute), Some(raw_size), Some(head)) = (
        fields.next(),
        fields.next(),
        fields.next(),
        fields.next(),
        fields.next(),
    ) else {
        return Err(format!("expected six fields in {line:?}"));
    };

    let size = parse_number::<u64>(raw_size, "size", line)?;
    let attribute = parse_number::<u8>(raw_attribute, "attribute", line)?;
    let date = parse_number::<u16>(raw_date, "date", line)?;
    let time = parse_number::<u16>(raw_time, "time", line)?;

    let name = entry_name(head, card_dir);
    if name.is_empty() || name.contains('/') {
        return Err(format!("invalid entry name {name:?} in {line:?}"));
    }
    if name == "." || name == ".." || attribute & ATTR_VOLUME != 0 {
        return Ok(None);
    }

    let relative_path = relative_dir.join(name);
    let modified = decode_fat_timestamp(date, time);
    Ok(Some(if attribute & ATTR_DIRECTORY == 0 {
        FileEntry::file(relative_path, size, modified)
    } else {
        FileEntry::directory(relative_path, modified)
    }))
}

fn entry_name<'a>(head: &'a str, card_dir: &str) -> &'a str {
    let trimmed = card_dir.trim_end_matches('/');
    let prefixes = [card_dir, trimmed, "/", ""];
    prefixes
        .iter()
        .find_map(|prefix| head.strip_prefix(prefix).and_then(|rest| rest.strip_prefix(',')))
        .or_else(|| head.split_once(',').map(|(_, name)| name))
        .unwrap_or(head)
}

fn parse_number<T: std::str::FromStr>(raw: &str, field: &str, line: &str) -> Result<T, String> {
    raw.trim()
        .parse()
        .map_err(|_| format!("invalid {field} {raw:?} in {line:?}"))
}

/// Converts a FAT date/time pair to UTC.
///
/// Invalid combinations (such as the all-zero timestamp some cards report)
/// map to the FAT epoch, 1980-01-01T00:00:00Z.
#[must_use]
pub fn decode_fat_timestamp(date: u16, time: u16) -> DateTime<Utc> {
    let year = FAT_EPOCH_YEAR + i32::from(date >> 9);
    let month = u32::from((date >> 5) & 0x0f);
    let day = u32::from(date & 0x1f);
    let hour = u32::from(time >> 11);
    let minute = u32::from((time >> 5) & 0x3f);
    let second = u32::from(time & 0x1f) * 2;

    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|naive| naive.and_hms_opt(hour, minute, second))
        .map_or_else(fat_epoch, |naive| naive.and_utc())
}

/// Converts a UTC timestamp to a FAT date/time pair, clamping to the range
/// FAT can represent and rounding seconds down to even values.
#[must_use]
pub fn encode_fat_timestamp(timestamp: DateTime<Utc>) -> (u16, u16) {
    let clamped = timestamp.max(fat_epoch());
    let years = u16::try_from(clamped.year() - FAT_EPOCH_YEAR)
        .unwrap_or(0x7f)
        .min(0x7f);
    let month = u16::try_from(clamped.month()).unwrap_or(1);
    let day = u16::try_from(clamped.day()).unwrap_or(1);
    let hour = u16::try_from(clamped.hour()).unwrap_or(0);
    let minute = u16::try_from(clamped.minute()).unwrap_or(0);
    let second = u16::try_from(clamped.second()).unwrap_or(0) >> 1;

    let date = (years << 9) | (month << 5) | day;
    let time = (hour << 11) | (minute << 5) | second;
    (date, time)
}

fn fat_epoch() -> DateTime<Utc> {
    DateTime::from_timestamp(FAT_EPOCH_UNIX_SECONDS, 0).unwrap_or_default()
}
