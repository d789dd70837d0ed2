//! # Metadata Module
//!
//! Resolves the per-file attributes the move planner needs: a calendar date
//! and, when an upstream source knows it, a country and city.
//!
//! ## Date resolution order
//! 1. EXIF `DateTimeOriginal`, `DateTimeDigitized`, `DateTime` (photos only)
//! 2. A date embedded in the file name (`IMG_20240501_...`, `2024-05-01 ...`, `01-05-2024`)
//! 3. The earlier of the filesystem created/modified dates
//!
//! Location is never looked up here; reverse geocoding needs the network.

use crate::core::scanner::{FileRecord, MediaKind};
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};
use exif::{In, Reader, Tag, Value};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::BufReader;
use std::path::Path;
use std::sync::OnceLock;

/// Where a date came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateSource {
    Exif,
    FileName,
    FileSystem,
}

/// A resolved date and its provenance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedDate {
    pub date: NaiveDate,
    pub source: DateSource,
}

/// Attributes attached to a file by a metadata collaborator
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileAttributes {
    pub date: Option<ResolvedDate>,
    pub country: Option<String>,
    pub city: Option<String>,
}

/// Supplies dates and locations for scanned files.
///
/// Implementations run on the worker pool and must be thread safe.
pub trait AttributeProvider: Send + Sync {
    fn attributes(&self, record: &FileRecord) -> FileAttributes;
}

/// Resolves dates from the file itself; never knows a location
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalMetadata;

impl AttributeProvider for LocalMetadata {
    fn attributes(&self, record: &FileRecord) -> FileAttributes {
        FileAttributes {
            date: resolve_date(&record.path),
            country: None,
            city: None,
        }
    }
}

/// Resolve the best available date for a media file
pub fn resolve_date(path: &Path) -> Option<ResolvedDate> {
    if MediaKind::from_path(path) == MediaKind::Photo {
        if let Some(date) = exif_date(path) {
            return Some(ResolvedDate {
                date,
                source: DateSource::Exif,
            });
        }
    }

    let from_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .and_then(date_from_file_name);
    if let Some(date) = from_name {
        return Some(ResolvedDate {
            date,
            source: DateSource::FileName,
        });
    }

    filesystem_date(path).map(|date| ResolvedDate {
        date,
        source: DateSource::FileSystem,
    })
}

/// Read the capture date from EXIF
pub fn exif_date(path: &Path) -> Option<NaiveDate> {
    let file = File::open(path).ok()?;
    let mut reader = BufReader::new(file);
    let exif = Reader::new().read_from_container(&mut reader).ok()?;

    [Tag::DateTimeOriginal, Tag::DateTimeDigitized, Tag::DateTime]
        .into_iter()
        .filter_map(|tag| exif.get_field(tag, In::PRIMARY))
        .find_map(|field| match field.value {
            Value::Ascii(ref values) => values
                .first()
                .and_then(|bytes| std::str::from_utf8(bytes).ok())
                .and_then(parse_exif_datetime),
            _ => None,
        })
}

/// EXIF format: "YYYY:MM:DD HH:MM:SS"
fn parse_exif_datetime(s: &str) -> Option<NaiveDate> {
    let s = s.trim_end_matches('\0').trim();
    NaiveDateTime::parse_from_str(s, "%Y:%m:%d %H:%M:%S")
        .map(|dt| dt.date())
        .ok()
}

fn year_first() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d{4})[-_]?(\d{2})[-_]?(\d{2})").expect("valid regex"))
}

fn day_first() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d{2})[-_]?(\d{2})[-_]?(\d{4})").expect("valid regex"))
}

/// Extract a date embedded in a file name, year-first patterns winning
pub fn date_from_file_name(name: &str) -> Option<NaiveDate> {
    let ymd = year_first().captures_iter(name).find_map(|caps| {
        NaiveDate::from_ymd_opt(caps[1].parse().ok()?, caps[2].parse().ok()?, caps[3].parse().ok()?)
    });
    if ymd.is_some() {
        return ymd;
    }

    day_first().captures_iter(name).find_map(|caps| {
        NaiveDate::from_ymd_opt(caps[3].parse().ok()?, caps[2].parse().ok()?, caps[1].parse().ok()?)
    })
}

/// Earlier of created and modified, in local time
pub fn filesystem_date(path: &Path) -> Option<NaiveDate> {
    let metadata = fs::metadata(path).ok()?;
    let to_date = |t: std::time::SystemTime| DateTime::<Local>::from(t).date_naive();

    let modified = metadata.modified().ok().map(to_date);
    let created = metadata.created().ok().map(to_date);

    match (created, modified) {
        (Some(c), Some(m)) => Some(c.min(m)),
        (c, m) => c.or(m),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn file_name_year_first_patterns() {
        assert_eq!(date_from_file_name("IMG_20240501_123456.jpg"), Some(date(2024, 5, 1)));
        assert_eq!(date_from_file_name("VID-20231231-WA0001.mp4"), Some(date(2023, 12, 31)));
        assert_eq!(date_from_file_name("2024-05-01 beach.jpg"), Some(date(2024, 5, 1)));
    }

    #[test]
    fn file_name_day_first_pattern() {
        assert_eq!(date_from_file_name("scan_01-05-2024.png"), Some(date(2024, 5, 1)));
    }

    #[test]
    fn file_name_without_date() {
        assert_eq!(date_from_file_name("holiday.jpg"), None);
        assert_eq!(date_from_file_name("IMG_99999999.jpg"), None);
    }

    #[test]
    fn exif_datetime_parsing() {
        assert_eq!(parse_exif_datetime("2024:01:15 14:30:00"), Some(date(2024, 1, 15)));
        assert_eq!(parse_exif_datetime("2024:01:15 14:30:00\0"), Some(date(2024, 1, 15)));
        assert_eq!(parse_exif_datetime("not a date"), None);
    }

    #[test]
    fn non_exif_photo_falls_back_to_file_name() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("IMG_20200202_000000.jpg");
        std::fs::write(&path, b"not really a jpeg").unwrap();

        let resolved = resolve_date(&path).unwrap();
        assert_eq!(resolved.date, date(2020, 2, 2));
        assert_eq!(resolved.source, DateSource::FileName);
    }

    #[test]
    fn undated_name_falls_back_to_filesystem() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("clip.mov");
        std::fs::write(&path, b"x").unwrap();

        let resolved = resolve_date(&path).unwrap();
        assert_eq!(resolved.source, DateSource::FileSystem);
    }

    #[test]
    fn missing_file_has_no_date() {
        assert_eq!(resolve_date(Path::new("/nonexistent/holiday.jpg")), None);
    }
}
