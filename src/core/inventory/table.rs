//! The inventory table: one row per media file with its date, location and
//! duplicate status.

use crate::core::classifier::{DuplicateStatus, NameRegistry};
use crate::core::organize::OrganizeCandidate;
use crate::core::report::{cell, Columns};
use crate::error::{PlanningError, ReportError};
use chrono::NaiveDate;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const COL_PATH: &str = "File Path";
pub const COL_NAME: &str = "File Name";
pub const COL_DIRECTORY: &str = "Directory";
pub const COL_SIZE: &str = "Size (Bytes)";
pub const COL_DATE: &str = "Photo Date";
pub const COL_STATUS: &str = "Duplicate Status";
pub const COL_COUNTRY: &str = "Country";
pub const COL_CITY: &str = "City";

/// One inventory row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryRecord {
    pub path: PathBuf,
    pub size: Option<u64>,
    pub date: Option<NaiveDate>,
    /// `None` when the table left the cell blank
    pub status: Option<DuplicateStatus>,
    pub country: Option<String>,
    pub city: Option<String>,
}

impl InventoryRecord {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            size: None,
            date: None,
            status: None,
            country: None,
            city: None,
        }
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Size from the table, else from disk
    fn known_size(&self) -> Option<u64> {
        self.size
            .or_else(|| fs::metadata(&self.path).ok().map(|m| m.len()))
    }
}

/// Rows that loaded plus rows rejected
#[derive(Debug, Default)]
pub struct InventoryTable {
    pub records: Vec<InventoryRecord>,
    pub errors: Vec<PlanningError>,
}

#[derive(Serialize)]
struct Row<'a> {
    #[serde(rename = "File Path")]
    path: &'a Path,
    #[serde(rename = "File Name")]
    name: String,
    #[serde(rename = "Directory")]
    directory: &'a Path,
    #[serde(rename = "Size (Bytes)")]
    size: Option<u64>,
    #[serde(rename = "Photo Date")]
    date: Option<String>,
    #[serde(rename = "Duplicate Status")]
    status: Option<DuplicateStatus>,
    #[serde(rename = "Country")]
    country: Option<&'a str>,
    #[serde(rename = "City")]
    city: Option<&'a str>,
}

/// Parse `YYYY-MM-DD`, optionally followed by a time.
///
/// EXIF-style `YYYY:MM:DD` is accepted too.
pub fn parse_table_date(value: &str) -> Option<NaiveDate> {
    let head = value.trim().get(..10)?;
    NaiveDate::parse_from_str(head, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(head, "%Y:%m:%d"))
        .ok()
}

/// Read an inventory table. `path` is only used in error messages.
///
/// `File Path` and `Photo Date` columns are required. A row with an empty
/// path, an unreadable date or an unknown status is rejected and reported;
/// a blank date is kept and fails later at planning time.
pub fn read_inventory<R: Read>(reader: R, path: &Path) -> Result<InventoryTable, ReportError> {
    let open_err = |source: csv::Error| ReportError::Open {
        path: path.to_path_buf(),
        source,
    };

    let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let columns = Columns::new(rdr.headers().map_err(open_err)?.clone());
    columns.require(&[COL_PATH, COL_DATE], path)?;

    let path_col = columns.index(COL_PATH);
    let size_col = columns.index(COL_SIZE);
    let date_col = columns.index(COL_DATE);
    let status_col = columns.index(COL_STATUS);
    let country_col = columns.index(COL_COUNTRY);
    let city_col = columns.index(COL_CITY);

    let mut table = InventoryTable::default();

    for (i, record) in rdr.records().enumerate() {
        let record = record.map_err(open_err)?;
        let row = i + 2;
        let invalid = |reason: String| PlanningError::InvalidRecord { row, reason };

        let Some(file_path) = cell(&record, path_col) else {
            table.errors.push(invalid("empty File Path".to_string()));
            continue;
        };

        let date = match cell(&record, date_col) {
            None => None,
            Some(value) => match parse_table_date(value) {
                Some(date) => Some(date),
                None => {
                    table.errors.push(invalid(format!("unreadable date '{}'", value)));
                    continue;
                }
            },
        };

        let status = match cell(&record, status_col).map(str::parse::<DuplicateStatus>) {
            None => None,
            Some(Ok(status)) => Some(status),
            Some(Err(reason)) => {
                table.errors.push(invalid(reason));
                continue;
            }
        };

        let size = match cell(&record, size_col).map(str::parse::<u64>) {
            None => None,
            Some(Ok(size)) => Some(size),
            Some(Err(e)) => {
                table.errors.push(invalid(format!("bad size: {}", e)));
                continue;
            }
        };

        table.records.push(InventoryRecord {
            path: PathBuf::from(file_path),
            size,
            date,
            status,
            country: cell(&record, country_col).map(str::to_string),
            city: cell(&record, city_col).map(str::to_string),
        });
    }

    for error in &table.errors {
        warn!("{}", error);
    }
    debug!(
        "read {} inventory rows ({} rejected) from {}",
        table.records.len(),
        table.errors.len(),
        path.display()
    );
    Ok(table)
}

pub fn load_inventory(path: &Path) -> Result<InventoryTable, ReportError> {
    let file = File::open(path).map_err(|e| ReportError::Open {
        path: path.to_path_buf(),
        source: e.into(),
    })?;
    read_inventory(file, path)
}

pub fn write_inventory<W: Write>(writer: W, records: &[InventoryRecord]) -> Result<(), csv::Error> {
    let mut wtr = csv::Writer::from_writer(writer);
    if records.is_empty() {
        wtr.write_record([
            COL_PATH,
            COL_NAME,
            COL_DIRECTORY,
            COL_SIZE,
            COL_DATE,
            COL_STATUS,
            COL_COUNTRY,
            COL_CITY,
        ])?;
    }
    for record in records {
        wtr.serialize(Row {
            path: &record.path,
            name: record.file_name(),
            directory: record.path.parent().unwrap_or(Path::new("")),
            size: record.size,
            date: record.date.map(|d| d.format("%Y-%m-%d").to_string()),
            status: record.status,
            country: record.country.as_deref(),
            city: record.city.as_deref(),
        })?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn save_inventory(path: &Path, records: &[InventoryRecord]) -> Result<(), ReportError> {
    let write_err = |source: csv::Error| ReportError::Write {
        path: path.to_path_buf(),
        source,
    };
    let file = File::create(path).map_err(|e| write_err(e.into()))?;
    write_inventory(file, records).map_err(write_err)?;
    info!("saved {} inventory rows to {}", records.len(), path.display());
    Ok(())
}

/// Statuses for the whole table, recomputed in table order
pub fn recompute_statuses(records: &[InventoryRecord]) -> Vec<DuplicateStatus> {
    let mut registry = NameRegistry::new();
    records
        .iter()
        .map(|record| match record.known_size() {
            Some(size) => registry.observe(&record.file_name(), size),
            // Unreadable source; planning reports it
            None => DuplicateStatus::Ok,
        })
        .collect()
}

/// Convert rows to planner input.
///
/// If any row lacks a status, statuses are recomputed for every row so the
/// first-seen rule sees the whole table.
pub fn to_candidates(records: &[InventoryRecord]) -> Vec<OrganizeCandidate> {
    let statuses: Vec<DuplicateStatus> = if records.iter().all(|r| r.status.is_some()) {
        records.iter().map(|r| r.status.unwrap_or_default()).collect()
    } else {
        info!("duplicate status missing, recomputing from names and sizes");
        recompute_statuses(records)
    };

    records
        .iter()
        .zip(statuses)
        .map(|(record, status)| OrganizeCandidate {
            path: record.path.clone(),
            date: record.date,
            country: record.country.clone(),
            city: record.city.clone(),
            status,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const HEADER: &str =
        "File Path,File Name,Directory,Size (Bytes),Photo Date,Duplicate Status,Country,City\n";

    #[test]
    fn table_dates_accept_time_suffix() {
        let expected = NaiveDate::from_ymd_opt(2024, 5, 1);
        assert_eq!(parse_table_date("2024-05-01"), expected);
        assert_eq!(parse_table_date("2024-05-01 13:45:00"), expected);
        assert_eq!(parse_table_date("2024:05:01 13:45:00"), expected);
        assert_eq!(parse_table_date("May 1st"), None);
    }

    #[test]
    fn reads_full_rows() {
        let input = format!(
            "{}/in/a.jpg,a.jpg,/in,100,2024-05-01 10:00:00,error,Italy,Rome\n",
            HEADER
        );
        let table = read_inventory(input.as_bytes(), Path::new("inv.csv")).unwrap();
        let record = &table.records[0];

        assert_eq!(record.size, Some(100));
        assert_eq!(record.status, Some(DuplicateStatus::Error));
        assert_eq!(record.city.as_deref(), Some("Rome"));
    }

    #[test]
    fn bad_rows_are_skipped_with_row_numbers() {
        let input = format!(
            "{},,,,2024-05-01,,,\n/in/b.jpg,,,,soon,,,\n/in/c.jpg,,,,2024-05-01,maybe,,\n/in/d.jpg,,,,,,,\n",
            HEADER
        );
        let table = read_inventory(input.as_bytes(), Path::new("inv.csv")).unwrap();

        assert_eq!(table.records.len(), 1);
        assert_eq!(table.records[0].date, None);
        let rows: Vec<usize> = table
            .errors
            .iter()
            .map(|e| match e {
                PlanningError::InvalidRecord { row, .. } => *row,
                other => panic!("unexpected error: {other}"),
            })
            .collect();
        assert_eq!(rows, vec![2, 3, 4]);
    }

    #[test]
    fn photo_date_column_is_required() {
        let err = read_inventory("File Path\n/in/a.jpg\n".as_bytes(), Path::new("inv.csv"))
            .unwrap_err();
        assert!(matches!(err, ReportError::MissingColumns { .. }));
    }

    #[test]
    fn blank_status_triggers_full_recompute() {
        let temp = TempDir::new().unwrap();
        let mut records = Vec::new();
        for (dir, size) in [("x", 100u64), ("y", 100), ("z", 200)] {
            let mut record = InventoryRecord::new(temp.path().join(dir).join("a.jpg"));
            record.size = Some(size);
            records.push(record);
        }
        // A stale status on one row is overridden
        records[0].status = Some(DuplicateStatus::Error);

        let statuses: Vec<_> = to_candidates(&records).into_iter().map(|c| c.status).collect();
        assert_eq!(
            statuses,
            vec![DuplicateStatus::Ok, DuplicateStatus::Duplicate, DuplicateStatus::Error]
        );
    }

    #[test]
    fn complete_statuses_are_trusted() {
        let mut record = InventoryRecord::new("/in/a.jpg");
        record.status = Some(DuplicateStatus::Duplicate);
        assert_eq!(to_candidates(&[record])[0].status, DuplicateStatus::Duplicate);
    }

    #[test]
    fn saved_inventory_loads_back() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("inventory.csv");
        let mut record = InventoryRecord::new("/in/a.jpg");
        record.size = Some(42);
        record.date = NaiveDate::from_ymd_opt(2023, 12, 24);
        record.status = Some(DuplicateStatus::Ok);
        record.city = Some("Lyon".to_string());

        save_inventory(&path, &[record.clone()]).unwrap();
        let table = load_inventory(&path).unwrap();

        assert!(table.errors.is_empty());
        assert_eq!(table.records, vec![record]);
    }
}
