//! # Report Module
//!
//! CSV tables produced and consumed by the engine:
//! - the move plan (`Source`, `Destination`, `Status`), which is the replayable
//!   record of a planning run
//! - the duplicate group listing written by `dupes`

use crate::core::classifier::{DuplicateGroup, DuplicateStatus};
use crate::core::organize::PlannedMove;
use crate::error::ReportError;
use csv::StringRecord;
use serde::Serialize;
use std::collections::HashSet;
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing::info;

pub const PLAN_COLUMNS: [&str; 3] = ["Source", "Destination", "Status"];

#[derive(Serialize)]
struct PlanRow<'a> {
    #[serde(rename = "Source")]
    source: &'a Path,
    #[serde(rename = "Destination")]
    destination: &'a Path,
    #[serde(rename = "Status")]
    status: DuplicateStatus,
}

#[derive(Serialize)]
struct GroupRow<'a> {
    #[serde(rename = "Group")]
    group: usize,
    #[serde(rename = "Fingerprint")]
    fingerprint: String,
    #[serde(rename = "Size (Bytes)")]
    size: u64,
    #[serde(rename = "File Path")]
    path: &'a Path,
}

/// Header lookup that tolerates column order and surrounding whitespace
pub(crate) struct Columns {
    headers: StringRecord,
}

impl Columns {
    pub(crate) fn new(headers: StringRecord) -> Self {
        Self { headers }
    }

    pub(crate) fn index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h.trim() == name)
    }

    /// Fail with every missing name at once
    pub(crate) fn require(&self, names: &[&str], path: &Path) -> Result<(), ReportError> {
        let missing: Vec<&str> = names
            .iter()
            .copied()
            .filter(|n| self.index(n).is_none())
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ReportError::MissingColumns {
                path: path.to_path_buf(),
                columns: missing.join(", "),
            })
        }
    }
}

/// Cell value, trimmed, `None` when blank or absent
pub(crate) fn cell<'r>(record: &'r StringRecord, index: Option<usize>) -> Option<&'r str> {
    index
        .and_then(|i| record.get(i))
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Write moves to any writer
pub fn write_plan<W: Write>(writer: W, moves: &[PlannedMove]) -> Result<(), csv::Error> {
    let mut wtr = csv::Writer::from_writer(writer);
    if moves.is_empty() {
        wtr.write_record(PLAN_COLUMNS)?;
    }
    for planned in moves {
        wtr.serialize(PlanRow {
            source: &planned.source,
            destination: &planned.destination,
            status: planned.status,
        })?;
    }
    wtr.flush()?;
    Ok(())
}

/// Save a plan table
pub fn save_plan(path: &Path, moves: &[PlannedMove]) -> Result<(), ReportError> {
    let write_err = |source: csv::Error| ReportError::Write {
        path: path.to_path_buf(),
        source,
    };
    let file = File::create(path).map_err(|e| write_err(e.into()))?;
    write_plan(file, moves).map_err(write_err)?;
    info!("saved {} planned moves to {}", moves.len(), path.display());
    Ok(())
}

/// Read a plan table. `path` is only used in error messages.
///
/// A missing `Status` column reads as `ok`. Rows that repeat a source or a
/// destination are rejected, since replaying them could overwrite files.
pub fn read_plan<R: Read>(reader: R, path: &Path) -> Result<Vec<PlannedMove>, ReportError> {
    let open_err = |source: csv::Error| ReportError::Open {
        path: path.to_path_buf(),
        source,
    };

    let mut rdr = csv::Reader::from_reader(reader);
    let columns = Columns::new(rdr.headers().map_err(open_err)?.clone());
    columns.require(&PLAN_COLUMNS[..2], path)?;

    let source_col = columns.index("Source");
    let destination_col = columns.index("Destination");
    let status_col = columns.index("Status");

    let mut moves = Vec::new();
    let mut sources = HashSet::new();
    let mut destinations = HashSet::new();

    for (i, record) in rdr.records().enumerate() {
        let record = record.map_err(open_err)?;
        // header is row 1
        let row = i + 2;
        let malformed = |reason: String| ReportError::MalformedRow {
            path: path.to_path_buf(),
            row,
            reason,
        };

        let (Some(source), Some(destination)) =
            (cell(&record, source_col), cell(&record, destination_col))
        else {
            return Err(malformed("empty Source or Destination".to_string()));
        };

        let status = match cell(&record, status_col) {
            Some(value) => value.parse::<DuplicateStatus>().map_err(malformed)?,
            None => DuplicateStatus::Ok,
        };

        let source = PathBuf::from(source);
        let destination = PathBuf::from(destination);
        if !sources.insert(source.clone()) {
            return Err(malformed(format!("{} appears twice", source.display())));
        }
        if !destinations.insert(destination.clone()) {
            return Err(malformed(format!(
                "destination {} appears twice",
                destination.display()
            )));
        }

        moves.push(PlannedMove {
            source,
            destination,
            status,
        });
    }

    Ok(moves)
}

/// Load a plan table from disk
pub fn load_plan(path: &Path) -> Result<Vec<PlannedMove>, ReportError> {
    let file = File::open(path).map_err(|e| ReportError::Open {
        path: path.to_path_buf(),
        source: e.into(),
    })?;
    read_plan(file, path)
}

/// One row per member of each fingerprint group
pub fn write_duplicate_groups<W: Write>(
    writer: W,
    groups: &[DuplicateGroup],
) -> Result<(), csv::Error> {
    let mut wtr = csv::Writer::from_writer(writer);
    for (index, group) in groups.iter().enumerate() {
        let fingerprint = group.fingerprint.to_string();
        for path in &group.files {
            wtr.serialize(GroupRow {
                group: index + 1,
                fingerprint: fingerprint.clone(),
                size: group.size,
                path,
            })?;
        }
    }
    wtr.flush()?;
    Ok(())
}

pub fn save_duplicate_groups(path: &Path, groups: &[DuplicateGroup]) -> Result<(), ReportError> {
    let write_err = |source: csv::Error| ReportError::Write {
        path: path.to_path_buf(),
        source,
    };
    let file = File::create(path).map_err(|e| write_err(e.into()))?;
    write_duplicate_groups(file, groups).map_err(write_err)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn planned(source: &str, destination: &str, status: DuplicateStatus) -> PlannedMove {
        PlannedMove {
            source: PathBuf::from(source),
            destination: PathBuf::from(destination),
            status,
        }
    }

    #[test]
    fn plan_table_has_expected_columns() {
        let mut out = Vec::new();
        write_plan(
            &mut out,
            &[planned("/in/a.jpg", "/out/2024/2024-05-01/a_dup.jpg", DuplicateStatus::Error)],
        )
        .unwrap();

        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "Source,Destination,Status\n/in/a.jpg,/out/2024/2024-05-01/a_dup.jpg,error\n"
        );
    }

    #[test]
    fn saved_plan_loads_back() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("plan.csv");
        let moves = vec![
            planned("/in/a.jpg", "/out/a.jpg", DuplicateStatus::Ok),
            planned("/in/b, with comma.jpg", "/out/b.jpg", DuplicateStatus::Error),
        ];

        save_plan(&path, &moves).unwrap();
        assert_eq!(load_plan(&path).unwrap(), moves);
    }

    #[test]
    fn status_column_is_optional_and_lenient() {
        let input = "Destination,Source\n/out/a.jpg,/in/a.jpg\n";
        let moves = read_plan(input.as_bytes(), Path::new("plan.csv")).unwrap();
        assert_eq!(moves[0].status, DuplicateStatus::Ok);

        let input = "Source,Destination,Status\n/in/a.jpg,/out/a.jpg, ERROR \n";
        let moves = read_plan(input.as_bytes(), Path::new("plan.csv")).unwrap();
        assert_eq!(moves[0].status, DuplicateStatus::Error);
    }

    #[test]
    fn missing_columns_are_reported_together() {
        let err = read_plan("Status\nok\n".as_bytes(), Path::new("plan.csv")).unwrap_err();
        match err {
            ReportError::MissingColumns { columns, .. } => assert_eq!(columns, "Source, Destination"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn repeated_destination_is_rejected() {
        let input = "Source,Destination\n/in/a.jpg,/out/a.jpg\n/in/b.jpg,/out/a.jpg\n";
        let err = read_plan(input.as_bytes(), Path::new("plan.csv")).unwrap_err();
        assert!(matches!(err, ReportError::MalformedRow { row: 3, .. }));
    }
}
