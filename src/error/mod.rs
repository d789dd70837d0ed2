//! # Error Module
//!
//! Error types for the media organizer.
//!
//! ## Design Principles
//! - **Never abort a run** on a single file - errors are collected, not raised
//! - **Include context** - paths, row numbers, what went wrong
//! - **Never lose data** - deletion failures are reported, never escalated

use std::path::PathBuf;
use thiserror::Error;

/// Top-level application error
#[derive(Error, Debug)]
pub enum OrganizerError {
    #[error("Scanning error: {0}")]
    Scan(#[from] ScanError),

    #[error("Planning error: {0}")]
    Planning(#[from] PlanningError),

    #[error("Apply error: {0}")]
    Apply(#[from] ApplyError),

    #[error("Report error: {0}")]
    Report(#[from] ReportError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that occur while walking directories or reading file content
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Directory not found: {path}")]
    DirectoryNotFound { path: PathBuf },

    #[error("Permission denied accessing: {path}")]
    PermissionDenied { path: PathBuf },

    #[error("Failed to read directory {path}: {source}")]
    ReadDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors that exclude a single record from a plan
#[derive(Error, Debug)]
pub enum PlanningError {
    #[error("Source file not found: {path}")]
    SourceNotFound { path: PathBuf },

    #[error("No date available for {path}")]
    MissingDate { path: PathBuf },

    #[error("Invalid record on row {row}: {reason}")]
    InvalidRecord { row: usize, reason: String },
}

/// Errors that fail a single move or directory removal at apply time
#[derive(Error, Debug)]
pub enum ApplyError {
    #[error("Destination already occupied, refusing to overwrite: {destination}")]
    CollisionInvariantViolation { destination: PathBuf },

    #[error("Source file not found: {path}")]
    SourceMissing { path: PathBuf },

    #[error("Failed to create {path}: {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to move {source_path} to {destination}: {source}")]
    Move {
        source_path: PathBuf,
        destination: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Copy verification failed for {destination}: source {expected} bytes, destination {actual} bytes")]
    CopyVerification {
        destination: PathBuf,
        expected: u64,
        actual: u64,
    },

    #[error("Directory is not empty, left in place: {path}")]
    DirectoryNotEmpty { path: PathBuf },

    #[error("Failed to remove directory {path}: {source}")]
    RemoveDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ApplyError {
    /// Whether this failure breaks a planning guarantee rather than being an I/O hiccup
    pub fn is_invariant_breach(&self) -> bool {
        matches!(self, ApplyError::CollisionInvariantViolation { .. })
    }
}

/// Errors reading or writing inventory and plan tables
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Failed to open table {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Missing required columns in {path}: {columns}")]
    MissingColumns { path: PathBuf, columns: String },

    #[error("Failed to write table {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Malformed row {row} in {path}: {reason}")]
    MalformedRow {
        path: PathBuf,
        row: usize,
        reason: String,
    },

    #[error("Failed to write checkpoint {path}: {source}")]
    Checkpoint {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Convenience Result type alias
pub type Result<T> = std::result::Result<T, OrganizerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_error_includes_path() {
        let error = ScanError::DirectoryNotFound {
            path: PathBuf::from("/photos/vacation"),
        };
        assert!(error.to_string().contains("/photos/vacation"));
    }

    #[test]
    fn planning_error_includes_row() {
        let error = PlanningError::InvalidRecord {
            row: 12,
            reason: "unparseable date 'soon'".to_string(),
        };
        let message = error.to_string();
        assert!(message.contains("row 12"));
        assert!(message.contains("soon"));
    }

    #[test]
    fn collision_is_flagged_as_invariant_breach() {
        let collision = ApplyError::CollisionInvariantViolation {
            destination: PathBuf::from("/root/2024/2024-05-01/a.jpg"),
        };
        let missing = ApplyError::SourceMissing {
            path: PathBuf::from("/src/a.jpg"),
        };
        assert!(collision.is_invariant_breach());
        assert!(!missing.is_invariant_breach());
        assert!(collision.to_string().contains("refusing to overwrite"));
    }
}
