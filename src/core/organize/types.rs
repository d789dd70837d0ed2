//! Types for the organize module.

use crate::core::classifier::DuplicateStatus;
use crate::core::stats::{RunStats, StatusCounts};
use crate::error::{ApplyError, PlanningError};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A file ready for planning, with attributes supplied upstream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizeCandidate {
    pub path: PathBuf,
    pub date: Option<NaiveDate>,
    pub country: Option<String>,
    pub city: Option<String>,
    pub status: DuplicateStatus,
}

impl OrganizeCandidate {
    pub fn new(path: impl Into<PathBuf>, date: NaiveDate, status: DuplicateStatus) -> Self {
        Self {
            path: path.into(),
            date: Some(date),
            country: None,
            city: None,
            status,
        }
    }

    pub fn with_location(mut self, country: Option<&str>, city: Option<&str>) -> Self {
        self.country = country.map(str::to_string);
        self.city = city.map(str::to_string);
        self
    }
}

/// Configuration for destination layout
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannerConfig {
    /// Root of the organized tree
    pub root: PathBuf,
    /// Country left out of folder names (compared case-insensitively)
    pub home_country: Option<String>,
}

impl PlannerConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            home_country: None,
        }
    }

    pub fn with_home_country(mut self, country: impl Into<String>) -> Self {
        self.home_country = Some(country.into());
        self
    }
}

/// One planned relocation. Destinations are unique within a plan.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlannedMove {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub status: DuplicateStatus,
}

/// A file left where it is because it already sits in its destination folder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedMove {
    pub path: PathBuf,
    pub reason: String,
}

/// The organization plan
#[derive(Debug, Default)]
pub struct OrganizePlan {
    pub id: String,
    pub moves: Vec<PlannedMove>,
    pub skipped: Vec<SkippedMove>,
    /// Records excluded because they could not be planned
    pub errors: Vec<PlanningError>,
    /// Redundant copies left out of the plan
    pub excluded_duplicates: usize,
    pub status_counts: StatusCounts,
}

impl OrganizePlan {
    /// Planning-phase counters: queued, failed, skipped
    pub fn stats(&self) -> RunStats {
        RunStats {
            successful: self.moves.len(),
            failed: self.errors.len(),
            skipped: self.skipped.len(),
        }
    }

    /// Number of files that get a `_dup` rename
    pub fn renamed_count(&self) -> usize {
        self.moves
            .iter()
            .filter(|m| m.status == DuplicateStatus::Error)
            .count()
    }
}

/// Whether to touch the filesystem
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// Log and verify only
    #[default]
    Simulate,
    /// Perform the moves
    Apply,
}

/// Operation used when applying
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OperationMode {
    /// Move files (rename, or copy and delete across filesystems)
    #[default]
    Move,
    /// Copy files, keeping originals
    Copy,
}

/// Executor settings
#[derive(Debug, Clone, Default)]
pub struct ExecutorConfig {
    pub mode: ExecutionMode,
    pub operation: OperationMode,
    /// Worker threads; moves into one directory always run on one worker
    pub workers: Option<usize>,
}

/// Result of executing a list of moves
#[derive(Debug, Default)]
pub struct ExecutionReport {
    pub stats: RunStats,
    pub errors: Vec<ApplyError>,
    /// Moves refused because the destination was already occupied
    pub anomalies: usize,
    /// Sources that were (or in simulation would be) relocated
    pub completed: Vec<PathBuf>,
    pub folders_created: usize,
    pub duration_ms: u64,
    pub simulated: bool,
}

/// Result of removing directories emptied by a merge
#[derive(Debug, Default)]
pub struct CleanupReport {
    /// Removed directories (or, in simulation, those that would be)
    pub removed: Vec<PathBuf>,
    /// Directories left in place, with the reason
    pub kept: Vec<ApplyError>,
}
