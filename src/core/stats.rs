//! Run statistics.
//!
//! Every phase returns its own counters; nothing is accumulated in global
//! state. The CLI folds phase results into a [`RunSummary`] for display.

use crate::core::classifier::DuplicateStatus;
use serde::{Deserialize, Serialize};

/// Per-phase outcome counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    pub successful: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl RunStats {
    pub fn total(&self) -> usize {
        self.successful + self.failed + self.skipped
    }
}

/// How many records carried each duplicate status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub ok: usize,
    pub duplicate: usize,
    pub error: usize,
}

impl StatusCounts {
    pub fn record(&mut self, status: DuplicateStatus) {
        match status {
            DuplicateStatus::Ok => self.ok += 1,
            DuplicateStatus::Duplicate => self.duplicate += 1,
            DuplicateStatus::Error => self.error += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.ok + self.duplicate + self.error
    }
}

/// Everything a run reports at the end
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunSummary {
    pub records: usize,
    pub statuses: StatusCounts,
    pub planned: usize,
    pub planning: RunStats,
    pub execution: RunStats,
    pub directories_removed: usize,
    pub simulated: bool,
}

impl RunSummary {
    /// True when no phase recorded a failure
    pub fn is_clean(&self) -> bool {
        self.planning.failed == 0 && self.execution.failed == 0
    }
}
