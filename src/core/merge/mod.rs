//! # Merge Module
//!
//! Second pass over an already organized tree. Directories named
//! `YYYY-MM-DD[_location]` are consolidated: first by shared date, then by
//! location within a date window.
//!
//! Planning produces ordinary [`PlannedMove`](crate::core::organize::PlannedMove)s,
//! so the same executor applies both organize and merge plans.

mod parser;
mod planner;

pub use parser::{parse_directory_name, DirectoryName};
pub use planner::{
    discover_clusters, final_target, merge_date_window, merge_same_date, select_target,
    DirectoryCluster, MergeConfig, MergeDecision, MergePlan, MergeReason, SubfolderMerger,
    DEFAULT_WINDOW_DAYS,
};
