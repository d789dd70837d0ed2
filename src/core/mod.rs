//! # Core Module
//!
//! The UI-agnostic engine. Data flows one way:
//! scanner → classifier → organize (plan, then execute), with `merge` as an
//! independent second pass over an organized tree.
//!
//! ## Modules
//! - `scanner` - Walks directories in a stable order
//! - `classifier` - Duplicate status and content fingerprint groups
//! - `metadata` - Date resolution for scanned files
//! - `inventory` - The inventory table and the pipeline that builds it
//! - `organize` - Move planning and execution
//! - `merge` - Date folder consolidation
//! - `report` - Plan and duplicate tables
//! - `stats` - Per-run counters

pub mod classifier;
pub mod inventory;
pub mod merge;
pub mod metadata;
pub mod organize;
pub mod report;
pub mod scanner;
pub mod stats;

// Re-export commonly used types
pub use classifier::{DuplicateClassifier, DuplicateStatus};
pub use merge::SubfolderMerger;
pub use organize::{MoveExecutor, MovePlanner, PlannedMove};
pub use scanner::FileRecord;
