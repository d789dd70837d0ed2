//! Event type definitions for progress reporting.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// All events emitted by the organizer engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    /// Directory walk events
    Scan(ScanEvent),
    /// Duplicate classification events
    Classify(ClassifyEvent),
    /// Move planning events
    Plan(PlanEvent),
    /// Move application events
    Execute(ExecuteEvent),
    /// Pipeline-level events
    Pipeline(PipelineEvent),
}

/// Events during the scanning phase
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ScanEvent {
    /// Scanning has started
    Started { paths: Vec<PathBuf> },
    /// Progress update during scanning
    Progress(ScanProgress),
    /// An error occurred but scanning continues
    Error { path: PathBuf, message: String },
    /// The configured record limit was reached
    LimitReached { limit: usize },
    /// Scanning completed
    Completed { total_files: usize },
}

/// Progress information during scanning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanProgress {
    /// Number of directories entered so far
    pub directories_scanned: usize,
    /// Number of media files found so far
    pub files_found: usize,
    /// Directory currently being walked
    pub current_path: PathBuf,
}

/// Events during duplicate classification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ClassifyEvent {
    /// Classification started
    Started { total_files: usize, size_buckets: usize },
    /// A file was fingerprinted
    Fingerprinted { completed: usize, total: usize, path: PathBuf },
    /// Classification completed
    Completed {
        duplicates: usize,
        name_collisions: usize,
        fingerprint_groups: usize,
    },
}

/// Events during move planning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PlanEvent {
    /// A move was queued
    Queued { source: PathBuf, destination: PathBuf },
    /// A file was already in place
    Skipped { path: PathBuf },
    /// A record was excluded because of a planning error
    Error { message: String },
    /// Planning completed
    Completed { queued: usize, skipped: usize, errors: usize },
}

/// Events while applying or simulating moves
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ExecuteEvent {
    /// Execution started
    Started { total_moves: usize, simulate: bool },
    /// Progress update
    Progress(ExecuteProgress),
    /// A move failed, execution continues
    Failed { source: PathBuf, message: String },
    /// A directory emptied by a merge was handled
    DirectoryRemoved { path: PathBuf },
    /// Execution completed
    Completed { successful: usize, failed: usize, skipped: usize },
}

/// Progress information while applying moves
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecuteProgress {
    /// Moves handled so far
    pub completed: usize,
    /// Total number of moves
    pub total: usize,
    /// File that was just handled
    pub current_path: PathBuf,
}

/// Pipeline-level events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PipelineEvent {
    /// Pipeline has started
    Started,
    /// Moving to a new phase
    PhaseChanged { phase: PipelinePhase },
    /// A checkpoint was written
    Checkpoint { count: usize, path: PathBuf },
    /// Pipeline completed
    Completed { total_files: usize, duration_ms: u64 },
}

/// Phases of the inventory pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelinePhase {
    Scanning,
    Classifying,
    ResolvingDates,
    Planning,
    Applying,
}

impl std::fmt::Display for PipelinePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelinePhase::Scanning => write!(f, "Scanning"),
            PipelinePhase::Classifying => write!(f, "Classifying"),
            PipelinePhase::ResolvingDates => write!(f, "Resolving dates"),
            PipelinePhase::Planning => write!(f, "Planning"),
            PipelinePhase::Applying => write!(f, "Applying"),
        }
    }
}
