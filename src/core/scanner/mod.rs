//! # Scanner Module
//!
//! Walks root directories and emits a flat, ordered list of media files.
//!
//! Traversal is sequential and sorted by file name, so two scans of the same
//! tree always yield records in the same order. The duplicate classifier
//! relies on this to decide which same-named file counts as "first seen".
//!
//! ## Example
//! ```rust,ignore
//! use media_organizer::core::scanner::{FileScanner, ScanConfig, WalkDirScanner};
//!
//! let scanner = WalkDirScanner::new(ScanConfig::default());
//! let result = scanner.scan(&["/photos/src".into()])?;
//! ```

mod checkpoint;
mod filter;
mod walker;

pub use checkpoint::{checkpoint_timestamp, Checkpoint, CheckpointStatus};
pub use filter::MediaFilter;
pub use walker::{ScanConfig, WalkDirScanner};

use crate::error::ScanError;
use crate::events::EventSender;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A file discovered by the scanner. Identity is the path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileRecord {
    /// Path to the file
    pub path: PathBuf,
    /// File name including extension
    pub name: String,
    /// File size in bytes
    pub size: u64,
    /// Directory containing the file
    pub directory: PathBuf,
}

impl FileRecord {
    /// Build a record from a path and a known size
    pub fn new(path: impl Into<PathBuf>, size: u64) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let directory = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Self {
            path,
            name,
            size,
            directory,
        }
    }
}

/// Kind of media, decided by extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaKind {
    Photo,
    Video,
    Unknown,
}

impl MediaKind {
    /// Detect the kind from a file extension
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "jpg" | "jpeg" | "png" | "gif" | "bmp" | "tiff" | "tif" | "webp" | "heic" | "heif" => {
                MediaKind::Photo
            }
            "mp4" | "avi" | "mov" | "wmv" | "flv" | "mkv" | "webm" | "m4v" => MediaKind::Video,
            _ => MediaKind::Unknown,
        }
    }

    /// Detect the kind from a path
    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .and_then(|e| e.to_str())
            .map(Self::from_extension)
            .unwrap_or(MediaKind::Unknown)
    }
}

/// Result of a scan operation
#[derive(Debug, Default)]
pub struct ScanResult {
    /// Files in scan order
    pub files: Vec<FileRecord>,
    /// Errors that occurred during scanning (non-fatal)
    pub errors: Vec<ScanError>,
    /// Files skipped because a checkpoint already lists them
    pub already_processed: usize,
}

/// Trait for file scanners
///
/// Implement this trait to feed the classifier from another source (e.g. in tests).
pub trait FileScanner: Send + Sync {
    /// Scan directories and return discovered files
    fn scan(&self, paths: &[PathBuf]) -> Result<ScanResult, ScanError>;

    /// Scan with progress reporting via events
    fn scan_with_events(
        &self,
        paths: &[PathBuf],
        events: &EventSender,
    ) -> Result<ScanResult, ScanError>;
}
