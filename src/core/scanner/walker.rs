//! Directory walking implementation using walkdir.

use super::{filter::MediaFilter, Checkpoint, FileRecord, FileScanner, ScanResult};
use crate::error::ScanError;
use crate::events::{Event, EventSender, ScanEvent, ScanProgress};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

/// Configuration for the directory scanner
#[derive(Debug, Clone, Default)]
pub struct ScanConfig {
    /// Whether to follow symbolic links
    pub follow_symlinks: bool,
    /// Whether to include hidden files and directories
    pub include_hidden: bool,
    /// Maximum directory depth (None = unlimited)
    pub max_depth: Option<usize>,
    /// Custom extensions to include (None = use defaults)
    pub extensions: Option<Vec<String>>,
    /// Stop after this many records ("test mode")
    pub limit: Option<usize>,
}

/// Scanner implementation using the walkdir crate
pub struct WalkDirScanner {
    config: ScanConfig,
    filter: MediaFilter,
    processed: HashSet<PathBuf>,
}

impl WalkDirScanner {
    /// Create a new scanner with the given configuration
    pub fn new(config: ScanConfig) -> Self {
        let mut filter = MediaFilter::new().with_hidden(config.include_hidden);

        if let Some(ref extensions) = config.extensions {
            filter = filter.with_extensions(extensions.clone());
        }

        Self {
            config,
            filter,
            processed: HashSet::new(),
        }
    }

    /// Skip every path already recorded in the checkpoint
    pub fn with_checkpoint(mut self, checkpoint: &Checkpoint) -> Self {
        self.processed = checkpoint.paths().cloned().collect();
        self
    }

    fn is_hidden_dir(entry: &DirEntry) -> bool {
        entry.depth() > 0
            && entry.file_type().is_dir()
            && entry.file_name().to_str().is_some_and(|n| n.starts_with('.'))
    }

    fn limit_reached(&self, found: usize) -> bool {
        self.config.limit.is_some_and(|limit| found >= limit)
    }

    /// Walk one root, appending to `result`. Returns false once the limit is hit.
    fn scan_directory(
        &self,
        root: &Path,
        result: &mut ScanResult,
        events: &EventSender,
    ) -> Result<bool, ScanError> {
        // Record identity is the absolute path, whatever the working directory
        let root = std::path::absolute(root).map_err(|source| ScanError::ReadDirectory {
            path: root.to_path_buf(),
            source,
        })?;

        if !root.is_dir() {
            return Err(ScanError::DirectoryNotFound { path: root });
        }

        let mut directories_scanned = 0;

        let mut walker = WalkDir::new(&root)
            .follow_links(self.config.follow_symlinks)
            .sort_by_file_name();

        if let Some(depth) = self.config.max_depth {
            walker = walker.max_depth(depth);
        }

        let include_hidden = self.config.include_hidden;
        let entries = walker
            .into_iter()
            .filter_entry(|e| include_hidden || !Self::is_hidden_dir(e));

        for entry_result in entries {
            let entry = match entry_result {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e.path().map(Path::to_path_buf).unwrap_or_default();
                    let error = match e.io_error().map(|io| io.kind()) {
                        Some(std::io::ErrorKind::PermissionDenied) => {
                            ScanError::PermissionDenied { path: path.clone() }
                        }
                        _ => ScanError::ReadDirectory {
                            path: path.clone(),
                            source: std::io::Error::other(e.to_string()),
                        },
                    };
                    warn!("{}", error);
                    events.send(Event::Scan(ScanEvent::Error {
                        path,
                        message: error.to_string(),
                    }));
                    result.errors.push(error);
                    continue;
                }
            };

            let path = entry.path();

            if entry.file_type().is_dir() {
                directories_scanned += 1;
                events.send(Event::Scan(ScanEvent::Progress(ScanProgress {
                    directories_scanned,
                    files_found: result.files.len(),
                    current_path: path.to_path_buf(),
                })));
                continue;
            }

            if !self.filter.should_include(path) {
                continue;
            }

            if self.processed.contains(path) {
                result.already_processed += 1;
                continue;
            }

            if self.limit_reached(result.files.len()) {
                return Ok(false);
            }

            match entry.metadata() {
                Ok(metadata) => {
                    result.files.push(FileRecord::new(path, metadata.len()));
                    if self.limit_reached(result.files.len()) {
                        return Ok(false);
                    }
                }
                Err(e) => {
                    let error = ScanError::ReadFile {
                        path: path.to_path_buf(),
                        source: std::io::Error::other(e.to_string()),
                    };
                    warn!("{}", error);
                    events.send(Event::Scan(ScanEvent::Error {
                        path: path.to_path_buf(),
                        message: error.to_string(),
                    }));
                    result.errors.push(error);
                }
            }
        }

        Ok(true)
    }
}

impl FileScanner for WalkDirScanner {
    fn scan(&self, paths: &[PathBuf]) -> Result<ScanResult, ScanError> {
        self.scan_with_events(paths, &crate::events::null_sender())
    }

    fn scan_with_events(
        &self,
        paths: &[PathBuf],
        events: &EventSender,
    ) -> Result<ScanResult, ScanError> {
        events.send(Event::Scan(ScanEvent::Started {
            paths: paths.to_vec(),
        }));

        let mut result = ScanResult::default();

        for path in paths {
            debug!("scanning {}", path.display());
            match self.scan_directory(path, &mut result, events) {
                Ok(true) => {}
                Ok(false) => {
                    if let Some(limit) = self.config.limit {
                        debug!("scan limit of {} files reached", limit);
                        events.send(Event::Scan(ScanEvent::LimitReached { limit }));
                    }
                    break;
                }
                Err(e) => {
                    warn!("{}", e);
                    result.errors.push(e);
                }
            }
        }

        events.send(Event::Scan(ScanEvent::Completed {
            total_files: result.files.len(),
        }));

        Ok(result)
    }
}
