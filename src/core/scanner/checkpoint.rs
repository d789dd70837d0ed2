//! Resumable scan state: a newline-delimited list of processed paths plus a
//! small status file describing the last checkpoint.

use crate::error::ReportError;
use chrono::Local;
use std::collections::BTreeSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Set of absolute paths already processed by an earlier run
#[derive(Debug, Clone, Default)]
pub struct Checkpoint {
    processed: BTreeSet<PathBuf>,
}

/// Companion record written next to the checkpoint file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckpointStatus {
    pub last_checkpoint: usize,
    pub timestamp: String,
    pub artifact: String,
    pub total_processed: usize,
    pub total_media: usize,
}

impl CheckpointStatus {
    fn render(&self) -> String {
        format!(
            "Last checkpoint: {}\nTimestamp: {}\nArtifact: {}\nTotal files processed: {}\nTotal media files found: {}\n",
            self.last_checkpoint,
            self.timestamp,
            self.artifact,
            self.total_processed,
            self.total_media
        )
    }

    /// Parse the status file. Unknown lines are ignored.
    pub fn parse(text: &str) -> Option<Self> {
        let mut status = CheckpointStatus {
            last_checkpoint: 0,
            timestamp: String::new(),
            artifact: String::new(),
            total_processed: 0,
            total_media: 0,
        };
        let mut seen_count = false;

        for line in text.lines() {
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let value = value.trim();
            match key.trim() {
                "Last checkpoint" => {
                    status.last_checkpoint = value.parse().ok()?;
                    seen_count = true;
                }
                "Timestamp" => status.timestamp = value.to_string(),
                "Artifact" => status.artifact = value.to_string(),
                "Total files processed" => status.total_processed = value.parse().ok()?,
                "Total media files found" => status.total_media = value.parse().ok()?,
                _ => {}
            }
        }

        seen_count.then_some(status)
    }

    /// Read the status file if present
    pub fn load(path: &Path) -> Option<Self> {
        fs::read_to_string(path).ok().and_then(|t| Self::parse(&t))
    }
}

impl Checkpoint {
    /// Load a checkpoint file. A missing file yields an empty checkpoint.
    pub fn load(path: &Path) -> Result<Self, ReportError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let text = fs::read_to_string(path).map_err(|source| ReportError::Checkpoint {
            path: path.to_path_buf(),
            source,
        })?;

        let processed: BTreeSet<PathBuf> = text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(PathBuf::from)
            .collect();

        debug!(
            "loaded {} processed paths from {}",
            processed.len(),
            path.display()
        );
        Ok(Self { processed })
    }

    /// Record a path as processed
    pub fn mark(&mut self, path: impl Into<PathBuf>) {
        self.processed.insert(path.into());
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.processed.contains(path)
    }

    pub fn len(&self) -> usize {
        self.processed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processed.is_empty()
    }

    pub fn paths(&self) -> impl Iterator<Item = &PathBuf> {
        self.processed.iter()
    }

    /// Persist the processed list, then the status file.
    ///
    /// The previous checkpoint is kept as `<file>.bak` until the new one is
    /// fully written, and restored if writing fails.
    pub fn save(
        &self,
        path: &Path,
        status_path: &Path,
        status: &CheckpointStatus,
    ) -> Result<(), ReportError> {
        let backup = backup_path(path);
        let had_previous = path.exists();

        if had_previous {
            fs::rename(path, &backup).map_err(|source| ReportError::Checkpoint {
                path: backup.clone(),
                source,
            })?;
        }

        match self.write_files(path, status_path, status) {
            Ok(()) => {
                if had_previous {
                    if let Err(e) = fs::remove_file(&backup) {
                        warn!("could not remove {}: {}", backup.display(), e);
                    }
                }
                Ok(())
            }
            Err(source) => {
                if had_previous {
                    let _ = fs::rename(&backup, path);
                }
                Err(ReportError::Checkpoint {
                    path: path.to_path_buf(),
                    source,
                })
            }
        }
    }

    fn write_files(&self, path: &Path, status_path: &Path, status: &CheckpointStatus) -> std::io::Result<()> {
        let mut file = fs::File::create(path)?;
        for processed in &self.processed {
            writeln!(file, "{}", processed.display())?;
        }
        file.flush()?;

        fs::write(status_path, status.render())
    }
}

fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".bak");
    PathBuf::from(name)
}

/// Timestamp used in checkpoint artifact names
pub fn checkpoint_timestamp() -> String {
    Local::now().format("%Y%m%d_%H%M%S").to_string()
}
