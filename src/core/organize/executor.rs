//! Executor for move plans.
//!
//! Moves are grouped by destination directory. Groups may run in parallel;
//! moves inside one group always run in plan order on a single worker.

use super::types::*;
use crate::error::ApplyError;
use crate::events::{null_sender, Event, EventSender, ExecuteEvent, ExecuteProgress};
use rayon::prelude::*;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

enum MoveOutcome {
    Done { created_dir: bool },
    Skipped,
    Failed(ApplyError),
}

/// Applies or simulates planned moves
pub struct MoveExecutor {
    config: ExecutorConfig,
}

impl MoveExecutor {
    pub fn new(config: ExecutorConfig) -> Self {
        Self { config }
    }

    /// Simulate-only executor with default settings
    pub fn simulate() -> Self {
        Self::new(ExecutorConfig::default())
    }

    /// Executor that moves files
    pub fn apply() -> Self {
        Self::new(ExecutorConfig {
            mode: ExecutionMode::Apply,
            ..Default::default()
        })
    }

    pub fn mode(&self) -> ExecutionMode {
        self.config.mode
    }

    pub fn execute(&self, moves: &[PlannedMove]) -> ExecutionReport {
        self.execute_with_events(moves, &null_sender())
    }

    /// Execute all moves. A failed move never stops the others.
    pub fn execute_with_events(&self, moves: &[PlannedMove], events: &EventSender) -> ExecutionReport {
        let start = Instant::now();
        let simulate = self.config.mode == ExecutionMode::Simulate;

        events.send(Event::Execute(ExecuteEvent::Started {
            total_moves: moves.len(),
            simulate,
        }));

        let groups = group_by_destination_dir(moves);
        let completed = AtomicUsize::new(0);
        let total = moves.len();

        let run_group = |indexes: &Vec<usize>| -> Vec<(usize, MoveOutcome)> {
            indexes
                .iter()
                .map(|&index| {
                    let planned = &moves[index];
                    let outcome = self.execute_one(planned);
                    let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
                    events.send(Event::Execute(ExecuteEvent::Progress(ExecuteProgress {
                        completed: done,
                        total,
                        current_path: planned.source.clone(),
                    })));
                    (index, outcome)
                })
                .collect()
        };

        let mut outcomes: Vec<(usize, MoveOutcome)> = match self.build_pool(groups.len()) {
            Some(pool) => pool.install(|| groups.par_iter().flat_map_iter(run_group).collect()),
            None => groups.iter().flat_map(run_group).collect(),
        };
        outcomes.sort_by_key(|(index, _)| *index);

        let mut report = ExecutionReport {
            simulated: simulate,
            ..Default::default()
        };

        for (index, outcome) in outcomes {
            let planned = &moves[index];
            match outcome {
                MoveOutcome::Done { created_dir } => {
                    report.stats.successful += 1;
                    report.completed.push(planned.source.clone());
                    if created_dir {
                        report.folders_created += 1;
                    }
                }
                MoveOutcome::Skipped => report.stats.skipped += 1,
                MoveOutcome::Failed(e) => {
                    report.stats.failed += 1;
                    if e.is_invariant_breach() {
                        report.anomalies += 1;
                        error!("invariant breach: {}", e);
                    } else {
                        warn!("{}", e);
                    }
                    events.send(Event::Execute(ExecuteEvent::Failed {
                        source: planned.source.clone(),
                        message: e.to_string(),
                    }));
                    report.errors.push(e);
                }
            }
        }

        report.duration_ms = start.elapsed().as_millis() as u64;
        info!(
            "{} {} moves: {} ok, {} failed, {} skipped",
            if simulate { "simulated" } else { "applied" },
            total,
            report.stats.successful,
            report.stats.failed,
            report.stats.skipped
        );
        events.send(Event::Execute(ExecuteEvent::Completed {
            successful: report.stats.successful,
            failed: report.stats.failed,
            skipped: report.stats.skipped,
        }));

        report
    }

    fn build_pool(&self, groups: usize) -> Option<rayon::ThreadPool> {
        let workers = self.config.workers?;
        if workers <= 1 || groups <= 1 {
            return None;
        }
        rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .build()
            .map_err(|e| warn!("running moves sequentially: {}", e))
            .ok()
    }

    fn execute_one(&self, planned: &PlannedMove) -> MoveOutcome {
        let source = planned.source.as_path();
        let destination = planned.destination.as_path();

        if source == destination {
            return MoveOutcome::Skipped;
        }

        if !source.is_file() {
            return MoveOutcome::Failed(ApplyError::SourceMissing {
                path: source.to_path_buf(),
            });
        }

        // Planning guarantees a free destination; anything else is a breach.
        if destination.exists() {
            return MoveOutcome::Failed(ApplyError::CollisionInvariantViolation {
                destination: destination.to_path_buf(),
            });
        }

        if self.config.mode == ExecutionMode::Simulate {
            debug!(
                "would {} ({}) {} -> {}",
                self.verb(),
                planned.status,
                source.display(),
                destination.display()
            );
            return MoveOutcome::Done { created_dir: false };
        }

        let mut created_dir = false;
        if let Some(parent) = destination.parent() {
            if !parent.is_dir() {
                if let Err(source) = fs::create_dir_all(parent) {
                    return MoveOutcome::Failed(ApplyError::CreateDirectory {
                        path: parent.to_path_buf(),
                        source,
                    });
                }
                created_dir = true;
            }
        }

        let result = match self.config.operation {
            OperationMode::Copy => copy_file(source, destination),
            OperationMode::Move => move_file(source, destination),
        };

        match result {
            Ok(()) => {
                debug!(
                    "{} ({}) {} -> {}",
                    self.verb(),
                    planned.status,
                    source.display(),
                    destination.display()
                );
                MoveOutcome::Done { created_dir }
            }
            Err(e) => MoveOutcome::Failed(e),
        }
    }

    fn verb(&self) -> &'static str {
        match self.config.operation {
            OperationMode::Move => "move",
            OperationMode::Copy => "copy",
        }
    }

    /// Remove directories emptied by a merge.
    ///
    /// A directory is only touched when no failed move came from inside it.
    /// Empty subdirectories are removed bottom-up; files are never deleted,
    /// so a directory that still holds anything is reported and kept.
    pub fn remove_emptied_directories(
        &self,
        directories: &[PathBuf],
        report: &ExecutionReport,
        events: &EventSender,
    ) -> CleanupReport {
        let completed: HashSet<&Path> = report.completed.iter().map(PathBuf::as_path).collect();
        let mut cleanup = CleanupReport::default();

        for dir in directories {
            let remaining = remaining_files(dir, &completed);
            if remaining > 0 {
                warn!("{} still holds {} files, keeping it", dir.display(), remaining);
                cleanup
                    .kept
                    .push(ApplyError::DirectoryNotEmpty { path: dir.clone() });
                continue;
            }

            if self.config.mode == ExecutionMode::Apply {
                if let Err(e) = remove_empty_tree(dir) {
                    warn!("{}", e);
                    cleanup.kept.push(e);
                    continue;
                }
                debug!("removed {}", dir.display());
            } else {
                debug!("would remove {}", dir.display());
            }

            events.send(Event::Execute(ExecuteEvent::DirectoryRemoved { path: dir.clone() }));
            cleanup.removed.push(dir.clone());
        }

        cleanup
    }
}

/// Group move indexes by destination directory, in first-seen order
fn group_by_destination_dir(moves: &[PlannedMove]) -> Vec<Vec<usize>> {
    let mut slots: HashMap<&Path, usize> = HashMap::new();
    let mut groups: Vec<Vec<usize>> = Vec::new();

    for (index, planned) in moves.iter().enumerate() {
        let dir = planned.destination.parent().unwrap_or(Path::new(""));
        let slot = *slots.entry(dir).or_insert_with(|| {
            groups.push(Vec::new());
            groups.len() - 1
        });
        groups[slot].push(index);
    }

    groups
}

/// Files under `dir` that are not accounted for by a completed move
fn remaining_files(dir: &Path, completed: &HashSet<&Path>) -> usize {
    WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| !e.file_type().is_dir())
        .filter(|e| !completed.contains(e.path()))
        .count()
}

/// Remove a tree made only of directories. Never deletes a file.
fn remove_empty_tree(dir: &Path) -> Result<(), ApplyError> {
    for entry in WalkDir::new(dir).contents_first(true) {
        let entry = entry.map_err(|e| ApplyError::RemoveDirectory {
            path: dir.to_path_buf(),
            source: std::io::Error::other(e.to_string()),
        })?;

        if !entry.file_type().is_dir() {
            return Err(ApplyError::DirectoryNotEmpty {
                path: dir.to_path_buf(),
            });
        }

        fs::remove_dir(entry.path()).map_err(|source| ApplyError::RemoveDirectory {
            path: entry.path().to_path_buf(),
            source,
        })?;
    }
    Ok(())
}

fn copy_file(source: &Path, destination: &Path) -> Result<(), ApplyError> {
    fs::copy(source, destination)
        .map(|_| ())
        .map_err(|e| ApplyError::Move {
            source_path: source.to_path_buf(),
            destination: destination.to_path_buf(),
            source: e,
        })
}

fn move_file(source: &Path, destination: &Path) -> Result<(), ApplyError> {
    if fs::rename(source, destination).is_ok() {
        return Ok(());
    }

    // rename fails across filesystems: copy, verify the size, then delete
    let io_err = |e: std::io::Error| ApplyError::Move {
        source_path: source.to_path_buf(),
        destination: destination.to_path_buf(),
        source: e,
    };

    let expected = fs::metadata(source).map_err(io_err)?.len();
    fs::copy(source, destination).map_err(io_err)?;

    let actual = fs::metadata(destination).map_err(io_err)?.len();
    if actual != expected {
        let _ = fs::remove_file(destination);
        return Err(ApplyError::CopyVerification {
            destination: destination.to_path_buf(),
            expected,
            actual,
        });
    }

    fs::remove_file(source).map_err(io_err)
}
