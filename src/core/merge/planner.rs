//! Two-pass merge planning over an organized tree.
//!
//! Pass one collapses directories that share a date. Pass two collapses
//! directories of one location whose dates sit within a window of each other.
//! Both passes are pure functions over sorted clusters; only discovery and
//! final move allocation touch the filesystem.

use super::parser::{parse_directory_name, DirectoryName};
use crate::core::classifier::DuplicateStatus;
use crate::core::organize::{same_location, DestinationAllocator, PlannedMove, SkippedMove};
use crate::error::ScanError;
use crate::events::{null_sender, Event, EventSender, PlanEvent};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use uuid::Uuid;
use walkdir::WalkDir;

/// Default window for pass two
pub const DEFAULT_WINDOW_DAYS: i64 = 14;

/// A directory whose name parsed as a date with an optional location
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryCluster {
    pub date: NaiveDate,
    pub location: Option<String>,
    pub path: PathBuf,
}

impl DirectoryCluster {
    fn location_key(&self) -> Option<String> {
        self.location.as_ref().map(|l| l.to_lowercase())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeReason {
    SameDate,
    DateWindow,
}

/// One directory folded into another
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeDecision {
    pub source: PathBuf,
    pub target: PathBuf,
    pub reason: MergeReason,
}

/// Merge settings
#[derive(Debug, Clone)]
pub struct MergeConfig {
    /// Locations preferred as same-date targets, in priority order
    pub preferred_locations: Vec<String>,
    /// Largest gap in days between consecutive directories of one location
    pub window_days: i64,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            preferred_locations: Vec::new(),
            window_days: DEFAULT_WINDOW_DAYS,
        }
    }
}

/// Result of merge planning
#[derive(Debug, Default)]
pub struct MergePlan {
    pub id: String,
    pub clusters: usize,
    pub decisions: Vec<MergeDecision>,
    pub moves: Vec<PlannedMove>,
    pub skipped: Vec<SkippedMove>,
    /// Directories to remove once every move out of them has succeeded
    pub dirs_to_remove: Vec<PathBuf>,
    pub errors: Vec<ScanError>,
}

/// Find every date-named directory under `source`, sorted by path.
///
/// A matching directory is not descended into; anything nested inside it is
/// treated as part of its contents.
pub fn discover_clusters(source: &Path) -> Result<Vec<DirectoryCluster>, ScanError> {
    if !source.is_dir() {
        return Err(ScanError::DirectoryNotFound {
            path: source.to_path_buf(),
        });
    }

    let mut clusters = Vec::new();
    let mut walker = WalkDir::new(source)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter();

    while let Some(entry) = walker.next() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("skipping unreadable entry: {}", e);
                continue;
            }
        };
        if !entry.file_type().is_dir() {
            continue;
        }

        let name = entry.file_name().to_string_lossy();
        if let DirectoryName::Parsed { date, location } = parse_directory_name(&name) {
            debug!("cluster {} ({})", entry.path().display(), date);
            clusters.push(DirectoryCluster {
                date,
                location,
                path: entry.path().to_path_buf(),
            });
            walker.skip_current_dir();
        }
    }

    Ok(clusters)
}

/// Pick the target among directories that share a date.
///
/// Preferred locations are tried in order (case-insensitive); then the first
/// directory with any location; then the first directory.
pub fn select_target<'a>(
    candidates: &[&'a DirectoryCluster],
    preferred: &[String],
) -> Option<&'a DirectoryCluster> {
    preferred
        .iter()
        .find_map(|wanted| {
            candidates.iter().copied().find(|c| {
                c.location
                    .as_deref()
                    .is_some_and(|l| l.eq_ignore_ascii_case(wanted.trim()))
            })
        })
        .or_else(|| candidates.iter().copied().find(|c| c.location.is_some()))
        .or_else(|| candidates.first().copied())
}

/// Pass one. Returns the decisions and the clusters that survive, in input order.
pub fn merge_same_date(
    clusters: &[DirectoryCluster],
    preferred: &[String],
) -> (Vec<MergeDecision>, Vec<DirectoryCluster>) {
    let mut dates: Vec<NaiveDate> = Vec::new();
    let mut by_date: HashMap<NaiveDate, Vec<&DirectoryCluster>> = HashMap::new();
    for cluster in clusters {
        let members = by_date.entry(cluster.date).or_default();
        if members.is_empty() {
            dates.push(cluster.date);
        }
        members.push(cluster);
    }

    let mut decisions = Vec::new();
    let mut losers: Vec<&Path> = Vec::new();

    for date in dates {
        let members = &by_date[&date];
        if members.len() < 2 {
            continue;
        }
        let Some(target) = select_target(members, preferred) else {
            continue;
        };
        for member in members.iter().filter(|m| m.path != target.path) {
            decisions.push(MergeDecision {
                source: member.path.clone(),
                target: target.path.clone(),
                reason: MergeReason::SameDate,
            });
            losers.push(&member.path);
        }
    }

    let survivors = clusters
        .iter()
        .filter(|c| !losers.contains(&c.path.as_path()))
        .cloned()
        .collect();

    (decisions, survivors)
}

/// Pass two. Directories without a location are left alone.
///
/// Each location's directories are walked in date order. A directory whose
/// gap to its predecessor is at most `window_days` joins the current anchor;
/// a larger gap makes it the new anchor.
pub fn merge_date_window(clusters: &[DirectoryCluster], window_days: i64) -> Vec<MergeDecision> {
    let mut locations: Vec<String> = Vec::new();
    let mut by_location: HashMap<String, Vec<&DirectoryCluster>> = HashMap::new();
    for cluster in clusters {
        let Some(key) = cluster.location_key() else {
            continue;
        };
        let members = by_location.entry(key.clone()).or_default();
        if members.is_empty() {
            locations.push(key);
        }
        members.push(cluster);
    }

    let mut decisions = Vec::new();
    for location in locations {
        let mut members = by_location.remove(&location).unwrap_or_default();
        members.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.path.cmp(&b.path)));

        let Some((first, rest)) = members.split_first() else {
            continue;
        };
        let mut anchor = *first;
        let mut previous = *first;

        for &cluster in rest {
            let gap = (cluster.date - previous.date).num_days();
            if gap <= window_days {
                decisions.push(MergeDecision {
                    source: cluster.path.clone(),
                    target: anchor.path.clone(),
                    reason: MergeReason::DateWindow,
                });
            } else {
                anchor = cluster;
            }
            previous = cluster;
        }
    }

    decisions
}

/// Follow decisions until reaching a directory that is not itself merged away
pub fn final_target(decisions: &[MergeDecision], start: &Path) -> PathBuf {
    let mut current = start.to_path_buf();
    // Each hop moves to a distinct directory, so this ends within len hops.
    for _ in 0..=decisions.len() {
        match decisions.iter().find(|d| d.source == current) {
            Some(decision) => current = decision.target.clone(),
            None => break,
        }
    }
    current
}

/// Plans subfolder consolidation for an organized tree
pub struct SubfolderMerger {
    config: MergeConfig,
}

impl SubfolderMerger {
    pub fn new(config: MergeConfig) -> Self {
        Self { config }
    }

    pub fn plan(&self, source: &Path) -> Result<MergePlan, ScanError> {
        self.plan_with_events(source, &null_sender())
    }

    pub fn plan_with_events(
        &self,
        source: &Path,
        events: &EventSender,
    ) -> Result<MergePlan, ScanError> {
        let clusters = discover_clusters(source)?;
        Ok(self.plan_clusters(&clusters, events))
    }

    /// Plan moves for already-discovered clusters
    pub fn plan_clusters(&self, clusters: &[DirectoryCluster], events: &EventSender) -> MergePlan {
        let (mut decisions, survivors) =
            merge_same_date(clusters, &self.config.preferred_locations);
        decisions.extend(merge_date_window(&survivors, self.config.window_days));

        let mut plan = MergePlan {
            id: Uuid::new_v4().to_string(),
            clusters: clusters.len(),
            ..Default::default()
        };
        let mut allocator = DestinationAllocator::new();

        for decision in &decisions {
            let target = final_target(&decisions, &decision.target);
            debug!(
                "merge {} -> {} ({:?})",
                decision.source.display(),
                target.display(),
                decision.reason
            );

            for file in self.files_in(&decision.source, &mut plan.errors) {
                let Some(name) = file.file_name().and_then(|n| n.to_str()) else {
                    continue;
                };

                if same_location(&target.join(name), &file) {
                    events.send(Event::Plan(PlanEvent::Skipped { path: file.clone() }));
                    plan.skipped.push(SkippedMove {
                        reason: format!("already in {}", target.display()),
                        path: file,
                    });
                    continue;
                }

                let destination = allocator.allocate(&target, name);
                events.send(Event::Plan(PlanEvent::Queued {
                    source: file.clone(),
                    destination: destination.clone(),
                }));
                plan.moves.push(PlannedMove {
                    source: file,
                    destination,
                    status: DuplicateStatus::Ok,
                });
            }

            plan.dirs_to_remove.push(decision.source.clone());
        }

        plan.decisions = decisions;

        info!(
            "merge plan {}: {} clusters, {} merges, {} moves",
            plan.id,
            plan.clusters,
            plan.decisions.len(),
            plan.moves.len()
        );
        events.send(Event::Plan(PlanEvent::Completed {
            queued: plan.moves.len(),
            skipped: plan.skipped.len(),
            errors: plan.errors.len(),
        }));

        plan
    }

    /// Every file under a directory, sorted by path
    fn files_in(&self, dir: &Path, errors: &mut Vec<ScanError>) -> Vec<PathBuf> {
        let mut files = Vec::new();
        for entry in WalkDir::new(dir).sort_by_file_name() {
            match entry {
                Ok(entry) if entry.file_type().is_file() => files.push(entry.into_path()),
                Ok(_) => {}
                Err(e) => {
                    let path = e.path().unwrap_or(dir).to_path_buf();
                    warn!("cannot read {}: {}", path.display(), e);
                    errors.push(ScanError::ReadDirectory {
                        path,
                        source: std::io::Error::other(e.to_string()),
                    });
                }
            }
        }
        files
    }
}

impl Default for SubfolderMerger {
    fn default() -> Self {
        Self::new(MergeConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn cluster(date: &str, location: Option<&str>) -> DirectoryCluster {
        let name = match location {
            Some(l) => format!("{}_{}", date, l),
            None => date.to_string(),
        };
        DirectoryCluster {
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            location: location.map(str::to_string),
            path: PathBuf::from("/tree").join(name),
        }
    }

    #[test]
    fn preferred_location_wins_same_date() {
        let clusters = vec![
            cluster("2024-05-01", Some("Lyon")),
            cluster("2024-05-01", Some("Paris")),
        ];
        let (decisions, survivors) = merge_same_date(&clusters, &["Paris".to_string()]);

        assert_eq!(
            decisions,
            vec![MergeDecision {
                source: PathBuf::from("/tree/2024-05-01_Lyon"),
                target: PathBuf::from("/tree/2024-05-01_Paris"),
                reason: MergeReason::SameDate,
            }]
        );
        assert_eq!(survivors, vec![clusters[1].clone()]);
    }

    #[test]
    fn located_directory_beats_bare_date() {
        let clusters = vec![cluster("2024-05-01", None), cluster("2024-05-01", Some("Nice"))];
        let (decisions, _) = merge_same_date(&clusters, &[]);
        assert_eq!(decisions[0].source, PathBuf::from("/tree/2024-05-01"));
        assert_eq!(decisions[0].target, PathBuf::from("/tree/2024-05-01_Nice"));
    }

    #[test]
    fn first_directory_without_any_location() {
        let a = cluster("2024-05-01", None);
        let mut b = a.clone();
        b.path = PathBuf::from("/other/2024-05-01");
        let (decisions, _) = merge_same_date(&[a.clone(), b.clone()], &[]);
        assert_eq!(decisions[0].target, a.path);
        assert_eq!(decisions[0].source, b.path);
    }

    #[test]
    fn window_merge_chains_and_breaks_on_large_gap() {
        let clusters = vec![
            cluster("2024-05-01", Some("Paris")),
            cluster("2024-05-10", Some("Paris")),
            cluster("2024-06-01", Some("Paris")),
        ];
        let decisions = merge_date_window(&clusters, 14);

        assert_eq!(
            decisions,
            vec![MergeDecision {
                source: PathBuf::from("/tree/2024-05-10_Paris"),
                target: PathBuf::from("/tree/2024-05-01_Paris"),
                reason: MergeReason::DateWindow,
            }]
        );
    }

    #[test]
    fn anchor_carries_forward() {
        let clusters = vec![
            cluster("2024-05-01", Some("Paris")),
            cluster("2024-05-12", Some("Paris")),
            cluster("2024-05-24", Some("Paris")),
        ];
        let decisions = merge_date_window(&clusters, 14);
        assert_eq!(decisions.len(), 2);
        assert!(decisions
            .iter()
            .all(|d| d.target == PathBuf::from("/tree/2024-05-01_Paris")));
    }

    #[test]
    fn window_ignores_other_locations_and_bare_dates() {
        let clusters = vec![
            cluster("2024-05-01", Some("Paris")),
            cluster("2024-05-02", Some("Lyon")),
            cluster("2024-05-03", None),
            cluster("2024-05-04", None),
        ];
        assert!(merge_date_window(&clusters, 14).is_empty());
    }

    #[test]
    fn final_target_follows_chain() {
        let decisions = vec![
            MergeDecision {
                source: PathBuf::from("/a"),
                target: PathBuf::from("/b"),
                reason: MergeReason::SameDate,
            },
            MergeDecision {
                source: PathBuf::from("/b"),
                target: PathBuf::from("/c"),
                reason: MergeReason::DateWindow,
            },
        ];
        assert_eq!(final_target(&decisions, Path::new("/b")), PathBuf::from("/c"));
        assert_eq!(final_target(&decisions, Path::new("/c")), PathBuf::from("/c"));
    }

    #[test]
    fn plan_moves_files_and_queues_removal() {
        let temp = TempDir::new().unwrap();
        let paris = temp.path().join("2024/2024-05-01_Paris");
        let lyon = temp.path().join("2024/2024-05-01_Lyon");
        fs::create_dir_all(&paris).unwrap();
        fs::create_dir_all(lyon.join("raw")).unwrap();
        fs::write(paris.join("a.jpg"), b"paris").unwrap();
        fs::write(lyon.join("a.jpg"), b"lyon").unwrap();
        fs::write(lyon.join("raw/b.jpg"), b"raw").unwrap();
        fs::create_dir_all(temp.path().join("misc")).unwrap();

        let merger = SubfolderMerger::new(MergeConfig {
            preferred_locations: vec!["paris".to_string()],
            window_days: 14,
        });
        let plan = merger.plan(temp.path()).unwrap();

        assert_eq!(plan.clusters, 2);
        assert_eq!(plan.dirs_to_remove, vec![lyon.clone()]);
        let destinations: Vec<_> = plan.moves.iter().map(|m| m.destination.clone()).collect();
        assert_eq!(destinations, vec![paris.join("a_1.jpg"), paris.join("b.jpg")]);
    }

    #[test]
    fn nested_date_directories_are_contents() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("2024-05-01_Paris/2024-05-02_Lyon")).unwrap();
        let clusters = discover_clusters(temp.path()).unwrap();
        assert_eq!(clusters.len(), 1);
    }

    #[test]
    fn missing_source_is_an_error() {
        let result = discover_clusters(Path::new("/nonexistent/tree"));
        assert!(matches!(result, Err(ScanError::DirectoryNotFound { .. })));
    }
}
