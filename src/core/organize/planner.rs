//! Plan generator for organization operations.
//!
//! Layout: `root/YYYY/YYYY-MM-DD[_Country][_City]/name.ext`.

use super::destination::{same_location, suffixed_file_name, DestinationAllocator};
use super::types::*;
use crate::core::classifier::DuplicateStatus;
use crate::error::PlanningError;
use crate::events::{null_sender, Event, EventSender, PlanEvent};
use chrono::{Datelike, NaiveDate};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Outcome for a single candidate
#[derive(Debug)]
pub enum PlanDecision {
    Queued(PlannedMove),
    Skipped(SkippedMove),
    /// Redundant copy, not relocated
    Excluded,
    Failed(PlanningError),
}

/// Generates organization plans
pub struct MovePlanner {
    config: PlannerConfig,
}

impl MovePlanner {
    pub fn new(config: PlannerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// Plan every candidate, in order
    pub fn plan(&self, candidates: &[OrganizeCandidate]) -> OrganizePlan {
        self.plan_with_events(candidates, &null_sender())
    }

    pub fn plan_with_events(
        &self,
        candidates: &[OrganizeCandidate],
        events: &EventSender,
    ) -> OrganizePlan {
        let mut allocator = DestinationAllocator::new();
        let mut plan = OrganizePlan {
            id: Uuid::new_v4().to_string(),
            ..Default::default()
        };

        for candidate in candidates {
            plan.status_counts.record(candidate.status);

            match self.decide(candidate, &mut allocator) {
                PlanDecision::Queued(planned) => {
                    debug!(
                        "planned ({}) {} -> {}",
                        planned.status,
                        planned.source.display(),
                        planned.destination.display()
                    );
                    events.send(Event::Plan(PlanEvent::Queued {
                        source: planned.source.clone(),
                        destination: planned.destination.clone(),
                    }));
                    plan.moves.push(planned);
                }
                PlanDecision::Skipped(skipped) => {
                    events.send(Event::Plan(PlanEvent::Skipped {
                        path: skipped.path.clone(),
                    }));
                    plan.skipped.push(skipped);
                }
                PlanDecision::Excluded => plan.excluded_duplicates += 1,
                PlanDecision::Failed(error) => {
                    warn!("{}", error);
                    events.send(Event::Plan(PlanEvent::Error {
                        message: error.to_string(),
                    }));
                    plan.errors.push(error);
                }
            }
        }

        info!(
            "plan {}: {} moves, {} already in place, {} duplicates excluded, {} errors",
            plan.id,
            plan.moves.len(),
            plan.skipped.len(),
            plan.excluded_duplicates,
            plan.errors.len()
        );
        events.send(Event::Plan(PlanEvent::Completed {
            queued: plan.moves.len(),
            skipped: plan.skipped.len(),
            errors: plan.errors.len(),
        }));

        plan
    }

    /// Decide what happens to one candidate, reserving its destination
    pub fn decide(
        &self,
        candidate: &OrganizeCandidate,
        allocator: &mut DestinationAllocator,
    ) -> PlanDecision {
        if candidate.status == DuplicateStatus::Duplicate {
            return PlanDecision::Excluded;
        }

        let source = &candidate.path;
        if !source.is_file() {
            return PlanDecision::Failed(PlanningError::SourceNotFound {
                path: source.clone(),
            });
        }

        let Some(date) = candidate.date else {
            return PlanDecision::Failed(PlanningError::MissingDate {
                path: source.clone(),
            });
        };

        let Some(file_name) = source.file_name().and_then(|n| n.to_str()) else {
            return PlanDecision::Failed(PlanningError::SourceNotFound {
                path: source.clone(),
            });
        };

        let target_dir = self.destination_directory(
            date,
            candidate.country.as_deref(),
            candidate.city.as_deref(),
        );

        let current_dir = source.parent().unwrap_or(Path::new(""));
        if same_location(&target_dir, current_dir) {
            return PlanDecision::Skipped(SkippedMove {
                path: source.clone(),
                reason: format!("already in {}", target_dir.display()),
            });
        }

        let file_name = match candidate.status {
            DuplicateStatus::Error => suffixed_file_name(file_name, "dup"),
            _ => file_name.to_string(),
        };

        PlanDecision::Queued(PlannedMove {
            source: source.clone(),
            destination: allocator.allocate(&target_dir, &file_name),
            status: candidate.status,
        })
    }

    /// `root/YYYY/YYYY-MM-DD[_suffix]`
    pub fn destination_directory(
        &self,
        date: NaiveDate,
        country: Option<&str>,
        city: Option<&str>,
    ) -> PathBuf {
        let mut folder = date.format("%Y-%m-%d").to_string();
        if let Some(suffix) = self.location_suffix(country, city) {
            folder.push('_');
            folder.push_str(&suffix);
        }

        self.config
            .root
            .join(format!("{:04}", date.year()))
            .join(folder)
    }

    /// `City` or `Country_City`; `None` without a city
    pub fn location_suffix(&self, country: Option<&str>, city: Option<&str>) -> Option<String> {
        let city = non_blank(city)?;

        match non_blank(country) {
            Some(country) if !self.is_home(country) => Some(format!("{}_{}", country, city)),
            _ => Some(city.to_string()),
        }
    }

    fn is_home(&self, country: &str) -> bool {
        self.config
            .home_country
            .as_deref()
            .is_some_and(|home| home.trim().to_lowercase() == country.to_lowercase())
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn planner(root: &Path) -> MovePlanner {
        MovePlanner::new(PlannerConfig::new(root).with_home_country("France"))
    }

    #[test]
    fn folder_is_year_then_date() {
        let planner = planner(Path::new("/organized"));
        let dir = planner.destination_directory(date(2024, 5, 1), None, None);
        assert_eq!(dir, PathBuf::from("/organized/2024/2024-05-01"));
    }

    #[test]
    fn home_country_is_left_out() {
        let planner = planner(Path::new("/organized"));
        assert_eq!(
            planner.location_suffix(Some("france"), Some("Lyon")),
            Some("Lyon".to_string())
        );
        assert_eq!(
            planner.location_suffix(Some(" Italy "), Some(" Rome ")),
            Some("Italy_Rome".to_string())
        );
    }

    #[test]
    fn country_without_city_adds_nothing() {
        let planner = planner(Path::new("/organized"));
        assert_eq!(planner.location_suffix(Some("Italy"), None), None);
        assert_eq!(planner.location_suffix(Some("Italy"), Some("  ")), None);
    }

    #[test]
    fn duplicates_are_excluded_and_missing_sources_fail() {
        let temp = TempDir::new().unwrap();
        let planner = planner(&temp.path().join("out"));
        let candidates = vec![
            OrganizeCandidate::new(temp.path().join("dup.jpg"), date(2024, 1, 1), DuplicateStatus::Duplicate),
            OrganizeCandidate::new(temp.path().join("gone.jpg"), date(2024, 1, 1), DuplicateStatus::Ok),
        ];

        let plan = planner.plan(&candidates);

        assert!(plan.moves.is_empty());
        assert_eq!(plan.excluded_duplicates, 1);
        assert!(matches!(plan.errors[0], PlanningError::SourceNotFound { .. }));
        assert_eq!(plan.status_counts.total(), 2);
    }

    #[test]
    fn missing_date_is_a_planning_error() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("a.jpg");
        fs::write(&source, b"x").unwrap();

        let mut candidate = OrganizeCandidate::new(&source, date(2024, 1, 1), DuplicateStatus::Ok);
        candidate.date = None;

        let plan = planner(&temp.path().join("out")).plan(&[candidate]);
        assert!(matches!(plan.errors[0], PlanningError::MissingDate { .. }));
    }

    #[test]
    fn error_status_gets_dup_suffix() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("src/a.jpg");
        fs::create_dir_all(source.parent().unwrap()).unwrap();
        fs::write(&source, b"x").unwrap();

        let plan = planner(&temp.path().join("out"))
            .plan(&[OrganizeCandidate::new(&source, date(2024, 5, 1), DuplicateStatus::Error)]);

        assert_eq!(
            plan.moves[0].destination,
            temp.path().join("out/2024/2024-05-01/a_dup.jpg")
        );
        assert_eq!(plan.renamed_count(), 1);
    }

    #[test]
    fn same_bucket_names_never_collide() {
        let temp = TempDir::new().unwrap();
        let mut candidates = Vec::new();
        for dir in ["x", "y", "z"] {
            let source = temp.path().join(dir).join("a.jpg");
            fs::create_dir_all(source.parent().unwrap()).unwrap();
            fs::write(&source, dir.as_bytes()).unwrap();
            candidates.push(
                OrganizeCandidate::new(source, date(2024, 5, 1), DuplicateStatus::Ok)
                    .with_location(Some("France"), Some("Paris")),
            );
        }

        let plan = planner(&temp.path().join("out")).plan(&candidates);
        let bucket = temp.path().join("out/2024/2024-05-01_Paris");
        let destinations: Vec<_> = plan.moves.iter().map(|m| m.destination.clone()).collect();

        assert_eq!(
            destinations,
            vec![bucket.join("a.jpg"), bucket.join("a_1.jpg"), bucket.join("a_2.jpg")]
        );
    }

    #[test]
    fn file_already_in_place_is_skipped() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("out");
        let source = root.join("2024/2024-05-01/a.jpg");
        fs::create_dir_all(source.parent().unwrap()).unwrap();
        fs::write(&source, b"x").unwrap();

        let plan = planner(&root)
            .plan(&[OrganizeCandidate::new(&source, date(2024, 5, 1), DuplicateStatus::Ok)]);

        assert!(plan.moves.is_empty());
        assert_eq!(plan.skipped.len(), 1);
        assert_eq!(plan.stats().skipped, 1);
    }
}
