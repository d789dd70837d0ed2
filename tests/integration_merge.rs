//! Integration tests for subfolder merging.
//!
//! These tests verify end-to-end merge behavior including:
//! - Same-date consolidation with preferred locations
//! - Date-window chaining per location
//! - Removal of emptied folders only after their moves succeed

use assert_fs::prelude::*;
use media_organizer::core::merge::{MergeConfig, MergeReason, SubfolderMerger};
use media_organizer::core::organize::MoveExecutor;
use media_organizer::events::null_sender;
use predicates::prelude::*;

fn merger(preferred: &[&str]) -> SubfolderMerger {
    SubfolderMerger::new(MergeConfig {
        preferred_locations: preferred.iter().map(|s| s.to_string()).collect(),
        window_days: 14,
    })
}

#[test]
fn same_date_folders_merge_into_preferred_location() {
    let temp = assert_fs::TempDir::new().unwrap();
    temp.child("2024/2024-05-01_Lyon/a.jpg").write_str("lyon").unwrap();
    temp.child("2024/2024-05-01_Lyon/b.jpg").write_str("lyon b").unwrap();
    temp.child("2024/2024-05-01_Paris/a.jpg").write_str("paris").unwrap();

    let plan = merger(&["Paris"]).plan(temp.path()).unwrap();

    assert_eq!(plan.decisions.len(), 1);
    assert_eq!(plan.decisions[0].reason, MergeReason::SameDate);
    assert_eq!(
        plan.dirs_to_remove,
        vec![temp.path().join("2024/2024-05-01_Lyon")]
    );

    let executor = MoveExecutor::apply();
    let report = executor.execute(&plan.moves);
    let cleanup = executor.remove_emptied_directories(&plan.dirs_to_remove, &report, &null_sender());

    assert_eq!(report.stats.successful, 2);
    assert_eq!(cleanup.removed.len(), 1);
    temp.child("2024/2024-05-01_Lyon").assert(predicate::path::missing());
    temp.child("2024/2024-05-01_Paris/a.jpg").assert("paris");
    temp.child("2024/2024-05-01_Paris/a_1.jpg").assert("lyon");
    temp.child("2024/2024-05-01_Paris/b.jpg").assert("lyon b");
}

#[test]
fn window_merge_chains_within_fourteen_days() {
    let temp = assert_fs::TempDir::new().unwrap();
    temp.child("2024-05-01_Paris/a.jpg").write_str("1").unwrap();
    temp.child("2024-05-10_Paris/b.jpg").write_str("2").unwrap();
    temp.child("2024-06-01_Paris/c.jpg").write_str("3").unwrap();

    let plan = merger(&[]).plan(temp.path()).unwrap();
    assert_eq!(plan.moves.len(), 1);
    assert_eq!(
        plan.moves[0].destination,
        temp.path().join("2024-05-01_Paris/b.jpg")
    );

    let executor = MoveExecutor::apply();
    let report = executor.execute(&plan.moves);
    executor.remove_emptied_directories(&plan.dirs_to_remove, &report, &null_sender());

    temp.child("2024-05-10_Paris").assert(predicate::path::missing());
    temp.child("2024-06-01_Paris/c.jpg").assert(predicate::path::exists());
}

#[test]
fn same_date_target_then_window_anchor() {
    let temp = assert_fs::TempDir::new().unwrap();
    temp.child("2024-05-01_Nice/a.jpg").write_str("anchor").unwrap();
    temp.child("2024-05-08_Lyon/b.jpg").write_str("lyon").unwrap();
    temp.child("2024-05-08_Nice/c.jpg").write_str("nice").unwrap();

    let plan = merger(&["Nice"]).plan(temp.path()).unwrap();

    // Lyon folds into 05-08 Nice, which folds into 05-01 Nice
    let anchor = temp.path().join("2024-05-01_Nice");
    assert_eq!(plan.moves.len(), 2);
    assert!(plan.moves.iter().all(|m| m.destination.parent() == Some(anchor.as_path())));
    assert_eq!(plan.dirs_to_remove.len(), 2);
}

#[test]
fn folder_with_failed_move_is_kept() {
    let temp = assert_fs::TempDir::new().unwrap();
    temp.child("2024-05-01_Lyon/a.jpg").write_str("lyon").unwrap();
    temp.child("2024-05-01_Paris/keep.jpg").write_str("paris").unwrap();

    let plan = merger(&["Paris"]).plan(temp.path()).unwrap();
    // The planned destination gets taken before applying
    temp.child("2024-05-01_Paris/a.jpg").write_str("late").unwrap();

    let executor = MoveExecutor::apply();
    let report = executor.execute(&plan.moves);
    let cleanup = executor.remove_emptied_directories(&plan.dirs_to_remove, &report, &null_sender());

    assert_eq!(report.anomalies, 1);
    assert!(cleanup.removed.is_empty());
    assert_eq!(cleanup.kept.len(), 1);
    temp.child("2024-05-01_Lyon/a.jpg").assert("lyon");
}

#[test]
fn simulation_changes_nothing_and_merged_tree_is_stable() {
    let temp = assert_fs::TempDir::new().unwrap();
    temp.child("2024-05-01_Lyon/a.jpg").write_str("lyon").unwrap();
    temp.child("2024-05-01_Paris/b.jpg").write_str("paris").unwrap();
    temp.child("notes/2023-13-45_Nowhere/x.jpg").write_str("bad date").unwrap();

    let plan = merger(&["Paris"]).plan(temp.path()).unwrap();
    assert_eq!(plan.clusters, 2);

    let simulator = MoveExecutor::simulate();
    let report = simulator.execute(&plan.moves);
    let cleanup = simulator.remove_emptied_directories(&plan.dirs_to_remove, &report, &null_sender());
    assert_eq!(cleanup.removed.len(), 1);
    temp.child("2024-05-01_Lyon/a.jpg").assert(predicate::path::exists());

    let executor = MoveExecutor::apply();
    let report = executor.execute(&plan.moves);
    executor.remove_emptied_directories(&plan.dirs_to_remove, &report, &null_sender());

    let again = merger(&["Paris"]).plan(temp.path()).unwrap();
    assert!(again.moves.is_empty());
    assert!(again.decisions.is_empty());
}
