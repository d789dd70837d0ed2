//! Inventory pipeline: scan, classify, resolve attributes, checkpoint.

use super::table::InventoryRecord;
use crate::core::classifier::{
    ClassifiedFile, ClassifierConfig, DuplicateClassifier, DuplicateGroup, NameRegistry,
};
use crate::core::metadata::{AttributeProvider, FileAttributes, LocalMetadata};
use crate::core::scanner::{
    checkpoint_timestamp, Checkpoint, CheckpointStatus, FileScanner, ScanConfig, WalkDirScanner,
};
use crate::error::{OrganizerError, ScanError};
use crate::events::{null_sender, Event, EventSender, PipelineEvent, PipelinePhase};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

pub const DEFAULT_CHECKPOINT_EVERY: usize = 1000;

/// Name of the status file written next to the checkpoint
pub const CHECKPOINT_STATUS_FILE: &str = "checkpoint_status.txt";

/// Result of an inventory run
#[derive(Debug, Default)]
pub struct InventoryResult {
    /// Rows in scan order; resumed rows come first
    pub records: Vec<InventoryRecord>,
    /// Fingerprint groups among the newly scanned files
    pub groups: Vec<DuplicateGroup>,
    pub errors: Vec<ScanError>,
    /// Files skipped because the checkpoint already had them
    pub already_processed: usize,
    pub checkpoints_written: usize,
    pub duration_ms: u64,
}

/// Configuration for the inventory pipeline
#[derive(Debug, Clone)]
pub struct InventoryConfig {
    pub paths: Vec<PathBuf>,
    pub scan_config: ScanConfig,
    pub classifier: ClassifierConfig,
    /// Files per attribute batch; the checkpoint is saved after each batch
    pub checkpoint_every: usize,
    pub checkpoint_path: Option<PathBuf>,
    /// Recorded in the checkpoint status file
    pub artifact: String,
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            paths: Vec::new(),
            scan_config: ScanConfig::default(),
            classifier: ClassifierConfig::default(),
            checkpoint_every: DEFAULT_CHECKPOINT_EVERY,
            checkpoint_path: None,
            artifact: String::new(),
        }
    }
}

/// Builder for [`InventoryPipeline`]
pub struct InventoryBuilder {
    config: InventoryConfig,
    provider: Option<Box<dyn AttributeProvider>>,
    existing: Vec<InventoryRecord>,
}

impl InventoryBuilder {
    pub fn new() -> Self {
        Self {
            config: InventoryConfig::default(),
            provider: None,
            existing: Vec::new(),
        }
    }

    /// Directories to scan
    pub fn paths(mut self, paths: Vec<PathBuf>) -> Self {
        self.config.paths = paths;
        self
    }

    pub fn scan_config(mut self, config: ScanConfig) -> Self {
        self.config.scan_config = config;
        self
    }

    /// Stop after this many files
    pub fn limit(mut self, limit: Option<usize>) -> Self {
        self.config.scan_config.limit = limit;
        self
    }

    pub fn chunk_size(mut self, chunk_size: usize) -> Self {
        self.config.classifier.chunk_size = chunk_size;
        self
    }

    pub fn workers(mut self, workers: Option<usize>) -> Self {
        self.config.classifier.workers = workers;
        self
    }

    pub fn checkpoint_every(mut self, every: usize) -> Self {
        self.config.checkpoint_every = every.max(1);
        self
    }

    /// Resume from, and save progress to, this checkpoint file
    pub fn checkpoint(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.checkpoint_path = Some(path.into());
        self
    }

    pub fn artifact(mut self, artifact: impl Into<String>) -> Self {
        self.config.artifact = artifact.into();
        self
    }

    /// Rows from an earlier run that the checkpoint accounts for
    pub fn existing(mut self, records: Vec<InventoryRecord>) -> Self {
        self.existing = records;
        self
    }

    /// Use another source for dates and locations
    pub fn provider(mut self, provider: Box<dyn AttributeProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn build(self) -> InventoryPipeline {
        InventoryPipeline {
            config: self.config,
            provider: self.provider.unwrap_or_else(|| Box::new(LocalMetadata)),
            existing: self.existing,
        }
    }
}

impl Default for InventoryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds the inventory table for a set of directories
pub struct InventoryPipeline {
    config: InventoryConfig,
    provider: Box<dyn AttributeProvider>,
    existing: Vec<InventoryRecord>,
}

impl InventoryPipeline {
    pub fn builder() -> InventoryBuilder {
        InventoryBuilder::new()
    }

    pub fn config(&self) -> &InventoryConfig {
        &self.config
    }

    pub fn run(&self) -> Result<InventoryResult, OrganizerError> {
        self.run_with_events(&null_sender())
    }

    pub fn run_with_events(&self, events: &EventSender) -> Result<InventoryResult, OrganizerError> {
        let start = Instant::now();
        events.send(Event::Pipeline(PipelineEvent::Started));

        let mut checkpoint = match &self.config.checkpoint_path {
            Some(path) => Checkpoint::load(path)?,
            None => Checkpoint::default(),
        };
        if !checkpoint.is_empty() {
            info!("resuming: {} files already processed", checkpoint.len());
        }

        // Phase 1: sequential scan
        events.send(Event::Pipeline(PipelineEvent::PhaseChanged {
            phase: PipelinePhase::Scanning,
        }));
        let scanner = WalkDirScanner::new(self.config.scan_config.clone()).with_checkpoint(&checkpoint);
        let scan = scanner.scan_with_events(&self.config.paths, events)?;

        // Phase 2: classification is complete before anything downstream runs
        events.send(Event::Pipeline(PipelineEvent::PhaseChanged {
            phase: PipelinePhase::Classifying,
        }));
        let classifier = DuplicateClassifier::new(self.config.classifier.clone());
        let classification = classifier.classify_with_events(scan.files, events);

        let mut result = InventoryResult {
            groups: classification.groups,
            already_processed: scan.already_processed,
            ..Default::default()
        };
        result.errors.extend(scan.errors);
        result.errors.extend(classification.errors);

        // Phase 3: attributes in checkpointed batches
        events.send(Event::Pipeline(PipelineEvent::PhaseChanged {
            phase: PipelinePhase::ResolvingDates,
        }));
        let pool = self.build_pool();
        let mut fresh = Vec::with_capacity(classification.files.len());

        for batch in classification.files.chunks(self.config.checkpoint_every) {
            let attributes: Vec<FileAttributes> = match &pool {
                Some(pool) => pool.install(|| self.resolve_batch(batch)),
                None => self.resolve_batch(batch),
            };

            for (file, attrs) in batch.iter().zip(attributes) {
                checkpoint.mark(file.record.path.clone());
                fresh.push(to_record(file, attrs));
            }

            if let Some(path) = &self.config.checkpoint_path {
                self.save_checkpoint(&checkpoint, path, self.existing.len() + fresh.len())?;
                result.checkpoints_written += 1;
                events.send(Event::Pipeline(PipelineEvent::Checkpoint {
                    count: checkpoint.len(),
                    path: path.clone(),
                }));
            }
            debug!("resolved {} of {} files", fresh.len(), classification.files.len());
        }

        result.records = self.combine(fresh);
        result.duration_ms = start.elapsed().as_millis() as u64;

        info!(
            "inventory of {} files ({} new) in {}ms",
            result.records.len(),
            result.records.len() - self.existing.len(),
            result.duration_ms
        );
        events.send(Event::Pipeline(PipelineEvent::Completed {
            total_files: result.records.len(),
            duration_ms: result.duration_ms,
        }));

        Ok(result)
    }

    fn resolve_batch(&self, batch: &[ClassifiedFile]) -> Vec<FileAttributes> {
        batch
            .par_iter()
            .map(|file| self.provider.attributes(&file.record))
            .collect()
    }

    fn build_pool(&self) -> Option<rayon::ThreadPool> {
        let workers = self.config.classifier.workers?;
        rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .build()
            .map_err(|e| warn!("using the global pool: {}", e))
            .ok()
    }

    fn save_checkpoint(
        &self,
        checkpoint: &Checkpoint,
        path: &Path,
        total_media: usize,
    ) -> Result<(), OrganizerError> {
        let status = CheckpointStatus {
            last_checkpoint: checkpoint.len(),
            timestamp: checkpoint_timestamp(),
            artifact: self.config.artifact.clone(),
            total_processed: checkpoint.len(),
            total_media,
        };
        checkpoint.save(path, &status_path(path), &status)?;
        Ok(())
    }

    /// Append new rows to resumed ones. Statuses are recomputed across both
    /// so the first-seen rule spans runs.
    fn combine(&self, fresh: Vec<InventoryRecord>) -> Vec<InventoryRecord> {
        if self.existing.is_empty() {
            return fresh;
        }

        let mut registry = NameRegistry::new();
        self.existing
            .iter()
            .cloned()
            .chain(fresh)
            .map(|mut record| {
                if let Some(size) = record.size {
                    record.status = Some(registry.observe(&record.file_name(), size));
                }
                record
            })
            .collect()
    }
}

/// Status file path for a checkpoint file
pub fn status_path(checkpoint: &Path) -> PathBuf {
    checkpoint.with_file_name(CHECKPOINT_STATUS_FILE)
}

fn to_record(file: &ClassifiedFile, attrs: FileAttributes) -> InventoryRecord {
    InventoryRecord {
        path: file.record.path.clone(),
        size: Some(file.record.size),
        date: attrs.date.map(|d| d.date),
        status: Some(file.status),
        country: attrs.country,
        city: attrs.city,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::classifier::DuplicateStatus;
    use crate::core::metadata::{DateSource, ResolvedDate};
    use crate::core::scanner::FileRecord;
    use chrono::NaiveDate;
    use std::fs;
    use tempfile::TempDir;

    struct FixedAttributes;

    impl AttributeProvider for FixedAttributes {
        fn attributes(&self, _record: &FileRecord) -> FileAttributes {
            FileAttributes {
                date: Some(ResolvedDate {
                    date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
                    source: DateSource::Exif,
                }),
                country: Some("Italy".to_string()),
                city: Some("Rome".to_string()),
            }
        }
    }

    fn write(dir: &Path, rel: &str, size: usize) {
        let path = dir.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, vec![b'x'; size]).unwrap();
    }

    #[test]
    fn statuses_follow_scan_order() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "1/a.jpg", 100);
        write(temp.path(), "2/a.jpg", 100);
        write(temp.path(), "3/a.jpg", 200);

        let result = InventoryPipeline::builder()
            .paths(vec![temp.path().to_path_buf()])
            .provider(Box::new(FixedAttributes))
            .build()
            .run()
            .unwrap();

        let statuses: Vec<_> = result.records.iter().map(|r| r.status).collect();
        assert_eq!(
            statuses,
            vec![
                Some(DuplicateStatus::Ok),
                Some(DuplicateStatus::Duplicate),
                Some(DuplicateStatus::Error)
            ]
        );
        assert_eq!(result.records[0].city.as_deref(), Some("Rome"));
        assert_eq!(result.groups.len(), 1);
    }

    #[test]
    fn checkpoint_is_saved_per_batch_and_resumed() {
        let temp = TempDir::new().unwrap();
        let media = temp.path().join("media");
        for i in 0..5 {
            write(&media, &format!("{}.jpg", i), 10 + i);
        }
        let checkpoint = temp.path().join("processed_files.txt");

        let first = InventoryPipeline::builder()
            .paths(vec![media.clone()])
            .checkpoint(&checkpoint)
            .checkpoint_every(2)
            .limit(Some(3))
            .artifact("inventory.csv")
            .build()
            .run()
            .unwrap();

        assert_eq!(first.records.len(), 3);
        assert_eq!(first.checkpoints_written, 2);
        let status = CheckpointStatus::load(&status_path(&checkpoint)).unwrap();
        assert_eq!(status.last_checkpoint, 3);
        assert_eq!(status.artifact, "inventory.csv");

        let second = InventoryPipeline::builder()
            .paths(vec![media])
            .checkpoint(&checkpoint)
            .existing(first.records)
            .build()
            .run()
            .unwrap();

        assert_eq!(second.already_processed, 3);
        assert_eq!(second.records.len(), 5);
        assert_eq!(Checkpoint::load(&checkpoint).unwrap().len(), 5);
    }

    #[test]
    fn missing_root_is_collected_not_fatal() {
        let result = InventoryPipeline::builder()
            .paths(vec![PathBuf::from("/nonexistent/media")])
            .build()
            .run()
            .unwrap();

        assert!(result.records.is_empty());
        assert_eq!(result.errors.len(), 1);
    }
}
