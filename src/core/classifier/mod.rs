//! # Classifier Module
//!
//! Assigns every scanned file a [`DuplicateStatus`] and groups files whose
//! content fingerprints match.
//!
//! Two independent signals are produced:
//! - **Status** from the name/size registry, fed in scan order. This is what
//!   move planning acts on.
//! - **Fingerprint groups**, computed only inside size buckets with two or more
//!   members. These are diagnostic; deciding which copy to keep is left to the
//!   caller.
//!
//! The two are deliberately not reconciled: a file can be `ok` by name while
//! sharing a fingerprint with a differently-named file.

mod fingerprint;
mod registry;

pub use fingerprint::{fingerprint_file, fingerprint_reader, Fingerprint, DEFAULT_CHUNK_SIZE};
pub use registry::{DuplicateStatus, NameRegistry};

use crate::core::scanner::FileRecord;
use crate::error::ScanError;
use crate::events::{ClassifyEvent, Event, EventSender};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, info, warn};

/// Classifier settings
#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    /// Bytes fingerprinted at each end of a file
    pub chunk_size: usize,
    /// Worker threads for fingerprinting (None = rayon default)
    pub workers: Option<usize>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            workers: None,
        }
    }
}

/// A scanned file with its status
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedFile {
    pub record: FileRecord,
    pub status: DuplicateStatus,
}

/// Files believed identical: same size and same fingerprint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuplicateGroup {
    pub fingerprint: Fingerprint,
    pub size: u64,
    /// Members in scan order
    pub files: Vec<PathBuf>,
}

impl DuplicateGroup {
    /// Bytes that would be freed by keeping a single copy
    pub fn redundant_bytes(&self) -> u64 {
        self.size * (self.files.len().saturating_sub(1)) as u64
    }
}

/// Output of a classification run
#[derive(Debug, Default)]
pub struct Classification {
    /// Input records, same order, annotated
    pub files: Vec<ClassifiedFile>,
    /// Fingerprint groups with at least two members
    pub groups: Vec<DuplicateGroup>,
    /// Files that could not be read for fingerprinting
    pub errors: Vec<ScanError>,
}

impl Classification {
    pub fn count(&self, status: DuplicateStatus) -> usize {
        self.files.iter().filter(|f| f.status == status).count()
    }
}

/// Assign statuses in order, without touching file content
pub fn assign_statuses(records: Vec<FileRecord>) -> Vec<ClassifiedFile> {
    let mut registry = NameRegistry::new();
    records
        .into_iter()
        .map(|record| {
            let status = registry.observe(&record.name, record.size);
            ClassifiedFile { record, status }
        })
        .collect()
}

/// Partition records into size buckets, keeping only those with two or more files.
///
/// Buckets hold indexes into `records`, in scan order.
pub fn size_buckets(records: &[FileRecord]) -> BTreeMap<u64, Vec<usize>> {
    let mut buckets: BTreeMap<u64, Vec<usize>> = BTreeMap::new();
    for (index, record) in records.iter().enumerate() {
        buckets.entry(record.size).or_default().push(index);
    }
    buckets.retain(|_, members| members.len() >= 2);
    buckets
}

/// Duplicate classifier
pub struct DuplicateClassifier {
    config: ClassifierConfig,
}

impl DuplicateClassifier {
    pub fn new(config: ClassifierConfig) -> Self {
        Self { config }
    }

    /// Classify without progress reporting
    pub fn classify(&self, records: Vec<FileRecord>) -> Classification {
        self.classify_with_events(records, &crate::events::null_sender())
    }

    /// Classify records given in scan order
    pub fn classify_with_events(
        &self,
        records: Vec<FileRecord>,
        events: &EventSender,
    ) -> Classification {
        let buckets = size_buckets(&records);
        let to_hash: Vec<usize> = buckets.values().flatten().copied().collect();

        events.send(Event::Classify(ClassifyEvent::Started {
            total_files: records.len(),
            size_buckets: buckets.len(),
        }));
        debug!(
            "{} files, {} size buckets, {} files to fingerprint",
            records.len(),
            buckets.len(),
            to_hash.len()
        );

        let (fingerprints, errors) = self.fingerprint_all(&records, &to_hash, events);
        let groups = Self::group(&records, &buckets, &fingerprints);

        let files = assign_statuses(records);
        let classification = Classification {
            files,
            groups,
            errors,
        };

        let duplicates = classification.count(DuplicateStatus::Duplicate);
        let name_collisions = classification.count(DuplicateStatus::Error);
        info!(
            "classified {} files: {} duplicates, {} name collisions, {} fingerprint groups",
            classification.files.len(),
            duplicates,
            name_collisions,
            classification.groups.len()
        );
        events.send(Event::Classify(ClassifyEvent::Completed {
            duplicates,
            name_collisions,
            fingerprint_groups: classification.groups.len(),
        }));

        classification
    }

    /// Hash the selected records on a bounded pool
    fn fingerprint_all(
        &self,
        records: &[FileRecord],
        indexes: &[usize],
        events: &EventSender,
    ) -> (HashMap<usize, Fingerprint>, Vec<ScanError>) {
        let completed = AtomicUsize::new(0);
        let total = indexes.len();
        let chunk_size = self.config.chunk_size;

        let hash_one = |&index: &usize| {
            let record = &records[index];
            let result = fingerprint_file(&record.path, chunk_size);
            let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
            events.send(Event::Classify(ClassifyEvent::Fingerprinted {
                completed: done,
                total,
                path: record.path.clone(),
            }));
            (index, result)
        };

        let results: Vec<(usize, std::io::Result<Fingerprint>)> = match self.build_pool() {
            Some(pool) => pool.install(|| indexes.par_iter().map(hash_one).collect()),
            None => indexes.par_iter().map(hash_one).collect(),
        };

        let mut fingerprints = HashMap::with_capacity(results.len());
        let mut errors = Vec::new();
        for (index, result) in results {
            match result {
                Ok(fp) => {
                    fingerprints.insert(index, fp);
                }
                Err(source) => {
                    let error = ScanError::ReadFile {
                        path: records[index].path.clone(),
                        source,
                    };
                    warn!("{}", error);
                    errors.push(error);
                }
            }
        }

        (fingerprints, errors)
    }

    fn build_pool(&self) -> Option<rayon::ThreadPool> {
        let workers = self.config.workers?;
        match rayon::ThreadPoolBuilder::new().num_threads(workers).build() {
            Ok(pool) => Some(pool),
            Err(e) => {
                warn!("could not build a {}-thread pool, using the global one: {}", workers, e);
                None
            }
        }
    }

    /// Group by fingerprint inside each size bucket.
    ///
    /// Groups are ordered by the scan position of their first member.
    fn group(
        records: &[FileRecord],
        buckets: &BTreeMap<u64, Vec<usize>>,
        fingerprints: &HashMap<usize, Fingerprint>,
    ) -> Vec<DuplicateGroup> {
        let mut grouped: Vec<(usize, DuplicateGroup)> = Vec::new();

        for (&size, members) in buckets {
            let mut by_fingerprint: BTreeMap<Fingerprint, Vec<usize>> = BTreeMap::new();
            for &index in members {
                if let Some(fp) = fingerprints.get(&index) {
                    by_fingerprint.entry(*fp).or_default().push(index);
                }
            }

            for (fingerprint, indexes) in by_fingerprint {
                if indexes.len() < 2 {
                    continue;
                }
                grouped.push((
                    indexes[0],
                    DuplicateGroup {
                        fingerprint,
                        size,
                        files: indexes.iter().map(|&i| records[i].path.clone()).collect(),
                    },
                ));
            }
        }

        grouped.sort_by_key(|(first, _)| *first);
        grouped.into_iter().map(|(_, group)| group).collect()
    }
}

impl Default for DuplicateClassifier {
    fn default() -> Self {
        Self::new(ClassifierConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn write(dir: &Path, rel: &str, content: &[u8]) -> FileRecord {
        let path = dir.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        FileRecord::new(path, content.len() as u64)
    }

    #[test]
    fn statuses_follow_scan_order() {
        let temp = TempDir::new().unwrap();
        let records = vec![
            write(temp.path(), "1/a.jpg", &[1u8; 100]),
            write(temp.path(), "2/a.jpg", &[1u8; 100]),
            write(temp.path(), "3/a.jpg", &[1u8; 200]),
        ];

        let result = DuplicateClassifier::default().classify(records);
        let statuses: Vec<_> = result.files.iter().map(|f| f.status).collect();

        assert_eq!(
            statuses,
            vec![
                DuplicateStatus::Ok,
                DuplicateStatus::Duplicate,
                DuplicateStatus::Error
            ]
        );
    }

    #[test]
    fn classification_is_reproducible() {
        let temp = TempDir::new().unwrap();
        let records = vec![
            write(temp.path(), "x/a.jpg", &[1u8; 10]),
            write(temp.path(), "y/a.jpg", &[2u8; 20]),
            write(temp.path(), "z/a.jpg", &[3u8; 10]),
            write(temp.path(), "z/b.jpg", &[3u8; 10]),
        ];

        let classifier = DuplicateClassifier::default();
        let first = classifier.classify(records.clone());
        let second = classifier.classify(records);

        assert_eq!(first.files, second.files);
        assert_eq!(first.groups.len(), second.groups.len());
    }

    #[test]
    fn equal_content_groups_regardless_of_name() {
        let temp = TempDir::new().unwrap();
        let records = vec![
            write(temp.path(), "a.jpg", b"same bytes"),
            write(temp.path(), "b.jpg", b"same bytes"),
            write(temp.path(), "c.jpg", b"diff bytes"),
        ];

        let result = DuplicateClassifier::default().classify(records);

        assert_eq!(result.groups.len(), 1);
        assert_eq!(result.groups[0].files.len(), 2);
        assert_eq!(result.groups[0].redundant_bytes(), 10);
        // Name registry is untouched by the fingerprint signal.
        assert!(result.files.iter().all(|f| f.status == DuplicateStatus::Ok));
    }

    #[test]
    fn different_sizes_never_group() {
        let temp = TempDir::new().unwrap();
        let records = vec![
            write(temp.path(), "a.jpg", b"abc"),
            write(temp.path(), "b.jpg", b"abcd"),
        ];

        let result = DuplicateClassifier::default().classify(records);
        assert!(result.groups.is_empty());
    }

    #[test]
    fn matching_boundaries_group_with_bounded_pool() {
        let temp = TempDir::new().unwrap();
        let mut a = vec![5u8; 20_000];
        let mut b = a.clone();
        a[10_000] = 1;
        b[10_000] = 2;
        let records = vec![
            write(temp.path(), "a.mov", &a),
            write(temp.path(), "b.mov", &b),
        ];

        let classifier = DuplicateClassifier::new(ClassifierConfig {
            chunk_size: 4096,
            workers: Some(2),
        });
        let result = classifier.classify(records);

        assert_eq!(result.groups.len(), 1);
    }

    #[test]
    fn unreadable_file_is_reported_not_fatal() {
        let temp = TempDir::new().unwrap();
        let present = write(temp.path(), "a.jpg", b"12345");
        let missing = FileRecord::new(temp.path().join("gone.jpg"), 5);

        let result = DuplicateClassifier::default().classify(vec![present, missing]);

        assert_eq!(result.files.len(), 2);
        assert_eq!(result.errors.len(), 1);
        assert!(result.groups.is_empty());
    }

    #[test]
    fn singleton_buckets_are_skipped() {
        let records = vec![
            FileRecord::new("/a.jpg", 1),
            FileRecord::new("/b.jpg", 2),
            FileRecord::new("/c.jpg", 2),
        ];
        let buckets = size_buckets(&records);
        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[&2], vec![1, 2]);
    }
}
