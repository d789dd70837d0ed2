//! Collision-free destination allocation and path helpers.

use std::collections::{HashMap, HashSet};
use std::path::{Component, Path, PathBuf};

/// Hands out destination paths that exist neither on disk nor earlier in the
/// same plan.
///
/// A taken `name.ext` becomes `name_1.ext`, `name_2.ext`, ... Counters are
/// tracked per (directory, stem, extension) so repeated names stay O(1).
#[derive(Debug, Default)]
pub struct DestinationAllocator {
    allocated: HashSet<PathBuf>,
    counters: HashMap<(PathBuf, String, String), usize>,
}

impl DestinationAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a path is already used on disk or by this plan
    pub fn is_taken(&self, path: &Path) -> bool {
        self.allocated.contains(path) || path.exists()
    }

    /// Reserve a free path for `file_name` inside `directory`
    pub fn allocate(&mut self, directory: &Path, file_name: &str) -> PathBuf {
        let candidate = directory.join(file_name);
        if !self.is_taken(&candidate) {
            self.allocated.insert(candidate.clone());
            return candidate;
        }

        let (stem, ext) = split_file_name(file_name);
        let key = (directory.to_path_buf(), stem.to_string(), ext.to_string());
        let mut counter = self.counters.get(&key).copied().unwrap_or(1);

        let path = loop {
            let path = directory.join(numbered_name(stem, ext, counter));
            counter += 1;
            if !self.is_taken(&path) {
                break path;
            }
        };

        self.counters.insert(key, counter);
        self.allocated.insert(path.clone());
        path
    }

    pub fn len(&self) -> usize {
        self.allocated.len()
    }

    pub fn is_empty(&self) -> bool {
        self.allocated.is_empty()
    }
}

/// Split into stem and extension (without the dot)
pub fn split_file_name(file_name: &str) -> (&str, &str) {
    let path = Path::new(file_name);
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or(file_name);
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    (stem, ext)
}

fn numbered_name(stem: &str, ext: &str, counter: usize) -> String {
    with_suffix(stem, ext, &counter.to_string())
}

/// `photo.jpg` + `dup` -> `photo_dup.jpg`
pub fn suffixed_file_name(file_name: &str, suffix: &str) -> String {
    let (stem, ext) = split_file_name(file_name);
    with_suffix(stem, ext, suffix)
}

fn with_suffix(stem: &str, ext: &str, suffix: &str) -> String {
    if ext.is_empty() {
        format!("{}_{}", stem, suffix)
    } else {
        format!("{}_{}.{}", stem, suffix, ext)
    }
}

/// Canonical form used to compare locations.
///
/// Existing paths are canonicalized; others are made absolute and cleaned of
/// `.` and `..` lexically.
pub fn normalize_path(path: &Path) -> PathBuf {
    if let Ok(canonical) = path.canonicalize() {
        return canonical;
    }

    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    let mut cleaned = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                cleaned.pop();
            }
            other => cleaned.push(other.as_os_str()),
        }
    }
    cleaned
}

/// Whether two paths name the same location
pub fn same_location(a: &Path, b: &Path) -> bool {
    a == b || normalize_path(a) == normalize_path(b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn free_name_is_used_as_is() {
        let temp = TempDir::new().unwrap();
        let mut allocator = DestinationAllocator::new();
        assert_eq!(allocator.allocate(temp.path(), "a.jpg"), temp.path().join("a.jpg"));
    }

    #[test]
    fn repeated_names_get_numbered() {
        let temp = TempDir::new().unwrap();
        let mut allocator = DestinationAllocator::new();
        let paths: Vec<_> = (0..3).map(|_| allocator.allocate(temp.path(), "a.jpg")).collect();
        assert_eq!(
            paths,
            vec![
                temp.path().join("a.jpg"),
                temp.path().join("a_1.jpg"),
                temp.path().join("a_2.jpg"),
            ]
        );
    }

    #[test]
    fn files_on_disk_are_respected() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("a.jpg"), b"x").unwrap();
        std::fs::write(temp.path().join("a_1.jpg"), b"x").unwrap();

        let mut allocator = DestinationAllocator::new();
        assert_eq!(allocator.allocate(temp.path(), "a.jpg"), temp.path().join("a_2.jpg"));
    }

    #[test]
    fn suffix_goes_before_extension() {
        assert_eq!(suffixed_file_name("a.jpg", "dup"), "a_dup.jpg");
        assert_eq!(suffixed_file_name("archive.tar.gz", "dup"), "archive.tar_dup.gz");
        assert_eq!(suffixed_file_name("README", "dup"), "README_dup");
    }

    #[test]
    fn lexical_normalization_of_missing_paths() {
        let a = Path::new("/nonexistent/root/./2024/../2024/x");
        let b = Path::new("/nonexistent/root/2024/x");
        assert!(same_location(a, b));
    }
}
