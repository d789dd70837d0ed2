//! File filtering logic for the scanner.

use std::collections::HashSet;
use std::path::Path;

/// Extensions accepted when no override is configured
pub const DEFAULT_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "bmp", "tiff", "webp", "mp4", "avi", "mov", "wmv", "flv",
    "mkv", "webm",
];

/// Operating-system artifacts that are never media, compared lowercase
const SYSTEM_FILES: &[&str] = &["desktop.ini", "thumbs.db", ".ds_store"];

/// Decides whether a file is a media file worth scanning
pub struct MediaFilter {
    extensions: HashSet<String>,
    include_hidden: bool,
}

impl MediaFilter {
    /// Create a new filter with the default extensions
    pub fn new() -> Self {
        Self {
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            include_hidden: false,
        }
    }

    /// Include hidden files (starting with .)
    pub fn with_hidden(mut self, include: bool) -> Self {
        self.include_hidden = include;
        self
    }

    /// Override the list of extensions to accept
    pub fn with_extensions(mut self, extensions: Vec<String>) -> Self {
        self.extensions = extensions
            .into_iter()
            .map(|e| e.trim_start_matches('.').to_lowercase())
            .collect();
        self
    }

    /// Check if a file should be included
    pub fn should_include(&self, path: &Path) -> bool {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return false;
        };

        if Self::is_system_artifact(name) {
            return false;
        }

        if !self.include_hidden && name.starts_with('.') {
            return false;
        }

        path.extension()
            .and_then(|e| e.to_str())
            .map(|ext| self.extensions.contains(&ext.to_lowercase()))
            .unwrap_or(false)
    }

    /// Thumbnail caches and folder settings files
    pub fn is_system_artifact(name: &str) -> bool {
        let lower = name.to_lowercase();
        SYSTEM_FILES.contains(&lower.as_str())
    }
}

impl Default for MediaFilter {
    fn default() -> Self {
        Self::new()
    }
}
