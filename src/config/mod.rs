//! # Config Module
//!
//! Optional TOML configuration. Every field has a default, so an empty file
//! (or no file at all) is valid. Command-line flags override these values.
//!
//! ```toml
//! scan_dirs = ["/media/camera", "/media/phone"]
//! root = "/media/organized"
//! home_country = "France"
//! preferred_locations = ["Paris"]
//! window_days = 14
//! ```

use crate::core::classifier::DEFAULT_CHUNK_SIZE;
use crate::core::inventory::DEFAULT_CHECKPOINT_EVERY;
use crate::core::merge::DEFAULT_WINDOW_DAYS;
use crate::error::OrganizerError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable naming a config file
pub const CONFIG_ENV: &str = "MEDIA_ORGANIZER_CONFIG";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directories scanned by `inventory` and `dupes`
    pub scan_dirs: Vec<PathBuf>,
    /// Root of the organized tree
    pub root: Option<PathBuf>,
    /// Country left out of folder names
    pub home_country: Option<String>,
    /// Same-date merge targets, in priority order
    pub preferred_locations: Vec<String>,
    pub window_days: i64,
    /// Bytes fingerprinted at each end of a file
    pub chunk_size: usize,
    /// Worker threads (unset = one per core)
    pub workers: Option<usize>,
    pub include_hidden: bool,
    /// Media extensions (unset = built-in list)
    pub extensions: Option<Vec<String>>,
    pub checkpoint_every: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            scan_dirs: Vec::new(),
            root: None,
            home_country: None,
            preferred_locations: Vec::new(),
            window_days: DEFAULT_WINDOW_DAYS,
            chunk_size: DEFAULT_CHUNK_SIZE,
            workers: None,
            include_hidden: false,
            extensions: None,
            checkpoint_every: DEFAULT_CHECKPOINT_EVERY,
        }
    }
}

impl AppConfig {
    /// Parse a config file
    pub fn load(path: &Path) -> Result<Self, OrganizerError> {
        let content = fs::read_to_string(path).map_err(|e| {
            OrganizerError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::parse(&content)
            .map_err(|e| OrganizerError::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn parse(content: &str) -> Result<Self, String> {
        let config: AppConfig = toml::from_str(content).map_err(|e| e.to_string())?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), String> {
        if self.chunk_size == 0 {
            return Err("chunk_size must be positive".to_string());
        }
        if self.window_days < 0 {
            return Err("window_days cannot be negative".to_string());
        }
        if self.workers == Some(0) {
            return Err("workers must be positive".to_string());
        }
        Ok(())
    }

    /// Resolve and load the active configuration.
    ///
    /// Order: `explicit`, then `$MEDIA_ORGANIZER_CONFIG`, then the user config
    /// file, then defaults. Only the user config file may be absent.
    pub fn discover(explicit: Option<&Path>) -> Result<Self, OrganizerError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        if let Some(path) = std::env::var_os(CONFIG_ENV).filter(|v| !v.is_empty()) {
            return Self::load(Path::new(&path));
        }

        match default_config_path() {
            Some(path) if path.is_file() => Self::load(&path),
            _ => {
                debug!("no config file, using defaults");
                Ok(Self::default())
            }
        }
    }
}

/// `<config dir>/media-organizer/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("media-organizer").join("config.toml"))
}
