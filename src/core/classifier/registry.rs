//! Name/size registry that assigns duplicate statuses in scan order.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

/// Per-file duplicate classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DuplicateStatus {
    /// First file seen with this name
    #[default]
    Ok,
    /// Later file with a name and size already seen
    Duplicate,
    /// Later file with a known name but a new size; must be renamed
    Error,
}

impl DuplicateStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DuplicateStatus::Ok => "ok",
            DuplicateStatus::Duplicate => "duplicate",
            DuplicateStatus::Error => "error",
        }
    }
}

impl fmt::Display for DuplicateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DuplicateStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ok" => Ok(DuplicateStatus::Ok),
            "duplicate" => Ok(DuplicateStatus::Duplicate),
            "error" => Ok(DuplicateStatus::Error),
            other => Err(format!("unknown duplicate status '{}'", other)),
        }
    }
}

#[derive(Debug, Default)]
struct NameEntry {
    sizes: HashSet<u64>,
    count: usize,
}

/// Tracks every (name, size) pair observed so far.
///
/// Feeding the same sequence always produces the same statuses; only the
/// order decides which file of a name counts as first.
#[derive(Debug, Default)]
pub struct NameRegistry {
    entries: HashMap<String, NameEntry>,
}

impl NameRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a file and return its status
    pub fn observe(&mut self, name: &str, size: u64) -> DuplicateStatus {
        let entry = self.entries.entry(name.to_string()).or_default();
        entry.count += 1;

        if entry.count == 1 {
            entry.sizes.insert(size);
            DuplicateStatus::Ok
        } else if entry.sizes.contains(&size) {
            DuplicateStatus::Duplicate
        } else {
            entry.sizes.insert(size);
            DuplicateStatus::Error
        }
    }
}
