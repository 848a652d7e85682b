//! Persisted merge cache records.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

/// Catalog view a merged output is built for.
///
/// The owned-only view may merge a different target or fewer contributions
/// than the unfiltered one, so each view gets its own cache entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MergeView {
    /// Every contribution, on the unfiltered target.
    #[default]
    All,

    /// Owned contributions only, on the owned target.
    Owned,
}

impl MergeView {
    /// Short name used in cache keys and output paths.
    pub fn as_str(self) -> &'static str {
        match self {
            MergeView::All => "all",
            MergeView::Owned => "owned",
        }
    }
}

/// A file path paired with its modification time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileStamp {
    /// File path as given by the catalog.
    pub path: PathBuf,

    /// Modification time, compared exactly.
    pub modified: SystemTime,
}

impl FileStamp {
    /// Create a stamp from known values.
    pub fn new(path: impl Into<PathBuf>, modified: SystemTime) -> Self {
        Self {
            path: path.into(),
            modified,
        }
    }

    /// Stamp a file with its current modification time.
    pub fn read(path: &Path) -> std::io::Result<Self> {
        let modified = path.metadata()?.modified()?;
        Ok(Self::new(path, modified))
    }
}

/// One cached merge result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeCacheEntry {
    /// The base file the contributions were merged into.
    pub original: FileStamp,

    /// Contributions in merge order.
    pub contributions: Vec<FileStamp>,

    /// Output location, relative to the cache's output directory.
    pub output_path: PathBuf,

    /// Whether the current load cycle used this entry.
    #[serde(skip)]
    pub touched: bool,
}

impl MergeCacheEntry {
    /// Check if this entry was produced from exactly these inputs.
    pub fn matches(&self, original: &FileStamp, contributions: &[FileStamp]) -> bool {
        self.original == *original && self.contributions.as_slice() == contributions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn stamp(path: &str, secs: u64) -> FileStamp {
        FileStamp::new(path, SystemTime::UNIX_EPOCH + Duration::from_secs(secs))
    }

    fn sample_entry() -> MergeCacheEntry {
        MergeCacheEntry {
            original: stamp("/base/laser.json", 100),
            contributions: vec![stamp("/modA/laser.json", 200), stamp("/modB/laser.json", 300)],
            output_path: PathBuf::from("content/base/laser.json/all/WeaponDef/laser.json"),
            touched: false,
        }
    }

    #[test]
    fn test_matches_identical_inputs() {
        let entry = sample_entry();
        assert!(entry.matches(
            &stamp("/base/laser.json", 100),
            &[stamp("/modA/laser.json", 200), stamp("/modB/laser.json", 300)]
        ));
    }

    #[test]
    fn test_reordered_contributions_do_not_match() {
        let entry = sample_entry();
        assert!(!entry.matches(
            &stamp("/base/laser.json", 100),
            &[stamp("/modB/laser.json", 300), stamp("/modA/laser.json", 200)]
        ));
    }

    #[test]
    fn test_changed_mtime_does_not_match() {
        let entry = sample_entry();
        assert!(!entry.matches(
            &stamp("/base/laser.json", 101),
            &[stamp("/modA/laser.json", 200), stamp("/modB/laser.json", 300)]
        ));
    }

    #[test]
    fn test_touched_flag_not_persisted() {
        let mut entry = sample_entry();
        entry.touched = true;

        let json = serde_json::to_string(&entry).unwrap();
        let loaded: MergeCacheEntry = serde_json::from_str(&json).unwrap();

        assert!(!loaded.touched);
        assert!(loaded.matches(&entry.original, &entry.contributions));
    }
}
