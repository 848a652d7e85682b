//! Resource entry and key types.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

/// Catalog key: a resource is identified by its type and id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceKey {
    /// Resource type (e.g. "WeaponDef").
    pub resource_type: String,

    /// Resource id, unique within its type.
    pub id: String,
}

impl ResourceKey {
    /// Create a new key.
    pub fn new(resource_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            id: id.into(),
        }
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.resource_type, self.id)
    }
}

/// A single resource known to the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceEntry {
    /// Resource id.
    pub id: String,

    /// Resource type.
    pub resource_type: String,

    /// Concrete file providing the content.
    pub source_path: PathBuf,

    /// Modification time of `source_path` when the entry was created.
    pub last_updated: SystemTime,

    /// Optional content pack the user must own to see this entry.
    pub content_pack: Option<String>,

    /// Further packs the entry needs. Merged entries carry the packs of
    /// every input here.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required_content_packs: Vec<String>,
}

impl ResourceEntry {
    /// Create an entry without touching the filesystem.
    ///
    /// `last_updated` is set to the Unix epoch.
    pub fn new(
        resource_type: impl Into<String>,
        id: impl Into<String>,
        source_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            id: id.into(),
            resource_type: resource_type.into(),
            source_path: source_path.into(),
            last_updated: SystemTime::UNIX_EPOCH,
            content_pack: None,
            required_content_packs: Vec::new(),
        }
    }

    /// Create an entry stamped with the file's current modification time.
    pub fn from_file(
        resource_type: impl Into<String>,
        id: impl Into<String>,
        source_path: &Path,
    ) -> std::io::Result<Self> {
        let last_updated = source_path.metadata()?.modified()?;
        Ok(Self::new(resource_type, id, source_path).with_last_updated(last_updated))
    }

    /// Set the owning content pack.
    pub fn with_content_pack(mut self, pack: impl Into<String>) -> Self {
        self.content_pack = Some(pack.into());
        self
    }

    /// Require further content packs (builder pattern).
    pub fn with_required_content_packs<I, S>(mut self, packs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for pack in packs {
            let pack = pack.into();
            if !self.required_content_packs.contains(&pack) {
                self.required_content_packs.push(pack);
            }
        }
        self
    }

    /// Every content pack this entry needs on its own.
    pub fn content_packs(&self) -> impl Iterator<Item = &str> {
        self.content_pack
            .as_deref()
            .into_iter()
            .chain(self.required_content_packs.iter().map(String::as_str))
    }

    /// Set the modification time.
    pub fn with_last_updated(mut self, last_updated: SystemTime) -> Self {
        self.last_updated = last_updated;
        self
    }

    /// Point the entry at a different file.
    pub fn with_source_path(mut self, source_path: impl Into<PathBuf>) -> Self {
        self.source_path = source_path.into();
        self
    }

    /// The catalog key of this entry.
    pub fn key(&self) -> ResourceKey {
        ResourceKey::new(&self.resource_type, &self.id)
    }
}
