//! The `mod.json` document.

use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};

use semver::Version;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::ResourceEntry;
use crate::resolver::ModDescriptor;

/// File name of a mod manifest.
pub const MANIFEST_FILE_NAME: &str = "mod.json";

/// Extensions a `merge` entry may use.
const MERGEABLE_EXTENSIONS: &[&str] = &["json", "txt", "csv"];

/// Errors raised while expanding a mod's resource list.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// A manifest entry points at nothing.
    #[error("manifest path does not exist: {}", .0.display())]
    MissingPath(PathBuf),

    /// A `merge` entry names a file that cannot be merged.
    #[error("cannot merge {}: only .json, .txt and .csv files merge", .0.display())]
    NotMergeable(PathBuf),

    /// A type or id is empty, contains a path separator, or is `.`/`..`.
    #[error("invalid resource {field} '{value}'")]
    InvalidName { field: &'static str, value: String },

    /// A version field is not valid semver.
    #[error("invalid {field} '{value}': {reason}")]
    InvalidVersion {
        field: &'static str,
        value: String,
        reason: String,
    },

    /// Reading a resource file failed.
    #[error("I/O error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// One resource declaration inside `mod.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Resource type the file(s) belong to.
    #[serde(rename = "type")]
    pub resource_type: String,

    /// File or directory, relative to the mod folder.
    pub path: PathBuf,

    /// Explicit id; defaults to the file stem.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Content pack the resource requires.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_pack: Option<String>,

    /// Merge into the existing resource instead of replacing it.
    #[serde(default)]
    pub merge: bool,
}

/// A parsed `mod.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModManifest {
    /// Unique mod name.
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(default = "default_enabled")]
    pub enabled: bool,

    #[serde(default)]
    pub depends_on: Vec<String>,

    #[serde(default)]
    pub optionally_depends_on: Vec<String>,

    #[serde(default)]
    pub conflicts_with: Vec<String>,

    /// Content packs every resource of this mod requires.
    #[serde(default)]
    pub required_content_packs: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub game_version_min: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub game_version_max: Option<String>,

    /// Resources contributed by this mod.
    #[serde(default)]
    pub manifest: Vec<ManifestEntry>,
}

fn default_enabled() -> bool {
    true
}

/// A resource produced by expanding a manifest entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpandedEntry {
    pub entry: ResourceEntry,
    pub merge: bool,
}

impl ModManifest {
    /// Create a manifest with only a name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: None,
            enabled: true,
            depends_on: Vec::new(),
            optionally_depends_on: Vec::new(),
            conflicts_with: Vec::new(),
            required_content_packs: Vec::new(),
            game_version_min: None,
            game_version_max: None,
            manifest: Vec::new(),
        }
    }

    /// Parse a manifest document.
    pub fn parse(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// The declared mod version, if any.
    pub fn version(&self) -> Result<Option<Version>, ManifestError> {
        parse_version("version", self.version.as_deref())
    }

    /// Check the game version bounds against `running`.
    pub fn supports_game_version(&self, running: &Version) -> Result<bool, ManifestError> {
        let min = parse_version("game_version_min", self.game_version_min.as_deref())?;
        let max = parse_version("game_version_max", self.game_version_max.as_deref())?;

        Ok(min.map_or(true, |min| *running >= min) && max.map_or(true, |max| *running <= max))
    }

    /// Build the resolver input for this mod.
    ///
    /// Dependencies named in `ignore_missing` are dropped.
    pub fn to_descriptor(&self, declaration_order: usize, ignore_missing: &HashSet<String>) -> ModDescriptor {
        ModDescriptor::new(&self.name, declaration_order)
            .with_dependencies(
                self.depends_on
                    .iter()
                    .filter(|dep| !ignore_missing.contains(*dep)),
            )
            .with_optional_dependencies(&self.optionally_depends_on)
            .with_conflicts(&self.conflicts_with)
    }

    /// Expand the resource list against the mod folder.
    pub fn expand(&self, mod_dir: &Path) -> Result<Vec<ExpandedEntry>, ManifestError> {
        expand_entries(&self.manifest, mod_dir)
    }
}

/// Expand manifest entries against `root`.
///
/// Directories expand to every file below them in path order, each
/// identified by its file stem.
pub fn expand_entries(
    entries: &[ManifestEntry],
    root: &Path,
) -> Result<Vec<ExpandedEntry>, ManifestError> {
    let mut expanded = Vec::new();

    for declared in entries {
        check_name("type", &declared.resource_type)?;
        if let Some(id) = &declared.id {
            check_name("id", id)?;
        }

        let path = root.join(&declared.path);
        if path.is_dir() {
            for file in files_below(&path)? {
                let id = file_stem(&file);
                expanded.push(declared.expand_file(&file, id)?);
            }
        } else if path.is_file() {
            let id = declared.id.clone().unwrap_or_else(|| file_stem(&path));
            expanded.push(declared.expand_file(&path, id)?);
        } else {
            return Err(ManifestError::MissingPath(path));
        }
    }

    Ok(expanded)
}

impl ManifestEntry {
    /// Create an entry replacing `type` resources with `path`.
    pub fn new(resource_type: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            resource_type: resource_type.into(),
            path: path.into(),
            id: None,
            content_pack: None,
            merge: false,
        }
    }

    /// Set an explicit id (builder pattern).
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Mark the entry as a merge contribution (builder pattern).
    pub fn merged(mut self) -> Self {
        self.merge = true;
        self
    }

    fn expand_file(&self, path: &Path, id: String) -> Result<ExpandedEntry, ManifestError> {
        if self.merge && !is_mergeable(path) {
            return Err(ManifestError::NotMergeable(path.to_path_buf()));
        }

        let mut entry = ResourceEntry::from_file(&self.resource_type, id, path).map_err(|source| {
            ManifestError::Io {
                path: path.to_path_buf(),
                source,
            }
        })?;
        if let Some(pack) = &self.content_pack {
            entry = entry.with_content_pack(pack);
        }

        Ok(ExpandedEntry {
            entry,
            merge: self.merge,
        })
    }
}

fn parse_version(field: &'static str, value: Option<&str>) -> Result<Option<Version>, ManifestError> {
    value
        .map(|value| {
            Version::parse(value).map_err(|e| ManifestError::InvalidVersion {
                field,
                value: value.to_string(),
                reason: e.to_string(),
            })
        })
        .transpose()
}

/// Types and ids name catalog keys, never paths.
fn check_name(field: &'static str, value: &str) -> Result<(), ManifestError> {
    let valid = !value.is_empty()
        && value != "."
        && value != ".."
        && !value.contains(['/', '\\']);
    if valid {
        Ok(())
    } else {
        Err(ManifestError::InvalidName {
            field,
            value: value.to_string(),
        })
    }
}

fn is_mergeable(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| MERGEABLE_EXTENSIONS.iter().any(|m| ext.eq_ignore_ascii_case(m)))
        .unwrap_or(false)
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Every regular file below `dir`, sorted by path.
fn files_below(dir: &Path) -> Result<Vec<PathBuf>, ManifestError> {
    let pattern = format!(
        "{}/**/*",
        glob::Pattern::escape(&dir.to_string_lossy())
    );
    let paths = glob::glob(&pattern).map_err(|e| ManifestError::Io {
        path: dir.to_path_buf(),
        source: io::Error::new(io::ErrorKind::InvalidInput, e),
    })?;

    let mut files = Vec::new();
    for path in paths {
        let path = path.map_err(|e| ManifestError::Io {
            path: e.path().to_path_buf(),
            source: e.into_error(),
        })?;
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &Path, rel: &str, body: &str) -> PathBuf {
        let path = dir.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_parse_defaults() {
        let manifest = ModManifest::parse(r#"{"name": "modA"}"#).unwrap();
        assert_eq!(manifest.name, "modA");
        assert!(manifest.enabled);
        assert!(manifest.depends_on.is_empty());
        assert!(manifest.manifest.is_empty());
        assert_eq!(manifest.version().unwrap(), None);
    }

    #[test]
    fn test_parse_full_document() {
        let manifest = ModManifest::parse(
            r#"{
                "name": "modB",
                "version": "1.2.0",
                "enabled": false,
                "depends_on": ["modA"],
                "optionally_depends_on": ["modX"],
                "conflicts_with": ["modC"],
                "required_content_packs": ["urban"],
                "manifest": [
                    {"type": "WeaponDef", "path": "weapons/laser.json", "merge": true},
                    {"type": "Names", "path": "names", "content_pack": "heavy"}
                ]
            }"#,
        )
        .unwrap();

        assert!(!manifest.enabled);
        assert_eq!(manifest.version().unwrap(), Some(Version::new(1, 2, 0)));
        assert_eq!(manifest.manifest.len(), 2);
        assert!(manifest.manifest[0].merge);
        assert_eq!(manifest.manifest[1].content_pack.as_deref(), Some("heavy"));
    }

    #[test]
    fn test_descriptor_drops_ignored_dependencies() {
        let mut manifest = ModManifest::new("modB");
        manifest.depends_on = vec!["modA".to_string(), "Legacy".to_string()];
        manifest.conflicts_with = vec!["modC".to_string()];

        let ignored: HashSet<String> = ["Legacy".to_string()].into_iter().collect();
        let descriptor = manifest.to_descriptor(3, &ignored);

        assert_eq!(descriptor.declaration_order(), 3);
        assert!(descriptor.depends_on().contains("modA"));
        assert!(!descriptor.depends_on().contains("Legacy"));
        assert!(descriptor.conflicts_with().contains("modC"));
    }

    #[test]
    fn test_game_version_bounds() {
        let mut manifest = ModManifest::new("modA");
        manifest.game_version_min = Some("1.8.0".to_string());
        manifest.game_version_max = Some("1.9.1".to_string());

        assert!(manifest.supports_game_version(&Version::new(1, 9, 1)).unwrap());
        assert!(!manifest.supports_game_version(&Version::new(1, 7, 0)).unwrap());
        assert!(!manifest.supports_game_version(&Version::new(2, 0, 0)).unwrap());
    }

    #[test]
    fn test_invalid_game_version_is_error() {
        let mut manifest = ModManifest::new("modA");
        manifest.game_version_min = Some("one".to_string());

        let err = manifest.supports_game_version(&Version::new(1, 0, 0)).unwrap_err();
        assert!(matches!(err, ManifestError::InvalidVersion { field: "game_version_min", .. }));
    }

    #[test]
    fn test_expand_file_and_directory() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "weapons/laser.json", "{}");
        write(temp.path(), "names/b.txt", "b");
        write(temp.path(), "names/nested/a.txt", "a");

        let mut manifest = ModManifest::new("modA");
        manifest.manifest = vec![
            ManifestEntry::new("WeaponDef", "weapons/laser.json").with_id("LaserSmall"),
            ManifestEntry::new("Names", "names"),
        ];

        let expanded = manifest.expand(temp.path()).unwrap();
        let ids: Vec<_> = expanded.iter().map(|e| e.entry.id.as_str()).collect();
        assert_eq!(ids, vec!["LaserSmall", "b", "a"]);
        assert!(expanded.iter().all(|e| !e.merge));
        assert_eq!(expanded[0].entry.resource_type, "WeaponDef");
    }

    #[test]
    fn test_expand_missing_path() {
        let temp = TempDir::new().unwrap();
        let mut manifest = ModManifest::new("modA");
        manifest.manifest = vec![ManifestEntry::new("WeaponDef", "gone.json")];

        let err = manifest.expand(temp.path()).unwrap_err();
        assert!(matches!(err, ManifestError::MissingPath(_)));
    }

    #[test]
    fn test_merge_requires_mergeable_extension() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "textures/laser.dds", "DDS");
        write(temp.path(), "weapons/laser.JSON", "{}");

        let mut manifest = ModManifest::new("modA");
        manifest.manifest = vec![ManifestEntry::new("WeaponDef", "weapons/laser.JSON").merged()];
        let expanded = manifest.expand(temp.path()).unwrap();
        assert!(expanded[0].merge);

        manifest.manifest = vec![ManifestEntry::new("Texture", "textures/laser.dds").merged()];
        let err = manifest.expand(temp.path()).unwrap_err();
        assert!(matches!(err, ManifestError::NotMergeable(_)));
    }

    #[test]
    fn test_path_like_ids_and_types_are_rejected() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "laser.json", "{}");

        for id in ["../../../../escaped", "a/b", "a\\b", "..", ""] {
            let entries = [ManifestEntry::new("WeaponDef", "laser.json").with_id(id).merged()];
            let err = expand_entries(&entries, temp.path()).unwrap_err();
            assert!(
                matches!(err, ManifestError::InvalidName { field: "id", .. }),
                "{:?} accepted",
                id
            );
        }

        let entries = [ManifestEntry::new("../WeaponDef", "laser.json")];
        let err = expand_entries(&entries, temp.path()).unwrap_err();
        assert!(matches!(err, ManifestError::InvalidName { field: "type", .. }));

        let entries = [ManifestEntry::new("WeaponDef", "laser.json").with_id("laser.v2")];
        assert_eq!(expand_entries(&entries, temp.path()).unwrap()[0].entry.id, "laser.v2");
    }

    #[test]
    fn test_content_pack_is_applied() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "mech.json", "{}");

        let mut manifest = ModManifest::new("modA");
        let mut entry = ManifestEntry::new("MechDef", "mech.json");
        entry.content_pack = Some("heavy".to_string());
        manifest.manifest = vec![entry];

        let expanded = manifest.expand(temp.path()).unwrap();
        assert_eq!(expanded[0].entry.content_pack.as_deref(), Some("heavy"));
    }
}
