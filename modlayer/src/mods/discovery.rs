//! Mod folder discovery.
//!
//! Every folder below the mods directory holding a `mod.json` is a candidate.
//! Candidates are inspected in path order; each either becomes a
//! [`DiscoveredMod`] or is skipped with a [`SkipReason`].

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use semver::Version;
use thiserror::Error;

use super::manifest::{ModManifest, MANIFEST_FILE_NAME};

/// Errors that stop discovery as a whole.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// The mods directory is missing.
    #[error("mods directory not found: {}", .0.display())]
    MissingDirectory(PathBuf),

    /// The search pattern could not be built.
    #[error("invalid search pattern: {0}")]
    Pattern(#[from] glob::PatternError),
}

/// Why a candidate folder was not turned into a mod.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SkipReason {
    /// The manifest could not be read.
    #[error("manifest unreadable: {0}")]
    Unreadable(String),

    /// The manifest is not valid.
    #[error("manifest invalid: {0}")]
    Invalid(String),

    /// The manifest sets `enabled: false`.
    #[error("disabled by its manifest")]
    Disabled,

    /// The configuration blocks this mod.
    #[error("blocked by configuration")]
    Blocked,

    /// An earlier folder already provided a mod with this name.
    #[error("name already used by {}", .0.display())]
    Duplicate(PathBuf),

    /// The running game version is outside the supported range.
    #[error("does not support game version {0}")]
    GameVersion(Version),
}

/// A mod ready for resolution.
#[derive(Debug, Clone)]
pub struct DiscoveredMod {
    /// Parsed manifest.
    pub manifest: ModManifest,

    /// Folder holding the manifest; resource paths are relative to it.
    pub directory: PathBuf,
}

impl DiscoveredMod {
    /// The mod's unique name.
    pub fn name(&self) -> &str {
        &self.manifest.name
    }
}

/// A candidate that was rejected.
#[derive(Debug, Clone)]
pub struct SkippedMod {
    /// Path of the `mod.json`.
    pub manifest_path: PathBuf,

    /// Declared name, when the manifest could be parsed.
    pub name: Option<String>,

    pub reason: SkipReason,
}

/// Result of one discovery pass.
#[derive(Debug, Clone, Default)]
pub struct DiscoveryReport {
    /// Accepted mods in discovery order.
    pub mods: Vec<DiscoveredMod>,

    /// Rejected candidates in discovery order.
    pub skipped: Vec<SkippedMod>,
}

/// Scans a mods directory for `mod.json` manifests.
#[derive(Debug, Clone)]
pub struct ModDiscovery {
    mods_dir: PathBuf,
    recursive: bool,
    blocked: HashSet<String>,
    game_version: Option<Version>,
}

impl ModDiscovery {
    /// Discover mods in the direct subfolders of `mods_dir`.
    pub fn new(mods_dir: impl Into<PathBuf>) -> Self {
        Self {
            mods_dir: mods_dir.into(),
            recursive: false,
            blocked: HashSet::new(),
            game_version: None,
        }
    }

    /// Search nested folders as well (builder pattern).
    pub fn with_recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    /// Skip mods with these names (builder pattern).
    pub fn with_blocked_mods<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.blocked.extend(names.into_iter().map(Into::into));
        self
    }

    /// Check manifests against a running game version (builder pattern).
    pub fn with_game_version(mut self, version: Version) -> Self {
        self.game_version = Some(version);
        self
    }

    /// The directory being scanned.
    pub fn mods_dir(&self) -> &Path {
        &self.mods_dir
    }

    /// Run one discovery pass.
    pub fn discover(&self) -> Result<DiscoveryReport, DiscoveryError> {
        if !self.mods_dir.is_dir() {
            return Err(DiscoveryError::MissingDirectory(self.mods_dir.clone()));
        }

        let mut report = DiscoveryReport::default();
        let mut seen: HashMap<String, PathBuf> = HashMap::new();

        for manifest_path in self.candidates(&mut report)? {
            let directory = match manifest_path.parent() {
                Some(dir) if dir != self.mods_dir => dir.to_path_buf(),
                _ => continue,
            };

            let manifest = match self.inspect(&manifest_path) {
                Ok(manifest) => manifest,
                Err((name, reason)) => {
                    skip(&mut report, manifest_path, name, reason);
                    continue;
                }
            };

            if let Some(first) = seen.get(&manifest.name) {
                let reason = SkipReason::Duplicate(first.clone());
                skip(&mut report, manifest_path, Some(manifest.name), reason);
                continue;
            }

            tracing::debug!(
                name = %manifest.name,
                path = %directory.display(),
                resources = manifest.manifest.len(),
                "Discovered mod"
            );
            seen.insert(manifest.name.clone(), directory.clone());
            report.mods.push(DiscoveredMod {
                manifest,
                directory,
            });
        }

        tracing::info!(
            mods_dir = %self.mods_dir.display(),
            found = report.mods.len(),
            skipped = report.skipped.len(),
            "Mod discovery finished"
        );
        Ok(report)
    }

    /// Manifest paths in sorted order. Unreadable glob hits are recorded as
    /// skips.
    fn candidates(&self, report: &mut DiscoveryReport) -> Result<Vec<PathBuf>, DiscoveryError> {
        let root = glob::Pattern::escape(&self.mods_dir.to_string_lossy());
        let pattern = if self.recursive {
            format!("{}/**/{}", root, MANIFEST_FILE_NAME)
        } else {
            format!("{}/*/{}", root, MANIFEST_FILE_NAME)
        };

        let mut paths = Vec::new();
        for hit in glob::glob(&pattern)? {
            match hit {
                Ok(path) => paths.push(path),
                Err(e) => skip(
                    report,
                    e.path().to_path_buf(),
                    None,
                    SkipReason::Unreadable(e.error().to_string()),
                ),
            }
        }
        paths.sort();
        Ok(paths)
    }

    /// Read and vet one manifest.
    fn inspect(&self, path: &Path) -> Result<ModManifest, (Option<String>, SkipReason)> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| (None, SkipReason::Unreadable(e.to_string())))?;
        let manifest =
            ModManifest::parse(&json).map_err(|e| (None, SkipReason::Invalid(e.to_string())))?;
        let name = Some(manifest.name.clone());

        if manifest.name.trim().is_empty() {
            return Err((None, SkipReason::Invalid("empty mod name".to_string())));
        }
        if let Err(e) = manifest.version() {
            return Err((name, SkipReason::Invalid(e.to_string())));
        }
        if !manifest.enabled {
            return Err((name, SkipReason::Disabled));
        }
        if self.blocked.contains(&manifest.name) {
            return Err((name, SkipReason::Blocked));
        }
        if let Some(running) = &self.game_version {
            match manifest.supports_game_version(running) {
                Ok(true) => {}
                Ok(false) => return Err((name, SkipReason::GameVersion(running.clone()))),
                Err(e) => return Err((name, SkipReason::Invalid(e.to_string()))),
            }
        }

        Ok(manifest)
    }
}

fn skip(report: &mut DiscoveryReport, manifest_path: PathBuf, name: Option<String>, reason: SkipReason) {
    tracing::info!(
        path = %manifest_path.display(),
        name = name.as_deref().unwrap_or("?"),
        reason = %reason,
        "Skipping mod"
    );
    report.skipped.push(SkippedMod {
        manifest_path,
        name,
        reason,
    });
}
