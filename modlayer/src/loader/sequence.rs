//! `ModLoader`: discovery, resolution, catalog replay and merging.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};

use semver::Version;

use super::error::{LoaderError, MergeFailureReason, ModFailureReason};
use super::report::{LoadPlan, LoadReport, MergeFailure, ModLoadFailure};
use crate::catalog::{OwnershipState, ResourceCatalog, ResourceEntry, ResourceKey, ResourceLayer};
use crate::config::ConfigFile;
use crate::merge::{MergeCache, MergeError, MergeView};
use crate::mods::{
    assign_declaration_order, expand_entries, DiscoveredMod, LoadOrderFile, ManifestEntry,
    ModDiscovery, LOAD_ORDER_FILE_NAME,
};
use crate::resolver::resolve;

/// Name of the layer holding the default content.
pub const BASE_LAYER_NAME: &str = "base";

/// Name of the synthetic layer pointing at merged outputs.
pub const MERGE_LAYER_NAME: &str = "merge-cache";

/// Name of the owned-only layer holding merges of owned inputs.
pub const OWNED_MERGE_LAYER_NAME: &str = "merge-cache-owned";

/// A merge entry collected from one mod.
#[derive(Debug, Clone)]
struct Contribution {
    path: PathBuf,

    /// Packs of the entry and its layer.
    content_packs: Vec<String>,
}

/// Runs load cycles against one mods directory, content root and cache.
#[derive(Debug, Clone)]
pub struct ModLoader {
    mods_dir: PathBuf,
    content_root: PathBuf,
    base_manifest: PathBuf,
    cache_dir: PathBuf,
    search_subdirectories: bool,
    blocked_mods: Vec<String>,
    ignore_missing: HashSet<String>,
    game_version: Option<Version>,
}

impl ModLoader {
    /// Create a loader. The base manifest defaults to
    /// `<content_root>/manifest.json`.
    pub fn new(
        mods_dir: impl Into<PathBuf>,
        content_root: impl Into<PathBuf>,
        cache_dir: impl Into<PathBuf>,
    ) -> Self {
        let content_root = content_root.into();
        Self {
            mods_dir: mods_dir.into(),
            base_manifest: content_root.join("manifest.json"),
            content_root,
            cache_dir: cache_dir.into(),
            search_subdirectories: false,
            blocked_mods: Vec::new(),
            ignore_missing: HashSet::new(),
            game_version: None,
        }
    }

    /// Create a loader from the configuration file.
    pub fn from_config(config: &ConfigFile) -> Self {
        let mut loader = Self::new(
            &config.paths.mods_dir,
            &config.paths.content_root,
            &config.paths.cache_dir,
        )
        .with_base_manifest(config.paths.base_manifest_path())
        .with_search_subdirectories(config.loader.search_subdirectories)
        .with_blocked_mods(config.loader.blocked_mods.iter().cloned())
        .with_ignore_missing_mods(config.loader.ignore_missing_mods.iter().cloned());

        if let Some(version) = &config.loader.game_version {
            loader = loader.with_game_version(version.clone());
        }
        loader
    }

    /// Use a different base manifest (builder pattern).
    pub fn with_base_manifest(mut self, path: impl Into<PathBuf>) -> Self {
        self.base_manifest = path.into();
        self
    }

    pub fn with_search_subdirectories(mut self, recursive: bool) -> Self {
        self.search_subdirectories = recursive;
        self
    }

    pub fn with_blocked_mods(mut self, names: impl IntoIterator<Item = String>) -> Self {
        self.blocked_mods.extend(names);
        self
    }

    /// Drop these names from every mod's dependencies (builder pattern).
    pub fn with_ignore_missing_mods(mut self, names: impl IntoIterator<Item = String>) -> Self {
        self.ignore_missing.extend(names);
        self
    }

    pub fn with_game_version(mut self, version: Version) -> Self {
        self.game_version = Some(version);
        self
    }

    /// Location of the load-order hint.
    pub fn load_order_path(&self) -> PathBuf {
        self.cache_dir.join(LOAD_ORDER_FILE_NAME)
    }

    /// Open the merge cache used by [`run`](Self::run).
    pub fn merge_cache(&self) -> MergeCache {
        MergeCache::open(&self.cache_dir).with_content_root(&self.content_root)
    }

    /// Discover and resolve without side effects.
    pub fn plan(&self) -> Result<LoadPlan, LoaderError> {
        let mut discovery = ModDiscovery::new(&self.mods_dir)
            .with_recursive(self.search_subdirectories)
            .with_blocked_mods(self.blocked_mods.iter().cloned());
        if let Some(version) = &self.game_version {
            discovery = discovery.with_game_version(version.clone());
        }
        let discovery = discovery.discover()?;

        let previous = LoadOrderFile::new(self.load_order_path()).load();
        let ranks = assign_declaration_order(&previous, discovery.mods.iter().map(DiscoveredMod::name));

        let descriptors: Vec<_> = discovery
            .mods
            .iter()
            .filter_map(|m| {
                let rank = *ranks.get(m.name())?;
                Some(m.manifest.to_descriptor(rank, &self.ignore_missing))
            })
            .collect();

        let resolution = resolve(&descriptors);
        for (name, reason) in &resolution.excluded {
            tracing::warn!(name = %name, reason = %reason, "Mod excluded from load order");
        }

        Ok(LoadPlan {
            discovery,
            descriptors,
            resolution,
        })
    }

    /// Run one full load cycle.
    pub fn run(&self, ownership: OwnershipState) -> Result<LoadReport, LoaderError> {
        let LoadPlan {
            discovery,
            descriptors: _,
            resolution,
        } = self.plan()?;

        let mut catalog = ResourceCatalog::with_ownership(ownership);
        catalog.reset(self.base_layer()?);

        let mods: HashMap<&str, &DiscoveredMod> =
            discovery.mods.iter().map(|m| (m.name(), m)).collect();
        let mut loaded = Vec::new();
        let mut failures = Vec::new();
        let mut failed: HashSet<String> = HashSet::new();
        let mut contributions: BTreeMap<ResourceKey, Vec<Contribution>> = BTreeMap::new();

        for name in &resolution.order {
            let Some(discovered) = mods.get(name.as_str()) else {
                continue;
            };

            match self.build_layer(discovered, &failed) {
                Ok((layer, merges)) => {
                    tracing::info!(
                        name = %name,
                        entries = layer.len(),
                        merges = merges.len(),
                        "Loaded mod"
                    );
                    for entry in merges {
                        contributions.entry(entry.key()).or_default().push(Contribution {
                            content_packs: layer.content_packs(&entry),
                            path: entry.source_path,
                        });
                    }
                    catalog.apply_layer(layer);
                    loaded.push(name.clone());
                }
                Err(reason) => {
                    tracing::warn!(name = %name, reason = %reason, "Mod failed to load");
                    failed.insert(name.clone());
                    failures.push(ModLoadFailure {
                        name: name.clone(),
                        reason,
                    });
                }
            }
        }

        let mut cache = self.merge_cache();
        let ownership = catalog.ownership().clone();
        let mut merged = Vec::new();
        let mut merge_failures = Vec::new();
        let mut merge_layer = ResourceLayer::new(MERGE_LAYER_NAME);
        let mut owned_merge_layer = ResourceLayer::new(OWNED_MERGE_LAYER_NAME).owned_only();

        for (key, contributed) in contributions {
            let Some(target) = catalog.entry(&key.resource_type, &key.id, false).cloned() else {
                tracing::warn!(resource = %key, "Merge target does not exist");
                merge_failures.push(MergeFailure {
                    path: contributed.first().map(|c| c.path.clone()).unwrap_or_default(),
                    key,
                    reason: MergeFailureReason::MissingTarget,
                });
                continue;
            };

            let packs = merged_packs(
                catalog.content_packs(&key.resource_type, &key.id, false),
                &contributed,
            );
            let fully_owned = packs.iter().all(|pack| ownership.is_owned(pack));
            let paths: Vec<PathBuf> = contributed.iter().map(|c| c.path.clone()).collect();

            let mut served = false;
            match cache.try_get_or_create_merged_output_for(MergeView::All, &target, &paths) {
                Ok(Some(output)) => {
                    merge_layer.push(merged_entry(target, output, packs));
                    served = true;
                }
                Ok(None) => {}
                Err(e) => merge_failures.push(merge_failure(&key, e)),
            }

            // The unfiltered merge reaches the owned view only when every
            // pack it draws on is owned. Otherwise the owned view gets a
            // merge of its own target and its owned contributions.
            if !fully_owned {
                let owned_target = catalog.entry(&key.resource_type, &key.id, true).cloned();
                let owned: Vec<Contribution> = contributed
                    .into_iter()
                    .filter(|c| c.content_packs.iter().all(|pack| ownership.is_owned(pack)))
                    .collect();

                if let Some(owned_target) = owned_target.filter(|_| !owned.is_empty()) {
                    let packs = merged_packs(
                        catalog.content_packs(&key.resource_type, &key.id, true),
                        &owned,
                    );
                    let paths: Vec<PathBuf> = owned.iter().map(|c| c.path.clone()).collect();
                    match cache.try_get_or_create_merged_output_for(
                        MergeView::Owned,
                        &owned_target,
                        &paths,
                    ) {
                        Ok(Some(output)) => {
                            owned_merge_layer.push(merged_entry(owned_target, output, packs));
                            served = true;
                        }
                        Ok(None) => {}
                        Err(e) => merge_failures.push(merge_failure(&key, e)),
                    }
                }
            }

            if served {
                merged.push(key);
            }
        }

        // Owned-only merges go first so a fully owned unfiltered merge
        // still wins in both views after a rebuild with more packs owned.
        if !owned_merge_layer.is_empty() {
            catalog.apply_layer(owned_merge_layer);
        }
        if !merge_layer.is_empty() {
            catalog.apply_layer(merge_layer);
        }
        catalog.rebuild();

        let unpersisted = cache.take_persist_failures();
        let scratch = cache.take_scratch();

        let cache_cycle = match cache.finish_cycle() {
            Ok(report) => Some(report),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to persist merge cache");
                None
            }
        };

        let order_file = LoadOrderFile::new(self.load_order_path());
        if let Err(e) = order_file.save(&resolution.order) {
            tracing::warn!(path = %order_file.path().display(), error = %e, "Failed to save load order");
        }

        tracing::info!(
            loaded = loaded.len(),
            excluded = resolution.excluded.len(),
            failed = failures.len(),
            merged = merged.len(),
            merge_failures = merge_failures.len(),
            unpersisted = unpersisted.len(),
            entries = catalog.len(),
            "Load cycle finished"
        );

        Ok(LoadReport {
            discovery,
            resolution,
            loaded,
            failures,
            merged,
            merge_failures,
            unpersisted,
            cache_cycle,
            catalog,
            scratch,
        })
    }

    /// Read the base manifest into the base layer.
    ///
    /// A missing manifest yields an empty base layer.
    fn base_layer(&self) -> Result<ResourceLayer, LoaderError> {
        let path = &self.base_manifest;
        let data = match std::fs::read(path) {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::warn!(path = %path.display(), "Base manifest not found, starting empty");
                return Ok(ResourceLayer::new(BASE_LAYER_NAME));
            }
            Err(source) => {
                return Err(LoaderError::BaseManifestRead {
                    path: path.clone(),
                    source,
                })
            }
        };

        let declared: Vec<ManifestEntry> =
            serde_json::from_slice(&data).map_err(|source| LoaderError::BaseManifestParse {
                path: path.clone(),
                source,
            })?;
        let entries = expand_entries(&declared, &self.content_root)
            .map_err(LoaderError::BaseManifestEntry)?;

        tracing::debug!(entries = entries.len(), "Read base manifest");
        Ok(ResourceLayer::new(BASE_LAYER_NAME).with_entries(entries.into_iter().map(|e| e.entry)))
    }

    /// Build a mod's layer and collect its merge contributions.
    fn build_layer(
        &self,
        discovered: &DiscoveredMod,
        failed: &HashSet<String>,
    ) -> Result<(ResourceLayer, Vec<ResourceEntry>), ModFailureReason> {
        let manifest = &discovered.manifest;
        if let Some(dep) = manifest
            .depends_on
            .iter()
            .find(|dep| failed.contains(*dep) && !self.ignore_missing.contains(*dep))
        {
            return Err(ModFailureReason::DependencyFailed(dep.clone()));
        }

        let mut layer = ResourceLayer::new(&manifest.name)
            .with_required_content_packs(manifest.required_content_packs.iter().cloned());
        let mut merges = Vec::new();

        for expanded in manifest.expand(&discovered.directory)? {
            if expanded.merge {
                merges.push(expanded.entry);
            } else {
                layer.push(expanded.entry);
            }
        }
        Ok((layer, merges))
    }
}

/// Point `target` at a merged output, keeping its key and content pack and
/// requiring every other pack the merge drew on.
fn merged_entry(target: ResourceEntry, output: PathBuf, packs: Vec<String>) -> ResourceEntry {
    let modified = output_mtime(&output).unwrap_or(target.last_updated);
    let extra: Vec<String> = packs
        .into_iter()
        .filter(|pack| target.content_pack.as_deref() != Some(pack.as_str()))
        .collect();
    target
        .with_source_path(output)
        .with_last_updated(modified)
        .with_required_content_packs(extra)
}

/// Target packs followed by contributor packs, without duplicates.
fn merged_packs(target: Option<Vec<String>>, contributed: &[Contribution]) -> Vec<String> {
    let mut packs = target.unwrap_or_default();
    for pack in contributed.iter().flat_map(|c| &c.content_packs) {
        if !packs.contains(pack) {
            packs.push(pack.clone());
        }
    }
    packs
}

fn merge_failure(key: &ResourceKey, error: MergeError) -> MergeFailure {
    tracing::warn!(resource = %key, error = %error, "Merge failed, keeping unmerged resource");
    MergeFailure {
        key: key.clone(),
        path: error.path().clone(),
        reason: MergeFailureReason::Merge(error),
    }
}

fn output_mtime(path: &Path) -> Option<std::time::SystemTime> {
    path.metadata().and_then(|m| m.modified()).ok()
}
