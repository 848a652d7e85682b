//! Load cycle outcome.

use std::path::PathBuf;

use tempfile::TempDir;

use super::error::{MergeFailureReason, ModFailureReason};
use crate::catalog::{ResourceCatalog, ResourceKey};
use crate::merge::{CycleReport, MergeError};
use crate::mods::DiscoveryReport;
use crate::resolver::{ModDescriptor, ResolvedLoadOrder};

/// Discovery plus resolution, without touching the catalog or cache.
#[derive(Debug, Clone)]
pub struct LoadPlan {
    pub discovery: DiscoveryReport,
    /// Resolver input, in discovery order.
    pub descriptors: Vec<ModDescriptor>,
    pub resolution: ResolvedLoadOrder,
}

impl LoadPlan {
    /// Look up the descriptor built for a mod.
    pub fn descriptor(&self, name: &str) -> Option<&ModDescriptor> {
        self.descriptors.iter().find(|desc| desc.name() == name)
    }
}

/// A resolved mod that could not be applied.
#[derive(Debug)]
pub struct ModLoadFailure {
    pub name: String,
    pub reason: ModFailureReason,
}

/// A merge target that kept its unmerged entry.
#[derive(Debug)]
pub struct MergeFailure {
    pub key: ResourceKey,

    /// The file responsible for the failure.
    pub path: PathBuf,

    pub reason: MergeFailureReason,
}

/// Everything one load cycle produced.
#[derive(Debug)]
pub struct LoadReport {
    pub discovery: DiscoveryReport,
    pub resolution: ResolvedLoadOrder,

    /// Mods whose layer was applied, in load order.
    pub loaded: Vec<String>,

    pub failures: Vec<ModLoadFailure>,

    /// Targets served from the merge cache.
    pub merged: Vec<ResourceKey>,

    pub merge_failures: Vec<MergeFailure>,

    /// Cache writes that failed. The merges were still applied from
    /// scratch copies that live as long as this report.
    pub unpersisted: Vec<MergeError>,

    /// `None` when the merge cache could not be persisted.
    pub cache_cycle: Option<CycleReport>,

    /// The effective catalog.
    pub catalog: ResourceCatalog,

    /// Owns scratch outputs referenced by `catalog`.
    pub(super) scratch: Option<TempDir>,
}

impl LoadReport {
    /// Check if every discovered mod loaded and every merge succeeded.
    pub fn is_clean(&self) -> bool {
        self.discovery.skipped.is_empty()
            && self.resolution.excluded.is_empty()
            && self.failures.is_empty()
            && self.merge_failures.is_empty()
    }

    /// Check if some merged entries point at scratch copies that disappear
    /// with this report.
    pub fn uses_scratch(&self) -> bool {
        self.scratch.is_some()
    }

    /// Look up the failure recorded for a mod.
    pub fn failure(&self, name: &str) -> Option<&ModFailureReason> {
        self.failures
            .iter()
            .find(|failure| failure.name == name)
            .map(|failure| &failure.reason)
    }
}
