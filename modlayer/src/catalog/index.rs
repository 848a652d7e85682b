//! The layered resource catalog.

use std::collections::{BTreeMap, BTreeSet};

use super::entry::ResourceEntry;
use super::layer::ResourceLayer;
use super::ownership::OwnershipState;

/// `type -> id -> entry`, ordered for deterministic listings.
type TypedIndex = BTreeMap<String, BTreeMap<String, ResourceEntry>>;

/// Typed, multi-layer index of resource entries.
///
/// Layers are recorded in the order they are applied so the whole catalog
/// can be replayed when ownership data changes. Mutation must be driven by a
/// single owner; once a load cycle is finished any number of readers may
/// query the catalog.
#[derive(Debug, Clone, Default)]
pub struct ResourceCatalog {
    /// Applied layers, lowest priority first.
    layers: Vec<ResourceLayer>,

    /// Every entry, last applied wins.
    all: TypedIndex,

    /// Owned entries only, last owned entry wins.
    owned: TypedIndex,

    /// Types registered for each id.
    id_types: BTreeMap<String, BTreeSet<String>>,

    /// Current ownership data.
    ownership: OwnershipState,

    /// Set by any apply or ownership change, cleared by [`rebuild`](Self::rebuild).
    dirty: bool,
}

impl ResourceCatalog {
    /// Create an empty catalog with unknown ownership.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty catalog with the given ownership data.
    pub fn with_ownership(ownership: OwnershipState) -> Self {
        Self {
            ownership,
            ..Self::default()
        }
    }

    /// Clear both views and replay `base` as the only layer.
    pub fn reset(&mut self, base: ResourceLayer) {
        self.layers.clear();
        self.clear_indices();
        self.write_layer(&base);
        self.layers.push(base);
        self.dirty = false;
    }

    /// Apply a layer on top of everything applied so far.
    ///
    /// Re-applying a layer with the same name replaces the earlier copy and
    /// replays the catalog at once, so applying an identical layer twice
    /// changes nothing and a changed copy leaves no stale entries behind.
    pub fn apply_layer(&mut self, layer: ResourceLayer) {
        tracing::debug!(
            layer = %layer.name,
            entries = layer.len(),
            "Applying resource layer"
        );

        let before = self.layers.len();
        self.layers.retain(|l| l.name != layer.name);
        let replaced = self.layers.len() != before;

        self.write_layer(&layer);
        self.layers.push(layer);
        self.dirty = true;

        if replaced {
            self.rebuild();
        }
    }

    /// Replace the ownership data.
    ///
    /// The owned view is stale until [`rebuild`](Self::rebuild) is called.
    pub fn set_ownership(&mut self, ownership: OwnershipState) {
        if self.ownership != ownership {
            self.ownership = ownership;
            self.dirty = true;
        }
    }

    /// Replay every recorded layer from scratch.
    ///
    /// Returns `false` without doing anything when nothing changed since the
    /// last reset or rebuild.
    pub fn rebuild(&mut self) -> bool {
        if !self.dirty {
            return false;
        }

        self.clear_indices();
        let layers = std::mem::take(&mut self.layers);
        for layer in &layers {
            self.write_layer(layer);
        }
        self.layers = layers;
        self.dirty = false;

        tracing::debug!(
            layers = self.layers.len(),
            entries = self.len(),
            owned = self.owned_len(),
            "Rebuilt resource catalog"
        );
        true
    }

    fn clear_indices(&mut self) {
        self.all.clear();
        self.owned.clear();
        self.id_types.clear();
    }

    fn write_layer(&mut self, layer: &ResourceLayer) {
        for entry in &layer.entries {
            if layer.is_owned(entry, &self.ownership) {
                self.owned
                    .entry(entry.resource_type.clone())
                    .or_default()
                    .insert(entry.id.clone(), entry.clone());
            }

            if layer.owned_only {
                continue;
            }

            self.id_types
                .entry(entry.id.clone())
                .or_default()
                .insert(entry.resource_type.clone());

            self.all
                .entry(entry.resource_type.clone())
                .or_default()
                .insert(entry.id.clone(), entry.clone());
        }
    }

    fn view(&self, filter_by_ownership: bool) -> &TypedIndex {
        if filter_by_ownership {
            &self.owned
        } else {
            &self.all
        }
    }

    /// Look up the effective entry for `(resource_type, id)`.
    pub fn entry(
        &self,
        resource_type: &str,
        id: &str,
        filter_by_ownership: bool,
    ) -> Option<&ResourceEntry> {
        self.view(filter_by_ownership)
            .get(resource_type)
            .and_then(|by_id| by_id.get(id))
    }

    /// Content packs the effective entry for `(resource_type, id)` needs,
    /// including those its layer requires.
    pub fn content_packs(
        &self,
        resource_type: &str,
        id: &str,
        filter_by_ownership: bool,
    ) -> Option<Vec<String>> {
        self.layers.iter().rev().find_map(|layer| {
            if layer.owned_only && !filter_by_ownership {
                return None;
            }
            layer
                .entries
                .iter()
                .rev()
                .find(|e| {
                    e.resource_type == resource_type
                        && e.id == id
                        && (!filter_by_ownership || layer.is_owned(e, &self.ownership))
                })
                .map(|e| layer.content_packs(e))
        })
    }

    /// All effective entries, ordered by type then id.
    pub fn all_entries(&self, filter_by_ownership: bool) -> Vec<&ResourceEntry> {
        self.view(filter_by_ownership)
            .values()
            .flat_map(|by_id| by_id.values())
            .collect()
    }

    /// Effective entries of one type, ordered by id.
    pub fn entries_of_type(
        &self,
        resource_type: &str,
        filter_by_ownership: bool,
    ) -> Vec<&ResourceEntry> {
        self.view(filter_by_ownership)
            .get(resource_type)
            .map(|by_id| by_id.values().collect())
            .unwrap_or_default()
    }

    /// Every entry registered under `id`, one per type, ignoring ownership.
    pub fn entries_by_id(&self, id: &str) -> Vec<&ResourceEntry> {
        self.id_types
            .get(id)
            .map(|types| {
                types
                    .iter()
                    .filter_map(|t| self.entry(t, id, false))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// All resource types present in the catalog.
    pub fn resource_types(&self) -> Vec<&str> {
        self.all.keys().map(String::as_str).collect()
    }

    /// Names of applied layers, lowest priority first.
    pub fn layer_names(&self) -> Vec<&str> {
        self.layers.iter().map(|l| l.name.as_str()).collect()
    }

    /// Current ownership data.
    pub fn ownership(&self) -> &OwnershipState {
        &self.ownership
    }

    /// Check if a rebuild is pending.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Number of entries in the unfiltered view.
    pub fn len(&self) -> usize {
        self.all.values().map(BTreeMap::len).sum()
    }

    /// Number of entries in the owned view.
    pub fn owned_len(&self) -> usize {
        self.owned.values().map(BTreeMap::len).sum()
    }

    /// Check if the catalog has no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
