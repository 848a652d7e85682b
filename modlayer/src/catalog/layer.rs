//! Resource layers replayed into the catalog.

use super::entry::ResourceEntry;
use super::ownership::OwnershipState;

/// An ordered set of entries contributed by one source.
///
/// The base catalog, each mod and the merge cache each provide one layer.
/// Within a layer later entries win over earlier ones with the same key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceLayer {
    /// Layer name (mod name, "base", ...).
    pub name: String,

    /// Entries in declaration order.
    pub entries: Vec<ResourceEntry>,

    /// Content packs required by every entry of this layer.
    pub required_content_packs: Vec<String>,

    /// Entries only reach the owned-only view.
    pub owned_only: bool,
}

impl ResourceLayer {
    /// Create an empty layer.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: Vec::new(),
            required_content_packs: Vec::new(),
            owned_only: false,
        }
    }

    /// Add an entry (builder pattern).
    pub fn with_entry(mut self, entry: ResourceEntry) -> Self {
        self.entries.push(entry);
        self
    }

    /// Add several entries (builder pattern).
    pub fn with_entries(mut self, entries: impl IntoIterator<Item = ResourceEntry>) -> Self {
        self.entries.extend(entries);
        self
    }

    /// Require content packs for the whole layer.
    pub fn with_required_content_packs<I, S>(mut self, packs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_content_packs
            .extend(packs.into_iter().map(Into::into));
        self
    }

    /// Keep the layer out of the unfiltered view (builder pattern).
    ///
    /// Used for merges built from owned inputs only; the unfiltered view
    /// gets its own merge.
    pub fn owned_only(mut self) -> Self {
        self.owned_only = true;
        self
    }

    /// Append an entry.
    pub fn push(&mut self, entry: ResourceEntry) {
        self.entries.push(entry);
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the layer has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether `entry` of this layer is visible under `ownership`.
    pub(crate) fn is_owned(&self, entry: &ResourceEntry, ownership: &OwnershipState) -> bool {
        self.content_packs(entry).iter().all(|pack| ownership.is_owned(pack))
    }

    /// Every pack `entry` of this layer needs, layer requirements first.
    pub fn content_packs(&self, entry: &ResourceEntry) -> Vec<String> {
        let mut packs: Vec<String> = Vec::new();
        for pack in self
            .required_content_packs
            .iter()
            .map(String::as_str)
            .chain(entry.content_packs())
        {
            if !packs.iter().any(|p| p == pack) {
                packs.push(pack.to_string());
            }
        }
        packs
    }
}
