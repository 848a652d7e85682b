//! Content pack ownership.

use std::collections::HashSet;

/// What the catalog knows about owned content packs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum OwnershipState {
    /// Ownership hasn't been loaded yet; every pack counts as owned.
    #[default]
    Unknown,

    /// Exactly these packs are owned.
    Known(HashSet<String>),
}

impl OwnershipState {
    /// Build a known ownership set.
    pub fn owned<I, S>(packs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        OwnershipState::Known(packs.into_iter().map(Into::into).collect())
    }

    /// Check if a content pack is owned.
    pub fn is_owned(&self, pack: &str) -> bool {
        match self {
            OwnershipState::Unknown => true,
            OwnershipState::Known(packs) => packs.contains(pack),
        }
    }

    /// Check if ownership data is available.
    pub fn is_known(&self) -> bool {
        matches!(self, OwnershipState::Known(_))
    }
}
