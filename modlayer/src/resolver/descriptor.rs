//! Mod descriptor consumed by the resolver.

use std::collections::BTreeSet;

/// The resolver's view of a single mod.
///
/// Descriptors are built once at discovery time and never mutated afterwards.
/// `declaration_order` decides which ready mod loads first (discovery order,
/// or the previous run's load order for known mods). Equal values fall back
/// to the order descriptors are handed to the resolver.
///
/// # Example
///
/// ```
/// use modlayer::resolver::ModDescriptor;
///
/// let desc = ModDescriptor::new("BetterWeapons", 3)
///     .with_dependency("CoreLib")
///     .with_conflict("OldWeapons");
///
/// assert_eq!(desc.name(), "BetterWeapons");
/// assert!(desc.depends_on().contains("CoreLib"));
/// assert!(desc.conflicts_with().contains("OldWeapons"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModDescriptor {
    name: String,
    depends_on: BTreeSet<String>,
    optionally_depends_on: BTreeSet<String>,
    conflicts_with: BTreeSet<String>,
    declaration_order: usize,
}

impl ModDescriptor {
    /// Create a descriptor with no dependencies or conflicts.
    pub fn new(name: impl Into<String>, declaration_order: usize) -> Self {
        Self {
            name: name.into(),
            depends_on: BTreeSet::new(),
            optionally_depends_on: BTreeSet::new(),
            conflicts_with: BTreeSet::new(),
            declaration_order,
        }
    }

    /// Add a hard dependency.
    pub fn with_dependency(mut self, name: impl Into<String>) -> Self {
        self.depends_on.insert(name.into());
        self
    }

    /// Add several hard dependencies.
    pub fn with_dependencies<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.depends_on.extend(names.into_iter().map(Into::into));
        self
    }

    /// Add dependencies that only order the mod when the target is loadable.
    pub fn with_optional_dependencies<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.optionally_depends_on
            .extend(names.into_iter().map(Into::into));
        self
    }

    /// Add a declared conflict.
    pub fn with_conflict(mut self, name: impl Into<String>) -> Self {
        self.conflicts_with.insert(name.into());
        self
    }

    /// Add several declared conflicts.
    pub fn with_conflicts<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.conflicts_with
            .extend(names.into_iter().map(Into::into));
        self
    }

    /// Unique mod name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Names this mod requires.
    pub fn depends_on(&self) -> &BTreeSet<String> {
        &self.depends_on
    }

    /// Names this mod loads after when they are present.
    pub fn optionally_depends_on(&self) -> &BTreeSet<String> {
        &self.optionally_depends_on
    }

    /// Names this mod refuses to load alongside.
    pub fn conflicts_with(&self) -> &BTreeSet<String> {
        &self.conflicts_with
    }

    /// Position in which the mod was declared.
    pub fn declaration_order(&self) -> usize {
        self.declaration_order
    }
}
