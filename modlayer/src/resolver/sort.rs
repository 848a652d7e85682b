//! Conflict filtering and stable topological ordering.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet, BinaryHeap, HashMap, HashSet};

use thiserror::Error;

use super::descriptor::ModDescriptor;

/// Why a mod was left out of the load order.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExclusionReason {
    /// The mod declares a conflict with mods present in the candidate set.
    #[error("conflicts with {}", quoted(.with))]
    Conflict { with: Vec<String> },

    /// The mod depends on names that are not loadable.
    #[error("missing dependencies: {}", quoted(.missing))]
    MissingDependency { missing: Vec<String> },

    /// The mod only becomes ready through a dependency cycle.
    #[error("dependency cycle through {}", quoted(.waiting_on))]
    Cycle { waiting_on: Vec<String> },
}

impl ExclusionReason {
    /// Check if this is a conflict exclusion.
    pub fn is_conflict(&self) -> bool {
        matches!(self, ExclusionReason::Conflict { .. })
    }

    /// Check if this is a missing dependency exclusion.
    pub fn is_missing_dependency(&self) -> bool {
        matches!(self, ExclusionReason::MissingDependency { .. })
    }

    /// Check if this is a cycle exclusion.
    pub fn is_cycle(&self) -> bool {
        matches!(self, ExclusionReason::Cycle { .. })
    }
}

fn quoted(names: &[String]) -> String {
    names
        .iter()
        .map(|n| format!("\"{}\"", n))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Output of [`resolve`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedLoadOrder {
    /// Mods that will load, dependencies first.
    pub order: Vec<String>,

    /// Every rejected mod and the reason it was rejected.
    pub excluded: BTreeMap<String, ExclusionReason>,
}

impl ResolvedLoadOrder {
    /// Position of a mod in the load order.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.order.iter().position(|n| n == name)
    }

    /// Check if a mod made it into the load order.
    pub fn is_loaded(&self, name: &str) -> bool {
        self.position(name).is_some()
    }
}

/// Resolve a deterministic load order.
///
/// Candidates are visited in ascending `declaration_order`. Descriptors
/// sharing the same order keep the order `mods` yields them in, so callers
/// wanting a reproducible result pass an ordered collection. A name seen
/// twice keeps its first descriptor.
pub fn resolve<'a, I>(mods: I) -> ResolvedLoadOrder
where
    I: IntoIterator<Item = &'a ModDescriptor>,
{
    let mut seen: HashSet<&str> = HashSet::new();
    let mut candidates: Vec<(&str, &ModDescriptor)> = Vec::new();
    for desc in mods {
        if seen.insert(desc.name()) {
            candidates.push((desc.name(), desc));
        } else {
            tracing::debug!(name = %desc.name(), "Ignoring duplicate mod descriptor");
        }
    }
    // Stable: equal ranks stay in first-seen order.
    candidates.sort_by_key(|(_, desc)| desc.declaration_order());

    let mut excluded = BTreeMap::new();

    // Conflicts are checked against the original candidate set, so both
    // sides of a mutual conflict drop out.
    let candidate_names: HashSet<&str> = candidates.iter().map(|(name, _)| *name).collect();
    let mut survivors: Vec<(&str, &ModDescriptor)> = Vec::with_capacity(candidates.len());
    for (name, desc) in candidates {
        let with: Vec<String> = desc
            .conflicts_with()
            .iter()
            .filter(|c| c.as_str() != name && candidate_names.contains(c.as_str()))
            .cloned()
            .collect();

        if with.is_empty() {
            survivors.push((name, desc));
        } else {
            excluded.insert(name.to_string(), ExclusionReason::Conflict { with });
        }
    }

    // Survivor index doubles as declaration rank.
    let index: HashMap<&str, usize> = survivors
        .iter()
        .enumerate()
        .map(|(i, (name, _))| (*name, i))
        .collect();

    let mut required: Vec<BTreeSet<&str>> = Vec::with_capacity(survivors.len());
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); survivors.len()];
    for (i, (_, desc)) in survivors.iter().enumerate() {
        let mut deps: BTreeSet<&str> = desc.depends_on().iter().map(String::as_str).collect();
        deps.extend(
            desc.optionally_depends_on()
                .iter()
                .map(String::as_str)
                .filter(|d| index.contains_key(d)),
        );

        for dep in &deps {
            if let Some(&j) = index.get(dep) {
                dependents[j].push(i);
            }
        }
        required.push(deps);
    }

    // Absent dependencies are counted but never decremented, which keeps
    // those nodes pending forever.
    let mut pending: Vec<usize> = required.iter().map(BTreeSet::len).collect();
    let mut ready: BinaryHeap<Reverse<usize>> = pending
        .iter()
        .enumerate()
        .filter(|(_, count)| **count == 0)
        .map(|(i, _)| Reverse(i))
        .collect();

    let mut emitted = vec![false; survivors.len()];
    let mut order = Vec::with_capacity(survivors.len());
    while let Some(Reverse(i)) = ready.pop() {
        emitted[i] = true;
        order.push(survivors[i].0.to_string());

        for &dependent in &dependents[i] {
            pending[dependent] -= 1;
            if pending[dependent] == 0 {
                ready.push(Reverse(dependent));
            }
        }
    }

    for (i, (name, _)) in survivors.iter().enumerate() {
        if emitted[i] {
            continue;
        }

        let missing: Vec<String> = required[i]
            .iter()
            .filter(|d| !index.contains_key(*d))
            .map(|d| d.to_string())
            .collect();

        let reason = if missing.is_empty() {
            let waiting_on = required[i]
                .iter()
                .filter(|d| index.get(*d).map(|&j| !emitted[j]).unwrap_or(false))
                .map(|d| d.to_string())
                .collect();
            ExclusionReason::Cycle { waiting_on }
        } else {
            ExclusionReason::MissingDependency { missing }
        };

        excluded.insert(name.to_string(), reason);
    }

    tracing::debug!(
        loaded = order.len(),
        excluded = excluded.len(),
        "Resolved mod load order"
    );

    ResolvedLoadOrder { order, excluded }
}
