//! Conflict and dependency resolution for mod load ordering.
//!
//! [`resolve`] turns a set of [`ModDescriptor`]s into a [`ResolvedLoadOrder`]:
//! the names that will load, in an order where every mod comes after its
//! dependencies, plus an [`ExclusionReason`] for every mod that won't.
//!
//! # Algorithm
//!
//! ```text
//! candidates ──► conflict filter ──► dependency graph ──► stable Kahn sort
//!                     │                                         │
//!                     ▼                                         ▼
//!               Conflict { with }              MissingDependency / Cycle
//! ```
//!
//! 1. A mod declaring a conflict with any name in the original candidate set
//!    is excluded. Both sides of a mutual conflict are excluded.
//! 2. Surviving mods form a graph with an edge dependency → dependent for
//!    every dependency that also survived.
//! 3. Nodes are emitted Kahn-style. Ties are broken by declaration order,
//!    never by name, so the same input always yields the same output.
//! 4. Whatever never became ready is excluded as a missing dependency (when a
//!    dependency is absent) or as part of a cycle.
//!
//! Resolution never fails; reporting excluded mods is the caller's job.

mod descriptor;
mod sort;

pub use descriptor::ModDescriptor;
pub use sort::{resolve, ExclusionReason, ResolvedLoadOrder};
