//! The load cycle.
//!
//! [`ModLoader::run`] drives one complete startup sequence:
//!
//! ```text
//! discover ──► rank (load_order.json) ──► resolve
//!                                            │
//!      ┌─────────────────────────────────────┘
//!      ▼
//! reset catalog with base layer
//!      │
//!      ▼
//! for each resolved mod:  expand manifest ──► replace entries ──► layer
//!                                        └──► merge entries ───► contributions
//!      │
//!      ▼
//! merge cache ──► "merge-cache-owned" + "merge-cache" layers
//!      │
//!      ▼
//! prune + persist cache ──► save load order
//! ```
//!
//! Each merge target is merged once for the unfiltered view. When that merge
//! draws on a content pack the user does not own, the owned-only view gets a
//! second merge built from its own target and the owned contributions only.
//!
//! Individual failures (an excluded mod, a broken manifest, a malformed merge
//! contribution) are collected in the [`LoadReport`]; only discovery and base
//! manifest problems abort the cycle.

mod error;
mod report;
mod sequence;

pub use error::{LoaderError, MergeFailureReason, ModFailureReason};
pub use report::{LoadPlan, LoadReport, MergeFailure, ModLoadFailure};
pub use sequence::{ModLoader, BASE_LAYER_NAME, MERGE_LAYER_NAME, OWNED_MERGE_LAYER_NAME};
