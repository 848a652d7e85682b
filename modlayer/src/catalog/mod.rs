//! Layered resource catalog with ownership filtering.
//!
//! The [`ResourceCatalog`] maintains a single logical view of every resource
//! the application can load, built by replaying layers in priority order:
//!
//! ```text
//! base layer ──► mod layer (1st in load order) ──► ... ──► merge-cache layer
//!   lowest                                                      highest
//! ```
//!
//! Each layer writes its entries keyed by `(type, id)`; whatever is applied
//! last wins. Two views are maintained side by side:
//!
//! - **all entries** - every entry regardless of ownership
//! - **owned entries** - only entries whose content pack the user owns
//!
//! Until ownership data arrives ([`OwnershipState::Unknown`]) everything is
//! treated as owned so early startup can still resolve resources.
//!
//! # Example
//!
//! ```
//! use modlayer::catalog::{ResourceCatalog, ResourceEntry, ResourceLayer};
//!
//! let mut catalog = ResourceCatalog::new();
//! catalog.reset(ResourceLayer::new("base").with_entry(
//!     ResourceEntry::new("WeaponDef", "laser", "/game/weapons/laser.json"),
//! ));
//! catalog.apply_layer(ResourceLayer::new("BetterLasers").with_entry(
//!     ResourceEntry::new("WeaponDef", "laser", "/mods/BetterLasers/laser.json"),
//! ));
//!
//! let entry = catalog.entry("WeaponDef", "laser", false).unwrap();
//! assert!(entry.source_path.starts_with("/mods"));
//! ```

mod entry;
mod index;
mod layer;
mod ownership;

pub use entry::{ResourceEntry, ResourceKey};
pub use index::ResourceCatalog;
pub use layer::ResourceLayer;
pub use ownership::OwnershipState;
