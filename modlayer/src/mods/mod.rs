//! Mod discovery on disk.
//!
//! A mod is a folder containing a `mod.json` manifest:
//!
//! ```text
//! mods/
//! ├── BetterLasers/
//! │   ├── mod.json
//! │   └── weapons/laser.json
//! └── UrbanPack/
//!     ├── mod.json
//!     └── names/
//! ```
//!
//! [`ModDiscovery`] turns the folders into [`DiscoveredMod`]s,
//! [`assign_declaration_order`] ranks them using the previous run's
//! [`LoadOrderFile`], and [`ModManifest::to_descriptor`] produces the
//! resolver input.

mod discovery;
mod load_order;
mod manifest;

pub use discovery::{DiscoveredMod, DiscoveryError, DiscoveryReport, ModDiscovery, SkipReason, SkippedMod};
pub use load_order::{assign_declaration_order, LoadOrderFile, LOAD_ORDER_FILE_NAME};
pub use manifest::{expand_entries, ExpandedEntry, ManifestEntry, ManifestError, ModManifest, MANIFEST_FILE_NAME};
