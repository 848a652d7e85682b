//! modlayer - deterministic mod loading for moddable applications
//!
//! This library resolves which third-party content packages ("mods") load and
//! in which order, replays their declared resources over a default catalog,
//! and caches merged artifacts when several mods contribute to the same
//! resource.
//!
//! # Components
//!
//! - [`resolver`] - conflict filtering and stable topological load ordering
//! - [`catalog`] - typed, layered resource index with ownership filtering
//! - [`merge`] - persisted, timestamp-keyed merge cache
//! - [`mods`] - `mod.json` discovery and the load-order hint file
//! - [`loader`] - the startup sequence tying everything together
//!
//! # Example
//!
//! ```ignore
//! use modlayer::config::ConfigFile;
//! use modlayer::loader::ModLoader;
//! use modlayer::catalog::OwnershipState;
//!
//! let config = ConfigFile::load()?;
//! let report = ModLoader::from_config(&config).run(OwnershipState::Unknown)?;
//!
//! for (name, reason) in &report.resolution.excluded {
//!     println!("{} not loaded: {}", name, reason);
//! }
//! ```

pub mod catalog;
pub mod config;
pub mod loader;
pub mod logging;
pub mod merge;
pub mod mods;
pub mod resolver;

/// Library version, recorded in persisted state files.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
