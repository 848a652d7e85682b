//! The persisted load-order hint.
//!
//! After each cycle the resolved order is written to `load_order.json`. On
//! the next start mods named there keep their relative order and come first,
//! so adding a mod never reshuffles the ones already installed.

use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};

/// Default file name of the hint.
pub const LOAD_ORDER_FILE_NAME: &str = "load_order.json";

/// A JSON array of mod names on disk.
#[derive(Debug, Clone)]
pub struct LoadOrderFile {
    path: PathBuf,
}

impl LoadOrderFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the previous order.
    ///
    /// A missing or corrupt file yields an empty hint.
    pub fn load(&self) -> Vec<String> {
        let data = match std::fs::read(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Cannot read load order");
                return Vec::new();
            }
        };

        match serde_json::from_slice(&data) {
            Ok(order) => order,
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Ignoring corrupt load order file"
                );
                Vec::new()
            }
        }
    }

    /// Write `order` atomically.
    pub fn save(&self, order: &[String]) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_vec_pretty(order)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        let temp_path = self.path.with_extension("json.tmp");
        std::fs::write(&temp_path, json)?;
        std::fs::rename(&temp_path, &self.path)?;

        tracing::debug!(path = %self.path.display(), mods = order.len(), "Saved load order");
        Ok(())
    }
}

/// Assign declaration order to `discovered` names.
///
/// Names found in `previous` come first in their previous relative order,
/// the rest follow in discovery order.
pub fn assign_declaration_order<'a, I>(previous: &[String], discovered: I) -> HashMap<String, usize>
where
    I: IntoIterator<Item = &'a str>,
{
    let discovered: Vec<&str> = discovered.into_iter().collect();
    let present: HashSet<&str> = discovered.iter().copied().collect();

    let mut order = HashMap::with_capacity(discovered.len());
    let known = previous
        .iter()
        .map(String::as_str)
        .filter(|name| present.contains(name));

    for name in known.chain(discovered.iter().copied()) {
        if !order.contains_key(name) {
            let next = order.len();
            order.insert(name.to_string(), next);
        }
    }
    order
}
