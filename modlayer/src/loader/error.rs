//! Loader errors and per-item failure reasons.

use std::path::PathBuf;

use thiserror::Error;

use crate::merge::MergeError;
use crate::mods::{DiscoveryError, ManifestError};

/// Errors that abort a whole load cycle.
#[derive(Debug, Error)]
pub enum LoaderError {
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    #[error("cannot read base manifest {}: {source}", .path.display())]
    BaseManifestRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid base manifest {}: {source}", .path.display())]
    BaseManifestParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid base manifest entry: {0}")]
    BaseManifestEntry(#[source] ManifestError),
}

/// Why a resolved mod was not applied.
#[derive(Debug, Error)]
pub enum ModFailureReason {
    #[error("invalid manifest: {0}")]
    ManifestInvalid(#[from] ManifestError),

    #[error("depends on \"{0}\", which failed to load")]
    DependencyFailed(String),
}

/// Why a merge target kept its unmerged entry.
#[derive(Debug, Error)]
pub enum MergeFailureReason {
    #[error("no resource to merge into")]
    MissingTarget,

    #[error(transparent)]
    Merge(#[from] MergeError),
}
