//! Merge cache errors.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for merge operations.
pub type MergeResult<T> = Result<T, MergeError>;

/// Errors that abort a single merge.
#[derive(Debug, Error)]
pub enum MergeError {
    /// A base or contributing file could not be parsed.
    #[error("failed to parse {}: {reason}", .path.display())]
    Parse { path: PathBuf, reason: String },

    /// Reading an input or writing the cache failed.
    #[error("cache I/O error at {}: {source}", .path.display())]
    CacheIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl MergeError {
    /// The file the error is about.
    pub fn path(&self) -> &PathBuf {
        match self {
            MergeError::Parse { path, .. } => path,
            MergeError::CacheIo { path, .. } => path,
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        MergeError::CacheIo {
            path: path.into(),
            source,
        }
    }
}
