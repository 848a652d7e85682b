//! CLI error type.

use thiserror::Error;

use modlayer::config::ConfigError;
use modlayer::loader::LoaderError;
use modlayer::merge::MergeError;

/// Errors reported by CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    ConfigFile(#[from] ConfigError),

    #[error("Load cycle failed: {0}")]
    Loader(#[from] LoaderError),

    #[error("Merge cache error: {0}")]
    Cache(#[from] MergeError),

    #[error("Failed to write output: {0}")]
    Output(#[from] std::io::Error),
}
