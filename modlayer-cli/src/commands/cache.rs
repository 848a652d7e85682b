//! Merge cache management CLI commands.

use clap::Subcommand;
use modlayer::config::ConfigFile;
use modlayer::loader::ModLoader;

use super::common::format_size;
use crate::error::CliError;

/// Cache action subcommands.
#[derive(Debug, Subcommand)]
pub enum CacheAction {
    /// Show merge cache statistics
    Stats,
    /// Delete every merged output and the cache index
    Clear,
}

/// Run a cache subcommand.
pub fn run(config: &ConfigFile, action: CacheAction) -> Result<(), CliError> {
    let mut cache = ModLoader::from_config(config).merge_cache();

    match action {
        CacheAction::Stats => {
            let stats = cache.stats();
            println!("Merge cache: {}", cache.cache_dir().display());
            println!("  Entries: {}", stats.entries);
            println!("  Size:    {}", format_size(stats.total_bytes));
            if stats.missing_outputs > 0 {
                println!("  Missing: {} (rebuilt on next load)", stats.missing_outputs);
            }
        }
        CacheAction::Clear => {
            println!("Clearing merge cache at: {}", cache.cache_dir().display());
            let removed = cache.clear()?;
            println!("Removed {} entries", removed);
        }
    }

    Ok(())
}
