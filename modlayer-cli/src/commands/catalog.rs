//! Catalog command - list effective entries after a load cycle.

use modlayer::config::ConfigFile;
use modlayer::loader::ModLoader;

use crate::error::CliError;

/// Run the catalog command.
pub fn run(
    config: &ConfigFile,
    resource_type: Option<&str>,
    owned_only: bool,
) -> Result<(), CliError> {
    let report = ModLoader::from_config(config).run(config.content.ownership())?;
    let catalog = &report.catalog;

    let entries = match resource_type {
        Some(t) => catalog.entries_of_type(t, owned_only),
        None => catalog.all_entries(owned_only),
    };

    for entry in &entries {
        match &entry.content_pack {
            Some(pack) => println!(
                "{}\t{}\t[{}]",
                entry.key(),
                entry.source_path.display(),
                pack
            ),
            None => println!("{}\t{}", entry.key(), entry.source_path.display()),
        }
    }

    eprintln!("{} entries", entries.len());
    Ok(())
}
