//! Resolve command - print the load order without loading anything.

use modlayer::config::ConfigFile;
use modlayer::loader::ModLoader;

use crate::error::CliError;

/// Run the resolve command.
pub fn run(config: &ConfigFile) -> Result<(), CliError> {
    let plan = ModLoader::from_config(config).plan()?;

    println!("Load order ({} mods):", plan.resolution.order.len());
    for (i, name) in plan.resolution.order.iter().enumerate() {
        println!("  {:>3}. {}", i + 1, name);
    }

    if !plan.resolution.excluded.is_empty() {
        println!();
        println!("Excluded:");
        for (name, reason) in &plan.resolution.excluded {
            println!("  {}: {}", name, reason);
        }
    }

    if !plan.discovery.skipped.is_empty() {
        println!();
        println!("Skipped:");
        for skipped in &plan.discovery.skipped {
            let name = skipped.name.as_deref().unwrap_or("?");
            println!(
                "  {} ({}): {}",
                name,
                skipped.manifest_path.display(),
                skipped.reason
            );
        }
    }

    Ok(())
}
