//! Load command - run a full load cycle and summarize it.

use modlayer::catalog::OwnershipState;
use modlayer::config::ConfigFile;
use modlayer::loader::{LoadReport, ModLoader};

use crate::error::CliError;

/// Ownership from `--owned`, falling back to the configuration.
pub fn ownership(config: &ConfigFile, owned: Vec<String>) -> OwnershipState {
    if owned.is_empty() {
        config.content.ownership()
    } else {
        OwnershipState::owned(owned)
    }
}

/// Run the load command.
pub fn run(config: &ConfigFile, owned: Vec<String>) -> Result<(), CliError> {
    let report = ModLoader::from_config(config).run(ownership(config, owned))?;
    print_summary(&report);
    Ok(())
}

fn print_summary(report: &LoadReport) {
    println!("Loaded {} mods:", report.loaded.len());
    for name in &report.loaded {
        println!("  {}", name);
    }

    if !report.resolution.excluded.is_empty() {
        println!();
        println!("Excluded:");
        for (name, reason) in &report.resolution.excluded {
            println!("  {}: {}", name, reason);
        }
    }

    if !report.failures.is_empty() {
        println!();
        println!("Failed:");
        for failure in &report.failures {
            println!("  {}: {}", failure.name, failure.reason);
        }
    }

    if !report.merge_failures.is_empty() {
        println!();
        println!("Merge failures (unmerged resource kept):");
        for failure in &report.merge_failures {
            println!(
                "  {} ({}): {}",
                failure.key,
                failure.path.display(),
                failure.reason
            );
        }
    }

    if !report.unpersisted.is_empty() {
        println!();
        println!("Merge cache writes failed (merged for this run only):");
        for error in &report.unpersisted {
            println!("  {}", error);
        }
    }

    println!();
    println!(
        "Catalog: {} entries ({} owned), {} merged",
        report.catalog.len(),
        report.catalog.owned_len(),
        report.merged.len()
    );
    match &report.cache_cycle {
        Some(cycle) => println!(
            "Merge cache: {} kept, {} pruned",
            cycle.kept, cycle.pruned
        ),
        None => println!("Merge cache: not persisted (see log)"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_packs_override_config() {
        let mut config = ConfigFile::default();
        config.content.owned_packs = Some(vec!["urban".to_string()]);

        let state = ownership(&config, vec!["heavy".to_string()]);
        assert!(state.is_owned("heavy"));
        assert!(!state.is_owned("urban"));

        let state = ownership(&config, Vec::new());
        assert!(state.is_owned("urban"));
    }
}
