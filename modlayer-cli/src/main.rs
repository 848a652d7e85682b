//! modlayer CLI - command-line interface
//!
//! Inspect load orders, run load cycles and manage the merge cache from the
//! command line.

mod commands;
mod error;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use commands::cache::CacheAction;
use commands::config::ConfigCommands;
use error::CliError;

#[derive(Debug, Parser)]
#[command(name = "modlayer", version, about = "Deterministic mod loading")]
struct Cli {
    /// Configuration file (default: ~/.modlayer/config.ini)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print the resolved load order and every exclusion
    Resolve,

    /// Run a full load cycle and print a summary
    Load {
        /// Owned content packs (overrides [content] owned_packs)
        #[arg(long, value_name = "PACK", num_args = 1..)]
        owned: Vec<String>,
    },

    /// List effective catalog entries after a load cycle
    Catalog {
        /// Only list this resource type
        #[arg(long = "type", value_name = "TYPE")]
        resource_type: Option<String>,

        /// Hide entries whose content packs are not owned
        #[arg(long)]
        owned: bool,
    },

    /// Inspect or clear the merge cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// Show or create the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    // `config init` must work without a readable config file.
    if let Commands::Config { action } = &cli.command {
        if matches!(action, ConfigCommands::Init { .. } | ConfigCommands::Path) {
            return commands::config::run(action, cli.config.as_deref(), None);
        }
    }

    let config = commands::common::load_config(cli.config.as_deref())?;
    let _log_guard = commands::common::init_logging(&config, cli.verbose);
    tracing::debug!(command = ?cli.command, "Running command");

    match cli.command {
        Commands::Resolve => commands::resolve::run(&config),
        Commands::Load { owned } => commands::load::run(&config, owned),
        Commands::Catalog {
            resource_type,
            owned,
        } => commands::catalog::run(&config, resource_type.as_deref(), owned),
        Commands::Cache { action } => commands::cache::run(&config, action),
        Commands::Config { action } => {
            commands::config::run(&action, cli.config.as_deref(), Some(&config))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_load_with_owned_packs() {
        let cli = Cli::try_parse_from(["modlayer", "load", "--owned", "urban", "heavy"]).unwrap();
        match cli.command {
            Commands::Load { owned } => assert_eq!(owned, vec!["urban", "heavy"]),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_global_flags_after_subcommand() {
        let cli =
            Cli::try_parse_from(["modlayer", "catalog", "--type", "WeaponDef", "-v", "--config", "x.ini"])
                .unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("x.ini")));
        assert!(matches!(
            cli.command,
            Commands::Catalog { resource_type: Some(ref t), owned: false } if t == "WeaponDef"
        ));
    }

    #[test]
    fn test_parse_cache_clear() {
        let cli = Cli::try_parse_from(["modlayer", "cache", "clear"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Cache {
                action: CacheAction::Clear
            }
        ));
    }

    #[test]
    fn test_command_is_required() {
        assert!(Cli::try_parse_from(["modlayer"]).is_err());
    }
}
