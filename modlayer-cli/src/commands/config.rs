//! Configuration CLI commands.
//!
//! Provides `config show`, `config init` and `config path`.

use std::path::{Path, PathBuf};

use clap::Subcommand;
use modlayer::config::{config_file_path, ConfigFile};

use crate::error::CliError;

/// Config subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Print the effective configuration
    Show,

    /// Write a configuration file with default values
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Show the configuration file path
    Path,
}

/// Run a config subcommand.
///
/// `loaded` is the configuration already read for `show`.
pub fn run(
    command: &ConfigCommands,
    path: Option<&Path>,
    loaded: Option<&ConfigFile>,
) -> Result<(), CliError> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(config_file_path);

    match command {
        ConfigCommands::Show => {
            let config = loaded.cloned().unwrap_or_default();
            run_show(&config, &path)
        }
        ConfigCommands::Init { force } => run_init(&path, *force),
        ConfigCommands::Path => {
            println!("{}", path.display());
            Ok(())
        }
    }
}

fn run_show(config: &ConfigFile, path: &Path) -> Result<(), CliError> {
    if path.exists() {
        println!("; {}", path.display());
    } else {
        println!("; {} (not found, showing defaults)", path.display());
    }
    config.to_ini().write_to(&mut std::io::stdout())?;
    Ok(())
}

fn run_init(path: &PathBuf, force: bool) -> Result<(), CliError> {
    if path.exists() && !force {
        return Err(CliError::Config(format!(
            "{} already exists. Use 'modlayer config init --force' to overwrite it.",
            path.display()
        )));
    }

    ConfigFile::default().save_to(path)?;
    println!("Configuration file: {}", path.display());
    println!();
    println!("Edit this file to point modlayer at your mods and content.");
    Ok(())
}
