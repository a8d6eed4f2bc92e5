//! Config command.

use std::path::PathBuf;

use clap::{Args, Subcommand};

use super::{get_config, output_result};
use crate::config::RunConfig;
use crate::Cli;

/// Manage run configuration.
#[derive(Args)]
pub struct ConfigCommand {
    #[command(subcommand)]
    command: ConfigSubcommand,
}

#[derive(Subcommand)]
enum ConfigSubcommand {
    /// Print the effective configuration
    Show,
    /// Write a configuration file with default settings
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

impl ConfigCommand {
    pub fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        match &self.command {
            ConfigSubcommand::Show => {
                let cfg = get_config(cli)?;
                output_result(&cfg, cli.output.as_deref(), cli.json)
            }
            ConfigSubcommand::Init { force } => {
                let path = match &cli.config {
                    Some(p) => PathBuf::from(p),
                    None => RunConfig::default_path()
                        .ok_or_else(|| anyhow::anyhow!("cannot determine home directory"))?,
                };
                if path.exists() && !force {
                    anyhow::bail!("{} already exists, use --force to overwrite", path.display());
                }
                RunConfig::default().save(&path)?;
                println!("Wrote {}", path.display());
                Ok(())
            }
        }
    }
}
