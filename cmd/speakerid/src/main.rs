//! Speaker identification CLI.

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod config;

use commands::{ConfigCommand, EnrollCommand, IdentifyCommand};

/// Speaker identification CLI.
///
/// Enrolls speakers from acoustic feature files and identifies the speaker
/// of test utterances against the enrolled set:
///   - enroll: build `<speaker>.json` embeddings from enrollment features
///   - identify: score a test manifest and report accuracy
///
/// Settings are read from ~/.speakerid/config.yaml; flags override them.
#[derive(Parser)]
#[command(name = "speakerid")]
#[command(about = "Closed-set speaker identification tool")]
#[command(version)]
pub struct Cli {
    /// Config file (default is ~/.speakerid/config.yaml)
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Output file for results (default: stdout)
    #[arg(short = 'o', long, global = true)]
    pub output: Option<String>,

    /// Output as JSON (for piping)
    #[arg(long, global = true)]
    pub json: bool,

    /// Verbose output
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage run configuration
    Config(ConfigCommand),
    /// Build enrollment embeddings from feature files
    Enroll(EnrollCommand),
    /// Identify test utterances and report accuracy
    Identify(IdentifyCommand),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match &cli.command {
        Commands::Config(cmd) => cmd.run(&cli),
        Commands::Enroll(cmd) => cmd.run(&cli),
        Commands::Identify(cmd) => cmd.run(&cli),
    }
}
