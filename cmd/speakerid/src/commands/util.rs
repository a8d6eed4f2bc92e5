//! Utility functions for CLI commands.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Args;
use speakerid::{EnrollmentTable, Manifest, ProjectionModel};

use crate::config::RunConfig;
use crate::Cli;

/// Model and embedding flags shared by `enroll` and `identify`.
#[derive(Args, Debug, Default)]
pub struct ModelArgs {
    /// Directory holding checkpoint files
    #[arg(long)]
    pub log_dir: Option<PathBuf>,

    /// Checkpoint index to restore
    #[arg(long)]
    pub checkpoint: Option<u32>,

    /// Segment length in frames
    #[arg(long)]
    pub test_frames: Option<usize>,

    /// Target L2 norm of utterance embeddings
    #[arg(long)]
    pub alpha: Option<f32>,

    /// Directory of enrollment embeddings
    #[arg(long)]
    pub embedding_dir: Option<PathBuf>,
}

impl ModelArgs {
    /// Overrides config values with the flags that were given.
    pub fn apply(&self, cfg: &mut RunConfig) {
        if let Some(dir) = &self.log_dir {
            cfg.log_dir = dir.clone();
        }
        if let Some(n) = self.checkpoint {
            cfg.checkpoint = n;
        }
        if let Some(t) = self.test_frames {
            cfg.test_frames = t;
        }
        if let Some(a) = self.alpha {
            cfg.alpha = a;
        }
        if let Some(dir) = &self.embedding_dir {
            cfg.embedding_dir = dir.clone();
        }
    }
}

/// Gets the run configuration.
pub fn get_config(cli: &Cli) -> anyhow::Result<RunConfig> {
    RunConfig::load(cli.config.as_deref().map(Path::new))
}

/// Restores the configured checkpoint.
pub fn load_model(cfg: &RunConfig) -> anyhow::Result<ProjectionModel> {
    ProjectionModel::load(&cfg.log_dir, cfg.checkpoint, &cfg.model).with_context(|| {
        format!(
            "load checkpoint {} from {}",
            cfg.checkpoint,
            cfg.log_dir.display()
        )
    })
}

/// Loads the enrollment table; an empty table is an error.
pub fn load_enrollments(cfg: &RunConfig) -> anyhow::Result<EnrollmentTable> {
    let table = EnrollmentTable::load_dir(&cfg.embedding_dir).with_context(|| {
        format!("load enrollment embeddings from {}", cfg.embedding_dir.display())
    })?;
    if table.is_empty() {
        anyhow::bail!(
            "no enrollment embeddings in {}, run 'speakerid enroll' first",
            cfg.embedding_dir.display()
        );
    }
    Ok(table)
}

/// Loads the test manifest with the configured delimiter.
pub fn load_manifest(cfg: &RunConfig) -> anyhow::Result<Manifest> {
    Manifest::load(&cfg.manifest, cfg.delimiter)
        .with_context(|| format!("load manifest {}", cfg.manifest.display()))
}

/// Outputs result as JSON or YAML.
pub fn output_result<T: serde::Serialize>(
    result: &T,
    output_path: Option<&str>,
    as_json: bool,
) -> anyhow::Result<()> {
    let output = if as_json {
        serde_json::to_string_pretty(result)?
    } else {
        serde_yaml::to_string(result)?
    };

    match output_path {
        Some(path) => std::fs::write(path, output)?,
        None => print!("{}", output),
    }

    Ok(())
}

/// Prints a section header.
pub fn print_header(title: &str, width: usize) {
    println!("\n{}", "=".repeat(width));
    println!("{title}");
    println!("{}", "=".repeat(width));
}
