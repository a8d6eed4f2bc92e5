//! Run configuration.
//!
//! Stored as YAML, by default at ~/.speakerid/config.yaml. Every field has a
//! default, so a partial file (or no file at all) is valid. Command line
//! flags override file values.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use speakerid::ModelConfig;

/// Default base configuration directory name.
pub const DEFAULT_BASE_DIR: &str = ".speakerid";
/// Default configuration filename.
pub const DEFAULT_CONFIG_FILE: &str = "config.yaml";

/// Settings for the identification and enrollment commands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Directory holding `checkpoint_<n>.json` files.
    pub log_dir: PathBuf,

    /// Checkpoint index to restore.
    pub checkpoint: u32,

    /// Model architecture the checkpoint must match.
    pub model: ModelConfig,

    /// Directory of `<speaker>.json` enrollment embeddings.
    pub embedding_dir: PathBuf,

    /// Root of the test feature files.
    pub test_dir: PathBuf,

    /// Test files live at `<test_dir>/<speaker>/<filename>`.
    pub speaker_subdirs: bool,

    /// Delimited test manifest with `filename` and `speaker` columns.
    pub manifest: PathBuf,

    /// Manifest field delimiter.
    pub delimiter: char,

    /// Segment length in frames.
    pub test_frames: usize,

    /// Target L2 norm of utterance embeddings.
    pub alpha: f32,

    /// Ranked candidates kept per item in the JSON report.
    pub top_k: usize,

    /// Text file the accuracy line is appended to.
    pub results: PathBuf,

    /// Optional JSON report with every item.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<PathBuf>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            log_dir: PathBuf::from("model_saved"),
            checkpoint: 27,
            model: ModelConfig::default(),
            embedding_dir: PathBuf::from("enroll_embeddings"),
            test_dir: PathBuf::from("test_feats"),
            speaker_subdirs: true,
            manifest: PathBuf::from("manifest.csv"),
            delimiter: ',',
            test_frames: 100,
            alpha: 1.0,
            top_k: speakerid::DEFAULT_TOP_K,
            results: PathBuf::from("output/identification.txt"),
            report: None,
        }
    }
}

impl RunConfig {
    /// Gets the default config file path.
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(DEFAULT_BASE_DIR).join(DEFAULT_CONFIG_FILE))
    }

    /// Loads configuration.
    ///
    /// An explicit `path` must exist. Without one, the default path is used
    /// when present and built-in defaults otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load_file(p),
            None => match Self::default_path() {
                Some(p) if p.is_file() => Self::load_file(&p),
                _ => Ok(Self::default()),
            },
        }
    }

    /// Loads a YAML config file.
    pub fn load_file(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        let cfg: Self = serde_yaml::from_str(&data)
            .with_context(|| format!("parse config {}", path.display()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Writes the configuration as YAML, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_yaml::to_string(self)?)
            .with_context(|| format!("write config {}", path.display()))?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.test_frames == 0 {
            anyhow::bail!("test_frames must be positive");
        }
        if !(self.alpha.is_finite() && self.alpha > 0.0) {
            anyhow::bail!("alpha must be positive, got {}", self.alpha);
        }
        if self.model.embedding_size.is_empty() {
            anyhow::bail!("model.embedding_size must not be empty");
        }
        Ok(())
    }
}
