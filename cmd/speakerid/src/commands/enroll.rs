//! Enroll command.

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use serde::Serialize;
use speakerid::{scan_feature_tree, EnrollmentTable, FeatureSequence, Identifier};
use tracing::{debug, info, warn};

use super::{get_config, load_model, output_result, ModelArgs};
use crate::Cli;

/// Build enrollment embeddings from `<features>/<speaker>/*enroll*.json`.
///
/// Every enrollment utterance of a speaker is embedded and the results are
/// aggregated into one vector, normalized like test embeddings. One
/// `<speaker>.json` is written per speaker to the embedding directory.
#[derive(Args)]
pub struct EnrollCommand {
    #[command(flatten)]
    model: ModelArgs,

    /// Root directory with one subdirectory per speaker
    #[arg(long)]
    features: Option<PathBuf>,
}

#[derive(Serialize)]
struct EnrollSummary {
    embedding_dir: PathBuf,
    enrolled: Vec<String>,
    skipped: Vec<String>,
}

impl EnrollCommand {
    pub fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let mut cfg = get_config(cli)?;
        self.model.apply(&mut cfg);
        cfg.validate()?;
        let root = self.features.clone().unwrap_or_else(|| cfg.test_dir.clone());

        let model = load_model(&cfg)?;
        let identifier = Identifier::new(&model, cfg.test_frames, cfg.alpha)?;

        let speakers = scan_feature_tree(&root)
            .with_context(|| format!("scan feature tree {}", root.display()))?;
        info!(root = %root.display(), speakers = speakers.len(), "enrolling speakers");

        let mut table = EnrollmentTable::new();
        let mut skipped = Vec::new();
        for files in speakers {
            if files.enroll.is_empty() {
                warn!(speaker = %files.speaker, "no enrollment files");
                skipped.push(files.speaker);
                continue;
            }
            let utterances = files
                .enroll
                .iter()
                .map(|path| {
                    FeatureSequence::load(path)
                        .with_context(|| format!("load enrollment features {}", path.display()))
                })
                .collect::<anyhow::Result<Vec<_>>>()?;
            let embedding = identifier
                .enroll(&utterances)
                .with_context(|| format!("enroll speaker {}", files.speaker))?;
            debug!(speaker = %files.speaker, utterances = utterances.len(), "enrolled");
            table.insert(files.speaker, embedding)?;
        }

        if table.is_empty() {
            anyhow::bail!("no speakers enrolled from {}", root.display());
        }
        table
            .save_dir(&cfg.embedding_dir)
            .with_context(|| format!("save embeddings to {}", cfg.embedding_dir.display()))?;
        info!(
            speakers = table.len(),
            dir = %cfg.embedding_dir.display(),
            "enrollment saved"
        );

        let summary = EnrollSummary {
            embedding_dir: cfg.embedding_dir.clone(),
            enrolled: table.speakers().map(str::to_string).collect(),
            skipped,
        };
        output_result(&summary, cli.output.as_deref(), cli.json)
    }
}
