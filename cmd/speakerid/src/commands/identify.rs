//! Identify command.

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use speakerid::{
    append_accuracy, save_report, FeatureDir, IdentificationRunner, Identifier, ItemResult,
    Outcome, RunReport,
};
use tracing::{info, warn};

use super::{get_config, load_enrollments, load_manifest, load_model, output_result, print_header, ModelArgs};
use crate::Cli;

const TABLE_WIDTH: usize = 90;

/// Identify the speaker of every utterance in a test manifest.
///
/// Each utterance is segmented, embedded, normalized and matched against
/// the enrolled speakers by cosine similarity. Items that cannot be
/// evaluated are reported as skipped and excluded from accuracy.
#[derive(Args)]
pub struct IdentifyCommand {
    #[command(flatten)]
    model: ModelArgs,

    /// Test manifest with filename and speaker columns
    #[arg(short = 'm', long)]
    manifest: Option<PathBuf>,

    /// Root directory of test feature files
    #[arg(long)]
    test_dir: Option<PathBuf>,

    /// Test files sit directly under the test directory
    #[arg(long)]
    flat: bool,

    /// Ranked candidates kept per item
    #[arg(short = 'k', long)]
    top_k: Option<usize>,

    /// File the accuracy line is appended to
    #[arg(long)]
    results: Option<PathBuf>,

    /// Write the full JSON report to this path
    #[arg(long)]
    report: Option<PathBuf>,

    /// Print one line per item
    #[arg(long)]
    items: bool,
}

impl IdentifyCommand {
    pub fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let mut cfg = get_config(cli)?;
        self.model.apply(&mut cfg);
        if let Some(m) = &self.manifest {
            cfg.manifest = m.clone();
        }
        if let Some(dir) = &self.test_dir {
            cfg.test_dir = dir.clone();
        }
        if self.flat {
            cfg.speaker_subdirs = false;
        }
        if let Some(k) = self.top_k {
            cfg.top_k = k;
        }
        if let Some(r) = &self.results {
            cfg.results = r.clone();
        }
        if let Some(r) = &self.report {
            cfg.report = Some(r.clone());
        }
        cfg.validate()?;

        let model = load_model(&cfg)?;
        let identifier = Identifier::new(&model, cfg.test_frames, cfg.alpha)?;
        let table = load_enrollments(&cfg)?;
        let manifest = load_manifest(&cfg)?;
        info!(
            checkpoint = cfg.checkpoint,
            speakers = table.len(),
            items = manifest.len(),
            test_frames = cfg.test_frames,
            alpha = cfg.alpha,
            "starting identification"
        );

        for speaker in manifest.speakers() {
            if !table.contains(&speaker) {
                warn!(speaker = %speaker, "speaker in manifest is not enrolled");
            }
        }

        let source = FeatureDir {
            root: cfg.test_dir.clone(),
            speaker_subdirs: cfg.speaker_subdirs,
        };
        let mut runner = IdentificationRunner::new(&identifier, &table)?.with_top_k(cfg.top_k);
        runner.run(&manifest, &source);
        let mut report = runner.finalize();
        report.timestamp = chrono::Utc::now().to_rfc3339();

        append_accuracy(&cfg.results, &report.summary)
            .with_context(|| format!("append results to {}", cfg.results.display()))?;
        if let Some(path) = &cfg.report {
            save_report(&report, path)
                .with_context(|| format!("save report to {}", path.display()))?;
            info!(path = %path.display(), "report saved");
        }

        if cli.json || cli.output.is_some() {
            return output_result(&report, cli.output.as_deref(), cli.json);
        }
        if self.items {
            print_items(&report.items);
        }
        print_summary(&report);
        Ok(())
    }
}

fn print_items(items: &[ItemResult]) {
    print_header("ITEMS", TABLE_WIDTH);
    println!(
        "\n{:<30} {:<15} {:<15} {:>10} {:>8}",
        "File", "Speaker", "Predicted", "Score", "Result"
    );
    println!("{}", "-".repeat(TABLE_WIDTH));
    for item in items {
        match &item.outcome {
            Outcome::Evaluated {
                predicted,
                score,
                correct,
                ..
            } => println!(
                "{:<30} {:<15} {:<15} {:>10.4} {:>8}",
                item.filename,
                item.speaker,
                predicted,
                score,
                if *correct { "ok" } else { "miss" }
            ),
            Outcome::Skipped { reason } => println!(
                "{:<30} {:<15} skipped: {}",
                item.filename, item.speaker, reason
            ),
        }
    }
}

fn print_summary(report: &RunReport) {
    let s = &report.summary;
    print_header("IDENTIFICATION SUMMARY", TABLE_WIDTH);
    println!(
        "\n{:>8} {:>10} {:>8} {:>8} {:>10}",
        "Total", "Evaluated", "Correct", "Skipped", "Accuracy"
    );
    println!("{}", "-".repeat(TABLE_WIDTH));
    println!(
        "{:>8} {:>10} {:>8} {:>8} {:>9.2}%",
        s.total, s.evaluated, s.correct, s.skipped, s.accuracy
    );
    println!("{}", "-".repeat(TABLE_WIDTH));
}
