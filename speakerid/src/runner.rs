//! Manifest evaluation: per-item identification and accuracy bookkeeping.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::enroll::EnrollmentTable;
use crate::error::IdentifyError;
use crate::features::FeatureSequence;
use crate::manifest::{Manifest, ManifestEntry};
use crate::matcher::{best_match, rank, SpeakerMatch};
use crate::pipeline::Identifier;

/// Number of ranked candidates kept per evaluated item.
pub const DEFAULT_TOP_K: usize = 3;

/// Loads the feature sequence for a manifest entry.
pub trait FeatureSource {
    fn load(&self, entry: &ManifestEntry) -> Result<FeatureSequence, IdentifyError>;
}

/// Reads JSON feature files from a directory.
#[derive(Debug, Clone)]
pub struct FeatureDir {
    pub root: PathBuf,
    /// Files live under `<root>/<speaker>/` instead of `<root>/`.
    pub speaker_subdirs: bool,
}

impl FeatureSource for FeatureDir {
    fn load(&self, entry: &ManifestEntry) -> Result<FeatureSequence, IdentifyError> {
        FeatureSequence::load(entry.resolve(&self.root, self.speaker_subdirs))
    }
}

/// What happened to one manifest item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    /// The item was identified; `correct` compares against ground truth.
    Evaluated {
        predicted: String,
        score: f32,
        correct: bool,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        candidates: Vec<SpeakerMatch>,
    },
    /// The item could not be identified and is excluded from accuracy.
    Skipped { reason: String },
}

/// Result of one manifest item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemResult {
    pub filename: String,
    pub speaker: String,
    #[serde(flatten)]
    pub outcome: Outcome,
}

impl ItemResult {
    pub fn is_correct(&self) -> bool {
        matches!(self.outcome, Outcome::Evaluated { correct: true, .. })
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self.outcome, Outcome::Skipped { .. })
    }
}

/// Running counts over recorded items.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    pub evaluated: usize,
    pub correct: usize,
    pub skipped: usize,
}

impl Tally {
    pub fn record(&mut self, item: &ItemResult) {
        match &item.outcome {
            Outcome::Evaluated { correct, .. } => {
                self.evaluated += 1;
                if *correct {
                    self.correct += 1;
                }
            }
            Outcome::Skipped { .. } => self.skipped += 1,
        }
    }

    pub fn summary(&self) -> Summary {
        let accuracy = if self.evaluated > 0 {
            self.correct as f64 * 100.0 / self.evaluated as f64
        } else {
            0.0
        };
        Summary {
            accuracy,
            evaluated: self.evaluated,
            correct: self.correct,
            skipped: self.skipped,
            total: self.evaluated + self.skipped,
        }
    }
}

/// Final figures of a run. Accuracy is a percentage over evaluated items
/// only; skipped items are reported separately.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub accuracy: f64,
    pub evaluated: usize,
    pub correct: usize,
    pub skipped: usize,
    pub total: usize,
}

/// Full evaluation report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub timestamp: String,
    pub summary: Summary,
    pub items: Vec<ItemResult>,
}

/// Evaluates manifest items against a fixed enrollment table.
///
/// Per-item failures (missing or malformed feature file, shape mismatch,
/// degenerate embedding) are recorded as skipped; they never abort the run.
pub struct IdentificationRunner<'a> {
    identifier: &'a Identifier<'a>,
    enrollments: &'a EnrollmentTable,
    top_k: usize,
    tally: Tally,
    items: Vec<ItemResult>,
}

impl<'a> IdentificationRunner<'a> {
    /// Fails with [`IdentifyError::EmptyEnrollment`] when there is nobody to
    /// match against.
    pub fn new(identifier: &'a Identifier<'a>, enrollments: &'a EnrollmentTable) -> Result<Self, IdentifyError> {
        if enrollments.is_empty() {
            return Err(IdentifyError::EmptyEnrollment);
        }
        Ok(Self {
            identifier,
            enrollments,
            top_k: DEFAULT_TOP_K,
            tally: Tally::default(),
            items: Vec::new(),
        })
    }

    /// Number of ranked candidates kept per item (default: 3, 0 keeps none).
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Identifies one item without recording it.
    pub fn evaluate(&self, entry: &ManifestEntry, source: &dyn FeatureSource) -> ItemResult {
        let outcome = match self.identify(entry, source) {
            Ok((best, candidates)) => {
                let correct = best.speaker == entry.speaker;
                debug!(
                    file = %entry.filename,
                    truth = %entry.speaker,
                    predicted = %best.speaker,
                    score = best.score,
                    correct,
                    "identified"
                );
                Outcome::Evaluated {
                    predicted: best.speaker,
                    score: best.score,
                    correct,
                    candidates,
                }
            }
            Err(e) => {
                warn!(file = %entry.filename, error = %e, "skipping item");
                Outcome::Skipped {
                    reason: e.to_string(),
                }
            }
        };
        ItemResult {
            filename: entry.filename.clone(),
            speaker: entry.speaker.clone(),
            outcome,
        }
    }

    fn identify(
        &self,
        entry: &ManifestEntry,
        source: &dyn FeatureSource,
    ) -> Result<(SpeakerMatch, Vec<SpeakerMatch>), IdentifyError> {
        let seq = source.load(entry)?;
        let embedding = self.identifier.embed(&seq)?;
        let best = best_match(&embedding, self.enrollments)?;
        let candidates = rank(&embedding, self.enrollments, self.top_k)?;
        Ok((best, candidates))
    }

    /// Adds an item result to the run.
    pub fn record(&mut self, item: ItemResult) {
        self.tally.record(&item);
        self.items.push(item);
    }

    /// Evaluates and records every manifest entry in order.
    pub fn run(&mut self, manifest: &Manifest, source: &dyn FeatureSource) -> &mut Self {
        info!(items = manifest.len(), speakers = self.enrollments.len(), "evaluating manifest");
        for entry in manifest.entries() {
            let item = self.evaluate(entry, source);
            self.record(item);
        }
        self
    }

    pub fn tally(&self) -> Tally {
        self.tally
    }

    pub fn items(&self) -> &[ItemResult] {
        &self.items
    }

    /// Consumes the runner and returns the summary with every item.
    pub fn finalize(self) -> RunReport {
        let summary = self.tally.summary();
        info!(
            accuracy = summary.accuracy,
            evaluated = summary.evaluated,
            correct = summary.correct,
            skipped = summary.skipped,
            "run finished"
        );
        RunReport {
            timestamp: String::new(),
            summary,
            items: self.items,
        }
    }
}
