//! Closed-set speaker identification from acoustic feature sequences.
//!
//! # Architecture
//!
//! Each test utterance goes through four stages:
//!
//! 1. [`Segmenter::split`]: `[frames][dim]` features -> blocks of `test_frames`
//! 2. [`EmbeddingModel::extract`]: block -> raw embedding
//! 3. [`aggregate`]: sum of raw embeddings -> utterance embedding with norm `alpha`
//! 4. [`best_match`]: cosine similarity against every enrolled speaker
//!
//! [`Identifier`] runs stages 1-3 (and 4 via [`Identifier::identify`]).
//! [`IdentificationRunner`] evaluates a [`Manifest`] of test utterances,
//! recording each item and tallying accuracy over the items that could be
//! evaluated.
//!
//! # Segment Boundaries
//!
//! Blocks never overlap and are not padded. An utterance of 250 frames with
//! `test_frames = 100` yields blocks of 100, 100 and 50 frames; the model
//! receives the short tail as is.
//!
//! # Tie-Breaking
//!
//! The [`EnrollmentTable`] iterates speakers in lexicographic order and the
//! matcher only replaces its best candidate on a strictly greater score, so
//! equal scores resolve to the smallest speaker id.

mod aggregate;
mod checkpoint;
mod cosine;
mod enroll;
mod error;
mod features;
mod manifest;
mod matcher;
mod model;
mod pipeline;
mod report;
mod runner;
mod segment;

pub use aggregate::{aggregate, is_degenerate, l2_norm, sum_embeddings, NORM_EPSILON};
pub use checkpoint::{checkpoint_path, Checkpoint, Dense, ModelConfig, ProjectionModel};
pub use cosine::cosine_similarity;
pub use enroll::{scan_feature_tree, EnrollmentTable, SpeakerFiles};
pub use error::IdentifyError;
pub use features::FeatureSequence;
pub use manifest::{Manifest, ManifestEntry};
pub use matcher::{best_match, rank, SpeakerMatch};
pub use model::{check_segment, EmbeddingModel};
pub use pipeline::Identifier;
pub use report::{accuracy_line, append_accuracy, load_report, save_report};
pub use runner::{
    FeatureDir, FeatureSource, IdentificationRunner, ItemResult, Outcome, RunReport, Summary,
    Tally, DEFAULT_TOP_K,
};
pub use segment::{segment_ranges, Segment, Segmenter};
