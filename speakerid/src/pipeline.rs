//! Utterance-level pipeline: segment, extract, aggregate, match.

use tracing::{debug, warn};

use crate::aggregate::{aggregate, check_alpha, is_degenerate, scale_to_norm, sum_embeddings};
use crate::enroll::EnrollmentTable;
use crate::error::IdentifyError;
use crate::features::FeatureSequence;
use crate::matcher::{best_match, SpeakerMatch};
use crate::model::EmbeddingModel;
use crate::segment::Segmenter;

/// Turns feature sequences into utterance embeddings with a fixed model.
///
/// Holds no mutable state; one `Identifier` can serve any number of
/// utterances, and enrollment and test embeddings computed by the same
/// `Identifier` are normalized identically.
pub struct Identifier<'m> {
    model: &'m dyn EmbeddingModel,
    segmenter: Segmenter,
    alpha: f32,
}

impl<'m> Identifier<'m> {
    /// `test_frames` is the segment length in frames, `alpha` the target
    /// norm of every utterance embedding.
    pub fn new(model: &'m dyn EmbeddingModel, test_frames: usize, alpha: f32) -> Result<Self, IdentifyError> {
        check_alpha(alpha)?;
        Ok(Self {
            model,
            segmenter: Segmenter::new(test_frames)?,
            alpha,
        })
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    pub fn test_frames(&self) -> usize {
        self.segmenter.test_frames()
    }

    pub fn model(&self) -> &dyn EmbeddingModel {
        self.model
    }

    /// Computes the utterance embedding of `seq`.
    ///
    /// Fails with [`IdentifyError::DegenerateEmbedding`] when the segment
    /// embeddings sum to zero or contain an infinite or NaN component.
    pub fn embed(&self, seq: &FeatureSequence) -> Result<Vec<f32>, IdentifyError> {
        if seq.dim() != self.model.feature_dim() {
            return Err(IdentifyError::ShapeMismatch {
                expected: self.model.feature_dim(),
                got: seq.dim(),
            });
        }

        let segments = self.segmenter.split(seq)?;
        let mut raw = Vec::with_capacity(segments.len());
        for seg in &segments {
            let emb = self.model.extract(seg.frames)?;
            debug!(segment = seg.index, start = seg.start, frames = seg.len(), "extracted");
            raw.push(emb);
        }

        let sum = sum_embeddings(&raw)?;
        if is_degenerate(&sum) {
            warn!(segments = segments.len(), "segment embeddings sum to zero or are not finite");
            return Err(IdentifyError::DegenerateEmbedding);
        }
        Ok(scale_to_norm(&sum, self.alpha))
    }

    /// Embeds `seq` and returns the best matching enrolled speaker.
    pub fn identify(&self, seq: &FeatureSequence, table: &EnrollmentTable) -> Result<SpeakerMatch, IdentifyError> {
        if table.is_empty() {
            return Err(IdentifyError::EmptyEnrollment);
        }
        let embedding = self.embed(seq)?;
        best_match(&embedding, table)
    }

    /// Computes an enrollment embedding from one or more utterances of the
    /// same speaker: each utterance is embedded, then the utterance
    /// embeddings are aggregated with the same `alpha`.
    pub fn enroll(&self, utterances: &[FeatureSequence]) -> Result<Vec<f32>, IdentifyError> {
        if utterances.is_empty() {
            return Err(IdentifyError::InvalidInput("no enrollment utterances".into()));
        }
        let embeddings = utterances
            .iter()
            .map(|u| self.embed(u))
            .collect::<Result<Vec<_>, _>>()?;
        match embeddings.as_slice() {
            [only] => Ok(only.clone()),
            _ => aggregate(&embeddings, self.alpha),
        }
    }
}
