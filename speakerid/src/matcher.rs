use serde::{Deserialize, Serialize};

use crate::cosine::cosine_similarity;
use crate::enroll::EnrollmentTable;
use crate::error::IdentifyError;

/// SpeakerMatch is a single scored candidate from the enrollment table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeakerMatch {
    /// Enrolled speaker id.
    pub speaker: String,

    /// Cosine similarity between the query and the enrollment embedding.
    /// Higher values indicate higher similarity.
    pub score: f32,
}

/// Returns the enrolled speaker whose embedding is most similar to `query`.
///
/// Candidates are visited in lexicographic speaker-id order and only a
/// strictly greater score replaces the current best, so on exact ties the
/// smallest speaker id wins.
pub fn best_match(query: &[f32], table: &EnrollmentTable) -> Result<SpeakerMatch, IdentifyError> {
    check_query(query, table)?;

    let mut best: Option<(&str, f32)> = None;
    for (speaker, embedding) in table.iter() {
        let score = cosine_similarity(query, embedding);
        if best.is_none_or(|(_, max)| score > max) {
            best = Some((speaker, score));
        }
    }

    let (speaker, score) = best.ok_or(IdentifyError::EmptyEnrollment)?;
    Ok(SpeakerMatch {
        speaker: speaker.to_string(),
        score,
    })
}

/// Returns the top-k speakers by descending similarity, ties ordered by
/// speaker id. The first entry always equals [`best_match`].
pub fn rank(query: &[f32], table: &EnrollmentTable, top_k: usize) -> Result<Vec<SpeakerMatch>, IdentifyError> {
    check_query(query, table)?;

    let mut results: Vec<SpeakerMatch> = table
        .iter()
        .map(|(speaker, embedding)| SpeakerMatch {
            speaker: speaker.to_string(),
            score: cosine_similarity(query, embedding),
        })
        .collect();

    // Stable sort keeps lexicographic order among equal scores.
    results.sort_by(|a, b| b.score.total_cmp(&a.score));
    results.truncate(top_k);
    Ok(results)
}

fn check_query(query: &[f32], table: &EnrollmentTable) -> Result<(), IdentifyError> {
    let Some(dim) = table.dimension() else {
        return Err(IdentifyError::EmptyEnrollment);
    };
    if query.len() != dim {
        return Err(IdentifyError::ShapeMismatch {
            expected: dim,
            got: query.len(),
        });
    }
    if query.iter().any(|v| !v.is_finite()) {
        return Err(IdentifyError::InvalidInput("query embedding is not finite".into()));
    }
    Ok(())
}
