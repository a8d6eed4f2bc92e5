use crate::IdentifyError;

/// Extracts a speaker embedding from one block of acoustic features.
///
/// The input is a `[num_frames][feature_dim]` slice with at least one
/// frame. `num_frames` may be shorter than the configured segment length
/// for the last block of an utterance. The output is a dense f32 vector
/// whose dimensionality is returned by [`EmbeddingModel::dimension`].
///
/// # Contract
///
/// - Inference only: extraction never updates model state.
/// - Deterministic for identical input and model parameters.
/// - An empty block or a frame of the wrong width is reported as
///   [`IdentifyError::ShapeMismatch`].
///
/// # Thread Safety
///
/// Implementations must be safe for concurrent use.
pub trait EmbeddingModel: Send + Sync {
    /// Computes the raw embedding of one segment.
    fn extract(&self, segment: &[Vec<f32>]) -> Result<Vec<f32>, IdentifyError>;

    /// Returns the dimensionality of the embedding vectors (e.g., 256).
    fn dimension(&self) -> usize;

    /// Returns the expected width of each input frame (e.g., 40).
    fn feature_dim(&self) -> usize;
}

/// Checks that every frame of `segment` has `feature_dim` values.
pub fn check_segment(segment: &[Vec<f32>], feature_dim: usize) -> Result<(), IdentifyError> {
    if segment.is_empty() {
        return Err(IdentifyError::ShapeMismatch {
            expected: 1,
            got: 0,
        });
    }
    match segment.iter().find(|f| f.len() != feature_dim) {
        Some(bad) => Err(IdentifyError::ShapeMismatch {
            expected: feature_dim,
            got: bad.len(),
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_segment_ok() {
        assert!(check_segment(&[vec![0.0; 4], vec![1.0; 4]], 4).is_ok());
    }

    #[test]
    fn check_segment_empty() {
        assert!(matches!(
            check_segment(&[], 4),
            Err(IdentifyError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn check_segment_wrong_width() {
        let err = check_segment(&[vec![0.0; 4], vec![0.0; 3]], 4).unwrap_err();
        assert!(matches!(
            err,
            IdentifyError::ShapeMismatch {
                expected: 4,
                got: 3
            }
        ));
    }
}
