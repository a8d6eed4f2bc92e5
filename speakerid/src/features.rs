//! Acoustic feature sequences and the JSON feature file loader.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::IdentifyError;

/// An utterance as a `[num_frames][feature_dim]` matrix.
///
/// Always non-empty and rectangular.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSequence {
    frames: Vec<Vec<f32>>,
    dim: usize,
    label: Option<String>,
}

/// On-disk feature file: `{"label": "spk1", "frames": [[...], ...]}`.
#[derive(Debug, Serialize, Deserialize)]
struct FeatureFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    label: Option<String>,
    frames: Vec<Vec<f32>>,
}

impl FeatureSequence {
    /// Creates a sequence from frames, rejecting empty or ragged input.
    pub fn new(frames: Vec<Vec<f32>>) -> Result<Self, IdentifyError> {
        let Some(first) = frames.first() else {
            return Err(IdentifyError::InvalidInput("feature sequence has no frames".into()));
        };
        let dim = first.len();
        if dim == 0 {
            return Err(IdentifyError::InvalidInput("feature frames have zero width".into()));
        }
        if let Some(bad) = frames.iter().find(|f| f.len() != dim) {
            return Err(IdentifyError::ShapeMismatch {
                expected: dim,
                got: bad.len(),
            });
        }
        Ok(Self {
            frames,
            dim,
            label: None,
        })
    }

    /// Attaches the speaker label read alongside the features.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Reads a feature file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, IdentifyError> {
        let path = path.as_ref();
        let data = std::fs::read(path).map_err(|e| IdentifyError::missing(path, e))?;
        let file: FeatureFile =
            serde_json::from_slice(&data).map_err(|e| IdentifyError::format(path, e))?;
        let seq = Self::new(file.frames).map_err(|e| IdentifyError::format(path, e))?;
        Ok(match file.label {
            Some(label) => seq.with_label(label),
            None => seq,
        })
    }

    /// Writes the sequence as a feature file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), IdentifyError> {
        let file = FeatureFile {
            label: self.label.clone(),
            frames: self.frames.clone(),
        };
        let data = serde_json::to_vec(&file).map_err(|e| IdentifyError::format(path.as_ref(), e))?;
        std::fs::write(path, data)?;
        Ok(())
    }

    pub fn frames(&self) -> &[Vec<f32>] {
        &self.frames
    }

    /// Number of frames (utterance length).
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Always false; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Width of every frame.
    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }
}
