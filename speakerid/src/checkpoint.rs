//! [`EmbeddingModel`] implementation restored from a JSON checkpoint.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::IdentifyError;
use crate::model::{check_segment, EmbeddingModel};

/// Architecture parameters the checkpoint must have been trained with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Width of each dense layer; the last entry is the embedding dimension
    /// (default: [256, 128, 256]).
    pub embedding_size: Vec<usize>,
    /// Number of speakers in the training data (default: 220).
    pub num_classes: usize,
    /// Run mode flag recorded at training time (default: "i").
    pub mode: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            embedding_size: vec![256, 128, 256],
            num_classes: 220,
            mode: "i".to_string(),
        }
    }
}

/// One dense layer: `out = weights * x + bias`.
/// `weights` is `[out_dim][in_dim]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dense {
    pub weights: Vec<Vec<f32>>,
    pub bias: Vec<f32>,
}

/// Persisted parameter snapshot, `checkpoint_<n>.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    pub feature_dim: usize,
    pub embedding_size: Vec<usize>,
    pub num_classes: usize,
    pub mode: String,
    pub layers: Vec<Dense>,
    /// Speaker classification head used during training only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classifier: Option<Dense>,
}

/// Returns `<log_dir>/checkpoint_<index>.json`.
pub fn checkpoint_path(log_dir: impl AsRef<Path>, index: u32) -> PathBuf {
    log_dir.as_ref().join(format!("checkpoint_{index}.json"))
}

/// Feed-forward speaker embedding network.
///
/// # Forward Pass
///
/// 1. Average the segment frames over time (any positive length works)
/// 2. Apply each dense layer in order, ReLU between hidden layers
/// 3. Return the last layer's activation as the raw embedding
///
/// The classifier head stored in the checkpoint is validated but never
/// evaluated: extraction is inference only.
#[derive(Debug, Clone)]
pub struct ProjectionModel {
    feature_dim: usize,
    layers: Vec<Dense>,
}

impl ProjectionModel {
    /// Loads `checkpoint_<index>.json` from `log_dir` and validates it
    /// against `cfg`.
    pub fn load(log_dir: impl AsRef<Path>, index: u32, cfg: &ModelConfig) -> Result<Self, IdentifyError> {
        let path = checkpoint_path(log_dir, index);
        info!(path = %path.display(), "loading checkpoint");
        let data = std::fs::read(&path).map_err(|e| IdentifyError::missing(&path, e))?;
        let ckpt: Checkpoint =
            serde_json::from_slice(&data).map_err(|e| IdentifyError::format(&path, e))?;
        Self::from_checkpoint(ckpt, cfg).map_err(|e| match e {
            IdentifyError::InvalidInput(reason) => IdentifyError::format(&path, reason),
            other => other,
        })
    }

    /// Builds the model from an in-memory checkpoint.
    pub fn from_checkpoint(ckpt: Checkpoint, cfg: &ModelConfig) -> Result<Self, IdentifyError> {
        if ckpt.mode != cfg.mode {
            return Err(IdentifyError::InvalidInput(format!(
                "checkpoint mode {:?} does not match configured mode {:?}",
                ckpt.mode, cfg.mode
            )));
        }
        if ckpt.embedding_size.len() != cfg.embedding_size.len() {
            return Err(IdentifyError::ShapeMismatch {
                expected: cfg.embedding_size.len(),
                got: ckpt.embedding_size.len(),
            });
        }
        for (&want, &got) in cfg.embedding_size.iter().zip(&ckpt.embedding_size) {
            if want != got {
                return Err(IdentifyError::ShapeMismatch { expected: want, got });
            }
        }
        if ckpt.num_classes != cfg.num_classes {
            return Err(IdentifyError::ShapeMismatch {
                expected: cfg.num_classes,
                got: ckpt.num_classes,
            });
        }
        if ckpt.feature_dim == 0 || ckpt.layers.is_empty() {
            return Err(IdentifyError::InvalidInput("checkpoint has no layers".into()));
        }
        if ckpt.layers.len() != ckpt.embedding_size.len() {
            return Err(IdentifyError::InvalidInput(format!(
                "checkpoint has {} layers for {} embedding sizes",
                ckpt.layers.len(),
                ckpt.embedding_size.len()
            )));
        }

        let mut in_dim = ckpt.feature_dim;
        for (i, (layer, &out_dim)) in ckpt.layers.iter().zip(&ckpt.embedding_size).enumerate() {
            check_dense(layer, in_dim, out_dim)
                .map_err(|reason| IdentifyError::InvalidInput(format!("layer {i}: {reason}")))?;
            in_dim = out_dim;
        }
        if let Some(head) = &ckpt.classifier {
            check_dense(head, in_dim, ckpt.num_classes)
                .map_err(|reason| IdentifyError::InvalidInput(format!("classifier: {reason}")))?;
        }

        Ok(Self {
            feature_dim: ckpt.feature_dim,
            layers: ckpt.layers,
        })
    }
}

fn check_dense(layer: &Dense, in_dim: usize, out_dim: usize) -> Result<(), String> {
    if layer.weights.len() != out_dim || layer.bias.len() != out_dim {
        return Err(format!(
            "expected {out_dim} outputs, got {} weight rows and {} biases",
            layer.weights.len(),
            layer.bias.len()
        ));
    }
    if let Some(row) = layer.weights.iter().find(|r| r.len() != in_dim) {
        return Err(format!("expected {in_dim} inputs, got {}", row.len()));
    }
    Ok(())
}

impl EmbeddingModel for ProjectionModel {
    fn extract(&self, segment: &[Vec<f32>]) -> Result<Vec<f32>, IdentifyError> {
        check_segment(segment, self.feature_dim)?;

        // Temporal average pooling.
        let mut x = vec![0.0f64; self.feature_dim];
        for frame in segment {
            for (acc, &v) in x.iter_mut().zip(frame) {
                *acc += v as f64;
            }
        }
        let n = segment.len() as f64;
        for v in &mut x {
            *v /= n;
        }

        let last = self.layers.len() - 1;
        for (i, layer) in self.layers.iter().enumerate() {
            let mut out: Vec<f64> = layer
                .weights
                .iter()
                .zip(&layer.bias)
                .map(|(row, &b)| {
                    row.iter()
                        .zip(&x)
                        .map(|(&w, &xi)| w as f64 * xi)
                        .sum::<f64>()
                        + b as f64
                })
                .collect();
            if i < last {
                for v in &mut out {
                    *v = v.max(0.0);
                }
            }
            x = out;
        }

        Ok(x.into_iter().map(|v| v as f32).collect())
    }

    fn dimension(&self) -> usize {
        self.layers.last().map_or(0, |l| l.bias.len())
    }

    fn feature_dim(&self) -> usize {
        self.feature_dim
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_config_partial_uses_defaults() {
        let cfg: ModelConfig = serde_json::from_str(r#"{"mode": "i"}"#).unwrap();
        assert_eq!(cfg, ModelConfig::default());

        let cfg: ModelConfig = serde_json::from_str(r#"{"num_classes": 10}"#).unwrap();
        assert_eq!(cfg.num_classes, 10);
        assert_eq!(cfg.embedding_size, vec![256, 128, 256]);
        assert_eq!(cfg.mode, "i");
    }

    fn small_config() -> ModelConfig {
        ModelConfig {
            embedding_size: vec![3, 2],
            num_classes: 4,
            mode: "i".to_string(),
        }
    }

    // 2 -> 3 -> 2, with a 4-way classifier head.
    fn small_checkpoint() -> Checkpoint {
        Checkpoint {
            feature_dim: 2,
            embedding_size: vec![3, 2],
            num_classes: 4,
            mode: "i".to_string(),
            layers: vec![
                Dense {
                    weights: vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![-1.0, -1.0]],
                    bias: vec![0.0, 0.0, 0.0],
                },
                Dense {
                    weights: vec![vec![1.0, 1.0, 1.0], vec![1.0, -1.0, 0.0]],
                    bias: vec![0.5, 0.0],
                },
            ],
            classifier: Some(Dense {
                weights: vec![vec![0.0; 2]; 4],
                bias: vec![0.0; 4],
            }),
        }
    }

    #[test]
    fn model_config_default() {
        let cfg = ModelConfig::default();
        assert_eq!(cfg.embedding_size, vec![256, 128, 256]);
        assert_eq!(cfg.num_classes, 220);
        assert_eq!(cfg.mode, "i");
    }

    #[test]
    fn checkpoint_path_format() {
        assert_eq!(
            checkpoint_path("model_saved", 27),
            PathBuf::from("model_saved/checkpoint_27.json")
        );
    }

    #[test]
    fn extract_forward_pass() {
        let model = ProjectionModel::from_checkpoint(small_checkpoint(), &small_config()).unwrap();
        assert_eq!(model.dimension(), 2);
        assert_eq!(model.feature_dim(), 2);

        // mean = [2, 1]; hidden = relu([2, 1, -3]) = [2, 1, 0]
        // out = [2 + 1 + 0 + 0.5, 2 - 1] = [3.5, 1]
        let emb = model.extract(&[vec![1.0, 2.0], vec![3.0, 0.0]]).unwrap();
        assert_eq!(emb, vec![3.5, 1.0]);
    }

    #[test]
    fn extract_is_deterministic() {
        let model = ProjectionModel::from_checkpoint(small_checkpoint(), &small_config()).unwrap();
        let seg = vec![vec![0.3, -0.7], vec![1.1, 0.2], vec![0.0, 0.9]];
        assert_eq!(model.extract(&seg).unwrap(), model.extract(&seg).unwrap());
    }

    #[test]
    fn extract_rejects_wrong_width() {
        let model = ProjectionModel::from_checkpoint(small_checkpoint(), &small_config()).unwrap();
        assert!(matches!(
            model.extract(&[vec![1.0, 2.0, 3.0]]),
            Err(IdentifyError::ShapeMismatch {
                expected: 2,
                got: 3
            })
        ));
        assert!(model.extract(&[]).is_err());
    }

    #[test]
    fn config_mismatch_rejected() {
        let mut cfg = small_config();
        cfg.num_classes = 5;
        assert!(matches!(
            ProjectionModel::from_checkpoint(small_checkpoint(), &cfg),
            Err(IdentifyError::ShapeMismatch {
                expected: 5,
                got: 4
            })
        ));

        let mut cfg = small_config();
        cfg.embedding_size = vec![3, 8];
        assert!(ProjectionModel::from_checkpoint(small_checkpoint(), &cfg).is_err());

        let mut cfg = small_config();
        cfg.mode = "v".to_string();
        assert!(matches!(
            ProjectionModel::from_checkpoint(small_checkpoint(), &cfg),
            Err(IdentifyError::InvalidInput(_))
        ));
    }

    #[test]
    fn inconsistent_layer_shapes_rejected() {
        let mut ckpt = small_checkpoint();
        ckpt.layers[1].weights[0].push(0.0);
        assert!(matches!(
            ProjectionModel::from_checkpoint(ckpt, &small_config()),
            Err(IdentifyError::InvalidInput(_))
        ));
    }

    #[test]
    fn load_from_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = checkpoint_path(dir.path(), 3);
        std::fs::write(&path, serde_json::to_vec(&small_checkpoint()).unwrap()).unwrap();

        let model = ProjectionModel::load(dir.path(), 3, &small_config()).unwrap();
        assert_eq!(model.dimension(), 2);

        assert!(matches!(
            ProjectionModel::load(dir.path(), 4, &small_config()),
            Err(IdentifyError::MissingResource { .. })
        ));
    }

    #[test]
    fn load_malformed() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(checkpoint_path(dir.path(), 1), b"{}").unwrap();
        assert!(matches!(
            ProjectionModel::load(dir.path(), 1, &small_config()),
            Err(IdentifyError::InvalidFormat { .. })
        ));
    }
}
