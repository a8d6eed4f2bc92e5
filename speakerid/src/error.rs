use std::path::PathBuf;

use thiserror::Error;

/// Errors returned by speaker identification operations.
#[derive(Debug, Error)]
pub enum IdentifyError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("shape mismatch: expected {expected}, got {got}")]
    ShapeMismatch { expected: usize, got: usize },

    #[error("no enrolled speakers to match against")]
    EmptyEnrollment,

    #[error("missing resource {}: {source}", path.display())]
    MissingResource {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid format in {}: {reason}", path.display())]
    InvalidFormat { path: PathBuf, reason: String },

    #[error("degenerate embedding: segment embeddings sum to zero or are not finite")]
    DegenerateEmbedding,

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

impl IdentifyError {
    pub(crate) fn missing(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::MissingResource {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn format(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::InvalidFormat {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}
