//! Enrolled speaker embeddings and the on-disk enrollment layout.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::IdentifyError;

/// Speaker id to enrollment embedding.
///
/// Entries are kept in lexicographic speaker-id order, which is also the
/// order the matcher visits them in. All embeddings share one dimension.
/// Built once, then passed by shared reference to every match.
#[derive(Debug, Clone, Default)]
pub struct EnrollmentTable {
    speakers: BTreeMap<String, Vec<f32>>,
    dim: Option<usize>,
}

impl EnrollmentTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a speaker's embedding.
    pub fn insert(&mut self, speaker: impl Into<String>, embedding: Vec<f32>) -> Result<(), IdentifyError> {
        if embedding.is_empty() {
            return Err(IdentifyError::InvalidInput("enrollment embedding is empty".into()));
        }
        if embedding.iter().any(|v| !v.is_finite()) {
            return Err(IdentifyError::InvalidInput("enrollment embedding is not finite".into()));
        }
        match self.dim {
            Some(dim) if dim != embedding.len() => {
                return Err(IdentifyError::ShapeMismatch {
                    expected: dim,
                    got: embedding.len(),
                });
            }
            _ => self.dim = Some(embedding.len()),
        }
        self.speakers.insert(speaker.into(), embedding);
        Ok(())
    }

    pub fn get(&self, speaker: &str) -> Option<&[f32]> {
        self.speakers.get(speaker).map(Vec::as_slice)
    }

    pub fn contains(&self, speaker: &str) -> bool {
        self.speakers.contains_key(speaker)
    }

    /// Iterates `(speaker, embedding)` in lexicographic speaker order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[f32])> {
        self.speakers.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn speakers(&self) -> impl Iterator<Item = &str> {
        self.speakers.keys().map(String::as_str)
    }

    /// Embedding dimension, `None` while empty.
    pub fn dimension(&self) -> Option<usize> {
        self.dim
    }

    pub fn len(&self) -> usize {
        self.speakers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.speakers.is_empty()
    }

    /// Loads every `<speaker>.json` file in `dir`. Each file holds a JSON
    /// array of floats; the file stem is the speaker id.
    pub fn load_dir(dir: impl AsRef<Path>) -> Result<Self, IdentifyError> {
        let dir = dir.as_ref();
        let entries = std::fs::read_dir(dir).map_err(|e| IdentifyError::missing(dir, e))?;

        let mut paths = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("json") {
                paths.push(path);
            }
        }
        paths.sort();

        let mut table = Self::new();
        for path in paths {
            let Some(speaker) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let data = std::fs::read(&path).map_err(|e| IdentifyError::missing(&path, e))?;
            let embedding: Vec<f32> =
                serde_json::from_slice(&data).map_err(|e| IdentifyError::format(&path, e))?;
            debug!(speaker, dim = embedding.len(), "loaded enrollment");
            table.insert(speaker.to_string(), embedding).map_err(|e| match e {
                IdentifyError::InvalidInput(reason) => IdentifyError::format(&path, reason),
                other => other,
            })?;
        }

        info!(dir = %dir.display(), speakers = table.len(), "loaded enrollment table");
        Ok(table)
    }

    /// Writes one `<speaker>.json` per entry into `dir`, creating it if needed.
    pub fn save_dir(&self, dir: impl AsRef<Path>) -> Result<(), IdentifyError> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;
        for (speaker, embedding) in &self.speakers {
            let path = dir.join(format!("{speaker}.json"));
            let data = serde_json::to_vec(embedding).map_err(|e| IdentifyError::format(&path, e))?;
            std::fs::write(&path, data)?;
        }
        Ok(())
    }
}

/// Feature files of one speaker found under a feature tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpeakerFiles {
    pub speaker: String,
    pub enroll: Vec<PathBuf>,
    pub test: Vec<PathBuf>,
}

/// Walks `<root>/<speaker>/*.json` and splits each speaker's files into
/// enrollment files (stem contains "enroll") and test files (stem contains
/// "test"). Other files are ignored. Results are sorted by speaker, then path.
pub fn scan_feature_tree(root: impl AsRef<Path>) -> Result<Vec<SpeakerFiles>, IdentifyError> {
    let root = root.as_ref();
    let entries = std::fs::read_dir(root).map_err(|e| IdentifyError::missing(root, e))?;

    let mut result = Vec::new();
    for entry in entries {
        let dir = entry?.path();
        if !dir.is_dir() {
            continue;
        }
        let Some(speaker) = dir.file_name().and_then(|s| s.to_str()) else {
            continue;
        };

        let mut files = SpeakerFiles {
            speaker: speaker.to_string(),
            ..Default::default()
        };
        for file in std::fs::read_dir(&dir)? {
            let path = file?.path();
            if !path.is_file() || path.extension().and_then(|s| s.to_str()) != Some("json") {
                continue;
            }
            let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("");
            if stem.contains("enroll") {
                files.enroll.push(path);
            } else if stem.contains("test") {
                files.test.push(path);
            }
        }
        files.enroll.sort();
        files.test.sort();
        result.push(files);
    }

    result.sort_by(|a, b| a.speaker.cmp(&b.speaker));
    Ok(result)
}
