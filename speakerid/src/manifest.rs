//! Test manifest: delimited text with `filename` and `speaker` columns.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::error::IdentifyError;

/// One test utterance and its ground-truth speaker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    pub filename: String,
    pub speaker: String,
}

/// Ordered list of test utterances.
#[derive(Debug, Clone, Default)]
pub struct Manifest {
    entries: Vec<ManifestEntry>,
}

impl Manifest {
    pub fn new(entries: Vec<ManifestEntry>) -> Self {
        Self { entries }
    }

    /// Reads a manifest file whose fields are separated by `delimiter`.
    pub fn load(path: impl AsRef<Path>, delimiter: char) -> Result<Self, IdentifyError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| IdentifyError::missing(path, e))?;
        Self::parse_with_source(&text, delimiter, path)
    }

    /// Parses manifest text. The first non-blank line is the header and
    /// must name `filename` and `speaker` columns; other columns are ignored.
    pub fn parse(text: &str, delimiter: char) -> Result<Self, IdentifyError> {
        Self::parse_with_source(text, delimiter, Path::new("<manifest>"))
    }

    fn parse_with_source(text: &str, delimiter: char, source: &Path) -> Result<Self, IdentifyError> {
        let mut lines = text
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty());

        let Some((_, header)) = lines.next() else {
            return Err(IdentifyError::format(source, "empty manifest"));
        };
        let columns: Vec<String> = split_fields(header, delimiter);
        let column = |name: &str| {
            columns
                .iter()
                .position(|c| c == name)
                .ok_or_else(|| IdentifyError::format(source, format!("missing column {name:?}")))
        };
        let file_col = column("filename")?;
        let speaker_col = column("speaker")?;
        let needed = file_col.max(speaker_col) + 1;

        let mut entries = Vec::new();
        for (idx, line) in lines {
            let fields = split_fields(line, delimiter);
            if fields.len() < needed {
                return Err(IdentifyError::format(
                    source,
                    format!("line {}: expected at least {needed} fields, got {}", idx + 1, fields.len()),
                ));
            }
            entries.push(ManifestEntry {
                filename: fields[file_col].clone(),
                speaker: fields[speaker_col].clone(),
            });
        }
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sorted, de-duplicated ground-truth speakers.
    pub fn speakers(&self) -> Vec<String> {
        self.entries
            .iter()
            .map(|e| e.speaker.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

impl ManifestEntry {
    /// Resolves the feature file path under `root`. With `speaker_subdirs`
    /// the file lives at `<root>/<speaker>/<filename>`. Absolute filenames
    /// are returned unchanged.
    pub fn resolve(&self, root: &Path, speaker_subdirs: bool) -> PathBuf {
        let file = Path::new(&self.filename);
        if file.is_absolute() {
            file.to_path_buf()
        } else if speaker_subdirs {
            root.join(&self.speaker).join(file)
        } else {
            root.join(file)
        }
    }
}

fn split_fields(line: &str, delimiter: char) -> Vec<String> {
    line.split(delimiter)
        .map(|f| {
            let f = f.trim();
            f.strip_prefix('"')
                .and_then(|s| s.strip_suffix('"'))
                .unwrap_or(f)
                .to_string()
        })
        .collect()
}
