use std::collections::HashMap;
use std::io;

use speakerid::{
    append_accuracy, check_segment, checkpoint_path, Checkpoint, Dense, EmbeddingModel,
    EnrollmentTable, FeatureDir, FeatureSequence, FeatureSource, IdentificationRunner,
    IdentifyError, Identifier, Manifest, ManifestEntry, ModelConfig, Outcome, ProjectionModel,
};

/// Deterministic stand-in for a trained network: the per-dimension mean of
/// the segment frames.
struct MeanModel {
    dim: usize,
}

impl EmbeddingModel for MeanModel {
    fn extract(&self, segment: &[Vec<f32>]) -> Result<Vec<f32>, IdentifyError> {
        check_segment(segment, self.dim)?;
        let n = segment.len() as f32;
        let mut out = vec![0.0; self.dim];
        for frame in segment {
            for (o, v) in out.iter_mut().zip(frame) {
                *o += v / n;
            }
        }
        Ok(out)
    }

    fn dimension(&self) -> usize {
        self.dim
    }

    fn feature_dim(&self) -> usize {
        self.dim
    }
}

/// Feature source backed by a map; unknown filenames are missing files.
struct MemorySource(HashMap<String, FeatureSequence>);

impl FeatureSource for MemorySource {
    fn load(&self, entry: &ManifestEntry) -> Result<FeatureSequence, IdentifyError> {
        self.0.get(&entry.filename).cloned().ok_or_else(|| IdentifyError::MissingResource {
            path: entry.filename.clone().into(),
            source: io::Error::new(io::ErrorKind::NotFound, "no such file"),
        })
    }
}

const SPEAKERS: [&str; 3] = ["alice", "bob", "carol"];

fn axis(i: usize) -> Vec<f32> {
    let mut v = vec![0.0; 3];
    v[i] = 1.0;
    v
}

fn enrollments() -> EnrollmentTable {
    let mut table = EnrollmentTable::new();
    for (i, spk) in SPEAKERS.iter().enumerate() {
        table.insert(*spk, axis(i)).unwrap();
    }
    table
}

/// 250 frames pointing (noisily) along the axis of speaker `voice`.
fn utterance(voice: usize) -> FeatureSequence {
    let frames = (0..250)
        .map(|t| {
            let mut f = vec![0.05 * ((t % 7) as f32); 3];
            f[voice] += 2.0;
            f
        })
        .collect();
    FeatureSequence::new(frames).unwrap()
}

/// Ten items: the first seven are labeled with the speaker whose voice they
/// carry, the last three with a different speaker.
fn ten_items() -> (Manifest, HashMap<String, FeatureSequence>) {
    let mut entries = Vec::new();
    let mut files = HashMap::new();
    for i in 0..10 {
        let voice = i % 3;
        let label = if i < 7 { voice } else { (voice + 1) % 3 };
        let filename = format!("test{i}.json");
        files.insert(filename.clone(), utterance(voice));
        entries.push(ManifestEntry {
            filename,
            speaker: SPEAKERS[label].to_string(),
        });
    }
    (Manifest::new(entries), files)
}

#[test]
fn accuracy_seven_of_ten() {
    let model = MeanModel { dim: 3 };
    let identifier = Identifier::new(&model, 100, 10.0).unwrap();
    let table = enrollments();
    let (manifest, files) = ten_items();

    let mut runner = IdentificationRunner::new(&identifier, &table).unwrap();
    runner.run(&manifest, &MemorySource(files));
    let report = runner.finalize();

    assert_eq!(report.summary.accuracy, 70.0);
    assert_eq!(report.summary.evaluated, 10);
    assert_eq!(report.summary.correct, 7);
    assert_eq!(report.summary.skipped, 0);
    assert_eq!(report.items.len(), 10);
    assert!(report.items[..7].iter().all(|item| item.is_correct()));
    assert!(report.items[7..].iter().all(|item| !item.is_correct()));
}

#[test]
fn missing_file_is_skipped() {
    let model = MeanModel { dim: 3 };
    let identifier = Identifier::new(&model, 100, 10.0).unwrap();
    let table = enrollments();
    let (manifest, mut files) = ten_items();
    // test9 is one of the mislabeled items.
    files.remove("test9.json");

    let mut runner = IdentificationRunner::new(&identifier, &table).unwrap();
    runner.run(&manifest, &MemorySource(files));
    let report = runner.finalize();

    let s = report.summary;
    assert_eq!(s.skipped, 1);
    assert_eq!(s.evaluated, 9);
    assert_eq!(s.correct, 7);
    assert_eq!(s.total, 10);
    assert!((s.accuracy - 700.0 / 9.0).abs() < 1e-9);

    let skipped = &report.items[9];
    assert!(skipped.is_skipped());
    match &skipped.outcome {
        Outcome::Skipped { reason } => assert!(reason.contains("missing resource"), "{reason}"),
        other => panic!("expected skipped, got {other:?}"),
    }
}

#[test]
fn wrong_shape_and_degenerate_are_skipped() {
    let model = MeanModel { dim: 3 };
    let identifier = Identifier::new(&model, 2, 1.0).unwrap();
    let table = enrollments();

    let mut files = HashMap::new();
    files.insert("ok.json".to_string(), utterance(1));
    files.insert("narrow.json".to_string(), FeatureSequence::new(vec![vec![1.0, 0.0]; 5]).unwrap());
    files.insert(
        "silent.json".to_string(),
        FeatureSequence::new(vec![vec![1.0, -1.0, 0.0], vec![-1.0, 1.0, 0.0]]).unwrap(),
    );
    let manifest = Manifest::new(
        ["ok.json", "narrow.json", "silent.json"]
            .iter()
            .map(|f| ManifestEntry {
                filename: f.to_string(),
                speaker: "bob".into(),
            })
            .collect(),
    );

    let mut runner = IdentificationRunner::new(&identifier, &table).unwrap();
    runner.run(&manifest, &MemorySource(files));
    assert_eq!(runner.tally().evaluated, 1);
    assert_eq!(runner.tally().skipped, 2);

    let report = runner.finalize();
    assert_eq!(report.summary.accuracy, 100.0);
    assert!(report.items[1].is_skipped());
    assert!(report.items[2].is_skipped());
}

/// Model whose output overflows on one axis, as a projection with huge
/// weights would after the f64 to f32 cast.
struct OverflowModel;

impl EmbeddingModel for OverflowModel {
    fn extract(&self, segment: &[Vec<f32>]) -> Result<Vec<f32>, IdentifyError> {
        check_segment(segment, 3)?;
        Ok(vec![0.0, f32::INFINITY, 0.0])
    }

    fn dimension(&self) -> usize {
        3
    }

    fn feature_dim(&self) -> usize {
        3
    }
}

#[test]
fn non_finite_embedding_is_skipped() {
    let model = OverflowModel;
    let identifier = Identifier::new(&model, 100, 1.0).unwrap();
    let mut table = EnrollmentTable::new();
    table.insert("alice", axis(0)).unwrap();
    table.insert("bob", axis(1)).unwrap();

    let mut files = HashMap::new();
    files.insert("a.json".to_string(), utterance(0));
    let manifest = Manifest::new(vec![ManifestEntry {
        filename: "a.json".into(),
        speaker: "alice".into(),
    }]);

    let mut runner = IdentificationRunner::new(&identifier, &table).unwrap();
    runner.run(&manifest, &MemorySource(files));
    let report = runner.finalize();

    assert!(report.items[0].is_skipped());
    assert!(!report.items[0].is_correct());
    assert_eq!(report.summary.evaluated, 0);
    assert_eq!(report.summary.correct, 0);
    assert_eq!(report.summary.skipped, 1);
    assert_eq!(report.summary.accuracy, 0.0);
}

#[test]
fn candidates_are_ranked() {
    let model = MeanModel { dim: 3 };
    let identifier = Identifier::new(&model, 100, 10.0).unwrap();
    let table = enrollments();
    let (manifest, files) = ten_items();

    let runner = IdentificationRunner::new(&identifier, &table).unwrap().with_top_k(2);
    let item = runner.evaluate(&manifest.entries()[0], &MemorySource(files));
    match item.outcome {
        Outcome::Evaluated {
            predicted,
            score,
            candidates,
            ..
        } => {
            assert_eq!(predicted, "alice");
            assert_eq!(candidates.len(), 2);
            assert_eq!(candidates[0].speaker, "alice");
            assert_eq!(candidates[0].score, score);
            assert!(candidates[1].score <= score);
        }
        other => panic!("expected evaluated, got {other:?}"),
    }
}

#[test]
fn empty_enrollment_is_fatal() {
    let model = MeanModel { dim: 3 };
    let identifier = Identifier::new(&model, 100, 10.0).unwrap();
    let table = EnrollmentTable::new();
    assert!(matches!(
        IdentificationRunner::new(&identifier, &table),
        Err(IdentifyError::EmptyEnrollment)
    ));
}

/// Identity-like projection: 3 features -> 3 -> 3 with non-negative inputs.
fn identity_checkpoint() -> Checkpoint {
    let eye = vec![vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0], vec![0.0, 0.0, 1.0]];
    Checkpoint {
        feature_dim: 3,
        embedding_size: vec![3, 3],
        num_classes: 3,
        mode: "i".into(),
        layers: vec![
            Dense {
                weights: eye.clone(),
                bias: vec![0.0; 3],
            },
            Dense {
                weights: eye.clone(),
                bias: vec![0.0; 3],
            },
        ],
        classifier: Some(Dense {
            weights: eye,
            bias: vec![0.0; 3],
        }),
    }
}

#[test]
fn end_to_end_on_disk() {
    let root = tempfile::tempdir().unwrap();
    let log_dir = root.path().join("model_saved");
    let embed_dir = root.path().join("enroll_embeddings");
    let test_dir = root.path().join("test_feats");
    std::fs::create_dir_all(&log_dir).unwrap();

    std::fs::write(
        checkpoint_path(&log_dir, 27),
        serde_json::to_vec(&identity_checkpoint()).unwrap(),
    )
    .unwrap();
    let cfg = ModelConfig {
        embedding_size: vec![3, 3],
        num_classes: 3,
        mode: "i".into(),
    };
    let model = ProjectionModel::load(&log_dir, 27, &cfg).unwrap();
    let identifier = Identifier::new(&model, 100, 1.0).unwrap();

    // Enroll every speaker from its own utterance and persist the table.
    let mut table = EnrollmentTable::new();
    for (i, spk) in SPEAKERS.iter().enumerate() {
        let emb = identifier.enroll(&[utterance(i)]).unwrap();
        table.insert(*spk, emb).unwrap();
    }
    table.save_dir(&embed_dir).unwrap();
    let table = EnrollmentTable::load_dir(&embed_dir).unwrap();
    assert_eq!(table.len(), 3);

    // Test features under <test_dir>/<speaker>/, one file left out.
    for (i, spk) in SPEAKERS.iter().enumerate() {
        let dir = test_dir.join(spk);
        std::fs::create_dir_all(&dir).unwrap();
        utterance(i).with_label(*spk).save(dir.join("test0.json")).unwrap();
    }
    let manifest = Manifest::parse(
        "filename,speaker\ntest0.json,alice\ntest0.json,bob\ntest0.json,carol\ntest1.json,carol\n",
        ',',
    )
    .unwrap();

    let source = FeatureDir {
        root: test_dir,
        speaker_subdirs: true,
    };
    let mut runner = IdentificationRunner::new(&identifier, &table).unwrap();
    runner.run(&manifest, &source);
    let report = runner.finalize();

    assert_eq!(report.summary.evaluated, 3);
    assert_eq!(report.summary.correct, 3);
    assert_eq!(report.summary.skipped, 1);
    assert_eq!(report.summary.accuracy, 100.0);

    let out = root.path().join("output/identification.txt");
    append_accuracy(&out, &report.summary).unwrap();
    let text = std::fs::read_to_string(&out).unwrap();
    assert_eq!(text, "Accuracy 100.00 evaluated=3 correct=3 skipped=1\n");
}
