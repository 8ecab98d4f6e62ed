//! End-to-end codec tests.
//!
//! Covers the full path an external caller takes:
//! 1. Build (or load) a sample grid
//! 2. Compress it with a codec session
//! 3. Persist the artifact and read it back
//! 4. Decode and compare against the input

use codevec::{
    assign, pnm, train, BlockEncoding, BlockShape, CodebookTrainer, CodecSession, Error, Grid,
    InitStrategy, SessionConfig, TrainingConfig, Vector, VqcFile,
};
use tempfile::TempDir;

/// Deterministic RGB test image: smooth gradients with two flat patches.
fn synthetic_rgb(height: usize, width: usize) -> Grid {
    let mut samples = Vec::with_capacity(height * width * 3);
    for y in 0..height {
        for x in 0..width {
            let patch = (x < width / 3) as u8 as f64;
            samples.push((x * 255 / width.max(1)) as f64);
            samples.push((y * 255 / height.max(1)) as f64);
            samples.push(40.0 + 160.0 * patch);
        }
    }
    Grid::new(height, width, 3, samples).unwrap()
}

fn two_level_config() -> SessionConfig {
    SessionConfig {
        block: BlockShape::SINGLE,
        encoding: BlockEncoding::Mean,
        training: TrainingConfig {
            codebook_size: 2,
            seed: Some(11),
            init: InitStrategy::KMeansPlusPlus,
            ..Default::default()
        },
        ..Default::default()
    }
}

#[test]
fn test_two_level_grid_roundtrip() {
    let grid = Grid::new(2, 2, 1, vec![10.0, 10.0, 200.0, 200.0]).unwrap();
    let compressed = CodecSession::new(two_level_config())
        .compress(&grid)
        .unwrap();

    assert!(compressed.report.converged);

    let mut levels: Vec<f64> = compressed
        .artifact
        .codebook
        .iter()
        .map(|c| c.as_slice()[0])
        .collect();
    levels.sort_by(f64::total_cmp);
    assert!((levels[0] - 10.0).abs() < 1e-9);
    assert!((levels[1] - 200.0).abs() < 1e-9);

    let indices = compressed.artifact.assignment.indices();
    assert_eq!(indices[0], indices[1]);
    assert_eq!(indices[2], indices[3]);
    assert_ne!(indices[0], indices[2]);

    let restored = CodecSession::decompress(&compressed.artifact).unwrap();
    assert_eq!(restored.samples(), grid.samples());
}

#[test]
fn test_same_seed_same_artifact() {
    let grid = synthetic_rgb(12, 10);
    let config = SessionConfig {
        training: TrainingConfig::with_codebook_size(6).seeded(2024),
        ..Default::default()
    };

    let a = CodecSession::new(config.clone()).compress(&grid).unwrap();
    let b = CodecSession::new(config).compress(&grid).unwrap();

    assert_eq!(a.artifact.codebook, b.artifact.codebook);
    assert_eq!(a.artifact.assignment, b.artifact.assignment);
    assert_eq!(a.report.iterations, b.report.iterations);
}

#[test]
fn test_empty_input_is_invalid_argument() {
    let err = train(&[], 3, Some(1)).unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));
    assert_eq!(err.category(), "invalid_argument");
}

#[test]
fn test_single_codeword_is_mean() {
    let vectors: Vec<Vector> = [[1.0, 2.0], [3.0, 6.0], [5.0, 10.0], [7.0, 2.0]]
        .into_iter()
        .map(Vector::from)
        .collect();
    let trained = CodebookTrainer::new(TrainingConfig::with_codebook_size(1).seeded(5))
        .train(&vectors)
        .unwrap();

    assert!(trained.report.converged);
    assert!(trained.report.iterations <= 2);
    let mean = trained.codebook.get(0).unwrap().as_slice();
    assert!((mean[0] - 4.0).abs() < 1e-12);
    assert!((mean[1] - 5.0).abs() < 1e-12);
}

#[test]
fn test_k_equal_n_distinct_is_lossless() {
    let vectors: Vec<Vector> = (0..9)
        .map(|i| Vector::from([i as f64 * 3.0, (i * i) as f64]))
        .collect();
    let config = TrainingConfig {
        codebook_size: vectors.len(),
        seed: Some(99),
        init: InitStrategy::KMeansPlusPlus,
        ..Default::default()
    };
    let trained = CodebookTrainer::new(config).train(&vectors).unwrap();

    assert_eq!(trained.report.distortion.mse, 0.0);
    assert_eq!(trained.report.usage.unused, 0);
    assert_eq!(trained.assignment, assign(&trained.codebook, &vectors));
}

#[test]
fn test_artifact_file_roundtrip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("image.vqc");

    let grid = synthetic_rgb(9, 14);
    let config = SessionConfig {
        block: BlockShape::new(2, 3).unwrap(),
        encoding: BlockEncoding::Samples,
        training: TrainingConfig::with_codebook_size(8).seeded(3),
        ..Default::default()
    };
    let compressed = CodecSession::new(config).compress(&grid).unwrap();
    compressed.artifact.save(&path).unwrap();

    let loaded = VqcFile::load(&path).unwrap();
    assert_eq!(loaded, compressed.artifact);
    assert_eq!(loaded.metadata.layout, grid.layout());
    assert_eq!(
        std::fs::metadata(&path).unwrap().len(),
        loaded.encoded_size().unwrap()
    );

    let from_file = CodecSession::decompress(&loaded).unwrap();
    let preview = compressed.preview().unwrap();
    assert_eq!(from_file, preview);
    assert_eq!(from_file.layout(), grid.layout());
}

#[test]
fn test_corrupted_artifacts_are_rejected() {
    let grid = Grid::new(2, 2, 1, vec![10.0, 10.0, 200.0, 200.0]).unwrap();
    let artifact = CodecSession::new(two_level_config())
        .compress(&grid)
        .unwrap()
        .artifact;
    let mut bytes = Vec::new();
    artifact.write_to(&mut bytes).unwrap();

    let mut bad_magic = bytes.clone();
    bad_magic[0] = b'X';
    assert!(matches!(
        VqcFile::read_from(&mut bad_magic.as_slice()),
        Err(Error::FormatMismatch(_))
    ));

    let short_header = &bytes[..20];
    assert!(matches!(
        VqcFile::read_from(&mut &short_header[..]),
        Err(Error::Io(_))
    ));

    let short_body = &bytes[..bytes.len() - 1];
    assert!(matches!(
        VqcFile::read_from(&mut &short_body[..]),
        Err(Error::FormatMismatch(_))
    ));

    // k = 2 packs indices as single bytes; the last byte is the last index.
    let mut bad_index = bytes.clone();
    let last = bad_index.len() - 1;
    bad_index[last] = 7;
    assert!(matches!(
        VqcFile::read_from(&mut bad_index.as_slice()),
        Err(Error::FormatMismatch(_))
    ));
}

#[test]
fn test_netpbm_through_codec() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("input.ppm");
    let output = dir.path().join("output.ppm");

    let grid = synthetic_rgb(8, 8);
    pnm::save(&input, &grid).unwrap();
    let loaded = pnm::load(&input).unwrap();
    assert_eq!(loaded, grid);

    let config = SessionConfig {
        training: TrainingConfig::with_codebook_size(4).seeded(8),
        ..Default::default()
    };
    let compressed = CodecSession::new(config).compress(&loaded).unwrap();
    pnm::save(&output, &compressed.preview().unwrap()).unwrap();

    let decoded = pnm::load(&output).unwrap();
    assert_eq!(decoded.layout(), grid.layout());
    assert!(decoded.samples().iter().all(|&s| (0.0..=255.0).contains(&s)));
}
