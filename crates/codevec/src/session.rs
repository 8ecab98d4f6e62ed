//! Codec session: grid → vectors → codebook → artifact, and back.

use codevec_core::{assign, Codebook, Distortion, Error, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::format::{VqcFile, VqcMetadata};
use crate::report::TrainingReport;
use crate::training::{CodebookTrainer, TrainingConfig};
use crate::vectorize::{BlockEncoding, BlockShape, Grid, SampleRange, Vectorizer};

/// Configuration for a codec session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Block shape in grid positions
    #[serde(default)]
    pub block: BlockShape,
    /// How each block becomes a vector
    #[serde(default)]
    pub encoding: BlockEncoding,
    /// Valid output sample range
    #[serde(default)]
    pub range: SampleRange,
    /// Codebook training settings
    #[serde(default)]
    pub training: TrainingConfig,
}

impl SessionConfig {
    /// Reject configurations a session cannot run with.
    ///
    /// Block shape and sample range are checked on construction.
    pub fn validate(&self) -> Result<()> {
        self.training.validate()
    }
}

/// Result of compressing one grid.
#[derive(Debug, Clone)]
pub struct Compressed {
    /// Persistable artifact
    pub artifact: VqcFile,
    /// Training diagnostics
    pub report: TrainingReport,
}

impl Compressed {
    /// Reconstruct the grid the artifact decodes to.
    pub fn preview(&self) -> Result<Grid> {
        CodecSession::decompress(&self.artifact)
    }
}

/// Vector-quantization codec session
#[derive(Debug, Clone)]
pub struct CodecSession {
    config: SessionConfig,
    vectorizer: Vectorizer,
}

impl CodecSession {
    /// Create a new session
    pub fn new(config: SessionConfig) -> Self {
        let vectorizer = Vectorizer::new(config.block, config.encoding);
        Self { config, vectorizer }
    }

    /// Get session configuration
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// The vectorizer this session cuts grids with.
    pub fn vectorizer(&self) -> &Vectorizer {
        &self.vectorizer
    }

    /// Train a codebook on `grid` and encode the grid against it.
    pub fn compress(&self, grid: &Grid) -> Result<Compressed> {
        self.config.validate()?;

        let vectors = self.vectorizer.vectorize(grid)?;
        let trained = CodebookTrainer::new(self.config.training.clone()).train(&vectors)?;

        let mut metadata = VqcMetadata::new(grid.layout(), &self.vectorizer, self.config.range);
        let report = trained.report;
        metadata
            .extra
            .insert("iterations".into(), report.iterations.to_string());
        metadata
            .extra
            .insert("converged".into(), report.converged.to_string());
        metadata
            .extra
            .insert("mse".into(), format!("{:.6}", report.distortion.mse));

        let artifact = VqcFile::new(metadata, trained.codebook, trained.assignment)?;
        info!(
            "compressed {}x{}x{} grid into {} blocks with {} codewords",
            grid.height(),
            grid.width(),
            grid.channels(),
            artifact.assignment.len(),
            artifact.codebook.len()
        );

        Ok(Compressed { artifact, report })
    }

    /// Encode `grid` against an already trained codebook.
    pub fn encode_with(&self, codebook: &Codebook, grid: &Grid) -> Result<VqcFile> {
        self.config.validate()?;

        let vectors = self.vectorizer.vectorize(grid)?;
        let expected = self.vectorizer.vector_dim(grid.channels());
        if codebook.dim() != expected {
            return Err(Error::dimension_mismatch(expected, codebook.dim()));
        }

        let assignment = assign(codebook, &vectors);
        let mut metadata = VqcMetadata::new(grid.layout(), &self.vectorizer, self.config.range);
        let distortion = Distortion::measure(codebook, &vectors, &assignment)?;
        metadata
            .extra
            .insert("mse".into(), format!("{:.6}", distortion.mse));

        VqcFile::new(metadata, codebook.clone(), assignment)
    }

    /// Rebuild the grid an artifact describes.
    ///
    /// Uses only what the artifact stores; no session configuration is needed.
    pub fn decompress(artifact: &VqcFile) -> Result<Grid> {
        artifact.validate()?;
        let metadata = &artifact.metadata;
        metadata.vectorizer().reconstruct(
            &artifact.codebook,
            &artifact.assignment,
            metadata.layout,
            metadata.range,
        )
    }
}
