//! Vector Quantization
//!
//! Lossy compression of sample grids with trained codebooks.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                     Vector Quantization                          │
//! ├──────────────────────────────────────────────────────────────────┤
//! │                                                                  │
//! │  Encoder:                                                        │
//! │  ┌─────────┐    ┌──────────┐    ┌──────────┐    ┌───────────┐   │
//! │  │  Grid   │ -> │ Vectorize│ -> │  Lloyd   │ -> │ codebook  │   │
//! │  │ samples │    │ (blocks) │    │ training │    │ + indices │   │
//! │  └─────────┘    └──────────┘    └──────────┘    └───────────┘   │
//! │                                                       │          │
//! │                                                  image.vqc       │
//! │  Decoder:                                             │          │
//! │  ┌─────────┐    ┌──────────┐    ┌──────────┐          │          │
//! │  │  Grid   │ <- │  Paint   │ <- │ Codebook │ <────────┘          │
//! │  │         │    │  blocks  │    │  lookup  │                     │
//! │  └─────────┘    └──────────┘    └──────────┘                     │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use codevec::{CodecSession, Grid, SessionConfig, TrainingConfig, BlockShape};
//!
//! let grid = Grid::new(2, 2, 1, vec![10.0, 10.0, 200.0, 200.0])?;
//! let session = CodecSession::new(SessionConfig {
//!     block: BlockShape::SINGLE,
//!     training: TrainingConfig::with_codebook_size(2).seeded(7),
//!     ..Default::default()
//! });
//!
//! let compressed = session.compress(&grid)?;
//! let restored = CodecSession::decompress(&compressed.artifact)?;
//! assert_eq!(restored.layout(), grid.layout());
//! # Ok::<(), codevec::Error>(())
//! ```

mod format;
pub mod pnm;
mod report;
mod session;
mod training;
mod vectorize;

pub use codevec_core::{
    assign, classify, distance, Assignment, Codebook, Distortion, Error, Result, UsageStats, Vector,
};
pub use format::{PackedIndices, VqcFile, VqcHeader, VqcMetadata};
pub use report::{Diagnostic, TrainingReport};
pub use session::{CodecSession, Compressed, SessionConfig};
pub use training::{
    train, CodebookTrainer, EmptyClusterPolicy, InitStrategy, TrainedCodebook, TrainingConfig,
};
pub use vectorize::{BlockEncoding, BlockShape, Grid, GridLayout, SampleRange, Vectorizer};

/// File extension for VQC artifacts
pub const VQC_EXTENSION: &str = "vqc";

/// Magic bytes for VQC format
pub const VQC_MAGIC: [u8; 4] = [0x56, 0x51, 0x43, 0x00]; // "VQC\0"

/// Current VQC format version
pub const VQC_VERSION: u16 = 1;

/// Prelude for common imports
pub mod prelude {
    pub use super::{CodecSession, Grid, Result, SessionConfig, TrainingConfig, VqcFile};
}
