//! Error types for quantization operations.

use thiserror::Error;

/// Result type alias for quantization operations.
pub type Result<T> = core::result::Result<T, Error>;

/// Quantization error types.
///
/// Non-fatal training conditions (empty clusters, iteration cap reached) are
/// not errors; they are reported as diagnostics by the trainer.
#[derive(Debug, Error)]
pub enum Error {
    /// Caller supplied an unusable argument (bad `k`, empty input, bad config).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Two vectors that must share a dimension do not.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// I/O error from an underlying reader or writer.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Persisted data is malformed or does not match the expected shape.
    #[error("format mismatch: {0}")]
    FormatMismatch(String),
}

impl Error {
    /// Create an invalid argument error.
    pub fn invalid(message: impl Into<String>) -> Self {
        Error::InvalidArgument(message.into())
    }

    /// Create a format mismatch error.
    pub fn format(message: impl Into<String>) -> Self {
        Error::FormatMismatch(message.into())
    }

    /// Create a dimension mismatch error.
    pub fn dimension_mismatch(expected: usize, actual: usize) -> Self {
        Error::DimensionMismatch { expected, actual }
    }

    /// True for errors caused by the caller's arguments rather than by data or I/O.
    pub fn is_invalid_argument(&self) -> bool {
        matches!(
            self,
            Error::InvalidArgument(_) | Error::DimensionMismatch { .. }
        )
    }

    /// Get error category for logs and metrics.
    pub fn category(&self) -> &'static str {
        match self {
            Error::InvalidArgument(_) => "invalid_argument",
            Error::DimensionMismatch { .. } => "dimension_mismatch",
            Error::Io(_) => "io_failure",
            Error::FormatMismatch(_) => "format_mismatch",
        }
    }
}
