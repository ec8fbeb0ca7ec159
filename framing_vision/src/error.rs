//! Error types for composition analysis.

use thiserror::Error;

/// Result type for composition analysis operations.
pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Failure reported by a `SaliencyOracle` implementation.
#[derive(Debug, Error)]
pub enum OracleError {
    #[error("saliency model failed: {0}")]
    Model(String),

    #[error("image could not be read by the saliency model: {0}")]
    UnreadableImage(String),
}

impl OracleError {
    pub fn model(message: impl Into<String>) -> Self {
        Self::Model(message.into())
    }
}

/// Errors that can occur while analyzing a frame.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("image has zero area ({width}x{height})")]
    ZeroArea { width: u32, height: u32 },

    #[error(
        "saliency map is {actual_width}x{actual_height} but the processing image is {expected_width}x{expected_height}"
    )]
    DimensionMismatch {
        expected_width: u32,
        expected_height: u32,
        actual_width: u32,
        actual_height: u32,
    },

    #[error("saliency buffer holds {actual} values, expected {expected}")]
    BufferLength { expected: usize, actual: usize },

    #[error("binarization threshold must lie in [0, 1], got {0}")]
    InvalidThreshold(f32),

    #[error("cannot scale from a zero-sized space ({width}x{height})")]
    InvalidScale { width: f64, height: f64 },

    #[error("frame has no extent ({width}x{height})")]
    EmptyFrame { width: f64, height: f64 },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("saliency oracle failed: {0}")]
    Oracle(#[from] OracleError),

    #[error("an analysis is already in flight")]
    Busy,

    #[error("analysis worker failed: {0}")]
    Worker(String),
}

impl AnalysisError {
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }

    /// Whether the error came from the saliency oracle rather than the engine.
    pub fn is_oracle_failure(&self) -> bool {
        matches!(self, Self::Oracle(_))
    }
}
