//! Error types for the suitability engine.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SuitabilityError {
    #[error("no valid raster files found in data folder {}", data_dir.display())]
    NoReferenceData { data_dir: PathBuf },

    #[error("invalid weights: {0}")]
    InvalidWeights(String),

    #[error("no factor could be applied (total applied weight is zero)")]
    NoFactorsApplied,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TIFF error: {0}")]
    Tiff(#[from] tiff::TiffError),

    #[error("unsupported sample format: {0}")]
    UnsupportedSampleFormat(String),

    #[error("{} carries no georeferencing tags", path.display())]
    MissingGeoreference { path: PathBuf },

    #[error("grid dimension mismatch: expected {expected} cells, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("an analysis is already in progress")]
    AnalysisInProgress,
}

pub type Result<T> = std::result::Result<T, SuitabilityError>;
