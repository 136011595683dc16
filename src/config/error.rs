use thiserror::Error;

use crate::sampling::SamplingError;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid geometry: {0}")]
    Geometry(String),

    #[error("typelidf should be 1 (Verhoef bimodal) or 2 (Campbell), got {0}")]
    LidfType(u8),

    #[error("{0}")]
    LeafModel(String),

    #[error("{0} must be positive")]
    NonPositive(&'static str),

    #[error("Invalid fAPAR window [{0}, {1})")]
    FaparWindow(f64, f64),

    #[error("Data file not found: {0}")]
    DataFile(String),

    #[error(transparent)]
    Sampling(#[from] SamplingError),
}
