//! Error types for isovox

use thiserror::Error;

/// Main error type for the crate
#[derive(Debug, Error)]
pub enum Error {
    #[error("Unknown isosurface algorithm id: {0}")]
    UnknownAlgorithm(u32),

    #[error("Unknown isosurface algorithm: {0}")]
    UnknownAlgorithmName(String),

    #[error("There is a density job already running on this field")]
    DensityJobPending,

    #[error("There is a mesh job already running on this builder")]
    MeshJobPending,

    #[error("Border size must be at least 1, got {0}")]
    InvalidBorder(usize),

    #[error("{algorithm} needs a border of at least {required}, got {border}")]
    BorderTooThin { algorithm: &'static str, required: usize, border: usize },

    #[error("Density field has not been allocated")]
    FieldNotAllocated,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(#[from] serde_json::Error),
}
