//! Error types for terrain initialization and configuration

use thiserror::Error;

/// Main error type for the crate
///
/// Every variant describes a condition detected before a terrain exists.
/// The per-frame refinement and emission paths never return errors.
#[derive(Debug, Error)]
pub enum Error {
    #[error("terrain extents have zero area")]
    EmptyExtents,

    #[error("height grid is not square ({cols}x{rows})")]
    NotSquare { cols: usize, rows: usize },

    #[error("height grid dimension {0} is not a power of two plus one")]
    NotPowerOfTwoPlusOne(usize),

    #[error("height grid dimension {0} exceeds the supported maximum")]
    TooLarge(usize),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(#[from] serde_json::Error),
}
