//! Error types for GalBin

use thiserror::Error;

/// GalBin error type
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid configuration (bin count, grid geometry, config values)
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Required column absent from the table schema
    #[error("Missing column: '{0}'")]
    MissingColumn(String),

    /// Operation requires bins that have not been generated yet
    #[error("Not initialized: {0}")]
    NotInitialized(String),

    /// `generate_bins` was called on a collection that already holds bins
    #[error("Bins already generated ({0} bins present)")]
    AlreadyGenerated(usize),

    /// Likelihood requested before mean/dispersion were estimated
    #[error("No mean/dispersion estimate set for bin {0}")]
    MissingEstimate(i64),

    /// Bin has no usable measurement-error data
    #[error("No usable error data in bin {0}")]
    MissingErrorData(i64),

    /// Operation requires at least one sample
    #[error("Empty input: {0}")]
    EmptyInput(String),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Computation error
    #[error("Computation error: {0}")]
    Computation(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
