//! # gb-core
//!
//! Core types shared by the GalBin crates.
//!
//! This crate provides:
//! - the workspace-wide [`Error`] / [`Result`] types,
//! - [`RowTable`], a columnar (structure-of-arrays) table of measurement rows,
//! - [`Covariance6`] and the astrometric covariance builder.

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Per-row 6x6 covariance matrices and their construction from astrometric errors.
pub mod covariance;
/// Error types.
pub mod error;
/// Columnar measurement table.
pub mod table;

pub use covariance::{AstrometricErrors, Covariance6, TARGET_VARIANCE_INDEX};
pub use error::{Error, Result};
pub use table::{BIN_INDEX_COLUMN, RowError, RowTable};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
