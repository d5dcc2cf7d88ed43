//! # gb-inference
//!
//! Per-bin inference for GalBin.
//!
//! This crate provides:
//! - maximum-likelihood mean/dispersion of each bin under heteroscedastic noise,
//! - bootstrap errors of the inverse-error weighted mean,
//! - serializable per-bin reports.

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Bootstrap error of the weighted mean.
pub mod bootstrap;
/// Maximum-likelihood estimation of bin mean and dispersion.
pub mod mle;
/// Per-bin and per-collection reports.
pub mod report;

pub use bootstrap::{BootstrapConfig, bin_weighted_error, weighted_error, weighted_error_par};
pub use mle::{
    BinFit, EstimationSummary, EstimatorConfig, estimate_bin, estimate_collection,
    fit_heteroscedastic, total_log_likelihood,
};
pub use report::{BinSummary, CollectionReport, build_report};
