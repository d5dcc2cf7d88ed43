//! Serializable per-bin and per-collection summaries.

use gb_binning::{BinCollection, BinEstimate};
use gb_core::{Error, Result};
use serde::{Deserialize, Serialize};

use crate::bootstrap::{BootstrapConfig, bin_weighted_error};
use crate::mle::total_log_likelihood;

/// Summary of one bin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinSummary {
    /// Bin index.
    pub index: i64,
    /// Grid column (x cell).
    pub column: usize,
    /// Grid row (y cell).
    pub row: usize,
    /// x-range.
    pub x_boundaries: Option<(f64, f64)>,
    /// y-range.
    pub y_boundaries: Option<(f64, f64)>,
    /// Data rows in the bin.
    pub n_points: usize,
    /// Mean of the target column (`NaN`/`null` for empty bins).
    pub target_mean: f64,
    /// Current estimate.
    pub estimate: BinEstimate,
    /// Log-likelihood at the estimate (`None` when unestimated).
    pub log_likelihood: Option<f64>,
    /// Bootstrap error of the weighted target mean (`None` when not computed).
    pub bootstrap_error: Option<f64>,
}

/// Summary of a generated collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionReport {
    /// Bins per axis.
    pub n_bins: usize,
    /// Rows in the input table.
    pub n_rows: usize,
    /// Placeholder bins.
    pub n_empty: usize,
    /// Sum of finite per-bin log-likelihoods.
    pub total_log_likelihood: f64,
    /// Per-bin summaries in generation order.
    pub bins: Vec<BinSummary>,
}

/// Summarise a generated collection; bootstrap errors are computed when `bootstrap` is
/// given, for bins with at least one row and usable error data.
pub fn build_report(
    collection: &BinCollection,
    bootstrap: Option<&BootstrapConfig>,
) -> Result<CollectionReport> {
    if !collection.is_generated() {
        return Err(Error::NotInitialized(
            "no bins in collection; call generate_bins() first".into(),
        ));
    }
    let target = collection.options().target_column.as_str();

    let mut bins = Vec::with_capacity(collection.bins().len());
    for (slot, bin) in collection.iter() {
        let log_likelihood = match bin.estimate() {
            BinEstimate::Unestimated => None,
            BinEstimate::Estimated { .. } => Some(bin.log_likelihood()?),
        };
        let bootstrap_error = match bootstrap {
            Some(cfg) if bin.point_count() > 0 => match bin_weighted_error(bin, cfg) {
                Ok(e) => Some(e),
                Err(Error::MissingErrorData(_)) => None,
                Err(e) => return Err(e),
            },
            _ => None,
        };
        bins.push(BinSummary {
            index: bin.index(),
            column: slot.column,
            row: slot.row,
            x_boundaries: bin.x_boundaries(),
            y_boundaries: bin.y_boundaries(),
            n_points: bin.point_count(),
            target_mean: bin.data().mean(target)?,
            estimate: bin.estimate(),
            log_likelihood,
            bootstrap_error,
        });
    }

    Ok(CollectionReport {
        n_bins: collection.n_bins(),
        n_rows: collection.data().n_rows(),
        n_empty: collection.bins().iter().filter(|b| b.is_placeholder()).count(),
        total_log_likelihood: total_log_likelihood(collection)?,
        bins,
    })
}
