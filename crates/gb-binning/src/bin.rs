//! A single spatial bin and its per-bin queries.

use gb_core::{Error, Result, RowTable};
use serde::{Deserialize, Serialize};

use crate::likelihood::heteroscedastic_log_likelihood;

/// Mean/dispersion estimate of a bin's target distribution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BinEstimate {
    /// No estimate yet.
    #[default]
    Unestimated,
    /// Maximum-likelihood mean `mu` and dispersion `sigma`.
    Estimated {
        /// Mean.
        mu: f64,
        /// Dispersion (population standard deviation).
        sigma: f64,
    },
}

impl BinEstimate {
    /// `(mu, sigma)` if estimated.
    pub fn values(&self) -> Option<(f64, f64)> {
        match *self {
            BinEstimate::Estimated { mu, sigma } => Some((mu, sigma)),
            BinEstimate::Unestimated => None,
        }
    }
}

/// Rows sharing one bin index, plus geometry and the current estimate.
#[derive(Debug, Clone)]
pub struct Bin {
    index: i64,
    data: RowTable,
    placeholder: bool,
    target_column: String,
    x_boundaries: Option<(f64, f64)>,
    y_boundaries: Option<(f64, f64)>,
    z_boundaries: Option<(f64, f64)>,
    r_boundaries: Option<(f64, f64)>,
    estimate: BinEstimate,
}

impl Bin {
    /// Bin over `data`, whose rows all carry `index`.
    pub fn new(index: i64, data: RowTable, target_column: impl Into<String>) -> Self {
        Self {
            index,
            data,
            placeholder: false,
            target_column: target_column.into(),
            x_boundaries: None,
            y_boundaries: None,
            z_boundaries: None,
            r_boundaries: None,
            estimate: BinEstimate::Unestimated,
        }
    }

    /// Empty bin: a single all-`NaN` row shaped like `schema`, with no error data.
    pub fn placeholder(index: i64, schema: &RowTable, target_column: impl Into<String>) -> Self {
        Self { placeholder: true, ..Self::new(index, schema.placeholder(index), target_column) }
    }

    /// Bin index.
    pub fn index(&self) -> i64 {
        self.index
    }

    /// Whether this bin stands in for an index with no data.
    pub fn is_placeholder(&self) -> bool {
        self.placeholder
    }

    /// Rows owned by the bin (the synthetic row for a placeholder).
    pub fn data(&self) -> &RowTable {
        &self.data
    }

    /// Column the likelihood is evaluated on.
    pub fn target_column(&self) -> &str {
        &self.target_column
    }

    /// Number of data rows (0 for a placeholder).
    pub fn point_count(&self) -> usize {
        if self.placeholder { 0 } else { self.data.n_rows() }
    }

    /// `(x_low, x_high)` once geometry is assigned.
    pub fn x_boundaries(&self) -> Option<(f64, f64)> {
        self.x_boundaries
    }

    /// `(y_low, y_high)` once geometry is assigned.
    pub fn y_boundaries(&self) -> Option<(f64, f64)> {
        self.y_boundaries
    }

    /// Optional z-range.
    pub fn z_boundaries(&self) -> Option<(f64, f64)> {
        self.z_boundaries
    }

    /// Optional galactocentric radius range.
    pub fn r_boundaries(&self) -> Option<(f64, f64)> {
        self.r_boundaries
    }

    pub(crate) fn set_boundaries(&mut self, x: (f64, f64), y: (f64, f64)) {
        self.x_boundaries = Some(x);
        self.y_boundaries = Some(y);
    }

    /// Set the z-range.
    pub fn set_z_boundaries(&mut self, z: (f64, f64)) {
        self.z_boundaries = Some(z);
    }

    /// Set the radius range.
    pub fn set_r_boundaries(&mut self, r: (f64, f64)) {
        self.r_boundaries = Some(r);
    }

    /// Current estimate.
    pub fn estimate(&self) -> BinEstimate {
        self.estimate
    }

    /// Record an estimate. `sigma` must be finite and non-negative, `mu` finite.
    pub fn set_estimate(&mut self, mu: f64, sigma: f64) -> Result<()> {
        if !mu.is_finite() || !sigma.is_finite() || sigma < 0.0 {
            return Err(Error::Validation(format!(
                "invalid estimate for bin {}: mu={mu}, sigma={sigma}",
                self.index
            )));
        }
        self.estimate = BinEstimate::Estimated { mu, sigma };
        Ok(())
    }

    /// Reset to [`BinEstimate::Unestimated`].
    pub fn clear_estimate(&mut self) {
        self.estimate = BinEstimate::Unestimated;
    }

    /// Values of a column, in row order.
    pub fn get_parameter_data(&self, name: &str) -> Result<&[f64]> {
        self.data.require_column(name)
    }

    /// Target-component measurement variance of every row.
    pub fn get_variance_data(&self) -> Result<Vec<f64>> {
        match self.data.errors() {
            Some(errors) if !self.placeholder => {
                Ok(errors.iter().map(|e| e.target_variance()).collect())
            }
            _ => Err(Error::MissingErrorData(self.index)),
        }
    }

    /// Target-component measurement error (standard deviation) of every row.
    pub fn get_error_data(&self) -> Result<Vec<f64>> {
        Ok(self.get_variance_data()?.into_iter().map(f64::sqrt).collect())
    }

    /// Log-likelihood at the bin's own estimate.
    ///
    /// Fails with [`Error::MissingEstimate`] if no estimate is set. A bin without usable
    /// error data yields `-inf`.
    pub fn log_likelihood(&self) -> Result<f64> {
        match self.estimate {
            BinEstimate::Estimated { mu, sigma } => self.log_likelihood_at(mu, sigma),
            BinEstimate::Unestimated => Err(Error::MissingEstimate(self.index)),
        }
    }

    /// Log-likelihood at an explicit `(mu, sigma)`; `-inf` without usable error data.
    pub fn log_likelihood_at(&self, mu: f64, sigma: f64) -> Result<f64> {
        let variances = match self.get_variance_data() {
            Ok(v) if !v.is_empty() => v,
            _ => {
                tracing::debug!(bin_index = self.index, "no error data inside bin");
                return Ok(f64::NEG_INFINITY);
            }
        };
        let values = self.get_parameter_data(&self.target_column)?;
        Ok(heteroscedastic_log_likelihood(values, &variances, mu, sigma))
    }
}
