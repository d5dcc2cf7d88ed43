//! Maximum-likelihood mean and dispersion of a bin.
//!
//! For fixed `sigma` the optimal mean is the weighted mean with weights `1/(sigma² + e_i)`
//! ([`profile_mean`]), so the fit reduces to a 1D maximisation of the profile likelihood
//! over `sigma`. The profile can have several local maxima, so a coarse scan of
//! `[0, sigma_max]` picks the best cell first and golden-section search refines inside it.

use gb_binning::{Bin, BinCollection, heteroscedastic_log_likelihood, profile_mean};
use gb_core::{Error, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// `(sqrt(5) - 1) / 2`
const INV_PHI: f64 = 0.618_033_988_749_894_8;

/// Points of the coarse `sigma` scan, both ends included.
const SCAN_POINTS: usize = 64;

/// Estimator settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimatorConfig {
    /// Bins with fewer rows are left unestimated.
    pub min_points: usize,
    /// Relative tolerance on the `sigma` bracket.
    pub rtol: f64,
    /// Maximum golden-section iterations.
    pub max_iter: usize,
    /// Upper end of the `sigma` bracket, in units of the sample standard deviation.
    pub sigma_max_factor: f64,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self { min_points: 2, rtol: 1e-8, max_iter: 200, sigma_max_factor: 2.0 }
    }
}

/// Result of a single-bin fit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BinFit {
    /// Best-fit mean.
    pub mu: f64,
    /// Best-fit dispersion.
    pub sigma: f64,
    /// Log-likelihood at the optimum.
    pub log_likelihood: f64,
    /// Golden-section iterations used.
    pub n_iter: usize,
    /// Whether the bracket shrank below tolerance.
    pub converged: bool,
}

/// Per-collection estimation counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EstimationSummary {
    /// Bins with a new estimate.
    pub n_estimated: usize,
    /// Bins skipped (too few rows or no error data).
    pub n_skipped: usize,
    /// Bins whose fit failed on invalid data.
    pub n_failed: usize,
}

fn profile_ll(values: &[f64], variances: &[f64], sigma: f64) -> f64 {
    let mu = profile_mean(values, variances, sigma);
    let ll = heteroscedastic_log_likelihood(values, variances, mu, sigma);
    // sigma = 0 with a noiseless row gives NaN
    if ll.is_nan() { f64::NEG_INFINITY } else { ll }
}

/// Best cell `[lo, hi]` of an evenly spaced scan over `[0, sigma_max]`.
fn scan_bracket(values: &[f64], variances: &[f64], sigma_max: f64) -> (f64, f64) {
    let step = sigma_max / (SCAN_POINTS - 1) as f64;
    let at = |k: usize| if k == SCAN_POINTS - 1 { sigma_max } else { step * k as f64 };

    let mut best = 0;
    let mut best_ll = f64::NEG_INFINITY;
    for k in 0..SCAN_POINTS {
        let ll = profile_ll(values, variances, at(k));
        if ll > best_ll {
            best = k;
            best_ll = ll;
        }
    }
    (at(best.saturating_sub(1)), at((best + 1).min(SCAN_POINTS - 1)))
}

/// Fit `(mu, sigma)` to values with per-row measurement variances.
pub fn fit_heteroscedastic(
    values: &[f64],
    variances: &[f64],
    config: &EstimatorConfig,
) -> Result<BinFit> {
    if values.is_empty() {
        return Err(Error::EmptyInput("cannot fit an empty sample".into()));
    }
    if values.len() != variances.len() {
        return Err(Error::Validation(format!(
            "values/variances length mismatch: {} vs {}",
            values.len(),
            variances.len()
        )));
    }
    if values.iter().any(|v| !v.is_finite()) {
        return Err(Error::Validation("values must be finite".into()));
    }
    if variances.iter().any(|e| !e.is_finite() || *e < 0.0) {
        return Err(Error::Validation("variances must be finite and >= 0".into()));
    }
    if !(config.rtol > 0.0) || config.max_iter == 0 || !(config.sigma_max_factor > 0.0) {
        return Err(Error::InvalidConfiguration(format!("invalid estimator config: {config:?}")));
    }

    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let sd = (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n).sqrt();

    let sigma_max = (sd * config.sigma_max_factor).max(f64::EPSILON);
    let (mut lo, mut hi) = scan_bracket(values, variances, sigma_max);
    let mut c = hi - INV_PHI * (hi - lo);
    let mut d = lo + INV_PHI * (hi - lo);
    let mut fc = profile_ll(values, variances, c);
    let mut fd = profile_ll(values, variances, d);

    let mut n_iter = 0;
    let mut converged = false;
    while n_iter < config.max_iter {
        if (hi - lo) <= config.rtol * hi.abs().max(1.0) {
            converged = true;
            break;
        }
        if fc >= fd {
            hi = d;
            d = c;
            fd = fc;
            c = hi - INV_PHI * (hi - lo);
            fc = profile_ll(values, variances, c);
        } else {
            lo = c;
            c = d;
            fc = fd;
            d = lo + INV_PHI * (hi - lo);
            fd = profile_ll(values, variances, d);
        }
        n_iter += 1;
    }

    let sigma = 0.5 * (lo + hi);
    let mu = profile_mean(values, variances, sigma);
    let log_likelihood = heteroscedastic_log_likelihood(values, variances, mu, sigma);
    if !mu.is_finite() || !log_likelihood.is_finite() {
        return Err(Error::Computation(format!(
            "non-finite fit result: mu={mu}, sigma={sigma}, ll={log_likelihood}"
        )));
    }
    Ok(BinFit { mu, sigma, log_likelihood, n_iter, converged })
}

/// Fit one bin and store the estimate on it.
///
/// Returns `Ok(None)` (bin left untouched) for bins with fewer than `min_points` rows or
/// without usable error data.
pub fn estimate_bin(bin: &mut Bin, config: &EstimatorConfig) -> Result<Option<BinFit>> {
    if bin.point_count() < config.min_points.max(1) {
        return Ok(None);
    }
    let variances = match bin.get_variance_data() {
        Ok(v) => v,
        Err(Error::MissingErrorData(_)) => return Ok(None),
        Err(e) => return Err(e),
    };
    let values = bin.get_parameter_data(bin.target_column())?;
    let fit = fit_heteroscedastic(values, &variances, config)?;
    bin.set_estimate(fit.mu, fit.sigma)?;
    Ok(Some(fit))
}

/// Estimate every bin of a generated collection in parallel.
///
/// Bins whose data is invalid are logged and counted as failed; other errors (e.g. a
/// missing target column) abort the run.
pub fn estimate_collection(
    collection: &mut BinCollection,
    config: &EstimatorConfig,
) -> Result<EstimationSummary> {
    if !collection.is_generated() {
        return Err(Error::NotInitialized(
            "no bins in collection; call generate_bins() first".into(),
        ));
    }
    let outcomes: Vec<Result<Option<BinFit>>> =
        collection.bins_mut().par_iter_mut().map(|bin| estimate_bin(bin, config)).collect();

    let mut summary = EstimationSummary::default();
    for (bin, outcome) in collection.bins().iter().zip(outcomes) {
        match outcome {
            Ok(Some(_)) => summary.n_estimated += 1,
            Ok(None) => summary.n_skipped += 1,
            Err(e @ (Error::Validation(_) | Error::Computation(_))) => {
                tracing::warn!(bin_index = bin.index(), error = %e, "bin estimation failed");
                summary.n_failed += 1;
            }
            Err(e) => return Err(e),
        }
    }
    tracing::info!(
        n_estimated = summary.n_estimated,
        n_skipped = summary.n_skipped,
        n_failed = summary.n_failed,
        "bin estimation complete"
    );
    Ok(summary)
}

/// Sum of finite log-likelihoods over estimated bins.
///
/// Uninformative bins (`-inf`) and unestimated bins contribute nothing.
pub fn total_log_likelihood(collection: &BinCollection) -> Result<f64> {
    let mut total = 0.0;
    for bin in collection.bins() {
        if bin.estimate().values().is_none() {
            continue;
        }
        let ll = bin.log_likelihood()?;
        if ll.is_finite() {
            total += ll;
        }
    }
    Ok(total)
}
