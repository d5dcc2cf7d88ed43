//! Bootstrap error of the inverse-error weighted mean.
//!
//! The weighted mean is `Σ(v_i / s_i) / Σ(1 / s_i)`, weighting by the inverse measurement
//! standard deviation `s_i` (not the inverse variance). The 1-sigma error is half the
//! distance between the 16th and 84th percentiles of the bootstrap distribution.
//!
//! ## Reproducibility
//!
//! [`weighted_error`] draws from the caller's RNG. [`weighted_error_par`] gives every trial
//! its own RNG derived from `(seed, trial)`, so results are bit-exact across runs and
//! independent of the rayon thread count.

use gb_binning::Bin;
use gb_core::{Error, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Default number of bootstrap trials.
pub const DEFAULT_ITERATIONS: usize = 1000;

/// Bootstrap settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BootstrapConfig {
    /// Number of resampling trials.
    pub iterations: usize,
    /// Base seed.
    pub seed: u64,
    /// Lower percentile of the interval (as a fraction).
    pub lower_quantile: f64,
    /// Upper percentile of the interval (as a fraction).
    pub upper_quantile: f64,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self { iterations: DEFAULT_ITERATIONS, seed: 0, lower_quantile: 0.16, upper_quantile: 0.84 }
    }
}

impl BootstrapConfig {
    /// Check iteration count and quantile ordering.
    pub fn validate(&self) -> Result<()> {
        if self.iterations == 0 {
            return Err(Error::Validation("bootstrap iterations must be > 0".into()));
        }
        let (lo, hi) = (self.lower_quantile, self.upper_quantile);
        if !(0.0..=1.0).contains(&lo) || !(0.0..=1.0).contains(&hi) || lo >= hi {
            return Err(Error::Validation(format!(
                "bootstrap quantiles must satisfy 0 <= lower < upper <= 1, got ({lo}, {hi})"
            )));
        }
        Ok(())
    }
}

/// Counter-based trial RNG. Same `(seed, trial)` gives the same draws.
#[inline]
fn trial_rng(seed: u64, trial: u64) -> StdRng {
    StdRng::seed_from_u64(seed.wrapping_mul(2654435761).wrapping_add(trial))
}

/// Quantile for sorted data via linear interpolation.
///
/// - `q=0` returns min
/// - `q=1` returns max
/// - empty input returns `NaN`
pub fn quantile_linear_sorted(sorted: &[f64], q: f64) -> f64 {
    match sorted.len() {
        0 => return f64::NAN,
        1 => return sorted[0],
        _ => {}
    }
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let (i, j) = (pos.floor() as usize, pos.ceil() as usize);
    if i == j {
        return sorted[i];
    }
    let t = pos - i as f64;
    (1.0 - t) * sorted[i] + t * sorted[j]
}

/// Half the distance between the `lower` and `upper` quantiles of `samples`.
pub fn half_width(samples: &[f64], lower: f64, upper: f64) -> f64 {
    let mut sorted = samples.to_vec();
    sorted.sort_by(f64::total_cmp);
    0.5 * (quantile_linear_sorted(&sorted, upper) - quantile_linear_sorted(&sorted, lower))
}

/// `Σ(v_i / s_i) / Σ(1 / s_i)`.
pub fn weighted_mean(values: &[f64], sigmas: &[f64]) -> f64 {
    let (num, den) =
        values.iter().zip(sigmas).fold((0.0, 0.0), |(num, den), (&v, &s)| (num + v / s, den + 1.0 / s));
    num / den
}

fn check_inputs(values: &[f64], sigmas: &[f64], iterations: usize) -> Result<()> {
    if values.is_empty() && sigmas.is_empty() {
        return Err(Error::EmptyInput("bootstrap requires at least one value".into()));
    }
    if values.len() != sigmas.len() {
        return Err(Error::Validation(format!(
            "values/sigmas length mismatch: {} vs {}",
            values.len(),
            sigmas.len()
        )));
    }
    if iterations == 0 {
        return Err(Error::Validation("bootstrap iterations must be > 0".into()));
    }
    Ok(())
}

/// Weighted mean of one resample (with replacement) of size `values.len()`.
fn resampled_weighted_mean<R: Rng + ?Sized>(values: &[f64], sigmas: &[f64], rng: &mut R) -> f64 {
    let n = values.len();
    let mut num = 0.0;
    let mut den = 0.0;
    for _ in 0..n {
        let k = rng.random_range(0..n);
        num += values[k] / sigmas[k];
        den += 1.0 / sigmas[k];
    }
    num / den
}

/// Weighted means of `iterations` bootstrap resamples.
pub fn bootstrap_weighted_means<R: Rng + ?Sized>(
    values: &[f64],
    sigmas: &[f64],
    iterations: usize,
    rng: &mut R,
) -> Result<Vec<f64>> {
    check_inputs(values, sigmas, iterations)?;
    Ok((0..iterations).map(|_| resampled_weighted_mean(values, sigmas, rng)).collect())
}

/// 1-sigma bootstrap error of the weighted mean (16th/84th percentiles).
pub fn weighted_error<R: Rng + ?Sized>(
    values: &[f64],
    sigmas: &[f64],
    iterations: usize,
    rng: &mut R,
) -> Result<f64> {
    let means = bootstrap_weighted_means(values, sigmas, iterations, rng)?;
    let defaults = BootstrapConfig::default();
    Ok(half_width(&means, defaults.lower_quantile, defaults.upper_quantile))
}

/// Parallel variant of [`weighted_error`] driven by a [`BootstrapConfig`].
pub fn weighted_error_par(values: &[f64], sigmas: &[f64], config: &BootstrapConfig) -> Result<f64> {
    config.validate()?;
    check_inputs(values, sigmas, config.iterations)?;
    let means: Vec<f64> = (0..config.iterations)
        .into_par_iter()
        .map(|trial| {
            let mut rng = trial_rng(config.seed, trial as u64);
            resampled_weighted_mean(values, sigmas, &mut rng)
        })
        .collect();
    Ok(half_width(&means, config.lower_quantile, config.upper_quantile))
}

/// Bootstrap error of a bin's target column, weighted by its per-row errors.
///
/// The trial seeds are offset by the bin index so neighbouring bins do not share draws.
pub fn bin_weighted_error(bin: &Bin, config: &BootstrapConfig) -> Result<f64> {
    if bin.point_count() == 0 {
        return Err(Error::EmptyInput(format!("bin {} has no rows", bin.index())));
    }
    let values = bin.get_parameter_data(bin.target_column())?;
    let sigmas = bin.get_error_data()?;
    let config =
        BootstrapConfig { seed: config.seed.wrapping_add(bin.index() as u64), ..config.clone() };
    weighted_error_par(values, &sigmas, &config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantile_linear_sorted_edges() {
        let s = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert!((quantile_linear_sorted(&s, 0.0) - 1.0).abs() < 1e-12);
        assert!((quantile_linear_sorted(&s, 1.0) - 5.0).abs() < 1e-12);
        assert!((quantile_linear_sorted(&s, 0.5) - 3.0).abs() < 1e-12);
        assert!((quantile_linear_sorted(&s, 0.16) - 1.64).abs() < 1e-12);
        assert!(quantile_linear_sorted(&[], 0.5).is_nan());
    }

    #[test]
    fn half_width_of_uniform_grid() {
        // 0..=100: 16th/84th percentiles are 16 and 84.
        let xs: Vec<f64> = (0..=100).rev().map(|i| i as f64).collect();
        assert!((half_width(&xs, 0.16, 0.84) - 34.0).abs() < 1e-12);
    }

    #[test]
    fn weighted_mean_uses_inverse_sigma() {
        // weights 1 and 1/2, not 1 and 1/4
        let m = weighted_mean(&[0.0, 3.0], &[1.0, 2.0]);
        assert!((m - 1.0).abs() < 1e-12);
    }

    #[test]
    fn empty_input_rejected() {
        let mut rng = StdRng::seed_from_u64(0);
        assert!(matches!(weighted_error(&[], &[], 1000, &mut rng), Err(Error::EmptyInput(_))));
        assert!(matches!(
            weighted_error_par(&[], &[], &BootstrapConfig::default()),
            Err(Error::EmptyInput(_))
        ));
    }

    #[test]
    fn mismatch_and_zero_iterations_rejected() {
        let mut rng = StdRng::seed_from_u64(0);
        assert!(matches!(weighted_error(&[1.0], &[], 10, &mut rng), Err(Error::Validation(_))));
        assert!(matches!(weighted_error(&[1.0], &[1.0], 0, &mut rng), Err(Error::Validation(_))));
        let bad = BootstrapConfig { lower_quantile: 0.9, upper_quantile: 0.1, ..Default::default() };
        assert!(weighted_error_par(&[1.0], &[1.0], &bad).is_err());
    }

    #[test]
    fn seeded_error_is_reproducible() {
        let values = [10.0, 12.0, 11.0, 13.0];
        let sigmas = [1.0, 1.0, 1.0, 1.0];
        let a = weighted_error(&values, &sigmas, 1000, &mut StdRng::seed_from_u64(42)).unwrap();
        let b = weighted_error(&values, &sigmas, 1000, &mut StdRng::seed_from_u64(42)).unwrap();
        assert_eq!(a, b);
        // sd/sqrt(n) = sqrt(1.25)/2 ~= 0.56
        assert!(a > 0.2 && a < 1.0, "a={a}");
    }

    #[test]
    fn constant_values_have_zero_error() {
        let mut rng = StdRng::seed_from_u64(1);
        let e = weighted_error(&[5.0; 6], &[0.5, 1.0, 2.0, 1.0, 3.0, 1.0], 200, &mut rng).unwrap();
        assert!(e.abs() < 1e-12);
    }

    #[test]
    fn parallel_error_is_reproducible() {
        let values = [10.0, 12.0, 11.0, 13.0, 9.5];
        let sigmas = [1.0, 2.0, 1.0, 0.5, 1.5];
        let cfg = BootstrapConfig { seed: 99, ..Default::default() };
        let a = weighted_error_par(&values, &sigmas, &cfg).unwrap();
        let b = weighted_error_par(&values, &sigmas, &cfg).unwrap();
        assert_eq!(a, b);
        assert!(a.is_finite() && a > 0.0);
    }
}
