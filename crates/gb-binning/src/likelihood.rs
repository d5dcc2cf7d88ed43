//! Gaussian log-likelihood with heteroscedastic measurement noise.

/// `-0.5 * Σ [ ln(σ² + e_i) + (v_i - μ)² / (σ² + e_i) ]`
///
/// `values` and `variances` are paired per row; each row's effective variance is the
/// population variance `sigma²` plus its own measurement variance `e_i`. The constant
/// `ln(2π)` term is omitted.
pub fn heteroscedastic_log_likelihood(values: &[f64], variances: &[f64], mu: f64, sigma: f64) -> f64 {
    let s2 = sigma * sigma;
    let sum: f64 = values
        .iter()
        .zip(variances)
        .map(|(&v, &e)| {
            let total = s2 + e;
            let d = v - mu;
            total.ln() + d * d / total
        })
        .sum();
    -0.5 * sum
}

/// Weighted mean with weights `1 / (σ² + e_i)`: the `μ` maximising
/// [`heteroscedastic_log_likelihood`] at fixed `sigma`.
pub fn profile_mean(values: &[f64], variances: &[f64], sigma: f64) -> f64 {
    let s2 = sigma * sigma;
    let (num, den) = values.iter().zip(variances).fold((0.0, 0.0), |(num, den), (&v, &e)| {
        let w = 1.0 / (s2 + e);
        (num + w * v, den + w)
    });
    num / den
}
