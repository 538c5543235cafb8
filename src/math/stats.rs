//! Distribution helpers.

use statrs::distribution::{ChiSquared, ContinuousCDF};

use crate::error::{FitError, Result};

/// `P(X <= chi2)` for a chi-square distribution with `dof` degrees of freedom.
pub fn chi2_cdf(chi2: f64, dof: u64) -> Result<f64> {
    let dist = ChiSquared::new(dof as f64).map_err(|e| FitError::Distribution(e.to_string()))?;
    Ok(dist.cdf(chi2))
}

/// Mean and population standard deviation. `None` for an empty slice.
pub fn mean_stdev(values: &[f64]) -> Option<(f64, f64)> {
    if values.is_empty() {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    Some((mean, var.sqrt()))
}
