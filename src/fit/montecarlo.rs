//! Monte Carlo study of `P(chi2)`.
//!
//! Repeat a counting experiment many times from a known truth and compare
//! each pseudo-dataset against the truth and against an alternative
//! hypothesis. Nothing is fitted, so the degrees of freedom equal the number
//! of points. For the truth, `P(chi2)` should come out roughly uniform on
//! `[0, 1]`; a wrong hypothesis piles up near 1, but not always.

use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;

use crate::data::{Noise, synthesize_with};
use crate::error::{FitError, Result};
use crate::fit::residuals::chi_square;
use crate::math::{chi2_cdf, mean_stdev};
use crate::models::{ParametricModel, evaluate};

/// A model with concrete parameter values.
#[derive(Clone, Copy)]
pub struct Hypothesis<'a> {
    pub model: &'a dyn ParametricModel,
    pub params: &'a [f64],
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MonteCarloConfig {
    pub trials: usize,
    pub seed: u64,
    pub noise: Noise,
}

#[derive(Debug, Clone, Serialize)]
pub struct MonteCarloStudy {
    pub dof: u64,
    /// `P(chi2)` of the truth against each pseudo-dataset.
    pub truth: Vec<f64>,
    /// `P(chi2)` of the alternative against the same pseudo-datasets.
    pub alternative: Vec<f64>,
}

impl MonteCarloStudy {
    pub fn truth_mean(&self) -> f64 {
        mean_stdev(&self.truth).map_or(f64::NAN, |(m, _)| m)
    }

    pub fn alternative_mean(&self) -> f64 {
        mean_stdev(&self.alternative).map_or(f64::NAN, |(m, _)| m)
    }
}

/// Counts of `values` in `bins` equal-width bins over `[0, 1]`.
pub fn probability_histogram(values: &[f64], bins: usize) -> Vec<usize> {
    let mut counts = vec![0; bins];
    if bins == 0 {
        return counts;
    }
    for &v in values.iter().filter(|v| (0.0..=1.0).contains(*v)) {
        let bin = ((v * bins as f64) as usize).min(bins - 1);
        counts[bin] += 1;
    }
    counts
}

pub fn chi2_probability_study(
    truth: Hypothesis<'_>,
    alternative: Hypothesis<'_>,
    xs: &[f64],
    config: &MonteCarloConfig,
) -> Result<MonteCarloStudy> {
    if xs.is_empty() {
        return Err(FitError::EmptyDataset);
    }
    if config.trials == 0 {
        return Err(FitError::InvalidConfig("trials must be > 0".to_string()));
    }

    let dof = xs.len() as u64;
    let alt_prediction = evaluate(alternative.model, alternative.params, xs)?;
    let truth_prediction = evaluate(truth.model, truth.params, xs)?;

    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut study = MonteCarloStudy {
        dof,
        truth: Vec::with_capacity(config.trials),
        alternative: Vec::with_capacity(config.trials),
    };
    for _ in 0..config.trials {
        let data = synthesize_with(truth.model, truth.params, xs, &config.noise, &mut rng)?;
        study
            .truth
            .push(chi2_cdf(chi_square(&data, &truth_prediction)?, dof)?);
        study
            .alternative
            .push(chi2_cdf(chi_square(&data, &alt_prediction)?, dof)?);
    }

    tracing::info!(
        trials = config.trials,
        truth_mean = study.truth_mean(),
        alternative_mean = study.alternative_mean(),
        "Monte Carlo P(chi2) study finished"
    );
    Ok(study)
}
