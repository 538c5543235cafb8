//! Weighted residual engine.
//!
//! Every chi-square in the crate is computed here:
//!
//! ```text
//! residual_i = y_i - predicted_i
//! pull_i     = residual_i / sigma_i
//! chi2       = Σ pull_i^2
//! ```
//!
//! `Dataset` guarantees `sigma_i > 0`, so the only domain failure left to check
//! is a non-finite prediction.

use nalgebra::DMatrix;

use crate::domain::Dataset;
use crate::error::{FitError, Result};
use crate::math::{central_jacobian, mean_stdev};
use crate::models::model::check_arity;
use crate::models::{ParametricModel, evaluate};

/// `y_i - predicted_i`.
pub fn residuals(dataset: &Dataset, predicted: &[f64]) -> Result<Vec<f64>> {
    check_predictions(dataset, predicted)?;
    Ok(dataset
        .y()
        .iter()
        .zip(predicted)
        .map(|(y, p)| y - p)
        .collect())
}

/// `(y_i - predicted_i) / sigma_i`.
pub fn pulls(dataset: &Dataset, predicted: &[f64]) -> Result<Vec<f64>> {
    let res = residuals(dataset, predicted)?;
    Ok(res
        .iter()
        .zip(dataset.sigma())
        .map(|(r, s)| r / s)
        .collect())
}

/// `Σ pull_i^2`.
pub fn chi_square(dataset: &Dataset, predicted: &[f64]) -> Result<f64> {
    Ok(pulls(dataset, predicted)?.iter().map(|p| p * p).sum())
}

fn check_predictions(dataset: &Dataset, predicted: &[f64]) -> Result<()> {
    if predicted.len() != dataset.len() {
        return Err(FitError::LengthMismatch {
            what: "predictions",
            expected: dataset.len(),
            got: predicted.len(),
        });
    }
    if let Some(i) = predicted.iter().position(|p| !p.is_finite()) {
        return Err(FitError::domain(format!(
            "prediction {i} is {} (x = {})",
            predicted[i],
            dataset.x()[i]
        )));
    }
    Ok(())
}

/// Summary of a pull distribution.
///
/// For a correct model with correct error bars the pulls are roughly
/// standard normal: mean near 0, stdev near 1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PullSummary {
    pub n: usize,
    pub mean: f64,
    pub stdev: f64,
}

impl PullSummary {
    pub fn from_pulls(pulls: &[f64]) -> Option<Self> {
        let (mean, stdev) = mean_stdev(pulls)?;
        Some(Self {
            n: pulls.len(),
            mean,
            stdev,
        })
    }
}

/// A model bound to a dataset: the residual function handed to optimizers.
#[derive(Clone, Copy)]
pub struct LeastSquaresProblem<'a> {
    model: &'a dyn ParametricModel,
    dataset: &'a Dataset,
}

impl<'a> LeastSquaresProblem<'a> {
    pub fn new(model: &'a dyn ParametricModel, dataset: &'a Dataset) -> Self {
        Self { model, dataset }
    }

    pub fn model(&self) -> &'a dyn ParametricModel {
        self.model
    }

    pub fn dataset(&self) -> &'a Dataset {
        self.dataset
    }

    pub fn n_params(&self) -> usize {
        self.model.arity()
    }

    pub fn predict(&self, params: &[f64]) -> Result<Vec<f64>> {
        evaluate(self.model, params, self.dataset.x())
    }

    pub fn pulls(&self, params: &[f64]) -> Result<Vec<f64>> {
        pulls(self.dataset, &self.predict(params)?)
    }

    pub fn chi_square(&self, params: &[f64]) -> Result<f64> {
        chi_square(self.dataset, &self.predict(params)?)
    }

    /// Jacobian of the pulls with respect to the parameters.
    ///
    /// `d pull_i / d p_j = -(d model_i / d p_j) / sigma_i`; the sign does not
    /// matter for `J^T J`.
    pub fn pull_jacobian(&self, params: &[f64]) -> Result<DMatrix<f64>> {
        check_arity(self.model, params)?;
        central_jacobian(|p| self.pulls(p), params, self.dataset.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ModelKind;

    fn sample() -> Dataset {
        Dataset::new(
            vec![0.0, 1.0, 2.0, 3.0],
            vec![1.0, 4.0, 4.0, 10.0],
            vec![0.5, 2.0, 1.0, 4.0],
        )
        .unwrap()
    }

    #[test]
    fn chi_square_matches_direct_formula() {
        let ds = sample();
        let predicted = evaluate(&ModelKind::Line, &[1.0, 2.5], ds.x()).unwrap();
        let direct: f64 = (0..ds.len())
            .map(|i| ((ds.y()[i] - predicted[i]) / ds.sigma()[i]).powi(2))
            .sum();
        let chi2 = chi_square(&ds, &predicted).unwrap();
        assert!((chi2 - direct).abs() < 1e-12);
    }

    #[test]
    fn pulls_are_residuals_over_sigma() {
        let ds = sample();
        let predicted = vec![2.0, 3.0, 5.0, 7.0];
        let res = residuals(&ds, &predicted).unwrap();
        let pl = pulls(&ds, &predicted).unwrap();
        assert_eq!(res, vec![-1.0, 1.0, -1.0, 3.0]);
        for i in 0..ds.len() {
            assert_eq!(pl[i], res[i] / ds.sigma()[i]);
        }
    }

    #[test]
    fn prediction_length_must_match() {
        let ds = sample();
        let err = chi_square(&ds, &[1.0, 2.0]).unwrap_err();
        assert!(matches!(
            err,
            FitError::LengthMismatch { what: "predictions", expected: 4, got: 2 }
        ));
    }

    #[test]
    fn non_finite_prediction_is_rejected() {
        let ds = sample();
        let err = pulls(&ds, &[1.0, f64::NAN, 1.0, 1.0]).unwrap_err();
        assert!(matches!(err, FitError::Domain(_)));
    }

    #[test]
    fn problem_uses_the_same_chi_square() {
        let ds = sample();
        let problem = LeastSquaresProblem::new(&ModelKind::Line, &ds);
        let predicted = evaluate(&ModelKind::Line, &[0.5, 2.0], ds.x()).unwrap();
        assert_eq!(
            problem.chi_square(&[0.5, 2.0]).unwrap(),
            chi_square(&ds, &predicted).unwrap()
        );
        assert!(matches!(
            problem.chi_square(&[0.5]),
            Err(FitError::ArityMismatch { expected: 2, got: 1 })
        ));
    }

    #[test]
    fn pull_summary_of_symmetric_pulls() {
        let s = PullSummary::from_pulls(&[-1.0, 1.0, -1.0, 1.0]).unwrap();
        assert_eq!(s.n, 4);
        assert_eq!(s.mean, 0.0);
        assert_eq!(s.stdev, 1.0);
    }
}
