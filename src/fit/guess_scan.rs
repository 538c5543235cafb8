//! Initial-guess scan.
//!
//! Fit the full model once per starting value of one parameter and record
//! where each start ends up. Starts that land in different minima (or fail to
//! converge) show how much a single fit depends on its initial guess.

use rayon::prelude::*;
use serde::Serialize;

use crate::domain::{Dataset, PointOutcome, SolveLimits};
use crate::error::{FitError, Result};
use crate::fit::optimizer::LeastSquaresOptimizer;
use crate::fit::residuals::LeastSquaresProblem;
use crate::models::ParametricModel;

#[derive(Debug, Clone, Serialize)]
pub struct GuessPoint {
    pub start_value: f64,
    pub outcome: PointOutcome,
}

impl GuessPoint {
    pub fn is_converged(&self) -> bool {
        matches!(self.outcome, PointOutcome::Converged { .. })
    }

    /// Final value of the scanned parameter, if the fit converged.
    pub fn final_value(&self, index: usize) -> Option<f64> {
        match &self.outcome {
            PointOutcome::Converged { parameters, .. } => parameters.get(index).copied(),
            PointOutcome::Failed { .. } => None,
        }
    }

    pub fn chi2(&self) -> f64 {
        match &self.outcome {
            PointOutcome::Converged { chi2, .. } => *chi2,
            PointOutcome::Failed { .. } => f64::NAN,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GuessScan {
    pub param_index: usize,
    pub param_name: String,
    pub points: Vec<GuessPoint>,
}

impl GuessScan {
    pub fn failure_count(&self) -> usize {
        self.points.iter().filter(|p| !p.is_converged()).count()
    }

    pub fn best(&self) -> Option<&GuessPoint> {
        self.points
            .iter()
            .filter(|p| p.is_converged() && p.chi2().is_finite())
            .min_by(|a, b| a.chi2().total_cmp(&b.chi2()))
    }
}

/// Fit `model` once per entry of `guesses`, starting from `base_guess` with
/// parameter `param_index` replaced by the guess.
pub fn scan_initial_guesses(
    model: &dyn ParametricModel,
    dataset: &Dataset,
    param_index: usize,
    guesses: &[f64],
    base_guess: &[f64],
    optimizer: &dyn LeastSquaresOptimizer,
    limits: &SolveLimits,
) -> Result<GuessScan> {
    let names = model.parameter_names();
    if base_guess.len() != names.len() {
        return Err(FitError::ArityMismatch {
            expected: names.len(),
            got: base_guess.len(),
        });
    }
    let Some(param_name) = names.get(param_index).cloned() else {
        return Err(FitError::InvalidParameter(format!(
            "index {param_index} out of range for a model with {} parameters",
            names.len()
        )));
    };

    let problem = LeastSquaresProblem::new(model, dataset);
    let points: Vec<GuessPoint> = guesses
        .par_iter()
        .map(|&start_value| {
            let mut start = base_guess.to_vec();
            start[param_index] = start_value;
            let outcome = match optimizer.optimize(&problem, &start, limits) {
                Ok(fit) => PointOutcome::Converged {
                    chi2: fit.chi2(),
                    parameters: fit.params().to_vec(),
                },
                Err(failure) => {
                    tracing::debug!(start_value, %failure, "fit from initial guess failed");
                    PointOutcome::Failed { failure }
                }
            };
            GuessPoint { start_value, outcome }
        })
        .collect();

    let scan = GuessScan {
        param_index,
        param_name,
        points,
    };
    tracing::info!(
        parameter = %scan.param_name,
        starts = scan.points.len(),
        failed = scan.failure_count(),
        "initial-guess scan finished"
    );
    Ok(scan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fit::grid::arange;
    use crate::fit::optimizer::SimplexOptimizer;
    use crate::models::ModelKind;

    fn peak_data() -> Dataset {
        let x = arange(0.0, 80.0, 2.0).unwrap();
        let y: Vec<f64> = x
            .iter()
            .map(|&x| ModelKind::NarrowPeak.value(x, &[60.0, 20.0]))
            .collect();
        Dataset::with_counting_errors(x, y, 1.0).unwrap()
    }

    #[test]
    fn nearby_starts_find_the_peak() {
        let ds = peak_data();
        let scan = scan_initial_guesses(
            &ModelKind::NarrowPeak,
            &ds,
            0,
            &[58.0, 61.0],
            &[0.0, 15.0],
            &SimplexOptimizer::default(),
            &SolveLimits::default(),
        )
        .unwrap();

        assert_eq!(scan.param_name, "x0");
        assert_eq!(scan.points.len(), 2);
        for point in &scan.points {
            let x0 = point.final_value(0).unwrap();
            assert!((x0 - 60.0).abs() < 0.01, "start {} ended at {x0}", point.start_value);
        }
        assert!(scan.best().unwrap().chi2() < 1e-6);
    }

    #[test]
    fn order_follows_the_guesses() {
        let ds = peak_data();
        let guesses = [40.0, 10.0, 61.0, 0.5];
        let scan = scan_initial_guesses(
            &ModelKind::NarrowPeak,
            &ds,
            0,
            &guesses,
            &[0.0, 15.0],
            &SimplexOptimizer::default(),
            &SolveLimits::default(),
        )
        .unwrap();
        let starts: Vec<f64> = scan.points.iter().map(|p| p.start_value).collect();
        assert_eq!(starts, guesses);
    }

    #[test]
    fn base_guess_must_cover_the_model() {
        let ds = peak_data();
        let err = scan_initial_guesses(
            &ModelKind::NarrowPeak,
            &ds,
            0,
            &[1.0],
            &[1.0],
            &SimplexOptimizer::default(),
            &SolveLimits::default(),
        )
        .unwrap_err();
        assert!(matches!(err, FitError::ArityMismatch { expected: 2, got: 1 }));
    }
}
