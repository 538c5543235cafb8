//! Optimizer seam and the default Nelder-Mead implementation.
//!
//! The profiler never talks to a solver library directly: it hands a
//! [`LeastSquaresProblem`] and a starting point to a [`LeastSquaresOptimizer`]
//! and gets back either a [`FitResult`] or an [`OptimizerFailure`]. Tests swap
//! in their own implementations.
//!
//! [`SimplexOptimizer`] minimizes chi-square with argmin's Nelder-Mead, then
//! estimates the covariance from the Jacobian of the pulls at the optimum
//! (absolute sigma: the covariance is not rescaled by the reduced chi-square).

use std::sync::Arc;

use argmin::core::observers::ObserverMode;
use argmin::core::{CostFunction, Error, Executor, State, TerminationReason, TerminationStatus};
use argmin::solver::neldermead::NelderMead;
use nalgebra::DMatrix;

use crate::domain::{FitResult, SolveLimits};
use crate::error::{FitError, OptimizerFailure};
use crate::fit::observer::{ArgminBridge, FitObserver};
use crate::fit::residuals::LeastSquaresProblem;
use crate::math::covariance_from_jacobian;

/// Anything that can minimize the chi-square of a [`LeastSquaresProblem`].
pub trait LeastSquaresOptimizer: Send + Sync {
    /// `limits` come from the caller and must be honoured as given.
    fn optimize(
        &self,
        problem: &LeastSquaresProblem<'_>,
        initial: &[f64],
        limits: &SolveLimits,
    ) -> Result<FitResult, OptimizerFailure>;
}

/// Nelder-Mead tuning.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimplexConfig {
    /// Used when the caller's `SolveLimits` carry no iteration cap.
    pub max_iters: u64,
    /// Converged once the standard deviation of the vertex costs drops below this.
    pub sd_tolerance: f64,
    /// Initial vertex offset as a fraction of the starting value.
    pub relative_step: f64,
    /// Lower bound on the offset, used for starting values at or near zero.
    pub absolute_step: f64,
}

impl Default for SimplexConfig {
    fn default() -> Self {
        Self {
            max_iters: 2000,
            sd_tolerance: 1e-10,
            relative_step: 0.1,
            absolute_step: 0.1,
        }
    }
}

#[derive(Clone, Default)]
pub struct SimplexOptimizer {
    config: SimplexConfig,
    observer: Option<Arc<dyn FitObserver>>,
}

impl SimplexOptimizer {
    pub fn new(config: SimplexConfig) -> Self {
        Self {
            config,
            observer: None,
        }
    }

    /// Report every iteration to `observer`.
    pub fn with_observer(mut self, observer: Arc<dyn FitObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn config(&self) -> &SimplexConfig {
        &self.config
    }
}

impl LeastSquaresOptimizer for SimplexOptimizer {
    fn optimize(
        &self,
        problem: &LeastSquaresProblem<'_>,
        initial: &[f64],
        limits: &SolveLimits,
    ) -> Result<FitResult, OptimizerFailure> {
        let expected = problem.n_params();
        if initial.len() != expected {
            let err = FitError::ArityMismatch {
                expected,
                got: initial.len(),
            };
            return Err(OptimizerFailure::Evaluation(err.to_string()));
        }

        // Nothing to move: the chi-square is fully determined.
        if initial.is_empty() {
            let chi2 = problem
                .chi_square(initial)
                .map_err(|e| OptimizerFailure::Evaluation(e.to_string()))?;
            return Ok(FitResult::new(Vec::new(), Some(DMatrix::zeros(0, 0)), chi2, 0));
        }

        let simplex = create_initial_simplex(initial, &self.config);
        let solver = NelderMead::new(simplex)
            .with_sd_tolerance(self.config.sd_tolerance)
            .map_err(|e| OptimizerFailure::Solver(e.to_string()))?;

        let max_iters = limits.max_iters.unwrap_or(self.config.max_iters);
        let mut executor = Executor::new(ChiSquareCost { problem: *problem }, solver)
            .configure(|state| state.max_iters(max_iters));
        if let Some(timeout) = limits.timeout {
            executor = executor.timeout(timeout);
        }
        if let Some(observer) = &self.observer {
            executor = executor.add_observer(ArgminBridge::new(Arc::clone(observer)), ObserverMode::Always);
        }

        let res = executor
            .run()
            .map_err(|e| OptimizerFailure::Solver(e.to_string()))?;
        let state = res.state();
        let iterations = state.get_iter();
        let best_chi2 = state.get_best_cost();
        let best_params = state
            .get_best_param()
            .cloned()
            .ok_or_else(|| OptimizerFailure::Solver("solver returned no parameters".to_string()))?;

        let reason = match state.get_termination_status() {
            TerminationStatus::Terminated(TerminationReason::SolverConverged) if best_chi2.is_finite() => None,
            TerminationStatus::Terminated(TerminationReason::SolverConverged) => {
                Some("converged to a non-finite chi-square".to_string())
            }
            TerminationStatus::Terminated(other) => Some(format!("{other:?}")),
            TerminationStatus::NotTerminated => Some("solver did not terminate".to_string()),
        };
        if let Some(reason) = reason {
            return Err(OptimizerFailure::NotConverged {
                reason,
                iterations,
                best_params,
                best_chi2,
            });
        }

        // Recompute through the residual engine so the reported chi-square is
        // exactly what every other caller would compute for these parameters.
        let chi2 = problem
            .chi_square(&best_params)
            .map_err(|e| OptimizerFailure::Evaluation(e.to_string()))?;

        let covariance = match problem.pull_jacobian(&best_params) {
            Ok(jac) => covariance_from_jacobian(&jac),
            Err(e) => {
                tracing::debug!(error = %e, "jacobian unavailable at the optimum");
                None
            }
        };
        if covariance.is_none() {
            tracing::debug!(params = ?best_params, "covariance matrix is singular");
        }

        Ok(FitResult::new(best_params, covariance, chi2, iterations))
    }
}

/// Starting simplex: the initial point plus one vertex per dimension, offset by
/// `max(relative_step * |p_i|, absolute_step)`.
pub fn create_initial_simplex(initial: &[f64], config: &SimplexConfig) -> Vec<Vec<f64>> {
    let mut vertices = Vec::with_capacity(initial.len() + 1);
    vertices.push(initial.to_vec());
    for i in 0..initial.len() {
        let step = (config.relative_step * initial[i].abs()).max(config.absolute_step);
        let mut vertex = initial.to_vec();
        vertex[i] += step;
        vertices.push(vertex);
    }
    vertices
}

struct ChiSquareCost<'a> {
    problem: LeastSquaresProblem<'a>,
}

impl CostFunction for ChiSquareCost<'_> {
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, params: &Self::Param) -> Result<Self::Output, Error> {
        match self.problem.chi_square(params) {
            Ok(chi2) => Ok(chi2),
            // Outside the model's domain: steer the simplex away.
            Err(FitError::Domain(_)) => Ok(f64::INFINITY),
            Err(e) => Err(Error::msg(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Dataset;
    use crate::fit::observer::RecordingObserver;
    use crate::models::{FnModel, ModelKind};

    fn straight_line() -> Dataset {
        let x: Vec<f64> = (0..5).map(|i| i as f64).collect();
        let y = x.iter().map(|x| 1.0 + 2.0 * x).collect();
        Dataset::with_constant_error(x, y, 1.0).unwrap()
    }

    #[test]
    fn fits_a_straight_line_with_linear_covariance() {
        let ds = straight_line();
        let problem = LeastSquaresProblem::new(&ModelKind::Line, &ds);
        let fit = SimplexOptimizer::default()
            .optimize(&problem, &[0.0, 0.0], &SolveLimits::default())
            .unwrap();

        assert!((fit.params()[0] - 1.0).abs() < 1e-3);
        assert!((fit.params()[1] - 2.0).abs() < 1e-3);
        assert!(fit.chi2() < 1e-6);

        let cov = fit.covariance().unwrap();
        assert!((cov[(0, 0)] - 0.6).abs() < 1e-6);
        assert!((cov[(0, 1)] + 0.2).abs() < 1e-6);
        assert!((cov[(1, 1)] - 0.1).abs() < 1e-6);
    }

    #[test]
    fn iteration_cap_is_reported_as_not_converged() {
        let ds = straight_line();
        let problem = LeastSquaresProblem::new(&ModelKind::Line, &ds);
        let limits = SolveLimits {
            max_iters: Some(2),
            timeout: None,
        };
        let err = SimplexOptimizer::default()
            .optimize(&problem, &[0.0, 0.0], &limits)
            .unwrap_err();
        match err {
            OptimizerFailure::NotConverged {
                iterations,
                best_params,
                best_chi2,
                ..
            } => {
                assert!(iterations <= 2);
                assert_eq!(best_params.len(), 2);
                assert!(best_chi2.is_finite());
            }
            other => panic!("unexpected failure: {other:?}"),
        }
    }

    #[test]
    fn wrong_guess_length_is_an_evaluation_failure() {
        let ds = straight_line();
        let problem = LeastSquaresProblem::new(&ModelKind::Line, &ds);
        let err = SimplexOptimizer::default()
            .optimize(&problem, &[0.0], &SolveLimits::default())
            .unwrap_err();
        assert!(matches!(err, OptimizerFailure::Evaluation(_)));
    }

    #[test]
    fn observer_sees_every_iteration() {
        let ds = straight_line();
        let problem = LeastSquaresProblem::new(&ModelKind::Line, &ds);
        let recorder = Arc::new(RecordingObserver::new());
        let fit = SimplexOptimizer::default()
            .with_observer(recorder.clone())
            .optimize(&problem, &[0.0, 0.0], &SolveLimits::default())
            .unwrap();

        let events = recorder.events();
        assert!(!events.is_empty());
        assert!(events.len() as u64 <= fit.iterations() + 1);
        assert!(events.windows(2).all(|w| w[1].best_cost <= w[0].best_cost));
    }

    #[test]
    fn zero_parameter_problem_is_evaluated_directly() {
        let ds = straight_line();
        let flat = FnModel::new(Vec::<String>::new(), |_x, _p: &[f64]| 5.0);
        let problem = LeastSquaresProblem::new(&flat, &ds);
        let fit = SimplexOptimizer::default()
            .optimize(&problem, &[], &SolveLimits::default())
            .unwrap();
        // y = 1, 3, 5, 7, 9 against 5.
        assert_eq!(fit.chi2(), 16.0 + 4.0 + 0.0 + 4.0 + 16.0);
        assert_eq!(fit.iterations(), 0);
    }

    #[test]
    fn initial_simplex_has_one_vertex_per_dimension() {
        let simplex = create_initial_simplex(&[0.0, 50.0], &SimplexConfig::default());
        assert_eq!(simplex.len(), 3);
        assert_eq!(simplex[1], vec![0.1, 50.0]);
        assert_eq!(simplex[2], vec![0.0, 55.0]);
    }
}
