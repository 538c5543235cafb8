//! Single top-level fit of a model to a dataset.
//!
//! Unlike the profiler, a failure here is an error: there is nothing else to
//! report without a converged fit.
//!
//! The data the optimizer sees and the data the fit is judged against can
//! differ: a fit that ignores the error bars is still reported with them.

use crate::domain::{Dataset, FitResult, GoodnessOfFit, SolveLimits};
use crate::error::{FitError, Result};
use crate::fit::gof::GoodnessOfFitReporter;
use crate::fit::optimizer::LeastSquaresOptimizer;
use crate::fit::residuals::{LeastSquaresProblem, PullSummary};
use crate::models::ParametricModel;

/// A converged fit plus the diagnostics printed alongside it.
#[derive(Debug, Clone)]
pub struct FitReport {
    pub names: Vec<String>,
    pub fit: FitResult,
    pub pulls: Vec<f64>,
    pub pull_summary: Option<PullSummary>,
    /// `n_points - n_params`.
    pub dof: i64,
    /// `None` when `dof < 1`.
    pub goodness: Option<GoodnessOfFit>,
}

pub fn fit_model(
    model: &dyn ParametricModel,
    dataset: &Dataset,
    initial: &[f64],
    optimizer: &dyn LeastSquaresOptimizer,
    limits: &SolveLimits,
) -> Result<FitResult> {
    let arity = model.arity();
    if initial.len() != arity {
        return Err(FitError::ArityMismatch {
            expected: arity,
            got: initial.len(),
        });
    }
    let problem = LeastSquaresProblem::new(model, dataset);
    let fit = optimizer.optimize(&problem, initial, limits)?;
    tracing::info!(
        chi2 = fit.chi2(),
        iterations = fit.iterations(),
        params = ?fit.params(),
        "fit converged"
    );
    Ok(fit)
}

/// Fit, then compute pulls and the goodness of fit.
pub fn fit_and_report(
    model: &dyn ParametricModel,
    dataset: &Dataset,
    initial: &[f64],
    optimizer: &dyn LeastSquaresOptimizer,
    limits: &SolveLimits,
    reporter: &GoodnessOfFitReporter,
) -> Result<FitReport> {
    fit_and_report_against(model, dataset, dataset, initial, optimizer, limits, reporter)
}

/// Fit on `fit_dataset`, then report chi-square, pulls and goodness of fit
/// against `dataset`.
///
/// Both must hold the same observations; only the uncertainties may differ.
/// The reported chi-square is recomputed on `dataset` at the fitted
/// parameters, so the covariance still comes from the fit's own weighting.
pub fn fit_and_report_against(
    model: &dyn ParametricModel,
    fit_dataset: &Dataset,
    dataset: &Dataset,
    initial: &[f64],
    optimizer: &dyn LeastSquaresOptimizer,
    limits: &SolveLimits,
    reporter: &GoodnessOfFitReporter,
) -> Result<FitReport> {
    if fit_dataset.x() != dataset.x() || fit_dataset.y() != dataset.y() {
        return Err(FitError::InvalidConfig(
            "fit and report datasets must contain the same observations".to_string(),
        ));
    }

    let fitted = fit_model(model, fit_dataset, initial, optimizer, limits)?;
    let problem = LeastSquaresProblem::new(model, dataset);
    let chi2 = problem.chi_square(fitted.params())?;
    let pulls = problem.pulls(fitted.params())?;
    let pull_summary = PullSummary::from_pulls(&pulls);
    let fit = FitResult::new(
        fitted.params().to_vec(),
        fitted.covariance().cloned(),
        chi2,
        fitted.iterations(),
    );

    let dof = dataset.len() as i64 - model.arity() as i64;
    let goodness = match reporter.evaluate(fit.chi2(), dof) {
        Ok(g) => Some(g),
        Err(FitError::InvalidDof(dof)) => {
            tracing::warn!(dof, "not enough points for a goodness-of-fit test");
            None
        }
        Err(e) => return Err(e),
    };

    Ok(FitReport {
        names: model.parameter_names(),
        fit,
        pulls,
        pull_summary,
        dof,
        goodness,
    })
}
