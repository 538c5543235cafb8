//! Shared domain types.
//!
//! These are the values that flow between the evaluator, the residual engine,
//! the profiler and the reporters. Everything here is immutable once built:
//! constructors validate, accessors read.

use std::time::Duration;

use clap::ValueEnum;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::error::{FitError, OptimizerFailure, Result};

/// Ordered `(x, y, sigma)` observations.
///
/// Construction guarantees equal lengths, at least one point, finite values and
/// `sigma > 0` everywhere, so downstream chi-square code never divides by a
/// non-positive uncertainty.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dataset {
    x: Vec<f64>,
    y: Vec<f64>,
    sigma: Vec<f64>,
}

impl Dataset {
    pub fn new(x: Vec<f64>, y: Vec<f64>, sigma: Vec<f64>) -> Result<Self> {
        if y.len() != x.len() {
            return Err(FitError::LengthMismatch {
                what: "y values",
                expected: x.len(),
                got: y.len(),
            });
        }
        if sigma.len() != x.len() {
            return Err(FitError::LengthMismatch {
                what: "sigma values",
                expected: x.len(),
                got: sigma.len(),
            });
        }
        if x.is_empty() {
            return Err(FitError::EmptyDataset);
        }
        if let Some(i) = x.iter().position(|v| !v.is_finite()) {
            return Err(FitError::domain(format!("x[{i}] is not finite")));
        }
        if let Some(i) = y.iter().position(|v| !v.is_finite()) {
            return Err(FitError::domain(format!("y[{i}] is not finite")));
        }
        if let Some(i) = sigma.iter().position(|s| !(s.is_finite() && *s > 0.0)) {
            return Err(FitError::domain(format!(
                "sigma[{i}] = {} (uncertainties must be finite and > 0)",
                sigma[i]
            )));
        }
        Ok(Self { x, y, sigma })
    }

    /// Counting-statistics errors: `sigma_i = max(sqrt(y_i), floor)`.
    ///
    /// With `floor = 0` a zero-count bin yields `sigma = 0` and is rejected.
    pub fn with_counting_errors(x: Vec<f64>, y: Vec<f64>, floor: f64) -> Result<Self> {
        if !(floor.is_finite() && floor >= 0.0) {
            return Err(FitError::InvalidConfig(format!(
                "sigma floor must be finite and >= 0, got {floor}"
            )));
        }
        let sigma = y.iter().map(|&v| v.max(0.0).sqrt().max(floor)).collect();
        Self::new(x, y, sigma)
    }

    /// The same uncertainty on every point.
    pub fn with_constant_error(x: Vec<f64>, y: Vec<f64>, sigma: f64) -> Result<Self> {
        let sigma = vec![sigma; x.len()];
        Self::new(x, y, sigma)
    }

    /// The same points with every uncertainty set to 1.
    pub fn with_unit_errors(&self) -> Self {
        Self {
            x: self.x.clone(),
            y: self.y.clone(),
            sigma: vec![1.0; self.x.len()],
        }
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    pub fn x(&self) -> &[f64] {
        &self.x
    }

    pub fn y(&self) -> &[f64] {
        &self.y
    }

    pub fn sigma(&self) -> &[f64] {
        &self.sigma
    }

    pub fn x_range(&self) -> (f64, f64) {
        min_max(&self.x)
    }

    pub fn y_range(&self) -> (f64, f64) {
        min_max(&self.y)
    }
}

fn min_max(values: &[f64]) -> (f64, f64) {
    values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        })
}

/// Output of one successful optimizer run.
#[derive(Debug, Clone)]
pub struct FitResult {
    params: Vec<f64>,
    covariance: Option<DMatrix<f64>>,
    chi2: f64,
    iterations: u64,
}

impl FitResult {
    /// `covariance` is `None` when the curvature matrix could not be inverted.
    pub fn new(params: Vec<f64>, covariance: Option<DMatrix<f64>>, chi2: f64, iterations: u64) -> Self {
        Self {
            params,
            covariance,
            chi2,
            iterations,
        }
    }

    pub fn params(&self) -> &[f64] {
        &self.params
    }

    pub fn covariance(&self) -> Option<&DMatrix<f64>> {
        self.covariance.as_ref()
    }

    /// True when the covariance is singular or ill-conditioned: the parameter
    /// errors are then meaningless and should not be reported.
    pub fn is_covariance_singular(&self) -> bool {
        self.covariance.is_none()
    }

    /// `sqrt(diag(covariance))`, one entry per parameter.
    pub fn standard_errors(&self) -> Option<Vec<f64>> {
        let cov = self.covariance.as_ref()?;
        Some((0..cov.nrows()).map(|i| cov[(i, i)].max(0.0).sqrt()).collect())
    }

    pub fn chi2(&self) -> f64 {
        self.chi2
    }

    pub fn iterations(&self) -> u64 {
        self.iterations
    }
}

/// Limits forwarded to the optimizer without interpretation.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SolveLimits {
    pub max_iters: Option<u64>,
    pub timeout: Option<Duration>,
}

/// How each profile point picks its starting guess.
///
/// This changes which local minimum a refit lands in, so it is always chosen
/// explicitly by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum StartStrategy {
    /// Start every point from the caller-supplied guess.
    Fixed,
    /// Start each point from the previous point's converged solution.
    WarmStart,
}

/// Profiler configuration.
#[derive(Debug, Clone)]
pub struct ProfileConfig {
    pub start: StartStrategy,
    /// Solve independent points on the rayon pool (ignored for warm start).
    pub parallel: bool,
    pub limits: SolveLimits,
}

impl ProfileConfig {
    pub fn new(start: StartStrategy) -> Self {
        Self {
            start,
            parallel: false,
            limits: SolveLimits::default(),
        }
    }
}

/// Result of refitting the free parameters at one fixed value.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PointOutcome {
    Converged {
        chi2: f64,
        /// Full parameter vector, with the scanned parameter at its fixed value.
        parameters: Vec<f64>,
    },
    Failed {
        failure: OptimizerFailure,
    },
}

/// One entry of a profile scan.
#[derive(Debug, Clone, Serialize)]
pub struct ProfilePoint {
    fixed_value: f64,
    outcome: PointOutcome,
}

impl ProfilePoint {
    pub(crate) fn converged(fixed_value: f64, chi2: f64, parameters: Vec<f64>) -> Self {
        Self {
            fixed_value,
            outcome: PointOutcome::Converged { chi2, parameters },
        }
    }

    pub(crate) fn failed(fixed_value: f64, failure: OptimizerFailure) -> Self {
        Self {
            fixed_value,
            outcome: PointOutcome::Failed { failure },
        }
    }

    pub fn fixed_value(&self) -> f64 {
        self.fixed_value
    }

    pub fn outcome(&self) -> &PointOutcome {
        &self.outcome
    }

    pub fn is_converged(&self) -> bool {
        matches!(self.outcome, PointOutcome::Converged { .. })
    }

    /// Achieved chi-square, or NaN when the refit failed.
    pub fn chi2(&self) -> f64 {
        match &self.outcome {
            PointOutcome::Converged { chi2, .. } => *chi2,
            PointOutcome::Failed { .. } => f64::NAN,
        }
    }

    pub fn parameters(&self) -> Option<&[f64]> {
        match &self.outcome {
            PointOutcome::Converged { parameters, .. } => Some(parameters),
            PointOutcome::Failed { .. } => None,
        }
    }

    pub fn failure(&self) -> Option<&OptimizerFailure> {
        match &self.outcome {
            PointOutcome::Converged { .. } => None,
            PointOutcome::Failed { failure } => Some(failure),
        }
    }
}

/// A 1-D profile chi-square scan, one point per input scan value, in input order.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileScan {
    scan_index: usize,
    scan_name: String,
    /// `n_points - model arity`, the same for every point.
    dof: i64,
    points: Vec<ProfilePoint>,
}

impl ProfileScan {
    pub(crate) fn new(scan_index: usize, scan_name: String, dof: i64, capacity: usize) -> Self {
        Self {
            scan_index,
            scan_name,
            dof,
            points: Vec::with_capacity(capacity),
        }
    }

    pub(crate) fn push(&mut self, point: ProfilePoint) {
        self.points.push(point);
    }

    pub fn scan_index(&self) -> usize {
        self.scan_index
    }

    pub fn scan_name(&self) -> &str {
        &self.scan_name
    }

    pub fn dof(&self) -> i64 {
        self.dof
    }

    pub fn points(&self) -> &[ProfilePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn failures(&self) -> impl Iterator<Item = &ProfilePoint> {
        self.points.iter().filter(|p| !p.is_converged())
    }

    pub fn failure_count(&self) -> usize {
        self.failures().count()
    }

    /// Converged point with the lowest chi-square.
    pub fn best(&self) -> Option<&ProfilePoint> {
        self.points
            .iter()
            .filter(|p| p.is_converged() && p.chi2().is_finite())
            .min_by(|a, b| a.chi2().total_cmp(&b.chi2()))
    }

    /// Interior local minima of the chi-square curve.
    ///
    /// Failed points are skipped. A minimum is kept only when chi-square rises
    /// by at least `min_rise` on both sides before any lower value appears (or
    /// the scan ends), which filters solver jitter on flat stretches. Assumes
    /// the scan values are sorted.
    pub fn local_minima(&self, min_rise: f64) -> Vec<&ProfilePoint> {
        let curve: Vec<&ProfilePoint> = self
            .points
            .iter()
            .filter(|p| p.is_converged() && p.chi2().is_finite())
            .collect();
        if curve.len() < 3 {
            return Vec::new();
        }

        let chi2: Vec<f64> = curve.iter().map(|p| p.chi2()).collect();
        let mut out = Vec::new();
        for i in 1..chi2.len() - 1 {
            let c = chi2[i];
            if !(c < chi2[i - 1] && c <= chi2[i + 1]) {
                continue;
            }
            let left = rise_until_lower(chi2[..i].iter().rev(), c);
            let right = rise_until_lower(chi2[i + 1..].iter(), c);
            if left >= min_rise && right >= min_rise {
                out.push(curve[i]);
            }
        }
        out
    }
}

fn rise_until_lower<'a>(side: impl Iterator<Item = &'a f64>, level: f64) -> f64 {
    let mut peak = level;
    for &v in side {
        if v < level {
            break;
        }
        peak = peak.max(v);
    }
    peak - level
}

/// Goodness-of-fit verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FitVerdict {
    /// `P(chi2)` below the lower threshold: chi-square implausibly small,
    /// error bars possibly overestimated.
    SuspiciouslyGood,
    /// `P(chi2)` above the upper threshold: chi-square too large for the model
    /// and error bars to both be right.
    Poor,
    Plausible,
}

impl FitVerdict {
    pub fn describe(self) -> &'static str {
        match self {
            FitVerdict::SuspiciouslyGood => "suspiciously good fit (error bars possibly overestimated)",
            FitVerdict::Poor => "poor fit (model or error bars likely wrong)",
            FitVerdict::Plausible => "plausible",
        }
    }
}

/// Classification thresholds on the cumulative probability `P(chi2 <= observed)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GofThresholds {
    /// Below this, the fit is too good to be true.
    pub suspiciously_good: f64,
    /// Above this, the fit is poor.
    pub poor: f64,
}

impl Default for GofThresholds {
    fn default() -> Self {
        Self {
            suspiciously_good: 0.01,
            poor: 0.99,
        }
    }
}

/// Chi-square, its dof and `P(chi2 <= observed)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GoodnessOfFit {
    pub chi2: f64,
    pub dof: u64,
    pub probability: f64,
    pub verdict: FitVerdict,
}

impl GoodnessOfFit {
    pub fn reduced_chi2(&self) -> f64 {
        self.chi2 / self.dof as f64
    }
}
