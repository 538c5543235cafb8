//! Error types.
//!
//! - [`FitError`]: typed failures of the numerical library
//! - [`OptimizerFailure`]: why a single optimizer run did not produce a fit
//! - [`AppError`]: what the `fitscan` binary prints and exits with

use serde::Serialize;
use thiserror::Error;

/// Result alias for library operations.
pub type Result<T> = std::result::Result<T, FitError>;

/// Library error taxonomy.
#[derive(Debug, Error)]
pub enum FitError {
    /// Parameter vector length disagrees with the model's declared arity.
    #[error("arity mismatch: model expects {expected} parameters, got {got}")]
    ArityMismatch { expected: usize, got: usize },

    /// Two sequences that must line up do not.
    #[error("length mismatch for {what}: expected {expected}, got {got}")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        got: usize,
    },

    /// Non-positive uncertainty, non-finite model output, log of a non-positive value, ...
    #[error("domain error: {0}")]
    Domain(String),

    /// Degrees of freedom below 1.
    #[error("invalid degrees of freedom: {0} (must be >= 1)")]
    InvalidDof(i64),

    /// A parameter index or name that does not exist on the model.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("dataset contains no points")]
    EmptyDataset,

    /// A top-level fit that did not converge.
    #[error("optimizer failure: {0}")]
    Optimizer(#[from] OptimizerFailure),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("chi-square distribution error: {0}")]
    Distribution(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl FitError {
    pub(crate) fn domain(message: impl Into<String>) -> Self {
        FitError::Domain(message.into())
    }

    /// Process exit code used by the binary for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            FitError::ArityMismatch { .. }
            | FitError::LengthMismatch { .. }
            | FitError::InvalidParameter(_)
            | FitError::InvalidConfig(_)
            | FitError::Io(_)
            | FitError::Json(_)
            | FitError::Csv(_) => 2,
            FitError::EmptyDataset | FitError::InvalidDof(_) => 3,
            FitError::Domain(_) | FitError::Optimizer(_) | FitError::Distribution(_) => 4,
        }
    }
}

/// Why a single optimizer invocation failed.
///
/// Failures are data: the profiler stores them per scan point so a caller can
/// tell "did not converge" apart from "converged to a bad chi-square".
#[derive(Debug, Clone, Error, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum OptimizerFailure {
    /// The solver stopped without meeting its convergence criterion.
    #[error("did not converge after {iterations} iterations ({reason}); best chi2 {best_chi2:.6}")]
    NotConverged {
        reason: String,
        iterations: u64,
        best_params: Vec<f64>,
        best_chi2: f64,
    },

    /// The model could not be evaluated at a point the solver needed.
    #[error("model evaluation failed: {0}")]
    Evaluation(String),

    /// The solver itself rejected the problem (bad simplex, internal error).
    #[error("solver error: {0}")]
    Solver(String),
}

/// Error surfaced by the binary: a message plus the process exit code.
#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl From<FitError> for AppError {
    fn from(err: FitError) -> Self {
        AppError::new(err.exit_code(), err.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}
