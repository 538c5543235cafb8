//! Parametric models and the model evaluator.
//!
//! The fitting and scanning code only ever needs one primitive: predict `y(x)`
//! from a parameter vector. Everything here is pure so a model can be shared
//! across rayon workers.

use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::{FitError, Result};

/// A pure function `(x, params) -> y` with named parameters.
pub trait ParametricModel: Send + Sync {
    /// Ordered parameter names (used for reporting and CLI lookup).
    fn parameter_names(&self) -> Vec<String>;

    /// Number of parameters the model expects.
    fn arity(&self) -> usize {
        self.parameter_names().len()
    }

    /// Predict a single value. `params.len() == self.arity()` is the caller's job;
    /// use [`evaluate`] for the checked version.
    fn value(&self, x: f64, params: &[f64]) -> f64;

    /// Index of a parameter by name.
    fn parameter_index(&self, name: &str) -> Option<usize> {
        self.parameter_names().iter().position(|n| n == name)
    }
}

/// Evaluate `model` at every `x`.
///
/// Fails with `ArityMismatch` when the parameter count is wrong and with a
/// domain error when the model produces a non-finite value.
pub fn evaluate(model: &(impl ParametricModel + ?Sized), params: &[f64], xs: &[f64]) -> Result<Vec<f64>> {
    check_arity(model, params)?;
    xs.iter()
        .map(|&x| {
            let y = model.value(x, params);
            if y.is_finite() {
                Ok(y)
            } else {
                Err(FitError::domain(format!(
                    "model produced {y} at x={x} with parameters {params:?}"
                )))
            }
        })
        .collect()
}

pub(crate) fn check_arity(model: &(impl ParametricModel + ?Sized), params: &[f64]) -> Result<()> {
    let expected = model.arity();
    if params.len() != expected {
        return Err(FitError::ArityMismatch {
            expected,
            got: params.len(),
        });
    }
    Ok(())
}

/// Built-in models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ModelKind {
    /// `norm * exp(-((x - x0) / 3)^2) + 10`: a fixed-width peak on a fixed background.
    NarrowPeak,
    /// `norm * exp(-((x - x0) / wid)^2) + bg`.
    GaussianPeak,
    /// `n0 * exp(-x / lifetime) + background`.
    Decay,
    /// `norm * 10^(x * slope)`.
    Exp10,
    /// `intercept + slope * x`.
    Line,
}

/// Width of the narrow peak.
const NARROW_WIDTH: f64 = 3.0;
/// Flat background under the narrow peak.
const NARROW_BACKGROUND: f64 = 10.0;

impl ModelKind {
    pub fn display_name(self) -> &'static str {
        match self {
            ModelKind::NarrowPeak => "narrow peak",
            ModelKind::GaussianPeak => "gaussian peak",
            ModelKind::Decay => "decay + background",
            ModelKind::Exp10 => "exponential (base 10)",
            ModelKind::Line => "straight line",
        }
    }

    pub fn names(self) -> &'static [&'static str] {
        match self {
            ModelKind::NarrowPeak => &["x0", "norm"],
            ModelKind::GaussianPeak => &["x0", "norm", "wid", "bg"],
            ModelKind::Decay => &["n0", "lifetime", "background"],
            ModelKind::Exp10 => &["norm", "slope"],
            ModelKind::Line => &["intercept", "slope"],
        }
    }
}

impl ParametricModel for ModelKind {
    fn parameter_names(&self) -> Vec<String> {
        self.names().iter().map(|s| s.to_string()).collect()
    }

    fn arity(&self) -> usize {
        self.names().len()
    }

    fn value(&self, x: f64, p: &[f64]) -> f64 {
        match self {
            ModelKind::NarrowPeak => {
                let u = (x - p[0]) / NARROW_WIDTH;
                p[1] * (-u * u).exp() + NARROW_BACKGROUND
            }
            ModelKind::GaussianPeak => {
                let u = (x - p[0]) / p[2];
                p[1] * (-u * u).exp() + p[3]
            }
            ModelKind::Decay => p[0] * (-x / p[1]).exp() + p[2],
            ModelKind::Exp10 => p[0] * 10f64.powf(x * p[1]),
            ModelKind::Line => p[0] + p[1] * x,
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// A model backed by a closure, for functions outside the built-in set.
pub struct FnModel<F> {
    names: Vec<String>,
    f: F,
}

impl<F> FnModel<F>
where
    F: Fn(f64, &[f64]) -> f64 + Send + Sync,
{
    pub fn new<S: Into<String>>(names: impl IntoIterator<Item = S>, f: F) -> Self {
        Self {
            names: names.into_iter().map(Into::into).collect(),
            f,
        }
    }
}

impl<F> ParametricModel for FnModel<F>
where
    F: Fn(f64, &[f64]) -> f64 + Send + Sync,
{
    fn parameter_names(&self) -> Vec<String> {
        self.names.clone()
    }

    fn arity(&self) -> usize {
        self.names.len()
    }

    fn value(&self, x: f64, params: &[f64]) -> f64 {
        (self.f)(x, params)
    }
}

/// A reduced view of a model with one parameter pinned.
///
/// The remaining parameters keep their relative order; the reduced arity is
/// `inner.arity() - 1`.
pub struct FixedParameter<'a, M: ?Sized> {
    inner: &'a M,
    index: usize,
    value: f64,
}

impl<'a, M: ParametricModel + ?Sized> FixedParameter<'a, M> {
    pub fn new(inner: &'a M, index: usize, value: f64) -> Result<Self> {
        let arity = inner.arity();
        if index >= arity {
            return Err(FitError::InvalidParameter(format!(
                "index {index} out of range for a model with {arity} parameters"
            )));
        }
        Ok(Self { inner, index, value })
    }

    /// Rebuild the full parameter vector from the free ones.
    pub fn expand(&self, free: &[f64]) -> Vec<f64> {
        let mut full = Vec::with_capacity(free.len() + 1);
        full.extend_from_slice(&free[..self.index.min(free.len())]);
        full.push(self.value);
        if self.index < free.len() {
            full.extend_from_slice(&free[self.index..]);
        }
        full
    }
}

impl<M: ParametricModel + ?Sized> ParametricModel for FixedParameter<'_, M> {
    fn parameter_names(&self) -> Vec<String> {
        let mut names = self.inner.parameter_names();
        names.remove(self.index);
        names
    }

    fn arity(&self) -> usize {
        self.inner.arity() - 1
    }

    fn value(&self, x: f64, free: &[f64]) -> f64 {
        self.inner.value(x, &self.expand(free))
    }
}
