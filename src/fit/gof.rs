//! Goodness-of-fit reporter.
//!
//! Turns a chi-square and its degrees of freedom into `P(chi2 <= observed)` and
//! a verdict. `P` close to 1 means the chi-square is larger than the model and
//! error bars allow (poor); `P` close to 0 means it is smaller than random
//! fluctuations should produce (suspiciously good, usually overestimated
//! error bars). Both thresholds are configuration.

use crate::domain::{FitVerdict, GofThresholds, GoodnessOfFit};
use crate::error::{FitError, Result};
use crate::math::chi2_cdf;

#[derive(Debug, Clone, Copy, Default)]
pub struct GoodnessOfFitReporter {
    thresholds: GofThresholds,
}

impl GoodnessOfFitReporter {
    pub fn new(thresholds: GofThresholds) -> Result<Self> {
        let GofThresholds {
            suspiciously_good,
            poor,
        } = thresholds;
        let in_unit = |p: f64| p.is_finite() && (0.0..=1.0).contains(&p);
        if !(in_unit(suspiciously_good) && in_unit(poor) && suspiciously_good < poor) {
            return Err(FitError::InvalidConfig(format!(
                "thresholds must satisfy 0 <= suspiciously_good < poor <= 1, got suspiciously_good={suspiciously_good}, poor={poor}"
            )));
        }
        Ok(Self { thresholds })
    }

    pub fn thresholds(&self) -> GofThresholds {
        self.thresholds
    }

    /// `dof` is signed so that `n_points - n_params` can be passed straight in.
    pub fn evaluate(&self, chi2: f64, dof: i64) -> Result<GoodnessOfFit> {
        if dof < 1 {
            return Err(FitError::InvalidDof(dof));
        }
        if !(chi2.is_finite() && chi2 >= 0.0) {
            return Err(FitError::domain(format!(
                "chi-square must be finite and >= 0, got {chi2}"
            )));
        }
        let dof = dof as u64;
        let probability = chi2_cdf(chi2, dof)?;
        Ok(GoodnessOfFit {
            chi2,
            dof,
            probability,
            verdict: self.classify(probability),
        })
    }

    fn classify(&self, probability: f64) -> FitVerdict {
        if probability > self.thresholds.poor {
            FitVerdict::Poor
        } else if probability < self.thresholds.suspiciously_good {
            FitVerdict::SuspiciouslyGood
        } else {
            FitVerdict::Plausible
        }
    }
}
