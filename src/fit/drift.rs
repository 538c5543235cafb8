//! Averaging readings taken while a calibration drifts.
//!
//! A calibration constant was measured before the readings (`c0`) and after
//! them (`c1`). The truth lies somewhere between "it stayed at `c0`" and "it
//! moved linearly from `c0` to `c1`". Averaging more readings shrinks the
//! statistical error but lets the two hypotheses drift apart, so for each
//! prefix of the readings we report
//!
//! ```text
//! value       = (avg_constant + avg_linear) / 2
//! systematic  = |avg_constant - avg_linear| / 2
//! statistical = reading_error / sqrt(n)
//! total       = sqrt(statistical^2 + systematic^2)
//! ```
//!
//! and pick the prefix with the smallest total error.

use serde::Serialize;

use crate::error::{FitError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CalibrationDrift {
    pub c0: f64,
    pub c1: f64,
    /// Reading intervals between the `c0` measurement and the first reading.
    pub lead_steps: u32,
    /// Reading intervals between the last reading and the `c1` measurement.
    pub trail_steps: u32,
    /// Uncertainty of one calibrated reading.
    pub reading_error: f64,
}

impl CalibrationDrift {
    /// Linear-drift calibration constant for reading `i` of `n`.
    pub fn linear_constant(&self, i: usize, n: usize) -> f64 {
        let span = (n as f64 - 1.0) + self.lead_steps as f64 + self.trail_steps as f64;
        let pos = i as f64 + self.lead_steps as f64;
        self.c0 + (self.c1 - self.c0) * pos / span
    }

    fn validate(&self) -> Result<()> {
        let ok = |v: f64| v.is_finite() && v != 0.0;
        if !(ok(self.c0) && ok(self.c1)) {
            return Err(FitError::InvalidConfig(format!(
                "calibration constants must be finite and non-zero, got c0={}, c1={}",
                self.c0, self.c1
            )));
        }
        if !(self.reading_error.is_finite() && self.reading_error > 0.0) {
            return Err(FitError::InvalidConfig(format!(
                "reading error must be finite and > 0, got {}",
                self.reading_error
            )));
        }
        if self.lead_steps + self.trail_steps == 0 {
            return Err(FitError::InvalidConfig(
                "calibrations cannot coincide with the readings on both ends".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DriftEstimate {
    /// Number of leading readings averaged.
    pub n: usize,
    pub value: f64,
    pub statistical: f64,
    pub systematic: f64,
    pub total: f64,
}

/// One estimate per prefix length `1..=readings.len()`.
pub fn drift_estimates(readings: &[f64], drift: &CalibrationDrift) -> Result<Vec<DriftEstimate>> {
    drift.validate()?;
    if readings.is_empty() {
        return Err(FitError::EmptyDataset);
    }
    if let Some(i) = readings.iter().position(|r| !r.is_finite()) {
        return Err(FitError::domain(format!("reading {i} is not finite")));
    }

    let n_all = readings.len();
    let mut sum_constant = 0.0;
    let mut sum_linear = 0.0;
    let mut out = Vec::with_capacity(n_all);
    for (i, &r) in readings.iter().enumerate() {
        sum_constant += r / drift.c0;
        sum_linear += r / drift.linear_constant(i, n_all);

        let n = i + 1;
        let avg_constant = sum_constant / n as f64;
        let avg_linear = sum_linear / n as f64;
        let statistical = drift.reading_error / (n as f64).sqrt();
        let systematic = (avg_constant - avg_linear).abs() / 2.0;
        out.push(DriftEstimate {
            n,
            value: (avg_constant + avg_linear) / 2.0,
            statistical,
            systematic,
            total: statistical.hypot(systematic),
        });
    }
    Ok(out)
}

/// The prefix with the smallest total error (earliest on ties).
pub fn best_estimate(estimates: &[DriftEstimate]) -> Option<&DriftEstimate> {
    estimates
        .iter()
        .reduce(|best, e| if e.total < best.total { e } else { best })
}

#[cfg(test)]
mod tests {
    use super::*;

    const READINGS: [f64; 30] = [
        3050.04799962, 3050.65793633, 3050.90569409, 3050.24155269, 3050.22787491, 3050.35741371,
        3050.43373716, 3050.40810523, 3050.00879966, 3050.70846062, 3050.43380199, 3049.93443244,
        3050.35913566, 3050.49479939, 3050.43455763, 3050.57309314, 3050.0926935, 3050.39308078,
        3050.24608074, 3050.09896557, 3049.95573773, 3050.30141048, 3050.1304266, 3050.26240642,
        3050.10285653, 3049.28562153, 3049.83249471, 3050.28712602, 3049.65682186, 3049.0459217,
    ];

    fn night_run() -> CalibrationDrift {
        CalibrationDrift {
            c0: 4.87052,
            c1: 4.86894,
            lead_steps: 1,
            trail_steps: 2,
            reading_error: 0.1,
        }
    }

    #[test]
    fn best_prefix_balances_statistics_and_drift() {
        let estimates = drift_estimates(&READINGS, &night_run()).unwrap();
        assert_eq!(estimates.len(), 30);

        let best = best_estimate(&estimates).unwrap();
        assert_eq!(best.n, 12);
        assert!((best.value - 626.3118).abs() < 1e-3);
        assert!((best.total - 0.03548).abs() < 1e-4);
        assert!((best.statistical - 0.1 / 12f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn first_reading_has_tiny_systematic() {
        let estimates = drift_estimates(&READINGS, &night_run()).unwrap();
        assert_eq!(estimates[0].statistical, 0.1);
        assert!((estimates[0].systematic - 0.003174).abs() < 1e-5);
        assert!(estimates[29].systematic > estimates[0].systematic);
    }

    #[test]
    fn linear_constant_spans_the_calibrations() {
        let drift = CalibrationDrift {
            lead_steps: 1,
            trail_steps: 1,
            ..night_run()
        };
        // Three readings between two calibrations: 1/4, 2/4, 3/4 of the way.
        let mid = drift.linear_constant(1, 3);
        assert!((mid - (drift.c0 + drift.c1) / 2.0).abs() < 1e-12);
    }

    #[test]
    fn invalid_inputs_are_rejected() {
        assert!(matches!(drift_estimates(&[], &night_run()), Err(FitError::EmptyDataset)));
        let bad = CalibrationDrift {
            c0: 0.0,
            ..night_run()
        };
        assert!(matches!(drift_estimates(&READINGS, &bad), Err(FitError::InvalidConfig(_))));
    }
}
