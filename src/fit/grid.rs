//! Scan grids.
//!
//! Values are computed as `start + i * step` rather than by accumulation, so
//! long grids do not drift.

use crate::error::{FitError, Result};

/// Upper bound on the number of points one grid may hold.
pub const MAX_GRID_POINTS: usize = 10_000_000;

/// Half-open grid `[start, stop)` with a fixed step.
pub fn arange(start: f64, stop: f64, step: f64) -> Result<Vec<f64>> {
    if !(start.is_finite() && stop.is_finite() && step.is_finite() && step > 0.0) {
        return Err(FitError::InvalidConfig(format!(
            "invalid grid: start={start}, stop={stop}, step={step} (must be finite, step > 0)"
        )));
    }
    if stop <= start {
        return Ok(Vec::new());
    }
    let count = ((stop - start) / step).ceil();
    if !(count <= MAX_GRID_POINTS as f64) {
        return Err(FitError::InvalidConfig(format!(
            "grid [{start}, {stop}) with step {step} would exceed {MAX_GRID_POINTS} points"
        )));
    }
    let n = count as usize;
    Ok((0..n)
        .map(|i| start + step * i as f64)
        .filter(|v| *v < stop)
        .collect())
}

/// `steps` evenly spaced points between `min` and `max` (inclusive).
pub fn linspace(min: f64, max: f64, steps: usize) -> Result<Vec<f64>> {
    if !(min.is_finite() && max.is_finite() && max > min) {
        return Err(FitError::InvalidConfig(format!(
            "invalid range: min={min}, max={max} (must be finite and max > min)"
        )));
    }
    if steps < 2 {
        return Err(FitError::InvalidConfig("grid steps must be >= 2".to_string()));
    }
    let step = (max - min) / (steps as f64 - 1.0);
    let mut out: Vec<f64> = (0..steps).map(|i| min + step * i as f64).collect();
    out[steps - 1] = max;
    Ok(out)
}
