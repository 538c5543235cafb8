//! Chi-square on a 2-D parameter grid, everything else held fixed.
//!
//! No refitting happens here: this is the raw objective surface, the picture
//! behind a contour plot of two parameters.

use rayon::prelude::*;
use serde::Serialize;

use crate::domain::Dataset;
use crate::error::{FitError, Result};
use crate::fit::residuals::LeastSquaresProblem;
use crate::models::ParametricModel;

#[derive(Debug, Clone, Serialize)]
pub struct Chi2Surface {
    pub x_index: usize,
    pub y_index: usize,
    pub xs: Vec<f64>,
    pub ys: Vec<f64>,
    /// `values[j][i]` is the chi-square at `(xs[i], ys[j])`; NaN where the model
    /// could not be evaluated.
    pub values: Vec<Vec<f64>>,
}

impl Chi2Surface {
    /// `(x, y, chi2)` at the lowest finite grid value.
    pub fn min(&self) -> Option<(f64, f64, f64)> {
        let mut best: Option<(f64, f64, f64)> = None;
        for (j, row) in self.values.iter().enumerate() {
            for (i, &v) in row.iter().enumerate() {
                if v.is_finite() && best.is_none_or(|(_, _, b)| v < b) {
                    best = Some((self.xs[i], self.ys[j], v));
                }
            }
        }
        best
    }
}

/// Evaluate chi-square for every `(x, y)` pair of parameter values.
pub fn chi2_surface(
    model: &dyn ParametricModel,
    dataset: &Dataset,
    base_params: &[f64],
    (x_index, xs): (usize, &[f64]),
    (y_index, ys): (usize, &[f64]),
) -> Result<Chi2Surface> {
    let arity = model.arity();
    if base_params.len() != arity {
        return Err(FitError::ArityMismatch {
            expected: arity,
            got: base_params.len(),
        });
    }
    if x_index >= arity || y_index >= arity || x_index == y_index {
        return Err(FitError::InvalidParameter(format!(
            "surface axes ({x_index}, {y_index}) must be two distinct indices below {arity}"
        )));
    }

    let problem = LeastSquaresProblem::new(model, dataset);
    let values = ys
        .par_iter()
        .map(|&y| {
            let mut params = base_params.to_vec();
            params[y_index] = y;
            xs.iter()
                .map(|&x| {
                    params[x_index] = x;
                    match problem.chi_square(&params) {
                        Ok(chi2) => Ok(chi2),
                        Err(FitError::Domain(_)) => Ok(f64::NAN),
                        Err(e) => Err(e),
                    }
                })
                .collect::<Result<Vec<f64>>>()
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Chi2Surface {
        x_index,
        y_index,
        xs: xs.to_vec(),
        ys: ys.to_vec(),
        values,
    })
}
