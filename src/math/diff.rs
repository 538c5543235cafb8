//! Central-difference Jacobian of the weighted residuals.
//!
//! For covariance estimation we need `J_ij = d pull_i / d p_j`. Models in this
//! crate are cheap, closed-form functions, so a numerical Jacobian is accurate
//! enough and keeps the `ParametricModel` trait to a single method.
//!
//! Step size: `h_j = cbrt(eps) * max(|p_j|, 1)`, the usual balance between
//! truncation and rounding error for central differences.

use nalgebra::DMatrix;

use crate::error::Result;

/// Jacobian of `f: R^p -> R^n` at `params` by central differences.
///
/// `f` is called `2p` times; any error it returns is propagated.
pub fn central_jacobian<F>(f: F, params: &[f64], n_out: usize) -> Result<DMatrix<f64>>
where
    F: Fn(&[f64]) -> Result<Vec<f64>>,
{
    let p = params.len();
    let mut jac = DMatrix::<f64>::zeros(n_out, p);
    let base_step = f64::EPSILON.cbrt();
    let mut work = params.to_vec();

    for j in 0..p {
        let h = base_step * params[j].abs().max(1.0);

        work[j] = params[j] + h;
        let plus = f(&work)?;
        work[j] = params[j] - h;
        let minus = f(&work)?;
        work[j] = params[j];

        for i in 0..n_out {
            jac[(i, j)] = (plus[i] - minus[i]) / (2.0 * h);
        }
    }

    Ok(jac)
}
