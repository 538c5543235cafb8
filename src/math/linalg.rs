//! Covariance from the weighted Jacobian.
//!
//! With absolute uncertainties, the parameter covariance at a chi-square
//! minimum is
//!
//! ```text
//! C = (J_w^T J_w)^-1,   J_w[i, j] = (d model_i / d p_j) / sigma_i
//! ```
//!
//! The curvature matrix can be singular (a parameter the data does not
//! constrain) or badly conditioned. We detect that with an SVD and return
//! `None` instead of a matrix of garbage.

use nalgebra::DMatrix;

/// Smallest accepted ratio between the smallest and largest singular value.
const MIN_RCOND: f64 = 1e-12;

/// `(J^T J)^-1` for an already-weighted Jacobian, or `None` if singular.
pub fn covariance_from_jacobian(jac: &DMatrix<f64>) -> Option<DMatrix<f64>> {
    if jac.ncols() == 0 {
        return Some(DMatrix::zeros(0, 0));
    }
    let curvature = jac.transpose() * jac;
    invert_symmetric(&curvature)
}

/// Invert a symmetric positive semi-definite matrix via SVD.
///
/// Returns `None` when the matrix is rank deficient (relative to [`MIN_RCOND`])
/// or contains non-finite values.
pub fn invert_symmetric(m: &DMatrix<f64>) -> Option<DMatrix<f64>> {
    if m.iter().any(|v| !v.is_finite()) {
        return None;
    }
    let svd = m.clone().svd(true, true);
    let s_max = svd.singular_values.max();
    let s_min = svd.singular_values.min();
    if !(s_max > 0.0) || s_min <= s_max * MIN_RCOND {
        return None;
    }

    let inv = svd.pseudo_inverse(s_max * MIN_RCOND).ok()?;
    if inv.iter().all(|v| v.is_finite()) {
        // Symmetrize to wash out rounding asymmetry.
        Some((&inv + inv.transpose()) * 0.5)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn covariance_of_straight_line() {
        // Design matrix for y = a + b x on x = 0..4 with sigma = 1.
        let jac = DMatrix::from_row_slice(
            5,
            2,
            &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0, 1.0, 3.0, 1.0, 4.0],
        );
        let cov = covariance_from_jacobian(&jac).unwrap();
        assert!((cov[(0, 0)] - 0.6).abs() < 1e-12);
        assert!((cov[(0, 1)] + 0.2).abs() < 1e-12);
        assert!((cov[(1, 0)] + 0.2).abs() < 1e-12);
        assert!((cov[(1, 1)] - 0.1).abs() < 1e-12);
    }

    #[test]
    fn singular_curvature_is_detected() {
        // Two identical columns: the parameters are not separately identifiable.
        let jac = DMatrix::from_row_slice(3, 2, &[1.0, 1.0, 2.0, 2.0, 3.0, 3.0]);
        assert!(covariance_from_jacobian(&jac).is_none());
    }
}
