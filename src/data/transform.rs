//! Dataset transforms that reproduce common fitting shortcuts.

use std::f64::consts::LN_10;

use crate::domain::Dataset;
use crate::error::{FitError, Result};

/// Map `y -> log10(y)` and propagate the errors: `sigma -> sigma / (y ln 10)`.
///
/// Fitting a straight line to this is the classic way to "linearize" an
/// exponential. Every `y` must be strictly positive.
pub fn log10_transform(dataset: &Dataset) -> Result<Dataset> {
    if let Some(i) = dataset.y().iter().position(|&y| y <= 0.0) {
        return Err(FitError::domain(format!(
            "cannot take log10 of y[{i}] = {} (x = {})",
            dataset.y()[i],
            dataset.x()[i]
        )));
    }
    let y = dataset.y().iter().map(|y| y.log10()).collect();
    let sigma = dataset
        .y()
        .iter()
        .zip(dataset.sigma())
        .map(|(y, s)| s / (y * LN_10))
        .collect();
    Dataset::new(dataset.x().to_vec(), y, sigma)
}

/// Same points, every uncertainty set to 1: a fit that ignores error bars.
pub fn unweighted(dataset: &Dataset) -> Dataset {
    dataset.with_unit_errors()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_transform_propagates_errors() {
        let ds = Dataset::new(vec![0.0, 1.0], vec![10.0, 100.0], vec![1.0, 5.0]).unwrap();
        let log = log10_transform(&ds).unwrap();
        assert_eq!(log.y(), &[1.0, 2.0]);
        assert!((log.sigma()[0] - 1.0 / (10.0 * LN_10)).abs() < 1e-15);
        assert!((log.sigma()[1] - 5.0 / (100.0 * LN_10)).abs() < 1e-15);
    }

    #[test]
    fn log_of_non_positive_data_is_a_domain_error() {
        let ds = Dataset::new(vec![0.0, 1.0], vec![3.0, -1.0], vec![1.0, 1.0]).unwrap();
        assert!(matches!(log10_transform(&ds), Err(FitError::Domain(_))));
        let ds = Dataset::new(vec![0.0], vec![0.0], vec![1.0]).unwrap();
        assert!(matches!(log10_transform(&ds), Err(FitError::Domain(_))));
    }

    #[test]
    fn unweighted_keeps_points() {
        let ds = Dataset::new(vec![0.0, 1.0], vec![3.0, 4.0], vec![0.1, 9.0]).unwrap();
        let flat = unweighted(&ds);
        assert_eq!(flat.x(), ds.x());
        assert_eq!(flat.y(), ds.y());
        assert_eq!(flat.sigma(), &[1.0, 1.0]);
    }
}
