//! Reporting utilities: per-point residuals, outlier ranking and formatted
//! terminal output.

pub mod format;

pub use format::*;

use crate::domain::Dataset;
use crate::error::Result;
use crate::fit::residuals::{pulls, residuals};

/// One observation next to its prediction.
#[derive(Debug, Clone, PartialEq)]
pub struct ResidualRow {
    pub index: usize,
    pub x: f64,
    pub y: f64,
    pub y_fit: f64,
    pub residual: f64,
    pub pull: f64,
}

/// Residuals and pulls for every point, in dataset order.
pub fn residual_rows(dataset: &Dataset, predicted: &[f64]) -> Result<Vec<ResidualRow>> {
    let res = residuals(dataset, predicted)?;
    let pl = pulls(dataset, predicted)?;
    Ok((0..dataset.len())
        .map(|i| ResidualRow {
            index: i,
            x: dataset.x()[i],
            y: dataset.y()[i],
            y_fit: predicted[i],
            residual: res[i],
            pull: pl[i],
        })
        .collect())
}

/// The `top_n` rows with the largest `|pull|`, largest first.
///
/// A bad chi-square dominated by a few of these points points at outliers
/// rather than underestimated error bars.
pub fn largest_pulls(rows: &[ResidualRow], top_n: usize) -> Vec<ResidualRow> {
    let mut sorted = rows.to_vec();
    sorted.sort_by(|a, b| b.pull.abs().total_cmp(&a.pull.abs()));
    sorted.truncate(top_n);
    sorted
}
