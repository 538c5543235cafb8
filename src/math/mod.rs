//! Mathematical utilities: finite-difference Jacobians, covariance inversion,
//! and distribution helpers.

pub mod diff;
pub mod linalg;
pub mod stats;

pub use diff::*;
pub use linalg::*;
pub use stats::*;
