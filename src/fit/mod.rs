//! Fitting, scanning and goodness-of-fit.
//!
//! - `residuals`: the single chi-square implementation
//! - `optimizer` / `observer`: the solver seam (argmin Nelder-Mead by default)
//! - `profile`: fixed-parameter profile scans
//! - `gof`: chi-square probability and verdict
//! - the rest: initial-guess scans, chi-square surfaces, Monte Carlo and
//!   calibration-drift studies

pub mod drift;
pub mod fitter;
pub mod gof;
pub mod grid;
pub mod guess_scan;
pub mod montecarlo;
pub mod observer;
pub mod optimizer;
pub mod profile;
pub mod residuals;
pub mod surface;

pub use drift::*;
pub use fitter::*;
pub use gof::*;
pub use grid::*;
pub use guess_scan::*;
pub use montecarlo::*;
pub use observer::*;
pub use optimizer::*;
pub use profile::*;
pub use residuals::*;
pub use surface::*;
