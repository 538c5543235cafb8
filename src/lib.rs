//! `fitscan` library crate.
//!
//! Profile chi-square scans and goodness-of-fit checks for nonlinear curve
//! fitting. The binary (`fitscan`) is a thin wrapper around this library so
//! the numerical code is testable without spawning processes.

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod logger;
pub mod math;
pub mod models;
pub mod plot;
pub mod report;
