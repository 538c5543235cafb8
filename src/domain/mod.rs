//! Domain types used throughout the crate.
//!
//! This module defines:
//!
//! - observations (`Dataset`)
//! - optimizer outputs (`FitResult`) and limits (`SolveLimits`)
//! - profile scans (`ProfileScan`, `ProfilePoint`, `ProfileConfig`)
//! - goodness-of-fit values (`GoodnessOfFit`, `GofThresholds`, `FitVerdict`)

pub mod types;

pub use types::*;
