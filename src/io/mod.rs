//! Input/output helpers.
//!
//! - counts JSON and dataset CSV read/write (`dataset`)
//! - profile scan exports (CSV/JSON) (`export`)

pub mod dataset;
pub mod export;

pub use dataset::*;
pub use export::*;
