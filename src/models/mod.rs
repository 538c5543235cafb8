//! Parametric models and the model evaluator.
//!
//! Models are small, pure values so that fitting/scan code can stay generic
//! over them (`&dyn ParametricModel` everywhere).

pub mod model;

pub use model::*;
