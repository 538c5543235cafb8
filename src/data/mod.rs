//! Dataset producers and transforms.

pub mod synth;
pub mod transform;

pub use synth::*;
pub use transform::*;
