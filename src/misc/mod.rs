//! Sampling and formatting helpers
mod func;

pub use func::*;
