//! Probability distributions
mod component;
mod mixture;

pub use component::{Component, ComponentError, ComponentParameters};
pub use mixture::{
    Damping, DampingError, DampingParameters, DiagonalShape, FixedMean,
    Mixture, MixtureError, MixtureParameters, NoRestriction,
    UpdateRestriction,
};
