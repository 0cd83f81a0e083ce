//! Trait definitions
use nalgebra::{DMatrix, DVector};
use rand::{Rng, RngCore};

use crate::dist::{Damping, MixtureError};

/// Has a probability density (or un-normalized density) function
pub trait HasDensity<X> {
    /// Probability function
    ///
    /// # Example
    ///
    /// ```
    /// use emix::prelude::*;
    /// use nalgebra::DVector;
    ///
    /// let mm = Mixture::gaussian(vec![Component::standard(1).unwrap()]).unwrap();
    /// let f = mm.f(&DVector::from_vec(vec![0.0]));
    ///
    /// assert!((f - 0.398_942_280_401_432_7).abs() < 1E-12);
    /// ```
    fn f(&self, x: &X) -> f64 {
        self.ln_f(x).exp()
    }

    /// Log of the probability function
    fn ln_f(&self, x: &X) -> f64;
}

/// Can draw random values
pub trait Sampleable<X> {
    /// Single draw from the `Rv`
    fn draw<R: Rng>(&self, rng: &mut R) -> X;

    /// Multiple draws of the `Rv`
    fn sample<R: Rng>(&self, n: usize, mut rng: &mut R) -> Vec<X> {
        (0..n).map(|_| self.draw(&mut rng)).collect()
    }
}

/// A random variable: has a density and can be sampled
pub trait Rv<X>: HasDensity<X> + Sampleable<X> {}

impl<X, T> Rv<X> for T where T: HasDensity<X> + Sampleable<X> {}

/// Identifies the support of the distribution
pub trait Support<X> {
    /// Returns `true` if `x` is in the support of the `Rv`
    fn supports(&self, x: &X) -> bool;
}

/// Continuous probability distributions
pub trait ContinuousDistr<X>: HasDensity<X> + Support<X> {
    /// The value of the Probability Density Function (PDF) at `x`
    fn pdf(&self, x: &X) -> f64 {
        self.ln_pdf(x).exp()
    }

    /// The value of the log Probability Density Function (PDF) at `x`.
    /// Values outside the support have log density -∞.
    fn ln_pdf(&self, x: &X) -> f64 {
        if self.supports(x) {
            self.ln_f(x)
        } else {
            f64::NEG_INFINITY
        }
    }
}

/// Defines the distribution mean
pub trait Mean<X> {
    /// Returns `None` if the mean is undefined
    fn mean(&self) -> Option<X>;
}

/// Defines the distribution variance
pub trait Variance<X> {
    /// Returns `None` if the variance is undefined
    fn variance(&self) -> Option<X>;
}

/// Converts to and from a plain parameter struct
pub trait Parameterized: Sized {
    type Parameters;

    fn emit_params(&self) -> Self::Parameters;

    fn from_params(params: Self::Parameters) -> Self;

    fn map_params(&self, f: impl Fn(Self::Parameters) -> Self::Parameters) -> Self {
        let params = self.emit_params();
        let new_params = f(params);
        Self::from_params(new_params)
    }
}

/// Dimension-erased interface to a mixture density.
///
/// Batches of points are `DMatrix`es with one point per row. Every output
/// buffer is allocated by the caller and must have the exact expected shape.
///
/// # Example
///
/// ```
/// use emix::prelude::*;
/// use nalgebra::{DMatrix, DVector};
///
/// let mixtures: Vec<Box<dyn MixtureDistr>> = vec![
///     Box::new(Mixture::gaussian(vec![Component::standard(1).unwrap()]).unwrap()),
///     Box::new(Mixture::new(vec![Component::standard(3).unwrap()], 4.0).unwrap()),
/// ];
///
/// for mm in mixtures.iter() {
///     let xs = DMatrix::zeros(5, mm.ndims());
///     let mut fx = DVector::zeros(5);
///     mm.evaluate(&xs, &mut fx).unwrap();
///     assert!(fx.iter().all(|&f| f > 0.0));
/// }
/// ```
pub trait MixtureDistr {
    /// The number of dimensions of each point
    fn ndims(&self) -> usize;

    /// The number of components
    fn n_components(&self) -> usize;

    /// Evaluate the density at each row of `x`, writing into `out`
    fn evaluate(
        &self,
        x: &DMatrix<f64>,
        out: &mut DVector<f64>,
    ) -> Result<(), MixtureError>;

    /// Evaluate the weighted density of each component at each row of `x`.
    /// `out` has one row per point and one column per component.
    fn evaluate_components(
        &self,
        x: &DMatrix<f64>,
        out: &mut DMatrix<f64>,
    ) -> Result<(), MixtureError>;

    /// Fill every row of `out` with a random draw
    fn draw_into(
        &self,
        rng: &mut dyn RngCore,
        out: &mut DMatrix<f64>,
    ) -> Result<(), MixtureError>;

    /// Run one damped Expectation-Maximization step against the weighted
    /// points in `x`
    fn update_em(
        &mut self,
        x: &DMatrix<f64>,
        w: &DVector<f64>,
        damping: Damping,
    ) -> Result<(), MixtureError>;

    /// Deep copy behind a new box
    fn clone_box(&self) -> Box<dyn MixtureDistr>;
}

impl Clone for Box<dyn MixtureDistr> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}
