//! Finite mixtures of multivariate Gaussian and Student's T distributions.
//!
//! A [`Mixture`](dist::Mixture) is a weighted sum of
//! [`Component`](dist::Component)s that share a dimension and a degrees of
//! freedom parameter, ν. With ν = ∞ every component is a Gaussian; any
//! finite, positive ν makes every component a Student's T.
//!
//! Each component stores its shape matrix through its lower Cholesky factor,
//! so density evaluation is a forward triangular solve per point and sampling
//! is a single matrix-vector product.
//!
//! # Example
//!
//! Fit a two-component mixture to draws from a known mixture.
//!
//! ```
//! use emix::prelude::*;
//! use nalgebra::{DMatrix, DVector};
//! use rand::SeedableRng;
//! use rand_xoshiro::Xoshiro256Plus;
//!
//! let mut rng = Xoshiro256Plus::seed_from_u64(0x1234);
//!
//! let truth = Mixture::gaussian(vec![
//!     Component::new(0.5, DVector::from_vec(vec![-4.0]), DMatrix::identity(1, 1)).unwrap(),
//!     Component::new(0.5, DVector::from_vec(vec![4.0]), DMatrix::identity(1, 1)).unwrap(),
//! ]).unwrap();
//!
//! let mut xs = DMatrix::zeros(2000, 1);
//! truth.draw_into(&mut rng, &mut xs).unwrap();
//!
//! let mut fit = Mixture::gaussian(vec![
//!     Component::new(0.5, DVector::from_vec(vec![-1.0]), DMatrix::identity(1, 1)).unwrap(),
//!     Component::new(0.5, DVector::from_vec(vec![1.0]), DMatrix::identity(1, 1)).unwrap(),
//! ]).unwrap();
//!
//! for _ in 0..20 {
//!     fit.update_em_unweighted(&xs, Damping::default()).unwrap();
//! }
//!
//! assert!((fit[0].mean()[0] + 4.0).abs() < 0.2);
//! assert!((fit[1].mean()[0] - 4.0).abs() < 0.2);
//! ```

/// Implement `Display` for a type that implements `From<&Type> for String`
#[macro_export]
macro_rules! impl_display {
    ($kind: ty) => {
        impl ::std::fmt::Display for $kind {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                write!(f, "{}", String::from(self))
            }
        }
    };
}

pub mod consts;
pub mod dist;
pub mod misc;
pub mod prelude;
pub mod traits;
