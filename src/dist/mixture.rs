#[cfg(feature = "serde1")]
use serde::{Deserialize, Serialize};

use log::debug;
use nalgebra::{DMatrix, DVector};
use rand::{Rng, RngCore};
use rand_distr::{ChiSquared, StandardNormal};
use special::Gamma as _;
use std::fmt;
use std::ops::{Index, IndexMut};

use crate::consts::{HALF_LN_2PI, LN_PI};
use crate::dist::component::validate_projection;
use crate::dist::{Component, ComponentError};
use crate::impl_display;
use crate::misc::pflip;
use crate::traits::*;

mod em;
mod restriction;

pub use em::{Damping, DampingError, DampingParameters};
pub use restriction::{
    DiagonalShape, FixedMean, NoRestriction, UpdateRestriction,
};

/// A finite mixture of multivariate Gaussian or Student's T distributions.
///
/// Every component shares the number of dimensions, D, and the degrees of
/// freedom, ν. The density at x is
///
/// f(x) = Σₖ wₖ c(z) / √|Σₖ|, z = (x - μₖ)ᵀ Σₖ⁻¹ (x - μₖ)
///
/// where the kernel, c, is (2π)^(-D/2) exp(-z/2) for the Gaussian (ν = ∞),
/// and Γ((ν+D)/2) / (Γ(ν/2)(νπ)^(D/2)) (1 + z/ν)^(-(ν+D)/2) for the
/// Student's T.
///
/// # Example
///
/// ```
/// use emix::prelude::*;
/// use nalgebra::{DMatrix, DVector};
///
/// let mm = Mixture::gaussian(vec![
///     Component::new(1.0, DVector::from_vec(vec![-1.0]), DMatrix::identity(1, 1)).unwrap(),
///     Component::new(3.0, DVector::from_vec(vec![1.0]), DMatrix::identity(1, 1)).unwrap(),
/// ]).unwrap();
///
/// // weights are normalized on construction
/// assert_eq!(mm[0].weight, 0.25);
/// assert_eq!(mm[1].weight, 0.75);
///
/// let f = mm.f(&DVector::from_vec(vec![0.0]));
/// assert!((f - 0.241_970_724_519_143_37).abs() < 1E-12);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde1", serde(try_from = "MixtureParameters"))]
#[cfg_attr(feature = "serde1", serde(into = "MixtureParameters"))]
pub struct Mixture {
    ndims: usize,
    /// Degrees of freedom, ν. Infinite for a Gaussian mixture.
    df: f64,
    gaussian: bool,
    /// Kernel normalizer shared by every component
    norm: f64,
    components: Vec<Component>,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde1", serde(rename_all = "snake_case"))]
pub struct MixtureParameters {
    pub ndims: usize,
    /// Degrees of freedom; `None` for a Gaussian mixture
    pub df: Option<f64>,
    pub components: Vec<Component>,
}

impl TryFrom<MixtureParameters> for Mixture {
    type Error = MixtureError;

    /// Weights are restored as stored, without normalization, so a mixture
    /// round-trips exactly.
    fn try_from(params: MixtureParameters) -> Result<Self, Self::Error> {
        let df = params.df.unwrap_or(f64::INFINITY);
        validate_df(df)?;
        if params.ndims == 0 {
            return Err(ComponentError::ZeroDimensions.into());
        }

        if let Some((ix, cpnt)) = params
            .components
            .iter()
            .enumerate()
            .find(|(_, cpnt)| cpnt.ndims() != params.ndims)
        {
            return Err(MixtureError::ComponentDimensionMismatch {
                ix,
                ndims: cpnt.ndims(),
                expected: params.ndims,
            });
        }

        Ok(Mixture::new_unchecked(params.ndims, params.components, df))
    }
}

impl From<Mixture> for MixtureParameters {
    fn from(mm: Mixture) -> Self {
        mm.emit_params()
    }
}

impl Parameterized for Mixture {
    type Parameters = MixtureParameters;

    fn emit_params(&self) -> Self::Parameters {
        Self::Parameters {
            ndims: self.ndims,
            df: if self.gaussian { None } else { Some(self.df) },
            components: self.components.clone(),
        }
    }

    fn from_params(params: Self::Parameters) -> Self {
        Self::new_unchecked(
            params.ndims,
            params.components,
            params.df.unwrap_or(f64::INFINITY),
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde1", serde(rename_all = "snake_case"))]
pub enum MixtureError {
    /// The mixture has no components
    NoComponents,
    /// A component has a different number of dimensions than the others
    ComponentDimensionMismatch {
        /// Index of the offending component
        ix: usize,
        /// Number of dimensions of the offending component
        ndims: usize,
        /// Number of dimensions of the mixture
        expected: usize,
    },
    /// The degrees of freedom is zero or negative
    DfTooLow { df: f64 },
    /// The degrees of freedom is NaN
    DfIsNan,
    /// The component weights sum to zero or less
    ZeroTotalWeight,
    /// The component weights sum to infinity or NaN
    TotalWeightNotFinite { total: f64 },
    /// The points have a different number of columns than the mixture has
    /// dimensions
    SampleDimensionMismatch { ncols: usize, ndims: usize },
    /// An output buffer has the wrong shape
    OutputShapeMismatch {
        /// (rows, columns) required
        expected: (usize, usize),
        /// (rows, columns) supplied
        found: (usize, usize),
    },
    /// There is not one sample weight per point
    WeightsLengthMismatch { n_weights: usize, n_samples: usize },
    /// A component operation failed
    Component(ComponentError),
}

impl From<ComponentError> for MixtureError {
    fn from(err: ComponentError) -> Self {
        MixtureError::Component(err)
    }
}

#[inline]
fn validate_df(df: f64) -> Result<(), MixtureError> {
    if df.is_nan() {
        Err(MixtureError::DfIsNan)
    } else if df <= 0.0 {
        Err(MixtureError::DfTooLow { df })
    } else {
        Ok(())
    }
}

/// Whether `df` is Gaussian, and the kernel normalizer for `ndims` dimensions
fn kernel_norm(df: f64, ndims: usize) -> (bool, f64) {
    let d = ndims as f64;
    if df == f64::INFINITY {
        (true, (-d * HALF_LN_2PI).exp())
    } else {
        let ln_norm = (0.5 * (df + d)).ln_gamma().0
            - (0.5 * df).ln_gamma().0
            - 0.5 * d * (df.ln() + LN_PI);
        (false, ln_norm.exp())
    }
}

impl Mixture {
    /// Create a new mixture with `df` degrees of freedom. Use
    /// `f64::INFINITY` for Gaussian components.
    ///
    /// Component weights are normalized to sum to one.
    ///
    /// # Example
    ///
    /// ```
    /// # use emix::dist::{Component, Mixture, MixtureError};
    /// let cpnts = vec![Component::standard(2).unwrap(); 3];
    ///
    /// let mm = Mixture::new(cpnts.clone(), 3.5).unwrap();
    /// assert_eq!(mm.k(), 3);
    /// assert!(!mm.is_gaussian());
    ///
    /// assert_eq!(Mixture::new(vec![], 3.5), Err(MixtureError::NoComponents));
    /// assert!(Mixture::new(cpnts.clone(), 0.0).is_err());
    /// assert!(Mixture::new(cpnts, f64::NAN).is_err());
    /// ```
    pub fn new(
        components: Vec<Component>,
        df: f64,
    ) -> Result<Self, MixtureError> {
        validate_df(df)?;
        let ndims = components
            .first()
            .map(|cpnt| cpnt.ndims())
            .ok_or(MixtureError::NoComponents)?;

        if let Some((ix, cpnt)) = components
            .iter()
            .enumerate()
            .find(|(_, cpnt)| cpnt.ndims() != ndims)
        {
            return Err(MixtureError::ComponentDimensionMismatch {
                ix,
                ndims: cpnt.ndims(),
                expected: ndims,
            });
        }

        let mut mm = Mixture::new_unchecked(ndims, components, df);
        mm.normalize()?;
        Ok(mm)
    }

    /// Create a new mixture of Gaussian components
    #[inline]
    pub fn gaussian(components: Vec<Component>) -> Result<Self, MixtureError> {
        Mixture::new(components, f64::INFINITY)
    }

    /// Creates a new mixture without checking whether the parameters are
    /// valid. Weights are not normalized.
    #[inline]
    pub fn new_unchecked(
        ndims: usize,
        components: Vec<Component>,
        df: f64,
    ) -> Self {
        let (gaussian, norm) = kernel_norm(df, ndims);
        Mixture {
            ndims,
            df,
            gaussian,
            norm,
            components,
        }
    }

    /// Number of dimensions
    #[inline]
    pub fn ndims(&self) -> usize {
        self.ndims
    }

    /// Number of components
    #[inline]
    pub fn k(&self) -> usize {
        self.components.len()
    }

    #[inline]
    pub fn components(&self) -> &[Component] {
        &self.components
    }

    /// Mutable access to the components. The number of dimensions of each
    /// component must not change, and the weights should be re-normalized
    /// after editing.
    #[inline]
    pub fn components_mut(&mut self) -> &mut [Component] {
        &mut self.components
    }

    #[inline]
    pub fn iter(&self) -> std::slice::Iter<'_, Component> {
        self.components.iter()
    }

    #[inline]
    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Component> {
        self.components.iter_mut()
    }

    /// The component weights, in order
    pub fn weights(&self) -> Vec<f64> {
        self.components.iter().map(|cpnt| cpnt.weight).collect()
    }

    /// Degrees of freedom, ν
    #[inline]
    pub fn df(&self) -> f64 {
        self.df
    }

    /// `true` if ν = ∞
    #[inline]
    pub fn is_gaussian(&self) -> bool {
        self.gaussian
    }

    /// Set the degrees of freedom. Use `f64::INFINITY` for Gaussian
    /// components.
    ///
    /// # Example
    ///
    /// ```
    /// # use emix::dist::{Component, Mixture};
    /// let mut mm = Mixture::gaussian(vec![Component::standard(2).unwrap()]).unwrap();
    /// assert!(mm.is_gaussian());
    ///
    /// mm.set_df(5.0).unwrap();
    /// assert!(!mm.is_gaussian());
    /// assert_eq!(mm.df(), 5.0);
    ///
    /// assert!(mm.set_df(-1.0).is_err());
    /// assert_eq!(mm.df(), 5.0);
    /// ```
    pub fn set_df(&mut self, df: f64) -> Result<(), MixtureError> {
        validate_df(df)?;
        self.set_df_unchecked(df);
        Ok(())
    }

    /// Set the degrees of freedom without input validation
    #[inline]
    pub fn set_df_unchecked(&mut self, df: f64) {
        let (gaussian, norm) = kernel_norm(df, self.ndims);
        self.df = df;
        self.gaussian = gaussian;
        self.norm = norm;
    }

    /// Rescale the weights to sum to one.
    ///
    /// Fails, leaving the weights untouched, if they sum to zero or a
    /// non-finite value.
    pub fn normalize(&mut self) -> Result<(), MixtureError> {
        let total: f64 = self.components.iter().map(|cpnt| cpnt.weight).sum();
        if !total.is_finite() {
            Err(MixtureError::TotalWeightNotFinite { total })
        } else if total <= 0.0 {
            Err(MixtureError::ZeroTotalWeight)
        } else {
            self.components
                .iter_mut()
                .for_each(|cpnt| cpnt.weight /= total);
            Ok(())
        }
    }

    /// Remove every component with weight at or below `threshold`, then
    /// normalize whatever remains. Returns the number of components removed.
    ///
    /// Removing every component is allowed; the empty mixture has density
    /// zero everywhere.
    ///
    /// # Example
    ///
    /// ```
    /// # use emix::dist::{Component, Mixture};
    /// let mut cpnts = vec![Component::standard(1).unwrap(); 3];
    /// cpnts[0].weight = 0.02;
    /// cpnts[1].weight = 0.49;
    /// cpnts[2].weight = 0.49;
    /// let mut mm = Mixture::gaussian(cpnts).unwrap();
    ///
    /// assert_eq!(mm.clip(0.05).unwrap(), 1);
    /// assert_eq!(mm.k(), 2);
    /// assert!((mm[0].weight - 0.5).abs() < 1E-12);
    /// ```
    pub fn clip(&mut self, threshold: f64) -> Result<usize, MixtureError> {
        let n_before = self.components.len();
        self.components.retain(|cpnt| cpnt.weight > threshold);
        let n_removed = n_before - self.components.len();

        if n_removed > 0 {
            debug!(
                "clip: removed {n_removed} of {n_before} components at \
                threshold {threshold}"
            );
        }

        if !self.components.is_empty() {
            self.normalize()?;
        }
        Ok(n_removed)
    }

    /// The marginal mixture over `dims`, in the given order.
    ///
    /// Weights and degrees of freedom carry over; the normalizer is
    /// recomputed for the new number of dimensions.
    ///
    /// # Example
    ///
    /// ```
    /// use emix::prelude::*;
    /// use nalgebra::{DMatrix, DVector};
    ///
    /// let cpnt = Component::new(
    ///     1.0,
    ///     DVector::from_vec(vec![1.0, 2.0, 3.0]),
    ///     DMatrix::identity(3, 3),
    /// ).unwrap();
    /// let mm = Mixture::new(vec![cpnt], 4.0).unwrap();
    ///
    /// let marginal = mm.project(&[2]).unwrap();
    /// assert_eq!(marginal.ndims(), 1);
    /// assert_eq!(marginal.df(), 4.0);
    /// assert_eq!(marginal[0].mean()[0], 3.0);
    ///
    /// assert!(mm.project(&[0, 0]).is_err());
    /// ```
    pub fn project(&self, dims: &[usize]) -> Result<Mixture, MixtureError> {
        validate_projection(dims, self.ndims)?;
        let components = self
            .components
            .iter()
            .map(|cpnt| cpnt.project(dims))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Mixture::new_unchecked(dims.len(), components, self.df))
    }

    #[inline]
    fn kernel(&self, z: f64) -> f64 {
        if self.gaussian {
            self.norm * (-0.5 * z).exp()
        } else {
            let d = self.ndims as f64;
            self.norm * (-0.5 * (self.df + d) * (z / self.df).ln_1p()).exp()
        }
    }

    /// Weighted density of `cpnt` at `x`. `ws` is scratch space.
    #[inline]
    fn weighted_f<'a, I>(
        &self,
        cpnt: &Component,
        x: I,
        ws: &mut DVector<f64>,
    ) -> f64
    where
        I: IntoIterator<Item = &'a f64>,
    {
        let z = cpnt.mahalanobis_sq(x, ws);
        cpnt.weight * self.kernel(z) / cpnt.sqrt_det()
    }

    /// The weighted density, wₖ fₖ(x), of component `ix` at `x`
    ///
    /// # Panics
    ///
    /// If `ix` is out of range or `x` has the wrong number of dimensions
    pub fn component_f(&self, ix: usize, x: &DVector<f64>) -> f64 {
        assert_eq!(x.len(), self.ndims, "x has the wrong number of dimensions");
        let mut ws = DVector::zeros(self.ndims);
        self.weighted_f(&self.components[ix], x.iter(), &mut ws)
    }

    fn check_points(&self, x: &DMatrix<f64>) -> Result<(), MixtureError> {
        if x.ncols() != self.ndims {
            Err(MixtureError::SampleDimensionMismatch {
                ncols: x.ncols(),
                ndims: self.ndims,
            })
        } else {
            Ok(())
        }
    }

    /// Evaluate the mixture density at each row of `x`, writing into `out`.
    ///
    /// `out` must have one entry per row of `x`.
    pub fn evaluate(
        &self,
        x: &DMatrix<f64>,
        out: &mut DVector<f64>,
    ) -> Result<(), MixtureError> {
        self.check_points(x)?;
        if out.len() != x.nrows() {
            return Err(MixtureError::OutputShapeMismatch {
                expected: (x.nrows(), 1),
                found: (out.len(), 1),
            });
        }

        let mut ws = DVector::zeros(self.ndims);
        for (i, fx) in out.iter_mut().enumerate() {
            *fx = self
                .components
                .iter()
                .map(|cpnt| self.weighted_f(cpnt, x.row(i).iter(), &mut ws))
                .sum();
        }
        Ok(())
    }

    /// Evaluate the weighted density of every component at each row of `x`.
    ///
    /// `out` must have one row per row of `x` and one column per component.
    pub fn evaluate_components(
        &self,
        x: &DMatrix<f64>,
        out: &mut DMatrix<f64>,
    ) -> Result<(), MixtureError> {
        self.check_points(x)?;
        let expected = (x.nrows(), self.k());
        if out.shape() != expected {
            return Err(MixtureError::OutputShapeMismatch {
                expected,
                found: out.shape(),
            });
        }

        let mut ws = DVector::zeros(self.ndims);
        for (k, cpnt) in self.components.iter().enumerate() {
            for i in 0..x.nrows() {
                out[(i, k)] = self.weighted_f(cpnt, x.row(i).iter(), &mut ws);
            }
        }
        Ok(())
    }

    /// The posterior probability that each component generated each row of
    /// `x`. Rows sum to one, except for points where every component has
    /// zero density, whose rows are all zero.
    ///
    /// # Example
    ///
    /// ```
    /// use emix::prelude::*;
    /// use nalgebra::{DMatrix, DVector};
    ///
    /// let mm = Mixture::gaussian(vec![
    ///     Component::new(0.5, DVector::from_vec(vec![-1.0]), DMatrix::identity(1, 1)).unwrap(),
    ///     Component::new(0.5, DVector::from_vec(vec![1.0]), DMatrix::identity(1, 1)).unwrap(),
    /// ]).unwrap();
    ///
    /// let x = DMatrix::from_row_slice(2, 1, &[0.0, 1E6]);
    /// let p = mm.responsibilities(&x).unwrap();
    ///
    /// assert!((p[(0, 0)] - 0.5).abs() < 1E-12);
    /// assert_eq!(p[(1, 0)] + p[(1, 1)], 0.0);
    /// ```
    pub fn responsibilities(
        &self,
        x: &DMatrix<f64>,
    ) -> Result<DMatrix<f64>, MixtureError> {
        let mut p = DMatrix::zeros(x.nrows(), self.k());
        self.evaluate_components(x, &mut p)?;

        let mut n_unclaimed = 0_usize;
        for mut row in p.row_iter_mut() {
            let total = row.sum();
            if total > 0.0 {
                row /= total;
            } else {
                row.fill(0.0);
                n_unclaimed += 1;
            }
        }

        if n_unclaimed > 0 {
            debug!(
                "responsibilities: {n_unclaimed} of {} points have zero density",
                x.nrows()
            );
        }
        Ok(p)
    }

    fn chi_squared(&self) -> Option<ChiSquared<f64>> {
        if self.gaussian {
            None
        } else {
            ChiSquared::new(self.df).ok()
        }
    }

    /// Draw from component `ix` into `x`. `z` is scratch space.
    fn draw_component<R: Rng + ?Sized>(
        &self,
        ix: usize,
        chi2: Option<&ChiSquared<f64>>,
        rng: &mut R,
        z: &mut DVector<f64>,
        x: &mut DVector<f64>,
    ) {
        let cpnt = &self.components[ix];
        z.iter_mut().for_each(|zi| *zi = rng.sample(StandardNormal));
        if let Some(chi2) = chi2 {
            let u: f64 = rng.sample(chi2);
            *z *= (self.df / u).sqrt();
        }
        cpnt.shape_factor().mul_to(&*z, x);
        *x += cpnt.mean();
    }

    /// Fill every row of `out` with an independent draw.
    ///
    /// Each draw picks a component by weight, then computes μ + Lz for a
    /// standard normal z. For the Student's T, z is first scaled by
    /// √(ν/u) with u ~ χ²(ν).
    ///
    /// # Example
    ///
    /// ```
    /// use emix::prelude::*;
    /// use nalgebra::DMatrix;
    ///
    /// let mut rng = rand::thread_rng();
    /// let mm = Mixture::new(vec![Component::standard(3).unwrap()], 5.0).unwrap();
    ///
    /// let mut xs = DMatrix::zeros(100, 3);
    /// mm.draw_into(&mut rng, &mut xs).unwrap();
    ///
    /// assert!(xs.iter().all(|x| x.is_finite()));
    /// ```
    pub fn draw_into<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        out: &mut DMatrix<f64>,
    ) -> Result<(), MixtureError> {
        if out.ncols() != self.ndims {
            return Err(MixtureError::OutputShapeMismatch {
                expected: (out.nrows(), self.ndims),
                found: out.shape(),
            });
        }
        if self.components.is_empty() {
            return Err(MixtureError::NoComponents);
        }
        let weights = self.weights();
        let total: f64 = weights.iter().sum();
        if !(total > 0.0) {
            return Err(MixtureError::ZeroTotalWeight);
        }
        if out.nrows() == 0 {
            return Ok(());
        }

        let chi2 = self.chi_squared();
        let mut z = DVector::zeros(self.ndims);
        let mut x = DVector::zeros(self.ndims);
        let ixs = pflip(&weights, out.nrows(), rng);
        for (i, ix) in ixs.into_iter().enumerate() {
            self.draw_component(ix, chi2.as_ref(), rng, &mut z, &mut x);
            out.row_mut(i).tr_copy_from(&x);
        }
        Ok(())
    }
}

impl Index<usize> for Mixture {
    type Output = Component;

    fn index(&self, ix: usize) -> &Component {
        &self.components[ix]
    }
}

impl IndexMut<usize> for Mixture {
    fn index_mut(&mut self, ix: usize) -> &mut Component {
        &mut self.components[ix]
    }
}

impl<'a> IntoIterator for &'a Mixture {
    type Item = &'a Component;
    type IntoIter = std::slice::Iter<'a, Component>;

    fn into_iter(self) -> Self::IntoIter {
        self.components.iter()
    }
}

impl From<&Mixture> for String {
    fn from(mm: &Mixture) -> String {
        format!(
            "Mixture(k: {}, ndims: {}, df: {})",
            mm.k(),
            mm.ndims,
            mm.df
        )
    }
}

impl_display!(Mixture);

impl HasDensity<DVector<f64>> for Mixture {
    /// # Panics
    ///
    /// If `x` has the wrong number of dimensions
    fn f(&self, x: &DVector<f64>) -> f64 {
        assert_eq!(x.len(), self.ndims, "x has the wrong number of dimensions");
        let mut ws = DVector::zeros(self.ndims);
        self.components
            .iter()
            .map(|cpnt| self.weighted_f(cpnt, x.iter(), &mut ws))
            .sum()
    }

    fn ln_f(&self, x: &DVector<f64>) -> f64 {
        self.f(x).ln()
    }
}

impl Sampleable<DVector<f64>> for Mixture {
    /// # Panics
    ///
    /// If the mixture has no components or its weights sum to zero
    fn draw<R: Rng>(&self, rng: &mut R) -> DVector<f64> {
        let ix = pflip(&self.weights(), 1, rng)[0];
        let mut z = DVector::zeros(self.ndims);
        let mut x = DVector::zeros(self.ndims);
        self.draw_component(ix, self.chi_squared().as_ref(), rng, &mut z, &mut x);
        x
    }

    fn sample<R: Rng>(&self, n: usize, rng: &mut R) -> Vec<DVector<f64>> {
        let chi2 = self.chi_squared();
        let mut z = DVector::zeros(self.ndims);
        pflip(&self.weights(), n, rng)
            .into_iter()
            .map(|ix| {
                let mut x = DVector::zeros(self.ndims);
                self.draw_component(ix, chi2.as_ref(), rng, &mut z, &mut x);
                x
            })
            .collect()
    }
}

impl Support<DVector<f64>> for Mixture {
    fn supports(&self, x: &DVector<f64>) -> bool {
        x.len() == self.ndims && x.iter().all(|xi| xi.is_finite())
    }
}

impl ContinuousDistr<DVector<f64>> for Mixture {}

impl Mean<DVector<f64>> for Mixture {
    /// Undefined for an empty mixture and for ν ≤ 1
    fn mean(&self) -> Option<DVector<f64>> {
        if self.components.is_empty() || self.df <= 1.0 {
            None
        } else {
            let mean = self
                .components
                .iter()
                .fold(DVector::zeros(self.ndims), |acc, cpnt| {
                    acc + cpnt.weight * cpnt.mean()
                });
            Some(mean)
        }
    }
}

impl Variance<DMatrix<f64>> for Mixture {
    /// The covariance matrix. Undefined for an empty mixture and for ν ≤ 2.
    fn variance(&self) -> Option<DMatrix<f64>> {
        if self.df <= 2.0 {
            return None;
        }
        let mean = self.mean()?;
        let scale = if self.gaussian {
            1.0
        } else {
            self.df / (self.df - 2.0)
        };

        let second_moment = self.components.iter().fold(
            DMatrix::zeros(self.ndims, self.ndims),
            |acc, cpnt| {
                let mu = cpnt.mean();
                acc + cpnt.weight * (scale * cpnt.shape() + mu * mu.transpose())
            },
        );
        Some(second_moment - &mean * mean.transpose())
    }
}

impl MixtureDistr for Mixture {
    fn ndims(&self) -> usize {
        self.ndims
    }

    fn n_components(&self) -> usize {
        self.k()
    }

    fn evaluate(
        &self,
        x: &DMatrix<f64>,
        out: &mut DVector<f64>,
    ) -> Result<(), MixtureError> {
        Mixture::evaluate(self, x, out)
    }

    fn evaluate_components(
        &self,
        x: &DMatrix<f64>,
        out: &mut DMatrix<f64>,
    ) -> Result<(), MixtureError> {
        Mixture::evaluate_components(self, x, out)
    }

    fn draw_into(
        &self,
        rng: &mut dyn RngCore,
        out: &mut DMatrix<f64>,
    ) -> Result<(), MixtureError> {
        Mixture::draw_into(self, rng, out)
    }

    fn update_em(
        &mut self,
        x: &DMatrix<f64>,
        w: &DVector<f64>,
        damping: Damping,
    ) -> Result<(), MixtureError> {
        Mixture::update_em(self, x, w, damping)
    }

    fn clone_box(&self) -> Box<dyn MixtureDistr> {
        Box::new(self.clone())
    }
}

impl std::error::Error for MixtureError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Component(err) => Some(err),
            _ => None,
        }
    }
}

impl fmt::Display for MixtureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoComponents => write!(f, "the mixture has no components"),
            Self::ComponentDimensionMismatch {
                ix,
                ndims,
                expected,
            } => write!(
                f,
                "component {ix} has {ndims} dimensions, but the mixture has \
                {expected}"
            ),
            Self::DfTooLow { df } => {
                write!(f, "df ({df}) must be greater than zero")
            }
            Self::DfIsNan => write!(f, "df is NaN"),
            Self::ZeroTotalWeight => {
                write!(f, "component weights must not sum to zero")
            }
            Self::TotalWeightNotFinite { total } => {
                write!(f, "component weights sum to a non-finite value: {total}")
            }
            Self::SampleDimensionMismatch { ncols, ndims } => write!(
                f,
                "points have {ncols} columns, but the mixture has {ndims} \
                dimensions"
            ),
            Self::OutputShapeMismatch { expected, found } => write!(
                f,
                "output must have shape {expected:?}, but has shape {found:?}"
            ),
            Self::WeightsLengthMismatch {
                n_weights,
                n_samples,
            } => write!(
                f,
                "got {n_weights} sample weights for {n_samples} points"
            ),
            Self::Component(err) => write!(f, "component error: {err}"),
        }
    }
}
