#[cfg(feature = "serde1")]
use serde::{Deserialize, Serialize};

use itertools::izip;
use log::debug;
use nalgebra::{DMatrix, DVector};
use std::fmt;

use super::{Mixture, MixtureError, NoRestriction, UpdateRestriction};
use crate::dist::component::cholesky_factor;
use crate::dist::Component;
use crate::misc::vec_to_string;

/// Limits how quickly the shape of a component may collapse during EM.
///
/// After the undamped shape, Σ₁, of a component is estimated, the ratio of
/// determinants r = |Σ₁| / |Σ₀| against the previous shape decides the
/// step size, α:
///
/// - α = 1 if r ≥ τ₁
/// - α = τ₂ + (1 - τ₂)(r / τ₁)² if 0 < r < τ₁
/// - α = τ₂ if r ≤ 0 or r is NaN
///
/// and the committed shape is αΣ₁ + (1 - α)Σ₀. The default, τ₁ = 0 and
/// τ₂ = 0.5, takes every step with r ≥ 0 in full. That includes a singular
/// update (r = 0), e.g. a one-dimensional component that claims a single
/// point collapses to zero variance. Only indefinite or NaN ratios are
/// damped. Use τ₁ > 0 to guard against collapse.
///
/// # Example
///
/// ```
/// use emix::dist::Damping;
///
/// let damping = Damping::new(1.0, 0.2).unwrap();
///
/// assert_eq!(damping.alpha(2.0), 1.0);
/// assert!((damping.alpha(0.5) - 0.4).abs() < 1E-12);
/// assert_eq!(damping.alpha(f64::NAN), 0.2);
///
/// assert!(Damping::new(1.0, 1.5).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde1", serde(try_from = "DampingParameters"))]
#[cfg_attr(feature = "serde1", serde(into = "DampingParameters"))]
pub struct Damping {
    /// Determinant ratio at and above which a step is taken in full
    tau1: f64,
    /// Smallest step size
    tau2: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde1", serde(rename_all = "snake_case"))]
pub struct DampingParameters {
    pub tau1: f64,
    pub tau2: f64,
}

impl TryFrom<DampingParameters> for Damping {
    type Error = DampingError;

    fn try_from(params: DampingParameters) -> Result<Self, Self::Error> {
        Damping::new(params.tau1, params.tau2)
    }
}

impl From<Damping> for DampingParameters {
    fn from(damping: Damping) -> Self {
        DampingParameters {
            tau1: damping.tau1,
            tau2: damping.tau2,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde1", serde(rename_all = "snake_case"))]
pub enum DampingError {
    /// τ₁ is infinite or NaN
    Tau1NotFinite { tau1: f64 },
    /// τ₂ is outside [0, 1]
    Tau2OutOfRange { tau2: f64 },
}

impl Damping {
    /// Create a new damping schedule
    pub fn new(tau1: f64, tau2: f64) -> Result<Self, DampingError> {
        if !tau1.is_finite() {
            Err(DampingError::Tau1NotFinite { tau1 })
        } else if !(0.0..=1.0).contains(&tau2) {
            Err(DampingError::Tau2OutOfRange { tau2 })
        } else {
            Ok(Damping { tau1, tau2 })
        }
    }

    /// Creates a new damping schedule without checking the parameters
    #[inline]
    pub fn new_unchecked(tau1: f64, tau2: f64) -> Self {
        Damping { tau1, tau2 }
    }

    /// Every step is taken in full, even those with an indefinite shape
    #[inline]
    pub fn undamped() -> Self {
        Damping {
            tau1: 0.0,
            tau2: 1.0,
        }
    }

    #[inline]
    pub fn tau1(&self) -> f64 {
        self.tau1
    }

    #[inline]
    pub fn tau2(&self) -> f64 {
        self.tau2
    }

    /// Step size for a determinant ratio of `r`
    pub fn alpha(&self, r: f64) -> f64 {
        if r >= self.tau1 {
            1.0
        } else if r > 0.0 {
            let t = r / self.tau1;
            self.tau2 + (1.0 - self.tau2) * t * t
        } else {
            self.tau2
        }
    }
}

impl Default for Damping {
    fn default() -> Self {
        Damping {
            tau1: 0.0,
            tau2: 0.5,
        }
    }
}

impl Mixture {
    /// Run one Expectation-Maximization step against the points in the rows
    /// of `x`, each carrying the matching weight in `w`.
    ///
    /// For Student's T mixtures this is the ECM step with ν held fixed. The
    /// weights are re-normalized afterward. A component with no
    /// responsibility for any point keeps its mean and shape and gets weight
    /// zero; use [`clip`](Mixture::clip) to remove it.
    ///
    /// # Example
    ///
    /// ```
    /// use emix::prelude::*;
    /// use nalgebra::{DMatrix, DVector};
    ///
    /// let mut mm = Mixture::gaussian(vec![Component::standard(1).unwrap()]).unwrap();
    ///
    /// let xs = DMatrix::from_row_slice(3, 1, &[1.0, 2.0, 4.0]);
    /// let ws = DVector::from_vec(vec![1.0, 1.0, 2.0]);
    /// mm.update_em(&xs, &ws, Damping::default()).unwrap();
    ///
    /// // weighted mean
    /// assert!((mm[0].mean()[0] - 2.75).abs() < 1E-12);
    /// // weighted variance about the new mean
    /// assert!((mm[0].shape()[(0, 0)] - 1.6875).abs() < 1E-12);
    /// ```
    pub fn update_em(
        &mut self,
        x: &DMatrix<f64>,
        w: &DVector<f64>,
        damping: Damping,
    ) -> Result<(), MixtureError> {
        self.update_em_restricted(x, Some(w), &NoRestriction, damping)
    }

    /// Run one Expectation-Maximization step with every point weighted
    /// equally
    pub fn update_em_unweighted(
        &mut self,
        x: &DMatrix<f64>,
        damping: Damping,
    ) -> Result<(), MixtureError> {
        self.update_em_restricted(x, None, &NoRestriction, damping)
    }

    /// Run one Expectation-Maximization step, passing each updated mean and
    /// shape through `restriction` before it is committed
    pub fn update_em_restricted<U>(
        &mut self,
        x: &DMatrix<f64>,
        w: Option<&DVector<f64>>,
        restriction: &U,
        damping: Damping,
    ) -> Result<(), MixtureError>
    where
        U: UpdateRestriction + ?Sized,
    {
        if self.components.is_empty() {
            return Err(MixtureError::NoComponents);
        }
        if let Some(w) = w {
            if w.len() != x.nrows() {
                return Err(MixtureError::WeightsLengthMismatch {
                    n_weights: w.len(),
                    n_samples: x.nrows(),
                });
            }
        }

        let mut p = self.responsibilities(x)?;
        if let Some(w) = w {
            p.row_iter_mut()
                .zip(w.iter())
                .for_each(|(mut row, &wi)| row *= wi);
        }

        // nothing is written until the step is known to leave a valid mixture
        let totals: Vec<f64> = p.column_iter().map(|col| col.sum()).collect();
        let claimed: f64 = totals
            .iter()
            .filter(|&&weight| weight > 0.0 && weight.is_finite())
            .sum();
        if !claimed.is_finite() {
            return Err(MixtureError::TotalWeightNotFinite { total: claimed });
        } else if claimed <= 0.0 {
            debug!("update_em: no component claims any of {} points", x.nrows());
            return Err(MixtureError::ZeroTotalWeight);
        }

        let ndims = self.ndims;
        let df = self.df;
        let gaussian = self.gaussian;
        let mut ws = DVector::zeros(ndims);
        // responsibility times the latent precision scale of each point
        let mut u = DVector::zeros(x.nrows());

        for (k, (cpnt, &weight)) in
            self.components.iter_mut().zip(totals.iter()).enumerate()
        {
            if !(weight > 0.0 && weight.is_finite()) {
                debug!(
                    "update_em: component {k} has total responsibility \
                    {weight}; keeping its mean and shape"
                );
                cpnt.weight = 0.0;
                continue;
            }

            for (i, ui) in u.iter_mut().enumerate() {
                let pik = p[(i, k)];
                *ui = if gaussian || pik == 0.0 {
                    pik
                } else {
                    let z = cpnt.mahalanobis_sq(x.row(i).iter(), &mut ws);
                    pik * (df + ndims as f64) / (df + z)
                };
            }

            let mut mean = x.tr_mul(&u) / u.sum();
            restriction.restrict_mean(&mut mean);

            let mut shape = DMatrix::zeros(ndims, ndims);
            for (i, &ui) in u.iter().enumerate() {
                if ui == 0.0 {
                    continue;
                }
                izip!(ws.iter_mut(), x.row(i).iter(), mean.iter())
                    .for_each(|(d, xi, mu)| *d = xi - mu);
                shape.ger(ui, &ws, &ws, 1.0);
            }
            shape /= weight;
            restriction.restrict_shape(&mut shape);

            cpnt.weight = weight;
            cpnt.set_mean_unchecked(mean);
            commit_shape(k, cpnt, shape, &damping);
        }

        self.normalize()?;
        debug!(
            "update_em: n = {}, weights = {}",
            x.nrows(),
            vec_to_string(&self.weights(), 10)
        );
        Ok(())
    }
}

/// Blend the undamped `shape` with the current shape of `cpnt` and store it
fn commit_shape(
    k: usize,
    cpnt: &mut Component,
    shape: DMatrix<f64>,
    damping: &Damping,
) {
    if shape.iter().any(|s| !s.is_finite()) {
        debug!("update_em: component {k} has a non-finite shape; keeping the old one");
        return;
    }

    let (shape_l, sqrt_det) = cholesky_factor(shape.clone());
    let ratio = sqrt_det / cpnt.sqrt_det();
    let r = ratio * ratio;
    let alpha = damping.alpha(r);

    if alpha >= 1.0 {
        cpnt.set_factor_unchecked(shape_l, sqrt_det);
    } else {
        debug!("update_em: damping component {k} with α = {alpha:.4} (r = {r:.4e})");
        let damped = alpha * shape + (1.0 - alpha) * cpnt.shape();
        cpnt.set_shape_unchecked(damped);
    }
}

impl std::error::Error for DampingError {}

impl fmt::Display for DampingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tau1NotFinite { tau1 } => write!(f, "non-finite tau1: {tau1}"),
            Self::Tau2OutOfRange { tau2 } => {
                write!(f, "tau2 ({tau2}) must be in [0, 1]")
            }
        }
    }
}
