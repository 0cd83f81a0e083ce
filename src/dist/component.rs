#[cfg(feature = "serde1")]
use serde::{Deserialize, Serialize};

use itertools::izip;
use nalgebra::{Cholesky, DMatrix, DVector};
use std::fmt;

use crate::impl_display;
use crate::misc::vec_to_string;
use crate::traits::Parameterized;

/// One weighted elliptical distribution in a
/// [`Mixture`](crate::dist::Mixture).
///
/// A component stores a location, μ, and a shape matrix, Σ. Whether it is a
/// Gaussian or a Student's T is decided by the degrees of freedom, ν, of the
/// mixture that owns it. For the Gaussian, Σ is the covariance matrix. For
/// the Student's T with ν > 2 the covariance is Σν/(ν - 2); for ν ≤ 2 the
/// variance is infinite, but the distribution is still valid.
///
/// Σ is kept as its lower Cholesky factor, L, along with the cached
/// √|Σ| = ∏ diag(L).
///
/// # Example
///
/// ```
/// use emix::dist::Component;
/// use nalgebra::{DMatrix, DVector};
///
/// let shape = DMatrix::from_row_slice(2, 2, &[4.0, 1.0, 1.0, 2.0]);
/// let mean = DVector::from_vec(vec![0.5, -0.5]);
/// let cpnt = Component::new(1.0, mean, shape.clone()).unwrap();
///
/// assert_eq!(cpnt.ndims(), 2);
/// assert!((cpnt.sqrt_det() - 7.0_f64.sqrt()).abs() < 1E-12);
/// assert!((cpnt.shape() - shape).amax() < 1E-12);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde1", serde(try_from = "ComponentParameters"))]
#[cfg_attr(feature = "serde1", serde(into = "ComponentParameters"))]
pub struct Component {
    /// Weight of this component in its mixture. May be edited directly, but
    /// the owning mixture must be re-normalized afterward.
    pub weight: f64,
    /// Location, μ
    mean: DVector<f64>,
    /// Lower Cholesky factor of the shape, Σ = LLᵀ
    shape_l: DMatrix<f64>,
    /// Cached √|Σ|
    sqrt_det: f64,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde1", serde(rename_all = "snake_case"))]
pub struct ComponentParameters {
    pub weight: f64,
    pub mean: DVector<f64>,
    pub shape: DMatrix<f64>,
}

impl TryFrom<ComponentParameters> for Component {
    type Error = ComponentError;

    fn try_from(params: ComponentParameters) -> Result<Self, Self::Error> {
        Component::new(params.weight, params.mean, params.shape)
    }
}

impl From<Component> for ComponentParameters {
    fn from(cpnt: Component) -> Self {
        cpnt.emit_params()
    }
}

impl Parameterized for Component {
    type Parameters = ComponentParameters;

    fn emit_params(&self) -> Self::Parameters {
        Self::Parameters {
            weight: self.weight,
            mean: self.mean.clone(),
            shape: self.shape(),
        }
    }

    fn from_params(params: Self::Parameters) -> Self {
        Self::new_unchecked(params.weight, params.mean, params.shape)
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde1", serde(rename_all = "snake_case"))]
pub enum ComponentError {
    /// The weight is less than zero
    WeightTooLow { weight: f64 },
    /// The weight is infinite or NaN
    WeightNotFinite { weight: f64 },
    /// The mean vector is empty, or no dimensions were requested
    ZeroDimensions,
    /// An entry of the mean vector is infinite or NaN
    MeanNotFinite { ix: usize, value: f64 },
    /// The shape matrix is not square
    ShapeNotSquare {
        /// number of rows
        nrows: usize,
        /// number of columns
        ncols: usize,
    },
    /// The dimensions of the mean vector and the shape matrix do not align
    MeanShapeDimensionMismatch {
        /// Number of dimensions in the mean vector
        n_mean: usize,
        /// Number of dimensions in the shape matrix
        n_shape: usize,
    },
    /// A projection asked for a dimension the component does not have
    DimensionOutOfRange { dim: usize, ndims: usize },
    /// A projection asked for the same dimension twice
    DuplicateDimension { dim: usize },
}

#[inline]
fn validate_weight(weight: f64) -> Result<(), ComponentError> {
    if !weight.is_finite() {
        Err(ComponentError::WeightNotFinite { weight })
    } else if weight < 0.0 {
        Err(ComponentError::WeightTooLow { weight })
    } else {
        Ok(())
    }
}

#[inline]
fn validate_mean(mean: &DVector<f64>) -> Result<(), ComponentError> {
    if mean.is_empty() {
        return Err(ComponentError::ZeroDimensions);
    }
    match mean.iter().position(|x| !x.is_finite()) {
        Some(ix) => Err(ComponentError::MeanNotFinite {
            ix,
            value: mean[ix],
        }),
        None => Ok(()),
    }
}

#[inline]
fn validate_shape(
    ndims: usize,
    shape: &DMatrix<f64>,
) -> Result<(), ComponentError> {
    if !shape.is_square() {
        Err(ComponentError::ShapeNotSquare {
            nrows: shape.nrows(),
            ncols: shape.ncols(),
        })
    } else if shape.nrows() != ndims {
        Err(ComponentError::MeanShapeDimensionMismatch {
            n_mean: ndims,
            n_shape: shape.nrows(),
        })
    } else {
        Ok(())
    }
}

/// Checks that `dims` is a non-empty list of distinct dimensions below `ndims`
pub(crate) fn validate_projection(
    dims: &[usize],
    ndims: usize,
) -> Result<(), ComponentError> {
    if dims.is_empty() {
        return Err(ComponentError::ZeroDimensions);
    }
    for (i, &dim) in dims.iter().enumerate() {
        if dim >= ndims {
            return Err(ComponentError::DimensionOutOfRange { dim, ndims });
        } else if dims[..i].contains(&dim) {
            return Err(ComponentError::DuplicateDimension { dim });
        }
    }
    Ok(())
}

/// Lower Cholesky factor of `shape` and the product of its diagonal.
///
/// Indefinite input is not rejected; the factor and determinant will contain
/// NaNs instead.
pub(crate) fn cholesky_factor(shape: DMatrix<f64>) -> (DMatrix<f64>, f64) {
    let shape_l = Cholesky::new_unchecked(shape).unpack();
    let sqrt_det: f64 = shape_l.diagonal().iter().product();
    (shape_l, sqrt_det)
}

impl Component {
    /// Create a new component
    ///
    /// # Arguments
    /// - weight: non-negative weight of the component in its mixture
    /// - mean: location vector, μ
    /// - shape: symmetric positive-definite shape matrix, Σ
    ///
    /// Only the dimensions of `shape` are checked. An indefinite shape
    /// produces a component with a garbage (NaN) determinant.
    pub fn new(
        weight: f64,
        mean: DVector<f64>,
        shape: DMatrix<f64>,
    ) -> Result<Self, ComponentError> {
        validate_weight(weight)?;
        validate_mean(&mean)?;
        validate_shape(mean.len(), &shape)?;
        Ok(Self::new_unchecked(weight, mean, shape))
    }

    /// Creates a new component without checking whether the parameters are
    /// valid.
    #[inline]
    #[must_use]
    pub fn new_unchecked(
        weight: f64,
        mean: DVector<f64>,
        shape: DMatrix<f64>,
    ) -> Self {
        let (shape_l, sqrt_det) = cholesky_factor(shape);
        Component {
            weight,
            mean,
            shape_l,
            sqrt_det,
        }
    }

    /// Unit-weight component with zero mean and identity shape
    ///
    /// # Example
    ///
    /// ```rust
    /// # use emix::dist::Component;
    /// let cpnt = Component::standard(3).unwrap();
    ///
    /// assert_eq!(cpnt.weight, 1.0);
    /// assert_eq!(cpnt.sqrt_det(), 1.0);
    /// assert!(Component::standard(0).is_err());
    /// ```
    pub fn standard(ndims: usize) -> Result<Self, ComponentError> {
        if ndims == 0 {
            Err(ComponentError::ZeroDimensions)
        } else {
            Ok(Component {
                weight: 1.0,
                mean: DVector::zeros(ndims),
                shape_l: DMatrix::identity(ndims, ndims),
                sqrt_det: 1.0,
            })
        }
    }

    /// Get the number of dimensions
    #[inline]
    pub fn ndims(&self) -> usize {
        self.mean.len()
    }

    /// Get a reference to the location, μ
    #[inline]
    pub fn mean(&self) -> &DVector<f64> {
        &self.mean
    }

    /// Set the location, μ
    ///
    /// # Example
    ///
    /// ```rust
    /// # use emix::dist::Component;
    /// use nalgebra::DVector;
    ///
    /// let mut cpnt = Component::standard(2).unwrap();
    /// assert!(cpnt.set_mean(DVector::from_vec(vec![1.0, 2.0])).is_ok());
    /// assert_eq!(cpnt.mean()[1], 2.0);
    ///
    /// // wrong number of dimensions
    /// assert!(cpnt.set_mean(DVector::from_vec(vec![1.0])).is_err());
    /// // not finite
    /// assert!(cpnt.set_mean(DVector::from_vec(vec![1.0, f64::NAN])).is_err());
    /// ```
    pub fn set_mean(&mut self, mean: DVector<f64>) -> Result<(), ComponentError> {
        if mean.len() != self.ndims() {
            Err(ComponentError::MeanShapeDimensionMismatch {
                n_mean: mean.len(),
                n_shape: self.ndims(),
            })
        } else {
            validate_mean(&mean)?;
            self.set_mean_unchecked(mean);
            Ok(())
        }
    }

    /// Set the location without input validation
    #[inline]
    pub fn set_mean_unchecked(&mut self, mean: DVector<f64>) {
        self.mean = mean;
    }

    /// The shape matrix, Σ, reconstructed from its Cholesky factor
    pub fn shape(&self) -> DMatrix<f64> {
        &self.shape_l * self.shape_l.transpose()
    }

    /// The lower Cholesky factor, L, of the shape matrix
    #[inline]
    pub fn shape_factor(&self) -> &DMatrix<f64> {
        &self.shape_l
    }

    /// Set the shape matrix, Σ, and update the cached determinant.
    ///
    /// Only the lower triangle of `shape` is read. Positive-definiteness is
    /// not checked.
    pub fn set_shape(&mut self, shape: DMatrix<f64>) -> Result<(), ComponentError> {
        validate_shape(self.ndims(), &shape)?;
        self.set_shape_unchecked(shape);
        Ok(())
    }

    /// Set the shape matrix without input validation
    #[inline]
    pub fn set_shape_unchecked(&mut self, shape: DMatrix<f64>) {
        let (shape_l, sqrt_det) = cholesky_factor(shape);
        self.set_factor_unchecked(shape_l, sqrt_det);
    }

    #[inline]
    pub(crate) fn set_factor_unchecked(
        &mut self,
        shape_l: DMatrix<f64>,
        sqrt_det: f64,
    ) {
        self.shape_l = shape_l;
        self.sqrt_det = sqrt_det;
    }

    /// √|Σ|, the product of the diagonal of the Cholesky factor
    #[inline]
    pub fn sqrt_det(&self) -> f64 {
        self.sqrt_det
    }

    /// Marginalize onto `dims`, in the given order.
    ///
    /// The marginal of an elliptical distribution is the sub-vector of μ and
    /// the sub-matrix of Σ for the kept dimensions.
    ///
    /// # Example
    ///
    /// ```rust
    /// # use emix::dist::Component;
    /// use nalgebra::{DMatrix, DVector};
    ///
    /// let mean = DVector::from_vec(vec![1.0, 2.0, 3.0]);
    /// let shape = DMatrix::from_diagonal(&DVector::from_vec(vec![4.0, 5.0, 6.0]));
    /// let cpnt = Component::new(0.3, mean, shape).unwrap();
    ///
    /// let yx = cpnt.project(&[2, 0]).unwrap();
    /// assert_eq!(yx.mean().as_slice(), &[3.0, 1.0]);
    /// assert!((yx.shape()[(0, 0)] - 6.0).abs() < 1E-12);
    /// assert!((yx.shape()[(1, 1)] - 4.0).abs() < 1E-12);
    ///
    /// assert!(cpnt.project(&[3]).is_err());
    /// assert!(cpnt.project(&[1, 1]).is_err());
    /// ```
    pub fn project(&self, dims: &[usize]) -> Result<Component, ComponentError> {
        validate_projection(dims, self.ndims())?;

        let n = dims.len();
        let shape = self.shape();
        let mean = DVector::from_iterator(n, dims.iter().map(|&d| self.mean[d]));
        let sub_shape = DMatrix::from_fn(n, n, |i, j| shape[(dims[i], dims[j])]);

        Ok(Component::new_unchecked(self.weight, mean, sub_shape))
    }

    /// Squared Mahalanobis distance, |L⁻¹(x - μ)|², of the point `x`.
    ///
    /// `ws` is scratch space of length `ndims`. `x` must yield exactly `ndims`
    /// values.
    pub(crate) fn mahalanobis_sq<'a, I>(
        &self,
        x: I,
        ws: &mut DVector<f64>,
    ) -> f64
    where
        I: IntoIterator<Item = &'a f64>,
    {
        izip!(ws.iter_mut(), x, self.mean.iter())
            .for_each(|(w, xi, mu)| *w = xi - mu);
        // false only for a singular factor, which is a precondition violation
        let _ = self.shape_l.solve_lower_triangular_mut(ws);
        ws.norm_squared()
    }
}

impl From<&Component> for String {
    fn from(cpnt: &Component) -> String {
        format!(
            "Component(w: {}, μ: {}, √|Σ|: {})",
            cpnt.weight,
            vec_to_string(cpnt.mean.as_slice(), 5),
            cpnt.sqrt_det
        )
    }
}

impl_display!(Component);

impl std::error::Error for ComponentError {}

impl fmt::Display for ComponentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WeightTooLow { weight } => {
                write!(f, "weight ({weight}) must not be negative")
            }
            Self::WeightNotFinite { weight } => {
                write!(f, "non-finite weight: {weight}")
            }
            Self::ZeroDimensions => {
                write!(f, "a component must have at least one dimension")
            }
            Self::MeanNotFinite { ix, value } => {
                write!(f, "non-finite mean entry at index {ix}: {value}")
            }
            Self::ShapeNotSquare { nrows, ncols } => write!(
                f,
                "shape matrix must be square, but has {nrows} rows and \
                {ncols} columns"
            ),
            Self::MeanShapeDimensionMismatch { n_mean, n_shape } => write!(
                f,
                "number of dimensions in the mean ({n_mean}) and shape \
                ({n_shape}) must match"
            ),
            Self::DimensionOutOfRange { dim, ndims } => write!(
                f,
                "cannot project onto dimension {dim} of a {ndims}-dimensional \
                component"
            ),
            Self::DuplicateDimension { dim } => {
                write!(f, "dimension {dim} requested more than once")
            }
        }
    }
}
