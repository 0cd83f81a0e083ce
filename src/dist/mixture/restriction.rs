use nalgebra::{DMatrix, DVector};

/// Constrains the form of the mean and shape produced by an EM step.
///
/// [`Mixture::update_em_restricted`](crate::dist::Mixture::update_em_restricted)
/// calls `restrict_mean` on each updated mean before the shape is estimated
/// about it, and `restrict_shape` on each undamped shape before damping. Both
/// default to leaving the value alone.
///
/// # Example
///
/// Keep every component axis-aligned and centered on the origin.
///
/// ```
/// use emix::dist::{DiagonalShape, FixedMean, UpdateRestriction};
/// use nalgebra::{DMatrix, DVector};
///
/// let restriction = (FixedMean::new(DVector::zeros(2)), DiagonalShape);
///
/// let mut mean = DVector::from_vec(vec![0.3, -0.1]);
/// let mut shape = DMatrix::from_row_slice(2, 2, &[1.0, 0.5, 0.5, 2.0]);
///
/// restriction.restrict_mean(&mut mean);
/// restriction.restrict_shape(&mut shape);
///
/// assert_eq!(mean, DVector::zeros(2));
/// assert_eq!(shape, DMatrix::from_row_slice(2, 2, &[1.0, 0.0, 0.0, 2.0]));
/// ```
pub trait UpdateRestriction {
    /// Modify an updated mean in place
    fn restrict_mean(&self, _mean: &mut DVector<f64>) {}

    /// Modify an updated, undamped shape matrix in place
    fn restrict_shape(&self, _shape: &mut DMatrix<f64>) {}
}

/// Leaves updates unchanged
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoRestriction;

impl UpdateRestriction for NoRestriction {}

/// Pins every component to the same mean
#[derive(Debug, Clone, PartialEq)]
pub struct FixedMean {
    mean: DVector<f64>,
}

impl FixedMean {
    #[inline]
    pub fn new(mean: DVector<f64>) -> Self {
        FixedMean { mean }
    }

    #[inline]
    pub fn mean(&self) -> &DVector<f64> {
        &self.mean
    }
}

impl UpdateRestriction for FixedMean {
    /// # Panics
    ///
    /// If `mean` does not have the same length as the fixed mean
    fn restrict_mean(&self, mean: &mut DVector<f64>) {
        mean.copy_from(&self.mean);
    }
}

/// Zeroes the off-diagonal of every shape matrix so that components stay
/// aligned with the coordinate axes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiagonalShape;

impl UpdateRestriction for DiagonalShape {
    fn restrict_shape(&self, shape: &mut DMatrix<f64>) {
        shape.fill_lower_triangle(0.0, 1);
        shape.fill_upper_triangle(0.0, 1);
    }
}

/// Applies `self.0`, then `self.1`
impl<A, B> UpdateRestriction for (A, B)
where
    A: UpdateRestriction,
    B: UpdateRestriction,
{
    fn restrict_mean(&self, mean: &mut DVector<f64>) {
        self.0.restrict_mean(mean);
        self.1.restrict_mean(mean);
    }

    fn restrict_shape(&self, shape: &mut DMatrix<f64>) {
        self.0.restrict_shape(shape);
        self.1.restrict_shape(shape);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_restriction_is_identity() {
        let mut mean = DVector::from_vec(vec![1.0, 2.0]);
        let mut shape = DMatrix::from_row_slice(2, 2, &[2.0, 0.3, 0.3, 1.0]);
        NoRestriction.restrict_mean(&mut mean);
        NoRestriction.restrict_shape(&mut shape);

        assert_eq!(mean, DVector::from_vec(vec![1.0, 2.0]));
        assert_eq!(shape, DMatrix::from_row_slice(2, 2, &[2.0, 0.3, 0.3, 1.0]));
    }

    #[test]
    fn fixed_mean_only_touches_mean() {
        let restriction = FixedMean::new(DVector::from_vec(vec![-1.0, 4.0]));
        let mut mean = DVector::from_vec(vec![1.0, 2.0]);
        let mut shape = DMatrix::from_row_slice(2, 2, &[2.0, 0.3, 0.3, 1.0]);
        restriction.restrict_mean(&mut mean);
        restriction.restrict_shape(&mut shape);

        assert_eq!(&mean, restriction.mean());
        assert_eq!(shape[(0, 1)], 0.3);
    }

    #[test]
    #[should_panic]
    fn fixed_mean_panics_on_wrong_dimension() {
        let restriction = FixedMean::new(DVector::zeros(3));
        let mut mean = DVector::zeros(2);
        restriction.restrict_mean(&mut mean);
    }

    #[test]
    fn diagonal_shape_keeps_diagonal() {
        let mut shape = DMatrix::from_row_slice(
            3,
            3,
            &[3.0, 0.1, 0.2, 0.1, 2.0, 0.4, 0.2, 0.4, 1.0],
        );
        DiagonalShape.restrict_shape(&mut shape);
        let expected =
            DMatrix::from_diagonal(&DVector::from_vec(vec![3.0, 2.0, 1.0]));
        assert_eq!(shape, expected);
    }

    #[test]
    fn pair_applies_in_order() {
        let first = FixedMean::new(DVector::from_vec(vec![1.0]));
        let second = FixedMean::new(DVector::from_vec(vec![2.0]));
        let mut mean = DVector::zeros(1);
        (first, second).restrict_mean(&mut mean);
        assert_eq!(mean[0], 2.0);
    }
}
