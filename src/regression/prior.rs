//! Observed data and prior hyperparameters, both immutable for the duration of a fit.

use crate::error::{BqregError, check_range};
use crate::linalg::{is_symmetric, row_dot, spd_inverse, to_dmatrix, to_dvector};
use nalgebra::{DMatrix, DVector};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};

/// Response vector `y` (length n) and design matrix `x` (n × K).
#[derive(Debug, Clone)]
pub struct Dataset {
    y: Array1<f64>,
    x: Array2<f64>,
}

impl Dataset {
    /// Validate and take ownership of the data.
    ///
    /// # Errors
    /// - [`BqregError::Shape`] if `x` has no columns, no rows, or a row count different from `y`
    /// - [`BqregError::Value`] if any entry is NaN or infinite
    pub fn new(y: Array1<f64>, x: Array2<f64>) -> Result<Self, BqregError> {
        if x.nrows() != y.len() {
            return Err(BqregError::Shape {
                what: "rows of x",
                expected: y.len(),
                got: x.nrows(),
            });
        }
        if y.is_empty() {
            return Err(BqregError::Shape {
                what: "observations",
                expected: 1,
                got: 0,
            });
        }
        if x.ncols() == 0 {
            return Err(BqregError::Shape {
                what: "predictors",
                expected: 1,
                got: 0,
            });
        }
        if !y.iter().chain(x.iter()).all(|v| v.is_finite()) {
            return Err(BqregError::Value("data contains NaN or infinite entries".into()));
        }
        // Row access in the sweep assumes a contiguous row-major layout
        let x = x.as_standard_layout().into_owned();
        Ok(Self { y, x })
    }

    /// Number of observations n.
    pub fn n_obs(&self) -> usize {
        self.y.len()
    }

    /// Number of predictors K.
    pub fn n_predictors(&self) -> usize {
        self.x.ncols()
    }

    pub fn y(&self) -> ArrayView1<'_, f64> {
        self.y.view()
    }

    pub fn x(&self) -> ArrayView2<'_, f64> {
        self.x.view()
    }

    /// Residual \( y_i - x_i^\top \beta \).
    #[inline]
    pub(crate) fn residual(&self, i: usize, beta: &DVector<f64>) -> f64 {
        self.y[i] - row_dot(self.x.row(i), beta)
    }
}

/// Conjugate prior for the quantile regression:
/// - \( \beta \sim N(\bar\beta, V) \), where `V` is the prior **covariance**
/// - \( \sigma^2 \sim \mathrm{InvGamma}(n_0, s_0) \)
///
/// The precision \( P = V^{-1} \) and \( P\bar\beta \) are computed once here and reused by
/// every β draw.
#[derive(Debug, Clone)]
pub struct PriorSpec {
    beta_mean: DVector<f64>,
    precision: DMatrix<f64>,
    precision_mean: DVector<f64>,
    shape: f64,
    scale: f64,
}

impl PriorSpec {
    /// Build a prior from the mean and covariance of β and the inverse-gamma shape/scale of σ².
    ///
    /// # Errors
    /// - [`BqregError::Value`] if `beta_cov` is not square, not symmetric, not positive-definite,
    ///   has non-finite entries, or its order differs from the length of `beta_mean`
    /// - [`BqregError::Range`] if `shape` or `scale` is not a positive finite number
    ///
    /// # Example
    /// ```
    /// use ndarray::{array, Array2};
    /// use bqreg::regression::PriorSpec;
    ///
    /// let prior = PriorSpec::new(array![0.0, 0.0], Array2::eye(2) * 10.0, 3.0, 3.0).unwrap();
    /// assert_eq!(prior.n_predictors(), 2);
    /// assert!(PriorSpec::new(array![0.0], Array2::zeros((1, 2)), 3.0, 3.0).is_err());
    /// ```
    pub fn new(
        beta_mean: Array1<f64>,
        beta_cov: Array2<f64>,
        shape: f64,
        scale: f64,
    ) -> Result<Self, BqregError> {
        check_range("prior shape", shape, "(0, inf)", shape > 0.0 && shape.is_finite())?;
        check_range("prior scale", scale, "(0, inf)", scale > 0.0 && scale.is_finite())?;

        if beta_cov.nrows() != beta_cov.ncols() {
            return Err(BqregError::Value(format!(
                "prior covariance must be square, got {}x{}",
                beta_cov.nrows(),
                beta_cov.ncols()
            )));
        }
        if beta_cov.nrows() != beta_mean.len() {
            return Err(BqregError::Value(format!(
                "prior covariance is {0}x{0} but the prior mean has length {1}",
                beta_cov.nrows(),
                beta_mean.len()
            )));
        }
        if beta_mean.is_empty() {
            return Err(BqregError::Value("prior must cover at least one coefficient".into()));
        }
        if !beta_mean.iter().chain(beta_cov.iter()).all(|v| v.is_finite()) {
            return Err(BqregError::Value("prior contains NaN or infinite entries".into()));
        }

        let cov = to_dmatrix(beta_cov.view());
        if !is_symmetric(&cov) {
            return Err(BqregError::Value("prior covariance is not symmetric".into()));
        }
        let precision = spd_inverse(cov).ok_or_else(|| {
            BqregError::Value("prior covariance is not positive-definite".into())
        })?;
        let beta_mean = to_dvector(beta_mean.view());
        let precision_mean = &precision * &beta_mean;

        Ok(Self {
            beta_mean,
            precision,
            precision_mean,
            shape,
            scale,
        })
    }

    /// Independent \( N(0, \text{variance}) \) priors on all `k` coefficients.
    ///
    /// # Errors
    /// As [`PriorSpec::new`]; a non-positive `variance` is reported as not positive-definite.
    pub fn isotropic(k: usize, variance: f64, shape: f64, scale: f64) -> Result<Self, BqregError> {
        Self::new(Array1::zeros(k), Array2::eye(k) * variance, shape, scale)
    }

    /// Number of coefficients K covered by the prior.
    pub fn n_predictors(&self) -> usize {
        self.beta_mean.len()
    }

    /// Prior mean of β.
    pub fn beta_mean(&self) -> &[f64] {
        self.beta_mean.as_slice()
    }

    /// Prior shape n₀ of σ².
    pub fn shape(&self) -> f64 {
        self.shape
    }

    /// Prior scale s₀ of σ².
    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub(crate) fn precision(&self) -> &DMatrix<f64> {
        &self.precision
    }

    pub(crate) fn precision_mean(&self) -> &DVector<f64> {
        &self.precision_mean
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::{ShapeBuilder, array};

    #[test]
    fn dataset_rejects_mismatched_rows() {
        let err = Dataset::new(array![1.0, 2.0], Array2::zeros((3, 2))).unwrap_err();
        assert!(matches!(
            err,
            BqregError::Shape {
                expected: 2,
                got: 3,
                ..
            }
        ));
    }

    #[test]
    fn dataset_rejects_non_finite() {
        let err = Dataset::new(array![1.0, f64::NAN], Array2::ones((2, 1))).unwrap_err();
        assert!(matches!(err, BqregError::Value(_)));
    }

    #[test]
    fn dataset_accepts_column_major_input() {
        let x = Array2::from_shape_vec((2, 2).f(), vec![1.0, 1.0, 2.0, 3.0]).unwrap();
        let data = Dataset::new(array![1.0, 2.0], x).unwrap();
        let beta = DVector::from_vec(vec![0.5, 1.0]);
        assert_relative_eq!(data.residual(1, &beta), 2.0 - 0.5 - 3.0);
    }

    #[test]
    fn prior_stores_precision() {
        let prior =
            PriorSpec::new(array![1.0, -2.0], array![[2.0, 0.0], [0.0, 4.0]], 1.0, 1.0).unwrap();
        assert_relative_eq!(prior.precision()[(0, 0)], 0.5);
        assert_relative_eq!(prior.precision()[(1, 1)], 0.25);
        assert_relative_eq!(prior.precision_mean()[0], 0.5);
        assert_relative_eq!(prior.precision_mean()[1], -0.5);
    }

    #[test]
    fn prior_validation() {
        let mean = array![0.0, 0.0];
        assert!(matches!(
            PriorSpec::new(mean.clone(), Array2::eye(2), 0.0, 1.0),
            Err(BqregError::Range { .. })
        ));
        assert!(matches!(
            PriorSpec::new(mean.clone(), Array2::eye(2), 1.0, -1.0),
            Err(BqregError::Range { .. })
        ));
        assert!(matches!(
            PriorSpec::new(mean.clone(), Array2::eye(3), 1.0, 1.0),
            Err(BqregError::Value(_))
        ));
        assert!(matches!(
            PriorSpec::new(mean.clone(), array![[1.0, 2.0], [2.0, 1.0]], 1.0, 1.0),
            Err(BqregError::Value(_))
        ));
        assert!(matches!(
            PriorSpec::new(mean, array![[1.0, 0.2], [0.0, 1.0]], 1.0, 1.0),
            Err(BqregError::Value(_))
        ));
    }
}
