//! Dense linear algebra for the β update.
//!
//! Observation-level work (n rows) happens on `ndarray` views; the K×K system is handed to
//! `nalgebra` for the Cholesky factorization and triangular solves.

use nalgebra::{Cholesky, DMatrix, DVector};
use ndarray::{ArrayView1, ArrayView2};
use rayon::prelude::*;
use std::ops::Range;

/// Rows per reduction block. Fixed so that partial sums, and therefore the rounding of the
/// combined result, do not depend on the number of worker threads.
pub(crate) const BLOCK_ROWS: usize = 256;

/// Map `0..n` in fixed blocks of [`BLOCK_ROWS`] on the current rayon pool.
///
/// Partials come back in block order; callers fold them sequentially.
pub(crate) fn blocked_partials<T, F>(n: usize, map: F) -> Vec<T>
where
    T: Send,
    F: Fn(Range<usize>) -> T + Sync + Send,
{
    (0..n.div_ceil(BLOCK_ROWS))
        .into_par_iter()
        .map(|block| {
            let start = block * BLOCK_ROWS;
            map(start..(start + BLOCK_ROWS).min(n))
        })
        .collect()
}

/// Weighted normal equations \( \sum_i w_i x_i x_i^\top \) and \( \sum_i w_i x_i r_i \).
///
/// Only the lower triangle of `lhs` is accumulated; [`NormalEquations::into_posterior`]
/// mirrors it before the prior is added.
#[derive(Debug, Clone)]
pub(crate) struct NormalEquations {
    lhs: DMatrix<f64>,
    rhs: DVector<f64>,
}

impl NormalEquations {
    pub(crate) fn zeros(k: usize) -> Self {
        Self {
            lhs: DMatrix::zeros(k, k),
            rhs: DVector::zeros(k),
        }
    }

    #[inline]
    pub(crate) fn add_row(&mut self, row: ArrayView1<'_, f64>, weight: f64, response: f64) {
        for (j, &xj) in row.iter().enumerate() {
            let wxj = weight * xj;
            self.rhs[j] += wxj * response;
            for (l, &xl) in row.iter().take(j + 1).enumerate() {
                self.lhs[(j, l)] += wxj * xl;
            }
        }
    }

    pub(crate) fn merge(&mut self, other: &Self) {
        self.lhs += &other.lhs;
        self.rhs += &other.rhs;
    }

    /// Add the prior precision `P` and `P β̄`, returning the posterior precision and the
    /// right-hand side of \( A \hat\beta = b \).
    pub(crate) fn into_posterior(
        mut self,
        prior_precision: &DMatrix<f64>,
        prior_precision_mean: &DVector<f64>,
    ) -> (DMatrix<f64>, DVector<f64>) {
        let k = self.lhs.nrows();
        for j in 0..k {
            for l in 0..j {
                self.lhs[(l, j)] = self.lhs[(j, l)];
            }
        }
        (
            self.lhs + prior_precision,
            self.rhs + prior_precision_mean,
        )
    }
}

/// Draw from \( N(A^{-1} b, A^{-1}) \) given the precision `A`, `b`, and standard-normal noise.
///
/// With \( A = L L^\top \) the draw is \( A^{-1} b + L^{-\top} z \). Returns `None` if `A` is
/// not numerically positive-definite.
pub(crate) fn draw_gaussian_from_precision(
    precision: DMatrix<f64>,
    rhs: &DVector<f64>,
    noise: &DVector<f64>,
) -> Option<DVector<f64>> {
    let chol = Cholesky::new(precision)?;
    let mean = chol.solve(rhs);
    let offset = chol.l().transpose().solve_upper_triangular(noise)?;
    Some(mean + offset)
}

/// Inverse of a symmetric positive-definite matrix, `None` if the factorization fails.
pub(crate) fn spd_inverse(matrix: DMatrix<f64>) -> Option<DMatrix<f64>> {
    Cholesky::new(matrix).map(|chol| chol.inverse())
}

pub(crate) fn is_symmetric(matrix: &DMatrix<f64>) -> bool {
    let tol = 1e-10 * matrix.amax().max(1.0);
    (matrix - matrix.transpose()).amax() <= tol
}

pub(crate) fn to_dmatrix(a: ArrayView2<'_, f64>) -> DMatrix<f64> {
    DMatrix::from_fn(a.nrows(), a.ncols(), |i, j| a[[i, j]])
}

pub(crate) fn to_dvector(a: ArrayView1<'_, f64>) -> DVector<f64> {
    DVector::from_iterator(a.len(), a.iter().copied())
}

#[inline]
pub(crate) fn row_dot(row: ArrayView1<'_, f64>, beta: &DVector<f64>) -> f64 {
    row.iter().zip(beta.iter()).map(|(xij, bj)| xij * bj).sum()
}
