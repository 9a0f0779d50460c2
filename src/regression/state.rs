//! Current position of the chain and the draws retained from it.

use nalgebra::DVector;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis, s};

/// Current values of β, σ² and the latent scales ν.
///
/// Owned by the driver; the Gibbs engine updates it in place once per sweep.
#[derive(Debug, Clone, PartialEq)]
pub struct PosteriorState {
    pub(crate) beta: DVector<f64>,
    pub(crate) nu: Vec<f64>,
    pub(crate) sigma_sq: f64,
}

impl PosteriorState {
    /// Starting point: β = β₀ (or 0), ν = 1, σ² = `sigma_sq`.
    pub(crate) fn initial(
        n_obs: usize,
        n_predictors: usize,
        beta: Option<&DVector<f64>>,
        sigma_sq: f64,
    ) -> Self {
        Self {
            beta: beta
                .cloned()
                .unwrap_or_else(|| DVector::zeros(n_predictors)),
            nu: vec![1.0; n_obs],
            sigma_sq,
        }
    }

    pub(crate) fn fits(&self, n_obs: usize, n_predictors: usize) -> bool {
        self.nu.len() == n_obs && self.beta.len() == n_predictors
    }

    /// Regression coefficients β.
    pub fn beta(&self) -> &[f64] {
        self.beta.as_slice()
    }

    /// Latent scales ν, one per observation.
    pub fn nu(&self) -> &[f64] {
        &self.nu
    }

    /// Scale parameter σ².
    pub fn sigma_sq(&self) -> f64 {
        self.sigma_sq
    }
}

/// Draws retained during the sampling phase, stored column-wise.
///
/// Column `d` of [`beta_draws`](Self::beta_draws) and [`nu_draws`](Self::nu_draws) and entry
/// `d` of [`sigma_draws`](Self::sigma_draws) belong to the same retained sweep.
#[derive(Debug, Clone)]
pub struct DrawHistory {
    beta: Array2<f64>,
    nu: Array2<f64>,
    sigma_sq: Array1<f64>,
    len: usize,
}

impl DrawHistory {
    pub(crate) fn new() -> Self {
        Self {
            beta: Array2::zeros((0, 0)),
            nu: Array2::zeros((0, 0)),
            sigma_sq: Array1::zeros(0),
            len: 0,
        }
    }

    /// Drop all draws and make room for `capacity` new ones.
    pub(crate) fn reserve(&mut self, n_predictors: usize, n_obs: usize, capacity: usize) {
        self.beta = Array2::zeros((n_predictors, capacity));
        self.nu = Array2::zeros((n_obs, capacity));
        self.sigma_sq = Array1::zeros(capacity);
        self.len = 0;
    }

    pub(crate) fn push(&mut self, state: &PosteriorState) {
        debug_assert!(self.len < self.sigma_sq.len(), "draw history is full");
        let d = self.len;
        self.beta
            .column_mut(d)
            .iter_mut()
            .zip(state.beta.iter())
            .for_each(|(dst, &src)| *dst = src);
        self.nu
            .column_mut(d)
            .iter_mut()
            .zip(&state.nu)
            .for_each(|(dst, &src)| *dst = src);
        self.sigma_sq[d] = state.sigma_sq;
        self.len += 1;
    }

    pub(crate) fn clear(&mut self) {
        *self = Self::new();
    }

    /// Number of retained draws m.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// β draws, shape `(K, m)`.
    pub fn beta_draws(&self) -> ArrayView2<'_, f64> {
        self.beta.slice(s![.., ..self.len])
    }

    /// ν draws, shape `(n, m)`.
    pub fn nu_draws(&self) -> ArrayView2<'_, f64> {
        self.nu.slice(s![.., ..self.len])
    }

    /// σ² draws, length `m`.
    pub fn sigma_draws(&self) -> ArrayView1<'_, f64> {
        self.sigma_sq.slice(s![..self.len])
    }

    /// Latent scales standardized by their draw's σ², \( z_i = \nu_i / \sigma^2 \), shape `(n, m)`.
    ///
    /// Marginally each z_i is a unit-rate exponential.
    pub fn z_draws(&self) -> Array2<f64> {
        let mut z = self.nu_draws().to_owned();
        for (mut column, &sigma_sq) in z.axis_iter_mut(Axis(1)).zip(self.sigma_draws()) {
            column /= sigma_sq;
        }
        z
    }

    /// Get the posterior samples for a specific coefficient
    pub fn beta_samples(&self, param_idx: usize) -> Option<Vec<f64>> {
        if param_idx >= self.beta.nrows() {
            return None;
        }
        Some(self.beta_draws().row(param_idx).to_vec())
    }

    /// Posterior means of the coefficients; empty if no draws were retained.
    pub fn posterior_means(&self) -> Vec<f64> {
        self.beta_draws()
            .mean_axis(Axis(1))
            .map(|m| m.to_vec())
            .unwrap_or_default()
    }

    /// Posterior standard deviations of the coefficients (sample standard deviation).
    ///
    /// NaN for every coefficient when fewer than two draws were retained.
    pub fn posterior_sds(&self) -> Vec<f64> {
        if self.len < 2 {
            return vec![f64::NAN; self.beta.nrows()];
        }
        self.beta_draws().std_axis(Axis(1), 1.0).to_vec()
    }

    /// Posterior mean of σ², NaN when no draws were retained.
    pub fn posterior_mean_sigma(&self) -> f64 {
        self.sigma_draws().mean().unwrap_or(f64::NAN)
    }

    /// Print a summary of the retained draws
    pub fn summary(&self) {
        println!("Bayesian Quantile Regression Results ({} draws)", self.len);
        println!("================================");
        println!("{:<10} {:<15} {:<15}", "Parameter", "Mean", "Std. Dev.");
        println!("{}", "-".repeat(40));

        for (i, (mean, sd)) in self
            .posterior_means()
            .iter()
            .zip(&self.posterior_sds())
            .enumerate()
        {
            println!("{:<10} {:<15.4} {:<15.4}", format!("β{}", i), mean, sd);
        }
        println!(
            "{:<10} {:<15.4} {:<15}",
            "σ²",
            self.posterior_mean_sigma(),
            "-"
        );
    }
}

impl Default for DrawHistory {
    fn default() -> Self {
        Self::new()
    }
}
