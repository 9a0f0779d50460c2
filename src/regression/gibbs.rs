//! One sweep of the augmented Gibbs sampler.
//!
//! # Model
//! - \( y_i = x_i^\top\beta + \theta_1 \nu_i + \theta_2 \sqrt{\sigma^2 \nu_i}\, \varepsilon_i \),
//!   \( \varepsilon_i \sim N(0, 1) \)
//! - \( \nu_i \mid \sigma^2 \sim \mathrm{Exp}(\text{rate } 1/\sigma^2) \)
//! - \( \beta \sim N(\bar\beta, P^{-1}) \), \( \sigma^2 \sim \mathrm{InvGamma}(n_0, s_0) \)
//!
//! # Full conditionals
//! \[
//!   \beta \mid \nu, \sigma^2 \sim N\left(A^{-1} b,\ A^{-1}\right), \quad
//!   A = X^\top W X + P, \quad b = X^\top W (y - \theta_1 \nu) + P \bar\beta, \quad
//!   W = \mathrm{diag}\left(1 / (\theta_2^2 \sigma^2 \nu_i)\right)
//! \]
//! \[
//!   \nu_i \mid \beta, \sigma^2 \sim \mathrm{GIG}\left(\tfrac12,\
//!   \theta_1^2/(\theta_2^2\sigma^2) + 2/\sigma^2,\ e_i^2/(\theta_2^2\sigma^2)\right)
//! \]
//! \[
//!   \sigma^2 \mid \beta, \nu \sim \mathrm{InvGamma}\left(n_0 + \tfrac{3n}{2},\
//!   s_0 + \sum_i \frac{(e_i - \theta_1\nu_i)^2}{2\theta_2^2\nu_i} + \sum_i \nu_i\right)
//! \]

use super::prior::{Dataset, PriorSpec};
use super::state::PosteriorState;
use crate::error::NumericalFault;
use crate::linalg::{NormalEquations, blocked_partials, draw_gaussian_from_precision};
use crate::rng::observation_stream;
use crate::{LatentScale, QuantileTarget};
use nalgebra::DVector;
use rand::Rng;
use rayon::prelude::*;
use statrs::distribution::{Gamma, Normal};

/// The three conditional draws for a fixed dataset, prior and quantile.
///
/// Parallel sections run on whatever rayon pool is current when [`GibbsSweep::step`] is
/// called; the driver installs its own pool around the whole run.
pub(crate) struct GibbsSweep<'a> {
    data: &'a Dataset,
    prior: &'a PriorSpec,
    target: QuantileTarget,
    /// Hold σ² at its current value instead of drawing it
    fixed_sigma: bool,
    std_norm: Normal,
}

impl<'a> GibbsSweep<'a> {
    pub(crate) fn new(
        data: &'a Dataset,
        prior: &'a PriorSpec,
        target: QuantileTarget,
        fixed_sigma: bool,
    ) -> Self {
        Self {
            data,
            prior,
            target,
            fixed_sigma,
            std_norm: Normal::standard(),
        }
    }

    /// Advance `state` by one sweep: β | ν,σ², then ν | β,σ², then σ² | β,ν.
    ///
    /// `rng` is only touched on the calling thread. It supplies the noise for β, the seed of the
    /// per-observation streams for ν, and the σ² draw, in that order.
    pub(crate) fn step<R: Rng>(
        &self,
        state: &mut PosteriorState,
        rng: &mut R,
    ) -> Result<(), NumericalFault> {
        state.beta = self.draw_beta(&state.nu, state.sigma_sq, rng)?;

        let sweep_seed = rng.next_u64();
        self.draw_nu(&state.beta, state.sigma_sq, sweep_seed, &mut state.nu)?;

        if !self.fixed_sigma {
            state.sigma_sq = self.draw_sigma(&state.beta, &state.nu, rng)?;
        }
        Ok(())
    }

    fn draw_beta<R: Rng>(
        &self,
        nu: &[f64],
        sigma_sq: f64,
        rng: &mut R,
    ) -> Result<DVector<f64>, NumericalFault> {
        let k = self.data.n_predictors();
        let x = self.data.x();
        let y = self.data.y();
        let spread = self.target.theta_sq2() * sigma_sq;
        let theta = self.target.theta();

        let partials = blocked_partials(self.data.n_obs(), |rows| {
            let mut eq = NormalEquations::zeros(k);
            for i in rows {
                eq.add_row(x.row(i), 1.0 / (spread * nu[i]), y[i] - theta * nu[i]);
            }
            eq
        });
        let mut eq = NormalEquations::zeros(k);
        for partial in &partials {
            eq.merge(partial);
        }
        let (precision, rhs) =
            eq.into_posterior(self.prior.precision(), self.prior.precision_mean());

        let noise = DVector::from_fn(k, |_, _| rng.sample(self.std_norm));
        let beta = draw_gaussian_from_precision(precision, &rhs, &noise)
            .ok_or(NumericalFault::NotPositiveDefinite)?;

        if beta.iter().all(|b| b.is_finite()) {
            Ok(beta)
        } else {
            Err(NumericalFault::NonFiniteBeta)
        }
    }

    /// Independent GIG draws; observation `i` uses stream `i` under `sweep_seed`.
    fn draw_nu(
        &self,
        beta: &DVector<f64>,
        sigma_sq: f64,
        sweep_seed: u64,
        nu: &mut [f64],
    ) -> Result<(), NumericalFault> {
        let latent = LatentScale::new(&self.target, sigma_sq)
            .map_err(|_| NumericalFault::InvalidSigma(sigma_sq))?;

        nu.par_iter_mut().enumerate().try_for_each(|(i, nu_i)| {
            let residual = self.data.residual(i, beta);
            let draw = latent.draw(&mut observation_stream(sweep_seed, i), residual);
            if draw > 0.0 && draw.is_finite() {
                *nu_i = draw;
                Ok(())
            } else {
                Err(NumericalFault::InvalidLatent {
                    index: i,
                    value: draw,
                })
            }
        })
    }

    fn draw_sigma<R: Rng>(
        &self,
        beta: &DVector<f64>,
        nu: &[f64],
        rng: &mut R,
    ) -> Result<f64, NumericalFault> {
        let theta = self.target.theta();
        let partials = blocked_partials(self.data.n_obs(), |rows| {
            rows.fold((0.0, 0.0), |(quad, total), i| {
                let e = self.data.residual(i, beta) - theta * nu[i];
                (quad + e * e / nu[i], total + nu[i])
            })
        });
        let (quad, total) = partials
            .iter()
            .fold((0.0, 0.0), |(q, t), &(pq, pt)| (q + pq, t + pt));

        let shape = self.prior.shape() + 1.5 * self.data.n_obs() as f64;
        let scale = self.prior.scale() + quad / (2.0 * self.target.theta_sq2()) + total;
        let gamma = Gamma::new(shape, scale)
            .map_err(|_| NumericalFault::InvalidSigmaPosterior { shape, scale })?;

        let sigma_sq = 1.0 / rng.sample(gamma);
        if sigma_sq > 0.0 && sigma_sq.is_finite() {
            Ok(sigma_sq)
        } else {
            Err(NumericalFault::InvalidSigma(sigma_sq))
        }
    }
}
