use super::LatentScale;
use rand::{Rng, SeedableRng, prelude::Distribution};
use rand_chacha::ChaCha8Rng;

/// Unified interface for sampling from the distributions behind the latent-scale draw
pub(crate) trait RngDraw<R: Rng + ?Sized> {
    fn sample_norm(&self, rng: &mut R) -> f64;
    fn sample_unif(&self, rng: &mut R) -> f64;
    fn sample_half_gamma(&self, rng: &mut R) -> f64;
    fn sample_inv_gauss(&self, rng: &mut R, mean: f64, shape: f64) -> f64;
}

impl<R: Rng + ?Sized> RngDraw<R> for LatentScale {
    /// Sample from the standard normal distribution
    #[inline(always)]
    fn sample_norm(&self, rng: &mut R) -> f64 {
        self.std_norm.sample(rng)
    }

    /// Sample from the standard uniform distribution
    #[inline(always)]
    fn sample_unif(&self, rng: &mut R) -> f64 {
        self.unif.sample(rng)
    }

    /// Sample from Gamma(1/2, rate a/2), the law of ν when the residual is exactly zero
    #[inline(always)]
    fn sample_half_gamma(&self, rng: &mut R) -> f64 {
        self.half_gamma.sample(rng)
    }

    /// Sample from an inverse Gaussian distribution IG(mean, shape).
    ///
    /// # Arguments
    /// * `rng` - Random number generator
    /// * `mean` - Mean μ of the distribution (must be finite and positive)
    /// * `shape` - Shape λ of the distribution (must be positive)
    ///
    /// # Algorithm
    /// Transformation with multiple roots (Michael, Schucany & Haas, 1976); see
    /// [`LatentScale::sample_inverse_gaussian`].
    #[inline(always)]
    fn sample_inv_gauss(&self, rng: &mut R, mean: f64, shape: f64) -> f64 {
        debug_assert!(mean > 0.0 && mean.is_finite());
        self.sample_inverse_gaussian(rng, mean, shape)
    }
}

/// Generator for observation `index` within the sweep keyed by `seed`.
///
/// Every observation gets its own ChaCha stream, so a draw is a pure function of
/// `(seed, index)` and does not depend on which worker thread evaluates it.
#[inline]
pub(crate) fn observation_stream(seed: u64, index: usize) -> ChaCha8Rng {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    rng.set_stream(index as u64);
    rng
}
