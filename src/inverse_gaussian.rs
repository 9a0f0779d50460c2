use crate::{LatentScale, rng::RngDraw};
use rand::Rng;

/// Draws from the generalized inverse-Gaussian conditional of the latent scale.
///
/// For p = 1/2 the GIG law is the reciprocal of an inverse-Gaussian variate, so the work
/// reduces to one IG draw and a division.
impl LatentScale {
    /// Sample ν ~ GIG(1/2, a, b) with b = e² / (θ₂² σ²).
    ///
    /// # Arguments
    /// * `rng` - A mutable reference to a random number generator
    /// * `residual` - The residual e = y - xᵀβ of the observation
    ///
    /// # Returns
    /// A positive draw of ν. For e = 0 (or a residual so small that the IG mean overflows)
    /// the limiting Gamma(1/2, a/2) law is used instead. A residual whose square overflows
    /// yields `f64::INFINITY`, which callers must treat as a failed draw.
    pub(crate) fn sample_latent_scale<R: Rng + ?Sized>(&self, rng: &mut R, residual: f64) -> f64 {
        let tilt = residual * residual * self.inv_spread;
        if tilt.is_infinite() {
            return f64::INFINITY;
        }
        let mean = (self.shape / tilt).sqrt();

        if tilt == 0.0 || !mean.is_finite() {
            return self.sample_half_gamma(rng);
        }

        1.0 / self.sample_inv_gauss(rng, mean, self.shape)
    }

    /// Sample from IG(mean, shape) by the transformation with multiple roots.
    ///
    /// With y = z², z ~ N(0, 1), the smaller root of the quadratic is
    /// x = μ + μ²y/(2λ) - (μ/2λ)·sqrt(4μλy + μ²y²). Writing r = μy/(2λ) this is
    /// x = μ / (1 + r + sqrt(r(r + 2))), which stays accurate when μ/λ is large. The root is
    /// kept with probability μ/(μ + x), otherwise the conjugate root μ²/x is returned.
    ///
    /// # Arguments
    /// * `rng` - Random number generator
    /// * `mean` - The mean μ of the inverse Gaussian distribution
    /// * `shape` - The shape λ of the inverse Gaussian distribution
    ///
    /// # Returns
    /// A random variate from IG(μ, λ)
    pub(crate) fn sample_inverse_gaussian<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        mean: f64,
        shape: f64,
    ) -> f64 {
        let normal_sample = self.sample_norm(rng);
        let ratio = 0.5 * mean * normal_sample * normal_sample / shape;
        // split root so that r(r + 2) cannot overflow for large r
        let root = mean / (1.0 + ratio + ratio.sqrt() * (ratio + 2.0).sqrt());

        if self.sample_unif(rng) <= mean / (mean + root) {
            root
        } else {
            (mean * mean) / root
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{LatentScale, QuantileTarget};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn inverse_gaussian_moments() {
        let latent = LatentScale::new(&QuantileTarget::new(0.5).unwrap(), 1.0).unwrap();
        let mut rng = StdRng::seed_from_u64(21);
        let n = 60_000;
        for (mean, shape) in [(0.5, 2.0), (3.0, 1.0), (40.0, 5.0)] {
            let draws: Vec<f64> = (0..n)
                .map(|_| latent.sample_inverse_gaussian(&mut rng, mean, shape))
                .collect();
            let m = draws.iter().sum::<f64>() / n as f64;
            // Var = μ³/λ, so the standard error of the mean is sqrt(μ³/(λ n))
            let se = (mean.powi(3) / (shape * n as f64)).sqrt();
            assert!(
                (m - mean).abs() < 5.0 * se,
                "IG({mean}, {shape}): empirical mean {m}, se {se}"
            );
            assert!(draws.iter().all(|&x| x > 0.0));
        }
    }

    #[test]
    fn tiny_residual_gives_finite_latent_draws() {
        // e^2 / (θ₂² σ²) is subnormal here, so the IG mean is close to 1e154
        let latent = LatentScale::new(&QuantileTarget::new(0.5).unwrap(), 1.0).unwrap();
        let mut rng = StdRng::seed_from_u64(4);
        let draws = latent.draw_vec(&mut rng, &[3.5e-154; 10_000]);
        let bad = draws.iter().filter(|nu| !(nu.is_finite() && **nu > 0.0)).count();
        assert_eq!(bad, 0, "{bad} of {} draws are not positive and finite", draws.len());
    }
}
