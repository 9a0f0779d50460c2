use crate::error::{BqregError, check_range};

/// Target quantile τ and the skew constants of the asymmetric-Laplace mixture.
///
/// With τ ∈ (0, 1) the residual of observation i is written as
/// \( e_i = \theta_1 \nu_i + \theta_2 \sqrt{\sigma^2 \nu_i}\, \varepsilon_i \), where
/// - \( \theta_1 = (1 - 2\tau) / (\tau (1 - \tau)) \)
/// - \( \theta_2^2 = 2 / (\tau (1 - \tau)) \)
///
/// Both constants are derived once here and passed by value to every conditional draw.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuantileTarget {
    tau: f64,
    theta: f64,
    theta_sq2: f64,
}

impl QuantileTarget {
    /// Build a target for quantile `tau`.
    ///
    /// # Errors
    /// [`BqregError::Range`] unless `0 < tau < 1`.
    ///
    /// # Example
    /// ```
    /// use bqreg::QuantileTarget;
    /// let median = QuantileTarget::new(0.5).unwrap();
    /// assert_eq!(median.theta(), 0.0);
    /// assert_eq!(median.theta_sq2(), 8.0);
    /// assert!(QuantileTarget::new(1.0).is_err());
    /// ```
    pub fn new(tau: f64) -> Result<Self, BqregError> {
        check_range("tau", tau, "(0, 1)", tau > 0.0 && tau < 1.0)?;
        let spread = tau * (1.0 - tau);
        Ok(Self {
            tau,
            theta: (1.0 - 2.0 * tau) / spread,
            theta_sq2: 2.0 / spread,
        })
    }

    /// The quantile level τ.
    pub fn tau(&self) -> f64 {
        self.tau
    }

    /// Location skew θ₁ of the latent mixture.
    pub fn theta(&self) -> f64 {
        self.theta
    }

    /// Squared scale θ₂² of the latent mixture.
    pub fn theta_sq2(&self) -> f64 {
        self.theta_sq2
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    #[test]
    fn rejects_boundaries() {
        for tau in [0.0, 1.0, 1.5, -0.2, f64::NAN] {
            assert!(matches!(
                QuantileTarget::new(tau),
                Err(BqregError::Range { name: "tau", .. })
            ));
        }
    }

    #[test]
    fn first_decile_constants() {
        let t = QuantileTarget::new(0.1).unwrap();
        assert_relative_eq!(t.theta(), 0.8 / 0.09, max_relative = 1e-12);
        assert_relative_eq!(t.theta_sq2(), 2.0 / 0.09, max_relative = 1e-12);
    }

    proptest! {
        #[test]
        fn skew_is_antisymmetric_around_median(tau in 0.001f64..0.999) {
            let lo = QuantileTarget::new(tau).unwrap();
            let hi = QuantileTarget::new(1.0 - tau).unwrap();
            prop_assert!((lo.theta() + hi.theta()).abs() < 1e-9 * lo.theta().abs().max(1.0));
            prop_assert!((lo.theta_sq2() - hi.theta_sq2()).abs() < 1e-9 * lo.theta_sq2());
            prop_assert!(lo.theta_sq2() >= 8.0);
        }
    }
}
