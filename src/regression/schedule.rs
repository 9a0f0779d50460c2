use crate::error::BqregError;

/// Number of burn-in sweeps, sampling sweeps, and the thinning between retained draws.
///
/// The sampling phase runs `n_keep` sweeps and retains sweeps 0, k+1, 2(k+1), … of it, where
/// k is the thinning factor. That is ⌈n_keep / (k+1)⌉ retained draws.
///
/// # Example
/// ```
/// use bqreg::regression::DrawSchedule;
/// let schedule = DrawSchedule::new(500, 1_000, 2);
/// assert_eq!(schedule.retained_draws(), 334);
/// assert!(DrawSchedule::from_signed(-1, 10, 0).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawSchedule {
    n_burnin: usize,
    n_keep: usize,
    thinning_factor: usize,
}

impl DrawSchedule {
    pub fn new(n_burnin: usize, n_keep: usize, thinning_factor: usize) -> Self {
        Self {
            n_burnin,
            n_keep,
            thinning_factor,
        }
    }

    /// Build a schedule from signed counts, as handed over by callers that cannot express
    /// unsigned integers.
    ///
    /// # Errors
    /// [`BqregError::Range`] if any count is negative.
    pub fn from_signed(
        n_burnin: i64,
        n_keep: i64,
        thinning_factor: i64,
    ) -> Result<Self, BqregError> {
        let count = |name: &'static str, value: i64| {
            usize::try_from(value).map_err(|_| BqregError::Range {
                name,
                value: value as f64,
                domain: "[0, inf)",
            })
        };
        Ok(Self::new(
            count("n_burnin", n_burnin)?,
            count("n_keep", n_keep)?,
            count("thinning_factor", thinning_factor)?,
        ))
    }

    pub fn n_burnin(&self) -> usize {
        self.n_burnin
    }

    pub fn n_keep(&self) -> usize {
        self.n_keep
    }

    pub fn thinning_factor(&self) -> usize {
        self.thinning_factor
    }

    fn stride(&self) -> usize {
        self.thinning_factor.saturating_add(1)
    }

    /// Number of draws the sampling phase retains.
    pub fn retained_draws(&self) -> usize {
        self.n_keep.div_ceil(self.stride())
    }

    /// Whether sweep `sampling_sweep` (counted from the start of the sampling phase) is retained.
    pub fn keeps(&self, sampling_sweep: usize) -> bool {
        sampling_sweep % self.stride() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn no_thinning_keeps_everything() {
        let schedule = DrawSchedule::new(0, 17, 0);
        assert_eq!(schedule.retained_draws(), 17);
        assert!((0..17).all(|s| schedule.keeps(s)));
    }

    #[test]
    fn negative_counts_are_rejected() {
        assert!(matches!(
            DrawSchedule::from_signed(10, -5, 0),
            Err(BqregError::Range { name: "n_keep", .. })
        ));
        assert!(matches!(
            DrawSchedule::from_signed(-1, 5, 0),
            Err(BqregError::Range { name: "n_burnin", .. })
        ));
        assert_eq!(
            DrawSchedule::from_signed(3, 4, 1).unwrap(),
            DrawSchedule::new(3, 4, 1)
        );
    }

    proptest! {
        #[test]
        fn retained_count_matches_kept_sweeps(n_keep in 0usize..500, k in 0usize..20) {
            let schedule = DrawSchedule::new(0, n_keep, k);
            let kept = (0..n_keep).filter(|&s| schedule.keeps(s)).count();
            prop_assert_eq!(kept, schedule.retained_draws());
            prop_assert_eq!(kept, n_keep.div_ceil(k + 1));
        }
    }
}
