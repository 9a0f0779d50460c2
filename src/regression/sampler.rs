//! Bayesian quantile regression driver: configuration, burn-in, sampling and thinning.

use super::gibbs::GibbsSweep;
use super::prior::{Dataset, PriorSpec};
use super::schedule::DrawSchedule;
use super::state::{DrawHistory, PosteriorState};
use crate::QuantileTarget;
use crate::error::{BqregError, check_range};
use crate::linalg::to_dvector;
use nalgebra::DVector;
use ndarray::{Array1, Array2};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::ThreadPoolBuilder;
use tracing::{debug, info, trace, warn};

/// Lifecycle of a [`GibbsQuantile`] sampler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Data or prior parameters are missing.
    Uninitialized,
    /// Data and prior are set; a fit may start.
    Configured,
    /// Running sweeps whose draws are discarded.
    BurnIn,
    /// Running sweeps of which every (k+1)-th is retained.
    Sampling,
    /// The last fit completed; its draws are in [`GibbsQuantile::history`].
    Done,
}

/// A Gibbs sampler for Bayesian quantile regression using asymmetric-Laplace data augmentation.
///
/// The sampler owns the data, the prior, the current state of the chain and the retained draws.
/// Setters validate their input and leave the sampler unchanged on error. Calling
/// [`fit`](Self::fit) again continues the chain from where the previous fit stopped; use
/// [`reset`](Self::reset) to start over from the initial values.
///
/// # Example
/// ```rust
/// use ndarray::{Array1, Array2};
/// use rand::{Rng, SeedableRng};
/// use rand_chacha::ChaCha8Rng;
/// use bqreg::regression::GibbsQuantile;
///
/// // Generate synthetic data with an intercept and one predictor
/// let n = 200;
/// let mut rng = ChaCha8Rng::seed_from_u64(42);
/// let x = Array2::from_shape_fn((n, 2), |(_, j)| if j == 0 { 1.0 } else { rng.r#gen::<f64>() });
/// let y = Array1::from_shape_fn(n, |i| 1.0 + 2.0 * x[[i, 1]] + rng.r#gen::<f64>() - 0.5);
///
/// let mut model = GibbsQuantile::from_data(y, x).unwrap();
/// model.set_prior_params(Array1::zeros(2), Array2::eye(2) * 100.0, 3.0, 3.0).unwrap();
/// model.set_seed_value(1111);
/// model.set_thread_count(2).unwrap();
///
/// let draws = model.fit(0.5, 200, 400, 0).unwrap();
/// println!("Posterior means: {:?}", draws.posterior_means());
/// assert_eq!(draws.beta_draws().dim(), (2, 400));
/// ```
#[derive(Debug)]
pub struct GibbsQuantile {
    data: Option<Dataset>,
    prior: Option<PriorSpec>,
    target: Option<QuantileTarget>,
    initial_beta: Option<DVector<f64>>,
    initial_sigma_sq: f64,
    fixed_sigma: Option<f64>,
    state: Option<PosteriorState>,
    history: DrawHistory,
    n_threads: usize,
    rng: ChaCha8Rng,
    phase: Phase,
    phase_trace: Vec<Phase>,
}

impl Default for GibbsQuantile {
    fn default() -> Self {
        Self::new()
    }
}

impl GibbsQuantile {
    /// An unconfigured sampler with an entropy-seeded generator and rayon's default width.
    pub fn new() -> Self {
        Self {
            data: None,
            prior: None,
            target: None,
            initial_beta: None,
            initial_sigma_sq: 1.0,
            fixed_sigma: None,
            state: None,
            history: DrawHistory::new(),
            n_threads: rayon::current_num_threads(),
            rng: ChaCha8Rng::from_entropy(),
            phase: Phase::Uninitialized,
            phase_trace: vec![Phase::Uninitialized],
        }
    }

    /// Create a sampler and load `y` (length n) and `x` (n × K) into it.
    ///
    /// # Errors
    /// See [`load_data`](Self::load_data).
    pub fn from_data(y: Array1<f64>, x: Array2<f64>) -> Result<Self, BqregError> {
        let mut sampler = Self::new();
        sampler.load_data(y, x)?;
        Ok(sampler)
    }

    /// Load the response `y` and design matrix `x`.
    ///
    /// Replacing data of a different size discards the current chain state. A prior or an
    /// initial β whose length no longer matches the new number of predictors is dropped too.
    ///
    /// # Errors
    /// - [`BqregError::Shape`] if the row counts of `x` and `y` differ or either is empty
    /// - [`BqregError::Value`] on NaN or infinite entries
    pub fn load_data(&mut self, y: Array1<f64>, x: Array2<f64>) -> Result<(), BqregError> {
        let data = Dataset::new(y, x)?;
        let (n, k) = (data.n_obs(), data.n_predictors());
        if self
            .state
            .as_ref()
            .is_some_and(|state| !state.fits(n, k))
        {
            self.state = None;
        }
        if self.initial_beta.as_ref().is_some_and(|b| b.len() != k) {
            debug!(k, "dropping initial beta of mismatched length");
            self.initial_beta = None;
        }
        if self.prior.as_ref().is_some_and(|p| p.n_predictors() != k) {
            debug!(k, "dropping prior of mismatched length");
            self.prior = None;
        }
        debug!(n_obs = n, n_predictors = k, "data loaded");
        self.data = Some(data);
        self.refresh_phase();
        Ok(())
    }

    /// Set the prior: β ~ N(`beta_mean`, `beta_cov`) and σ² ~ InvGamma(`shape`, `scale`).
    ///
    /// `beta_cov` is the prior **covariance** of β; its inverse is computed here once.
    ///
    /// # Errors
    /// - [`BqregError::Value`] if `beta_cov` is not square, symmetric and positive-definite, or
    ///   does not match the length of `beta_mean`
    /// - [`BqregError::Range`] if `shape` or `scale` is not positive
    /// - [`BqregError::Shape`] if data is loaded and its number of predictors differs from the
    ///   length of `beta_mean`
    pub fn set_prior_params(
        &mut self,
        beta_mean: Array1<f64>,
        beta_cov: Array2<f64>,
        shape: f64,
        scale: f64,
    ) -> Result<(), BqregError> {
        self.set_prior(PriorSpec::new(beta_mean, beta_cov, shape, scale)?)
    }

    /// Install an already validated prior.
    ///
    /// # Errors
    /// [`BqregError::Shape`] if data is loaded and its number of predictors differs from the
    /// prior's. The sampler is left unchanged.
    pub fn set_prior(&mut self, prior: PriorSpec) -> Result<(), BqregError> {
        if let Some(data) = self.data.as_ref() {
            if data.n_predictors() != prior.n_predictors() {
                return Err(BqregError::Shape {
                    what: "prior coefficients",
                    expected: data.n_predictors(),
                    got: prior.n_predictors(),
                });
            }
        }
        debug!(n_predictors = prior.n_predictors(), "prior set");
        self.prior = Some(prior);
        self.refresh_phase();
        Ok(())
    }

    /// Starting value for β. Also moves the current chain state to `beta`.
    ///
    /// # Errors
    /// - [`BqregError::Configuration`] if neither data nor prior is set, so K is unknown
    /// - [`BqregError::Shape`] if the length of `beta` is not K
    pub fn set_initial_beta_draw(&mut self, beta: Array1<f64>) -> Result<(), BqregError> {
        let k = self
            .data
            .as_ref()
            .map(Dataset::n_predictors)
            .or_else(|| self.prior.as_ref().map(PriorSpec::n_predictors))
            .ok_or(BqregError::Configuration(
                "load data or set the prior before the initial beta",
            ))?;
        if beta.len() != k {
            return Err(BqregError::Shape {
                what: "initial beta",
                expected: k,
                got: beta.len(),
            });
        }
        if !beta.iter().all(|b| b.is_finite()) {
            return Err(BqregError::Value("initial beta contains NaN or infinite entries".into()));
        }
        let beta = to_dvector(beta.view());
        if let Some(state) = self.state.as_mut() {
            state.beta = beta.clone();
        }
        self.initial_beta = Some(beta);
        Ok(())
    }

    /// The starting value for β, if one was set.
    pub fn initial_beta_draw(&self) -> Option<Array1<f64>> {
        self.initial_beta
            .as_ref()
            .map(|b| Array1::from_iter(b.iter().copied()))
    }

    /// Starting value for σ² (default 1). Also moves the current chain state to `sigma_sq`.
    ///
    /// # Errors
    /// [`BqregError::Range`] unless `sigma_sq` is a positive finite number.
    pub fn set_initial_sigma_draw(&mut self, sigma_sq: f64) -> Result<(), BqregError> {
        check_range(
            "initial sigma_sq",
            sigma_sq,
            "(0, inf)",
            sigma_sq > 0.0 && sigma_sq.is_finite(),
        )?;
        if let Some(state) = self.state.as_mut() {
            state.sigma_sq = sigma_sq;
        }
        self.initial_sigma_sq = sigma_sq;
        Ok(())
    }

    /// Hold σ² fixed at the given value (skipping its draw), or `None` to sample it.
    ///
    /// # Errors
    /// [`BqregError::Range`] unless the value is a positive finite number.
    pub fn set_fixed_sigma(&mut self, sigma_sq: Option<f64>) -> Result<(), BqregError> {
        if let Some(value) = sigma_sq {
            check_range(
                "fixed sigma_sq",
                value,
                "(0, inf)",
                value > 0.0 && value.is_finite(),
            )?;
        }
        self.fixed_sigma = sigma_sq;
        Ok(())
    }

    /// Set the quantile used by [`gibbs`](Self::gibbs).
    ///
    /// # Errors
    /// [`BqregError::Range`] unless `0 < tau < 1`.
    pub fn set_quantile_target(&mut self, tau: f64) -> Result<(), BqregError> {
        self.target = Some(QuantileTarget::new(tau)?);
        Ok(())
    }

    /// The quantile of the last fit or of [`set_quantile_target`](Self::set_quantile_target).
    pub fn quantile_target(&self) -> Option<f64> {
        self.target.as_ref().map(QuantileTarget::tau)
    }

    /// Reseed the generator. Two samplers with the same inputs and seed produce identical draws.
    pub fn set_seed_value(&mut self, seed: u64) {
        self.rng = ChaCha8Rng::seed_from_u64(seed);
    }

    /// Number of worker threads for the parallel sections of a sweep.
    ///
    /// # Errors
    /// [`BqregError::Range`] if `n_threads` is zero.
    pub fn set_thread_count(&mut self, n_threads: usize) -> Result<(), BqregError> {
        check_range(
            "thread count",
            n_threads as f64,
            "[1, inf)",
            n_threads >= 1,
        )?;
        self.n_threads = n_threads;
        Ok(())
    }

    pub fn thread_count(&self) -> usize {
        self.n_threads
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Phases visited since the sampler was created or last reset.
    pub fn phase_trace(&self) -> &[Phase] {
        &self.phase_trace
    }

    /// Current state of the chain, `None` before the first fit or after a reset.
    pub fn state(&self) -> Option<&PosteriorState> {
        self.state.as_ref()
    }

    /// Draws retained by the last successful fit.
    pub fn history(&self) -> &DrawHistory {
        &self.history
    }

    /// Discard the chain state and retained draws. The next fit starts from the initial values.
    pub fn reset(&mut self) {
        self.state = None;
        self.history.clear();
        self.phase = Phase::Uninitialized;
        self.phase_trace = vec![Phase::Uninitialized];
        self.refresh_phase();
    }

    /// Run the sampler for quantile `tau`.
    ///
    /// Runs `n_burnin` discarded sweeps, then `n_keep` sweeps of which every
    /// `(thinning_factor + 1)`-th is retained, for ⌈n_keep / (thinning_factor + 1)⌉ draws.
    ///
    /// # Errors
    /// - [`BqregError::Range`] unless `0 < tau < 1`
    /// - [`BqregError::Configuration`] if data or prior is missing
    /// - [`BqregError::Numerical`] if a sweep fails; no draws are returned and the chain is
    ///   rolled back to where it was before this call
    pub fn fit(
        &mut self,
        tau: f64,
        n_burnin: usize,
        n_keep: usize,
        thinning_factor: usize,
    ) -> Result<&DrawHistory, BqregError> {
        self.fit_schedule(tau, DrawSchedule::new(n_burnin, n_keep, thinning_factor))
    }

    /// [`fit`](Self::fit) with a prepared [`DrawSchedule`].
    pub fn fit_schedule(
        &mut self,
        tau: f64,
        schedule: DrawSchedule,
    ) -> Result<&DrawHistory, BqregError> {
        let target = QuantileTarget::new(tau)?;
        self.run(target, schedule)
    }

    /// [`fit`](Self::fit) at the quantile given to
    /// [`set_quantile_target`](Self::set_quantile_target).
    ///
    /// # Errors
    /// [`BqregError::Configuration`] if no quantile target was set; otherwise as `fit`.
    pub fn gibbs(
        &mut self,
        n_burnin: usize,
        n_keep: usize,
        thinning_factor: usize,
    ) -> Result<&DrawHistory, BqregError> {
        let target = self
            .target
            .ok_or(BqregError::Configuration("quantile target is not set"))?;
        self.run(target, DrawSchedule::new(n_burnin, n_keep, thinning_factor))
    }

    fn refresh_phase(&mut self) {
        let next = if self.data.is_some() && self.prior.is_some() {
            Phase::Configured
        } else {
            Phase::Uninitialized
        };
        self.enter(next);
    }

    fn enter(&mut self, phase: Phase) {
        if self.phase_trace.last() != Some(&phase) {
            self.phase_trace.push(phase);
        }
        self.phase = phase;
    }

    fn run(
        &mut self,
        target: QuantileTarget,
        schedule: DrawSchedule,
    ) -> Result<&DrawHistory, BqregError> {
        let (Some(data), Some(prior)) = (self.data.as_ref(), self.prior.as_ref()) else {
            return Err(BqregError::Configuration(
                "data and prior parameters must be set before fitting",
            ));
        };
        // setters keep the prior and the data in agreement on K
        let (n, k) = (data.n_obs(), data.n_predictors());
        let pool = ThreadPoolBuilder::new()
            .num_threads(self.n_threads)
            .build()?;

        debug!(
            tau = target.tau(),
            theta = target.theta(),
            theta_sq2 = target.theta_sq2(),
            n_burnin = schedule.n_burnin(),
            n_keep = schedule.n_keep(),
            thinning_factor = schedule.thinning_factor(),
            threads = self.n_threads,
            "starting fit"
        );

        let mut state = match self.state.take() {
            Some(state) if state.fits(n, k) => state,
            _ => PosteriorState::initial(n, k, self.initial_beta.as_ref(), self.initial_sigma_sq),
        };
        if let Some(sigma_sq) = self.fixed_sigma {
            state.sigma_sq = sigma_sq;
        }
        let warm_start = state.clone();

        self.history.reserve(k, n, schedule.retained_draws());

        let sweep = GibbsSweep::new(data, prior, target, self.fixed_sigma.is_some());
        let mut chain = Chain {
            state: &mut state,
            rng: &mut self.rng,
            history: &mut self.history,
            phase: &mut self.phase,
            phase_trace: &mut self.phase_trace,
        };
        let outcome = pool.install(|| chain.run(&sweep, schedule));

        match outcome {
            Ok(()) => {
                self.state = Some(state);
                self.target = Some(target);
                self.enter(Phase::Done);
                info!(
                    retained = self.history.len(),
                    sweeps = schedule.n_burnin() + schedule.n_keep(),
                    "fit complete"
                );
                Ok(&self.history)
            }
            Err(err) => {
                warn!(error = %err, "fit aborted; draws discarded");
                self.state = Some(warm_start);
                self.history.clear();
                self.enter(Phase::Configured);
                Err(err)
            }
        }
    }
}

/// Mutable pieces of the sampler that the sweep loop advances.
struct Chain<'s> {
    state: &'s mut PosteriorState,
    rng: &'s mut ChaCha8Rng,
    history: &'s mut DrawHistory,
    phase: &'s mut Phase,
    phase_trace: &'s mut Vec<Phase>,
}

impl Chain<'_> {
    fn enter(&mut self, phase: Phase) {
        debug!(?phase, "phase transition");
        self.phase_trace.push(phase);
        *self.phase = phase;
    }

    fn run(&mut self, sweep: &GibbsSweep<'_>, schedule: DrawSchedule) -> Result<(), BqregError> {
        if *self.phase == Phase::Done {
            self.enter(Phase::Configured);
        }
        if schedule.n_burnin() > 0 {
            self.enter(Phase::BurnIn);
        }
        for index in 0..schedule.n_burnin() {
            self.sweep(sweep, index)?;
        }

        self.enter(Phase::Sampling);
        for s in 0..schedule.n_keep() {
            self.sweep(sweep, schedule.n_burnin() + s)?;
            if schedule.keeps(s) {
                self.history.push(self.state);
            }
        }
        Ok(())
    }

    #[inline]
    fn sweep(&mut self, sweep: &GibbsSweep<'_>, index: usize) -> Result<(), BqregError> {
        sweep
            .step(self.state, self.rng)
            .map_err(|fault| BqregError::Numerical {
                sweep: index,
                fault,
            })?;
        trace!(sweep = index, sigma_sq = self.state.sigma_sq, "sweep done");
        Ok(())
    }
}
