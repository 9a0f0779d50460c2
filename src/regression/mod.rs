//! Bayesian quantile regression by Gibbs sampling with asymmetric-Laplace augmentation.
//!
//! The asymmetric Laplace working likelihood is a normal/exponential scale mixture, so with
//! the latent scales ν in hand the coefficients have a Gaussian conditional and σ² an
//! inverse-gamma one. Each sweep draws β as a block, then all ν_i in parallel, then σ².
//!
//! # Available Types
//! - [`GibbsQuantile`]: the sampler; owns data, prior, chain state and retained draws
//! - [`DrawSchedule`]: burn-in, sampling length and thinning of a fit
//! - [`Dataset`], [`PriorSpec`]: validated inputs
//! - [`PosteriorState`], [`DrawHistory`]: the current chain position and the retained draws
//!
//! # Examples
//! See `demos/median_regression.rs` for a complete median regression run.

pub use prior::{Dataset, PriorSpec};
pub use sampler::{GibbsQuantile, Phase};
pub use schedule::DrawSchedule;
pub use state::{DrawHistory, PosteriorState};

mod gibbs;
mod prior;
mod sampler;
mod schedule;
mod state;
