//! Bayesian median regression on synthetic data.
//!
//! The example:
//! 1. Generates n = 500 observations from y = Xβ + ε with β = (5, 1.3, 1.8) and Laplace noise
//! 2. Fits the τ = 0.5 quantile with a N(0, 1000·I) prior on β and InvGamma(3, 3) on σ²
//! 3. Reports posterior means and standard deviations next to the true coefficients
//!
//! Run with `RUST_LOG=debug` to see the sampler's setup and phase transitions.

use bqreg::regression::GibbsQuantile;
use ndarray::{Array1, Array2, array};
use rand::{Rng, SeedableRng};
use statrs::distribution::{Exp, Normal};
use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt::init();

    let n = 500;
    let k = 3;
    let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(42);
    let predictor = Normal::new(2.0, 1.0)?;
    let x = Array2::from_shape_fn((n, k), |(_, j)| {
        if j == 0 { 1.0 } else { rng.sample(predictor) }
    });
    let true_beta = array![5.0, 1.3, 1.8];
    // Laplace noise with median zero, as a signed exponential
    let noise = Exp::new(1.0)?;
    let y = x.dot(&true_beta)
        + Array1::from_shape_fn(n, |_| {
            let magnitude = rng.sample(noise);
            if rng.gen_bool(0.5) { magnitude } else { -magnitude }
        });

    let mut model = GibbsQuantile::from_data(y, x)?;
    model.set_prior_params(Array1::zeros(k), Array2::eye(k) * 1000.0, 3.0, 3.0)?;
    model.set_thread_count(4)?;
    model.set_seed_value(1111);

    let draws = model.fit(0.5, 10_000, 10_000, 0)?;

    draws.summary();
    println!("\nTrue coefficients: {:?}", true_beta.to_vec());
    Ok(())
}
