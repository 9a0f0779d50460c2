//! Error types returned by the sampler.

use thiserror::Error;

/// Errors raised while configuring or running the quantile-regression sampler.
///
/// Configuration, shape, range and value errors are raised by the setter that received the
/// offending input and leave the sampler untouched. [`BqregError::Numerical`] is raised by
/// [`fit`](crate::regression::GibbsQuantile::fit) and aborts the whole run.
#[derive(Debug, Error)]
pub enum BqregError {
    /// An operation was invoked before the sampler had what it needs (data, prior, target).
    #[error("sampler is not configured: {0}")]
    Configuration(&'static str),

    /// Two inputs disagree on a dimension.
    #[error("shape mismatch for {what}: expected {expected}, got {got}")]
    Shape {
        what: &'static str,
        expected: usize,
        got: usize,
    },

    /// A scalar lies outside its admissible domain.
    #[error("{name} = {value} is outside its domain {domain}")]
    Range {
        name: &'static str,
        value: f64,
        domain: &'static str,
    },

    /// A structurally invalid input, e.g. a prior covariance that is not positive-definite.
    #[error("invalid value: {0}")]
    Value(String),

    /// A sweep produced a state that is not a valid draw. Collected draws are discarded.
    #[error("numerical failure in sweep {sweep}: {fault}")]
    Numerical {
        sweep: usize,
        #[source]
        fault: NumericalFault,
    },

    /// The worker pool for the parallel sections could not be created.
    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// The specific way a Gibbs sweep failed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NumericalFault {
    #[error("posterior precision of beta is not positive-definite")]
    NotPositiveDefinite,
    #[error("beta draw contains a non-finite coefficient")]
    NonFiniteBeta,
    #[error("latent scale nu[{index}] = {value} is not a positive finite number")]
    InvalidLatent { index: usize, value: f64 },
    #[error("sigma^2 draw {0} is not a positive finite number")]
    InvalidSigma(f64),
    #[error("sigma^2 posterior parameters are invalid (shape {shape}, scale {scale})")]
    InvalidSigmaPosterior { shape: f64, scale: f64 },
}

pub(crate) fn check_range(
    name: &'static str,
    value: f64,
    domain: &'static str,
    ok: bool,
) -> Result<(), BqregError> {
    if ok {
        Ok(())
    } else {
        Err(BqregError::Range {
            name,
            value,
            domain,
        })
    }
}
