//! Bootstrap percentile confidence intervals
//!
//! A run draws `n_resamples` datasets of the source size by sampling rows
//! uniformly with replacement, refits the model on each one and reports, for
//! every term, the empirical `alpha / 2` and `1 - alpha / 2` percentiles of
//! its estimates.
//!
//! ```text
//! Sampling -> Fitting -> Aggregating
//! ```
//!
//! Every iteration reads from its own counter-seeded random stream, so the
//! report depends only on the seed, never on whether iterations ran on the
//! rayon pool or in sequence.

pub mod fitter;
pub mod interval;
pub mod resample;
pub mod runner;


pub use fitter::{CoefficientFitter, Estimates, FitOutcome, GlmFitter, OlsFitter};
pub use interval::{IntervalEstimator, IterationOutcome, TermInterval};
pub use resample::{counter_seed, Resampler};
pub use runner::{Bootstrap, BootstrapReport};

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bootstat_core::data::DataFrame;
use bootstat_core::spec::ModelSpec;
use serde::{Deserialize, Serialize};

use crate::base::{ModelError, Result};

/// Bootstrap run configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BootstrapConfig {
    /// Number of resamples (B)
    pub n_resamples: usize,
    /// Two-sided miss rate; intervals cover `1 - alpha`
    pub alpha: f64,
    /// Seed of the per-iteration random streams
    pub seed: u64,
    /// Valid samples a term needs for its interval to count as reliable
    pub min_valid_samples: usize,
    /// Fit resamples on the rayon thread pool
    pub parallel: bool,
    /// Stop fitting new resamples after this many seconds
    pub timeout_secs: Option<f64>,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            n_resamples: 2000,
            alpha: 0.05,
            seed: 42,
            min_valid_samples: 30,
            parallel: true,
            timeout_secs: None,
        }
    }
}

impl BootstrapConfig {
    /// Check the configuration values are in range
    pub fn validate(&self) -> Result<()> {
        if self.n_resamples == 0 {
            return Err(ModelError::invalid("number of resamples must be at least 1"));
        }
        if !(self.alpha > 0.0 && self.alpha < 1.0) {
            return Err(ModelError::invalid(format!(
                "alpha must be in (0, 1), got {}",
                self.alpha
            )));
        }
        if let Some(secs) = self.timeout_secs {
            if !(secs > 0.0 && secs.is_finite()) {
                return Err(ModelError::invalid(format!(
                    "timeout must be a positive number of seconds, got {}",
                    secs
                )));
            }
        }
        Ok(())
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs_f64)
    }

    pub fn confidence_level(&self) -> f64 {
        1.0 - self.alpha
    }
}

/// Shared flag that stops a running bootstrap.
///
/// Iterations already fitted are kept; no new ones start once the flag is
/// set.
#[derive(Debug, Clone, Default)]
pub struct AbortHandle(Arc<AtomicBool>);

impl AbortHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn abort(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_aborted(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Stage of a bootstrap run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stage {
    Sampling,
    Fitting,
    Aggregating,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Sampling => write!(f, "sampling"),
            Stage::Fitting => write!(f, "fitting"),
            Stage::Aggregating => write!(f, "aggregating"),
        }
    }
}

/// Convenience function: OLS bootstrap of `spec` on `data`
pub fn bootstrap(
    spec: &ModelSpec,
    data: &DataFrame,
    config: BootstrapConfig,
) -> Result<BootstrapReport> {
    Bootstrap::new(config, OlsFitter::new(spec, data)?)?.run(data)
}
