//! Bootstrap run loop and report

use std::fmt;
use std::time::Instant;

use indexmap::IndexMap;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use bootstat_core::data::DataFrame;

use crate::base::Result;
use crate::bootstrap::fitter::{CoefficientFitter, FitOutcome};
use crate::bootstrap::interval::{IntervalEstimator, IterationOutcome, TermInterval};
use crate::bootstrap::resample::Resampler;
use crate::bootstrap::{AbortHandle, BootstrapConfig, Stage};

/// Result of a bootstrap run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BootstrapReport {
    /// Rows of the source dataset
    pub n_obs: usize,
    /// Requested number of resamples
    pub n_resamples: usize,
    /// Resamples actually fitted; below `n_resamples` when truncated
    pub n_completed: usize,
    /// Fitted resamples whose fit failed outright
    pub n_failed: usize,
    pub alpha: f64,
    pub seed: u64,
    /// Stopped early by an abort or timeout
    pub truncated: bool,
    /// Intervals in design column order
    pub intervals: IndexMap<String, TermInterval>,
    /// Terms no resample could estimate
    pub unestimable: Vec<String>,
}

impl BootstrapReport {
    pub fn interval(&self, term: &str) -> Option<&TermInterval> {
        self.intervals.get(term)
    }

    pub fn confidence_level(&self) -> f64 {
        1.0 - self.alpha
    }

    /// Whether every interval is backed by enough valid samples
    pub fn all_reliable(&self) -> bool {
        self.unestimable.is_empty() && self.intervals.values().all(|i| i.reliable)
    }

    /// One line per term that some resamples could not estimate
    pub fn exclusions(&self) -> Vec<String> {
        let mut lines: Vec<String> = self
            .intervals
            .values()
            .filter(|i| i.n_excluded > 0)
            .map(|i| {
                format!(
                    "{} of {} resamples excluded term {}",
                    i.n_excluded, self.n_completed, i.term
                )
            })
            .collect();
        lines.extend(self.unestimable.iter().map(|term| {
            format!(
                "{} of {} resamples excluded term {}",
                self.n_completed, self.n_completed, term
            )
        }));
        lines
    }
}

impl fmt::Display for BootstrapReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = self.confidence_level() * 100.0;
        writeln!(
            f,
            "Bootstrap percentile intervals ({}% level, B = {}, n = {})",
            level, self.n_completed, self.n_obs
        )?;
        writeln!(f)?;

        let width = self
            .intervals
            .keys()
            .map(|t| t.len())
            .max()
            .unwrap_or(4)
            .max(4);
        writeln!(
            f,
            "{:<width$} {:>12} {:>12} {:>12} {:>12} {:>12} {:>7}",
            "Term",
            "Estimate",
            "Boot Mean",
            "Boot SE",
            "Lower",
            "Upper",
            "Valid",
            width = width
        )?;
        writeln!(f, "{}", "-".repeat(width + 7 * 12 - 1))?;

        for interval in self.intervals.values() {
            let estimate = interval
                .estimate
                .map(|e| format!("{:.4}", e))
                .unwrap_or_else(|| "NA".to_string());
            writeln!(
                f,
                "{:<width$} {:>12} {:>12.4} {:>12.4} {:>12.4} {:>12.4} {:>7}{}",
                interval.term,
                estimate,
                interval.mean,
                interval.std_error,
                interval.lower,
                interval.upper,
                interval.n_valid,
                if interval.reliable { "" } else { " *" },
                width = width
            )?;
        }

        if self.intervals.values().any(|i| !i.reliable) {
            writeln!(f, "---")?;
            writeln!(f, "* fewer valid resamples than required; interval unreliable")?;
        }

        let exclusions = self.exclusions();
        if !exclusions.is_empty() {
            writeln!(f)?;
            for line in exclusions {
                writeln!(f, "{}", line)?;
            }
        }
        if self.n_failed > 0 {
            writeln!(f, "{} resamples could not be fitted at all", self.n_failed)?;
        }
        if self.truncated {
            writeln!(
                f,
                "Run stopped early: {} of {} resamples fitted",
                self.n_completed, self.n_resamples
            )?;
        }

        Ok(())
    }
}

/// Bootstrap runner over a [`CoefficientFitter`]
#[derive(Debug, Clone)]
pub struct Bootstrap<F> {
    config: BootstrapConfig,
    fitter: F,
    abort: AbortHandle,
}

impl<F: CoefficientFitter> Bootstrap<F> {
    /// Create a runner; fails on an invalid configuration
    pub fn new(config: BootstrapConfig, fitter: F) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            config,
            fitter,
            abort: AbortHandle::new(),
        })
    }

    /// Stop the run when `handle` is aborted
    pub fn with_abort(mut self, handle: AbortHandle) -> Self {
        self.abort = handle;
        self
    }

    pub fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }

    pub fn config(&self) -> &BootstrapConfig {
        &self.config
    }

    pub fn fitter(&self) -> &F {
        &self.fitter
    }

    /// Resample `data`, refit every resample and aggregate the estimates
    pub fn run(&self, data: &DataFrame) -> Result<BootstrapReport> {
        let config = &self.config;
        let estimator = IntervalEstimator::new(config.alpha, config.min_valid_samples)?;
        let resampler = Resampler::new(data.nrows(), config.n_resamples, config.seed)?;
        info!(
            stage = %Stage::Sampling,
            n_obs = data.nrows(),
            n_resamples = config.n_resamples,
            seed = config.seed,
            "starting bootstrap"
        );

        let full = match self.fitter.fit_coefficients(data) {
            Ok(outcome) => {
                if !outcome.is_full() {
                    warn!(missing = ?outcome.missing(), "full-data fit is rank-deficient");
                }
                Some(outcome)
            }
            Err(e) if e.is_recoverable() => {
                warn!(error = %e, "full-data fit failed");
                None
            }
            Err(e) => return Err(e),
        };

        let started = Instant::now();
        let deadline = config.timeout().map(|t| started + t);
        info!(stage = %Stage::Fitting, parallel = config.parallel, "fitting resamples");

        let run_one = |i: usize| self.iteration(&resampler, data, i, deadline);
        let slots: Vec<Option<IterationOutcome>> = if config.parallel {
            (0..config.n_resamples)
                .into_par_iter()
                .map(run_one)
                .collect::<Result<_>>()?
        } else {
            (0..config.n_resamples)
                .map(run_one)
                .collect::<Result<_>>()?
        };
        let outcomes: Vec<IterationOutcome> = slots.into_iter().flatten().collect();

        let n_completed = outcomes.len();
        let truncated = n_completed < config.n_resamples;
        if truncated {
            warn!(
                completed = n_completed,
                requested = config.n_resamples,
                aborted = self.abort.is_aborted(),
                "bootstrap stopped early"
            );
        }

        let n_failed = outcomes.iter().filter(|o| o.is_failed()).count();
        let n_partial = outcomes
            .iter()
            .filter(|o| matches!(o, IterationOutcome::Fitted(fit) if !fit.is_full()))
            .count();
        if n_partial + n_failed > 0 {
            warn!(
                partial = n_partial,
                failed = n_failed,
                "some resamples could not estimate every term"
            );
        }

        info!(stage = %Stage::Aggregating, completed = n_completed, "computing intervals");
        let (intervals, unestimable) =
            estimator.estimate(self.fitter.term_names(), &outcomes, full.as_ref());

        info!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            terms = intervals.len(),
            "bootstrap finished"
        );

        Ok(BootstrapReport {
            n_obs: data.nrows(),
            n_resamples: config.n_resamples,
            n_completed,
            n_failed,
            alpha: config.alpha,
            seed: config.seed,
            truncated,
            intervals,
            unestimable,
        })
    }

    fn should_stop(&self, deadline: Option<Instant>) -> bool {
        self.abort.is_aborted() || deadline.is_some_and(|d| Instant::now() >= d)
    }

    fn iteration(
        &self,
        resampler: &Resampler,
        data: &DataFrame,
        iteration: usize,
        deadline: Option<Instant>,
    ) -> Result<Option<IterationOutcome>> {
        if self.should_stop(deadline) {
            return Ok(None);
        }

        let sample = resampler.resample(data, iteration)?;
        match self.fitter.fit_coefficients(&sample) {
            Ok(outcome) => {
                if let FitOutcome::Partial { missing, .. } = &outcome {
                    debug!(iteration, missing = ?missing, "partial fit");
                }
                Ok(Some(IterationOutcome::Fitted(outcome)))
            }
            Err(e) if e.is_recoverable() => {
                debug!(iteration, error = %e, "resample fit failed");
                Ok(Some(IterationOutcome::Failed {
                    reason: e.to_string(),
                }))
            }
            Err(e) => Err(e),
        }
    }
}

impl<T: CoefficientFitter + ?Sized> CoefficientFitter for Box<T> {
    fn term_names(&self) -> &[String] {
        (**self).term_names()
    }

    fn fit_coefficients(&self, data: &DataFrame) -> Result<FitOutcome> {
        (**self).fit_coefficients(data)
    }
}
