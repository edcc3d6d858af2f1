//! Percentile intervals from a collection of resampled fits

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::base::statistics::quantile;
use crate::base::{ModelError, Result};
use crate::bootstrap::fitter::FitOutcome;

/// What happened in one resampling iteration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum IterationOutcome {
    /// The resample was fitted, possibly without some terms
    Fitted(FitOutcome),
    /// The fit failed with a recoverable error; no term was estimated
    Failed { reason: String },
}

impl IterationOutcome {
    /// Estimate of `term` in this iteration, if it was estimated
    pub fn estimate(&self, term: &str) -> Option<f64> {
        match self {
            IterationOutcome::Fitted(outcome) => outcome.get(term),
            IterationOutcome::Failed { .. } => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, IterationOutcome::Failed { .. })
    }
}

/// Percentile interval of one term
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermInterval {
    pub term: String,
    /// Estimate on the full source dataset, if that fit could estimate it
    pub estimate: Option<f64>,
    pub lower: f64,
    pub upper: f64,
    /// Mean of the resampled estimates
    pub mean: f64,
    /// Standard deviation of the resampled estimates
    pub std_error: f64,
    /// Iterations that estimated the term
    pub n_valid: usize,
    /// Iterations that could not estimate the term
    pub n_excluded: usize,
    /// False when fewer than the minimum number of valid samples back the
    /// interval
    pub reliable: bool,
}

impl TermInterval {
    pub fn contains(&self, value: f64) -> bool {
        self.lower <= value && value <= self.upper
    }

    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }
}

impl fmt::Display for TermInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: [{:.4}, {:.4}] (n = {})",
            self.term, self.lower, self.upper, self.n_valid
        )
    }
}

/// Aggregates per-iteration outcomes into percentile intervals.
///
/// Terms missing from an iteration are excluded from that term's
/// percentiles only; the other terms of the same iteration still count.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntervalEstimator {
    alpha: f64,
    min_valid_samples: usize,
}

impl IntervalEstimator {
    pub fn new(alpha: f64, min_valid_samples: usize) -> Result<Self> {
        if !(alpha > 0.0 && alpha < 1.0) {
            return Err(ModelError::invalid(format!(
                "alpha must be in (0, 1), got {}",
                alpha
            )));
        }

        Ok(Self {
            alpha,
            min_valid_samples,
        })
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Compute an interval for every term estimated at least once.
    ///
    /// `terms` gives the output order; terms seen in the outcomes but not
    /// listed are appended in first-seen order. Listed terms that were never
    /// estimated are returned separately.
    pub fn estimate(
        &self,
        terms: &[String],
        outcomes: &[IterationOutcome],
        full_estimates: Option<&FitOutcome>,
    ) -> (IndexMap<String, TermInterval>, Vec<String>) {
        let mut samples: IndexMap<String, Vec<f64>> =
            terms.iter().map(|t| (t.clone(), Vec::new())).collect();
        for outcome in outcomes {
            if let IterationOutcome::Fitted(fit) = outcome {
                for (term, &value) in fit.estimates() {
                    samples.entry(term.clone()).or_default().push(value);
                }
            }
        }

        let mut intervals = IndexMap::new();
        let mut unestimable = Vec::new();
        for (term, mut values) in samples {
            values.retain(|v| v.is_finite());
            if values.is_empty() {
                unestimable.push(term);
                continue;
            }

            let interval = self.interval(
                &term,
                &mut values,
                outcomes.len(),
                full_estimates.and_then(|f| f.get(&term)),
            );
            if !interval.reliable {
                warn!(
                    term = %term,
                    n_valid = interval.n_valid,
                    min_valid = self.min_valid_samples,
                    "too few valid resamples for a reliable interval"
                );
            }
            intervals.insert(term, interval);
        }

        (intervals, unestimable)
    }

    fn interval(
        &self,
        term: &str,
        values: &mut [f64],
        n_iterations: usize,
        estimate: Option<f64>,
    ) -> TermInterval {
        values.sort_by(f64::total_cmp);
        let n = values.len();
        let mean = values.iter().sum::<f64>() / n as f64;
        let std_error = if n > 1 {
            let ss: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
            (ss / (n - 1) as f64).sqrt()
        } else {
            0.0
        };

        TermInterval {
            term: term.to_string(),
            estimate,
            lower: quantile(values, self.alpha / 2.0),
            upper: quantile(values, 1.0 - self.alpha / 2.0),
            mean,
            std_error,
            n_valid: n,
            n_excluded: n_iterations - n,
            reliable: n >= self.min_valid_samples,
        }
    }
}
