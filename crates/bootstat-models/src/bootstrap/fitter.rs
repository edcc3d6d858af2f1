//! Coefficient fitters used inside the resampling loop
//!
//! A fitter fixes the design layout (columns and categorical level sets) on
//! the source dataset once, then refits the model on each resample. Unlike
//! the strict model fits, a rank-deficient resample is not an error here:
//! aliased columns are dropped, the model is refit on the rest, and the
//! outcome lists the terms that could not be estimated.

use indexmap::IndexMap;
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

use bootstat_core::data::DataFrame;
use bootstat_core::spec::{DesignLayout, ModelSpec};

use crate::base::Result;
use crate::glm::irls::{glm_response, irls};
use crate::glm::{Family, GlmConfig};
use crate::linalg::{self, RANK_TOLERANCE};
use crate::lm::ols::aliased_names;

/// Coefficient estimates of one fit, keyed by design column name
pub type Estimates = IndexMap<String, f64>;

/// Result of fitting one dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FitOutcome {
    /// Every term was estimated
    Full(Estimates),
    /// Some terms were aliased or absent and could not be estimated
    Partial {
        estimates: Estimates,
        missing: Vec<String>,
    },
}

impl FitOutcome {
    /// Build an outcome from the coefficients of the `kept` design columns
    pub fn from_columns(names: &[String], kept: &[usize], coefficients: &Array1<f64>) -> Self {
        let estimates: Estimates = kept
            .iter()
            .zip(coefficients.iter())
            .map(|(&j, &b)| (names[j].clone(), b))
            .collect();
        let missing = aliased_names(names, kept);

        if missing.is_empty() {
            FitOutcome::Full(estimates)
        } else {
            FitOutcome::Partial { estimates, missing }
        }
    }

    pub fn estimates(&self) -> &Estimates {
        match self {
            FitOutcome::Full(estimates) => estimates,
            FitOutcome::Partial { estimates, .. } => estimates,
        }
    }

    /// Terms that could not be estimated
    pub fn missing(&self) -> &[String] {
        match self {
            FitOutcome::Full(_) => &[],
            FitOutcome::Partial { missing, .. } => missing,
        }
    }

    pub fn is_full(&self) -> bool {
        matches!(self, FitOutcome::Full(_))
    }

    pub fn get(&self, term: &str) -> Option<f64> {
        self.estimates().get(term).copied()
    }
}

/// A model that can be refit on every resample.
///
/// Implementations must be shareable across the worker threads of the
/// parallel runner.
pub trait CoefficientFitter: Send + Sync {
    /// Design column names, in column order
    fn term_names(&self) -> &[String];

    /// Fit `data` and return the estimated coefficients.
    ///
    /// Recoverable failures ([`crate::ModelError::is_recoverable`]) are
    /// recorded by the runner as failed iterations; anything else aborts the
    /// run.
    fn fit_coefficients(&self, data: &DataFrame) -> Result<FitOutcome>;
}

fn kept_columns(x: &Array2<f64>, tolerance: f64) -> (Vec<usize>, Array2<f64>) {
    let kept = linalg::independent_columns(x, tolerance);
    let reduced = x.select(Axis(1), &kept);
    (kept, reduced)
}

/// Ordinary least squares fitter
#[derive(Debug, Clone)]
pub struct OlsFitter {
    layout: DesignLayout,
    rank_tolerance: f64,
}

impl OlsFitter {
    /// Validate `spec` against `data` and fix its design layout
    pub fn new(spec: &ModelSpec, data: &DataFrame) -> Result<Self> {
        Ok(Self {
            layout: DesignLayout::new(spec, data)?,
            rank_tolerance: RANK_TOLERANCE,
        })
    }

    /// Set the relative tolerance of the column independence check
    pub fn rank_tolerance(mut self, tolerance: f64) -> Self {
        self.rank_tolerance = tolerance;
        self
    }

    pub fn layout(&self) -> &DesignLayout {
        &self.layout
    }
}

impl CoefficientFitter for OlsFitter {
    fn term_names(&self) -> &[String] {
        self.layout.column_names()
    }

    fn fit_coefficients(&self, data: &DataFrame) -> Result<FitOutcome> {
        let x = self.layout.design_matrix(data)?;
        let y = self.layout.response(data)?;
        let (kept, x) = kept_columns(&x, self.rank_tolerance);
        if kept.is_empty() {
            return Ok(FitOutcome::from_columns(self.term_names(), &kept, &Array1::zeros(0)));
        }

        let xty = x.t().dot(&y);
        let (beta, _) = linalg::spd_solve(&linalg::gram(&x), &xty, "bootstrap_ols")?;
        Ok(FitOutcome::from_columns(self.term_names(), &kept, &beta))
    }
}

/// Logistic or Poisson fitter
#[derive(Debug, Clone)]
pub struct GlmFitter {
    layout: DesignLayout,
    family: Family,
    config: GlmConfig,
}

impl GlmFitter {
    /// Validate `spec` against `data` and fix its design layout
    pub fn new(spec: &ModelSpec, data: &DataFrame, family: Family) -> Result<Self> {
        let layout = DesignLayout::new(spec, data)?;
        glm_response(&layout, data, family)?;

        Ok(Self {
            layout,
            family,
            config: GlmConfig::default(),
        })
    }

    /// Set the IRLS configuration
    pub fn config(mut self, config: GlmConfig) -> Result<Self> {
        config.validate()?;
        self.config = config;
        Ok(self)
    }

    pub fn family(&self) -> Family {
        self.family
    }

    pub fn layout(&self) -> &DesignLayout {
        &self.layout
    }
}

impl CoefficientFitter for GlmFitter {
    fn term_names(&self) -> &[String] {
        self.layout.column_names()
    }

    fn fit_coefficients(&self, data: &DataFrame) -> Result<FitOutcome> {
        let x = self.layout.design_matrix(data)?;
        let y = glm_response(&self.layout, data, self.family)?;
        let (kept, x) = kept_columns(&x, self.config.rank_tolerance);
        if kept.is_empty() {
            return Ok(FitOutcome::from_columns(self.term_names(), &kept, &Array1::zeros(0)));
        }

        let fit = irls(&x, &y, self.family, &self.config)?;
        Ok(FitOutcome::from_columns(self.term_names(), &kept, &fit.coefficients))
    }
}
