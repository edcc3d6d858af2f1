//! Linear regression models
//!
//! Ordinary least squares on the design matrix of a [`ModelSpec`], with
//! classical or heteroscedasticity-consistent standard errors, influence
//! measures and generalized variance inflation factors.

pub mod diagnostics;
pub mod ols;
pub mod result;

#[cfg(test)]
mod tests;

pub use diagnostics::{DiagnosticResults, Diagnostics, Vif};
pub use ols::LinearRegression;
pub use result::{IntervalKind, LinearRegressionResult};

use bootstat_core::data::DataFrame;
use bootstat_core::spec::ModelSpec;
use serde::{Deserialize, Serialize};

use crate::base::{ModelError, Result};
use crate::linalg::RANK_TOLERANCE;

/// Linear model configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinearConfig {
    /// Standard error type
    pub se_type: StandardErrorType,
    /// Confidence level for intervals
    pub confidence_level: f64,
    /// Relative tolerance of the column independence check
    pub rank_tolerance: f64,
}

/// Standard error types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StandardErrorType {
    /// Standard errors assuming homoscedasticity
    Standard,
    /// White's heteroscedasticity-consistent standard errors
    HC0,
    /// HC0 with an `n / (n - p)` small-sample correction
    HC1,
    /// HC0 with squared residuals inflated by `1 / (1 - h)^2`
    HC3,
}

impl Default for LinearConfig {
    fn default() -> Self {
        Self {
            se_type: StandardErrorType::Standard,
            confidence_level: 0.95,
            rank_tolerance: RANK_TOLERANCE,
        }
    }
}

impl LinearConfig {
    /// Check the configuration values are in range
    pub fn validate(&self) -> Result<()> {
        if !(self.confidence_level > 0.0 && self.confidence_level < 1.0) {
            return Err(ModelError::invalid(format!(
                "confidence level must be in (0, 1), got {}",
                self.confidence_level
            )));
        }
        if !(self.rank_tolerance > 0.0 && self.rank_tolerance < 1.0) {
            return Err(ModelError::invalid(format!(
                "rank tolerance must be in (0, 1), got {}",
                self.rank_tolerance
            )));
        }
        Ok(())
    }
}

/// Convenience function for OLS regression
pub fn lm(spec: &ModelSpec, data: &DataFrame) -> Result<LinearRegression> {
    LinearRegression::new(spec.clone())?.data(data).fit()
}
