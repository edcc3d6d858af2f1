//! Generalized linear models
//!
//! Logistic and Poisson regression fitted by iteratively reweighted least
//! squares with canonical links, and the baseline-category multinomial
//! logit fitted by Newton-Raphson.

pub mod family;
pub mod irls;
pub mod multinomial;

#[cfg(test)]
mod tests;

pub use family::Family;
pub use irls::{GeneralizedLinearModel, GlmResult};
pub use multinomial::{MultinomialLogit, MultinomialResult};

use serde::{Deserialize, Serialize};

use crate::base::{ModelError, Result};
use crate::linalg::RANK_TOLERANCE;

/// GLM fitting configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlmConfig {
    /// Maximum number of IRLS or Newton iterations
    pub max_iter: usize,
    /// Convergence tolerance on the relative deviance change
    pub tolerance: f64,
    /// Confidence level for Wald intervals
    pub confidence_level: f64,
    /// Relative tolerance of the column independence check
    pub rank_tolerance: f64,
}

impl Default for GlmConfig {
    fn default() -> Self {
        Self {
            max_iter: 25,
            tolerance: 1e-8,
            confidence_level: 0.95,
            rank_tolerance: RANK_TOLERANCE,
        }
    }
}

impl GlmConfig {
    /// Check the configuration values are in range
    pub fn validate(&self) -> Result<()> {
        if self.max_iter == 0 {
            return Err(ModelError::invalid("max_iter must be at least 1"));
        }
        if !(self.tolerance > 0.0 && self.tolerance.is_finite()) {
            return Err(ModelError::invalid(format!(
                "tolerance must be positive, got {}",
                self.tolerance
            )));
        }
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
