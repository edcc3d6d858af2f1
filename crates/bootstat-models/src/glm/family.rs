//! Exponential families with their canonical links

use std::fmt;
use std::str::FromStr;

use ndarray::Array1;
use serde::{Deserialize, Serialize};
use statrs::function::gamma::ln_gamma;

use crate::base::{ModelError, ModelType, Result};

/// Fitted probabilities are kept this far away from 0 and 1
const PROB_EPS: f64 = 1e-10;

/// Largest linear predictor passed to `exp`
const MAX_ETA: f64 = 700.0;

/// Response distribution of a generalized linear model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Family {
    /// Binary response with the logit link
    Binomial,
    /// Count response with the log link
    Poisson,
}

impl Family {
    /// Family name
    pub fn name(&self) -> &'static str {
        match self {
            Family::Binomial => "binomial",
            Family::Poisson => "poisson",
        }
    }

    /// Name of the canonical link
    pub fn link_name(&self) -> &'static str {
        match self {
            Family::Binomial => "logit",
            Family::Poisson => "log",
        }
    }

    /// What `exp(beta)` means for this family
    pub fn ratio_name(&self) -> &'static str {
        match self {
            Family::Binomial => "odds ratio",
            Family::Poisson => "rate ratio",
        }
    }

    /// Model type reported in summaries
    pub fn model_type(&self) -> ModelType {
        match self {
            Family::Binomial => ModelType::LogisticRegression,
            Family::Poisson => ModelType::PoissonRegression,
        }
    }

    /// Link function g(μ)
    pub fn link(&self, mu: f64) -> f64 {
        match self {
            Family::Binomial => (mu / (1.0 - mu)).ln(),
            Family::Poisson => mu.ln(),
        }
    }

    /// Inverse link μ = g⁻¹(η), kept inside the valid mean range
    pub fn inverse_link(&self, eta: f64) -> f64 {
        match self {
            Family::Binomial => (1.0 / (1.0 + (-eta).exp())).clamp(PROB_EPS, 1.0 - PROB_EPS),
            Family::Poisson => eta.min(MAX_ETA).exp().max(f64::EPSILON),
        }
    }

    /// Derivative dμ/dη at mean `mu`
    pub fn mu_eta(&self, mu: f64) -> f64 {
        match self {
            Family::Binomial => mu * (1.0 - mu),
            Family::Poisson => mu,
        }
    }

    /// Variance function V(μ)
    pub fn variance(&self, mu: f64) -> f64 {
        match self {
            Family::Binomial => mu * (1.0 - mu),
            Family::Poisson => mu,
        }
    }

    /// Unit deviance d(y, μ)
    pub fn unit_deviance(&self, y: f64, mu: f64) -> f64 {
        match self {
            Family::Binomial => {
                2.0 * (xlogy(y, y / mu) + xlogy(1.0 - y, (1.0 - y) / (1.0 - mu)))
            }
            Family::Poisson => 2.0 * (xlogy(y, y / mu) - (y - mu)),
        }
    }

    /// Total deviance
    pub fn deviance(&self, y: &Array1<f64>, mu: &Array1<f64>) -> f64 {
        y.iter()
            .zip(mu.iter())
            .map(|(&yi, &mi)| self.unit_deviance(yi, mi))
            .sum()
    }

    /// Log-likelihood of the fitted means
    pub fn log_likelihood(&self, y: &Array1<f64>, mu: &Array1<f64>) -> f64 {
        y.iter()
            .zip(mu.iter())
            .map(|(&yi, &mi)| match self {
                Family::Binomial => xlogy(yi, mi) + xlogy(1.0 - yi, 1.0 - mi),
                Family::Poisson => xlogy(yi, mi) - mi - ln_gamma(yi + 1.0),
            })
            .sum()
    }

    /// Starting mean for an observation
    pub fn initial_mu(&self, y: f64) -> f64 {
        match self {
            Family::Binomial => (y + 0.5) / 2.0,
            Family::Poisson => y + 0.1,
        }
    }

    /// Check the response lies in the family's support
    pub fn validate_response(&self, y: &Array1<f64>) -> Result<()> {
        match self {
            Family::Binomial => {
                if let Some(v) = y.iter().find(|&&v| v != 0.0 && v != 1.0) {
                    return Err(ModelError::invalid(format!(
                        "binomial response must be 0 or 1, found {}",
                        v
                    )));
                }
            }
            Family::Poisson => {
                if let Some(v) = y.iter().find(|&&v| v < 0.0 || !v.is_finite()) {
                    return Err(ModelError::invalid(format!(
                        "poisson response must be a non-negative count, found {}",
                        v
                    )));
                }
            }
        }
        Ok(())
    }
}

/// `x * ln(y)`, taken as 0 when `x` is 0
fn xlogy(x: f64, y: f64) -> f64 {
    if x == 0.0 {
        0.0
    } else {
        x * y.ln()
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Family {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "binomial" | "logistic" | "logit" => Ok(Family::Binomial),
            "poisson" | "log" => Ok(Family::Poisson),
            other => Err(ModelError::invalid(format!("unknown family '{}'", other))),
        }
    }
}
