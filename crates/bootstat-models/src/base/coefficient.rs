//! Coefficient definition

use serde::{Deserialize, Serialize};

/// Coefficient estimate with statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coefficient {
    /// Design column name, e.g. `group[B]`
    pub name: String,
    /// Coefficient estimate
    pub estimate: f64,
    /// Standard error
    pub std_error: Option<f64>,
    /// Test statistic: t for linear models, z (Wald) for GLMs
    pub statistic: Option<f64>,
    /// Two-sided p-value
    pub p_value: Option<f64>,
    /// Lower bound of confidence interval
    pub ci_lower: Option<f64>,
    /// Upper bound of confidence interval
    pub ci_upper: Option<f64>,
    /// Degrees of freedom of the reference distribution, if any
    pub df: Option<f64>,
    /// Is this the intercept?
    pub is_intercept: bool,
}

impl Coefficient {
    /// Create a new coefficient
    pub fn new(name: impl Into<String>, estimate: f64) -> Self {
        Self {
            name: name.into(),
            estimate,
            std_error: None,
            statistic: None,
            p_value: None,
            ci_lower: None,
            ci_upper: None,
            df: None,
            is_intercept: false,
        }
    }

    /// Set standard error
    pub fn with_std_error(mut self, se: f64) -> Self {
        self.std_error = Some(se);
        self
    }

    /// Set test statistic
    pub fn with_statistic(mut self, statistic: f64) -> Self {
        self.statistic = Some(statistic);
        self
    }

    /// Set p-value
    pub fn with_p_value(mut self, p: f64) -> Self {
        self.p_value = Some(p);
        self
    }

    /// Set confidence interval
    pub fn with_ci(mut self, lower: f64, upper: f64) -> Self {
        self.ci_lower = Some(lower);
        self.ci_upper = Some(upper);
        self
    }

    /// Set degrees of freedom
    pub fn with_df(mut self, df: f64) -> Self {
        self.df = Some(df);
        self
    }

    /// Mark as intercept
    pub fn as_intercept(mut self) -> Self {
        self.is_intercept = true;
        self
    }

    /// Exponentiated estimate and interval: odds ratios for logistic
    /// models, rate ratios for Poisson models
    pub fn exponentiated(&self) -> Self {
        Self {
            name: self.name.clone(),
            estimate: self.estimate.exp(),
            std_error: None,
            statistic: self.statistic,
            p_value: self.p_value,
            ci_lower: self.ci_lower.map(f64::exp),
            ci_upper: self.ci_upper.map(f64::exp),
            df: self.df,
            is_intercept: self.is_intercept,
        }
    }
}
