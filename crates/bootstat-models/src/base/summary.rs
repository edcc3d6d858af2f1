//! Model summary structures

use super::coefficient::Coefficient;
use super::statistics::{ModelStatistics, ResidualStatistics};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Comprehensive model summary structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSummary {
    /// Model type
    pub model_type: ModelType,
    /// Model specification, rendered as a formula
    pub formula: String,
    /// Number of observations
    pub n_obs: usize,
    /// Number of estimated coefficients (including intercept)
    pub n_predictors: usize,
    /// Coefficients table
    pub coefficients: Vec<Coefficient>,
    /// Model statistics
    pub model_statistics: ModelStatistics,
    /// Residual statistics, for models with a continuous response
    pub residual_statistics: Option<ResidualStatistics>,
}

impl fmt::Display for ModelSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Model Summary")?;
        writeln!(f, "=============")?;
        writeln!(f, "Model Type: {}", self.model_type)?;
        writeln!(f, "Formula: {}", self.formula)?;
        writeln!(f, "Observations: {}", self.n_obs)?;
        writeln!(f, "Predictors: {}", self.n_predictors)?;
        writeln!(f)?;

        if let Some(resid) = &self.residual_statistics {
            writeln!(f, "Residuals:")?;
            writeln!(
                f,
                "{:>12} {:>12} {:>12} {:>12} {:>12}",
                "Min", "1Q", "Median", "3Q", "Max"
            )?;
            writeln!(
                f,
                "{:>12.4} {:>12.4} {:>12.4} {:>12.4} {:>12.4}",
                resid.min, resid.q1, resid.median, resid.q3, resid.max
            )?;
            writeln!(f)?;
        }

        let width = self
            .coefficients
            .iter()
            .map(|c| c.name.len())
            .max()
            .unwrap_or(0)
            .max(20);

        writeln!(f, "Coefficients:")?;
        writeln!(
            f,
            "{:<width$} {:>12} {:>12} {:>12} {:>12}",
            "Term",
            "Estimate",
            "Std Error",
            self.model_type.statistic_label(),
            "p-value",
        )?;
        writeln!(
            f,
            "{:-<width$} {:-<12} {:-<12} {:-<12} {:-<12}",
            "", "", "", "", ""
        )?;

        for coeff in &self.coefficients {
            writeln!(
                f,
                "{:<width$} {:>12.6} {:>12.6} {:>12.4} {:>12.4}",
                coeff.name,
                coeff.estimate,
                coeff.std_error.unwrap_or(f64::NAN),
                coeff.statistic.unwrap_or(f64::NAN),
                coeff.p_value.unwrap_or(f64::NAN),
            )?;
        }
        writeln!(f)?;

        let stats = &self.model_statistics;
        writeln!(f, "Model Statistics:")?;
        if let Some(r2) = stats.r_squared {
            writeln!(f, "  R-squared: {:.4}", r2)?;
        }
        if let Some(adj_r2) = stats.adj_r_squared {
            writeln!(f, "  Adjusted R-squared: {:.4}", adj_r2)?;
        }
        if let (Some(f_stat), Some(p)) = (stats.f_statistic, stats.f_p_value) {
            writeln!(f, "  F-statistic: {:.4} (p = {:.4})", f_stat, p)?;
        }
        if let Some(dev) = stats.null_deviance {
            writeln!(f, "  Null deviance: {:.4}", dev)?;
        }
        if let Some(dev) = stats.residual_deviance {
            writeln!(f, "  Residual deviance: {:.4}", dev)?;
        }
        if let (Some(chi2), Some(p)) = (stats.chi_squared, stats.chi_squared_p_value) {
            writeln!(f, "  LR chi-squared: {:.4} (p = {:.4})", chi2, p)?;
        }
        if let Some(log_lik) = stats.log_likelihood {
            writeln!(f, "  Log-likelihood: {:.4}", log_lik)?;
        }
        if let Some(aic) = stats.aic {
            writeln!(f, "  AIC: {:.4}", aic)?;
        }
        if let Some(bic) = stats.bic {
            writeln!(f, "  BIC: {:.4}", bic)?;
        }
        if let Some(resid_se) = stats.residual_std_error {
            writeln!(f, "  Residual Std. Error: {:.4}", resid_se)?;
        }
        if let Some(df_resid) = stats.df_residual {
            writeln!(f, "  Residual DF: {}", df_resid)?;
        }
        if let Some(df_model) = stats.df_model {
            writeln!(f, "  Model DF: {}", df_model)?;
        }
        if let Some(iterations) = stats.iterations {
            writeln!(f, "  Iterations: {}", iterations)?;
        }
        if let Some(dw) = self.residual_statistics.and_then(|r| r.durbin_watson) {
            writeln!(f, "  Durbin-Watson: {:.4}", dw)?;
        }

        Ok(())
    }
}

/// Model type enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelType {
    /// Linear regression
    LinearRegression,
    /// Logistic regression
    LogisticRegression,
    /// Poisson regression
    PoissonRegression,
    /// Baseline-category multinomial logit
    MultinomialLogit,
}

impl ModelType {
    fn statistic_label(&self) -> &'static str {
        match self {
            ModelType::LinearRegression => "t-value",
            _ => "z-value",
        }
    }
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelType::LinearRegression => write!(f, "Linear Regression"),
            ModelType::LogisticRegression => write!(f, "Logistic Regression"),
            ModelType::PoissonRegression => write!(f, "Poisson Regression"),
            ModelType::MultinomialLogit => write!(f, "Multinomial Logit"),
        }
    }
}
