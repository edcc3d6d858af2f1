//! Linear regression result structure
//!
//! This module defines the result structure for linear regression models,
//! containing all the information from fitting a linear model.

use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, StudentsT};
use std::fmt;

use crate::base::{Coefficient, ModelError, ModelStatistics, Result};
use crate::linalg;
use crate::lm::ols::{Matrix, Vector};

/// OLS linear regression result
#[derive(Debug, Clone)]
pub struct LinearRegressionResult {
    /// Coefficients (β)
    pub coefficients: Vector,
    /// Standard errors of coefficients
    pub standard_errors: Vector,
    /// t-statistics for coefficients
    pub t_statistics: Vector,
    /// p-values for coefficients
    pub p_values: Vector,
    /// Lower bounds of confidence intervals
    pub ci_lower: Vector,
    /// Upper bounds of confidence intervals
    pub ci_upper: Vector,
    /// Fitted values (ŷ)
    pub fitted_values: Vector,
    /// Residuals (y - ŷ)
    pub residuals: Vector,
    /// Hat matrix diagonal (leverage)
    pub hat_diagonal: Vector,
    /// Cook's distances
    pub cooks_distance: Vector,
    /// Coefficient covariance matrix for the chosen standard error type
    pub covariance: Matrix,
    /// (X'X)^{-1}
    pub xtx_inv: Matrix,
    /// Design matrix (X)
    pub x: Matrix,
    /// Response vector (y)
    pub y: Vector,
    /// Design column names
    pub variable_names: Vec<String>,
    /// Model statistics
    pub model_statistics: ModelStatistics,
    /// Has intercept
    pub has_intercept: bool,
}

/// Which uncertainty a prediction interval describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntervalKind {
    /// Uncertainty of the fitted mean
    Confidence,
    /// Uncertainty of a new observation
    Prediction,
}

impl LinearRegressionResult {
    /// Convert coefficients to Coefficient structs
    pub fn to_coefficients(&self) -> Vec<Coefficient> {
        let df = self.df_residual() as f64;

        self.variable_names
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let coef = Coefficient::new(name.clone(), self.coefficients[i])
                    .with_std_error(self.standard_errors[i])
                    .with_statistic(self.t_statistics[i])
                    .with_p_value(self.p_values[i])
                    .with_ci(self.ci_lower[i], self.ci_upper[i])
                    .with_df(df);

                if self.has_intercept && i == 0 {
                    coef.as_intercept()
                } else {
                    coef
                }
            })
            .collect()
    }

    /// Get the number of observations
    pub fn n_obs(&self) -> usize {
        self.y.len()
    }

    /// Get the number of predictors (including intercept)
    pub fn n_predictors(&self) -> usize {
        self.coefficients.len()
    }

    /// Residual degrees of freedom
    pub fn df_residual(&self) -> usize {
        self.n_obs() - self.n_predictors()
    }

    /// Get residual sum of squares
    pub fn rss(&self) -> f64 {
        self.residuals.mapv(|r| r * r).sum()
    }

    /// Get total sum of squares
    pub fn tss(&self) -> f64 {
        super::ols::total_sum_of_squares(&self.y, self.has_intercept)
    }

    /// Get explained sum of squares
    pub fn ess(&self) -> f64 {
        self.tss() - self.rss()
    }

    /// Get the covariance matrix of coefficients
    pub fn cov_matrix(&self) -> &Matrix {
        &self.covariance
    }

    /// Get internally studentized residuals
    pub fn studentized_residuals(&self) -> Vector {
        let rse = self.residual_std_error();

        self.residuals
            .iter()
            .zip(self.hat_diagonal.iter())
            .map(|(&r, &h)| r / (rse * (1.0 - h).sqrt()))
            .collect()
    }

    /// Get standardized residuals
    pub fn standardized_residuals(&self) -> Vector {
        let rse = self.residual_std_error();
        self.residuals.mapv(|r| r / rse)
    }

    /// Get DFFITS values
    pub fn dffits(&self) -> Vector {
        let n = self.n_obs() as f64;
        let p = self.n_predictors() as f64;
        let rss = self.rss();

        // Externally studentized residuals via the leave-one-out variance
        self.residuals
            .iter()
            .zip(self.hat_diagonal.iter())
            .map(|(&e, &h)| {
                let s2_i = (rss - e * e / (1.0 - h)) / (n - p - 1.0);
                let t = e / (s2_i.sqrt() * (1.0 - h).sqrt());
                t * (h / (1.0 - h)).sqrt()
            })
            .collect()
    }

    /// Indices of observations whose Cook's distance exceeds `threshold`
    /// (default `4 / n`)
    pub fn influential_points(&self, threshold: Option<f64>) -> Vec<usize> {
        let threshold = threshold.unwrap_or(4.0 / self.n_obs() as f64);
        self.cooks_distance
            .iter()
            .enumerate()
            .filter(|(_, d)| **d > threshold)
            .map(|(i, _)| i)
            .collect()
    }

    /// Indices of observations with leverage above `2p / n`
    pub fn high_leverage_points(&self) -> Vec<usize> {
        let threshold = 2.0 * self.n_predictors() as f64 / self.n_obs() as f64;

        self.hat_diagonal
            .iter()
            .enumerate()
            .filter(|(_, h)| **h > threshold)
            .map(|(i, _)| i)
            .collect()
    }

    /// Get predictions for a new design matrix
    pub fn predict(&self, x_new: &Matrix) -> Vector {
        x_new.dot(&self.coefficients)
    }

    /// Confidence or prediction intervals for a new design matrix at the
    /// given level
    pub fn predict_interval(
        &self,
        x_new: &Matrix,
        level: f64,
        kind: IntervalKind,
    ) -> Result<(Vector, Vector)> {
        if !(level > 0.0 && level < 1.0) {
            return Err(ModelError::invalid(format!(
                "confidence level must be in (0, 1), got {}",
                level
            )));
        }
        if x_new.ncols() != self.n_predictors() {
            return Err(ModelError::invalid(format!(
                "design has {} columns, model has {}",
                x_new.ncols(),
                self.n_predictors()
            )));
        }

        let predictions = self.predict(x_new);
        let rse = self.residual_std_error();
        let extra = match kind {
            IntervalKind::Confidence => 0.0,
            IntervalKind::Prediction => 1.0,
        };
        let se: Vector = linalg::leverage(x_new, &self.xtx_inv).mapv(|h| rse * (extra + h).sqrt());

        let t_dist = StudentsT::new(0.0, 1.0, self.df_residual() as f64)
            .map_err(|e| ModelError::numerical("predict_interval", e.to_string()))?;
        let t_critical = t_dist.inverse_cdf(1.0 - (1.0 - level) / 2.0);

        let lower = &predictions - &(&se * t_critical);
        let upper = &predictions + &(&se * t_critical);
        Ok((lower, upper))
    }

    fn residual_std_error(&self) -> f64 {
        self.model_statistics.residual_std_error.unwrap_or(0.0)
    }
}

impl fmt::Display for LinearRegressionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Linear Regression Results")?;
        writeln!(f, "========================")?;
        writeln!(f, "Observations: {}", self.n_obs())?;
        writeln!(f, "Predictors:   {}", self.n_predictors())?;
        writeln!(f)?;

        if let Some(r2) = self.model_statistics.r_squared {
            writeln!(f, "R-squared:           {:.4}", r2)?;
        }

        if let Some(adj_r2) = self.model_statistics.adj_r_squared {
            writeln!(f, "Adjusted R-squared:  {:.4}", adj_r2)?;
        }

        if let Some(f_stat) = self.model_statistics.f_statistic {
            writeln!(f, "F-statistic:        {:.4}", f_stat)?;
        }

        if let Some(p_val) = self.model_statistics.f_p_value {
            writeln!(f, "F p-value:          {:.4}", p_val)?;
        }

        if let Some(rse) = self.model_statistics.residual_std_error {
            writeln!(f, "Residual Std Error: {:.4}", rse)?;
        }

        if let Some(aic) = self.model_statistics.aic {
            writeln!(f, "AIC:                {:.4}", aic)?;
        }

        if let Some(bic) = self.model_statistics.bic {
            writeln!(f, "BIC:                {:.4}", bic)?;
        }

        Ok(())
    }
}
