//! Statistical structures for model results

use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Model statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelStatistics {
    /// R-squared
    pub r_squared: Option<f64>,
    /// Adjusted R-squared
    pub adj_r_squared: Option<f64>,
    /// Residual standard error
    pub residual_std_error: Option<f64>,
    /// F-statistic
    pub f_statistic: Option<f64>,
    /// F-statistic p-value
    pub f_p_value: Option<f64>,
    /// Log-likelihood
    pub log_likelihood: Option<f64>,
    /// AIC
    pub aic: Option<f64>,
    /// BIC
    pub bic: Option<f64>,
    /// Null deviance
    pub null_deviance: Option<f64>,
    /// Residual deviance
    pub residual_deviance: Option<f64>,
    /// Likelihood-ratio chi-squared statistic against the null model
    pub chi_squared: Option<f64>,
    /// Chi-squared p-value
    pub chi_squared_p_value: Option<f64>,
    /// Residual degrees of freedom
    pub df_residual: Option<usize>,
    /// Model degrees of freedom
    pub df_model: Option<usize>,
    /// Null model degrees of freedom
    pub df_null: Option<usize>,
    /// Number of iterations
    pub iterations: Option<usize>,
    /// Convergence status
    pub converged: Option<bool>,
}

/// Residual statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ResidualStatistics {
    /// Minimum residual
    pub min: f64,
    /// First quartile
    pub q1: f64,
    /// Median
    pub median: f64,
    /// Third quartile
    pub q3: f64,
    /// Maximum residual
    pub max: f64,
    /// Mean
    pub mean: f64,
    /// Standard deviation
    pub std_dev: f64,
    /// Skewness
    pub skewness: Option<f64>,
    /// Excess kurtosis
    pub kurtosis: Option<f64>,
    /// Durbin-Watson statistic
    pub durbin_watson: Option<f64>,
}

impl ResidualStatistics {
    /// Describe a residual vector
    pub fn from_residuals(residuals: &Array1<f64>) -> Self {
        if residuals.is_empty() {
            return Self::default();
        }

        let mut sorted = residuals.to_vec();
        sorted.sort_by(f64::total_cmp);

        Self {
            min: sorted[0],
            q1: quantile(&sorted, 0.25),
            median: quantile(&sorted, 0.5),
            q3: quantile(&sorted, 0.75),
            max: sorted[sorted.len() - 1],
            mean: residuals.mean().unwrap_or(0.0),
            std_dev: if residuals.len() > 1 { residuals.std(1.0) } else { 0.0 },
            skewness: Some(skewness(residuals)),
            kurtosis: Some(kurtosis(residuals)),
            durbin_watson: Some(durbin_watson(residuals)),
        }
    }
}

/// Quantile of already sorted data, interpolating linearly between order
/// statistics (R type 7)
pub fn quantile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }

    let idx = (sorted.len() as f64 - 1.0) * q.clamp(0.0, 1.0);
    let lower = idx.floor() as usize;
    let upper = idx.ceil() as usize;

    // exact when a == b and never above b, so monotone in q
    let (a, b) = (sorted[lower], sorted[upper]);
    if lower == upper {
        a
    } else {
        let weight = idx - lower as f64;
        (a + weight * (b - a)).min(b)
    }
}

fn skewness(data: &Array1<f64>) -> f64 {
    let n = data.len() as f64;
    if n < 3.0 {
        return 0.0;
    }

    let mean = data.mean().unwrap_or(0.0);
    let std = data.std(1.0);
    if std < 1e-10 {
        return 0.0;
    }

    let sum_cubes: f64 = data.iter().map(|&x| (x - mean).powi(3)).sum();
    (sum_cubes / n) / std.powi(3)
}

fn kurtosis(data: &Array1<f64>) -> f64 {
    let n = data.len() as f64;
    if n < 4.0 {
        return 0.0;
    }

    let mean = data.mean().unwrap_or(0.0);
    let std = data.std(1.0);
    if std < 1e-10 {
        return 0.0;
    }

    let sum_quarts: f64 = data.iter().map(|&x| (x - mean).powi(4)).sum();
    (sum_quarts / n) / std.powi(4) - 3.0
}

/// Durbin-Watson statistic of a residual series
pub fn durbin_watson(residuals: &Array1<f64>) -> f64 {
    let n = residuals.len();
    if n < 2 {
        return 0.0;
    }

    let sum_sq_diff: f64 = (1..n)
        .map(|i| (residuals[i] - residuals[i - 1]).powi(2))
        .sum();
    let sum_sq: f64 = residuals.iter().map(|&r| r * r).sum();

    if sum_sq < 1e-10 {
        0.0
    } else {
        sum_sq_diff / sum_sq
    }
}
