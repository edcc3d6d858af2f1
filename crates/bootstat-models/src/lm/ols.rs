//! Ordinary Least Squares (OLS) linear regression
//!
//! Coefficients come from an SVD least-squares solve; inference uses
//! `(X'X)^{-1}` from a Cholesky factorization. A rank-deficient design is
//! rejected with [`ModelError::DegenerateFit`] naming the aliased columns.

use ndarray::{Array1, Array2};
use statrs::distribution::{ContinuousCDF, FisherSnedecor, StudentsT};
use tracing::debug;

use bootstat_core::data::DataFrame;
use bootstat_core::spec::{DesignLayout, ModelSpec};

use crate::base::{
    ModelError, ModelStatistics, ModelSummary, ModelType, ResidualStatistics, Result,
};
use crate::linalg;
use crate::lm::diagnostics::{Diagnostics, Vif};
use crate::lm::result::LinearRegressionResult;
use crate::lm::{LinearConfig, StandardErrorType};

/// Matrix type alias for 2D arrays
pub type Matrix = Array2<f64>;

/// Vector type alias for 1D arrays
pub type Vector = Array1<f64>;

/// OLS linear regression model
#[derive(Debug, Clone)]
pub struct LinearRegression {
    /// Model specification
    spec: ModelSpec,
    /// Data
    data: Option<DataFrame>,
    /// Configuration
    config: LinearConfig,
    /// Design layout, fixed at fit time
    layout: Option<DesignLayout>,
    /// Fitted result
    result: Option<LinearRegressionResult>,
}

impl LinearRegression {
    /// Create a new linear regression model
    pub fn new(spec: ModelSpec) -> Result<Self> {
        spec.validate()?;

        Ok(Self {
            spec,
            data: None,
            config: LinearConfig::default(),
            layout: None,
            result: None,
        })
    }

    /// Set data for the model
    pub fn data(mut self, data: &DataFrame) -> Self {
        self.data = Some(data.clone());
        self
    }

    /// Set configuration
    pub fn config(mut self, config: LinearConfig) -> Self {
        self.config = config;
        self
    }

    /// Use robust standard errors
    pub fn robust(mut self, se_type: StandardErrorType) -> Self {
        self.config.se_type = se_type;
        self
    }

    /// Fit the OLS model
    pub fn fit(mut self) -> Result<Self> {
        self.config.validate()?;
        let data = self
            .data
            .as_ref()
            .ok_or_else(|| ModelError::invalid("no data provided"))?;

        let layout = DesignLayout::new(&self.spec, data)?;
        let x = layout.design_matrix(data)?;
        let y = layout.response(data)?;

        let n = x.nrows();
        let p = x.ncols();
        if n <= p {
            return Err(ModelError::InsufficientData {
                n_samples: n,
                n_predictors: p,
            });
        }

        let kept = linalg::independent_columns(&x, self.config.rank_tolerance);
        if kept.len() < p {
            let terms = aliased_names(layout.column_names(), &kept);
            debug!(spec = %self.spec, ?terms, "design matrix is rank-deficient");
            return Err(ModelError::DegenerateFit { terms });
        }

        let coefficients = linalg::lstsq(&x, &y)?;
        let xtx_inv = linalg::spd_inverse(&linalg::gram(&x), "ols")?;

        let fitted_values = x.dot(&coefficients);
        let residuals = &y - &fitted_values;

        let has_intercept = layout.has_intercept();
        let nf = n as f64;
        let pf = p as f64;
        let df_residual = n - p;

        let rss = residuals.mapv(|r| r * r).sum();
        let tss = total_sum_of_squares(&y, has_intercept);
        let r_squared = 1.0 - rss / tss;
        let n_ref = if has_intercept { nf - 1.0 } else { nf };
        let adj_r_squared = 1.0 - (1.0 - r_squared) * (n_ref / (nf - pf));
        let sigma2 = rss / df_residual as f64;
        let residual_std_error = sigma2.sqrt();

        let hat_diagonal = linalg::leverage(&x, &xtx_inv);
        let covariance = self.covariance(&x, &xtx_inv, &residuals, &hat_diagonal, sigma2);
        let standard_errors = covariance.diag().mapv(|v| v.max(0.0).sqrt().max(1e-10));

        let (t_statistics, p_values, ci_lower, ci_upper) =
            self.calculate_inference(&coefficients, &standard_errors, df_residual)?;

        let df_model = if has_intercept { p - 1 } else { p };
        let (f_statistic, f_p_value) = match f_statistic(rss, tss, df_model, df_residual)? {
            Some((f, p)) => (Some(f), Some(p)),
            None => (None, None),
        };

        // Gaussian log-likelihood at the ML variance rss / n
        let log_likelihood = -0.5 * nf * ((2.0 * std::f64::consts::PI * rss / nf).ln() + 1.0);
        // The residual variance counts as an estimated parameter
        let k = pf + 1.0;
        let aic = 2.0 * k - 2.0 * log_likelihood;
        let bic = nf.ln() * k - 2.0 * log_likelihood;

        let cooks_distance = cooks_distance(&residuals, &hat_diagonal, p, residual_std_error);

        let model_statistics = ModelStatistics {
            r_squared: Some(r_squared),
            adj_r_squared: Some(adj_r_squared),
            residual_std_error: Some(residual_std_error),
            f_statistic,
            f_p_value,
            log_likelihood: Some(log_likelihood),
            aic: Some(aic),
            bic: Some(bic),
            residual_deviance: Some(rss),
            df_residual: Some(df_residual),
            df_model: Some(df_model),
            converged: Some(true),
            ..ModelStatistics::default()
        };

        debug!(spec = %self.spec, n, p, r_squared, "fitted OLS model");

        self.result = Some(LinearRegressionResult {
            coefficients,
            standard_errors,
            t_statistics,
            p_values,
            ci_lower,
            ci_upper,
            fitted_values,
            residuals,
            hat_diagonal,
            cooks_distance,
            covariance,
            xtx_inv,
            x,
            y,
            variable_names: layout.column_names().to_vec(),
            model_statistics,
            has_intercept,
        });
        self.layout = Some(layout);

        Ok(self)
    }

    /// Coefficient covariance matrix for the configured standard error type
    fn covariance(
        &self,
        x: &Matrix,
        xtx_inv: &Matrix,
        residuals: &Vector,
        hat_diagonal: &Vector,
        sigma2: f64,
    ) -> Matrix {
        let n = x.nrows() as f64;
        let p = x.ncols() as f64;

        let sandwich = |weights: Vector| {
            let meat = linalg::weighted_gram(x, &weights);
            xtx_inv.dot(&meat).dot(xtx_inv)
        };

        match self.config.se_type {
            StandardErrorType::Standard => xtx_inv * sigma2,
            StandardErrorType::HC0 => sandwich(residuals.mapv(|e| e * e)),
            StandardErrorType::HC1 => sandwich(residuals.mapv(|e| e * e)) * (n / (n - p)),
            StandardErrorType::HC3 => sandwich(
                residuals
                    .iter()
                    .zip(hat_diagonal.iter())
                    .map(|(&e, &h)| (e / (1.0 - h)).powi(2))
                    .collect(),
            ),
        }
    }

    /// Calculate t statistics, p-values and confidence intervals
    fn calculate_inference(
        &self,
        coefficients: &Vector,
        std_errors: &Vector,
        df: usize,
    ) -> Result<(Vector, Vector, Vector, Vector)> {
        let t_statistics: Vector = coefficients
            .iter()
            .zip(std_errors.iter())
            .map(|(&coef, &se)| coef / se)
            .collect();

        let t_dist = StudentsT::new(0.0, 1.0, df as f64)
            .map_err(|e| ModelError::numerical("calculate_inference", e.to_string()))?;

        let p_values: Vector = t_statistics
            .iter()
            .map(|&t| (2.0 * (1.0 - t_dist.cdf(t.abs()))).clamp(0.0, 1.0))
            .collect();

        let alpha = 1.0 - self.config.confidence_level;
        let t_critical = t_dist.inverse_cdf(1.0 - alpha / 2.0);

        let ci_lower = coefficients - &(std_errors * t_critical);
        let ci_upper = coefficients + &(std_errors * t_critical);

        Ok((t_statistics, p_values, ci_lower, ci_upper))
    }

    /// The model specification
    pub fn spec(&self) -> &ModelSpec {
        &self.spec
    }

    /// The configuration
    pub fn linear_config(&self) -> &LinearConfig {
        &self.config
    }

    /// Design layout of the fitted model
    pub fn layout(&self) -> Option<&DesignLayout> {
        self.layout.as_ref()
    }

    /// Fitted result
    pub fn result(&self) -> Option<&LinearRegressionResult> {
        self.result.as_ref()
    }

    /// Check if model is fitted
    pub fn is_fitted(&self) -> bool {
        self.result.is_some()
    }

    /// Coefficient estimates, in design column order
    pub fn coefficients(&self) -> Option<&Vector> {
        self.result.as_ref().map(|r| &r.coefficients)
    }

    /// Standard errors of the coefficients
    pub fn standard_errors(&self) -> Option<&Vector> {
        self.result.as_ref().map(|r| &r.standard_errors)
    }

    /// Fitted values
    pub fn fitted_values(&self) -> Option<&Vector> {
        self.result.as_ref().map(|r| &r.fitted_values)
    }

    /// Residuals
    pub fn residuals(&self) -> Option<&Vector> {
        self.result.as_ref().map(|r| &r.residuals)
    }

    /// Predict the response for new data
    pub fn predict(&self, data: &DataFrame) -> Result<Vector> {
        let (layout, result) = self.fitted()?;
        let x = layout.design_matrix(data)?;
        Ok(result.predict(&x))
    }

    /// Generalized variance inflation factors of the model terms
    pub fn vif(&self) -> Result<Vec<Vif>> {
        let (layout, result) = self.fitted()?;
        Diagnostics::vif(&result.x, layout)
    }

    /// Get model summary
    pub fn summary(&self) -> Result<ModelSummary> {
        let (_, result) = self.fitted()?;

        Ok(ModelSummary {
            model_type: ModelType::LinearRegression,
            formula: self.spec.to_string(),
            n_obs: result.n_obs(),
            n_predictors: result.n_predictors(),
            coefficients: result.to_coefficients(),
            model_statistics: result.model_statistics,
            residual_statistics: Some(ResidualStatistics::from_residuals(&result.residuals)),
        })
    }

    fn fitted(&self) -> Result<(&DesignLayout, &LinearRegressionResult)> {
        match (&self.layout, &self.result) {
            (Some(layout), Some(result)) => Ok((layout, result)),
            _ => Err(ModelError::NotFitted),
        }
    }
}

/// Names of the design columns missing from `kept`
pub(crate) fn aliased_names(names: &[String], kept: &[usize]) -> Vec<String> {
    names
        .iter()
        .enumerate()
        .filter(|(j, _)| !kept.contains(j))
        .map(|(_, name)| name.clone())
        .collect()
}

/// Total sum of squares: about the mean with an intercept, about zero
/// without one
pub(crate) fn total_sum_of_squares(y: &Vector, has_intercept: bool) -> f64 {
    let center = if has_intercept { y.mean().unwrap_or(0.0) } else { 0.0 };
    y.iter().map(|&yi| (yi - center).powi(2)).sum()
}

/// Overall F test; `None` for a model without slopes
fn f_statistic(
    rss: f64,
    tss: f64,
    df_model: usize,
    df_residual: usize,
) -> Result<Option<(f64, f64)>> {
    if df_model == 0 {
        return Ok(None);
    }

    let ess = tss - rss;
    let f = (ess / df_model as f64) / (rss / df_residual as f64);

    let f_dist = FisherSnedecor::new(df_model as f64, df_residual as f64)
        .map_err(|e| ModelError::numerical("f_statistic", e.to_string()))?;
    let p = if f.is_finite() { 1.0 - f_dist.cdf(f) } else { 0.0 };

    Ok(Some((f, p)))
}

fn cooks_distance(residuals: &Vector, hat_diag: &Vector, p: usize, sigma: f64) -> Vector {
    residuals
        .iter()
        .zip(hat_diag.iter())
        .map(|(&r, &h)| (r * r * h) / (p as f64 * sigma * sigma * (1.0 - h).powi(2)))
        .collect()
}
