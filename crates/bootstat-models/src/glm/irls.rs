//! Iteratively reweighted least squares for logistic and Poisson models

use ndarray::{Array1, Array2};
use statrs::distribution::{ChiSquared, ContinuousCDF, Normal};
use tracing::{debug, warn};

use bootstat_core::data::{DataError, DataFrame, Series};
use bootstat_core::spec::{DesignLayout, ModelSpec};

use crate::base::{Coefficient, ModelError, ModelStatistics, ModelSummary, Result};
use crate::glm::{Family, GlmConfig};
use crate::linalg;
use crate::lm::ols::aliased_names;

/// Output of one IRLS run on a full-rank design
#[derive(Debug, Clone)]
pub(crate) struct IrlsFit {
    pub coefficients: Array1<f64>,
    /// (X'WX)^{-1} at the final weights
    pub covariance: Array2<f64>,
    pub fitted: Array1<f64>,
    pub linear_predictor: Array1<f64>,
    pub deviance: f64,
    pub iterations: usize,
}

/// Fit `family` to `(x, y)` by IRLS.
///
/// Stops once the deviance changes by less than `tolerance` relative to
/// its size; fails with [`ModelError::NotConverged`] after
/// `config.max_iter` iterations.
pub(crate) fn irls(
    x: &Array2<f64>,
    y: &Array1<f64>,
    family: Family,
    config: &GlmConfig,
) -> Result<IrlsFit> {
    let mut mu: Array1<f64> = y.mapv(|v| family.initial_mu(v));
    let mut eta: Array1<f64> = mu.mapv(|m| family.link(m));
    let mut deviance_old = family.deviance(y, &mu);

    for iteration in 1..=config.max_iter {
        let dmu = mu.mapv(|m| family.mu_eta(m));
        let weights: Array1<f64> = mu
            .iter()
            .zip(dmu.iter())
            .map(|(&m, &d)| d * d / family.variance(m))
            .collect();
        let working: Array1<f64> = eta
            .iter()
            .zip(y.iter())
            .zip(mu.iter().zip(dmu.iter()))
            .map(|((&e, &yi), (&m, &d))| e + (yi - m) / d)
            .collect();

        let xtwx = linalg::weighted_gram(x, &weights);
        let xtwz = x.t().dot(&(&weights * &working));
        let (coefficients, covariance) = linalg::spd_solve(&xtwx, &xtwz, "irls")?;

        eta = x.dot(&coefficients);
        mu = eta.mapv(|e| family.inverse_link(e));
        let deviance = family.deviance(y, &mu);
        if !deviance.is_finite() {
            return Err(ModelError::numerical(
                "irls",
                format!("deviance is not finite at iteration {}", iteration),
            ));
        }

        let change = (deviance - deviance_old).abs() / (deviance.abs() + 0.1);
        if change < config.tolerance {
            return Ok(IrlsFit {
                coefficients,
                covariance,
                fitted: mu,
                linear_predictor: eta,
                deviance,
                iterations: iteration,
            });
        }
        deviance_old = deviance;
    }

    Err(ModelError::NotConverged {
        max_iter: config.max_iter,
    })
}

/// Extract the response of a GLM.
///
/// A binomial model also accepts a two-level categorical response, coded 1
/// for the second level.
pub(crate) fn glm_response(
    layout: &DesignLayout,
    data: &DataFrame,
    family: Family,
) -> Result<Array1<f64>> {
    let name = &layout.spec().response;
    let y = match (family, data.column(name)?) {
        (Family::Binomial, Series::Categorical(codes, levels)) => {
            if levels.len() != 2 {
                return Err(ModelError::invalid(format!(
                    "binomial response '{}' must have exactly two levels, found {}",
                    name,
                    levels.len()
                )));
            }
            if codes.iter().any(|&c| c as usize >= levels.len()) {
                return Err(DataError::MissingData(name.clone()).into());
            }
            codes.mapv(|c| c as f64)
        }
        _ => layout.response(data)?,
    };

    family.validate_response(&y)?;
    Ok(y)
}

/// Generalized linear model result
#[derive(Debug, Clone)]
pub struct GlmResult {
    /// Response family
    pub family: Family,
    /// Coefficients (β)
    pub coefficients: Array1<f64>,
    /// Standard errors of coefficients
    pub standard_errors: Array1<f64>,
    /// Wald z statistics
    pub z_statistics: Array1<f64>,
    /// p-values for coefficients
    pub p_values: Array1<f64>,
    /// Lower bounds of Wald intervals
    pub ci_lower: Array1<f64>,
    /// Upper bounds of Wald intervals
    pub ci_upper: Array1<f64>,
    /// Fitted means μ
    pub fitted_values: Array1<f64>,
    /// Linear predictor η = Xβ
    pub linear_predictor: Array1<f64>,
    /// Coefficient covariance matrix
    pub covariance: Array2<f64>,
    /// Response vector
    pub y: Array1<f64>,
    /// Design column names
    pub variable_names: Vec<String>,
    /// Model statistics
    pub model_statistics: ModelStatistics,
    /// Has intercept
    pub has_intercept: bool,
}

impl GlmResult {
    /// Convert coefficients to Coefficient structs
    pub fn to_coefficients(&self) -> Vec<Coefficient> {
        self.variable_names
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let coef = Coefficient::new(name.clone(), self.coefficients[i])
                    .with_std_error(self.standard_errors[i])
                    .with_statistic(self.z_statistics[i])
                    .with_p_value(self.p_values[i])
                    .with_ci(self.ci_lower[i], self.ci_upper[i]);

                if self.has_intercept && i == 0 {
                    coef.as_intercept()
                } else {
                    coef
                }
            })
            .collect()
    }

    /// Exponentiated coefficients with their intervals: odds ratios for a
    /// binomial model, rate ratios for a Poisson model
    pub fn exp_coefficients(&self) -> Vec<Coefficient> {
        self.to_coefficients()
            .iter()
            .map(Coefficient::exponentiated)
            .collect()
    }

    /// Number of observations
    pub fn n_obs(&self) -> usize {
        self.y.len()
    }

    /// Residual deviance
    pub fn deviance(&self) -> f64 {
        self.model_statistics.residual_deviance.unwrap_or(f64::NAN)
    }

    /// Signed square roots of the unit deviances
    pub fn deviance_residuals(&self) -> Array1<f64> {
        self.y
            .iter()
            .zip(self.fitted_values.iter())
            .map(|(&y, &mu)| {
                let d = self.family.unit_deviance(y, mu).max(0.0).sqrt();
                if y >= mu {
                    d
                } else {
                    -d
                }
            })
            .collect()
    }

    /// Pearson residuals (y - μ) / sqrt(V(μ))
    pub fn pearson_residuals(&self) -> Array1<f64> {
        self.y
            .iter()
            .zip(self.fitted_values.iter())
            .map(|(&y, &mu)| (y - mu) / self.family.variance(mu).sqrt())
            .collect()
    }
}

/// Logistic or Poisson regression model
#[derive(Debug, Clone)]
pub struct GeneralizedLinearModel {
    /// Model specification
    spec: ModelSpec,
    /// Response family
    family: Family,
    /// Data
    data: Option<DataFrame>,
    /// Configuration
    config: GlmConfig,
    /// Design layout, fixed at fit time
    layout: Option<DesignLayout>,
    /// Fitted result
    result: Option<GlmResult>,
}

impl GeneralizedLinearModel {
    /// Create a new model of the given family
    pub fn new(spec: ModelSpec, family: Family) -> Result<Self> {
        spec.validate()?;

        Ok(Self {
            spec,
            family,
            data: None,
            config: GlmConfig::default(),
            layout: None,
            result: None,
        })
    }

    /// Logistic regression
    pub fn logistic(spec: ModelSpec) -> Result<Self> {
        Self::new(spec, Family::Binomial)
    }

    /// Poisson regression
    pub fn poisson(spec: ModelSpec) -> Result<Self> {
        Self::new(spec, Family::Poisson)
    }

    /// Set data for the model
    pub fn data(mut self, data: &DataFrame) -> Self {
        self.data = Some(data.clone());
        self
    }

    /// Set configuration
    pub fn config(mut self, config: GlmConfig) -> Self {
        self.config = config;
        self
    }

    /// Fit the model by IRLS
    pub fn fit(mut self) -> Result<Self> {
        self.config.validate()?;
        let data = self
            .data
            .as_ref()
            .ok_or_else(|| ModelError::invalid("no data provided"))?;

        let layout = DesignLayout::new(&self.spec, data)?;
        let x = layout.design_matrix(data)?;
        let y = glm_response(&layout, data, self.family)?;

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
            return Err(ModelError::DegenerateFit {
                terms: aliased_names(layout.column_names(), &kept),
            });
        }

        let fit = irls(&x, &y, self.family, &self.config)?;
        debug!(
            spec = %self.spec,
            family = %self.family,
            iterations = fit.iterations,
            deviance = fit.deviance,
            "fitted GLM"
        );
        let saturated = fit.fitted.iter().any(|&m| m <= 1e-9 || m >= 1.0 - 1e-9);
        if self.family == Family::Binomial && saturated {
            warn!(spec = %self.spec, "fitted probabilities numerically 0 or 1 occurred");
        }

        self.result = Some(self.build_result(fit, y, &layout)?);
        self.layout = Some(layout);

        Ok(self)
    }

    fn build_result(
        &self,
        fit: IrlsFit,
        y: Array1<f64>,
        layout: &DesignLayout,
    ) -> Result<GlmResult> {
        let n = y.len();
        let p = fit.coefficients.len();
        let nf = n as f64;
        let has_intercept = layout.has_intercept();

        let standard_errors = fit.covariance.diag().mapv(|v| v.max(0.0).sqrt());
        let z_statistics = &fit.coefficients / &standard_errors;

        let normal = Normal::new(0.0, 1.0)
            .map_err(|e| ModelError::numerical("glm_inference", e.to_string()))?;
        let p_values =
            z_statistics.mapv(|z| (2.0 * (1.0 - normal.cdf(z.abs()))).clamp(0.0, 1.0));
        let alpha = 1.0 - self.config.confidence_level;
        let z_critical = normal.inverse_cdf(1.0 - alpha / 2.0);
        let ci_lower = &fit.coefficients - &(&standard_errors * z_critical);
        let ci_upper = &fit.coefficients + &(&standard_errors * z_critical);

        // The intercept-only MLE of a canonical-link model is the mean response
        let null_eta = if has_intercept {
            self.family.link(y.mean().unwrap_or(0.0))
        } else {
            0.0
        };
        let null_mu = Array1::from_elem(n, self.family.inverse_link(null_eta));
        let null_deviance = self.family.deviance(&y, &null_mu);

        let log_likelihood = self.family.log_likelihood(&y, &fit.fitted);
        let aic = -2.0 * log_likelihood + 2.0 * p as f64;
        let bic = -2.0 * log_likelihood + nf.ln() * p as f64;

        let df_model = if has_intercept { p - 1 } else { p };
        let df_null = if has_intercept { n - 1 } else { n };
        let (chi_squared, chi_squared_p_value) = if df_model > 0 {
            let chi2 = (null_deviance - fit.deviance).max(0.0);
            let dist = ChiSquared::new(df_model as f64)
                .map_err(|e| ModelError::numerical("glm_inference", e.to_string()))?;
            (Some(chi2), Some(1.0 - dist.cdf(chi2)))
        } else {
            (None, None)
        };

        Ok(GlmResult {
            family: self.family,
            coefficients: fit.coefficients,
            standard_errors,
            z_statistics,
            p_values,
            ci_lower,
            ci_upper,
            fitted_values: fit.fitted,
            linear_predictor: fit.linear_predictor,
            covariance: fit.covariance,
            y,
            variable_names: layout.column_names().to_vec(),
            model_statistics: ModelStatistics {
                log_likelihood: Some(log_likelihood),
                aic: Some(aic),
                bic: Some(bic),
                null_deviance: Some(null_deviance),
                residual_deviance: Some(fit.deviance),
                chi_squared,
                chi_squared_p_value,
                df_residual: Some(n - p),
                df_model: Some(df_model),
                df_null: Some(df_null),
                iterations: Some(fit.iterations),
                converged: Some(true),
                ..ModelStatistics::default()
            },
            has_intercept,
        })
    }

    /// The model specification
    pub fn spec(&self) -> &ModelSpec {
        &self.spec
    }

    /// Response family
    pub fn family(&self) -> Family {
        self.family
    }

    /// Design layout of the fitted model
    pub fn layout(&self) -> Option<&DesignLayout> {
        self.layout.as_ref()
    }

    /// Fitted result
    pub fn result(&self) -> Option<&GlmResult> {
        self.result.as_ref()
    }

    /// Check if model is fitted
    pub fn is_fitted(&self) -> bool {
        self.result.is_some()
    }

    /// Coefficient estimates on the link scale
    pub fn coefficients(&self) -> Option<&Array1<f64>> {
        self.result.as_ref().map(|r| &r.coefficients)
    }

    /// Odds ratios (binomial) or rate ratios (Poisson)
    pub fn exp_coefficients(&self) -> Result<Vec<Coefficient>> {
        let (_, result) = self.fitted()?;
        Ok(result.exp_coefficients())
    }

    /// Predicted means (probabilities or expected counts) for new data
    pub fn predict(&self, data: &DataFrame) -> Result<Array1<f64>> {
        let eta = self.predict_link(data)?;
        Ok(eta.mapv(|e| self.family.inverse_link(e)))
    }

    /// Linear predictor for new data
    pub fn predict_link(&self, data: &DataFrame) -> Result<Array1<f64>> {
        let (layout, result) = self.fitted()?;
        let x = layout.design_matrix(data)?;
        Ok(x.dot(&result.coefficients))
    }

    /// Get model summary
    pub fn summary(&self) -> Result<ModelSummary> {
        let (_, result) = self.fitted()?;

        Ok(ModelSummary {
            model_type: self.family.model_type(),
            formula: self.spec.to_string(),
            n_obs: result.n_obs(),
            n_predictors: result.coefficients.len(),
            coefficients: result.to_coefficients(),
            model_statistics: result.model_statistics,
            residual_statistics: None,
        })
    }

    fn fitted(&self) -> Result<(&DesignLayout, &GlmResult)> {
        match (&self.layout, &self.result) {
            (Some(layout), Some(result)) => Ok((layout, result)),
            _ => Err(ModelError::NotFitted),
        }
    }
}
