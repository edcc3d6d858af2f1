//! Baseline-category multinomial logit
//!
//! For a response with levels `l0 < l1 < ... < lK-1`, the model fits one
//! coefficient vector per non-baseline level `k` with
//! `ln(P(y = lk) / P(y = l0)) = x' beta_k`. The parameters are estimated
//! jointly by Newton-Raphson on the full `(K-1)p x (K-1)p` information
//! matrix, with step halving whenever a step lowers the likelihood.

use ndarray::{s, Array1, Array2, Axis};
use statrs::distribution::{ChiSquared, ContinuousCDF, Normal};
use tracing::debug;

use bootstat_core::data::{DataError, DataFrame, Series};
use bootstat_core::spec::{DesignLayout, ModelSpec};

use crate::base::{Coefficient, ModelError, ModelStatistics, ModelSummary, ModelType, Result};
use crate::glm::GlmConfig;
use crate::linalg;
use crate::lm::ols::aliased_names;

/// Maximum number of step halvings per Newton step
const MAX_HALVINGS: usize = 20;

/// Multinomial logit result
#[derive(Debug, Clone)]
pub struct MultinomialResult {
    /// Response levels; the first is the baseline
    pub levels: Vec<String>,
    /// Design column names
    pub variable_names: Vec<String>,
    /// Coefficients, one row per non-baseline level
    pub coefficients: Array2<f64>,
    /// Standard errors, shaped like `coefficients`
    pub standard_errors: Array2<f64>,
    /// Wald z statistics
    pub z_statistics: Array2<f64>,
    /// p-values
    pub p_values: Array2<f64>,
    /// Lower bounds of Wald intervals
    pub ci_lower: Array2<f64>,
    /// Upper bounds of Wald intervals
    pub ci_upper: Array2<f64>,
    /// Covariance of the stacked coefficients (level-major)
    pub covariance: Array2<f64>,
    /// Fitted class probabilities, one column per level
    pub fitted_probabilities: Array2<f64>,
    /// Model statistics
    pub model_statistics: ModelStatistics,
    /// Has intercept
    pub has_intercept: bool,
}

impl MultinomialResult {
    /// Baseline level
    pub fn baseline(&self) -> &str {
        &self.levels[0]
    }

    /// Number of observations
    pub fn n_obs(&self) -> usize {
        self.fitted_probabilities.nrows()
    }

    /// Coefficient rows named `level/term`, level-major
    pub fn to_coefficients(&self) -> Vec<Coefficient> {
        let mut out = Vec::with_capacity(self.coefficients.len());
        for (k, level) in self.levels.iter().skip(1).enumerate() {
            for (j, term) in self.variable_names.iter().enumerate() {
                let coef = Coefficient::new(format!("{}/{}", level, term), self.coefficients[(k, j)])
                    .with_std_error(self.standard_errors[(k, j)])
                    .with_statistic(self.z_statistics[(k, j)])
                    .with_p_value(self.p_values[(k, j)])
                    .with_ci(self.ci_lower[(k, j)], self.ci_upper[(k, j)]);
                out.push(if self.has_intercept && j == 0 {
                    coef.as_intercept()
                } else {
                    coef
                });
            }
        }
        out
    }

    /// Relative risk ratios `exp(beta)` with their intervals
    pub fn relative_risk_ratios(&self) -> Vec<Coefficient> {
        self.to_coefficients()
            .iter()
            .map(Coefficient::exponentiated)
            .collect()
    }
}

/// Multinomial logistic regression model
#[derive(Debug, Clone)]
pub struct MultinomialLogit {
    spec: ModelSpec,
    data: Option<DataFrame>,
    config: GlmConfig,
    layout: Option<DesignLayout>,
    result: Option<MultinomialResult>,
}

impl MultinomialLogit {
    /// Create a new multinomial logit model
    pub fn new(spec: ModelSpec) -> Result<Self> {
        spec.validate()?;

        Ok(Self {
            spec,
            data: None,
            config: GlmConfig::default(),
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
    pub fn config(mut self, config: GlmConfig) -> Self {
        self.config = config;
        self
    }

    /// Fit the model by Newton-Raphson
    pub fn fit(mut self) -> Result<Self> {
        self.config.validate()?;
        let data = self
            .data
            .as_ref()
            .ok_or_else(|| ModelError::invalid("no data provided"))?;

        let layout = DesignLayout::new(&self.spec, data)?;
        let x = layout.design_matrix(data)?;
        let (classes, levels) = response_classes(data, &self.spec.response)?;

        let n = x.nrows();
        let p = x.ncols();
        let k = levels.len() - 1;
        if n <= p * k {
            return Err(ModelError::InsufficientData {
                n_samples: n,
                n_predictors: p * k,
            });
        }

        let kept = linalg::independent_columns(&x, self.config.rank_tolerance);
        if kept.len() < p {
            return Err(ModelError::DegenerateFit {
                terms: aliased_names(layout.column_names(), &kept),
            });
        }

        let mut counts = vec![0usize; levels.len()];
        for &c in &classes {
            counts[c] += 1;
        }
        if let Some(empty) = counts.iter().position(|&c| c == 0) {
            return Err(ModelError::DegenerateFit {
                terms: layout
                    .column_names()
                    .iter()
                    .map(|t| format!("{}/{}", levels[empty], t))
                    .collect(),
            });
        }

        let fit = newton(&x, &classes, k, &self.config)?;
        debug!(
            spec = %self.spec,
            levels = levels.len(),
            iterations = fit.iterations,
            log_likelihood = fit.log_likelihood,
            "fitted multinomial logit"
        );

        let result = self.build_result(fit, &counts, levels, &layout)?;
        self.result = Some(result);
        self.layout = Some(layout);

        Ok(self)
    }

    fn build_result(
        &self,
        fit: NewtonFit,
        counts: &[usize],
        levels: Vec<String>,
        layout: &DesignLayout,
    ) -> Result<MultinomialResult> {
        let p = layout.ncols();
        let k = levels.len() - 1;
        let m = p * k;
        let n: usize = counts.iter().sum();
        let nf = n as f64;
        let has_intercept = layout.has_intercept();

        let coefficients = stacked_to_rows(&fit.theta, k, p);
        let standard_errors =
            stacked_to_rows(&fit.covariance.diag().mapv(|v| v.max(0.0).sqrt()), k, p);
        let z_statistics = &coefficients / &standard_errors;

        let normal = Normal::new(0.0, 1.0)
            .map_err(|e| ModelError::numerical("multinomial_inference", e.to_string()))?;
        let p_values = z_statistics.mapv(|z| (2.0 * (1.0 - normal.cdf(z.abs()))).clamp(0.0, 1.0));
        let z_critical = normal.inverse_cdf(1.0 - (1.0 - self.config.confidence_level) / 2.0);
        let ci_lower = &coefficients - &(&standard_errors * z_critical);
        let ci_upper = &coefficients + &(&standard_errors * z_critical);

        let log_likelihood = fit.log_likelihood;
        let null_log_likelihood = if has_intercept {
            counts
                .iter()
                .map(|&c| c as f64 * (c as f64 / nf).ln())
                .sum()
        } else {
            -nf * (levels.len() as f64).ln()
        };
        let df_model = if has_intercept { (p - 1) * k } else { m };
        let chi2 = (2.0 * (log_likelihood - null_log_likelihood)).max(0.0);
        let (chi_squared, chi_squared_p_value) = if df_model > 0 {
            let dist = ChiSquared::new(df_model as f64)
                .map_err(|e| ModelError::numerical("multinomial_inference", e.to_string()))?;
            (Some(chi2), Some(1.0 - dist.cdf(chi2)))
        } else {
            (None, None)
        };

        Ok(MultinomialResult {
            levels,
            variable_names: layout.column_names().to_vec(),
            coefficients,
            standard_errors,
            z_statistics,
            p_values,
            ci_lower,
            ci_upper,
            covariance: fit.covariance,
            fitted_probabilities: fit.probabilities,
            model_statistics: ModelStatistics {
                log_likelihood: Some(log_likelihood),
                aic: Some(-2.0 * log_likelihood + 2.0 * m as f64),
                bic: Some(-2.0 * log_likelihood + nf.ln() * m as f64),
                null_deviance: Some(-2.0 * null_log_likelihood),
                residual_deviance: Some(-2.0 * log_likelihood),
                chi_squared,
                chi_squared_p_value,
                df_residual: Some(n - m),
                df_model: Some(df_model),
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

    /// Fitted result
    pub fn result(&self) -> Option<&MultinomialResult> {
        self.result.as_ref()
    }

    /// Check if model is fitted
    pub fn is_fitted(&self) -> bool {
        self.result.is_some()
    }

    /// Class probabilities for new data, one column per level
    pub fn predict_proba(&self, data: &DataFrame) -> Result<Array2<f64>> {
        let (layout, result) = self.fitted()?;
        let x = layout.design_matrix(data)?;
        Ok(probabilities(&x, &result.coefficients))
    }

    /// Most probable level for each row of new data
    pub fn predict(&self, data: &DataFrame) -> Result<Vec<String>> {
        let (_, result) = self.fitted()?;
        let proba = self.predict_proba(data)?;

        Ok(proba
            .axis_iter(Axis(0))
            .map(|row| {
                let best = row
                    .iter()
                    .enumerate()
                    .max_by(|a, b| a.1.total_cmp(b.1))
                    .map(|(i, _)| i)
                    .unwrap_or(0);
                result.levels[best].clone()
            })
            .collect())
    }

    /// Get model summary
    pub fn summary(&self) -> Result<ModelSummary> {
        let (_, result) = self.fitted()?;

        Ok(ModelSummary {
            model_type: ModelType::MultinomialLogit,
            formula: self.spec.to_string(),
            n_obs: result.n_obs(),
            n_predictors: result.coefficients.len(),
            coefficients: result.to_coefficients(),
            model_statistics: result.model_statistics,
            residual_statistics: None,
        })
    }

    fn fitted(&self) -> Result<(&DesignLayout, &MultinomialResult)> {
        match (&self.layout, &self.result) {
            (Some(layout), Some(result)) => Ok((layout, result)),
            _ => Err(ModelError::NotFitted),
        }
    }
}

/// Response class index per row and the sorted level set
fn response_classes(data: &DataFrame, name: &str) -> Result<(Vec<usize>, Vec<String>)> {
    let series = data.column(name)?;
    if series.missing_count() > 0 {
        return Err(DataError::MissingData(name.to_string()).into());
    }

    match series.to_categorical()? {
        Series::Categorical(codes, levels) if levels.len() >= 2 => {
            Ok((codes.iter().map(|&c| c as usize).collect(), levels))
        }
        Series::Categorical(_, levels) => Err(ModelError::invalid(format!(
            "response '{}' needs at least two levels, found {}",
            name,
            levels.len()
        ))),
        _ => Err(ModelError::invalid(format!(
            "response '{}' is not categorical",
            name
        ))),
    }
}

struct NewtonFit {
    theta: Array1<f64>,
    covariance: Array2<f64>,
    probabilities: Array2<f64>,
    log_likelihood: f64,
    iterations: usize,
}

fn stacked_to_rows(theta: &Array1<f64>, k: usize, p: usize) -> Array2<f64> {
    Array2::from_shape_fn((k, p), |(r, j)| theta[r * p + j])
}

/// Class probabilities for coefficient rows `beta` (baseline excluded)
fn probabilities(x: &Array2<f64>, beta: &Array2<f64>) -> Array2<f64> {
    let n = x.nrows();
    let k = beta.nrows();
    let eta = x.dot(&beta.t());

    let mut proba = Array2::zeros((n, k + 1));
    for i in 0..n {
        let row = eta.row(i);
        let max = row.iter().copied().fold(0.0_f64, f64::max);
        let baseline = (-max).exp();
        let mut total = baseline;
        proba[(i, 0)] = baseline;
        for c in 0..k {
            let e = (row[c] - max).exp();
            proba[(i, c + 1)] = e;
            total += e;
        }
        proba.row_mut(i).mapv_inplace(|v| v / total);
    }
    proba
}

fn log_likelihood(proba: &Array2<f64>, classes: &[usize]) -> f64 {
    classes
        .iter()
        .enumerate()
        .map(|(i, &c)| proba[(i, c)].max(f64::MIN_POSITIVE).ln())
        .sum()
}

/// Gradient and information matrix of the log-likelihood at `proba`
fn score_and_information(
    x: &Array2<f64>,
    classes: &[usize],
    proba: &Array2<f64>,
    k: usize,
) -> (Array1<f64>, Array2<f64>) {
    let p = x.ncols();
    let mut gradient = Array1::zeros(k * p);
    let mut information = Array2::zeros((k * p, k * p));

    for a in 0..k {
        let residual: Array1<f64> = classes
            .iter()
            .enumerate()
            .map(|(i, &c)| if c == a + 1 { 1.0 } else { 0.0 } - proba[(i, a + 1)])
            .collect();
        gradient
            .slice_mut(s![a * p..(a + 1) * p])
            .assign(&x.t().dot(&residual));

        for b in a..k {
            let weights: Array1<f64> = (0..x.nrows())
                .map(|i| {
                    let pa = proba[(i, a + 1)];
                    let pb = proba[(i, b + 1)];
                    if a == b {
                        pa * (1.0 - pa)
                    } else {
                        -pa * pb
                    }
                })
                .collect();
            let block = linalg::weighted_gram(x, &weights);
            information
                .slice_mut(s![a * p..(a + 1) * p, b * p..(b + 1) * p])
                .assign(&block);
            if a != b {
                information
                    .slice_mut(s![b * p..(b + 1) * p, a * p..(a + 1) * p])
                    .assign(&block.t());
            }
        }
    }

    (gradient, information)
}

fn newton(x: &Array2<f64>, classes: &[usize], k: usize, config: &GlmConfig) -> Result<NewtonFit> {
    let p = x.ncols();
    let mut theta = Array1::zeros(k * p);
    let mut proba = probabilities(x, &stacked_to_rows(&theta, k, p));
    let mut ll = log_likelihood(&proba, classes);

    for iteration in 1..=config.max_iter {
        let (gradient, information) = score_and_information(x, classes, &proba, k);
        let (step, _) = linalg::spd_solve(&information, &gradient, "multinomial")?;

        let mut scale = 1.0;
        let mut candidate = &theta + &step;
        let mut candidate_proba = probabilities(x, &stacked_to_rows(&candidate, k, p));
        let mut candidate_ll = log_likelihood(&candidate_proba, classes);
        let mut halvings = 0;
        while candidate_ll < ll - 1e-12 && halvings < MAX_HALVINGS {
            scale /= 2.0;
            candidate = &theta + &(&step * scale);
            candidate_proba = probabilities(x, &stacked_to_rows(&candidate, k, p));
            candidate_ll = log_likelihood(&candidate_proba, classes);
            halvings += 1;
        }

        let change = (candidate_ll - ll).abs() / (candidate_ll.abs() + 0.1);
        theta = candidate;
        proba = candidate_proba;
        ll = candidate_ll;

        if change < config.tolerance {
            let (_, information) = score_and_information(x, classes, &proba, k);
            let covariance = linalg::spd_inverse(&information, "multinomial")?;
            return Ok(NewtonFit {
                theta,
                covariance,
                probabilities: proba,
                log_likelihood: ll,
                iterations: iteration,
            });
        }
    }

    Err(ModelError::NotConverged {
        max_iter: config.max_iter,
    })
}
