//! Linear model diagnostics
//!
//! Multicollinearity (generalized variance inflation factors), residual
//! autocorrelation and influence measures for fitted linear models.

use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

use bootstat_core::spec::{DesignLayout, TermKind};

use crate::base::statistics::durbin_watson;
use crate::base::{ModelError, Result};
use crate::linalg;
use crate::lm::result::LinearRegressionResult;

/// Diagnostic results
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosticResults {
    /// Variance inflation factors per term
    pub vif: Vec<Vif>,
    /// Durbin-Watson statistic
    pub durbin_watson: DurbinWatson,
    /// Cook's distance outliers
    pub cooks_outliers: Vec<CookOutlier>,
    /// High leverage points
    pub high_leverage: Vec<LeveragePoint>,
    /// Influence points
    pub influence_points: Vec<InfluencePoint>,
}

/// Generalized variance inflation factor of one model term.
///
/// For a term spanning a single design column this is the classical VIF.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vif {
    /// Term name
    pub term: String,
    /// Number of design columns of the term
    pub df: usize,
    /// GVIF
    pub gvif: f64,
    /// GVIF^(1/(2 df)), comparable across terms of different size
    pub adjusted: f64,
    /// 1 / GVIF
    pub tolerance: f64,
}

/// Durbin-Watson test
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DurbinWatson {
    pub statistic: f64,
    /// Lag-one autocorrelation implied by the statistic
    pub autocorrelation: f64,
}

/// Cook's distance outlier
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CookOutlier {
    pub index: usize,
    pub distance: f64,
    pub threshold: f64,
}

/// High leverage point
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LeveragePoint {
    pub index: usize,
    pub leverage: f64,
    pub threshold: f64,
}

/// Influence point
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct InfluencePoint {
    pub index: usize,
    pub dffits: f64,
    pub threshold: f64,
}

/// Diagnostic analyzer
pub struct Diagnostics;

impl Diagnostics {
    /// Generalized variance inflation factors of the non-intercept terms.
    ///
    /// With `R` the correlation matrix of the non-intercept design columns,
    /// the GVIF of a term is `det(R11) * det(R22) / det(R)`, where `R11` is
    /// the block of the term's own columns and `R22` the block of all
    /// others.
    pub fn vif(x: &Array2<f64>, layout: &DesignLayout) -> Result<Vec<Vif>> {
        let terms: Vec<_> = layout
            .terms()
            .iter()
            .filter(|t| t.kind != TermKind::Intercept)
            .collect();
        if terms.len() < 2 {
            return Err(ModelError::invalid(
                "variance inflation factors need at least two terms",
            ));
        }

        let columns: Vec<usize> = terms.iter().flat_map(|t| t.columns.clone()).collect();
        let names = layout.column_names();
        let r = correlation_matrix(&x.select(Axis(1), &columns), &columns, names)?;
        let det_r = linalg::determinant(&r);
        if det_r <= 0.0 {
            return Err(ModelError::SingularMatrix("vif"));
        }

        let mut vifs = Vec::with_capacity(terms.len());
        let mut offset = 0;
        for term in terms {
            let own: Vec<usize> = (offset..offset + term.df()).collect();
            let rest: Vec<usize> = (0..columns.len()).filter(|j| !own.contains(j)).collect();
            offset += term.df();

            let r11 = r.select(Axis(0), &own).select(Axis(1), &own);
            let r22 = r.select(Axis(0), &rest).select(Axis(1), &rest);
            let gvif = linalg::determinant(&r11) * linalg::determinant(&r22) / det_r;

            vifs.push(Vif {
                term: term.name.clone(),
                df: term.df(),
                gvif,
                adjusted: gvif.powf(1.0 / (2.0 * term.df() as f64)),
                tolerance: 1.0 / gvif,
            });
        }

        Ok(vifs)
    }

    /// Calculate Durbin-Watson statistic
    pub fn durbin_watson(residuals: &Array1<f64>) -> DurbinWatson {
        let dw = durbin_watson(residuals);
        DurbinWatson {
            statistic: dw,
            autocorrelation: 1.0 - dw / 2.0,
        }
    }

    /// Run all diagnostics
    pub fn run_all(
        result: &LinearRegressionResult,
        layout: &DesignLayout,
    ) -> Result<DiagnosticResults> {
        let n_terms = layout
            .terms()
            .iter()
            .filter(|t| t.kind != TermKind::Intercept)
            .count();
        let vif = if n_terms >= 2 {
            Self::vif(&result.x, layout)?
        } else {
            Vec::new()
        };

        Ok(DiagnosticResults {
            vif,
            durbin_watson: Self::durbin_watson(&result.residuals),
            cooks_outliers: Self::cooks_outliers(&result.cooks_distance),
            high_leverage: Self::high_leverage(&result.hat_diagonal, result.n_predictors()),
            influence_points: Self::influence_points(&result.dffits(), result.n_predictors()),
        })
    }

    fn cooks_outliers(cooks: &Array1<f64>) -> Vec<CookOutlier> {
        let threshold = 4.0 / cooks.len() as f64;
        cooks
            .iter()
            .enumerate()
            .filter(|(_, d)| **d > threshold)
            .map(|(i, &d)| CookOutlier {
                index: i,
                distance: d,
                threshold,
            })
            .collect()
    }

    fn high_leverage(hat_diag: &Array1<f64>, p: usize) -> Vec<LeveragePoint> {
        let threshold = 2.0 * p as f64 / hat_diag.len() as f64;
        hat_diag
            .iter()
            .enumerate()
            .filter(|(_, h)| **h > threshold)
            .map(|(i, &h)| LeveragePoint {
                index: i,
                leverage: h,
                threshold,
            })
            .collect()
    }

    fn influence_points(dffits: &Array1<f64>, p: usize) -> Vec<InfluencePoint> {
        let threshold = 2.0 * (p as f64 / dffits.len() as f64).sqrt();
        dffits
            .iter()
            .enumerate()
            .filter(|(_, d)| d.abs() > threshold)
            .map(|(i, &d)| InfluencePoint {
                index: i,
                dffits: d,
                threshold,
            })
            .collect()
    }
}

fn correlation_matrix(
    x: &Array2<f64>,
    columns: &[usize],
    names: &[String],
) -> Result<Array2<f64>> {
    let n = x.nrows() as f64;
    let means = x.mean_axis(Axis(0)).ok_or_else(|| ModelError::InsufficientData {
        n_samples: 0,
        n_predictors: x.ncols(),
    })?;
    let centered = x - &means;
    let cov = centered.t().dot(&centered) / (n - 1.0);

    let sd = cov.diag().mapv(f64::sqrt);
    if let Some(j) = sd.iter().position(|&s| s <= 0.0 || s.is_nan()) {
        return Err(ModelError::numerical(
            "vif",
            format!("column '{}' has zero variance", names[columns[j]]),
        ));
    }

    let outer = sd.view().insert_axis(Axis(1)).dot(&sd.view().insert_axis(Axis(0)));
    Ok(cov / outer)
}
