//! Regression models and bootstrap confidence intervals
//!
//! This crate fits the models of the bootstat workspace on top of the
//! data frames and model specifications of `bootstat-core`:
//!
//! - [`lm`]: ordinary least squares with full inference and diagnostics
//! - [`glm`]: logistic and Poisson regression by IRLS, and the
//!   baseline-category multinomial logit
//! - [`bootstrap`]: the resample, refit and aggregate pipeline that turns
//!   any [`bootstrap::CoefficientFitter`] into percentile intervals

pub mod base;
pub mod bootstrap;
pub mod error;
pub mod glm;
pub mod linalg;
pub mod lm;

pub use base::{Coefficient, ModelStatistics, ModelSummary, ModelType, Result};
pub use bootstrap::{
    AbortHandle, Bootstrap, BootstrapConfig, BootstrapReport, CoefficientFitter, FitOutcome,
    GlmFitter, OlsFitter, TermInterval,
};
pub use error::ModelError;
pub use glm::{Family, GeneralizedLinearModel, GlmConfig, MultinomialLogit};
pub use lm::{lm, LinearConfig, LinearRegression};
