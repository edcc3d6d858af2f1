//! Model specifications and design matrix construction
//!
//! A [`ModelSpec`] names the response field, the predictor fields and the
//! pairwise interactions of a regression model. It is a plain configuration
//! structure: it is checked on its own with [`ModelSpec::validate`] and
//! against a dataset schema with [`ModelSpec::validate_against`] before any
//! fitting begins. [`DesignLayout`] turns a validated spec into design
//! matrix columns.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::data::DataFrame;

mod design;
pub mod error;


pub use design::{DesignLayout, PredictorEncoding, TermColumns, TermKind};
pub use error::{SpecError, SpecResult};

/// Name of the intercept column
pub const INTERCEPT: &str = "(Intercept)";

/// Regression model specification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSpec {
    /// Response field
    pub response: String,
    /// Predictor fields, in design column order
    #[serde(default)]
    pub predictors: Vec<String>,
    /// Pairwise interactions between predictor fields
    #[serde(default)]
    pub interactions: Vec<(String, String)>,
    /// Whether to include an intercept
    #[serde(default = "default_intercept")]
    pub intercept: bool,
}

fn default_intercept() -> bool {
    true
}

impl ModelSpec {
    /// Create a specification with a response and no predictors
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            predictors: Vec::new(),
            interactions: Vec::new(),
            intercept: true,
        }
    }

    /// Add a predictor field
    pub fn predictor(mut self, name: impl Into<String>) -> Self {
        self.predictors.push(name.into());
        self
    }

    /// Add several predictor fields
    pub fn predictors<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.predictors.extend(names.into_iter().map(Into::into));
        self
    }

    /// Add a pairwise interaction between two predictor fields
    pub fn interaction(mut self, a: impl Into<String>, b: impl Into<String>) -> Self {
        self.interactions.push((a.into(), b.into()));
        self
    }

    /// Remove the intercept
    pub fn without_intercept(mut self) -> Self {
        self.intercept = false;
        self
    }

    /// Every field the specification refers to, response first
    pub fn fields(&self) -> Vec<&str> {
        let mut fields = vec![self.response.as_str()];
        for predictor in &self.predictors {
            if !fields.contains(&predictor.as_str()) {
                fields.push(predictor);
            }
        }
        fields
    }

    /// Check the specification is non-empty and self-consistent.
    ///
    /// Rejects an empty response, a model with no predictors, the
    /// response used as a predictor, duplicated predictors, interactions of
    /// a field with itself, interactions naming a field that is not a
    /// predictor, and duplicated interactions.
    pub fn validate(&self) -> SpecResult<()> {
        if self.response.trim().is_empty() {
            return Err(SpecError::invalid("response field is empty"));
        }
        if self.predictors.is_empty() {
            return Err(SpecError::invalid("model has no predictors"));
        }

        let mut seen = HashSet::new();
        for predictor in &self.predictors {
            if predictor.trim().is_empty() {
                return Err(SpecError::invalid("predictor field name is empty"));
            }
            if predictor == &self.response {
                return Err(SpecError::invalid(format!(
                    "response '{}' is also listed as a predictor",
                    predictor
                )));
            }
            if !seen.insert(predictor.as_str()) {
                return Err(SpecError::invalid(format!(
                    "predictor '{}' is listed more than once",
                    predictor
                )));
            }
        }

        let mut pairs = HashSet::new();
        for (a, b) in &self.interactions {
            if a == b {
                return Err(SpecError::invalid(format!(
                    "interaction '{}:{}' pairs a field with itself",
                    a, b
                )));
            }
            for side in [a, b] {
                if !seen.contains(side.as_str()) {
                    return Err(SpecError::invalid(format!(
                        "interaction '{}:{}' uses '{}', which is not a predictor",
                        a, b, side
                    )));
                }
            }
            let key = if a < b { (a, b) } else { (b, a) };
            if !pairs.insert(key) {
                return Err(SpecError::invalid(format!(
                    "interaction '{}:{}' is listed more than once",
                    a, b
                )));
            }
        }

        Ok(())
    }

    /// Validate the specification, then check every field exists in `df`
    /// and every predictor is numeric or categorical
    pub fn validate_against(&self, df: &DataFrame) -> SpecResult<()> {
        self.validate()?;

        let available = df.column_names();
        for field in self.fields() {
            let series = df
                .get_column(field)
                .ok_or_else(|| SpecError::field_not_found(field, &available))?;
            if field != self.response && series.column_type().is_string() {
                return Err(SpecError::TypeMismatch {
                    field: field.to_string(),
                    expected: "numeric or categorical",
                    actual: series.column_type(),
                });
            }
        }

        Ok(())
    }
}

impl fmt::Display for ModelSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ~ ", self.response)?;

        let mut terms: Vec<String> = Vec::new();
        if !self.intercept {
            terms.push("0".to_string());
        }
        terms.extend(self.predictors.iter().cloned());
        terms.extend(self.interactions.iter().map(|(a, b)| format!("{}:{}", a, b)));

        if terms.is_empty() {
            write!(f, "1")
        } else {
            write!(f, "{}", terms.join(" + "))
        }
    }
}
