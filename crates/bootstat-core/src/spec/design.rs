//! Design matrix layout and construction
//!
//! Numeric predictors contribute one column each. Categorical predictors are
//! expanded into indicator columns with treatment coding: the first level
//! (in sorted order) is the reference and gets no column, except for the
//! first categorical main effect of a model without intercept, which keeps
//! every level. Interactions contribute the products of the two sides'
//! coded columns.
//!
//! The level sets are fixed when the layout is built, so a resample that
//! happens to miss a level still yields the same columns; the missing
//! level's indicator is simply all zeros.

use std::collections::HashMap;
use std::ops::Range;

use indexmap::IndexMap;
use ndarray::{s, Array1};
use serde::{Deserialize, Serialize};

use super::{ModelSpec, SpecError, SpecResult, INTERCEPT};
use crate::data::{DataError, DataFrame, Matrix, Series};

/// How a predictor field is turned into design columns
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PredictorEncoding {
    /// A single numeric column
    Numeric,
    /// Indicator columns over a fixed, sorted level set
    Categorical { levels: Vec<String> },
}

/// Role of a model term
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TermKind {
    Intercept,
    Main,
    Interaction,
}

/// A model term and the design columns it owns
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermColumns {
    /// Term label, e.g. `group` or `quantity:group`
    pub name: String,
    /// Role of the term
    pub kind: TermKind,
    /// Design column indices
    pub columns: Range<usize>,
}

impl TermColumns {
    /// Number of design columns (degrees of freedom) of the term
    pub fn df(&self) -> usize {
        self.columns.len()
    }
}

/// Column layout of a design matrix for one specification and schema
#[derive(Debug, Clone, PartialEq)]
pub struct DesignLayout {
    spec: ModelSpec,
    encodings: IndexMap<String, PredictorEncoding>,
    full_coding: Option<String>,
    column_names: Vec<String>,
    terms: Vec<TermColumns>,
}

impl DesignLayout {
    /// Build the layout for `spec` using the schema and level sets of `df`
    pub fn new(spec: &ModelSpec, df: &DataFrame) -> SpecResult<Self> {
        spec.validate_against(df)?;

        let mut encodings = IndexMap::new();
        for predictor in &spec.predictors {
            let series = df.column(predictor)?;
            let encoding = match series {
                Series::Categorical(_, levels) if levels.is_empty() => {
                    return Err(SpecError::EmptyLevels(predictor.clone()));
                }
                Series::Categorical(_, levels) => PredictorEncoding::Categorical {
                    levels: levels.clone(),
                },
                s if s.is_numeric() => PredictorEncoding::Numeric,
                other => {
                    return Err(SpecError::TypeMismatch {
                        field: predictor.clone(),
                        expected: "numeric or categorical",
                        actual: other.column_type(),
                    });
                }
            };
            encodings.insert(predictor.clone(), encoding);
        }

        let full_coding = if spec.intercept {
            None
        } else {
            encodings
                .iter()
                .find(|(_, e)| matches!(e, PredictorEncoding::Categorical { .. }))
                .map(|(name, _)| name.clone())
        };

        let mut layout = Self {
            spec: spec.clone(),
            encodings,
            full_coding,
            column_names: Vec::new(),
            terms: Vec::new(),
        };
        layout.assign_columns();

        Ok(layout)
    }

    fn assign_columns(&mut self) {
        let mut names = Vec::new();
        let mut terms = Vec::new();

        if self.spec.intercept {
            names.push(INTERCEPT.to_string());
            terms.push(TermColumns {
                name: INTERCEPT.to_string(),
                kind: TermKind::Intercept,
                columns: 0..1,
            });
        }

        for predictor in &self.spec.predictors {
            let start = names.len();
            names.extend(self.coded_names(predictor, self.is_full_coded(predictor)));
            terms.push(TermColumns {
                name: predictor.clone(),
                kind: TermKind::Main,
                columns: start..names.len(),
            });
        }

        for (a, b) in &self.spec.interactions {
            let start = names.len();
            let left = self.coded_names(a, false);
            let right = self.coded_names(b, false);
            for l in &left {
                for r in &right {
                    names.push(format!("{}:{}", l, r));
                }
            }
            terms.push(TermColumns {
                name: format!("{}:{}", a, b),
                kind: TermKind::Interaction,
                columns: start..names.len(),
            });
        }

        self.column_names = names;
        self.terms = terms;
    }

    fn is_full_coded(&self, field: &str) -> bool {
        self.full_coding.as_deref() == Some(field)
    }

    fn coded_names(&self, field: &str, full: bool) -> Vec<String> {
        match &self.encodings[field] {
            PredictorEncoding::Numeric => vec![field.to_string()],
            PredictorEncoding::Categorical { levels } => levels
                .iter()
                .skip(if full { 0 } else { 1 })
                .map(|level| format!("{}[{}]", field, level))
                .collect(),
        }
    }

    /// The specification this layout was built for
    pub fn spec(&self) -> &ModelSpec {
        &self.spec
    }

    /// Whether the first column is the intercept
    pub fn has_intercept(&self) -> bool {
        self.spec.intercept
    }

    /// Design column names, in column order
    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    /// Number of design columns
    pub fn ncols(&self) -> usize {
        self.column_names.len()
    }

    /// Model terms and the columns they own
    pub fn terms(&self) -> &[TermColumns] {
        &self.terms
    }

    /// Encoding of each predictor field
    pub fn encodings(&self) -> &IndexMap<String, PredictorEncoding> {
        &self.encodings
    }

    /// The term owning design column `column`
    pub fn term_of_column(&self, column: usize) -> Option<&TermColumns> {
        self.terms.iter().find(|t| t.columns.contains(&column))
    }

    /// Build the design matrix for `df`.
    ///
    /// `df` must carry the predictor fields with compatible types; its
    /// categorical columns may use a different level order, or be plain
    /// strings, as long as every value is a known level.
    pub fn design_matrix(&self, df: &DataFrame) -> SpecResult<Matrix> {
        let n = df.nrows();
        let mut x = Matrix::zeros((n, self.ncols()));

        let mut blocks: HashMap<(&str, bool), Matrix> = HashMap::new();
        for term in &self.terms {
            match term.kind {
                TermKind::Intercept => x.column_mut(term.columns.start).fill(1.0),
                TermKind::Main => {
                    let full = self.is_full_coded(&term.name);
                    let block = self.predictor_block(&term.name, full, df)?;
                    x.slice_mut(s![.., term.columns.clone()]).assign(&block);
                    blocks.insert((term.name.as_str(), full), block);
                }
                TermKind::Interaction => {}
            }
        }

        for ((a, b), term) in self
            .spec
            .interactions
            .iter()
            .zip(self.terms.iter().filter(|t| t.kind == TermKind::Interaction))
        {
            let left = match blocks.get(&(a.as_str(), false)) {
                Some(block) => block.clone(),
                None => self.predictor_block(a, false, df)?,
            };
            let right = match blocks.get(&(b.as_str(), false)) {
                Some(block) => block.clone(),
                None => self.predictor_block(b, false, df)?,
            };

            let mut col = term.columns.start;
            for i in 0..left.ncols() {
                for j in 0..right.ncols() {
                    let product = &left.column(i) * &right.column(j);
                    x.column_mut(col).assign(&product);
                    col += 1;
                }
            }
        }

        Ok(x)
    }

    /// Extract the response as a numeric vector
    pub fn response(&self, df: &DataFrame) -> SpecResult<Array1<f64>> {
        let name = &self.spec.response;
        let series = df
            .get_column(name)
            .ok_or_else(|| SpecError::field_not_found(name, &df.column_names()))?;

        if !series.is_numeric() {
            return Err(SpecError::TypeMismatch {
                field: name.clone(),
                expected: "numeric",
                actual: series.column_type(),
            });
        }

        let y = series.to_f64_array()?;
        if y.iter().any(|v| v.is_nan()) {
            return Err(DataError::MissingData(name.clone()).into());
        }
        Ok(y)
    }

    fn predictor_block(&self, field: &str, full: bool, df: &DataFrame) -> SpecResult<Matrix> {
        let series = df
            .get_column(field)
            .ok_or_else(|| SpecError::field_not_found(field, &df.column_names()))?;
        let n = series.len();

        match &self.encodings[field] {
            PredictorEncoding::Numeric => {
                if !series.is_numeric() {
                    return Err(SpecError::TypeMismatch {
                        field: field.to_string(),
                        expected: "numeric",
                        actual: series.column_type(),
                    });
                }
                let values = series.to_f64_array()?;
                if values.iter().any(|v| v.is_nan()) {
                    return Err(DataError::MissingData(field.to_string()).into());
                }
                Ok(values.insert_axis(ndarray::Axis(1)))
            }
            PredictorEncoding::Categorical { levels } => {
                let codes = self.level_codes(field, levels, series)?;
                let offset = if full { 0 } else { 1 };
                let mut block = Matrix::zeros((n, levels.len() - offset));
                for (row, &code) in codes.iter().enumerate() {
                    if code >= offset {
                        block[(row, code - offset)] = 1.0;
                    }
                }
                Ok(block)
            }
        }
    }

    /// Map each row of a categorical (or string) column onto the layout's
    /// level indices
    fn level_codes(&self, field: &str, levels: &[String], series: &Series) -> SpecResult<Vec<usize>> {
        let index: HashMap<&str, usize> = levels
            .iter()
            .enumerate()
            .map(|(i, level)| (level.as_str(), i))
            .collect();
        let lookup = |label: &str| {
            index
                .get(label)
                .copied()
                .ok_or_else(|| SpecError::UnknownLevel {
                    field: field.to_string(),
                    level: label.to_string(),
                })
        };

        if series.missing_count() > 0 {
            return Err(DataError::MissingData(field.to_string()).into());
        }

        match series {
            Series::Categorical(codes, own) if own.as_slice() == levels => {
                Ok(codes.iter().map(|&c| c as usize).collect())
            }
            Series::Categorical(codes, own) => {
                let remap = own
                    .iter()
                    .map(|label| lookup(label.as_str()))
                    .collect::<SpecResult<Vec<usize>>>()?;
                Ok(codes.iter().map(|&c| remap[c as usize]).collect())
            }
            Series::String(values) => values.iter().map(|v| lookup(v.as_str())).collect(),
            other => Err(SpecError::TypeMismatch {
                field: field.to_string(),
                expected: "categorical",
                actual: other.column_type(),
            }),
        }
    }
}
