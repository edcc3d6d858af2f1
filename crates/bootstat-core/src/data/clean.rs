//! Cleaning steps applied before modeling

use serde::Serialize;
use tracing::info;

use super::*;

/// What a cleaning pass changed
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CleaningReport {
    /// Rows before cleaning
    pub rows_before: usize,
    /// Rows after cleaning
    pub rows_after: usize,
    /// Missing-value count per inspected column (only columns with any)
    pub missing_by_column: Vec<(String, usize)>,
    /// Columns converted to categorical
    pub categorized: Vec<String>,
}

impl CleaningReport {
    /// Number of rows removed
    pub fn rows_dropped(&self) -> usize {
        self.rows_before - self.rows_after
    }
}

impl DataFrame {
    /// Drop every row with a missing value in any of `columns`.
    ///
    /// An empty `columns` slice inspects all columns.
    pub fn drop_missing<S: AsRef<str>>(&self, columns: &[S]) -> Result<(Self, CleaningReport)> {
        let inspected: Vec<&Series> = if columns.is_empty() {
            self.columns.values().collect()
        } else {
            columns
                .iter()
                .map(|name| self.column(name.as_ref()))
                .collect::<Result<_>>()?
        };
        let names: Vec<String> = if columns.is_empty() {
            self.columns.keys().cloned().collect()
        } else {
            columns.iter().map(|c| c.as_ref().to_string()).collect()
        };

        let mut mask = vec![true; self.nrows];
        let mut missing_by_column = Vec::new();
        for (name, series) in names.iter().zip(&inspected) {
            let mut missing = 0;
            for (row, keep) in mask.iter_mut().enumerate() {
                if series.is_missing(row) {
                    *keep = false;
                    missing += 1;
                }
            }
            if missing > 0 {
                missing_by_column.push((name.clone(), missing));
            }
        }

        let cleaned = self.filter(&mask)?;
        let report = CleaningReport {
            rows_before: self.nrows,
            rows_after: cleaned.nrows(),
            missing_by_column,
            categorized: Vec::new(),
        };
        if report.rows_dropped() > 0 {
            info!(
                dropped = report.rows_dropped(),
                remaining = report.rows_after,
                "dropped rows with missing values"
            );
        }

        Ok((cleaned, report))
    }

    /// Convert the named columns to categorical in place
    pub fn categorize<S: AsRef<str>>(&mut self, columns: &[S]) -> Result<Vec<String>> {
        let mut converted = Vec::new();
        for name in columns {
            let name = name.as_ref();
            if self.column(name)?.column_type().is_categorical() {
                continue;
            }
            self.mutate(name, |series| series.to_categorical())?;
            converted.push(name.to_string());
        }
        Ok(converted)
    }

    /// Drop missing rows in `required`, then categorize `categorical`.
    ///
    /// This is the standard preparation applied before a model is fitted.
    pub fn clean<S1, S2>(&self, required: &[S1], categorical: &[S2]) -> Result<(Self, CleaningReport)>
    where
        S1: AsRef<str>,
        S2: AsRef<str>,
    {
        let (mut cleaned, mut report) = self.drop_missing(required)?;
        report.categorized = cleaned.categorize(categorical)?;
        Ok((cleaned, report))
    }
}
