//! DataFrame implementation for tabular data
//!
//! A DataFrame is a 2-dimensional labeled data structure with columns of
//! potentially different types. Column order is preserved.

use super::*;

use indexmap::IndexMap;

/// Main DataFrame structure
#[derive(Clone, Debug, Default)]
pub struct DataFrame {
    pub(crate) columns: IndexMap<String, Series>,
    pub(crate) nrows: usize,
}

impl DataFrame {
    /// Create an empty DataFrame
    pub fn new() -> Self {
        Self::default()
    }

    /// Create DataFrame from columns
    pub fn from_columns<I, S>(columns: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, Series)>,
        S: Into<String>,
    {
        let mut builder = DataFrameBuilder::new();

        for (name, series) in columns.into_iter() {
            builder = builder.with_column(name, series)?;
        }

        builder.build()
    }

    /// Get the shape of the DataFrame (rows, columns)
    pub fn shape(&self) -> (usize, usize) {
        (self.nrows, self.columns.len())
    }

    /// Get the number of rows
    pub fn nrows(&self) -> usize {
        self.nrows
    }

    /// Get the number of columns
    pub fn ncols(&self) -> usize {
        self.columns.len()
    }

    /// Get column names
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.keys().map(|k| k.as_str()).collect()
    }

    /// Column names paired with their types, in column order
    pub fn schema(&self) -> Vec<Field> {
        self.columns
            .iter()
            .map(|(name, series)| Field {
                name: name.clone(),
                column_type: series.column_type(),
            })
            .collect()
    }

    /// Get a reference to a column
    pub fn get_column(&self, name: &str) -> Option<&Series> {
        self.columns.get(name)
    }

    /// Get a reference to a column, failing if it is absent
    pub fn column(&self, name: &str) -> Result<&Series> {
        self.columns
            .get(name)
            .ok_or_else(|| DataError::ColumnNotFound(name.to_string()))
    }

    /// Check if column exists
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    /// Iterate over `(name, series)` pairs in column order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Series)> {
        self.columns.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Select specific columns
    pub fn select<I, S>(&self, names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut builder = DataFrameBuilder::new();

        for name in names.into_iter() {
            let name = name.as_ref();
            builder = builder.with_column(name, self.column(name)?.clone())?;
        }

        builder.build()
    }

    /// Filter rows with a boolean mask
    pub fn filter(&self, mask: &[bool]) -> Result<Self> {
        if mask.len() != self.nrows {
            return Err(DataError::DimensionMismatch {
                expected: format!("mask length {}", self.nrows),
                actual: format!("mask length {}", mask.len()),
            });
        }

        let mut builder = DataFrameBuilder::new();

        for (name, series) in &self.columns {
            builder = builder.with_column(name.clone(), series.filter(mask)?)?;
        }

        builder.build_with_rows(mask.iter().filter(|keep| **keep).count())
    }

    /// Add a new column
    pub fn with_column<S: Into<String>>(mut self, name: S, series: Series) -> Result<Self> {
        let name = name.into();

        if self.columns.contains_key(&name) {
            return Err(DataError::DuplicateColumn(name));
        }

        if !self.columns.is_empty() && series.len() != self.nrows {
            return Err(DataError::DimensionMismatch {
                expected: format!("{} rows", self.nrows),
                actual: format!("{} rows", series.len()),
            });
        }

        if self.columns.is_empty() {
            self.nrows = series.len();
        }

        self.columns.insert(name, series);

        Ok(self)
    }

    /// Replace an existing column with the output of `mutator`
    pub fn mutate<S, F>(&mut self, name: S, mutator: F) -> Result<&mut Self>
    where
        S: Into<String>,
        F: FnOnce(&Series) -> Result<Series>,
    {
        let name = name.into();

        let existing = self
            .columns
            .get(&name)
            .ok_or_else(|| DataError::ColumnNotFound(name.clone()))?;

        let new_series = mutator(existing)?;
        if new_series.len() != self.nrows {
            return Err(DataError::DimensionMismatch {
                expected: format!("{} rows", self.nrows),
                actual: format!("{} rows", new_series.len()),
            });
        }
        self.columns.insert(name, new_series);

        Ok(self)
    }

    /// Rename columns
    pub fn rename<S1, S2>(mut self, mapping: &[(S1, S2)]) -> Result<Self>
    where
        S1: AsRef<str>,
        S2: AsRef<str>,
    {
        for (old_name, new_name) in mapping {
            let old_name = old_name.as_ref();
            let new_name = new_name.as_ref().to_string();

            if self.columns.contains_key(&new_name) {
                return Err(DataError::DuplicateColumn(new_name));
            }

            let position = self
                .columns
                .get_index_of(old_name)
                .ok_or_else(|| DataError::ColumnNotFound(old_name.to_string()))?;
            let series = self.columns.shift_remove(old_name).ok_or_else(|| {
                DataError::ColumnNotFound(old_name.to_string())
            })?;
            self.columns.shift_insert(position, new_name, series);
        }

        Ok(self)
    }

    /// Drop columns
    pub fn drop<S: AsRef<str>>(mut self, names: &[S]) -> Result<Self> {
        for name in names {
            let name = name.as_ref();
            if self.columns.shift_remove(name).is_none() {
                return Err(DataError::ColumnNotFound(name.to_string()));
            }
        }

        if self.columns.is_empty() {
            self.nrows = 0;
        }

        Ok(self)
    }

    /// Gather rows at `indices` into a new frame, allowing repeats.
    ///
    /// The result has `indices.len()` rows and the same schema; this is
    /// how bootstrap resamples are materialized.
    pub fn take_rows(&self, indices: &[usize]) -> Result<Self> {
        let mut builder = DataFrameBuilder::new();

        for (name, series) in &self.columns {
            builder = builder.with_column(name.clone(), series.take(indices)?)?;
        }

        builder.build_with_rows(indices.len())
    }

    /// Get a single value
    pub fn value(&self, column: &str, row: usize) -> Result<SeriesValue> {
        self.column(column)?
            .get(row)
            .ok_or(DataError::IndexOutOfBounds {
                index: row,
                len: self.nrows,
            })
    }

    /// Descriptive statistics per column, in column order
    pub fn describe(&self) -> Result<Vec<(String, SeriesStats)>> {
        self.columns
            .iter()
            .map(|(name, series)| Ok((name.clone(), series.describe()?)))
            .collect()
    }
}

impl std::fmt::Display for DataFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DataFrame({} rows × {} cols)", self.nrows, self.ncols())
    }
}
